//! Error and diagnostic types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::issue::Issue;

/// Source location span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset from start of source
    pub offset: usize,
    /// Length in bytes
    pub length: usize,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

impl Span {
    /// Create a span with byte offset only
    pub fn new(offset: usize, length: usize) -> Self {
        Self {
            offset,
            length,
            line: 0,
            column: 0,
        }
    }

    /// Create a span with full position information
    pub fn at(offset: usize, length: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            length,
            line,
            column,
        }
    }

    /// Smallest span covering both `self` and `other`
    pub fn to(self, other: Span) -> Self {
        let (first, last) = if self.offset <= other.offset {
            (self, other)
        } else {
            (other, self)
        };
        let end = (last.offset + last.length).max(first.offset + first.length);
        Self {
            offset: first.offset,
            length: end - first.offset,
            line: first.line,
            column: first.column,
        }
    }

    /// Byte offset one past the end of the span
    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// Diagnostic severity level, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[serde(alias = "informational")]
    Info,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    /// Whether this severity should fail a build
    pub fn is_error(&self) -> bool {
        matches!(self, Severity::Error | Severity::Fatal)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A problem reported by a rule at a source location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Issue identifier, e.g. `SQLiteString`
    pub issue: String,
    pub severity: Severity,
    pub message: String,
    pub span: Option<Span>,
    pub help: Option<String>,
}

impl Diagnostic {
    /// Create a diagnostic for `issue` at its default severity
    pub fn new(issue: &Issue, message: impl Into<String>) -> Self {
        Self {
            issue: issue.id.to_string(),
            severity: issue.default_severity,
            message: message.into(),
            span: None,
            help: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Get the issue id this diagnostic was reported for
    pub fn code(&self) -> &str {
        &self.issue
    }
}

/// Failures of the host, the option layer and the CLI.
///
/// Rules themselves never fail; an inapplicable call simply yields no
/// diagnostic.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum LintError {
    #[error("failed to read '{}'", path.display())]
    #[diagnostic(code(sqlitelint::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown source language '{0}'")]
    #[diagnostic(
        code(sqlitelint::unknown_language),
        help("supported languages: java, kotlin")
    )]
    UnknownLanguage(String),

    #[error("cannot determine source language of '{}'", path.display())]
    #[diagnostic(
        code(sqlitelint::unsupported_file),
        help("use a .java, .kt or .kts file, or pass --language")
    )]
    UnsupportedFile { path: PathBuf },

    #[error("unknown severity '{0}'")]
    #[diagnostic(
        code(sqlitelint::unknown_severity),
        help("expected one of: fatal, error, warning, informational, ignore, default")
    )]
    UnknownSeverity(String),

    #[error("unknown issue '{0}'")]
    #[diagnostic(
        code(sqlitelint::unknown_issue),
        help("run `sqlitelint issues` to list the registered issues")
    )]
    UnknownIssue(String),
}

pub type Result<T, E = LintError> = std::result::Result<T, E>;
