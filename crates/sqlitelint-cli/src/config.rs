//! Configuration file handling

use std::path::{Path, PathBuf};

use miette::{IntoDiagnostic, Result, WrapErr};
use serde::{Deserialize, Serialize};
use sqlitelint_core::{ClassDef, LintOptions};

use crate::args::{CheckArgs, OutputFormat};

pub const CONFIG_FILE: &str = "sqlitelint.toml";

/// Configuration for sqlitelint
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Source file paths or glob patterns
    #[serde(default)]
    pub files: Vec<String>,

    /// Output format (human, json, sarif)
    #[serde(default)]
    pub format: Option<OutputFormat>,

    /// Source language for files without a recognized extension
    #[serde(default)]
    pub language: Option<String>,

    /// Where to write the report
    #[serde(default)]
    pub output: Option<String>,

    /// Which issues run and at what severity
    #[serde(default)]
    pub lint: LintOptions,

    /// Extra classes for call resolution
    #[serde(default, rename = "class")]
    pub classes: Vec<ClassDef>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;
        Self::parse(&contents)
            .wrap_err_with(|| format!("invalid configuration in {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).into_diagnostic()
    }

    /// Try to find and load sqlitelint.toml in current directory or parent directories
    pub fn find_and_load() -> Result<Option<Self>> {
        let current_dir = std::env::current_dir().into_diagnostic()?;
        match find_config(&current_dir) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "using configuration file");
                Ok(Some(Self::from_file(&path)?))
            }
            None => Ok(None),
        }
    }

    /// Merge CLI arguments into configuration
    /// CLI arguments take precedence over config file values
    pub fn merge_with_args(mut self, args: &CheckArgs) -> Self {
        if !args.files.is_empty() {
            self.files = args.files.iter().map(|p| p.display().to_string()).collect();
        }
        if args.format.is_some() {
            self.format = args.format;
        }
        if args.language.is_some() {
            self.language = args.language.clone();
        }
        if args.output.is_some() {
            self.output = args.output.clone();
        }

        let lint = &mut self.lint;
        lint.disable.extend(args.disable.iter().cloned());
        lint.enable.extend(args.enable.iter().cloned());
        lint.severity.extend(args.severity.iter().cloned());
        if !args.check.is_empty() {
            lint.check = args.check.clone();
        }
        lint.warnings_as_errors |= args.warnings_as_errors;
        lint.ignore_warnings |= args.ignore_warnings;
        lint.explain_issues |= args.explain;
        lint.no_lines |= args.no_lines;

        self
    }
}

/// `sqlitelint.toml` in `start` or its nearest ancestor that has one
fn find_config(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}
