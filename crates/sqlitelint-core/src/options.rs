//! Lint options - which issues run and at what severity

use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Diagnostic, LintError, Severity};
use crate::issue::{Category, Issue};
use crate::rule::RuleRegistry;

/// Severity configured for an issue or category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityOverride {
    Fatal,
    Error,
    Warning,
    #[serde(alias = "info")]
    Informational,
    Ignore,
    /// The issue's own default severity
    Default,
}

impl SeverityOverride {
    /// Concrete severity for `issue`, or `None` when the issue is ignored
    pub fn resolve(&self, issue: &Issue) -> Option<Severity> {
        match self {
            SeverityOverride::Fatal => Some(Severity::Fatal),
            SeverityOverride::Error => Some(Severity::Error),
            SeverityOverride::Warning => Some(Severity::Warning),
            SeverityOverride::Informational => Some(Severity::Info),
            SeverityOverride::Ignore => None,
            SeverityOverride::Default => Some(issue.default_severity),
        }
    }
}

impl FromStr for SeverityOverride {
    type Err = LintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fatal" => Ok(SeverityOverride::Fatal),
            "error" => Ok(SeverityOverride::Error),
            "warning" => Ok(SeverityOverride::Warning),
            "informational" | "info" => Ok(SeverityOverride::Informational),
            "ignore" => Ok(SeverityOverride::Ignore),
            "default" => Ok(SeverityOverride::Default),
            _ => Err(LintError::UnknownSeverity(s.to_string())),
        }
    }
}

/// Options controlling which issues are reported and how
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LintOptions {
    /// Issue ids or category names to turn off
    pub disable: Vec<String>,
    /// Issue ids or category names to turn on (including off-by-default issues)
    pub enable: Vec<String>,
    /// When non-empty, only these issue ids or categories are checked
    pub check: Vec<String>,
    /// Issue id or category name -> severity
    pub severity: IndexMap<String, SeverityOverride>,
    /// Report warnings as errors
    pub warnings_as_errors: bool,
    /// Drop warnings entirely
    pub ignore_warnings: bool,
    /// Exit with a failure status when errors are found
    pub abort_on_error: bool,
    /// Append each reported issue's explanation to the output
    pub explain_issues: bool,
    /// Omit source excerpts from text output
    pub no_lines: bool,
}

impl Default for LintOptions {
    fn default() -> Self {
        Self {
            disable: Vec::new(),
            enable: Vec::new(),
            check: Vec::new(),
            severity: IndexMap::new(),
            warnings_as_errors: false,
            ignore_warnings: false,
            abort_on_error: true,
            explain_issues: false,
            no_lines: false,
        }
    }
}

/// Whether `key` names `issue` directly
fn names_issue(key: &str, issue: &Issue) -> bool {
    key.eq_ignore_ascii_case(issue.id)
}

/// Whether `key` names the category of `issue`
fn names_category(key: &str, issue: &Issue) -> bool {
    Category::lookup(key) == Some(issue.category)
}

impl LintOptions {
    /// Whether `issue` should run at all
    pub fn is_enabled(&self, issue: &Issue) -> bool {
        if !self.check.is_empty() {
            return self
                .check
                .iter()
                .any(|k| names_issue(k, issue) || names_category(k, issue));
        }

        // An explicit id beats a category, in either direction
        if self.disable.iter().any(|k| names_issue(k, issue)) {
            return false;
        }
        if self.enable.iter().any(|k| names_issue(k, issue)) {
            return true;
        }
        if self.disable.iter().any(|k| names_category(k, issue)) {
            return false;
        }
        if self.enable.iter().any(|k| names_category(k, issue)) {
            return true;
        }
        issue.enabled_by_default
    }

    /// Configured override for `issue`, preferring an id over its category
    fn severity_override(&self, issue: &Issue) -> Option<SeverityOverride> {
        self.severity
            .iter()
            .find(|(k, _)| names_issue(k, issue))
            .or_else(|| self.severity.iter().find(|(k, _)| names_category(k, issue)))
            .map(|(_, v)| *v)
    }

    /// Effective severity for `issue`, or `None` if it should not be reported
    pub fn effective_severity(&self, issue: &Issue) -> Option<Severity> {
        if !self.is_enabled(issue) {
            return None;
        }
        let severity = match self.severity_override(issue) {
            Some(o) => o.resolve(issue)?,
            None => issue.default_severity,
        };
        self.adjust_warning(severity)
    }

    fn adjust_warning(&self, severity: Severity) -> Option<Severity> {
        if severity != Severity::Warning {
            return Some(severity);
        }
        if self.warnings_as_errors {
            Some(Severity::Error)
        } else if self.ignore_warnings {
            None
        } else {
            Some(severity)
        }
    }

    /// Apply the options to a diagnostic reported for `issue`
    pub fn apply(&self, issue: &Issue, diagnostic: Diagnostic) -> Option<Diagnostic> {
        let severity = self.effective_severity(issue)?;
        if severity == diagnostic.severity {
            return Some(diagnostic);
        }
        Some(diagnostic.with_severity(severity))
    }

    /// Check every referenced id against the registry.
    ///
    /// Unknown names are not fatal; they are returned so callers can warn.
    pub fn unknown_ids(&self, registry: &RuleRegistry) -> Vec<String> {
        self.disable
            .iter()
            .chain(&self.enable)
            .chain(&self.check)
            .chain(self.severity.keys())
            .filter(|k| registry.issue(k).is_none() && Category::lookup(k).is_none())
            .cloned()
            .collect()
    }

    /// Log a warning for every unknown id
    pub fn validate(&self, registry: &RuleRegistry) {
        for id in self.unknown_ids(registry) {
            tracing::warn!(id = %id, "unknown issue id or category in lint options");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::SQLITE_STRING;

    const OFF_BY_DEFAULT: Issue = Issue {
        id: "SQLiteLegacy",
        title: "test",
        explanation: "test",
        category: Category::Performance,
        priority: 1,
        default_severity: Severity::Info,
        enabled_by_default: false,
        more_info: &[],
    };

    #[test]
    fn test_defaults() {
        let options = LintOptions::default();
        assert!(options.abort_on_error);
        assert_eq!(
            options.effective_severity(&SQLITE_STRING),
            Some(Severity::Warning)
        );
        assert_eq!(options.effective_severity(&OFF_BY_DEFAULT), None);
    }

    #[test]
    fn test_disable_by_id_and_category() {
        let by_id = LintOptions {
            disable: vec!["sqlitestring".into()],
            ..Default::default()
        };
        assert!(!by_id.is_enabled(&SQLITE_STRING));

        let by_category = LintOptions {
            disable: vec!["Correctness".into()],
            ..Default::default()
        };
        assert!(!by_category.is_enabled(&SQLITE_STRING));
    }

    #[test]
    fn test_enable_id_beats_disabled_category() {
        let options = LintOptions {
            disable: vec!["correctness".into()],
            enable: vec!["SQLiteString".into()],
            ..Default::default()
        };
        assert!(options.is_enabled(&SQLITE_STRING));
    }

    #[test]
    fn test_enable_off_by_default_issue() {
        let options = LintOptions {
            enable: vec!["performance".into()],
            ..Default::default()
        };
        assert_eq!(
            options.effective_severity(&OFF_BY_DEFAULT),
            Some(Severity::Info)
        );
    }

    #[test]
    fn test_check_restricts_to_listed() {
        let options = LintOptions {
            check: vec!["Security".into()],
            ..Default::default()
        };
        assert!(!options.is_enabled(&SQLITE_STRING));

        let options = LintOptions {
            check: vec!["SQLiteString".into()],
            disable: vec!["SQLiteString".into()],
            ..Default::default()
        };
        assert!(options.is_enabled(&SQLITE_STRING));
    }

    #[test]
    fn test_severity_override_prefers_id() {
        let mut severity = IndexMap::new();
        severity.insert("correctness".to_string(), SeverityOverride::Ignore);
        severity.insert("SQLiteString".to_string(), SeverityOverride::Fatal);
        let options = LintOptions {
            severity,
            ..Default::default()
        };
        assert_eq!(
            options.effective_severity(&SQLITE_STRING),
            Some(Severity::Fatal)
        );
    }

    #[test]
    fn test_ignore_override_drops_issue() {
        let mut severity = IndexMap::new();
        severity.insert("SQLiteString".to_string(), SeverityOverride::Ignore);
        let options = LintOptions {
            severity,
            ..Default::default()
        };
        assert_eq!(options.effective_severity(&SQLITE_STRING), None);
    }

    #[test]
    fn test_warning_adjustments() {
        let as_errors = LintOptions {
            warnings_as_errors: true,
            ignore_warnings: true,
            ..Default::default()
        };
        assert_eq!(
            as_errors.effective_severity(&SQLITE_STRING),
            Some(Severity::Error)
        );

        let ignored = LintOptions {
            ignore_warnings: true,
            ..Default::default()
        };
        assert_eq!(ignored.effective_severity(&SQLITE_STRING), None);
        assert_eq!(
            ignored.effective_severity(&OFF_BY_DEFAULT),
            None,
            "still disabled by default"
        );
    }

    #[test]
    fn test_apply_rewrites_severity() {
        let options = LintOptions {
            warnings_as_errors: true,
            ..Default::default()
        };
        let diagnostic = Diagnostic::new(&SQLITE_STRING, "msg");
        let applied = options.apply(&SQLITE_STRING, diagnostic).unwrap();
        assert_eq!(applied.severity, Severity::Error);
    }

    #[test]
    fn test_unknown_ids() {
        let options = LintOptions {
            disable: vec!["SQLiteString".into(), "Bogus".into()],
            check: vec!["security".into()],
            ..Default::default()
        };
        let registry = RuleRegistry::builtin();
        assert_eq!(options.unknown_ids(&registry), vec!["Bogus".to_string()]);
    }

    #[test]
    fn test_severity_override_from_str() {
        assert_eq!(
            "Info".parse::<SeverityOverride>().unwrap(),
            SeverityOverride::Informational
        );
        assert!("loud".parse::<SeverityOverride>().is_err());
    }
}
