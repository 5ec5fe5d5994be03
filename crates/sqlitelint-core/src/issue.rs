//! Issue metadata registered by rules

use serde::{Deserialize, Serialize};

use crate::error::Severity;

/// Broad grouping of issues, usable wherever an issue id is accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Correctness,
    Security,
    Performance,
    Usability,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Correctness,
        Category::Security,
        Category::Performance,
        Category::Usability,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Correctness => "Correctness",
            Category::Security => "Security",
            Category::Performance => "Performance",
            Category::Usability => "Usability",
        }
    }

    /// Look up a category by name, ignoring case
    pub fn lookup(name: &str) -> Option<Category> {
        Category::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Static description of a problem a rule can report.
///
/// Issues are declared as `static` items next to the rule that reports
/// them and registered once through [`crate::rule::RuleRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// Stable identifier used in configuration and suppressions
    pub id: &'static str,
    /// One-line summary
    pub title: &'static str,
    /// Long-form explanation (markdown-ish, backticks and `**` emphasis)
    pub explanation: &'static str,
    pub category: Category,
    /// 1 (lowest) to 10 (highest)
    pub priority: u8,
    pub default_severity: Severity,
    pub enabled_by_default: bool,
    /// Reference URLs
    pub more_info: &'static [&'static str],
}

impl Issue {
    /// Explanation with markup stripped, for terminal output
    pub fn plain_explanation(&self) -> String {
        self.explanation.replace("**", "").replace('`', "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_lookup_ignores_case() {
        assert_eq!(Category::lookup("correctness"), Some(Category::Correctness));
        assert_eq!(Category::lookup("SECURITY"), Some(Category::Security));
        assert_eq!(Category::lookup("SQLiteString"), None);
    }
}
