//! Source language support

use std::path::Path;
use std::str::FromStr;

use crate::error::LintError;

/// Supported source languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceLanguage {
    #[default]
    Java,
    Kotlin,
}

impl SourceLanguage {
    /// Detect the language from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "java" => Some(SourceLanguage::Java),
            "kt" | "kts" => Some(SourceLanguage::Kotlin),
            _ => None,
        }
    }

    /// Glob suffixes matching files of any supported language
    pub fn extensions() -> &'static [&'static str] {
        &["java", "kt", "kts"]
    }

    /// Whether statements may end at a line break instead of `;`
    pub fn has_optional_semicolons(&self) -> bool {
        matches!(self, SourceLanguage::Kotlin)
    }

    /// Whether `"...$name..."` string templates are interpolated
    pub fn has_string_templates(&self) -> bool {
        matches!(self, SourceLanguage::Kotlin)
    }
}

impl FromStr for SourceLanguage {
    type Err = LintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "java" => Ok(SourceLanguage::Java),
            "kotlin" | "kt" => Ok(SourceLanguage::Kotlin),
            _ => Err(LintError::UnknownLanguage(s.to_string())),
        }
    }
}

impl std::fmt::Display for SourceLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceLanguage::Java => write!(f, "java"),
            SourceLanguage::Kotlin => write!(f, "kotlin"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        assert_eq!(
            SourceLanguage::from_path(Path::new("app/src/Db.java")),
            Some(SourceLanguage::Java)
        );
        assert_eq!(
            SourceLanguage::from_path(Path::new("Db.kt")),
            Some(SourceLanguage::Kotlin)
        );
        assert_eq!(SourceLanguage::from_path(Path::new("schema.sql")), None);
        assert_eq!(SourceLanguage::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("KT".parse::<SourceLanguage>().unwrap(), SourceLanguage::Kotlin);
        assert!(matches!(
            "scala".parse::<SourceLanguage>(),
            Err(LintError::UnknownLanguage(_))
        ));
    }
}
