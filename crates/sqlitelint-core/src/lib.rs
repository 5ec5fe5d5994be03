//! sqlitelint-core: lint rules for SQL embedded in Android code
//!
//! Rules inspect `execSQL`-style calls in Java and Kotlin sources. The
//! host side of this crate finds those calls, resolves the invoked method
//! against a catalog of known classes, folds string constants, and hands
//! each call to the rules that asked for it.

pub mod catalog;
pub mod error;
pub mod issue;
pub mod language;
pub mod linter;
pub mod options;
pub mod rule;
pub mod source;
pub mod sql;

pub use catalog::{ClassDef, MethodDef, TypeCatalog};
pub use error::{Diagnostic, LintError, Result, Severity, Span};
pub use issue::{Category, Issue};
pub use language::SourceLanguage;
pub use linter::{CallReport, FileReport, Linter};
pub use options::{LintOptions, SeverityOverride};
pub use rule::{
    ConstantEvaluator, ExprId, LintContext, MethodCall, ReportSink, ResolvedMethod, Rule,
    RuleRegistry,
};
pub use source::SourceFile;
