//! Rule capability and the host-facing call-site interface
//!
//! Rules never walk source code themselves. The host discovers calls whose
//! method name a rule registered interest in, resolves the invoked method,
//! and hands both to [`Rule::visit_method_call`] together with a
//! [`LintContext`] giving access to the host's constant evaluator.

mod sqlite_string;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{Diagnostic, Span};
use crate::issue::Issue;

pub use sqlite_string::{defines_string_column, SqliteStringRule, SQLITE_STRING};

/// Opaque handle to an expression owned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(pub usize);

/// A method invocation as seen by a rule
#[derive(Debug, Clone, Copy)]
pub struct MethodCall<'a> {
    pub method_name: &'a str,
    pub arguments: &'a [ExprId],
    pub span: Span,
}

/// The method a call resolved to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedMethod {
    /// Fully qualified declaring class
    pub declaring_class: String,
    pub name: String,
    /// Fully qualified parameter types, e.g. `java.lang.String`
    pub parameter_types: Vec<String>,
}

impl ResolvedMethod {
    pub fn new(
        declaring_class: impl Into<String>,
        name: impl Into<String>,
        parameter_types: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            declaring_class: declaring_class.into(),
            name: name.into(),
            parameter_types: parameter_types.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_member_in_class(&self, class: &str) -> bool {
        self.declaring_class == class
    }

    pub fn parameter_count(&self) -> usize {
        self.parameter_types.len()
    }

    pub fn parameter_has_type(&self, index: usize, ty: &str) -> bool {
        self.parameter_types.get(index).is_some_and(|t| t == ty)
    }
}

/// Best-effort static evaluation of expressions
pub trait ConstantEvaluator {
    /// Resolve an expression to a string value.
    ///
    /// Returns `None` whenever the value is not statically known.
    fn evaluate_string(&self, expr: ExprId) -> Option<String>;
}

/// Destination for diagnostics produced while linting
pub trait ReportSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl ReportSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Per-file context handed to rules
pub struct LintContext<'a> {
    evaluator: &'a dyn ConstantEvaluator,
}

impl<'a> LintContext<'a> {
    pub fn new(evaluator: &'a dyn ConstantEvaluator) -> Self {
        Self { evaluator }
    }

    pub fn evaluator(&self) -> &dyn ConstantEvaluator {
        self.evaluator
    }
}

/// A lint rule invoked by the host for matching method calls
pub trait Rule: Send + Sync {
    /// The issue this rule reports
    fn issue(&self) -> &'static Issue;

    /// Method names this rule wants to be invoked for
    fn applicable_method_names(&self) -> &'static [&'static str];

    /// Inspect a call and return a diagnostic if the rule applies
    fn visit_method_call(
        &self,
        ctx: &LintContext<'_>,
        call: &MethodCall<'_>,
        method: &ResolvedMethod,
    ) -> Option<Diagnostic>;
}

/// Registry of all rules, indexed by the method names they listen for
pub struct RuleRegistry {
    rules: Vec<Box<dyn Rule>>,
    by_method: IndexMap<&'static str, Vec<usize>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            by_method: IndexMap::new(),
        }
    }

    /// Registry with every built-in rule
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(SqliteStringRule));
        registry
    }

    pub fn register(&mut self, rule: Box<dyn Rule>) {
        let index = self.rules.len();
        for name in rule.applicable_method_names() {
            self.by_method.entry(*name).or_default().push(index);
        }
        self.rules.push(rule);
    }

    /// Rules interested in calls to `method_name`
    pub fn rules_for_method<'r>(&'r self, method_name: &str) -> impl Iterator<Item = &'r dyn Rule> {
        self.by_method
            .get(method_name)
            .into_iter()
            .flatten()
            .map(move |&i| self.rules[i].as_ref())
    }

    /// Whether any rule listens for `method_name`
    pub fn is_applicable_method(&self, method_name: &str) -> bool {
        self.by_method.contains_key(method_name)
    }

    /// All method names any rule listens for
    pub fn method_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.by_method.keys().copied()
    }

    pub fn issues(&self) -> impl Iterator<Item = &'static Issue> + '_ {
        self.rules.iter().map(|r| r.issue())
    }

    /// Look up an issue by id, ignoring case
    pub fn issue(&self, id: &str) -> Option<&'static Issue> {
        self.issues().find(|i| i.id.eq_ignore_ascii_case(id))
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_indexes_exec_sql() {
        let registry = RuleRegistry::builtin();
        assert!(registry.is_applicable_method("execSQL"));
        assert!(!registry.is_applicable_method("rawQuery"));
        assert_eq!(registry.rules_for_method("execSQL").count(), 1);
        assert_eq!(registry.method_names().collect::<Vec<_>>(), vec!["execSQL"]);
    }

    #[test]
    fn test_issue_lookup() {
        let registry = RuleRegistry::builtin();
        let issue = registry.issue("sqlitestring").unwrap();
        assert_eq!(issue.id, "SQLiteString");
        assert!(registry.issue("NoSuchIssue").is_none());
    }

    #[test]
    fn test_resolved_method_accessors() {
        let method = ResolvedMethod::new(
            "android.database.sqlite.SQLiteDatabase",
            "execSQL",
            ["java.lang.String", "java.lang.Object[]"],
        );
        assert!(method.is_member_in_class("android.database.sqlite.SQLiteDatabase"));
        assert!(!method.is_member_in_class("SQLiteDatabase"));
        assert_eq!(method.parameter_count(), 2);
        assert!(method.parameter_has_type(0, "java.lang.String"));
        assert!(!method.parameter_has_type(1, "java.lang.String"));
        assert!(!method.parameter_has_type(2, "java.lang.String"));
    }
}
