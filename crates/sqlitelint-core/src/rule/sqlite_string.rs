//! SQLiteString: column declared as `STRING` instead of `TEXT`
//!
//! SQLite has no `STRING` storage class. A column declared `STRING` gets
//! NUMERIC affinity, so values that look like numbers are silently
//! converted on insert.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Diagnostic, Severity};
use crate::issue::{Category, Issue};
use crate::sql::string_columns;

use super::{LintContext, MethodCall, ResolvedMethod, Rule};

const EXPLANATION: &str = "In SQLite, any column can store any data type; the declared type for a column \
is more of a hint as to what the data should be cast to when stored.\n\
\n\
There are many ways to store a string. `TEXT`, `VARCHAR`, `CHARACTER` and `CLOB` \
are string types, **but `STRING` is not**. Columns defined as STRING are actually \
numeric.\n\
\n\
If you try to store a value in a numeric column, SQLite will try to cast it to a \
float or an integer before storing. If it can't, it will just store it as a \
string.\n\
\n\
This can lead to some subtle bugs. For example, when SQLite encounters a string \
like `1234567e1234`, it will parse it as a float, but the result will be out of \
range for floating point numbers, so `Inf` will be stored! Similarly, strings \
that look like integers will lose leading zeroes.\n\
\n\
To fix this, you can change your schema to use a `TEXT` type instead.";

pub static SQLITE_STRING: Issue = Issue {
    id: "SQLiteString",
    title: "Using STRING instead of TEXT",
    explanation: EXPLANATION,
    category: Category::Correctness,
    priority: 5,
    default_severity: Severity::Warning,
    enabled_by_default: true,
    more_info: &["https://www.sqlite.org/datatype3.html"],
};

const MESSAGE: &str = "Using column type STRING; did you mean to use TEXT? \
(STRING is a numeric type and its value can be adjusted; for example, \
strings that look like integers can drop leading zeroes. See issue \
explanation for details.)";

const EXEC_SQL: &str = "execSQL";
const SQLITE_DATABASE: &str = "android.database.sqlite.SQLiteDatabase";
const TYPE_STRING: &str = "java.lang.String";

fn string_keyword() -> &'static Regex {
    static STRING_KEYWORD: OnceLock<Regex> = OnceLock::new();
    STRING_KEYWORD.get_or_init(|| Regex::new(r"\bSTRING\b").expect("invalid built-in regex"))
}

/// Whether `sql` is a table definition that declares a `STRING` column.
///
/// Matching is textual: the statement must start with `CREATE TABLE` or
/// `ALTER TABLE` exactly as written, and `STRING` must appear as a whole
/// upper-case word.
pub fn defines_string_column(sql: &str) -> bool {
    (sql.starts_with("CREATE TABLE") || sql.starts_with("ALTER TABLE"))
        && string_keyword().is_match(sql)
}

/// Flags `SQLiteDatabase.execSQL` calls whose SQL declares a `STRING` column
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteStringRule;

impl Rule for SqliteStringRule {
    fn issue(&self) -> &'static Issue {
        &SQLITE_STRING
    }

    fn applicable_method_names(&self) -> &'static [&'static str] {
        &[EXEC_SQL]
    }

    fn visit_method_call(
        &self,
        ctx: &LintContext<'_>,
        call: &MethodCall<'_>,
        method: &ResolvedMethod,
    ) -> Option<Diagnostic> {
        if !method.is_member_in_class(SQLITE_DATABASE) {
            tracing::trace!(class = %method.declaring_class, "execSQL on another class");
            return None;
        }
        if method.parameter_count() == 0 || !method.parameter_has_type(0, TYPE_STRING) {
            return None;
        }

        let argument = *call.arguments.first()?;
        let Some(sql) = ctx.evaluator().evaluate_string(argument) else {
            tracing::debug!(line = call.span.line, "execSQL argument is not a constant");
            return None;
        };
        if !defines_string_column(&sql) {
            return None;
        }

        let mut diagnostic = Diagnostic::new(&SQLITE_STRING, MESSAGE).with_span(call.span);
        let columns = string_columns(&sql);
        if !columns.is_empty() {
            let names = columns
                .iter()
                .map(|c| format!("'{}'", c))
                .collect::<Vec<_>>()
                .join(", ");
            let help = if columns.len() == 1 {
                format!("column {names} is declared as STRING; declare it as TEXT")
            } else {
                format!("columns {names} are declared as STRING; declare them as TEXT")
            };
            diagnostic = diagnostic.with_help(help);
        }
        Some(diagnostic)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::Span;
    use crate::rule::{ConstantEvaluator, ExprId};

    /// Evaluator backed by a fixed table of expression values
    struct Constants(HashMap<usize, String>);

    impl Constants {
        fn single(sql: &str) -> Self {
            Self(HashMap::from([(0, sql.to_string())]))
        }

        fn unresolved() -> Self {
            Self(HashMap::new())
        }
    }

    impl ConstantEvaluator for Constants {
        fn evaluate_string(&self, expr: ExprId) -> Option<String> {
            self.0.get(&expr.0).cloned()
        }
    }

    fn exec_sql() -> ResolvedMethod {
        ResolvedMethod::new(SQLITE_DATABASE, "execSQL", [TYPE_STRING])
    }

    fn check(evaluator: &Constants, method: &ResolvedMethod) -> Option<Diagnostic> {
        let ctx = LintContext::new(evaluator);
        let call = MethodCall {
            method_name: "execSQL",
            arguments: &[ExprId(0)],
            span: Span::at(42, 30, 3, 9),
        };
        SqliteStringRule.visit_method_call(&ctx, &call, method)
    }

    #[test]
    fn test_create_table_with_string_column() {
        let diagnostic = check(
            &Constants::single("CREATE TABLE t (name STRING)"),
            &exec_sql(),
        )
        .expect("expected a diagnostic");

        assert_eq!(diagnostic.issue, "SQLiteString");
        assert_eq!(diagnostic.severity, Severity::Warning);
        assert_eq!(diagnostic.span, Some(Span::at(42, 30, 3, 9)));
        assert!(diagnostic.message.contains("did you mean to use TEXT?"));
        assert_eq!(
            diagnostic.help.as_deref(),
            Some("column 'name' is declared as STRING; declare it as TEXT")
        );
    }

    #[test]
    fn test_alter_table_add_string_column() {
        let diagnostic = check(
            &Constants::single("ALTER TABLE t ADD COLUMN x STRING"),
            &exec_sql(),
        );
        assert!(diagnostic.is_some());
    }

    #[test]
    fn test_text_column_is_fine() {
        assert_eq!(
            check(&Constants::single("CREATE TABLE t (name TEXT)"), &exec_sql()),
            None
        );
    }

    #[test]
    fn test_word_boundary_rejects_longer_identifiers() {
        for sql in [
            "CREATE TABLE t (description STRINGENCY)",
            "CREATE TABLE t (x MYSTRING)",
            "CREATE TABLE t (STRING_VALUE INTEGER)",
        ] {
            assert_eq!(check(&Constants::single(sql), &exec_sql()), None, "{sql}");
        }
    }

    #[test]
    fn test_keyword_is_case_sensitive() {
        assert_eq!(
            check(&Constants::single("CREATE TABLE t (name string)"), &exec_sql()),
            None
        );
        assert_eq!(
            check(&Constants::single("create table t (name STRING)"), &exec_sql()),
            None
        );
    }

    #[test]
    fn test_prefix_is_not_trimmed() {
        assert_eq!(
            check(&Constants::single("  CREATE TABLE t (name STRING)"), &exec_sql()),
            None
        );
    }

    #[test]
    fn test_other_statements_are_ignored() {
        assert_eq!(
            check(
                &Constants::single("INSERT INTO t VALUES ('STRING')"),
                &exec_sql()
            ),
            None
        );
    }

    #[test]
    fn test_multiline_sql_is_flagged() {
        let sql = "CREATE TABLE notes (\n  _id INTEGER PRIMARY KEY,\n  body STRING\n)";
        assert!(check(&Constants::single(sql), &exec_sql()).is_some());
    }

    #[test]
    fn test_unresolved_argument_is_ignored() {
        assert_eq!(check(&Constants::unresolved(), &exec_sql()), None);
    }

    #[test]
    fn test_other_class_is_ignored() {
        let method = ResolvedMethod::new(
            "androidx.sqlite.db.SupportSQLiteDatabase",
            "execSQL",
            [TYPE_STRING],
        );
        assert_eq!(
            check(&Constants::single("CREATE TABLE t (name STRING)"), &method),
            None
        );
    }

    #[test]
    fn test_non_string_first_parameter_is_ignored() {
        let method = ResolvedMethod::new(SQLITE_DATABASE, "execSQL", ["byte[]"]);
        assert_eq!(
            check(&Constants::single("CREATE TABLE t (name STRING)"), &method),
            None
        );

        let no_params = ResolvedMethod::new(SQLITE_DATABASE, "execSQL", Vec::<String>::new());
        assert_eq!(
            check(&Constants::single("CREATE TABLE t (name STRING)"), &no_params),
            None
        );
    }

    #[test]
    fn test_call_without_arguments_is_ignored() {
        let evaluator = Constants::single("CREATE TABLE t (name STRING)");
        let ctx = LintContext::new(&evaluator);
        let call = MethodCall {
            method_name: "execSQL",
            arguments: &[],
            span: Span::new(0, 10),
        };
        assert_eq!(SqliteStringRule.visit_method_call(&ctx, &call, &exec_sql()), None);
    }

    #[test]
    fn test_evaluation_is_repeatable() {
        let evaluator = Constants::single("CREATE TABLE t (a STRING, b STRING)");
        let first = check(&evaluator, &exec_sql());
        let second = check(&evaluator, &exec_sql());
        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(
            first.and_then(|d| d.help).as_deref(),
            Some("columns 'a', 'b' are declared as STRING; declare them as TEXT")
        );
    }

    #[test]
    fn test_unparseable_sql_still_flagged_without_help() {
        let diagnostic = check(
            &Constants::single("CREATE TABLE t (name STRING"),
            &exec_sql(),
        )
        .expect("textual match should still apply");
        assert_eq!(diagnostic.help, None);
    }

    #[test]
    fn test_defines_string_column() {
        assert!(defines_string_column("CREATE TABLE t (a STRING)"));
        assert!(defines_string_column("ALTER TABLE t ADD COLUMN a STRING"));
        assert!(defines_string_column("CREATE TABLE t (a STRING(20))"));
        assert!(!defines_string_column("CREATE INDEX STRING ON t (a)"));
        assert!(!defines_string_column("CREATE TABLE t (a VARCHAR)"));
    }
}
