//! Constant folding for string expressions
//!
//! Handles literals, `+` chains, parentheses and references to names with
//! a single constant initializer. Anything else evaluates to nothing.

use crate::language::SourceLanguage;
use crate::rule::{ConstantEvaluator, ExprId};

use super::lexer::{Token, TokenKind};
use super::{matching_close, SourceFile};

/// Bound on nested name lookups and parentheses
const MAX_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Str(String),
    Int(i64),
    Char(char),
    Bool(bool),
}

impl Value {
    fn text(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Int(n) => n.to_string(),
            Value::Char(c) => c.to_string(),
            Value::Bool(b) => b.to_string(),
        }
    }

    fn code(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Char(c) => Some(*c as i64),
            _ => None,
        }
    }

    /// `self + other`, left to right: numbers add until a string appears
    fn plus(self, other: Value, language: SourceLanguage) -> Option<Value> {
        match (self, other) {
            (Value::Str(mut a), b) => {
                a.push_str(&b.text());
                Some(Value::Str(a))
            }
            (a, Value::Str(b)) => Some(Value::Str(a.text() + &b)),
            (Value::Char(c), Value::Int(n)) if language == SourceLanguage::Kotlin => {
                let code = u32::try_from(c as i64 + n).ok()?;
                char::from_u32(code).map(Value::Char)
            }
            (a, b) => Some(Value::Int(a.code()?.wrapping_add(b.code()?))),
        }
    }
}

impl ConstantEvaluator for SourceFile {
    fn evaluate_string(&self, expr: ExprId) -> Option<String> {
        let range = self.expr_range(expr)?;
        let mut folder = Folder {
            file: self,
            visiting: Vec::new(),
        };
        match folder.eval(&self.tokens()[range], 0)? {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

struct Folder<'f> {
    file: &'f SourceFile,
    /// Names currently being resolved
    visiting: Vec<&'f str>,
}

impl<'f> Folder<'f> {
    /// Fold a whole token slice; trailing unparsed tokens mean no value
    fn eval(&mut self, tokens: &'f [Token], depth: usize) -> Option<Value> {
        if depth > MAX_DEPTH {
            tracing::debug!("constant evaluation exceeded depth limit");
            return None;
        }
        let mut pos = 0;
        let mut acc = self.term(tokens, &mut pos, depth)?;
        while tokens.get(pos).is_some_and(|t| t.is_punct("+")) {
            pos += 1;
            let rhs = self.term(tokens, &mut pos, depth)?;
            acc = acc.plus(rhs, self.file.language())?;
        }
        (pos == tokens.len()).then_some(acc)
    }

    fn term(&mut self, tokens: &'f [Token], pos: &mut usize, depth: usize) -> Option<Value> {
        let token = tokens.get(*pos)?;
        *pos += 1;
        let value = match &token.kind {
            TokenKind::Punct("-") => {
                let operand = self.term(tokens, pos, depth)?;
                return Some(Value::Int(operand.code()?.wrapping_neg()));
            }
            TokenKind::Punct("+") => {
                let operand = self.term(tokens, pos, depth)?;
                return Some(Value::Int(operand.code()?));
            }
            TokenKind::Punct("(") => {
                let close = matching_close(tokens, *pos - 1)?;
                let inner = self.eval(&tokens[*pos..close], depth + 1)?;
                *pos = close + 1;
                inner
            }
            TokenKind::Str {
                interpolated: true, ..
            } => return None,
            TokenKind::Str { value, .. } => Value::Str(value.clone()),
            TokenKind::Char(c) => Value::Char(*c),
            TokenKind::Int(n) => Value::Int(*n),
            TokenKind::Ident(word) if word == "true" || word == "false" => {
                Value::Bool(word == "true")
            }
            TokenKind::Ident(_) => {
                let name = self.qualified_name(tokens, pos);
                self.lookup(name, depth)?
            }
            _ => return None,
        };
        self.postfix(value, tokens, pos, depth)
    }

    /// Consume `.segment` parts of a qualified name whose first segment was
    /// just read; returns the last segment
    fn qualified_name(&self, tokens: &'f [Token], pos: &mut usize) -> &'f str {
        let mut name = tokens[*pos - 1].ident().unwrap_or_default();
        while tokens.get(*pos).is_some_and(|t| t.is_punct(".")) {
            let Some(segment) = tokens.get(*pos + 1).and_then(Token::ident) else {
                break;
            };
            if tokens.get(*pos + 2).is_some_and(|t| t.is_punct("(")) {
                break;
            }
            name = segment;
            *pos += 2;
        }
        name
    }

    fn lookup(&mut self, name: &'f str, depth: usize) -> Option<Value> {
        if self.visiting.contains(&name) {
            tracing::debug!(name, "cyclic constant reference");
            return None;
        }
        let file = self.file;
        let range = file.symbols().initializer(name)?;
        self.visiting.push(name);
        let value = self.eval(&file.tokens()[range], depth + 1);
        self.visiting.pop();
        value
    }

    /// Kotlin `.trimIndent()` and `.trimMargin()` on a folded string
    fn postfix(
        &mut self,
        mut value: Value,
        tokens: &'f [Token],
        pos: &mut usize,
        depth: usize,
    ) -> Option<Value> {
        if self.file.language() != SourceLanguage::Kotlin {
            return Some(value);
        }
        loop {
            let open = *pos + 2;
            let is_call = tokens.get(*pos).is_some_and(|t| t.is_punct("."))
                && tokens.get(open).is_some_and(|t| t.is_punct("("));
            let Some(method) = tokens.get(*pos + 1).and_then(Token::ident) else {
                return Some(value);
            };
            if !is_call {
                return Some(value);
            }
            let close = matching_close(tokens, open)?;
            let Value::Str(text) = &value else {
                return None;
            };
            let args = &tokens[open + 1..close];
            value = match method {
                "trimIndent" if args.is_empty() => Value::Str(trim_indent(text)),
                "trimMargin" if args.is_empty() => Value::Str(trim_margin(text, "|")),
                "trimMargin" => match self.eval(args, depth + 1)? {
                    Value::Str(prefix) if !prefix.trim().is_empty() => {
                        Value::Str(trim_margin(text, &prefix))
                    }
                    _ => return None,
                },
                _ => return None,
            };
            *pos = close + 1;
        }
    }
}

fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

/// Drop a blank first and last line, then apply `f` to every line
fn reindent(text: &str, f: impl Fn(&str) -> String) -> String {
    let lines = split_lines(text);
    let last = lines.len() - 1;
    lines
        .iter()
        .enumerate()
        .filter(|(i, line)| !((*i == 0 || *i == last) && line.trim().is_empty()))
        .map(|(_, line)| f(line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn indent_width(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// Kotlin `String.trimIndent()`
fn trim_indent(text: &str) -> String {
    let indent = split_lines(text)
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| indent_width(line))
        .min()
        .unwrap_or(0);
    reindent(text, |line| line.chars().skip(indent).collect())
}

/// Kotlin `String.trimMargin(prefix)`
fn trim_margin(text: &str, prefix: &str) -> String {
    reindent(text, |line| {
        let content = line.trim_start();
        match content.strip_prefix(prefix) {
            Some(rest) => rest.to_string(),
            None => line.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    /// Fold the first argument of the last `execSQL` call
    fn fold(source: &str, language: SourceLanguage) -> Option<String> {
        let file = SourceFile::parse(source, language);
        let call = file
            .calls()
            .iter()
            .rev()
            .find(|c| c.method_name == "execSQL")
            .expect("no execSQL call");
        file.evaluate_string(call.arguments[0])
    }

    fn java(source: &str) -> Option<String> {
        fold(source, SourceLanguage::Java)
    }

    fn kotlin(source: &str) -> Option<String> {
        fold(source, SourceLanguage::Kotlin)
    }

    #[test]
    fn test_literal() {
        assert_eq!(
            java(r#"db.execSQL("CREATE TABLE t (a STRING)");"#),
            Some("CREATE TABLE t (a STRING)".into())
        );
    }

    #[test]
    fn test_concatenation_with_constants() {
        let source = r#"
            class Db {
                private static final String TABLE = "notes";
                private static final String COLUMNS = "(id INTEGER, body " + "STRING)";
                void onCreate(SQLiteDatabase db) {
                    db.execSQL("CREATE TABLE " + TABLE + " " + COLUMNS);
                }
            }
        "#;
        assert_eq!(
            java(source),
            Some("CREATE TABLE notes (id INTEGER, body STRING)".into())
        );
    }

    #[test]
    fn test_qualified_constant() {
        let source = r#"
            class Schema { static final String CREATE = "CREATE TABLE t (a STRING)"; }
            class Db { void f(SQLiteDatabase db) { db.execSQL(Schema.CREATE); } }
        "#;
        assert_eq!(java(source), Some("CREATE TABLE t (a STRING)".into()));
    }

    #[test]
    fn test_java_numeric_promotion() {
        assert_eq!(java(r#"db.execSQL(1 + 2 + "x");"#), Some("3x".into()));
        assert_eq!(java(r#"db.execSQL("x" + 1 + 2);"#), Some("x12".into()));
        assert_eq!(java(r#"db.execSQL("x" + (1 + 2));"#), Some("x3".into()));
        assert_eq!(java(r#"db.execSQL('a' + 1 + "");"#), Some("98".into()));
        assert_eq!(java(r#"db.execSQL("a" + 'b' + true);"#), Some("abtrue".into()));
        assert_eq!(java(r#"db.execSQL("v" + -1);"#), Some("v-1".into()));
    }

    #[test]
    fn test_non_string_result_is_none() {
        assert_eq!(java("db.execSQL(1 + 2);"), None);
    }

    #[test]
    fn test_unknown_values_are_none() {
        assert_eq!(java(r#"db.execSQL(build() + "x");"#), None);
        assert_eq!(java(r#"db.execSQL(flag ? "a" : "b");"#), None);
        assert_eq!(java(r#"db.execSQL("a" + 1.5);"#), None);
        assert_eq!(java(r#"db.execSQL(String.format("%s", t));"#), None);
        assert_eq!(java("void f(String sql) { db.execSQL(sql); }"), None);
    }

    #[test]
    fn test_reassigned_name_is_none() {
        let source = r#"void f() { String sql = "CREATE TABLE t (a TEXT)"; sql += ", b STRING"; db.execSQL(sql); }"#;
        assert_eq!(java(source), None);
    }

    #[test]
    fn test_cycle_is_none() {
        let source = r#"static final String A = B + "x"; static final String B = A; void f() { db.execSQL(A); }"#;
        assert_eq!(java(source), None);
    }

    #[test]
    fn test_kotlin_constants() {
        let source = "const val TABLE = \"notes\"\nfun f(db: SQLiteDatabase) {\n  val sql = \"CREATE TABLE \" + TABLE +\n    \" (a STRING)\"\n  db.execSQL(sql)\n}";
        assert_eq!(kotlin(source), Some("CREATE TABLE notes (a STRING)".into()));
    }

    #[test]
    fn test_kotlin_template_is_none() {
        let source = "val t = \"notes\"\nfun f() { db.execSQL(\"CREATE TABLE $t (a STRING)\") }";
        assert_eq!(kotlin(source), None);
    }

    #[test]
    fn test_kotlin_trim_indent() {
        let source = "fun f() {\n  db.execSQL(\"\"\"\n    CREATE TABLE t (\n      a STRING\n    )\n  \"\"\".trimIndent())\n}";
        assert_eq!(
            kotlin(source),
            Some("CREATE TABLE t (\n  a STRING\n)".into())
        );
    }

    #[test]
    fn test_kotlin_trim_margin() {
        let source = "val sql = \"\"\"\n  |CREATE TABLE t (\n  |  a STRING)\n\"\"\".trimMargin()\nfun f() { db.execSQL(sql) }";
        assert_eq!(kotlin(source), Some("CREATE TABLE t (\n  a STRING)".into()));

        let custom = "fun f() { db.execSQL(\"\"\"\n  #CREATE TABLE t (a STRING)\n\"\"\".trimMargin(\"#\")) }";
        assert_eq!(kotlin(custom), Some("CREATE TABLE t (a STRING)".into()));
    }

    #[test]
    fn test_trim_helpers() {
        assert_eq!(trim_indent("\n  a\n    b\n  "), "a\n  b");
        assert_eq!(trim_indent("x"), "x");
        assert_eq!(trim_margin("  |a\n  b", "|"), "a\n  b");
    }

    #[test]
    fn test_java_ignores_kotlin_postfix() {
        assert_eq!(java(r#"db.execSQL("a".trimIndent());"#), None);
    }
}
