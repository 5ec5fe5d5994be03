//! Source files - tokens, symbols and the method calls found in them
//!
//! This is a lightweight front end for Java and Kotlin. It does not build
//! a syntax tree; calls and declarations are recognized from token shapes
//! and anything it cannot recognize is simply left unresolved.

mod constant;
pub mod lexer;
mod suppress;
pub mod symbols;

use std::ops::Range;

use crate::error::Span;
use crate::language::SourceLanguage;
use crate::rule::ExprId;

pub use lexer::{tokenize, Token, TokenKind};
pub use suppress::Suppressions;
pub use symbols::Symbols;

/// A `receiver.method(args)` call in a source file
#[derive(Debug, Clone)]
pub struct CallExpr {
    pub method_name: String,
    /// Token range of the receiver expression
    pub receiver: Range<usize>,
    pub arguments: Vec<ExprId>,
    /// From the start of the receiver to the closing parenthesis
    pub span: Span,
}

/// A parsed source file
#[derive(Debug, Clone)]
pub struct SourceFile {
    language: SourceLanguage,
    text: String,
    /// Code tokens, comments removed
    tokens: Vec<Token>,
    comments: Vec<Token>,
    symbols: Symbols,
    /// Token range of every expression handed out as an `ExprId`
    exprs: Vec<Range<usize>>,
    calls: Vec<CallExpr>,
}

impl SourceFile {
    pub fn parse(text: impl Into<String>, language: SourceLanguage) -> Self {
        let text = text.into();
        let (comments, tokens): (Vec<Token>, Vec<Token>) = tokenize(&text, language)
            .into_iter()
            .partition(Token::is_comment);
        let symbols = Symbols::collect(&tokens, language);

        let mut file = Self {
            language,
            text,
            tokens,
            comments,
            symbols,
            exprs: Vec::new(),
            calls: Vec::new(),
        };
        file.discover_calls();
        tracing::trace!(
            language = %language,
            tokens = file.tokens.len(),
            calls = file.calls.len(),
            "parsed source file"
        );
        file
    }

    pub fn language(&self) -> SourceLanguage {
        self.language
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn comments(&self) -> &[Token] {
        &self.comments
    }

    pub fn symbols(&self) -> &Symbols {
        &self.symbols
    }

    pub fn calls(&self) -> &[CallExpr] {
        &self.calls
    }

    /// Token range behind an expression handle
    pub fn expr_range(&self, expr: ExprId) -> Option<Range<usize>> {
        self.exprs.get(expr.0).cloned()
    }

    pub fn expr_tokens(&self, expr: ExprId) -> &[Token] {
        match self.expr_range(expr) {
            Some(range) => &self.tokens[range],
            None => &[],
        }
    }

    /// Source text covered by a token range
    pub fn snippet(&self, range: Range<usize>) -> &str {
        let tokens = &self.tokens[range];
        match (tokens.first(), tokens.last()) {
            (Some(first), Some(last)) => &self.text[first.span.offset..last.span.end()],
            _ => "",
        }
    }

    fn discover_calls(&mut self) {
        let tokens = &self.tokens;
        let mut exprs = Vec::new();
        let mut calls = Vec::new();
        for i in 1..tokens.len() {
            let Some(name) = tokens[i].ident() else {
                continue;
            };
            let member = tokens[i - 1].is_punct(".") || tokens[i - 1].is_punct("?.");
            if !member || !tokens.get(i + 1).is_some_and(|t| t.is_punct("(")) {
                continue;
            }
            let start = receiver_start(tokens, i - 1);
            if start == i - 1 {
                continue;
            }
            let Some(close) = matching_close(tokens, i + 1) else {
                continue;
            };
            let arguments = split_arguments(tokens, i + 2, close)
                .into_iter()
                .map(|range| {
                    exprs.push(range);
                    ExprId(exprs.len() - 1)
                })
                .collect();
            calls.push(CallExpr {
                method_name: name.to_string(),
                receiver: start..i - 1,
                arguments,
                span: tokens[start].span.to(tokens[close].span),
            });
        }
        self.exprs = exprs;
        self.calls = calls;
    }
}

/// Words that may precede a parenthesized receiver without calling it
const KEYWORDS: &[&str] = &[
    "return", "if", "while", "for", "switch", "when", "synchronized", "catch", "throw", "in",
    "is", "as", "else", "do", "try", "assert", "yield", "case",
];

/// First token of the receiver whose member-access operator is at `dot`
fn receiver_start(tokens: &[Token], dot: usize) -> usize {
    let mut k = dot;
    loop {
        let Some(j) = k.checked_sub(1) else {
            return k;
        };
        let t = &tokens[j];
        if t.is_punct("!!") {
            k = j;
            continue;
        }
        if t.is_punct(")") || t.is_punct("]") {
            let Some(open) = matching_open(tokens, j) else {
                return k;
            };
            k = open;
            let callee = open.checked_sub(1).and_then(|c| tokens[c].ident());
            if callee.is_some_and(|name| !KEYWORDS.contains(&name)) {
                k = open - 1;
            }
        } else if t.ident().is_some()
            || matches!(
                t.kind,
                TokenKind::Str { .. } | TokenKind::Char(_) | TokenKind::Int(_) | TokenKind::Number(_)
            )
        {
            k = j;
        } else {
            return k;
        }
        match k.checked_sub(1) {
            Some(p) if tokens[p].is_punct(".") || tokens[p].is_punct("?.") => k = p,
            _ => return k,
        }
    }
}

/// Split `start..end` on depth-0 commas. Kotlin named arguments
/// (`name = value`) yield just the value.
fn split_arguments(tokens: &[Token], start: usize, end: usize) -> Vec<Range<usize>> {
    let mut arguments = Vec::new();
    let mut arg_start = start;
    let mut i = start;
    while i < end {
        let t = &tokens[i];
        if t.is_punct("(") || t.is_punct("[") || t.is_punct("{") {
            i = matching_close(tokens, i).map_or(end, |close| close + 1);
            continue;
        }
        if t.is_punct(",") {
            arguments.push(arg_start..i);
            arg_start = i + 1;
        }
        i += 1;
    }
    arguments.push(arg_start..end);

    arguments
        .into_iter()
        .filter(|range| !range.is_empty())
        .map(|range| {
            let named = tokens[range.start].ident().is_some()
                && tokens.get(range.start + 1).is_some_and(|t| t.is_punct("="))
                && range.len() > 2;
            if named {
                range.start + 2..range.end
            } else {
                range
            }
        })
        .collect()
}

fn closer_of(open: &Token) -> Option<&'static str> {
    match &open.kind {
        TokenKind::Punct("(") => Some(")"),
        TokenKind::Punct("[") => Some("]"),
        TokenKind::Punct("{") => Some("}"),
        _ => None,
    }
}

fn opener_of(close: &Token) -> Option<&'static str> {
    match &close.kind {
        TokenKind::Punct(")") => Some("("),
        TokenKind::Punct("]") => Some("["),
        TokenKind::Punct("}") => Some("{"),
        _ => None,
    }
}

/// Index of the bracket closing the one at `open`
pub(crate) fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
    let opener = match &tokens.get(open)?.kind {
        TokenKind::Punct(p) => *p,
        _ => return None,
    };
    let closer = closer_of(&tokens[open])?;
    let mut depth = 0usize;
    for (k, t) in tokens.iter().enumerate().skip(open) {
        if t.is_punct(opener) {
            depth += 1;
        } else if t.is_punct(closer) {
            depth -= 1;
            if depth == 0 {
                return Some(k);
            }
        }
    }
    None
}

/// Index of the bracket opening the one at `close`
pub(crate) fn matching_open(tokens: &[Token], close: usize) -> Option<usize> {
    let closer = match &tokens.get(close)?.kind {
        TokenKind::Punct(p) => *p,
        _ => return None,
    };
    let opener = opener_of(&tokens[close])?;
    let mut depth = 0usize;
    for k in (0..=close).rev() {
        if tokens[k].is_punct(closer) {
            depth += 1;
        } else if tokens[k].is_punct(opener) {
            depth -= 1;
            if depth == 0 {
                return Some(k);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn receivers(file: &SourceFile) -> Vec<(&str, &str)> {
        file.calls()
            .iter()
            .map(|c| (c.method_name.as_str(), file.snippet(c.receiver.clone())))
            .collect()
    }

    #[test]
    fn test_discover_simple_call() {
        let file = SourceFile::parse(
            r#"db.execSQL("CREATE TABLE t (a STRING)");"#,
            SourceLanguage::Java,
        );
        assert_eq!(receivers(&file), vec![("execSQL", "db")]);

        let call = &file.calls()[0];
        assert_eq!(call.arguments.len(), 1);
        assert_eq!(call.span.offset, 0);
        assert_eq!(call.span.length, 39);
        assert_eq!(call.span.line, 1);
    }

    #[test]
    fn test_discover_chained_receivers() {
        let file = SourceFile::parse(
            "helper.getWritableDatabase().execSQL(sql);\nthis.db.execSQL(a, new Object[] { b });\ndbs[0].execSQL(c);",
            SourceLanguage::Java,
        );
        assert_eq!(
            receivers(&file),
            vec![
                ("getWritableDatabase", "helper"),
                ("execSQL", "helper.getWritableDatabase()"),
                ("execSQL", "this.db"),
                ("execSQL", "dbs[0]"),
            ]
        );
        assert_eq!(file.calls()[2].arguments.len(), 2);
    }

    #[test]
    fn test_discover_kotlin_safe_calls() {
        let file = SourceFile::parse(
            "db?.execSQL(sql)\ndb!!.execSQL(sql)\nhelper.writableDatabase.execSQL(sql = \"x\")",
            SourceLanguage::Kotlin,
        );
        assert_eq!(
            receivers(&file),
            vec![
                ("execSQL", "db"),
                ("execSQL", "db!!"),
                ("execSQL", "helper.writableDatabase"),
            ]
        );
        let named = &file.calls()[2];
        let arg = file.expr_tokens(named.arguments[0]);
        assert_eq!(arg.len(), 1);
        assert!(matches!(arg[0].kind, TokenKind::Str { .. }));
    }

    #[test]
    fn test_bare_calls_are_not_member_calls() {
        let file = SourceFile::parse("execSQL(sql); if (x) { run(); }", SourceLanguage::Java);
        assert!(file.calls().is_empty());
    }

    #[test]
    fn test_parenthesized_receiver_after_keyword() {
        let file = SourceFile::parse("return (db).execSQL(sql);", SourceLanguage::Java);
        assert_eq!(receivers(&file), vec![("execSQL", "(db)")]);
    }

    #[test]
    fn test_split_arguments_respects_nesting() {
        let file = SourceFile::parse(
            r#"db.execSQL(f(a, b) + "x", new Object[] { 1, 2 },);"#,
            SourceLanguage::Java,
        );
        let call = &file.calls().last().unwrap();
        assert_eq!(call.method_name, "execSQL");
        let args: Vec<String> = call
            .arguments
            .iter()
            .map(|a| file.snippet(file.expr_range(*a).unwrap()).to_string())
            .collect();
        assert_eq!(args, vec![r#"f(a, b) + "x""#, "new Object[] { 1, 2 }"]);
    }

    #[test]
    fn test_matching_brackets() {
        let tokens = tokenize("f(a[1], { b() })", SourceLanguage::Java);
        assert_eq!(matching_close(&tokens, 1), Some(12));
        assert_eq!(matching_open(&tokens, 12), Some(1));
        assert_eq!(matching_close(&tokens, 3), Some(5));
        assert_eq!(matching_close(&tokens, 0), None);
    }

    #[test]
    fn test_unclosed_call_is_skipped() {
        let file = SourceFile::parse("db.execSQL(\"a\"", SourceLanguage::Java);
        assert!(file.calls().is_empty());
    }
}
