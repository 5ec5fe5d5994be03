//! Suppression comments and annotations

use std::ops::Range;

use crate::error::Span;
use crate::language::SourceLanguage;

use super::lexer::{Token, TokenKind};
use super::symbols::expression_end;
use super::{matching_close, SourceFile};

const ANNOTATIONS: &[&str] = &["SuppressLint", "SuppressWarnings", "Suppress"];

/// Kotlin modifiers that may precede a declaration keyword
const KOTLIN_MODIFIERS: &[&str] = &[
    "public", "private", "protected", "internal", "override", "open", "abstract", "final",
    "data", "enum", "sealed", "inner", "companion", "inline", "suspend", "lateinit", "const",
    "operator", "infix", "tailrec", "external", "annotation", "value",
];

/// Kotlin keywords that start a declaration
const KOTLIN_DECLARATIONS: &[&str] = &[
    "class", "interface", "object", "fun", "val", "var", "constructor", "init", "typealias",
];

/// Prefix IntelliJ uses for lint inspection names
const INSPECTION_PREFIX: &str = "AndroidLint";

/// Issue ids suppressed over a region of a file
#[derive(Debug, Clone)]
enum Scope {
    /// Inclusive line range
    Lines(usize, usize),
    /// Byte offsets
    Bytes(Range<usize>),
    File,
}

#[derive(Debug, Clone)]
struct Suppression {
    ids: Vec<String>,
    scope: Scope,
}

/// Everything suppressed in one file
#[derive(Debug, Clone, Default)]
pub struct Suppressions {
    entries: Vec<Suppression>,
}

impl Suppressions {
    pub fn collect(file: &SourceFile) -> Self {
        let mut entries = Vec::new();
        for comment in file.comments() {
            if let Some(entry) = noinspection(comment) {
                entries.push(entry);
            }
        }
        let tokens = file.tokens();
        for i in 0..tokens.len() {
            if tokens[i].is_punct("@") {
                if let Some(entry) = annotation(tokens, i, file.language()) {
                    entries.push(entry);
                }
            }
        }
        tracing::trace!(count = entries.len(), "collected suppressions");
        Self { entries }
    }

    /// Whether `issue` is suppressed at `span`
    pub fn is_suppressed(&self, issue: &str, span: &Span) -> bool {
        self.entries.iter().any(|entry| {
            let covers = match &entry.scope {
                Scope::Lines(first, last) => (*first..=*last).contains(&span.line),
                Scope::Bytes(range) => range.contains(&span.offset),
                Scope::File => true,
            };
            covers && entry.ids.iter().any(|id| names_issue(id, issue))
        })
    }
}

fn names_issue(id: &str, issue: &str) -> bool {
    let id = id.trim();
    if id.eq_ignore_ascii_case("all") || id.eq_ignore_ascii_case(issue) {
        return true;
    }
    id.strip_prefix(INSPECTION_PREFIX)
        .is_some_and(|rest| rest.eq_ignore_ascii_case(issue))
}

/// `//noinspection Id1,Id2` covers its own line and the next one
fn noinspection(comment: &Token) -> Option<Suppression> {
    let TokenKind::LineComment(text) = &comment.kind else {
        return None;
    };
    let rest = text.trim_start().strip_prefix("noinspection")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let ids: Vec<String> = rest
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if ids.is_empty() {
        return None;
    }
    Some(Suppression {
        ids,
        scope: Scope::Lines(comment.span.line, comment.span.line + 1),
    })
}

/// `@SuppressLint(...)`, `@SuppressWarnings(...)`, `@Suppress(...)` and
/// Kotlin `@file:Suppress(...)` at token `at`
fn annotation(tokens: &[Token], at: usize, language: SourceLanguage) -> Option<Suppression> {
    let mut i = at + 1;
    let file_target = tokens.get(i).is_some_and(|t| t.is_ident("file"))
        && tokens.get(i + 1).is_some_and(|t| t.is_punct(":"));
    if file_target {
        i += 2;
    }
    // Qualified form: `@android.annotation.SuppressLint`
    let mut name = tokens.get(i)?.ident()?;
    while tokens.get(i + 1).is_some_and(|t| t.is_punct(".")) {
        name = tokens.get(i + 2)?.ident()?;
        i += 2;
    }
    if !ANNOTATIONS.contains(&name) {
        return None;
    }
    let open = i + 1;
    if !tokens.get(open).is_some_and(|t| t.is_punct("(")) {
        return None;
    }
    let close = matching_close(tokens, open)?;
    let ids: Vec<String> = tokens[open + 1..close]
        .iter()
        .filter_map(|t| match &t.kind {
            TokenKind::Str { value, .. } => Some(value.clone()),
            _ => None,
        })
        .collect();
    if ids.is_empty() {
        return None;
    }

    let scope = if file_target {
        Scope::File
    } else {
        let end = annotated_end(tokens, close + 1, language);
        let end_offset = match end.checked_sub(1).and_then(|k| tokens.get(k)) {
            Some(last) => last.span.end(),
            None => tokens[close].span.end(),
        };
        Scope::Bytes(tokens[at].span.offset..end_offset)
    };
    Some(Suppression { ids, scope })
}

/// Index one past the last token of the element annotated by the
/// annotation ending just before `start`
fn annotated_end(tokens: &[Token], start: usize, language: SourceLanguage) -> usize {
    let start = skip_annotations(tokens, start);
    match language {
        SourceLanguage::Kotlin => kotlin_declaration_end(tokens, start)
            .unwrap_or_else(|| expression_end(tokens, start, language)),
        SourceLanguage::Java => {
            let mut i = start;
            while i < tokens.len() {
                let t = &tokens[i];
                if t.is_punct("{") {
                    return matching_close(tokens, i).map_or(tokens.len(), |close| close + 1);
                }
                if t.is_punct("(") || t.is_punct("[") {
                    i = matching_close(tokens, i).map_or(tokens.len(), |close| close + 1);
                    continue;
                }
                if t.is_punct(";") {
                    return i + 1;
                }
                if t.is_punct(",") || t.is_punct(")") || t.is_punct("}") {
                    return i;
                }
                i += 1;
            }
            tokens.len()
        }
    }
}

/// End of the Kotlin declaration starting at `start`: its `{ ... }` body,
/// its `= expr` body, or the next declaration when it has neither.
/// `None` when `start` is not a declaration.
fn kotlin_declaration_end(tokens: &[Token], start: usize) -> Option<usize> {
    let mut i = start;
    while tokens
        .get(i)
        .and_then(Token::ident)
        .is_some_and(|w| KOTLIN_MODIFIERS.contains(&w))
    {
        i += 1;
    }
    if !KOTLIN_DECLARATIONS.contains(&tokens.get(i)?.ident()?) {
        return None;
    }
    i += 1;
    while i < tokens.len() {
        let t = &tokens[i];
        if t.is_punct("{") {
            return Some(matching_close(tokens, i).map_or(tokens.len(), |close| close + 1));
        }
        if t.is_punct("(") || t.is_punct("[") {
            i = matching_close(tokens, i).map_or(tokens.len(), |close| close + 1);
            continue;
        }
        if t.is_punct("=") {
            return Some(expression_end(tokens, i + 1, SourceLanguage::Kotlin));
        }
        if t.is_punct("@") {
            // `class Dao @Inject constructor(...)`
            let after = skip_annotations(tokens, i);
            if !tokens.get(after).is_some_and(|t| t.is_ident("constructor")) {
                return Some(i);
            }
            i = after;
            continue;
        }
        if [";", "}", ")"].iter().any(|p| t.is_punct(p)) {
            return Some(i);
        }
        let next_declaration = t
            .ident()
            .is_some_and(|w| w != "constructor" && KOTLIN_DECLARATIONS.contains(&w));
        if next_declaration {
            return Some(i);
        }
        i += 1;
    }
    Some(tokens.len())
}

/// Skip further annotations (`@Name`, `@a.b.Name(...)`) starting at `i`
fn skip_annotations(tokens: &[Token], mut i: usize) -> usize {
    while tokens.get(i).is_some_and(|t| t.is_punct("@")) {
        i += 1;
        while tokens.get(i).and_then(Token::ident).is_some() {
            i += 1;
            if tokens.get(i).is_some_and(|t| t.is_punct(".") || t.is_punct(":")) {
                i += 1;
            } else {
                break;
            }
        }
        if tokens.get(i).is_some_and(|t| t.is_punct("(")) {
            i = matching_close(tokens, i).map_or(tokens.len(), |close| close + 1);
        }
    }
    i
}
