//! Tokenizer for Java and Kotlin sources
//!
//! Only as much of the lexical grammar as call discovery and constant
//! folding need. Malformed input never fails: an unterminated literal or
//! comment simply runs to the end of the file.

use crate::error::Span;
use crate::language::SourceLanguage;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    /// String literal with escapes decoded
    Str {
        value: String,
        /// Kotlin template containing `$name` or `${...}`
        interpolated: bool,
        /// Delimited by `"""`
        raw: bool,
    },
    Char(char),
    Int(i64),
    /// Any other numeric literal, kept as written
    Number(String),
    Punct(&'static str),
    LineComment(String),
    BlockComment(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn is_punct(&self, p: &str) -> bool {
        matches!(&self.kind, TokenKind::Punct(q) if *q == p)
    }

    pub fn ident(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_ident(&self, name: &str) -> bool {
        self.ident() == Some(name)
    }

    pub fn is_comment(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::LineComment(_) | TokenKind::BlockComment(_)
        )
    }
}

/// Multi-character operators, longest first
const OPERATORS: &[&str] = &[
    "...", "!==", "===", "?.", "?:", "::", "->", "==", "!=", "<=",
    ">=", "&&", "||", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "!!", "..",
];

const SINGLE: &[&str] = &[
    "(", ")", "{", "}", "[", "]", ";", ",", ".", "=", "+", "-", "*", "/", "%", "<", ">", "!", "?",
    ":", "@", "&", "|", "^", "~", "#",
];

struct Lexer<'s> {
    src: &'s str,
    pos: usize,
    line: usize,
    column: usize,
    language: SourceLanguage,
    tokens: Vec<Token>,
}

/// Split `source` into tokens, comments included
pub fn tokenize(source: &str, language: SourceLanguage) -> Vec<Token> {
    let mut lexer = Lexer {
        src: source,
        pos: 0,
        line: 1,
        column: 1,
        language,
        tokens: Vec::new(),
    };
    lexer.run();
    lexer.tokens
}

impl<'s> Lexer<'s> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn bump_n(&mut self, n: usize) {
        for _ in 0..n {
            self.bump();
        }
    }

    fn push(&mut self, kind: TokenKind, start: (usize, usize, usize)) {
        let (offset, line, column) = start;
        self.tokens.push(Token {
            kind,
            span: Span::at(offset, self.pos - offset, line, column),
        });
    }

    fn run(&mut self) {
        while let Some(ch) = self.peek() {
            let start = (self.pos, self.line, self.column);
            if ch.is_whitespace() {
                self.bump();
            } else if self.rest().starts_with("//") {
                let text = self.take_line_comment();
                self.push(TokenKind::LineComment(text), start);
            } else if self.rest().starts_with("/*") {
                let text = self.take_block_comment();
                self.push(TokenKind::BlockComment(text), start);
            } else if self.rest().starts_with("\"\"\"") {
                let kind = self.take_text_block();
                self.push(kind, start);
            } else if ch == '"' {
                let kind = self.take_string();
                self.push(kind, start);
            } else if ch == '\'' {
                let kind = self.take_char();
                self.push(kind, start);
            } else if ch.is_ascii_digit()
                || (ch == '.' && self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()))
            {
                let kind = self.take_number();
                self.push(kind, start);
            } else if ch == '`' && self.language == SourceLanguage::Kotlin {
                let name = self.take_quoted_ident();
                self.push(TokenKind::Ident(name), start);
            } else if is_ident_start(ch) {
                let name = self.take_while(is_ident_part);
                self.push(TokenKind::Ident(name.to_string()), start);
            } else if let Some(op) = self.match_punct() {
                self.bump_n(op.chars().count());
                self.push(TokenKind::Punct(op), start);
            } else {
                // Stray character (e.g. a lone backslash); skip it
                self.bump();
            }
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'s str {
        let src = self.src;
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        &src[start..self.pos]
    }

    fn match_punct(&self) -> Option<&'static str> {
        let rest = self.rest();
        OPERATORS
            .iter()
            .chain(SINGLE)
            .find(|op| rest.starts_with(**op))
            .copied()
    }

    fn take_line_comment(&mut self) -> String {
        self.bump_n(2);
        self.take_while(|c| c != '\n').to_string()
    }

    fn take_block_comment(&mut self) -> String {
        self.bump_n(2);
        let start = self.pos;
        let nested = self.language == SourceLanguage::Kotlin;
        let mut depth = 1;
        let mut end = self.src.len();
        while self.peek().is_some() {
            if nested && self.rest().starts_with("/*") {
                depth += 1;
                self.bump_n(2);
            } else if self.rest().starts_with("*/") {
                depth -= 1;
                if depth == 0 {
                    end = self.pos;
                    self.bump_n(2);
                    break;
                }
                self.bump_n(2);
            } else {
                self.bump();
            }
        }
        self.src[start..end].to_string()
    }

    fn take_quoted_ident(&mut self) -> String {
        self.bump();
        let name = self.take_while(|c| c != '`' && c != '\n').to_string();
        if self.peek() == Some('`') {
            self.bump();
        }
        name
    }

    fn take_number(&mut self) -> TokenKind {
        let src = self.src;
        let start = self.pos;
        loop {
            let so_far = &src[start..self.pos];
            match self.peek() {
                Some(c) if c.is_ascii_alphanumeric() || c == '_' => {}
                Some('.') if self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) => {}
                Some('+' | '-')
                    if so_far.ends_with(['e', 'E'])
                        && !so_far.starts_with("0x")
                        && !so_far.starts_with("0X") => {}
                _ => break,
            }
            self.bump();
        }
        let text = src[start..self.pos].to_string();
        parse_int(&text)
            .map(TokenKind::Int)
            .unwrap_or(TokenKind::Number(text))
    }

    fn take_char(&mut self) -> TokenKind {
        self.bump();
        let value = match self.peek() {
            Some('\\') => {
                self.bump();
                self.take_escape().unwrap_or('\\')
            }
            Some(c) if c != '\'' && c != '\n' => {
                self.bump();
                c
            }
            _ => '\0',
        };
        if self.peek() == Some('\'') {
            self.bump();
        }
        TokenKind::Char(value)
    }

    fn take_string(&mut self) -> TokenKind {
        self.bump();
        let templates = self.language.has_string_templates();
        let mut value = String::new();
        let mut interpolated = false;
        while let Some(ch) = self.peek() {
            match ch {
                '"' => {
                    self.bump();
                    break;
                }
                '\n' => break,
                '\\' => {
                    self.bump();
                    if let Some(c) = self.take_escape() {
                        value.push(c);
                    }
                }
                '$' if templates && self.starts_template() => {
                    interpolated = true;
                    self.bump();
                    value.push('$');
                }
                _ => {
                    self.bump();
                    value.push(ch);
                }
            }
        }
        TokenKind::Str {
            value,
            interpolated,
            raw: false,
        }
    }

    fn starts_template(&self) -> bool {
        self.peek_nth(1)
            .is_some_and(|c| c == '{' || is_ident_start(c))
    }

    /// `"""` literal: a Java text block or a Kotlin raw string
    fn take_text_block(&mut self) -> TokenKind {
        self.bump_n(3);
        let start = self.pos;
        let mut end = self.src.len();
        while self.peek().is_some() {
            if self.rest().starts_with("\"\"\"") {
                // Extra quotes before the delimiter belong to the content
                while self.rest().starts_with("\"\"\"\"") {
                    self.bump();
                }
                end = self.pos;
                self.bump_n(3);
                break;
            }
            self.bump();
        }
        let body = &self.src[start..end];
        match self.language {
            SourceLanguage::Kotlin => TokenKind::Str {
                value: body.to_string(),
                interpolated: has_template(body),
                raw: true,
            },
            SourceLanguage::Java => TokenKind::Str {
                value: java_text_block(body),
                interpolated: false,
                raw: true,
            },
        }
    }

    /// Decode the escape following a backslash (already consumed)
    fn take_escape(&mut self) -> Option<char> {
        let ch = self.bump()?;
        let decoded = match ch {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'b' => '\u{8}',
            'f' => '\u{c}',
            's' => ' ',
            '0'..='7' if self.language == SourceLanguage::Java => {
                let mut code = ch.to_digit(8).unwrap_or(0);
                let max_digits = if ch <= '3' { 2 } else { 1 };
                for _ in 0..max_digits {
                    match self.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            code = code * 8 + d;
                            self.bump();
                        }
                        None => break,
                    }
                }
                char::from_u32(code)?
            }
            'u' => {
                while self.peek() == Some('u') {
                    self.bump();
                }
                let hex: String = (0..4).filter_map(|_| self.bump()).collect();
                u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)?
            }
            other => other,
        };
        Some(decoded)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn has_template(body: &str) -> bool {
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '$' && chars.peek().is_some_and(|&n| n == '{' || is_ident_start(n)) {
            return true;
        }
    }
    false
}

fn parse_int(text: &str) -> Option<i64> {
    let cleaned = text.replace('_', "");
    let cleaned = cleaned
        .strip_suffix(['L', 'l'])
        .unwrap_or(&cleaned)
        .to_string();
    if let Some(hex) = cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
    {
        return i64::from_str_radix(hex, 16).ok();
    }
    if let Some(bin) = cleaned
        .strip_prefix("0b")
        .or_else(|| cleaned.strip_prefix("0B"))
    {
        return i64::from_str_radix(bin, 2).ok();
    }
    if cleaned.chars().all(|c| c.is_ascii_digit()) {
        return cleaned.parse().ok();
    }
    None
}

/// Content of a Java text block: incidental indentation stripped,
/// trailing spaces removed, escapes decoded.
fn java_text_block(body: &str) -> String {
    // The opening delimiter is followed by a line terminator
    let body = match body.find('\n') {
        Some(i) if body[..i].trim().is_empty() => &body[i + 1..],
        _ => body,
    };
    let lines: Vec<&str> = body.split('\n').collect();
    let last_index = lines.len().saturating_sub(1);
    let indent = lines
        .iter()
        .enumerate()
        .filter(|(i, l)| !l.trim().is_empty() || *i == last_index)
        .map(|(_, l)| l.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(0);

    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        let stripped: String = line.chars().skip(indent).collect();
        out.push_str(stripped.trim_end());
        if i < last_index {
            out.push('\n');
        }
    }
    unescape_java(&out)
}

fn unescape_java(text: &str) -> String {
    let mut lexer = Lexer {
        src: text,
        pos: 0,
        line: 1,
        column: 1,
        language: SourceLanguage::Java,
        tokens: Vec::new(),
    };
    let mut out = String::new();
    while let Some(ch) = lexer.bump() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        // Backslash at end of line joins the lines
        if lexer.peek() == Some('\n') {
            lexer.bump();
            continue;
        }
        if let Some(c) = lexer.take_escape() {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn kinds(source: &str, language: SourceLanguage) -> Vec<TokenKind> {
        tokenize(source, language)
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn string(value: &str) -> TokenKind {
        TokenKind::Str {
            value: value.to_string(),
            interpolated: false,
            raw: false,
        }
    }

    #[test]
    fn test_simple_call() {
        assert_eq!(
            kinds(r#"db.execSQL("CREATE TABLE t (a STRING)");"#, SourceLanguage::Java),
            vec![
                TokenKind::Ident("db".into()),
                TokenKind::Punct("."),
                TokenKind::Ident("execSQL".into()),
                TokenKind::Punct("("),
                string("CREATE TABLE t (a STRING)"),
                TokenKind::Punct(")"),
                TokenKind::Punct(";"),
            ]
        );
    }

    #[test]
    fn test_spans_track_lines_and_columns() {
        let tokens = tokenize("int a;\n  db.x();", SourceLanguage::Java);
        let db = tokens.iter().find(|t| t.is_ident("db")).unwrap();
        assert_eq!(db.span.line, 2);
        assert_eq!(db.span.column, 3);
        assert_eq!(db.span.offset, 9);
        assert_eq!(db.span.length, 2);
    }

    #[test]
    fn test_escapes() {
        assert_eq!(
            kinds(r#""a\tb\"cA\101""#, SourceLanguage::Java),
            vec![string("a\tb\"cAA")]
        );
    }

    #[test]
    fn test_operators_are_greedy() {
        assert_eq!(
            kinds("a?.b += c != d", SourceLanguage::Kotlin),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Punct("?."),
                TokenKind::Ident("b".into()),
                TokenKind::Punct("+="),
                TokenKind::Ident("c".into()),
                TokenKind::Punct("!="),
                TokenKind::Ident("d".into()),
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1_000 0x1F 42L 1.5f 2e-3", SourceLanguage::Java),
            vec![
                TokenKind::Int(1000),
                TokenKind::Int(31),
                TokenKind::Int(42),
                TokenKind::Number("1.5f".into()),
                TokenKind::Number("2e-3".into()),
            ]
        );
    }

    #[test]
    fn test_comments_are_kept() {
        let tokens = kinds(
            "//noinspection SQLiteString\n/* block */ x",
            SourceLanguage::Java,
        );
        assert_eq!(
            tokens,
            vec![
                TokenKind::LineComment("noinspection SQLiteString".into()),
                TokenKind::BlockComment(" block ".into()),
                TokenKind::Ident("x".into()),
            ]
        );
    }

    #[test]
    fn test_kotlin_nested_block_comment() {
        assert_eq!(
            kinds("/* a /* b */ c */ x", SourceLanguage::Kotlin),
            vec![
                TokenKind::BlockComment(" a /* b */ c ".into()),
                TokenKind::Ident("x".into()),
            ]
        );
    }

    #[test]
    fn test_kotlin_templates_are_marked() {
        let tokens = kinds(r#""CREATE TABLE $name (a STRING)" "cost: \$5""#, SourceLanguage::Kotlin);
        assert!(matches!(&tokens[0], TokenKind::Str { interpolated: true, .. }));
        assert_eq!(tokens[1], string("cost: $5"));
    }

    #[test]
    fn test_dollar_is_plain_in_java() {
        assert_eq!(
            kinds(r#""$name""#, SourceLanguage::Java),
            vec![string("$name")]
        );
    }

    #[test]
    fn test_java_text_block() {
        let source = "String s = \"\"\"\n    CREATE TABLE t (\n      a STRING\n    )\"\"\";";
        let tokens = kinds(source, SourceLanguage::Java);
        assert_eq!(
            tokens[3],
            TokenKind::Str {
                value: "CREATE TABLE t (\n  a STRING\n)".into(),
                interpolated: false,
                raw: true,
            }
        );
    }

    #[test]
    fn test_kotlin_raw_string_keeps_content() {
        let tokens = kinds("\"\"\"a\\n$\"\"\"", SourceLanguage::Kotlin);
        assert_eq!(
            tokens,
            vec![TokenKind::Str {
                value: "a\\n$".into(),
                interpolated: false,
                raw: true,
            }]
        );
    }

    #[test]
    fn test_char_literals() {
        assert_eq!(
            kinds(r"'a' '\n' '\''", SourceLanguage::Java),
            vec![
                TokenKind::Char('a'),
                TokenKind::Char('\n'),
                TokenKind::Char('\''),
            ]
        );
    }

    #[test]
    fn test_unterminated_string_stops_at_line_end() {
        let tokens = kinds("\"abc\nx", SourceLanguage::Java);
        assert_eq!(tokens, vec![string("abc"), TokenKind::Ident("x".into())]);
    }

    #[test]
    fn test_kotlin_backtick_identifier() {
        assert_eq!(
            kinds("`in`", SourceLanguage::Kotlin),
            vec![TokenKind::Ident("in".into())]
        );
    }
}
