//! Symbol collection - imports, variable declarations and initializers

use std::ops::Range;

use indexmap::IndexMap;

use crate::language::SourceLanguage;

use super::lexer::{Token, TokenKind};
use super::{matching_close, matching_open};

/// Words that can precede an identifier without being its type
const JAVA_KEYWORDS: &[&str] = &[
    "return",
    "new",
    "throw",
    "else",
    "case",
    "package",
    "import",
    "instanceof",
    "yield",
    "assert",
    "goto",
    "break",
    "continue",
    "do",
    "default",
    "extends",
    "implements",
    "throws",
    "class",
    "interface",
    "enum",
    "record",
    "super",
    "this",
];

/// Everything known about one variable name in a file
#[derive(Debug, Clone, Default)]
struct Variable {
    /// Distinct declared types, as written
    types: Vec<String>,
    /// One entry per declaration
    initializers: Vec<Option<Range<usize>>>,
    /// Assigned outside a declaration
    reassigned: bool,
}

/// Symbols declared in one source file
#[derive(Debug, Clone, Default)]
pub struct Symbols {
    package: Option<String>,
    /// Simple (or alias) name -> qualified name
    imports: IndexMap<String, String>,
    /// Packages imported with `.*`
    wildcard_imports: Vec<String>,
    variables: IndexMap<String, Variable>,
}

impl Symbols {
    pub fn collect(tokens: &[Token], language: SourceLanguage) -> Self {
        let mut symbols = Symbols::default();
        symbols.collect_header(tokens);
        match language {
            SourceLanguage::Java => symbols.collect_java_declarations(tokens),
            SourceLanguage::Kotlin => symbols.collect_kotlin_declarations(tokens),
        }
        symbols.collect_bound_names(tokens, language);
        symbols.collect_assignments(tokens, language);
        symbols.drop_conflicting_initializers(tokens);
        symbols
    }

    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    /// Qualified name imported under `simple`
    pub fn import(&self, simple: &str) -> Option<&str> {
        self.imports.get(simple).map(String::as_str)
    }

    pub fn wildcard_imports(&self) -> &[String] {
        &self.wildcard_imports
    }

    /// Declared type of `name`, when every declaration agrees
    pub fn declared_type(&self, name: &str) -> Option<&str> {
        match self.variables.get(name)?.types.as_slice() {
            [ty] => Some(ty),
            _ => None,
        }
    }

    /// Initializer of `name`, when it is effectively constant.
    ///
    /// A name is constant when every declaration has the same initializer
    /// and it is never assigned elsewhere.
    pub fn initializer(&self, name: &str) -> Option<Range<usize>> {
        let var = self.variables.get(name)?;
        if var.reassigned {
            return None;
        }
        var.initializers.first().cloned().flatten()
    }

    fn variable(&mut self, name: &str) -> &mut Variable {
        self.variables.entry(name.to_string()).or_default()
    }

    fn declare(&mut self, name: &str, ty: Option<String>, initializer: Option<Range<usize>>) {
        let var = self.variable(name);
        if let Some(ty) = ty {
            if !var.types.contains(&ty) {
                var.types.push(ty);
            }
        }
        var.initializers.push(initializer);
    }

    /// `package` and `import` lines
    fn collect_header(&mut self, tokens: &[Token]) {
        let mut i = 0;
        while i < tokens.len() {
            let is_package = tokens[i].is_ident("package");
            let is_import = tokens[i].is_ident("import");
            if !(is_package || is_import) || (i > 0 && tokens[i - 1].is_punct(".")) {
                i += 1;
                continue;
            }
            let mut j = i + 1;
            if tokens.get(j).is_some_and(|t| t.is_ident("static")) {
                j += 1;
            }
            let (path, end) = dotted_path(tokens, j);
            i = end.max(i + 1);
            if path.is_empty() {
                continue;
            }

            if is_package {
                self.package = Some(path.join("."));
                continue;
            }
            let wildcard = tokens.get(end).is_some_and(|t| t.is_punct("."))
                && tokens.get(end + 1).is_some_and(|t| t.is_punct("*"));
            if wildcard {
                self.wildcard_imports.push(path.join("."));
                i = end + 2;
                continue;
            }
            let qualified = path.join(".");
            let alias = match (tokens.get(end), tokens.get(end + 1)) {
                (Some(kw), Some(alias)) if kw.is_ident("as") => {
                    i = end + 2;
                    alias.ident().map(str::to_string)
                }
                _ => None,
            };
            let simple = alias.unwrap_or_else(|| path[path.len() - 1].to_string());
            self.imports.insert(simple, qualified);
        }
    }

    /// `Type name [= init]` declarations, including parameters and
    /// for-each variables
    fn collect_java_declarations(&mut self, tokens: &[Token]) {
        for i in 1..tokens.len() {
            let Some(name) = tokens[i].ident() else {
                continue;
            };
            let Some(next) = tokens.get(i + 1) else {
                continue;
            };
            let ends_declarator = ["=", ";", ",", ")", ":"].iter().any(|p| next.is_punct(p));
            if !ends_declarator || JAVA_KEYWORDS.contains(&name) {
                continue;
            }
            let Some(ty) = java_type_before(tokens, i) else {
                continue;
            };
            // `var x = ...` has no written type
            let ty = (ty != "var").then_some(ty);
            let initializer = next
                .is_punct("=")
                .then(|| expression_end(tokens, i + 2, SourceLanguage::Java))
                .map(|end| i + 2..end);
            self.declare(name, ty, initializer);
        }
    }

    /// `val`/`var` properties and `name: Type` parameters
    fn collect_kotlin_declarations(&mut self, tokens: &[Token]) {
        let mut i = 0;
        while i < tokens.len() {
            let is_property = tokens[i].is_ident("val") || tokens[i].is_ident("var");
            if is_property {
                if let Some(name) = tokens.get(i + 1).and_then(Token::ident) {
                    let mut j = i + 2;
                    let mut ty = None;
                    if tokens.get(j).is_some_and(|t| t.is_punct(":")) {
                        let (t, end) = kotlin_type_at(tokens, j + 1);
                        ty = t;
                        j = end;
                    }
                    let initializer = if tokens.get(j).is_some_and(|t| t.is_punct("=")) {
                        let end = expression_end(tokens, j + 1, SourceLanguage::Kotlin);
                        Some(j + 1..end)
                    } else {
                        None
                    };
                    self.declare(name, ty, initializer);
                    i = j;
                    continue;
                }
            } else if let Some(name) = tokens[i].ident() {
                // Parameter: `(name: Type` or `, name: Type`
                let after_open = i > 0
                    && (tokens[i - 1].is_punct("(") || tokens[i - 1].is_punct(","));
                let before_colon = tokens.get(i + 1).is_some_and(|t| t.is_punct(":"));
                if after_open && before_colon {
                    let (ty, end) = kotlin_type_at(tokens, i + 2);
                    if ty.is_some() {
                        self.declare(name, ty, None);
                        i = end;
                        continue;
                    }
                }
            }
            i += 1;
        }
    }

    /// Lambda parameters and Kotlin loop variables. They hold runtime
    /// values, so a constant with the same name elsewhere is not folded.
    fn collect_bound_names(&mut self, tokens: &[Token], language: SourceLanguage) {
        for i in 0..tokens.len() {
            let names = if tokens[i].is_punct("->") && i > 0 {
                match language {
                    SourceLanguage::Java => java_lambda_parameters(tokens, i),
                    SourceLanguage::Kotlin => kotlin_lambda_parameters(tokens, i),
                }
            } else if language == SourceLanguage::Kotlin
                && tokens[i].is_ident("for")
                && tokens.get(i + 1).is_some_and(|t| t.is_punct("("))
            {
                kotlin_loop_variables(tokens, i + 1)
            } else {
                continue;
            };
            for name in names {
                self.declare(name, None, None);
            }
        }
    }

    /// Plain assignments `name = ...`, `this.name = ...` and compound forms
    fn collect_assignments(&mut self, tokens: &[Token], language: SourceLanguage) {
        const ASSIGN: &[&str] = &["=", "+=", "-=", "*=", "/=", "%=", "++", "--"];
        for i in 0..tokens.len() {
            let Some(name) = tokens[i].ident() else {
                continue;
            };
            let Some(next) = tokens.get(i + 1) else {
                continue;
            };
            if !ASSIGN.iter().any(|op| next.is_punct(op)) {
                continue;
            }
            if !self.variables.contains_key(name) || is_declaration_site(tokens, i, language) {
                continue;
            }
            if next.is_punct("=") && is_named_argument(tokens, i) {
                continue;
            }
            self.variable(name).reassigned = true;
        }
        // Prefix increments: `++name`
        for i in 1..tokens.len() {
            if tokens[i - 1].is_punct("++") || tokens[i - 1].is_punct("--") {
                if let Some(name) = tokens[i].ident() {
                    if let Some(var) = self.variables.get_mut(name) {
                        var.reassigned = true;
                    }
                }
            }
        }
    }

    /// Names declared several times with differing initializers are not
    /// constant
    fn drop_conflicting_initializers(&mut self, tokens: &[Token]) {
        for var in self.variables.values_mut() {
            let Some(first) = var.initializers.first().cloned() else {
                continue;
            };
            let agree = var.initializers.iter().all(|init| match (&first, init) {
                (Some(a), Some(b)) => same_tokens(&tokens[a.clone()], &tokens[b.clone()]),
                _ => false,
            });
            if !agree {
                var.initializers = vec![None];
            }
        }
    }
}

/// `x -> ...` and `(a, b) -> ...`; `case A, B ->` labels are skipped
fn java_lambda_parameters(tokens: &[Token], arrow: usize) -> Vec<&str> {
    let prev = &tokens[arrow - 1];
    if let Some(name) = prev.ident() {
        let mut k = arrow - 1;
        while k > 0
            && (tokens[k].is_punct(",") || tokens[k].ident().is_some_and(|w| w != "case"))
        {
            k -= 1;
        }
        if tokens[k].is_ident("case") || JAVA_KEYWORDS.contains(&name) {
            return Vec::new();
        }
        return vec![name];
    }
    if prev.is_punct(")") {
        if let Some(open) = matching_open(tokens, arrow - 1) {
            return parameter_names(&tokens[open + 1..arrow - 1]);
        }
    }
    Vec::new()
}

/// `{ a, (b, c), d: Type -> ...}`; `when` branches are skipped
fn kotlin_lambda_parameters(tokens: &[Token], arrow: usize) -> Vec<&str> {
    let Some(open) = enclosing_open(tokens, arrow) else {
        return Vec::new();
    };
    if !tokens[open].is_punct("{") || is_when_body(tokens, open) {
        return Vec::new();
    }
    let params = &tokens[open + 1..arrow];
    let header_only = params.iter().all(|t| match t.ident() {
        Some(word) => !matches!(word, "val" | "var" | "fun"),
        None => [",", "(", ")", ":", ".", "<", ">", "?"]
            .iter()
            .any(|p| t.is_punct(p)),
    });
    if !header_only {
        return Vec::new();
    }
    parameter_names(params)
}

/// `for (name in ...)` and `for ((a, b) in ...)`, with `open` at the `(`
fn kotlin_loop_variables(tokens: &[Token], open: usize) -> Vec<&str> {
    let Some(close) = matching_close(tokens, open) else {
        return Vec::new();
    };
    let Some(in_at) = (open + 1..close).find(|&k| tokens[k].is_ident("in")) else {
        return Vec::new();
    };
    parameter_names(&tokens[open + 1..in_at])
}

/// Names in a parameter list: identifiers that start an entry and are
/// followed by a separator, a type annotation or the end of the list
fn parameter_names(params: &[Token]) -> Vec<&str> {
    params
        .iter()
        .enumerate()
        .filter(|&(j, _)| j == 0 || params[j - 1].is_punct(",") || params[j - 1].is_punct("("))
        .filter(|&(j, _)| {
            params
                .get(j + 1)
                .map_or(true, |t| t.is_punct(",") || t.is_punct(")") || t.is_punct(":"))
        })
        .filter_map(|(_, t)| t.ident())
        .collect()
}

/// Whether the `{` at `open` is the body of `when` or `when (subject)`
fn is_when_body(tokens: &[Token], open: usize) -> bool {
    let Some(before) = open.checked_sub(1) else {
        return false;
    };
    if tokens[before].is_ident("when") {
        return true;
    }
    tokens[before].is_punct(")")
        && matching_open(tokens, before)
            .and_then(|o| o.checked_sub(1))
            .is_some_and(|k| tokens[k].is_ident("when"))
}

/// Whether the identifier at `i` is the name in its own declaration
fn is_declaration_site(tokens: &[Token], i: usize, language: SourceLanguage) -> bool {
    if i == 0 {
        return false;
    }
    let prev = &tokens[i - 1];
    match language {
        SourceLanguage::Kotlin => prev.is_ident("val") || prev.is_ident("var"),
        SourceLanguage::Java => java_type_before(tokens, i).is_some(),
    }
}

fn same_tokens(a: &[Token], b: &[Token]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.kind == y.kind)
}

/// Read `a.b.c` starting at `start`; returns the segments and the index
/// after the last one
fn dotted_path(tokens: &[Token], start: usize) -> (Vec<&str>, usize) {
    let mut path = Vec::new();
    let mut i = start;
    while let Some(segment) = tokens.get(i).and_then(Token::ident) {
        path.push(segment);
        i += 1;
        let continues = tokens.get(i).is_some_and(|t| t.is_punct("."))
            && tokens.get(i + 1).and_then(Token::ident).is_some();
        if !continues {
            break;
        }
        i += 1;
    }
    (path, i)
}

/// The Java type written immediately before the identifier at `name`.
///
/// Generic arguments are dropped and array brackets kept, so
/// `List<String> xs` gives `List` and `String[] xs` gives `String[]`.
fn java_type_before(tokens: &[Token], name: usize) -> Option<String> {
    let mut end = name;
    let mut suffix = String::new();
    // Array brackets: `String[] xs`, also varargs `String... xs`
    while end >= 2 && tokens[end - 1].is_punct("]") && tokens[end - 2].is_punct("[") {
        suffix.push_str("[]");
        end -= 2;
    }
    if end >= 1 && tokens[end - 1].is_punct("...") {
        suffix.push_str("[]");
        end -= 1;
    }
    if end >= 1 && tokens[end - 1].is_punct(">") {
        end = matching_angle(tokens, end - 1)?;
    }
    let last = tokens.get(end.checked_sub(1)?)?.ident()?;
    if JAVA_KEYWORDS.contains(&last) {
        return None;
    }
    // Walk back over a qualified name `a.b.Type`
    let mut start = end - 1;
    while start >= 2 && tokens[start - 1].is_punct(".") && tokens[start - 2].ident().is_some() {
        start -= 2;
    }
    let ty: Vec<&str> = (start..end)
        .step_by(2)
        .filter_map(|k| tokens[k].ident())
        .collect();
    Some(format!("{}{}", ty.join("."), suffix))
}

/// Index of the `<` matching the `>` at `close`
fn matching_angle(tokens: &[Token], close: usize) -> Option<usize> {
    let mut depth = 0usize;
    for k in (0..=close).rev() {
        if tokens[k].is_punct(">") {
            depth += 1;
        } else if tokens[k].is_punct("<") {
            depth -= 1;
            if depth == 0 {
                return Some(k);
            }
        } else if !(tokens[k].ident().is_some()
            || tokens[k].is_punct(",")
            || tokens[k].is_punct(".")
            || tokens[k].is_punct("?")
            || tokens[k].is_punct("[")
            || tokens[k].is_punct("]"))
        {
            return None;
        }
    }
    None
}

/// Kotlin type starting at `start`: `a.b.Type<...>?`. Returns the type
/// (generics and nullability dropped) and the index after it.
fn kotlin_type_at(tokens: &[Token], start: usize) -> (Option<String>, usize) {
    let (path, mut end) = dotted_path(tokens, start);
    if path.is_empty() {
        return (None, start);
    }
    if tokens.get(end).is_some_and(|t| t.is_punct("<")) {
        let mut depth = 0usize;
        while let Some(t) = tokens.get(end) {
            if t.is_punct("<") {
                depth += 1;
            } else if t.is_punct(">") {
                depth -= 1;
                if depth == 0 {
                    end += 1;
                    break;
                }
            }
            end += 1;
        }
    }
    if tokens.get(end).is_some_and(|t| t.is_punct("?")) {
        end += 1;
    }
    (Some(path.join(".")), end)
}

/// `f(name = value)` or `@Anno(name = value)`
fn is_named_argument(tokens: &[Token], i: usize) -> bool {
    i > 0 && (tokens[i - 1].is_punct("(") || tokens[i - 1].is_punct(","))
        && enclosing_open(tokens, i).is_some_and(|open| tokens[open].is_punct("("))
}

/// Index of the innermost unclosed bracket before `i`
fn enclosing_open(tokens: &[Token], i: usize) -> Option<usize> {
    let mut k = i;
    while k > 0 {
        k -= 1;
        let t = &tokens[k];
        if t.is_punct(")") || t.is_punct("]") || t.is_punct("}") {
            k = matching_open(tokens, k)?;
        } else if t.is_punct("(") || t.is_punct("[") || t.is_punct("{") {
            return Some(k);
        }
    }
    None
}

/// Index one past the end of the expression starting at `start`.
///
/// Java expressions end at a depth-0 `;` or `,` or an unbalanced closing
/// bracket. Kotlin expressions may also end at a line break unless the
/// line ends or the next one starts with a binary operator.
pub(crate) fn expression_end(tokens: &[Token], start: usize, language: SourceLanguage) -> usize {
    const CONTINUATION: &[&str] = &[
        "+", "-", "*", "/", "%", ".", "?.", "?:", "&&", "||", "=", "(", "[", ",", "==", "!=",
    ];
    let mut i = start;
    while i < tokens.len() {
        let t = &tokens[i];
        if language.has_optional_semicolons() && i > start {
            let prev = &tokens[i - 1];
            let new_line = t.span.line > prev.span.line + newlines_in(prev);
            let continued = matches!(prev.kind, TokenKind::Punct(p) if CONTINUATION.contains(&p))
                || t.is_punct(".")
                || t.is_punct("?.")
                || t.is_punct("?:")
                || t.is_punct("+");
            if new_line && !continued {
                return i;
            }
        }
        if t.is_punct("(") || t.is_punct("[") || t.is_punct("{") {
            match matching_close(tokens, i) {
                Some(close) => {
                    i = close + 1;
                    continue;
                }
                None => return tokens.len(),
            }
        }
        if [";", ",", ")", "]", "}"].iter().any(|p| t.is_punct(p)) {
            return i;
        }
        i += 1;
    }
    tokens.len()
}

/// Line breaks inside a token (multi-line raw strings)
fn newlines_in(token: &Token) -> usize {
    match &token.kind {
        TokenKind::Str {
            value, raw: true, ..
        } => value.matches('\n').count(),
        _ => 0,
    }
}
