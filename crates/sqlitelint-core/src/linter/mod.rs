//! Linter - runs registered rules over the calls in a source file

use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::catalog::TypeCatalog;
use crate::error::{Diagnostic, LintError, Result, Span};
use crate::language::SourceLanguage;
use crate::options::LintOptions;
use crate::rule::{
    ConstantEvaluator, LintContext, MethodCall, ReportSink, ResolvedMethod, RuleRegistry,
};
use crate::source::{matching_close, matching_open, CallExpr, SourceFile, Suppressions, Token};

/// Bound on nested receiver lookups
const MAX_DEPTH: usize = 16;

/// Linter - resolves calls against a type catalog and hands them to rules
pub struct Linter<'a> {
    registry: &'a RuleRegistry,
    catalog: &'a TypeCatalog,
    options: &'a LintOptions,
}

/// Diagnostics for one file
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: PathBuf,
    #[serde(skip)]
    pub source: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// A discovered call, as shown by the `calls` debug view
#[derive(Debug, Clone, Serialize)]
pub struct CallReport {
    pub method: String,
    pub receiver: String,
    pub receiver_type: Option<String>,
    pub resolved: Option<ResolvedMethod>,
    /// Folded value of each argument, when it is a constant string
    pub arguments: Vec<Option<String>>,
    pub span: Span,
}

impl<'a> Linter<'a> {
    pub fn new(
        registry: &'a RuleRegistry,
        catalog: &'a TypeCatalog,
        options: &'a LintOptions,
    ) -> Self {
        Self {
            registry,
            catalog,
            options,
        }
    }

    /// Lint source text and return diagnostics ordered by position
    pub fn lint_source(&self, source: &str, language: SourceLanguage) -> Vec<Diagnostic> {
        let file = SourceFile::parse(source, language);
        let mut diagnostics = Vec::new();
        self.lint_parsed(&file, &mut diagnostics);
        diagnostics.sort_by_key(|d| d.span.map(|s| s.offset));
        diagnostics
    }

    /// Read and lint a file; the language comes from the extension unless given
    pub fn lint_file(&self, path: &Path, language: Option<SourceLanguage>) -> Result<FileReport> {
        let language = language
            .or_else(|| SourceLanguage::from_path(path))
            .ok_or_else(|| LintError::UnsupportedFile {
                path: path.to_path_buf(),
            })?;
        let source = std::fs::read_to_string(path).map_err(|source| LintError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), language = %language, "linting file");
        let diagnostics = self.lint_source(&source, language);
        Ok(FileReport {
            file: path.to_path_buf(),
            source,
            diagnostics,
        })
    }

    /// Every member call in `source` with its resolution and folded arguments
    pub fn calls(&self, source: &str, language: SourceLanguage) -> Vec<CallReport> {
        let file = SourceFile::parse(source, language);
        file.calls()
            .iter()
            .map(|call| {
                let receiver_type = self.type_of(&file, call.receiver.clone(), 0);
                let resolved = receiver_type.as_deref().and_then(|ty| {
                    self.catalog
                        .resolve_method(ty, &call.method_name, call.arguments.len())
                });
                CallReport {
                    method: call.method_name.clone(),
                    receiver: file.snippet(call.receiver.clone()).to_string(),
                    receiver_type,
                    resolved,
                    arguments: call
                        .arguments
                        .iter()
                        .map(|arg| file.evaluate_string(*arg))
                        .collect(),
                    span: call.span,
                }
            })
            .collect()
    }

    fn lint_parsed(&self, file: &SourceFile, sink: &mut dyn ReportSink) {
        let suppressions = Suppressions::collect(file);
        let ctx = LintContext::new(file);

        for call in file.calls() {
            let rules: Vec<_> = self
                .registry
                .rules_for_method(&call.method_name)
                .filter(|rule| self.options.is_enabled(rule.issue()))
                .collect();
            if rules.is_empty() {
                continue;
            }
            let Some(method) = self.resolve_call(file, call) else {
                tracing::debug!(
                    method = %call.method_name,
                    receiver = %file.snippet(call.receiver.clone()),
                    line = call.span.line,
                    "could not resolve call"
                );
                continue;
            };
            let method_call = MethodCall {
                method_name: &call.method_name,
                arguments: &call.arguments,
                span: call.span,
            };

            for rule in rules {
                let issue = rule.issue();
                let Some(diagnostic) = rule.visit_method_call(&ctx, &method_call, &method) else {
                    continue;
                };
                if suppressions.is_suppressed(issue.id, &call.span) {
                    tracing::debug!(issue = issue.id, line = call.span.line, "suppressed");
                    continue;
                }
                if let Some(diagnostic) = self.options.apply(issue, diagnostic) {
                    sink.report(diagnostic);
                }
            }
        }
    }

    fn resolve_call(&self, file: &SourceFile, call: &CallExpr) -> Option<ResolvedMethod> {
        let class = self.type_of(file, call.receiver.clone(), 0)?;
        self.catalog
            .resolve_method(&class, &call.method_name, call.arguments.len())
    }

    /// Qualified type of the expression in `range`, when it can be told
    fn type_of(&self, file: &SourceFile, range: Range<usize>, depth: usize) -> Option<String> {
        if depth > MAX_DEPTH || range.is_empty() {
            return None;
        }
        let tokens = &file.tokens()[range.clone()];
        let last = tokens.len() - 1;

        // `x!!`
        if tokens[last].is_punct("!!") {
            return self.type_of(file, range.start..range.end - 1, depth + 1);
        }

        // `(expr)`, `(expr as Type)` and Java casts `(Type) expr`
        if tokens[0].is_punct("(") {
            let close = matching_close(tokens, 0)?;
            let inner = range.start + 1..range.start + close;
            if close == last {
                return self.parenthesized_type(file, inner, depth);
            }
            let written = dotted(&tokens[1..close])?;
            return Some(self.qualify(file, &written));
        }

        // `name` or `this.name`
        let this_field =
            tokens.len() == 3 && tokens[0].is_ident("this") && tokens[1].is_punct(".");
        if tokens.len() == 1 || this_field {
            let name = tokens[last].ident()?;
            return self.variable_type(file, name, depth);
        }

        // `receiver.method(...)`, `method(...)` or `new Type(...)`
        if tokens[last].is_punct(")") {
            let open = matching_open(tokens, last)?;
            let name_at = open.checked_sub(1)?;
            let name = tokens[name_at].ident()?;
            if name_at == 1 && tokens[0].is_ident("new") {
                return Some(self.qualify(file, name));
            }
            return match member_receiver(tokens, name_at) {
                Some(end) => {
                    let receiver = self.type_of(file, range.start..range.start + end, depth + 1)?;
                    self.catalog
                        .return_type_of(name, Some(&receiver))
                        .map(str::to_string)
                }
                None if name_at == 0 => self.bare_return_type(file, name),
                None => None,
            };
        }

        // Kotlin property access `receiver.writableDatabase`
        let name = tokens[last].ident()?;
        let end = member_receiver(tokens, last)?;
        let receiver = self.type_of(file, range.start..range.start + end, depth + 1)?;
        self.catalog
            .return_type_of(&getter_name(name), Some(&receiver))
            .map(str::to_string)
    }

    fn parenthesized_type(
        &self,
        file: &SourceFile,
        inner: Range<usize>,
        depth: usize,
    ) -> Option<String> {
        let tokens = &file.tokens()[inner.clone()];
        // Kotlin `expr as Type` / `expr as? Type`
        if let Some(at) = tokens.iter().rposition(|t| t.is_ident("as")) {
            let mut ty = &tokens[at + 1..];
            if ty.first().is_some_and(|t| t.is_punct("?")) {
                ty = &ty[1..];
            }
            let written = dotted(ty)?;
            return Some(self.qualify(file, &written));
        }
        self.type_of(file, inner, depth + 1)
    }

    fn variable_type(&self, file: &SourceFile, name: &str, depth: usize) -> Option<String> {
        let symbols = file.symbols();
        if let Some(written) = symbols.declared_type(name) {
            return Some(self.qualify(file, written));
        }
        if let Some(init) = symbols.initializer(name) {
            return self.type_of(file, init, depth + 1);
        }
        // Kotlin property of an enclosing class, e.g. `writableDatabase`
        if file.language() == SourceLanguage::Kotlin {
            return self.bare_return_type(file, &getter_name(name));
        }
        None
    }

    /// Return type of a call without a receiver, narrowed to the classes
    /// the file imports when the catalog is ambiguous
    fn bare_return_type(&self, file: &SourceFile, method: &str) -> Option<String> {
        if let Some(ty) = self.catalog.return_type_of(method, None) {
            return Some(ty.to_string());
        }
        let mut found: Option<&str> = None;
        for class in self.imported_classes(file) {
            let Some(ty) = self.catalog.return_type_of(method, Some(&class)) else {
                continue;
            };
            match found {
                Some(existing) if existing != ty => return None,
                _ => found = Some(ty),
            }
        }
        found.map(str::to_string)
    }

    /// Catalog classes visible in `file` through imports or its package
    fn imported_classes(&self, file: &SourceFile) -> Vec<String> {
        let symbols = file.symbols();
        self.catalog
            .classes()
            .map(|class| class.name.as_str())
            .filter(|name| {
                let (package, simple) = match name.rsplit_once('.') {
                    Some(parts) => parts,
                    None => ("", *name),
                };
                symbols.import(simple) == Some(*name)
                    || symbols.wildcard_imports().iter().any(|w| w == package)
                    || symbols.package() == Some(package)
            })
            .map(str::to_string)
            .collect()
    }

    /// Qualify a type name as written in `file`
    fn qualify(&self, file: &SourceFile, written: &str) -> String {
        let symbols = file.symbols();
        let (first, rest) = match written.split_once('.') {
            Some((first, rest)) => (first, Some(rest)),
            None => (written, None),
        };
        if let Some(imported) = symbols.import(first) {
            return match rest {
                Some(rest) => format!("{imported}.{rest}"),
                None => imported.to_string(),
            };
        }
        if rest.is_some() {
            return written.to_string();
        }
        let packages = symbols
            .wildcard_imports()
            .iter()
            .map(String::as_str)
            .chain(symbols.package());
        for package in packages {
            let candidate = format!("{package}.{written}");
            if self.catalog.get_class(&candidate).is_some() {
                return candidate;
            }
        }
        written.to_string()
    }
}

/// End of the receiver of the member named at `name_at`, when it is
/// preceded by `.` or `?.`
fn member_receiver(tokens: &[Token], name_at: usize) -> Option<usize> {
    let dot = name_at.checked_sub(1)?;
    let is_member = tokens[dot].is_punct(".") || tokens[dot].is_punct("?.");
    (is_member && dot > 0).then_some(dot)
}

/// `a.b.C` written as tokens, or `None` if the tokens are anything else
fn dotted(tokens: &[Token]) -> Option<String> {
    let mut parts = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        if i % 2 == 0 {
            parts.push(token.ident()?);
        } else if !token.is_punct(".") {
            return None;
        }
    }
    (tokens.len() % 2 == 1).then(|| parts.join("."))
}

/// Java getter behind a Kotlin property: `writableDatabase` -> `getWritableDatabase`
fn getter_name(property: &str) -> String {
    let mut chars = property.chars();
    match chars.next() {
        Some(first) => format!("get{}{}", first.to_uppercase(), chars.as_str()),
        None => String::new(),
    }
}
