//! Output formatting

use std::collections::BTreeSet;
use std::io::{self, Write};

use sqlitelint_core::{Diagnostic, FileReport, Issue, RuleRegistry, Severity};

use crate::args::OutputFormat;

/// Output formatter for diagnostics
pub struct OutputFormatter<'a> {
    format: OutputFormat,
    registry: &'a RuleRegistry,
    /// Show the source line under each human-readable diagnostic
    show_lines: bool,
    /// Append explanations of the reported issues
    explain: bool,
    color: bool,
}

impl<'a> OutputFormatter<'a> {
    pub fn new(format: OutputFormat, registry: &'a RuleRegistry) -> Self {
        Self {
            format,
            registry,
            show_lines: true,
            explain: false,
            color: false,
        }
    }

    pub fn with_lines(mut self, show_lines: bool) -> Self {
        self.show_lines = show_lines;
        self
    }

    pub fn with_explanations(mut self, explain: bool) -> Self {
        self.explain = explain;
        self
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Write every report in the configured format.
    ///
    /// JSON lists every checked file; the other formats only show files
    /// with diagnostics.
    pub fn write_reports(&self, out: &mut dyn Write, reports: &[FileReport]) -> io::Result<()> {
        let all: Vec<&FileReport> = reports.iter().collect();
        let flagged: Vec<&FileReport> = reports
            .iter()
            .filter(|r| !r.diagnostics.is_empty())
            .collect();
        match self.format {
            OutputFormat::Human => self.write_human(out, &flagged),
            OutputFormat::Json => self.write_json(out, &all),
            OutputFormat::Sarif => self.write_sarif(out, &flagged),
        }
    }

    fn severity_label(&self, severity: Severity) -> String {
        if !self.color {
            return severity.name().to_string();
        }
        let code = match severity {
            Severity::Fatal | Severity::Error => "31",
            Severity::Warning => "33",
            Severity::Info => "34",
        };
        format!("\x1b[{code}m{}\x1b[0m", severity.name())
    }

    fn write_human(&self, out: &mut dyn Write, reports: &[&FileReport]) -> io::Result<()> {
        for report in reports {
            let file_name = report.file.display().to_string();
            for diag in &report.diagnostics {
                self.write_human_diagnostic(out, &file_name, &report.source, diag)?;
            }
        }

        if self.explain {
            let reported: BTreeSet<&str> = reports
                .iter()
                .flat_map(|r| r.diagnostics.iter().map(|d| d.issue.as_str()))
                .collect();
            for issue in reported.into_iter().filter_map(|id| self.registry.issue(id)) {
                write_explanation(out, issue)?;
            }
        }
        Ok(())
    }

    fn write_human_diagnostic(
        &self,
        out: &mut dyn Write,
        file_name: &str,
        source: &str,
        diag: &Diagnostic,
    ) -> io::Result<()> {
        writeln!(
            out,
            "{}[{}]: {}",
            self.severity_label(diag.severity),
            diag.code(),
            diag.message
        )?;

        if let Some(span) = &diag.span {
            let (line, col) = if span.line > 0 {
                (span.line, span.column)
            } else {
                offset_to_line_col(source, span.offset)
            };
            writeln!(out, "  --> {}:{}:{}", file_name, line, col)?;

            if let Some(source_line) = get_source_line(source, line).filter(|_| self.show_lines) {
                let width = line.to_string().len().max(3);
                let gutter = " ".repeat(width);
                writeln!(out, "{} |", gutter)?;
                writeln!(out, "{:>width$} | {}", line, source_line)?;

                let line_chars = source_line.chars().count();
                let padding = " ".repeat(col.saturating_sub(1));
                let underline = "^".repeat(
                    span.length
                        .min(line_chars.saturating_sub(col.saturating_sub(1)))
                        .max(1),
                );
                writeln!(out, "{} | {}{}", gutter, padding, underline)?;
            }
        }

        if let Some(help) = &diag.help {
            writeln!(out, "   = help: {}", help)?;
        }

        writeln!(out)
    }

    fn write_json(&self, out: &mut dyn Write, reports: &[&FileReport]) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *out, reports)?;
        writeln!(out)
    }

    fn write_sarif(&self, out: &mut dyn Write, reports: &[&FileReport]) -> io::Result<()> {
        let issues: Vec<&'static Issue> = self.registry.issues().collect();
        let rules: Vec<serde_json::Value> = issues
            .iter()
            .map(|issue| {
                serde_json::json!({
                    "id": issue.id,
                    "name": issue.id,
                    "shortDescription": { "text": issue.title },
                    "fullDescription": { "text": issue.plain_explanation() },
                    "helpUri": issue.more_info.first(),
                    "defaultConfiguration": {
                        "level": sarif_level(issue.default_severity),
                        "enabled": issue.enabled_by_default
                    },
                    "properties": {
                        "category": issue.category.name(),
                        "priority": issue.priority
                    }
                })
            })
            .collect();

        let results: Vec<serde_json::Value> = reports
            .iter()
            .flat_map(|report| {
                let uri = report.file.display().to_string();
                report.diagnostics.iter().map(move |d| (uri.clone(), d))
            })
            .map(|(uri, d)| {
                let mut location = serde_json::json!({
                    "physicalLocation": {
                        "artifactLocation": { "uri": uri }
                    }
                });
                if let Some(span) = &d.span {
                    location["physicalLocation"]["region"] = serde_json::json!({
                        "startLine": span.line,
                        "startColumn": span.column,
                        "charOffset": span.offset,
                        "charLength": span.length
                    });
                }
                let mut message = d.message.clone();
                if let Some(help) = &d.help {
                    message = format!("{message}\n{help}");
                }
                serde_json::json!({
                    "ruleId": d.code(),
                    "ruleIndex": issues.iter().position(|i| i.id == d.issue),
                    "level": sarif_level(d.severity),
                    "message": { "text": message },
                    "locations": [location]
                })
            })
            .collect();

        let sarif = serde_json::json!({
            "$schema": "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json",
            "version": "2.1.0",
            "runs": [{
                "tool": {
                    "driver": {
                        "name": "sqlitelint",
                        "version": env!("CARGO_PKG_VERSION"),
                        "rules": rules
                    }
                },
                "results": results
            }]
        });

        serde_json::to_writer_pretty(&mut *out, &sarif)?;
        writeln!(out)
    }
}

fn sarif_level(severity: Severity) -> &'static str {
    match severity {
        Severity::Fatal | Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info => "note",
    }
}

/// Full description of an issue, for `--explain` and `issues <ID>`
pub fn write_explanation(out: &mut dyn Write, issue: &Issue) -> io::Result<()> {
    writeln!(out, "{}: {}", issue.id, issue.title)?;
    writeln!(
        out,
        "Category: {}, priority {}/10, severity {}{}",
        issue.category,
        issue.priority,
        issue.default_severity,
        if issue.enabled_by_default {
            ""
        } else {
            " (disabled by default)"
        }
    )?;
    writeln!(out)?;
    writeln!(out, "{}", issue.plain_explanation())?;
    for url in issue.more_info {
        writeln!(out, "More info: {}", url)?;
    }
    writeln!(out)
}

/// Convert byte offset to line and column (1-indexed)
fn offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;

    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/// Get a specific line from source (1-indexed)
fn get_source_line(source: &str, line: usize) -> Option<&str> {
    source.lines().nth(line.saturating_sub(1))
}
