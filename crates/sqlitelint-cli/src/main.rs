//! sqlitelint CLI - lint SQLite schema statements in Android sources

mod args;
mod config;
mod output;

use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use miette::{IntoDiagnostic, Result, WrapErr};
use sqlitelint_core::{
    ClassDef, FileReport, LintError, LintOptions, Linter, RuleRegistry, Severity, SourceLanguage,
    TypeCatalog,
};
use tracing_subscriber::EnvFilter;

use crate::args::{Args, CheckArgs, Command};
use crate::config::Config;
use crate::output::{write_explanation, OutputFormatter};

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose, args.quiet);

    match run(args) {
        Ok(has_errors) => {
            if has_errors {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::WARN,
        (false, 1) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(io::stderr)
        .init();
}

fn run(args: Args) -> Result<bool> {
    let registry = RuleRegistry::builtin();
    match args.command {
        Command::Check(check) => run_check(&registry, &check, args.quiet),
        Command::Issues { id } => {
            let mut stdout = io::stdout().lock();
            match id {
                Some(id) => {
                    let issue = registry
                        .issue(&id)
                        .ok_or_else(|| LintError::UnknownIssue(id.clone()))?;
                    write_explanation(&mut stdout, issue).into_diagnostic()?;
                }
                None => {
                    for issue in registry.issues() {
                        writeln!(
                            stdout,
                            "{:<16} {:<12} {:<8} {}",
                            issue.id,
                            issue.category.name(),
                            issue.default_severity.name(),
                            issue.title
                        )
                        .into_diagnostic()?;
                    }
                }
            }
            Ok(false)
        }
        Command::Calls { file, language } => {
            let language = parse_language(language.as_deref())?
                .or_else(|| SourceLanguage::from_path(&file))
                .ok_or_else(|| LintError::UnsupportedFile { path: file.clone() })?;
            let source = std::fs::read_to_string(&file)
                .map_err(|source| LintError::Io {
                    path: file.clone(),
                    source,
                })?;

            let config = Config::find_and_load()?.unwrap_or_default();
            let catalog = load_catalog(config.classes);
            let options = LintOptions::default();
            let linter = Linter::new(&registry, &catalog, &options);
            let calls = linter.calls(&source, language);
            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &calls).into_diagnostic()?;
            writeln!(stdout).into_diagnostic()?;
            Ok(false)
        }
    }
}

fn run_check(registry: &RuleRegistry, args: &CheckArgs, quiet: bool) -> Result<bool> {
    // Load configuration
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::find_and_load()?.unwrap_or_default(),
    };

    // Merge CLI args with config (CLI takes precedence)
    let config = config.merge_with_args(args);
    config.lint.validate(registry);

    let language = parse_language(config.language.as_deref())?;
    let files = collect_files(&config.files)?;
    if files.is_empty() {
        miette::bail!(
            "No source files specified. Pass files or globs, or configure `files` in sqlitelint.toml"
        );
    }

    let options = config.lint.clone();
    let catalog = load_catalog(config.classes.clone());
    let linter = Linter::new(registry, &catalog, &options);

    let mut reports = Vec::with_capacity(files.len());
    for path in &files {
        let report = linter
            .lint_file(path, language)
            .wrap_err_with(|| format!("failed to lint {}", path.display()))?;
        reports.push(report);
    }

    let (mut out, color) = open_output(config.output.as_deref())?;
    let formatter = OutputFormatter::new(config.format.unwrap_or_default(), registry)
        .with_lines(!options.no_lines)
        .with_explanations(options.explain_issues)
        .with_color(color);
    formatter
        .write_reports(out.as_mut(), &reports)
        .into_diagnostic()?;
    out.flush().into_diagnostic()?;

    let (errors, warnings) = count(&reports);
    if !quiet {
        if errors > 0 || warnings > 0 {
            eprintln!(
                "Found {} error(s), {} warning(s) in {} file(s)",
                errors,
                warnings,
                files.len()
            );
        } else {
            eprintln!("All {} file(s) passed", files.len());
        }
    }

    Ok(errors > 0 && options.abort_on_error)
}

fn parse_language(name: Option<&str>) -> Result<Option<SourceLanguage>> {
    Ok(name.map(str::parse::<SourceLanguage>).transpose()?)
}

/// Expand glob patterns and directories; plain files are taken as given
fn collect_files(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let path = Path::new(pattern);
        if path.is_dir() {
            for ext in SourceLanguage::extensions() {
                let nested = path.join("**").join(format!("*.{ext}"));
                expand_glob(&nested.to_string_lossy(), &mut files)?;
            }
        } else if pattern.contains(['*', '?', '[']) {
            expand_glob(pattern, &mut files)?;
        } else {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn expand_glob(pattern: &str, files: &mut Vec<PathBuf>) -> Result<()> {
    let paths = glob::glob(pattern)
        .into_diagnostic()
        .wrap_err_with(|| format!("invalid glob pattern {pattern}"))?;
    for path in paths.flatten() {
        if SourceLanguage::from_path(&path).is_some() {
            files.push(path);
        } else {
            tracing::debug!(path = %path.display(), "skipping non-source file");
        }
    }
    Ok(())
}

/// Built-in Android classes plus any declared in the configuration
fn load_catalog(classes: Vec<ClassDef>) -> TypeCatalog {
    let mut catalog = TypeCatalog::android();
    for class in classes {
        tracing::debug!(class = %class.name, "adding configured class");
        catalog.add_class(class);
    }
    catalog
}

/// Report destination and whether it supports colors
fn open_output(target: Option<&str>) -> Result<(Box<dyn Write>, bool)> {
    Ok(match target {
        None | Some("stdout") => {
            let stdout = io::stdout();
            let color = stdout.is_terminal();
            (Box::new(stdout), color)
        }
        Some("stderr") => {
            let stderr = io::stderr();
            let color = stderr.is_terminal();
            (Box::new(stderr), color)
        }
        Some(path) => {
            let file = File::create(path)
                .into_diagnostic()
                .wrap_err_with(|| format!("failed to create {path}"))?;
            (Box::new(io::BufWriter::new(file)), false)
        }
    })
}

/// Errors (including fatal) and warnings across all reports
fn count(reports: &[FileReport]) -> (usize, usize) {
    reports
        .iter()
        .flat_map(|r| &r.diagnostics)
        .fold((0, 0), |(errors, warnings), d| match d.severity {
            s if s.is_error() => (errors + 1, warnings),
            Severity::Warning => (errors, warnings + 1),
            _ => (errors, warnings),
        })
}
