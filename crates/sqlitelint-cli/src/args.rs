//! CLI argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use sqlitelint_core::{LintError, SeverityOverride};

#[derive(Parser)]
#[command(name = "sqlitelint")]
#[command(author, version, about = "Lint SQLite schema statements in Android sources")]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check Java and Kotlin sources
    Check(CheckArgs),

    /// List registered issues, or explain one
    Issues {
        /// Issue id to explain
        id: Option<String>,
    },

    /// Show the calls found in a file and how they resolve (for debugging)
    Calls {
        /// Source file to inspect
        file: PathBuf,

        /// Source language (java, kotlin); detected from the extension by default
        #[arg(short, long)]
        language: Option<String>,
    },
}

#[derive(clap::Args, Debug, Default)]
pub struct CheckArgs {
    /// Source files to check (supports glob patterns)
    pub files: Vec<PathBuf>,

    /// Configuration file (default: sqlitelint.toml in this or a parent directory)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Source language (java, kotlin); detected from the extension by default
    #[arg(short, long)]
    pub language: Option<String>,

    /// Issue ids or categories to disable
    #[arg(long, value_name = "ID", value_delimiter = ',')]
    pub disable: Vec<String>,

    /// Issue ids or categories to enable
    #[arg(long, value_name = "ID", value_delimiter = ',')]
    pub enable: Vec<String>,

    /// Only check these issue ids or categories
    #[arg(long, value_name = "ID", value_delimiter = ',')]
    pub check: Vec<String>,

    /// Severity for an issue id or category, e.g. `SQLiteString=error`
    #[arg(long, value_name = "ID=LEVEL", value_delimiter = ',', value_parser = parse_severity)]
    pub severity: Vec<(String, SeverityOverride)>,

    /// Report warnings as errors
    #[arg(short = 'W', long)]
    pub warnings_as_errors: bool,

    /// Do not report warnings
    #[arg(short = 'w', long)]
    pub ignore_warnings: bool,

    /// Explain each reported issue
    #[arg(long)]
    pub explain: bool,

    /// Write the report to FILE (`stdout` and `stderr` are accepted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<String>,

    /// Do not show source lines in human output
    #[arg(long)]
    pub no_lines: bool,
}

/// `ID=LEVEL` as given to `--severity`
fn parse_severity(value: &str) -> Result<(String, SeverityOverride), LintError> {
    let (id, level) = value
        .split_once('=')
        .ok_or_else(|| LintError::UnknownSeverity(value.to_string()))?;
    Ok((id.trim().to_string(), level.trim().parse()?))
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output
    Json,
    /// SARIF output (for GitHub Code Scanning)
    Sarif,
}
