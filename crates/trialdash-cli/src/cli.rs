//! CLI argument definitions for the weekly report runner.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "trialdash",
    version,
    about = "Weekly clinical trial operations report",
    long_about = "Fetch screening, consent, event and demographic records, build the\n\
                  weekly report tables and the enrollment curve, and export them as\n\
                  one CSV per sheet (plus an optional JSON payload)."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Include subject identifiers and free text in logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Fetch the data, build every table and export the report.
    Report(ReportArgs),

    /// List the report sheets in export order.
    Tables,

    /// Parse a config file and print it with paths resolved.
    CheckConfig(ConfigArg),
}

#[derive(Parser)]
pub struct ConfigArg {
    /// Path to the TOML run configuration.
    #[arg(long = "config", short = 'c', value_name = "FILE", default_value = "trialdash.toml")]
    pub config: PathBuf,
}

#[derive(Parser)]
pub struct ReportArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Date the report is generated on (default: config value, then today).
    #[arg(long = "report-date", value_name = "YYYY-MM-DD")]
    pub report_date: Option<NaiveDate>,

    /// Last day covered by the report (default: the report date).
    #[arg(long = "end-date", value_name = "YYYY-MM-DD")]
    pub end_date: Option<NaiveDate>,

    /// Length of the listing window in days.
    #[arg(long = "report-days", value_name = "DAYS")]
    pub report_days: Option<i64>,

    /// Window for the "consented in the last N days" column.
    #[arg(long = "consent-days", value_name = "DAYS")]
    pub consent_days: Option<i64>,

    /// Output directory (default: config value).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Also write the JSON presentation payload.
    #[arg(long = "json")]
    pub json: bool,

    /// Build every table but write nothing.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
