use anyhow::{Context, Result};
use chrono::Local;
use comfy_table::Table;
use tracing::{info, info_span};

use trialdash_cli::config::ReportConfig;
use trialdash_cli::pipeline::{PipelineResult, RunOptions, run_pipeline};
use trialdash_ingest::HttpFetcher;
use trialdash_output::sheet_file_name;
use trialdash_tables::SheetId;

use crate::cli::{ConfigArg, ReportArgs};
use crate::summary::apply_table_style;

pub fn run_tables() -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["Id", "Sheet", "File", "Title"]);
    apply_table_style(&mut table);
    for id in SheetId::ALL {
        table.add_row(vec![
            id.id().to_string(),
            id.sheet_name().to_string(),
            sheet_file_name(id.sheet_name()),
            id.title().to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn run_check_config(args: &ConfigArg) -> Result<()> {
    let config = ReportConfig::load(&args.config)?;
    let mut table = Table::new();
    table.set_header(vec!["Setting", "Value"]);
    apply_table_style(&mut table);
    let optional = |location: Option<trialdash_ingest::Location>| {
        location.map_or_else(|| "-".to_string(), |location| location.to_string())
    };
    let subjects = config.subjects();
    let window = config.window(Local::now().date_naive());
    let rows = [
        ("display terms", config.display_terms().to_string()),
        ("screening sites", optional(config.screening_sites())),
        ("site activation", optional(config.site_activation())),
        (
            "subjects",
            format!("{} ({:?})", subjects.location, subjects.format),
        ),
        ("events", optional(config.events())),
        ("units", config.sources.units.join(", ")),
        ("report window", window.range_message()),
        ("consent days", config.report.consent_days.to_string()),
        (
            "fetch timeout",
            format!("{}s", config.report.fetch_timeout_secs),
        ),
        ("output dir", config.output_dir().display().to_string()),
        ("write json", config.report.write_json.to_string()),
    ];
    for (setting, value) in rows {
        table.add_row(vec![setting.to_string(), value]);
    }
    println!("{table}");
    Ok(())
}

pub fn run_report(args: &ReportArgs) -> Result<PipelineResult> {
    let mut config = ReportConfig::load(&args.config.config)?;
    apply_overrides(&mut config, args);
    config.validate().context("invalid report settings")?;

    let window = config.window(Local::now().date_naive());
    let span = info_span!("report", today = %window.today, end = %window.end);
    let _guard = span.enter();
    info!(range = %window.range_message(), "starting report");

    let fetcher = HttpFetcher::new(config.fetch_timeout()).context("build http client")?;
    let options = RunOptions {
        dry_run: args.dry_run,
        write_json: args.json || config.report.write_json,
    };
    run_pipeline(&config, &window, options, &fetcher)
}

fn apply_overrides(config: &mut ReportConfig, args: &ReportArgs) {
    let report = &mut config.report;
    if let Some(date) = args.report_date {
        report.report_date = Some(date);
    }
    if let Some(date) = args.end_date {
        report.report_end = Some(date);
    }
    if let Some(days) = args.report_days {
        report.report_days = days;
    }
    if let Some(days) = args.consent_days {
        report.consent_days = days;
    }
    // Flags are relative to the working directory, not the config file.
    if let Some(dir) = &args.output_dir {
        report.output_dir = std::path::absolute(dir).unwrap_or_else(|_| dir.clone());
    }
}
