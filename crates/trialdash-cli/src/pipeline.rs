//! Report pipeline stages: load, resolve, build, export.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, info, info_span, warn};

use trialdash_ingest::{
    Fetcher, LoadReport, centers, join_event_sites, load_display_terms, load_event_records,
    load_site_activation, load_site_ranges, load_subject_records, resolve_screening_sites,
};
use trialdash_model::{
    DisplayDictionary, EventRecord, ReportWindow, SiteActivation, SiteRangeTable, SubjectRecord,
};
use trialdash_output::{WorkbookOutput, report_to_json, write_workbook};
use trialdash_tables::{Report, ReportInputs, SiteKey, build_report};

use crate::config::ReportConfig;
use crate::logging::redact_value;

pub const REPORT_JSON_FILE: &str = "report.json";

/// Everything fetched for one run.
#[derive(Debug, Default)]
pub struct LoadedData {
    pub dictionary: DisplayDictionary,
    /// Why the dictionary is empty, when loading it failed.
    pub dictionary_error: Option<String>,
    pub subjects: LoadReport<SubjectRecord>,
    pub events: LoadReport<EventRecord>,
    pub ranges: Option<SiteRangeTable>,
    pub activation: Vec<SiteActivation>,
    pub errors: Vec<String>,
}

/// Loads the dictionary, reference tables and record sources.
///
/// Only the dictionary is needed before the records; a failing reference
/// table is recorded and the run continues without it.
pub fn load<F: Fetcher + ?Sized>(config: &ReportConfig, fetcher: &F) -> LoadedData {
    let span = info_span!("load", units = config.sources.units.len());
    let _guard = span.enter();
    let start = Instant::now();
    let mut data = LoadedData::default();

    match load_display_terms(&config.display_terms(), fetcher) {
        Ok(dictionary) => data.dictionary = dictionary,
        Err(error) => {
            warn!(%error, "display terms unavailable, labels fall back to raw codes");
            data.dictionary_error = Some(error.to_string());
        }
    }

    if let Some(location) = config.screening_sites() {
        match load_site_ranges(&location, fetcher) {
            Ok(ranges) => data.ranges = Some(ranges),
            Err(error) => {
                warn!(%error, "screening site ranges unavailable");
                data.errors.push(format!("screening sites: {error}"));
            }
        }
    }
    if let Some(location) = config.site_activation() {
        match load_site_activation(&location, fetcher) {
            Ok(activation) => data.activation = activation,
            Err(error) => {
                warn!(%error, "site activation schedule unavailable");
                data.errors.push(format!("site activation: {error}"));
            }
        }
    }

    let units = &config.sources.units;
    data.subjects = load_subject_records(&config.subjects(), units, &data.dictionary, fetcher);
    if let Some(location) = config.events() {
        data.events = load_event_records(&location, units, &data.dictionary, fetcher);
    }
    let unit_errors: Vec<String> = data
        .subjects
        .failures()
        .chain(data.events.failures())
        .map(|failure| format!("{} ({}): {}", failure.unit, failure.location, failure.status))
        .collect();
    data.errors.extend(unit_errors);

    info!(
        subjects = data.subjects.records.len(),
        events = data.events.records.len(),
        failed_units = data.subjects.failures().count() + data.events.failures().count(),
        duration_ms = start.elapsed().as_millis(),
        "load complete"
    );
    data
}

/// Attaches screening sites and event centers; returns the center row set.
pub fn resolve(data: &mut LoadedData) -> Vec<String> {
    let span = info_span!("resolve");
    let _guard = span.enter();

    if let Some(ranges) = &data.ranges {
        let resolved = resolve_screening_sites(ranges, &mut data.subjects.records);
        for record in data
            .subjects
            .records
            .iter()
            .filter(|record| record.screening_site.is_none())
        {
            let id = record.screening_id.map(|id| id.to_string()).unwrap_or_default();
            debug!(screening_id = redact_value(&id), "no screening site for subject");
        }
        info!(resolved, total = data.subjects.records.len(), "screening sites");
    }
    let joined = join_event_sites(&mut data.events.records, &data.subjects.records);
    let centers = centers(&data.subjects.records);
    info!(
        events_joined = joined,
        centers = centers.len(),
        "resolve complete"
    );
    centers
}

pub fn build(data: &LoadedData, centers: &[String], window: &ReportWindow) -> Report {
    let span = info_span!("build");
    let _guard = span.enter();
    let start = Instant::now();
    let inputs = ReportInputs {
        subjects: &data.subjects.records,
        events: &data.events.records,
        dictionary: &data.dictionary,
        activation: &data.activation,
        centers,
        screening_key: if data.ranges.is_some() {
            SiteKey::ScreeningSite
        } else {
            SiteKey::Center
        },
    };
    let report = build_report(&inputs, window);
    info!(
        sheets = report.sheets.len(),
        failed = report.failures.len(),
        duration_ms = start.elapsed().as_millis(),
        "build complete"
    );
    report
}

#[derive(Debug, Clone, Default)]
pub struct ExportResult {
    pub workbook: WorkbookOutput,
    pub json: Option<PathBuf>,
}

pub fn export(report: &Report, output_dir: &Path, write_json: bool) -> Result<ExportResult> {
    let span = info_span!("export", dir = %output_dir.display());
    let _guard = span.enter();
    let workbook = write_workbook(output_dir, report).context("write workbook")?;
    let json = if write_json {
        let path = output_dir.join(REPORT_JSON_FILE);
        let payload = report_to_json(report).context("serialize report")?;
        let text = serde_json::to_string_pretty(&payload)?;
        fs::write(&path, text).with_context(|| format!("write {}", path.display()))?;
        Some(path)
    } else {
        None
    };
    Ok(ExportResult { workbook, json })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Build every table but write nothing.
    pub dry_run: bool,
    pub write_json: bool,
}

#[derive(Debug)]
pub struct PipelineResult {
    pub report: Report,
    pub data: LoadedData,
    pub output_dir: PathBuf,
    pub export: Option<ExportResult>,
}

impl PipelineResult {
    /// Load failures, unusable reference data or failed tables.
    pub fn has_errors(&self) -> bool {
        self.data.dictionary_error.is_some()
            || !self.data.errors.is_empty()
            || !self.report.failures.is_empty()
    }
}

/// Runs every stage. Only an export failure aborts the run; everything
/// upstream degrades and is reported on the result.
pub fn run_pipeline<F: Fetcher + ?Sized>(
    config: &ReportConfig,
    window: &ReportWindow,
    options: RunOptions,
    fetcher: &F,
) -> Result<PipelineResult> {
    let mut data = load(config, fetcher);
    let centers = resolve(&mut data);
    let report = build(&data, &centers, window);
    let output_dir = config.output_dir();
    let export = if options.dry_run {
        info!(dir = %output_dir.display(), "export skipped (dry run)");
        None
    } else {
        Some(export(&report, &output_dir, options.write_json)?)
    };
    Ok(PipelineResult {
        report,
        data,
        output_dir,
        export,
    })
}
