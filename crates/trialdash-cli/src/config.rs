//! TOML run configuration.
//!
//! ```toml
//! [sources]
//! display_terms = "assets/display_terms.csv"
//! screening_sites = "assets/screening_sites.csv"
//! site_activation = "assets/site_activation.csv"
//! subjects = { kind = "csv", location = "https://redcap.example.org/api/weekly.csv" }
//! events = "https://redcap.example.org/api/multi/{unit}.json"
//! units = ["site_a", "site_b"]
//!
//! [report]
//! report_days = 7
//! consent_days = 30
//! output_dir = "report"
//! ```
//!
//! Relative local paths are resolved against the directory of the config
//! file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use trialdash_ingest::{Location, SubjectFormat, SubjectSource};
use trialdash_model::{DEFAULT_CONSENT_DAYS, DEFAULT_REPORT_DAYS, ReportWindow};

pub const DEFAULT_OUTPUT_DIR: &str = "report";

/// Upper bound for `report_days` and `consent_days` (about a century).
pub const MAX_WINDOW_DAYS: i64 = 36_500;

const fn default_report_days() -> i64 {
    DEFAULT_REPORT_DAYS
}

const fn default_consent_days() -> i64 {
    DEFAULT_CONSENT_DAYS
}

const fn default_timeout_secs() -> u64 {
    30
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectsConfig {
    pub kind: SubjectFormat,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourcesConfig {
    pub display_terms: String,
    #[serde(default)]
    pub screening_sites: Option<String>,
    #[serde(default)]
    pub site_activation: Option<String>,
    pub subjects: SubjectsConfig,
    #[serde(default)]
    pub events: Option<String>,
    /// Organizational units substituted for `{unit}` in per-unit locations.
    #[serde(default)]
    pub units: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportSettings {
    /// Date printed as the generation date; today when unset.
    #[serde(default)]
    pub report_date: Option<NaiveDate>,
    /// Last day covered; the report date when unset.
    #[serde(default)]
    pub report_end: Option<NaiveDate>,
    #[serde(default = "default_report_days")]
    pub report_days: i64,
    #[serde(default = "default_consent_days")]
    pub consent_days: i64,
    #[serde(default = "default_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Also write `report.json` next to the sheets.
    #[serde(default)]
    pub write_json: bool,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            report_date: None,
            report_end: None,
            report_days: DEFAULT_REPORT_DAYS,
            consent_days: DEFAULT_CONSENT_DAYS,
            fetch_timeout_secs: default_timeout_secs(),
            output_dir: default_output_dir(),
            write_json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub sources: SourcesConfig,
    #[serde(default)]
    pub report: ReportSettings,
    /// Directory relative paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl ReportConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let mut config = Self::parse(&content).with_context(|| format!("parse {}", path.display()))?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_WINDOW_DAYS).contains(&self.report.report_days) {
            bail!(
                "report_days must be between 1 and {MAX_WINDOW_DAYS}, got {}",
                self.report.report_days
            );
        }
        if !(0..=MAX_WINDOW_DAYS).contains(&self.report.consent_days) {
            bail!(
                "consent_days must be between 0 and {MAX_WINDOW_DAYS}, got {}",
                self.report.consent_days
            );
        }
        if self.report.fetch_timeout_secs == 0 {
            bail!("fetch_timeout_secs must be positive");
        }
        if self.sources.units.iter().any(|unit| unit.trim().is_empty()) {
            bail!("units must not contain blank names");
        }
        Ok(())
    }

    /// Resolves a configured location, anchoring relative paths at
    /// [`base_dir`](Self::base_dir).
    pub fn location(&self, raw: &str) -> Location {
        match Location::parse(raw) {
            Location::Path(path) if path.is_relative() => Location::Path(self.base_dir.join(path)),
            other => other,
        }
    }

    pub fn display_terms(&self) -> Location {
        self.location(&self.sources.display_terms)
    }

    pub fn screening_sites(&self) -> Option<Location> {
        self.sources.screening_sites.as_deref().map(|raw| self.location(raw))
    }

    pub fn site_activation(&self) -> Option<Location> {
        self.sources.site_activation.as_deref().map(|raw| self.location(raw))
    }

    pub fn subjects(&self) -> SubjectSource {
        SubjectSource {
            format: self.sources.subjects.kind,
            location: self.location(&self.sources.subjects.location),
        }
    }

    pub fn events(&self) -> Option<Location> {
        self.sources.events.as_deref().map(|raw| self.location(raw))
    }

    pub fn output_dir(&self) -> PathBuf {
        if self.report.output_dir.is_relative() {
            self.base_dir.join(&self.report.output_dir)
        } else {
            self.report.output_dir.clone()
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.report.fetch_timeout_secs)
    }

    /// Report window for a run on `today`.
    pub fn window(&self, today: NaiveDate) -> ReportWindow {
        let today = self.report.report_date.unwrap_or(today);
        ReportWindow::new(today)
            .with_end(self.report.report_end.unwrap_or(today))
            .with_report_days(self.report.report_days)
            .with_consent_days(self.report.consent_days)
    }
}
