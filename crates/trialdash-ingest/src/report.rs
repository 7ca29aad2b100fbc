//! Per-unit load outcomes.

use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::source::{Fetcher, Location, unit_locations};

/// What happened when one organizational unit was loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitStatus {
    Loaded { rows: usize },
    /// The payload arrived and parsed but held no rows.
    Empty,
    FetchFailed { reason: String },
    ParseFailed { reason: String },
}

impl UnitStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::FetchFailed { .. } | Self::ParseFailed { .. })
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded { rows } => write!(f, "loaded {rows} rows"),
            Self::Empty => f.write_str("empty"),
            Self::FetchFailed { reason } => write!(f, "fetch failed: {reason}"),
            Self::ParseFailed { reason } => write!(f, "parse failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitLoad {
    pub unit: String,
    pub location: String,
    #[serde(flatten)]
    pub status: UnitStatus,
}

/// Records concatenated across units, plus how each unit fared.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadReport<T> {
    pub records: Vec<T>,
    pub units: Vec<UnitLoad>,
}

impl<T> Default for LoadReport<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            units: Vec::new(),
        }
    }
}

impl<T> LoadReport<T> {
    pub fn failures(&self) -> impl Iterator<Item = &UnitLoad> {
        self.units.iter().filter(|unit| unit.status.is_failure())
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    /// `true` when every unit failed (or none were attempted).
    pub fn all_failed(&self) -> bool {
        self.units.iter().all(|unit| unit.status.is_failure())
    }
}

/// Fetches and parses every unit of a source independently.
///
/// A unit that cannot be fetched or parsed contributes no rows; its failure
/// is recorded and the remaining units still load.
pub(crate) fn load_units<T, F, P>(
    what: &str,
    location: &Location,
    units: &[String],
    fetcher: &F,
    mut parse: P,
) -> LoadReport<T>
where
    F: Fetcher + ?Sized,
    P: FnMut(Vec<u8>) -> Result<Vec<T>>,
{
    let mut report = LoadReport::default();
    for (unit, unit_location) in unit_locations(location, units) {
        let status = match fetcher.fetch(&unit_location) {
            Err(error) => {
                warn!(source = what, unit = %unit, %error, "unit fetch failed");
                if error.is_fetch_failure() {
                    UnitStatus::FetchFailed {
                        reason: error.to_string(),
                    }
                } else {
                    UnitStatus::ParseFailed {
                        reason: error.to_string(),
                    }
                }
            }
            Ok(bytes) => match parse(bytes) {
                Ok(records) if records.is_empty() => UnitStatus::Empty,
                Ok(records) => {
                    let rows = records.len();
                    report.records.extend(records);
                    UnitStatus::Loaded { rows }
                }
                Err(error) => {
                    warn!(source = what, unit = %unit, %error, "unit parse failed");
                    UnitStatus::ParseFailed {
                        reason: error.to_string(),
                    }
                }
            },
        };
        debug!(source = what, unit = %unit, %status, "unit loaded");
        report.units.push(UnitLoad {
            unit,
            location: unit_location.to_string(),
            status,
        });
    }
    report
}
