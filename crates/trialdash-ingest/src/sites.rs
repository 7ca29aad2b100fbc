//! Screening-site resolver and site activation schedule.

use serde::Deserialize;
use tracing::debug;

use trialdash_common::parse_integral;
use trialdash_model::{SiteActivation, SiteRange, SiteRangeTable, SubjectRecord};

use crate::error::{IngestError, Result};
use crate::source::{Fetcher, Location};

#[derive(Debug, Deserialize)]
struct SiteRangeRow {
    site: String,
    id_range_start: String,
    id_range_end: String,
}

#[derive(Debug, Deserialize)]
struct SiteActivationRow {
    site: String,
    start_year: String,
    start_month: String,
    #[serde(default)]
    expected_monthly: String,
}

fn integral(what: &str, site: &str, raw: &str) -> Result<i64> {
    parse_integral(raw).ok_or_else(|| IngestError::Parse {
        what: format!("{what} for site {site}"),
        reason: format!("{raw:?} is not a whole number"),
    })
}

fn csv_reader(bytes: &[u8]) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(bytes)
}

/// Parses `site,id_range_start,id_range_end`, keeping file order.
pub fn parse_site_ranges(bytes: &[u8]) -> Result<SiteRangeTable> {
    let mut ranges = Vec::new();
    for result in csv_reader(bytes).deserialize::<SiteRangeRow>() {
        let row = result?;
        if row.site.is_empty() {
            continue;
        }
        let start = integral("id_range_start", &row.site, &row.id_range_start)?;
        let end = integral("id_range_end", &row.site, &row.id_range_end)?;
        ranges.push(SiteRange::new(row.site, start, end)?);
    }
    Ok(SiteRangeTable::new(ranges))
}

pub fn load_site_ranges<F: Fetcher + ?Sized>(
    location: &Location,
    fetcher: &F,
) -> Result<SiteRangeTable> {
    parse_site_ranges(&fetcher.fetch(location)?)
}

/// Sets each subject's screening site from the first range containing its
/// screening id. Subjects outside every range, or without an id, get `None`.
///
/// Returns the number of subjects resolved.
pub fn resolve_screening_sites(ranges: &SiteRangeTable, records: &mut [SubjectRecord]) -> usize {
    let mut resolved = 0;
    for record in records.iter_mut() {
        record.screening_site = record
            .screening_id
            .and_then(|id| ranges.resolve(id))
            .map(str::to_string);
        if record.screening_site.is_some() {
            resolved += 1;
        }
    }
    debug!(
        resolved,
        unresolved = records.len() - resolved,
        "screening sites resolved"
    );
    resolved
}

/// Parses `site,start_year,start_month,expected_monthly`.
pub fn parse_site_activation(bytes: &[u8]) -> Result<Vec<SiteActivation>> {
    let mut activations = Vec::new();
    for result in csv_reader(bytes).deserialize::<SiteActivationRow>() {
        let row = result?;
        if row.site.is_empty() {
            continue;
        }
        let year = integral("start_year", &row.site, &row.start_year)?;
        let month = integral("start_month", &row.site, &row.start_month)?;
        let year = i32::try_from(year).map_err(|_| IngestError::Parse {
            what: format!("start_year for site {}", row.site),
            reason: format!("{year} is out of range"),
        })?;
        let month = u32::try_from(month).unwrap_or(0);
        let expected = SiteActivation::parse_expected(&row.site, &row.expected_monthly)?;
        activations.push(SiteActivation::new(row.site, year, month, expected)?);
    }
    Ok(activations)
}

pub fn load_site_activation<F: Fetcher + ?Sized>(
    location: &Location,
    fetcher: &F,
) -> Result<Vec<SiteActivation>> {
    parse_site_activation(&fetcher.fetch(location)?)
}
