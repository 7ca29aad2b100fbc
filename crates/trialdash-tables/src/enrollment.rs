//! Actual vs. expected enrollment per site, aligned by study month.

use std::collections::BTreeMap;

use chrono::Datelike;
use tracing::{debug, warn};

use trialdash_model::{
    Cell, CurveSeries, EnrollmentCurve, EnrollmentPoint, ReportTable, SiteActivation,
    SubjectRecord,
};

use crate::common::columns;
use crate::error::{Result, TableError};

/// Builds the long-form enrollment curve.
///
/// Each consented subject is placed in the study month of its consent date
/// relative to its center's activation, clamped to month 1. Every site in
/// `activation` gets all four series for months `1..=last`, where `last`
/// covers both the latest consent and the expected schedule.
pub fn enrollment_curve(
    subjects: &[SubjectRecord],
    activation: &[SiteActivation],
) -> Result<EnrollmentCurve> {
    if activation.is_empty() {
        return Err(TableError::NoActivation);
    }

    let mut monthly: BTreeMap<&str, BTreeMap<u32, u64>> = BTreeMap::new();
    let mut unscheduled = 0_usize;
    for subject in subjects {
        let (Some(center), Some(consent)) = (subject.center(), subject.consent_obtained) else {
            continue;
        };
        let Some(site) = activation.iter().find(|site| site.site == center) else {
            unscheduled += 1;
            continue;
        };
        let month = site.study_month(consent.year(), consent.month());
        *monthly
            .entry(site.site.as_str())
            .or_default()
            .entry(month)
            .or_insert(0) += 1;
    }
    if unscheduled > 0 {
        warn!(
            subjects = unscheduled,
            "consented subjects at sites without an activation schedule left out of the enrollment curve"
        );
    }

    let mut points = Vec::new();
    for site in activation {
        let actual = monthly.get(site.site.as_str());
        let last_actual = actual
            .and_then(|months| months.keys().next_back().copied())
            .unwrap_or(0);
        let last_expected = u32::try_from(site.expected_monthly.len()).unwrap_or(u32::MAX);
        let last = last_actual.max(last_expected);

        let mut totals = [0_u64; 2];
        for study_month in 1..=last {
            let actual_monthly = actual
                .and_then(|months| months.get(&study_month))
                .copied()
                .unwrap_or(0);
            let expected_monthly = site
                .expected_monthly
                .get((study_month - 1) as usize)
                .map_or(0, |value| u64::from(*value));
            totals[0] += actual_monthly;
            totals[1] += expected_monthly;
            let values = [actual_monthly, totals[0], expected_monthly, totals[1]];
            for (series, value) in CurveSeries::ALL.into_iter().zip(values) {
                points.push(EnrollmentPoint {
                    site: site.site.clone(),
                    study_month,
                    series,
                    value,
                });
            }
        }
        debug!(site = %site.site, months = last, "enrollment curve built");
    }
    Ok(EnrollmentCurve::new(points))
}

/// The curve as a sheet: one row per long-form point.
pub fn enrollment_table(title: &str, curve: &EnrollmentCurve) -> Result<ReportTable> {
    if curve.is_empty() {
        return Ok(ReportTable::no_data(title));
    }
    let mut table = ReportTable::new(title, columns(["Site", "Study Month", "Series", "Value"]));
    for point in &curve.points {
        table.push_row(vec![
            Cell::text(point.site.as_str()),
            Cell::Int(i64::from(point.study_month)),
            Cell::text(point.series.label()),
            Cell::Int(i64::try_from(point.value).unwrap_or(i64::MAX)),
        ])?;
    }
    Ok(table)
}
