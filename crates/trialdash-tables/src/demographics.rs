//! Demographic characteristics of active consented subjects.

use trialdash_common::format_percent;
use trialdash_model::{Cell, DisplayDictionary, ReportTable, SubjectRecord};

use crate::common::{Counter, categories, columns};
use crate::error::{Result, TableError};

/// Category used when neither the study nor the screening answer is known.
pub const UNKNOWN: &str = "Unknown";

/// Label of the summary row of a demographic rollup.
pub const ALL_ROW: &str = "All";

/// Coded demographic fields with a fixed category list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemographicField {
    Sex,
    Race,
    Ethnicity,
}

impl DemographicField {
    pub const ALL: [DemographicField; 3] = [Self::Sex, Self::Race, Self::Ethnicity];

    /// Source field whose dictionary entries list the categories.
    pub const fn field(self) -> &'static str {
        match self {
            Self::Sex => "sex",
            Self::Race => "dem_race",
            Self::Ethnicity => "ethnic",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Sex => "Sex",
            Self::Race => "Race",
            Self::Ethnicity => "Ethnicity",
        }
    }

    fn value(self, subject: &SubjectRecord) -> &str {
        let demographics = &subject.demographics;
        match self {
            Self::Sex => demographics.merged_sex(),
            Self::Race => demographics.merged_race(),
            Self::Ethnicity => demographics.merged_ethnicity(),
        }
        .unwrap_or(UNKNOWN)
    }
}

fn active_cohort(subjects: &[SubjectRecord]) -> impl Iterator<Item = &SubjectRecord> {
    subjects
        .iter()
        .filter(|subject| subject.is_consented() && subject.is_active())
}

/// Counts of one demographic field over the active consented cohort.
///
/// Every category the dictionary lists gets a row, zero when unobserved;
/// observed values the dictionary does not list (including `Unknown`)
/// follow in first-seen order, so the counts always add up to the cohort.
pub fn demographic_rollup(
    title: &str,
    subjects: &[SubjectRecord],
    dictionary: &DisplayDictionary,
    field: DemographicField,
) -> Result<ReportTable> {
    let lookup = dictionary
        .lookup(field.field())
        .ok_or_else(|| TableError::MissingTerms {
            field: field.field().to_string(),
        })?;

    let mut counts = Counter::new();
    for subject in active_cohort(subjects) {
        counts.add(field.value(subject), 1);
    }
    let cohort = counts.total();
    if cohort == 0 {
        return Ok(ReportTable::no_data(title));
    }

    let mut table = ReportTable::new(title, columns([field.label(), "Count", "Percent"]));
    let percent = |count: i64| format!("{}%", format_percent(count as f64, cohort as f64));
    for category in categories(Some(lookup), counts.keys().iter().map(String::as_str)) {
        let count = counts.get(&category);
        table.push_row(vec![Cell::text(category), Cell::Int(count), Cell::text(percent(count))])?;
    }
    table.push_row(vec![Cell::text(ALL_ROW), Cell::Int(cohort), Cell::text(percent(cohort))])?;
    Ok(table)
}

/// Sample summary of the merged age of the active consented cohort.
///
/// Quartiles interpolate linearly between order statistics; mean and
/// standard deviation are rounded to two decimals.
pub fn age_summary(title: &str, subjects: &[SubjectRecord]) -> Result<ReportTable> {
    let mut ages: Vec<f64> = active_cohort(subjects)
        .filter_map(|subject| subject.demographics.merged_age())
        .filter(|age| age.is_finite())
        .collect();
    if ages.is_empty() {
        return Ok(ReportTable::no_data(title));
    }
    ages.sort_by(f64::total_cmp);

    let n = ages.len() as f64;
    let mean = ages.iter().sum::<f64>() / n;
    let std = if ages.len() > 1 {
        let variance = ages.iter().map(|age| (age - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Cell::Float(round2(variance.sqrt()))
    } else {
        Cell::Empty
    };

    let mut table = ReportTable::new(title, columns(["Statistic", "Age"]));
    let stats = [
        ("count", Cell::Float(n)),
        ("mean", Cell::Float(round2(mean))),
        ("std", std),
        ("min", Cell::Float(ages[0])),
        ("25%", Cell::Float(quantile(&ages, 0.25))),
        ("50%", Cell::Float(quantile(&ages, 0.5))),
        ("75%", Cell::Float(quantile(&ages, 0.75))),
        ("max", Cell::Float(ages[ages.len() - 1])),
    ];
    for (name, value) in stats {
        table.push_row(vec![Cell::text(name), value])?;
    }
    Ok(table)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Linear-interpolation quantile of sorted, non-empty `values`.
fn quantile(values: &[f64], q: f64) -> f64 {
    let position = q * (values.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    values[lower] + (values[upper] - values[lower]) * fraction
}
