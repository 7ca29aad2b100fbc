//! Grouping, counting and summary-row mechanics shared by the builders.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use trialdash_model::{Cell, ColumnSpec, ReportTable, SubjectRecord, TermLookup};

use crate::error::Result;

/// Label of the column-wise sum row appended to per-site tables.
pub const ALL_SITES: &str = "All Sites";

/// Delimiter of multi-valued code cells.
pub const MULTI_DELIMITER: char = '|';

/// Which site a subject is grouped under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SiteKey {
    /// The treating center (data-access-group).
    #[default]
    Center,
    /// The site resolved from the screening id ranges.
    ScreeningSite,
}

impl SiteKey {
    pub fn of(self, subject: &SubjectRecord) -> Option<Cow<'_, str>> {
        match self {
            SiteKey::Center => subject.center(),
            SiteKey::ScreeningSite => subject.screening_site.as_deref().map(Cow::Borrowed),
        }
    }
}

/// Splits a multi-valued cell into its trimmed, non-empty parts.
pub fn explode(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(MULTI_DELIMITER)
        .map(str::trim)
        .filter(|part| !part.is_empty())
}

/// Counts over (row, column) pairs with explicit, ordered axes.
///
/// Every declared row and column is present in the output even when
/// nothing was counted for it, which is how sparse categories are
/// backfilled with zeros.
#[derive(Debug, Clone, Default)]
pub struct Tally {
    rows: Vec<String>,
    columns: Vec<String>,
    counts: HashMap<(String, String), i64>,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares rows up front, fixing their order.
    #[must_use]
    pub fn with_rows<I, S>(mut self, rows: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for row in rows {
            self.ensure_row(row.into());
        }
        self
    }

    #[must_use]
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for column in columns {
            self.ensure_column(column.into());
        }
        self
    }

    pub fn ensure_row(&mut self, row: String) {
        if !self.rows.contains(&row) {
            self.rows.push(row);
        }
    }

    pub fn ensure_column(&mut self, column: String) {
        if !self.columns.contains(&column) {
            self.columns.push(column);
        }
    }

    /// Counts one occurrence, adding unseen rows/columns at the end.
    pub fn add(&mut self, row: &str, column: &str) {
        self.ensure_row(row.to_string());
        self.ensure_column(column.to_string());
        *self
            .counts
            .entry((row.to_string(), column.to_string()))
            .or_insert(0) += 1;
    }

    /// Counts one occurrence only when the row is already declared.
    pub fn add_known_row(&mut self, row: &str, column: &str) {
        if self.rows.iter().any(|known| known == row) {
            self.add(row, column);
        }
    }

    pub fn get(&self, row: &str, column: &str) -> i64 {
        self.counts
            .get(&(row.to_string(), column.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_total(&self, row: &str) -> i64 {
        self.columns.iter().map(|column| self.get(row, column)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Rows sorted by label.
    pub fn sort_rows(&mut self) {
        self.rows.sort();
    }
}

/// Per-key counter keeping first-seen key order.
#[derive(Debug, Clone, Default)]
pub struct Counter {
    keys: Vec<String>,
    counts: HashMap<String, i64>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: &str, amount: i64) {
        match self.counts.get_mut(key) {
            Some(count) => *count += amount,
            None => {
                self.keys.push(key.to_string());
                self.counts.insert(key.to_string(), amount);
            }
        }
    }

    pub fn get(&self, key: &str) -> i64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn total(&self) -> i64 {
        self.counts.values().sum()
    }
}

/// Consented subjects who reached the baseline visit, by treating center.
///
/// This cohort, not every consented subject, is the denominator of the
/// deviation and adverse-event rates.
#[derive(Debug, Clone, Default)]
pub struct BaselineCohort {
    centers: HashMap<i64, String>,
}

impl BaselineCohort {
    pub fn new(subjects: &[SubjectRecord]) -> Self {
        let mut centers = HashMap::new();
        for subject in subjects {
            if !(subject.is_consented() && subject.visits.baseline) {
                continue;
            }
            if let (Some(record_id), Some(center)) = (subject.record_id, subject.center()) {
                centers.entry(record_id).or_insert_with(|| center.into_owned());
            }
        }
        Self { centers }
    }

    /// Baseline subjects at `center`.
    pub fn size(&self, center: &str) -> i64 {
        self.count(center, |_| true)
    }

    /// Baseline subjects at `center` whose record id is in `records`.
    pub fn with_records(&self, center: &str, records: &HashSet<i64>) -> i64 {
        self.count(center, |record_id| records.contains(&record_id))
    }

    fn count(&self, center: &str, include: impl Fn(i64) -> bool) -> i64 {
        let count = self
            .centers
            .iter()
            .filter(|(record_id, known)| known.as_str() == center && include(**record_id))
            .count();
        i64::try_from(count).unwrap_or(i64::MAX)
    }
}

/// Category labels of a coded field in reference order, followed by any
/// observed labels the dictionary does not list.
pub fn categories<'a, I>(lookup: Option<&TermLookup>, observed: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut labels: Vec<String> = lookup
        .map(|lookup| lookup.labels().map(str::to_string).collect())
        .unwrap_or_default();
    for label in observed {
        if !labels.iter().any(|known| known == label) {
            labels.push(label.to_string());
        }
    }
    labels
}

/// Column-wise sum of the integer cells of `rows`, labelled in column 0.
///
/// Columns that are not integers in every row are left empty; callers
/// recompute derived columns such as percentages themselves.
pub fn sum_row(label: &str, rows: &[Vec<Cell>], width: usize) -> Vec<Cell> {
    let mut sums: Vec<Option<i64>> = vec![Some(0); width];
    for row in rows {
        for (idx, cell) in row.iter().enumerate().skip(1) {
            if let Some(slot) = sums.get_mut(idx) {
                *slot = match (*slot, cell.as_i64()) {
                    (Some(total), Some(value)) => Some(total + value),
                    _ => None,
                };
            }
        }
    }
    let mut out: Vec<Cell> = sums
        .into_iter()
        .map(|sum| sum.map_or(Cell::Empty, Cell::Int))
        .collect();
    if let Some(first) = out.first_mut() {
        *first = Cell::text(label);
    }
    out
}

/// Whether `row` is the summary row appended by the per-site builders.
pub fn is_total_row(row: &[Cell]) -> bool {
    row.first().and_then(Cell::as_str) == Some(ALL_SITES)
}

/// Pushes every row and then the "All Sites" sum row.
pub fn push_with_total(table: &mut ReportTable, rows: Vec<Vec<Cell>>) -> Result<()> {
    let total = sum_row(ALL_SITES, &rows, table.columns.len());
    for row in rows {
        table.push_row(row)?;
    }
    table.push_row(total)?;
    Ok(())
}

pub fn columns<I, S>(labels: I) -> Vec<ColumnSpec>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    labels.into_iter().map(ColumnSpec::new).collect()
}

pub fn grouped<I, S>(group: &str, labels: I) -> Vec<ColumnSpec>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    labels
        .into_iter()
        .map(|label| ColumnSpec::grouped(group, label))
        .collect()
}
