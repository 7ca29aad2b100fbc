//! Finished, display-ready report tables.
//!
//! A [`ReportTable`] is what a table builder hands to the presentation and
//! export boundary: labelled columns, optionally grouped under a second
//! header level, and rows of typed cells.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Header shown when a table has nothing to report.
pub const NO_DATA_MESSAGE: &str = "No data for this table";

/// Column header with an optional group label above it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub group: Option<String>,
    pub label: String,
}

impl ColumnSpec {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            group: None,
            label: label.into(),
        }
    }

    pub fn grouped(group: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            group: Some(group.into()),
            label: label.into(),
        }
    }

    /// Stable identifier, `group / label` for grouped columns.
    pub fn id(&self) -> String {
        match &self.group {
            Some(group) if !group.is_empty() => format!("{group} / {}", self.label),
            _ => self.label.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Date(NaiveDate),
    Text(String),
    Empty,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn opt_text(value: Option<impl Into<String>>) -> Self {
        value.map_or(Cell::Empty, |v| Cell::Text(v.into()))
    }

    pub fn opt_date(value: Option<NaiveDate>) -> Self {
        value.map_or(Cell::Empty, Cell::Date)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(v) => Some(*v as f64),
            Cell::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Cell::Int(_) | Cell::Float(_))
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<usize> for Cell {
    fn from(value: usize) -> Self {
        Cell::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Int(v) => write!(f, "{v}"),
            Cell::Float(v) => f.write_str(&trialdash_common::format_numeric(*v)),
            Cell::Date(v) => write!(f, "{}", v.format("%m/%d/%Y")),
            Cell::Text(v) => f.write_str(v),
            Cell::Empty => Ok(()),
        }
    }
}

/// A rectangular, display-ready table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportTable {
    pub title: String,
    pub columns: Vec<ColumnSpec>,
    pub rows: Vec<Vec<Cell>>,
}

impl ReportTable {
    pub fn new(title: impl Into<String>, columns: Vec<ColumnSpec>) -> Self {
        Self {
            title: title.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Single-column, zero-row table whose only header is `message`.
    pub fn placeholder(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, vec![ColumnSpec::new(message)])
    }

    pub fn no_data(title: impl Into<String>) -> Self {
        Self::placeholder(title, NO_DATA_MESSAGE)
    }

    pub fn is_placeholder(&self) -> bool {
        self.rows.is_empty() && self.columns.len() == 1
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(ModelError::RowWidth {
                table: self.title.clone(),
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn has_groups(&self) -> bool {
        self.columns.iter().any(|column| column.group.is_some())
    }

    /// Index of the first column with this label.
    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.label == label)
    }

    /// Index of the column with this group and label.
    pub fn grouped_column_index(&self, group: &str, label: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.group.as_deref() == Some(group) && column.label == label)
    }

    /// Row whose first cell is the given text.
    pub fn row_by_label(&self, label: &str) -> Option<&[Cell]> {
        self.rows
            .iter()
            .find(|row| row.first().and_then(Cell::as_str) == Some(label))
            .map(Vec::as_slice)
    }

    pub fn cell(&self, row_label: &str, column_label: &str) -> Option<&Cell> {
        let idx = self.column_index(column_label)?;
        self.row_by_label(row_label).and_then(|row| row.get(idx))
    }
}
