//! Raw payloads as polars frames, and typed access to their cells.
//!
//! Every payload is first read with all columns as text. Columns whose
//! values all round-trip as numbers are then cast to `Float64`, and each
//! coded column named in the display dictionary gains a `<field>_display`
//! column holding its label. Rows are never dropped along the way.

use std::collections::{BTreeMap, HashSet};
use std::io::Cursor;

use chrono::NaiveDateTime;
use polars::prelude::*;

use trialdash_common::{any_to_f64, any_to_i64, any_to_string_non_empty, parse_f64};
use trialdash_model::{Coded, TermKey, TermLookup};

use crate::datetime::parse_datetime;
use crate::error::Result;

/// Suffix of the label column attached to a coded column.
pub const DISPLAY_SUFFIX: &str = "_display";

pub fn display_column(field: &str) -> String {
    format!("{field}{DISPLAY_SUFFIX}")
}

/// Reads CSV bytes with every column kept as text.
pub fn read_csv_frame(bytes: Vec<u8>) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;
    Ok(df)
}

/// Builds a text frame from string-keyed rows.
///
/// Columns appear in first-seen order; fields absent from a row are null.
pub fn frame_from_rows(rows: &[BTreeMap<String, String>]) -> Result<DataFrame> {
    let mut names: Vec<&str> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for row in rows {
        for key in row.keys() {
            if seen.insert(key.as_str()) {
                names.push(key.as_str());
            }
        }
    }
    let columns = names
        .iter()
        .map(|name| {
            let values: Vec<Option<String>> =
                rows.iter().map(|row| row.get(*name).cloned()).collect();
            Series::new((*name).into(), values).into_column()
        })
        .collect::<Vec<_>>();
    Ok(DataFrame::new(columns)?)
}

/// Casts text columns to `Float64` when every non-empty value parses.
///
/// Columns listed in `keep_text` (dates, free text) are left alone, as are
/// columns with no values at all. Returns the names of the cast columns.
pub fn coerce_numeric(df: &mut DataFrame, keep_text: &[&str]) -> Result<Vec<String>> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let mut coerced = Vec::new();
    for name in names {
        if keep_text.contains(&name.as_str()) {
            continue;
        }
        let column = df.column(&name)?;
        if column.dtype() != &DataType::String {
            continue;
        }
        let mut values = Vec::with_capacity(df.height());
        let mut any_value = false;
        let mut numeric = true;
        for idx in 0..df.height() {
            match any_to_string_non_empty(column.get(idx).unwrap_or(AnyValue::Null)) {
                None => values.push(None),
                Some(text) => match parse_f64(&text) {
                    Some(value) => {
                        any_value = true;
                        values.push(Some(value));
                    }
                    None => {
                        numeric = false;
                        break;
                    }
                },
            }
        }
        if numeric && any_value {
            df.with_column(Series::new(name.as_str().into(), values))?;
            coerced.push(name);
        }
    }
    Ok(coerced)
}

/// Left-joins labels onto every column named in `lookups`.
///
/// Unmatched or blank codes get a null label; the row itself is kept.
/// Returns the number of label columns attached.
pub fn attach_display(
    df: &mut DataFrame,
    lookups: &BTreeMap<String, TermLookup>,
) -> Result<usize> {
    let mut attached = 0;
    for (field, lookup) in lookups {
        let Ok(column) = df.column(field) else {
            continue;
        };
        let labels: Vec<Option<String>> = (0..df.height())
            .map(|idx| {
                any_to_string_non_empty(column.get(idx).unwrap_or(AnyValue::Null))
                    .and_then(|raw| TermKey::parse(&raw))
                    .and_then(|key| lookup.label(&key).map(str::to_string))
            })
            .collect();
        df.with_column(Series::new(display_column(field).as_str().into(), labels))?;
        attached += 1;
    }
    Ok(attached)
}

/// Typed, null-tolerant cell access by column name.
///
/// A missing column reads as null, so payloads that omit optional fields
/// still convert.
pub struct FrameReader<'a> {
    df: &'a DataFrame,
}

impl<'a> FrameReader<'a> {
    pub fn new(df: &'a DataFrame) -> Self {
        Self { df }
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    fn value(&self, field: &str, idx: usize) -> AnyValue<'a> {
        self.df
            .column(field)
            .ok()
            .and_then(|column| column.get(idx).ok())
            .unwrap_or(AnyValue::Null)
    }

    pub fn text(&self, field: &str, idx: usize) -> Option<String> {
        any_to_string_non_empty(self.value(field, idx))
    }

    pub fn int(&self, field: &str, idx: usize) -> Option<i64> {
        any_to_i64(self.value(field, idx))
    }

    pub fn float(&self, field: &str, idx: usize) -> Option<f64> {
        any_to_f64(self.value(field, idx))
    }

    /// `true` only for a code of 1.
    pub fn flag(&self, field: &str, idx: usize) -> bool {
        self.int(field, idx) == Some(1)
    }

    pub fn datetime(&self, field: &str, idx: usize) -> Option<NaiveDateTime> {
        self.text(field, idx).and_then(|raw| parse_datetime(&raw))
    }

    /// Label from the attached display column.
    pub fn label(&self, field: &str, idx: usize) -> Option<String> {
        self.text(&display_column(field), idx)
    }

    /// The label when one was joined, the raw text otherwise.
    pub fn label_or_text(&self, field: &str, idx: usize) -> Option<String> {
        self.label(field, idx).or_else(|| self.text(field, idx))
    }

    pub fn coded(&self, field: &str, idx: usize) -> Option<Coded> {
        let key = self.text(field, idx).and_then(|raw| TermKey::parse(&raw))?;
        Some(Coded {
            key,
            label: self.label(field, idx),
        })
    }
}
