//! Presentation payload: column specs plus row records keyed by column id.

use serde::Serialize;
use serde_json::{Map, Value};

use trialdash_model::{Cell, ColumnSpec, EnrollmentPoint, ReportTable};
use trialdash_tables::{Report, SheetId, TableFailure};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnPayload {
    pub group: Option<String>,
    pub label: String,
    pub id: String,
}

impl From<&ColumnSpec> for ColumnPayload {
    fn from(column: &ColumnSpec) -> Self {
        Self {
            group: column.group.clone(),
            label: column.label.clone(),
            id: column.id(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablePayload {
    pub id: SheetId,
    pub name: &'static str,
    pub title: String,
    pub placeholder: bool,
    pub columns: Vec<ColumnPayload>,
    pub rows: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportPayload<'a> {
    pub date_message: &'a str,
    pub range_message: &'a str,
    pub tables: Vec<TablePayload>,
    pub enrollment: &'a [EnrollmentPoint],
    pub failures: &'a [TableFailure],
}

/// JSON value of one cell. Dates use the display format of the sheets.
pub fn cell_value(cell: &Cell) -> Value {
    match cell {
        Cell::Int(value) => Value::from(*value),
        Cell::Float(value) => serde_json::Number::from_f64(*value).map_or(Value::Null, Value::Number),
        Cell::Date(_) => Value::String(cell.to_string()),
        Cell::Text(value) => Value::String(value.clone()),
        Cell::Empty => Value::Null,
    }
}

pub fn table_payload(id: SheetId, name: &'static str, table: &ReportTable) -> TablePayload {
    let columns: Vec<ColumnPayload> = table.columns.iter().map(ColumnPayload::from).collect();
    let rows = table
        .rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .zip(row)
                .map(|(column, cell)| (column.id.clone(), cell_value(cell)))
                .collect()
        })
        .collect();
    TablePayload {
        id,
        name,
        title: table.title.clone(),
        placeholder: table.is_placeholder(),
        columns,
        rows,
    }
}

pub fn report_payload(report: &Report) -> ReportPayload<'_> {
    ReportPayload {
        date_message: &report.date_message,
        range_message: &report.range_message,
        tables: report
            .sheets
            .iter()
            .map(|sheet| table_payload(sheet.id, sheet.name, &sheet.table))
            .collect(),
        enrollment: &report.curve.points,
        failures: &report.failures,
    }
}

/// The whole report as the payload consumed by the presentation layer.
pub fn report_to_json(report: &Report) -> Result<Value> {
    Ok(serde_json::to_value(report_payload(report))?)
}
