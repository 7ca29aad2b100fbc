//! Multi-sheet export: one CSV per sheet plus a manifest.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use trialdash_model::ReportTable;
use trialdash_tables::{Report, SheetId, TableFailure};

use crate::error::{OutputError, Result};

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestSheet {
    pub id: SheetId,
    pub name: &'static str,
    pub title: String,
    pub file: String,
    pub placeholder: bool,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manifest<'a> {
    pub date_message: &'a str,
    pub range_message: &'a str,
    pub sheets: Vec<ManifestSheet>,
    pub failures: &'a [TableFailure],
}

/// Files written by [`write_workbook`].
#[derive(Debug, Clone, Default)]
pub struct WorkbookOutput {
    pub sheets: Vec<PathBuf>,
    pub manifest: PathBuf,
}

/// File name of a sheet's CSV.
pub fn sheet_file_name(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' { ch } else { '_' })
        .collect();
    format!("{stem}.csv")
}

/// Writes every sheet of `report` into `dir`, creating it when missing.
pub fn write_workbook(dir: &Path, report: &Report) -> Result<WorkbookOutput> {
    fs::create_dir_all(dir).map_err(|source| OutputError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut output = WorkbookOutput::default();
    let mut manifest = Manifest {
        date_message: &report.date_message,
        range_message: &report.range_message,
        sheets: Vec::with_capacity(report.sheets.len()),
        failures: &report.failures,
    };
    for sheet in &report.sheets {
        let file = sheet_file_name(sheet.name);
        let path = dir.join(&file);
        write_sheet_csv(&path, &sheet.table)?;
        debug!(sheet = sheet.name, path = %path.display(), "sheet written");
        manifest.sheets.push(ManifestSheet {
            id: sheet.id,
            name: sheet.name,
            title: sheet.table.title.clone(),
            file,
            placeholder: sheet.table.is_placeholder(),
            rows: sheet.table.rows.len(),
        });
        output.sheets.push(path);
    }

    let manifest_path = dir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(&manifest)?;
    fs::write(&manifest_path, json).map_err(|source| OutputError::Write {
        path: manifest_path.clone(),
        source,
    })?;
    output.manifest = manifest_path;

    info!(
        dir = %dir.display(),
        sheets = output.sheets.len(),
        "workbook written"
    );
    Ok(output)
}

/// Writes one table as CSV.
///
/// Grouped tables get two header rows: group labels, then column labels.
pub fn write_sheet_csv(path: &Path, table: &ReportTable) -> Result<()> {
    let csv_error = |source| OutputError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    if table.has_groups() {
        writer
            .write_record(
                table
                    .columns
                    .iter()
                    .map(|column| column.group.as_deref().unwrap_or_default()),
            )
            .map_err(csv_error)?;
    }
    writer
        .write_record(table.columns.iter().map(|column| column.label.as_str()))
        .map_err(csv_error)?;
    for row in &table.rows {
        writer
            .write_record(row.iter().map(ToString::to_string))
            .map_err(csv_error)?;
    }
    writer.flush().map_err(|source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use trialdash_model::{Cell, ColumnSpec};

    #[test]
    fn file_names_are_filesystem_safe() {
        assert_eq!(sheet_file_name("Decline Reasons"), "Decline_Reasons.csv");
        assert_eq!(sheet_file_name("Age"), "Age.csv");
    }

    #[test]
    fn grouped_tables_get_two_header_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.csv");
        let mut table = ReportTable::new(
            "t",
            vec![
                ColumnSpec::grouped("", "Center"),
                ColumnSpec::grouped("Severity", "Mild"),
            ],
        );
        table.push_row(vec![Cell::text("A"), Cell::Int(2)]).unwrap();
        write_sheet_csv(&path, &table).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, ",Severity\nCenter,Mild\nA,2\n");
    }
}
