//! Export of an assembled report.
//!
//! [`write_workbook`] writes one CSV per sheet plus `manifest.json`;
//! [`report_to_json`] produces the payload a presentation layer renders
//! (column specs, row records keyed by column id, long-form enrollment).

pub mod error;
pub mod json;
pub mod workbook;

pub use error::{OutputError, Result};
pub use json::{
    ColumnPayload, ReportPayload, TablePayload, cell_value, report_payload, report_to_json,
    table_payload,
};
pub use workbook::{
    MANIFEST_FILE, Manifest, ManifestSheet, WorkbookOutput, sheet_file_name, write_sheet_csv,
    write_workbook,
};
