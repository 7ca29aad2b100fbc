use std::fs;

use chrono::NaiveDate;
use serde_json::Value;
use tempfile::TempDir;

use trialdash_model::{Coded, DisplayDictionary, ReportWindow, SiteActivation, SubjectRecord};
use trialdash_output::{MANIFEST_FILE, report_to_json, sheet_file_name, write_workbook};
use trialdash_tables::{ReportInputs, SheetId, SiteKey, build_report};

fn report() -> trialdash_tables::Report {
    let subjects = vec![SubjectRecord {
        record_id: Some(1),
        site: Some(Coded::new(1, Some("UI Health"))),
        participation_interest: Some(Coded::new(2, None)),
        consent_obtained: NaiveDate::from_ymd_opt(2024, 4, 2).and_then(|d| d.and_hms_opt(0, 0, 0)),
        ..SubjectRecord::default()
    }];
    let activation = vec![SiteActivation::new("UI Health", 2024, 1, vec![2, 2]).unwrap()];
    let centers = vec!["UI Health".to_string()];
    let dictionary = DisplayDictionary::default();
    let inputs = ReportInputs {
        subjects: &subjects,
        events: &[],
        dictionary: &dictionary,
        activation: &activation,
        centers: &centers,
        screening_key: SiteKey::Center,
    };
    let window = ReportWindow::new(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
    build_report(&inputs, &window)
}

#[test]
fn workbook_has_a_file_per_sheet_and_a_manifest() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("report");
    let report = report();
    let written = write_workbook(&out, &report).unwrap();

    assert_eq!(written.sheets.len(), SheetId::ALL.len());
    let screening = fs::read_to_string(out.join(sheet_file_name("Screening"))).unwrap();
    assert!(screening.starts_with("Center Name,All Participants,Yes,Maybe,No\n"));
    assert!(screening.contains("UI Health,1,1,0,0"));

    let listing = fs::read_to_string(out.join(sheet_file_name("Deviation Descriptions"))).unwrap();
    assert_eq!(listing.trim_end(), "No Deviations in the reporting timeframe");

    let manifest: Value =
        serde_json::from_str(&fs::read_to_string(out.join(MANIFEST_FILE)).unwrap()).unwrap();
    let sheets = manifest["sheets"].as_array().unwrap();
    assert_eq!(sheets.len(), SheetId::ALL.len());
    assert_eq!(sheets[0]["id"], "screening");
    assert_eq!(sheets[8]["placeholder"], true);
    // No demographic category lists in an empty dictionary.
    assert_eq!(manifest["failures"].as_array().unwrap().len(), 3);
}

#[test]
fn json_payload_carries_tables_and_curve() {
    let payload = report_to_json(&report()).unwrap();
    let tables = payload["tables"].as_array().unwrap();
    assert_eq!(tables.len(), SheetId::ALL.len());
    assert_eq!(tables[0]["rows"][0]["Center Name"], "UI Health");
    assert_eq!(tables[0]["columns"][1]["id"], "All Participants");

    let enrollment = payload["enrollment"].as_array().unwrap();
    // Four series over four study months (consent in month 4).
    assert_eq!(enrollment.len(), 16);
    assert!(payload["date_message"].as_str().unwrap().contains("2024-05-01"));
}
