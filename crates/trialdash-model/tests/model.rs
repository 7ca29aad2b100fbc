//! Tests for trialdash-model types.

use chrono::NaiveDate;
use trialdash_model::{
    Cell, Coded, ColumnSpec, DisplayDictionary, DisplayTerm, ReportTable, SubjectRecord, TermKey,
};

fn term(field: &str, value: &str, label: &str, multi: bool) -> DisplayTerm {
    DisplayTerm {
        field: field.to_string(),
        value: TermKey::parse(value).unwrap(),
        label: label.to_string(),
        multi,
    }
}

#[test]
fn dictionary_matches_numeric_codes_read_as_text() {
    let dictionary = DisplayDictionary::from_terms(vec![
        term("participation_interest", "0", "No", false),
        term("participation_interest", "1", "Maybe", false),
        term("participation_interest", "2", "Yes", false),
    ]);
    let key = TermKey::parse("2.0").unwrap();
    assert_eq!(dictionary.label("participation_interest", &key), Some("Yes"));
    let lookup = dictionary.lookup("participation_interest").unwrap();
    assert_eq!(lookup.len(), 3);
}

#[test]
fn subject_status_follows_dates() {
    let consented = NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap();
    let mut subject = SubjectRecord {
        site: Some(Coded::labelled(1, "Site A")),
        consent_obtained: Some(consented),
        ..SubjectRecord::default()
    };
    assert!(subject.is_consented());
    assert!(subject.is_active());
    assert_eq!(subject.center().as_deref(), Some("Site A"));

    subject.termination_date = Some(consented);
    assert!(!subject.is_active());
    assert!(subject.is_rescinded());
}

#[test]
fn report_table_serializes_with_groups() {
    let mut table = ReportTable::new(
        "Deviations",
        vec![
            ColumnSpec::grouped("", "Center Name"),
            ColumnSpec::grouped("Subjects", "Baseline"),
        ],
    );
    table
        .push_row(vec![Cell::from("Site A"), Cell::from(3_i64)])
        .expect("row fits");
    let json = serde_json::to_value(&table).expect("serialize table");
    assert_eq!(json["columns"][1]["group"], "Subjects");
    assert_eq!(json["rows"][0][1], 3);
    assert!(table.has_groups());
}
