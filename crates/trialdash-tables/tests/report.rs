use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;

use trialdash_model::{
    Cell, Coded, Demographics, DisplayDictionary, EventRecord, SiteActivation, SubjectRecord,
    TermLookup, VisitProgress,
};
use trialdash_tables::{
    ALL_SITES, BUILD_ERROR_PREFIX, DemographicField, ReportInputs, SheetId, SiteKey, build_report,
    demographic_rollup,
};

fn at(month: u32, day: u32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(2024, month, day).and_then(|d| d.and_hms_opt(9, 0, 0))
}

fn subject(record_id: i64, site: &str, interest: i64) -> SubjectRecord {
    SubjectRecord {
        screening_id: Some(1000 + record_id),
        record_id: Some(record_id),
        site: Some(Coded::new(site, Some(site))),
        participation_interest: Some(Coded::new(interest, None)),
        ..SubjectRecord::default()
    }
}

fn enrolled(record_id: i64, site: &str, sex: &str) -> SubjectRecord {
    SubjectRecord {
        consent_obtained: at(3, 1),
        visits: VisitProgress {
            baseline: true,
            ..VisitProgress::default()
        },
        demographics: Demographics {
            sex: Some(sex.to_string()),
            race: Some("White".to_string()),
            ethnicity: Some("Not Hispanic or Latino".to_string()),
            age: Some(50.0 + record_id as f64),
            ..Demographics::default()
        },
        ..subject(record_id, site, 2)
    }
}

fn dictionary() -> DisplayDictionary {
    let mut dictionary = DisplayDictionary::default();
    for (field, labels) in [
        ("sex", vec!["Male", "Female"]),
        ("dem_race", vec!["White", "Black or African American", "Asian"]),
        ("ethnic", vec!["Hispanic or Latino", "Not Hispanic or Latino"]),
    ] {
        let lookup: TermLookup = labels
            .into_iter()
            .enumerate()
            .map(|(idx, label)| (idx as i64 + 1, label))
            .collect();
        dictionary.single.insert(field.to_string(), lookup);
    }
    dictionary
}

fn fixture() -> (Vec<SubjectRecord>, Vec<EventRecord>) {
    let subjects = vec![
        enrolled(1, "A", "Female"),
        enrolled(2, "A", "Male"),
        enrolled(3, "B", "Female"),
        subject(4, "B", 0),
        subject(5, "A", 1),
    ];
    let events = vec![EventRecord {
        record_id: 1,
        instance: 1,
        site: Some("A".into()),
        ae_flag: Some(Coded::labelled(1, "Yes")),
        ae_severity: Some(Coded::labelled(1, "Mild")),
        onset_date: at(5, 10),
        ..EventRecord::default()
    }];
    (subjects, events)
}

#[test]
fn report_has_every_sheet_in_order() {
    let (subjects, events) = fixture();
    let dictionary = dictionary();
    let activation = vec![SiteActivation::new("A", 2024, 1, vec![1, 1, 1]).unwrap()];
    let centers = vec!["A".to_string(), "B".to_string()];
    let inputs = ReportInputs {
        subjects: &subjects,
        events: &events,
        dictionary: &dictionary,
        activation: &activation,
        centers: &centers,
        screening_key: SiteKey::Center,
    };
    let window = trialdash_model::ReportWindow::new(NaiveDate::from_ymd_opt(2024, 5, 15).unwrap());
    let report = build_report(&inputs, &window);

    assert!(report.failures.is_empty(), "{:?}", report.failures);
    let ids: Vec<SheetId> = report.sheets.iter().map(|sheet| sheet.id).collect();
    assert_eq!(ids, SheetId::ALL.to_vec());

    let screening = report.table(SheetId::Screening).unwrap();
    assert_eq!(screening.cell(ALL_SITES, "All Participants"), Some(&Cell::Int(5)));

    let adverse = report.table(SheetId::AdverseEvents).unwrap();
    let with = adverse.grouped_column_index("", "# With Adverse Event").unwrap();
    assert_eq!(adverse.row_by_label("A").unwrap()[with], Cell::Int(1));
    assert_eq!(report.table(SheetId::AdverseEventListing).unwrap().rows.len(), 1);

    let sex = report.table(SheetId::Sex).unwrap();
    assert_eq!(sex.cell("Female", "Count"), Some(&Cell::Int(2)));
    assert_eq!(sex.cell("All", "Count"), Some(&Cell::Int(3)));

    // Consents in March, activation in January: study month 3.
    let wide = report.curve.wide_view("A");
    assert_eq!(wide[2].actual_monthly, 2);
    assert!(report.date_message.contains("2024-05-15"));
}

#[test]
fn failing_builders_leave_other_sheets_intact() {
    let (subjects, events) = fixture();
    let empty = DisplayDictionary::default();
    let centers = vec!["A".to_string(), "B".to_string()];
    let inputs = ReportInputs {
        subjects: &subjects,
        events: &events,
        dictionary: &empty,
        activation: &[],
        centers: &centers,
        screening_key: SiteKey::Center,
    };
    let window = trialdash_model::ReportWindow::new(NaiveDate::from_ymd_opt(2024, 5, 15).unwrap());
    let report = build_report(&inputs, &window);

    let failed: Vec<SheetId> = report.failures.iter().map(|failure| failure.id).collect();
    assert_eq!(
        failed,
        vec![SheetId::Sex, SheetId::Race, SheetId::Ethnicity, SheetId::Enrollment]
    );
    let race = report.table(SheetId::Race).unwrap();
    assert!(race.is_placeholder());
    assert!(race.columns[0].label.starts_with(BUILD_ERROR_PREFIX));
    assert!(report.curve.is_empty());

    assert_eq!(report.sheets.len(), SheetId::ALL.len());
    let consent = report.table(SheetId::Consent).unwrap();
    assert_eq!(consent.cell(ALL_SITES, "Consented"), Some(&Cell::Int(3)));
    assert!(!report.table(SheetId::Age).unwrap().is_placeholder());
}

#[test]
fn oversized_listing_window_fails_only_the_listings() {
    let (subjects, events) = fixture();
    let dictionary = dictionary();
    let activation = vec![SiteActivation::new("A", 2024, 1, vec![1, 1, 1]).unwrap()];
    let centers = vec!["A".to_string(), "B".to_string()];
    let inputs = ReportInputs {
        subjects: &subjects,
        events: &events,
        dictionary: &dictionary,
        activation: &activation,
        centers: &centers,
        screening_key: SiteKey::Center,
    };
    let window = trialdash_model::ReportWindow::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
        .with_report_days(100_000_000);
    let report = build_report(&inputs, &window);

    let failed: Vec<SheetId> = report.failures.iter().map(|failure| failure.id).collect();
    assert_eq!(
        failed,
        vec![
            SheetId::DeclineComments,
            SheetId::DeviationListing,
            SheetId::AdverseEventListing
        ]
    );
    let listing = report.table(SheetId::AdverseEventListing).unwrap();
    assert!(listing.columns[0].label.starts_with(BUILD_ERROR_PREFIX));
    assert_eq!(report.sheets.len(), SheetId::ALL.len());
    let screening = report.table(SheetId::Screening).unwrap();
    assert_eq!(screening.cell(ALL_SITES, "All Participants"), Some(&Cell::Int(5)));
    assert!(!report.curve.is_empty());
}

proptest! {
    #[test]
    fn rollup_counts_add_up_to_the_active_cohort(
        picks in prop::collection::vec(prop::option::of(0_usize..4), 1..40),
    ) {
        let labels = ["Male", "Female", "Nonbinary", "Prefer not to say"];
        let subjects: Vec<SubjectRecord> = picks
            .iter()
            .enumerate()
            .map(|(idx, pick)| SubjectRecord {
                consent_obtained: at(1, 1),
                demographics: Demographics {
                    sex: pick.map(|p| labels[p].to_string()),
                    ..Demographics::default()
                },
                ..subject(idx as i64, "A", 2)
            })
            .collect();
        let table = demographic_rollup("t", &subjects, &dictionary(), DemographicField::Sex).unwrap();

        let body: Vec<_> = table.rows.iter().filter(|row| row[0].as_str() != Some("All")).collect();
        let sum: i64 = body.iter().filter_map(|row| row[1].as_i64()).sum();
        prop_assert_eq!(sum, subjects.len() as i64);
        for known in ["Male", "Female"] {
            prop_assert!(body.iter().any(|row| row[0].as_str() == Some(known)));
        }
    }
}
