//! Consent window summary.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use trialdash_model::{Cell, ReportTable, ReportWindow, SubjectRecord};

use crate::common::{ALL_SITES, columns};
use crate::error::Result;

#[derive(Debug, Default)]
struct ConsentCounts {
    consented: i64,
    last_consent: Option<NaiveDate>,
    in_window: i64,
    eligible: i64,
    rescinded: i64,
}

impl ConsentCounts {
    fn add(&mut self, subject: &SubjectRecord, consent: NaiveDate, window: &ReportWindow) {
        self.consented += 1;
        self.last_consent = self.last_consent.max(Some(consent));
        let days = (window.end - consent).num_days();
        if (0..=window.consent_days).contains(&days) {
            self.in_window += 1;
        }
        if subject.eligibility.is_eligible() {
            self.eligible += 1;
        }
        if subject.is_rescinded() {
            self.rescinded += 1;
        }
    }

    fn merge(&mut self, other: &ConsentCounts) {
        self.consented += other.consented;
        self.last_consent = self.last_consent.max(other.last_consent);
        self.in_window += other.in_window;
        self.eligible += other.eligible;
        self.rescinded += other.rescinded;
    }

    fn row(&self, label: &str, window: &ReportWindow) -> Vec<Cell> {
        vec![
            Cell::text(label),
            Cell::Int(self.consented),
            self.last_consent
                .map_or(Cell::Empty, |last| Cell::Int((window.end - last).num_days())),
            Cell::Int(self.in_window),
            Cell::Int(self.eligible),
            Cell::Int(self.consented - self.eligible),
            Cell::Int(self.rescinded),
        ]
    }
}

/// Consented subjects per treating center.
///
/// Eligibility follows the subject's cohort rule set. "Days Since Last
/// Consent" on the summary row is measured from the most recent consent at
/// any site.
pub fn consent_summary(
    title: &str,
    subjects: &[SubjectRecord],
    window: &ReportWindow,
) -> Result<ReportTable> {
    let mut by_center: BTreeMap<String, ConsentCounts> = BTreeMap::new();
    for subject in subjects {
        let (Some(center), Some(consent)) = (subject.center(), subject.consent_obtained) else {
            continue;
        };
        by_center
            .entry(center.into_owned())
            .or_default()
            .add(subject, consent.date(), window);
    }
    if by_center.is_empty() {
        return Ok(ReportTable::no_data(title));
    }

    let window_label = format!("Consents in last {} Days", window.consent_days);
    let mut table = ReportTable::new(
        title,
        columns([
            "Center Name",
            "Consented",
            "Days Since Last Consent",
            window_label.as_str(),
            "Total Eligible",
            "Total ineligible",
            "Total Rescinded",
        ]),
    );
    let mut all = ConsentCounts::default();
    for (center, counts) in &by_center {
        table.push_row(counts.row(center, window))?;
        all.merge(counts);
    }
    table.push_row(all.row(ALL_SITES, window))?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trialdash_model::{Coded, EligibilityScreen, MRI_COMPATIBLE_CODE};

    fn consented(site: &str, day: u32, eligible: bool) -> SubjectRecord {
        let screen = EligibilityScreen {
            cohort: Some(1),
            incl_comply: Some(1),
            incl_age: Some(1),
            incl_surgery: Some(1),
            excl_knee_replacement: Some(0),
            excl_joint_infection: Some(0),
            excl_no_english: Some(if eligible { 0 } else { 1 }),
            mri_compatible: Some(MRI_COMPATIBLE_CODE),
            ..EligibilityScreen::default()
        };
        SubjectRecord {
            site: Some(Coded::new(site, Some(site))),
            consent_obtained: NaiveDate::from_ymd_opt(2024, 5, day).and_then(|d| d.and_hms_opt(0, 0, 0)),
            eligibility: screen,
            ..SubjectRecord::default()
        }
    }

    #[test]
    fn summarises_consents_per_center() {
        let mut rescinded = consented("B", 2, true);
        rescinded.termination_date = NaiveDate::from_ymd_opt(2024, 5, 20).and_then(|d| d.and_hms_opt(0, 0, 0));
        let subjects = vec![
            consented("A", 30, true),
            consented("A", 10, false),
            rescinded,
            SubjectRecord::default(),
        ];
        let window = ReportWindow::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
            .with_consent_days(25);
        let table = consent_summary("t", &subjects, &window).unwrap();

        assert_eq!(table.columns[3].label, "Consents in last 25 Days");
        assert_eq!(table.cell("A", "Consented"), Some(&Cell::Int(2)));
        assert_eq!(table.cell("A", "Days Since Last Consent"), Some(&Cell::Int(2)));
        assert_eq!(table.cell("A", "Consents in last 25 Days"), Some(&Cell::Int(2)));
        assert_eq!(table.cell("A", "Total Eligible"), Some(&Cell::Int(1)));
        assert_eq!(table.cell("A", "Total ineligible"), Some(&Cell::Int(1)));
        assert_eq!(table.cell("B", "Consents in last 25 Days"), Some(&Cell::Int(0)));
        assert_eq!(table.cell("B", "Total Rescinded"), Some(&Cell::Int(1)));
        assert_eq!(table.cell(ALL_SITES, "Consented"), Some(&Cell::Int(3)));
        assert_eq!(table.cell(ALL_SITES, "Days Since Last Consent"), Some(&Cell::Int(2)));
    }

    #[test]
    fn no_consents_is_placeholder() {
        let window = ReportWindow::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        let table = consent_summary("t", &[SubjectRecord::default()], &window).unwrap();
        assert!(table.is_placeholder());
    }
}
