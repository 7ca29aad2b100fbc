//! Ongoing study status and rescinded-consent listings.

use trialdash_model::{Cell, ReportTable, ReportWindow, SubjectRecord};

use crate::common::{Counter, columns, push_with_total};
use crate::error::Result;

/// Header of the rescission listings when nobody qualifies.
pub const NO_RESCINDED_MESSAGE: &str = "No Patients meet these criteria";

const STATUS_COLUMNS: [&str; 9] = [
    "Center",
    "Consented",
    "Baseline",
    "Surgery Complete",
    "6 week",
    "3 Month",
    "6 Month",
    "12 Month",
    "Resc./Early Term.",
];

/// Milestones reached by consented subjects, one row per known center.
///
/// `centers` fixes the row set, so a center with no consents still shows a
/// row of zeros. Surgery counts as complete when its date is on or before
/// the report end.
pub fn study_status(
    title: &str,
    subjects: &[SubjectRecord],
    centers: &[String],
    window: &ReportWindow,
) -> Result<ReportTable> {
    if centers.is_empty() {
        return Ok(ReportTable::no_data(title));
    }
    let mut counters: Vec<Counter> = (0..STATUS_COLUMNS.len() - 1).map(|_| Counter::new()).collect();
    for subject in subjects.iter().filter(|subject| subject.is_consented()) {
        let Some(center) = subject.center() else {
            continue;
        };
        let surgery_done = subject
            .surgery_date
            .is_some_and(|date| date.date() <= window.end);
        let flags = [
            true,
            subject.visits.baseline,
            surgery_done,
            subject.visits.week_6,
            subject.visits.month_3,
            subject.visits.month_6,
            subject.visits.month_12,
            subject.is_rescinded(),
        ];
        for (counter, flag) in counters.iter_mut().zip(flags) {
            counter.add(&center, i64::from(flag));
        }
    }

    let mut table = ReportTable::new(title, columns(STATUS_COLUMNS));
    let rows = centers
        .iter()
        .map(|center| {
            let mut row = vec![Cell::text(center.as_str())];
            row.extend(counters.iter().map(|counter| Cell::Int(counter.get(center))));
            row
        })
        .collect();
    push_with_total(&mut table, rows)?;
    Ok(table)
}

/// Splits rescinded subjects by whether they left before surgery.
///
/// Pre-surgery: no surgery date, or termination strictly before surgery.
/// Post-surgery: termination on or after a recorded surgery date. Every
/// rescinded subject lands in exactly one of the two tables.
pub fn rescinded_split(
    pre_title: &str,
    post_title: &str,
    subjects: &[SubjectRecord],
) -> Result<(ReportTable, ReportTable)> {
    let header = [
        "Center Name",
        "Record ID",
        "Consent Date",
        "Early Termination Date",
        "Reason",
        "Comments",
    ];
    let mut pre = ReportTable::new(pre_title, columns(header));
    let mut post = ReportTable::new(post_title, columns(header));

    for subject in subjects {
        let Some(terminated) = subject.termination_date else {
            continue;
        };
        let consent = subject.consent_datetime.or(subject.consent_obtained);
        let row = vec![
            Cell::opt_text(subject.center().map(|center| center.into_owned())),
            subject.record_id.map_or(Cell::Empty, Cell::Int),
            Cell::opt_date(consent.map(|at| at.date())),
            Cell::Date(terminated.date()),
            Cell::opt_text(subject.termination_reason.as_ref().map(|reason| reason.display().into_owned())),
            Cell::opt_text(subject.termination_comments.clone()),
        ];
        match subject.surgery_date {
            Some(surgery) if terminated >= surgery => post.push_row(row)?,
            _ => pre.push_row(row)?,
        }
    }

    let finish = |table: ReportTable| {
        if table.rows.is_empty() {
            ReportTable::placeholder(table.title, NO_RESCINDED_MESSAGE)
        } else {
            table
        }
    };
    Ok((finish(pre), finish(post)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use trialdash_model::{Coded, VisitProgress};

    use crate::common::ALL_SITES;

    fn at(month: u32, day: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(2024, month, day).and_then(|d| d.and_hms_opt(12, 0, 0))
    }

    fn subject(site: &str, record_id: i64) -> SubjectRecord {
        SubjectRecord {
            record_id: Some(record_id),
            site: Some(Coded::new(site, Some(site))),
            consent_obtained: at(1, 5),
            ..SubjectRecord::default()
        }
    }

    #[test]
    fn status_counts_milestones_for_every_center() {
        let mut a1 = subject("A", 1);
        a1.visits = VisitProgress {
            baseline: true,
            week_6: true,
            ..VisitProgress::default()
        };
        a1.surgery_date = at(2, 1);
        let mut a2 = subject("A", 2);
        a2.surgery_date = at(9, 1);
        a2.termination_date = at(3, 1);
        let mut unconsented = subject("A", 3);
        unconsented.consent_obtained = None;

        let centers = vec!["A".to_string(), "B".to_string()];
        let window = ReportWindow::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        let table = study_status("t", &[a1, a2, unconsented], &centers, &window).unwrap();

        assert_eq!(table.cell("A", "Consented"), Some(&Cell::Int(2)));
        assert_eq!(table.cell("A", "Baseline"), Some(&Cell::Int(1)));
        assert_eq!(table.cell("A", "Surgery Complete"), Some(&Cell::Int(1)));
        assert_eq!(table.cell("A", "6 week"), Some(&Cell::Int(1)));
        assert_eq!(table.cell("A", "Resc./Early Term."), Some(&Cell::Int(1)));
        assert_eq!(table.cell("B", "Consented"), Some(&Cell::Int(0)));
        assert_eq!(table.cell(ALL_SITES, "Consented"), Some(&Cell::Int(2)));
    }

    #[test]
    fn rescinded_tables_partition_terminations() {
        let mut no_surgery = subject("A", 1);
        no_surgery.termination_date = at(3, 1);
        let mut before = subject("A", 2);
        before.termination_date = at(3, 1);
        before.surgery_date = at(4, 1);
        let mut after = subject("B", 3);
        after.termination_date = at(5, 1);
        after.surgery_date = at(4, 1);
        let mut same_day = subject("B", 4);
        same_day.termination_date = at(4, 1);
        same_day.surgery_date = at(4, 1);
        let active = subject("B", 5);

        let subjects = vec![no_surgery, before, after, same_day, active];
        let (pre, post) = rescinded_split("pre", "post", &subjects).unwrap();

        let ids = |table: &ReportTable| -> Vec<i64> {
            table.rows.iter().filter_map(|row| row[1].as_i64()).collect()
        };
        assert_eq!(ids(&pre), vec![1, 2]);
        assert_eq!(ids(&post), vec![3, 4]);
        let rescinded = subjects.iter().filter(|s| s.is_rescinded()).count();
        assert_eq!(pre.rows.len() + post.rows.len(), rescinded);
    }

    #[test]
    fn empty_rescission_listing_is_placeholder() {
        let (pre, post) = rescinded_split("pre", "post", &[subject("A", 1)]).unwrap();
        assert!(pre.is_placeholder());
        assert_eq!(post.columns[0].label, NO_RESCINDED_MESSAGE);
        assert_eq!(post.title, "post");
    }
}
