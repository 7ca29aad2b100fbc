//! Screening tables: participation funnel and reasons for declining.

use trialdash_model::{
    Cell, DisplayDictionary, ParticipationInterest, ReportTable, ReportWindow, SubjectRecord,
    TermKey,
};

use crate::common::{SiteKey, Tally, columns, explode, push_with_total};
use crate::error::Result;

pub const DECLINE_REASON_FIELD: &str = "reason_not_interested";

/// Column label for declines that cite no reason.
pub const NO_REASON_GIVEN: &str = "No Reason Given";

/// Code substituted for a missing decline reason before counting.
pub const NO_REASON_CODE: i64 = -1;

const FUNNEL_ORDER: [ParticipationInterest; 3] = [
    ParticipationInterest::Yes,
    ParticipationInterest::Maybe,
    ParticipationInterest::No,
];

/// Subjects screened per site, split by interest in participating.
///
/// Subjects without a site or an interest answer are left out.
pub fn screening_funnel(title: &str, subjects: &[SubjectRecord], key: SiteKey) -> Result<ReportTable> {
    let mut tally = Tally::new().with_columns(FUNNEL_ORDER.map(ParticipationInterest::label));
    for subject in subjects {
        if let (Some(site), Some(interest)) = (key.of(subject), subject.participation()) {
            tally.add(&site, interest.label());
        }
    }
    if tally.is_empty() {
        return Ok(ReportTable::no_data(title));
    }
    tally.sort_rows();

    let mut table = ReportTable::new(
        title,
        columns(["Center Name", "All Participants", "Yes", "Maybe", "No"]),
    );
    let rows = tally
        .rows()
        .iter()
        .map(|site| {
            let mut row = vec![Cell::text(site.as_str()), Cell::Int(tally.row_total(site))];
            row.extend(
                FUNNEL_ORDER
                    .iter()
                    .map(|interest| Cell::Int(tally.get(site, interest.label()))),
            );
            row
        })
        .collect();
    push_with_total(&mut table, rows)?;
    Ok(table)
}

/// Declines per site with a count per cited reason.
///
/// A subject may cite several reasons or none, so the reason columns need
/// not add up to `Total Declined`.
pub fn decline_reasons(
    title: &str,
    subjects: &[SubjectRecord],
    dictionary: &DisplayDictionary,
    key: SiteKey,
) -> Result<ReportTable> {
    let reasons = dictionary.lookup_multi(DECLINE_REASON_FIELD);
    let mut reason_columns: Vec<String> = reasons
        .map(|lookup| lookup.labels().map(str::to_string).collect())
        .unwrap_or_default();

    let no_reason = NO_REASON_CODE.to_string();
    let mut totals = Tally::new().with_columns(["Total Declined"]);
    let mut by_reason = Tally::new();
    for subject in subjects {
        if subject.participation() != Some(ParticipationInterest::No) {
            continue;
        }
        let Some(site) = key.of(subject) else {
            continue;
        };
        totals.add(&site, "Total Declined");

        let mut codes: Vec<&str> = subject
            .decline_reasons
            .as_deref()
            .map(|raw| explode(raw).collect())
            .unwrap_or_default();
        if codes.is_empty() {
            codes.push(&no_reason);
        }
        for code in codes {
            let label = reason_label(dictionary, code);
            if !reason_columns.contains(&label) {
                reason_columns.push(label.clone());
            }
            by_reason.add(&site, &label);
        }
    }
    if totals.is_empty() {
        return Ok(ReportTable::no_data(title));
    }
    totals.sort_rows();

    // "No Reason Given" always sits after the dictionary's reasons.
    if let Some(pos) = reason_columns.iter().position(|c| c == NO_REASON_GIVEN) {
        let label = reason_columns.remove(pos);
        reason_columns.push(label);
    }

    let mut header = vec!["Center Name".to_string(), "Total Declined".to_string()];
    header.extend(reason_columns.iter().cloned());
    let mut table = ReportTable::new(title, columns(header));
    let rows = totals
        .rows()
        .iter()
        .map(|site| {
            let mut row = vec![
                Cell::text(site.as_str()),
                Cell::Int(totals.get(site, "Total Declined")),
            ];
            row.extend(
                reason_columns
                    .iter()
                    .map(|reason| Cell::Int(by_reason.get(site, reason))),
            );
            row
        })
        .collect();
    push_with_total(&mut table, rows)?;
    Ok(table)
}

fn reason_label(dictionary: &DisplayDictionary, code: &str) -> String {
    let Some(key) = TermKey::parse(code) else {
        return NO_REASON_GIVEN.to_string();
    };
    if key.as_int() == Some(NO_REASON_CODE) {
        return NO_REASON_GIVEN.to_string();
    }
    dictionary
        .lookup_multi(DECLINE_REASON_FIELD)
        .and_then(|lookup| lookup.label(&key))
        .map_or_else(|| key.to_string(), str::to_string)
}

/// Free-text decline comments recorded during the listing window.
pub fn decline_comments(
    title: &str,
    subjects: &[SubjectRecord],
    window: &ReportWindow,
    key: SiteKey,
) -> Result<ReportTable> {
    let range = window.listing_range()?;
    let mut table = ReportTable::new(title, columns(["Center Name", "Date of Contact", "Reason"]));
    for subject in subjects {
        if subject.participation() != Some(ParticipationInterest::No) {
            continue;
        }
        let (Some(site), Some(contact), Some(comment)) = (
            key.of(subject),
            subject.contact_date,
            subject.decline_comment.as_deref(),
        ) else {
            continue;
        };
        if range.contains(contact) {
            table.push_row(vec![
                Cell::text(site.into_owned()),
                Cell::Date(contact.date()),
                Cell::text(comment),
            ])?;
        }
    }
    if table.rows.is_empty() {
        return Ok(ReportTable::no_data(title));
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{ALL_SITES, is_total_row};
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use trialdash_model::{Coded, TermLookup};

    fn subject(site: &str, interest: i64) -> SubjectRecord {
        SubjectRecord {
            site: Some(Coded::new(site, Some(site))),
            participation_interest: Some(Coded::new(interest, None)),
            ..SubjectRecord::default()
        }
    }

    #[test]
    fn funnel_matches_worked_example() {
        let subjects = vec![
            subject("A", 2),
            subject("A", 2),
            subject("A", 0),
            subject("B", 1),
        ];
        let table = screening_funnel("t", &subjects, SiteKey::Center).unwrap();

        let expect = |row: &str, all: i64, yes: i64, maybe: i64, no: i64| {
            assert_eq!(table.cell(row, "All Participants"), Some(&Cell::Int(all)));
            assert_eq!(table.cell(row, "Yes"), Some(&Cell::Int(yes)));
            assert_eq!(table.cell(row, "Maybe"), Some(&Cell::Int(maybe)));
            assert_eq!(table.cell(row, "No"), Some(&Cell::Int(no)));
        };
        expect("A", 3, 2, 0, 1);
        expect("B", 1, 0, 1, 0);
        expect(ALL_SITES, 4, 2, 1, 1);
        assert!(is_total_row(table.rows.last().unwrap()));
    }

    #[test]
    fn funnel_of_nothing_is_placeholder() {
        let table = screening_funnel("t", &[], SiteKey::Center).unwrap();
        assert!(table.is_placeholder());
    }

    #[test]
    fn funnel_by_screening_site_drops_unresolved() {
        let mut resolved = subject("A", 2);
        resolved.screening_site = Some("North".into());
        let unresolved = subject("A", 2);
        let table = screening_funnel("t", &[resolved, unresolved], SiteKey::ScreeningSite).unwrap();
        assert_eq!(table.cell("North", "Yes"), Some(&Cell::Int(1)));
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn decline_reasons_do_not_have_to_add_up() {
        let mut dictionary = DisplayDictionary::default();
        dictionary.multi.insert(
            DECLINE_REASON_FIELD.into(),
            [(1, "Too busy"), (2, "Distance"), (3, "Not interested in research")]
                .into_iter()
                .collect::<TermLookup>(),
        );
        let mut two_reasons = subject("A", 0);
        two_reasons.decline_reasons = Some("1|2".into());
        let no_reason = subject("A", 0);
        let mut unknown = subject("B", 0);
        unknown.decline_reasons = Some("9".into());

        let table = decline_reasons(
            "t",
            &[two_reasons, no_reason, unknown, subject("B", 2)],
            &dictionary,
            SiteKey::Center,
        )
        .unwrap();

        let labels: Vec<&str> = table.columns.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Center Name",
                "Total Declined",
                "Too busy",
                "Distance",
                "Not interested in research",
                "9",
                NO_REASON_GIVEN
            ]
        );
        assert_eq!(table.cell("A", "Total Declined"), Some(&Cell::Int(2)));
        let reason_sum: i64 = table.row_by_label("A").unwrap()[2..]
            .iter()
            .filter_map(Cell::as_i64)
            .sum();
        assert_eq!(reason_sum, 3);
        assert_ne!(reason_sum, 2);
        assert_eq!(table.cell("A", "Not interested in research"), Some(&Cell::Int(0)));
        assert_eq!(table.cell(ALL_SITES, "Total Declined"), Some(&Cell::Int(3)));
    }

    #[test]
    fn decline_comments_use_the_listing_window() {
        let at = |d: u32| {
            NaiveDate::from_ymd_opt(2024, 5, d)
                .unwrap()
                .and_hms_opt(10, 0, 0)
        };
        let mut recent = subject("A", 0);
        recent.contact_date = at(14);
        recent.decline_comment = Some("Lives too far away".into());
        let mut old = subject("A", 0);
        old.contact_date = at(1);
        old.decline_comment = Some("Busy".into());

        let window = ReportWindow::new(NaiveDate::from_ymd_opt(2024, 5, 15).unwrap());
        let table = decline_comments("t", &[recent, old], &window, SiteKey::Center).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][2], Cell::text("Lives too far away"));

        let empty = decline_comments("t", &[], &window, SiteKey::Center).unwrap();
        assert!(empty.is_placeholder());
    }

    proptest! {
        #[test]
        fn funnel_rows_and_columns_add_up(
            picks in prop::collection::vec((0_usize..4, 0_i64..3), 1..60),
        ) {
            let sites = ["A", "B", "C", "D"];
            let subjects: Vec<SubjectRecord> = picks
                .iter()
                .map(|&(site, interest)| subject(sites[site], interest))
                .collect();
            let table = screening_funnel("t", &subjects, SiteKey::Center).unwrap();
            fn counts(row: &[Cell]) -> Vec<i64> {
                row[1..].iter().map(|cell| cell.as_i64().unwrap()).collect()
            }

            let (total, body) = table.rows.split_last().unwrap();
            prop_assert!(is_total_row(total));
            for row in &table.rows {
                let cells = counts(row);
                prop_assert_eq!(cells[0], cells[1] + cells[2] + cells[3]);
            }
            let totals = counts(total);
            for column in 0..totals.len() {
                let sum: i64 = body.iter().map(|row| counts(row)[column]).sum();
                prop_assert_eq!(totals[column], sum);
            }
            prop_assert_eq!(totals[0], subjects.len() as i64);
        }
    }
}
