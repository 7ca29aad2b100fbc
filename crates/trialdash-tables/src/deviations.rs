//! Protocol deviation tables.

use std::collections::HashSet;

use trialdash_common::format_percent;
use trialdash_model::{
    Cell, ColumnSpec, DisplayDictionary, EventRecord, ReportTable, ReportWindow, SubjectRecord,
};

use crate::common::{
    ALL_SITES, BaselineCohort, Counter, Tally, categories, columns, grouped, sum_row,
};
use crate::error::Result;

pub const DEVIATION_TYPE_FIELD: &str = "erep_protdev_type";

pub const NO_DEVIATIONS_MESSAGE: &str = "No Deviations in the reporting timeframe";

fn deviation_label(event: &EventRecord) -> String {
    event
        .deviation_type
        .as_ref()
        .map_or_else(String::new, |kind| kind.display().into_owned())
}

/// Deviations per treating center with a baseline-cohort rate and a count
/// per deviation type.
///
/// Every deviation type in the dictionary gets a column, zero-filled for
/// centers that never recorded it.
pub fn deviations_by_center(
    title: &str,
    subjects: &[SubjectRecord],
    events: &[EventRecord],
    centers: &[String],
    dictionary: &DisplayDictionary,
) -> Result<ReportTable> {
    if centers.is_empty() {
        return Ok(ReportTable::no_data(title));
    }
    let deviations: Vec<&EventRecord> = events.iter().filter(|e| e.is_deviation()).collect();
    let labels: Vec<String> = deviations.iter().copied().map(deviation_label).collect();
    let types = categories(
        dictionary.lookup_multi(DEVIATION_TYPE_FIELD),
        labels.iter().map(String::as_str),
    );

    let mut totals = Counter::new();
    let mut by_type = Tally::new()
        .with_rows(centers.iter().cloned())
        .with_columns(types.iter().cloned());
    let mut with_deviation: HashSet<i64> = HashSet::new();
    for (event, label) in deviations.iter().zip(&labels) {
        with_deviation.insert(event.record_id);
        if let Some(site) = event.site.as_deref() {
            totals.add(site, 1);
            by_type.add_known_row(site, label);
        }
    }

    let cohort = BaselineCohort::new(subjects);
    let mut header = vec![ColumnSpec::grouped("", "Center Name")];
    header.extend(grouped(
        "Subjects",
        ["Baseline", "# With 1+ Deviations", "% Baseline with Deviation"],
    ));
    header.push(ColumnSpec::grouped("Deviations", "Total # of Dev."));
    header.extend(grouped("Deviations", types.iter().cloned()));
    let mut table = ReportTable::new(title, header);

    let rows: Vec<Vec<Cell>> = centers
        .iter()
        .map(|center| {
            let baseline = cohort.size(center);
            let with = cohort.with_records(center, &with_deviation);
            let mut row = vec![
                Cell::text(center.as_str()),
                Cell::Int(baseline),
                Cell::Int(with),
                Cell::text(format_percent(with as f64, baseline as f64)),
                Cell::Int(totals.get(center)),
            ];
            row.extend(types.iter().map(|kind| Cell::Int(by_type.get(center, kind))));
            row
        })
        .collect();

    let mut total = sum_row(ALL_SITES, &rows, table.columns.len());
    if let (Some(baseline), Some(with)) = (total[1].as_f64(), total[2].as_f64()) {
        total[3] = Cell::text(format_percent(with, baseline));
    }
    for row in rows {
        table.push_row(row)?;
    }
    table.push_row(total)?;
    Ok(table)
}

/// Deviations recorded during the listing window, most recent first.
pub fn deviation_listing(
    title: &str,
    events: &[EventRecord],
    window: &ReportWindow,
) -> Result<ReportTable> {
    let range = window.listing_range()?;
    let mut recent: Vec<&EventRecord> = events
        .iter()
        .filter(|event| event.is_deviation())
        .filter(|event| event.deviation_datetime.is_some_and(|at| range.contains(at)))
        .collect();
    if recent.is_empty() {
        return Ok(ReportTable::placeholder(title, NO_DEVIATIONS_MESSAGE));
    }
    recent.sort_by(|a, b| {
        b.deviation_datetime
            .cmp(&a.deviation_datetime)
            .then(a.record_id.cmp(&b.record_id))
            .then_with(|| {
                let code = |e: &EventRecord| e.deviation_type.as_ref().map(|t| t.key.clone());
                code(a).cmp(&code(b))
            })
    });

    let mut table = ReportTable::new(
        title,
        columns([
            "Center Name",
            "PID",
            "Deviation Date",
            "Deviation",
            "Description",
            "Corrective Action",
        ]),
    );
    for event in recent {
        table.push_row(vec![
            Cell::opt_text(event.site.clone()),
            Cell::Int(event.record_id),
            Cell::opt_date(event.deviation_datetime.map(|at| at.date())),
            Cell::text(deviation_label(event)),
            Cell::opt_text(event.deviation_description.clone()),
            Cell::opt_text(event.corrective_action.clone()),
        ])?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use trialdash_model::{Coded, TermLookup, VisitProgress};

    fn at(day: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(2024, 5, day).and_then(|d| d.and_hms_opt(9, 0, 0))
    }

    fn baseline_subject(site: &str, record_id: i64) -> SubjectRecord {
        SubjectRecord {
            record_id: Some(record_id),
            site: Some(Coded::new(site, Some(site))),
            consent_obtained: at(1),
            visits: VisitProgress {
                baseline: true,
                ..VisitProgress::default()
            },
            ..SubjectRecord::default()
        }
    }

    fn deviation(record_id: i64, site: &str, code: i64, label: &str, day: u32) -> EventRecord {
        EventRecord {
            record_id,
            instance: 1,
            site: Some(site.to_string()),
            deviation_type: Some(Coded::labelled(code, label)),
            deviation_datetime: at(day),
            ..EventRecord::default()
        }
    }

    fn dictionary() -> DisplayDictionary {
        let mut dictionary = DisplayDictionary::default();
        dictionary.multi.insert(
            DEVIATION_TYPE_FIELD.into(),
            [(1, "Blood Draw"), (2, "Imaging"), (3, "Visit Timeline")]
                .into_iter()
                .collect::<TermLookup>(),
        );
        dictionary
    }

    #[test]
    fn by_center_uses_baseline_denominator_and_backfills_types() {
        let subjects = vec![
            baseline_subject("A", 1),
            baseline_subject("A", 2),
            SubjectRecord {
                visits: VisitProgress::default(),
                ..baseline_subject("A", 3)
            },
        ];
        let events = vec![
            deviation(1, "A", 1, "Blood Draw", 10),
            deviation(1, "A", 2, "Imaging", 11),
            deviation(3, "A", 2, "Imaging", 12),
        ];
        let centers = vec!["A".to_string(), "B".to_string()];
        let table = deviations_by_center("t", &subjects, &events, &centers, &dictionary()).unwrap();

        assert!(table.has_groups());
        let idx = |group: &str, label: &str| table.grouped_column_index(group, label).unwrap();
        let a = table.row_by_label("A").unwrap();
        assert_eq!(a[idx("Subjects", "Baseline")], Cell::Int(2));
        assert_eq!(a[idx("Subjects", "# With 1+ Deviations")], Cell::Int(1));
        assert_eq!(a[idx("Subjects", "% Baseline with Deviation")], Cell::text("50.00"));
        assert_eq!(a[idx("Deviations", "Total # of Dev.")], Cell::Int(3));
        assert_eq!(a[idx("Deviations", "Imaging")], Cell::Int(2));
        assert_eq!(a[idx("Deviations", "Visit Timeline")], Cell::Int(0));

        let b = table.row_by_label("B").unwrap();
        assert_eq!(b[idx("Subjects", "% Baseline with Deviation")], Cell::text("-"));

        let all = table.row_by_label(ALL_SITES).unwrap();
        assert_eq!(all[idx("Subjects", "% Baseline with Deviation")], Cell::text("50.00"));
        assert_eq!(all[idx("Deviations", "Blood Draw")], Cell::Int(1));
    }

    #[test]
    fn listing_keeps_window_and_sorts_newest_first() {
        let events = vec![
            deviation(2, "A", 1, "Blood Draw", 12),
            deviation(1, "A", 2, "Imaging", 14),
            deviation(1, "A", 1, "Blood Draw", 2),
        ];
        let window = ReportWindow::new(NaiveDate::from_ymd_opt(2024, 5, 15).unwrap());
        let table = deviation_listing("t", &events, &window).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][3], Cell::text("Imaging"));
        assert_eq!(table.rows[1][1], Cell::Int(2));

        let none = deviation_listing("t", &[], &window).unwrap();
        assert!(none.is_placeholder());
        assert_eq!(none.columns[0].label, NO_DEVIATIONS_MESSAGE);
    }
}
