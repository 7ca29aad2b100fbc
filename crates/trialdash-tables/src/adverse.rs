//! Adverse event tables.

use std::collections::HashSet;

use trialdash_common::format_percent;
use trialdash_model::{
    Cell, Coded, ColumnSpec, DisplayDictionary, EventRecord, ReportTable, ReportWindow,
    SubjectRecord,
};

use crate::common::{
    ALL_SITES, BaselineCohort, Counter, Tally, categories, columns, grouped, sum_row,
};
use crate::error::Result;

pub const AE_SEVERITY_FIELD: &str = "erep_ae_severity";
pub const AE_RELATION_FIELD: &str = "erep_ae_relation";

pub const NO_ADVERSE_EVENTS_MESSAGE: &str = "No Adverse Events in the reporting timeframe";

fn label(coded: Option<&Coded>) -> Option<String> {
    coded.map(|coded| coded.display().into_owned())
}

/// Per-center counts of one coded AE attribute under its own header group.
struct Breakdown {
    group: &'static str,
    labels: Vec<String>,
    tally: Tally,
}

impl Breakdown {
    fn new(
        group: &'static str,
        field: &str,
        dictionary: &DisplayDictionary,
        centers: &[String],
        events: &[&EventRecord],
        pick: impl Fn(&EventRecord) -> Option<&Coded>,
    ) -> Self {
        let observed: Vec<(Option<&str>, String)> = events
            .iter()
            .filter_map(|event| label(pick(event)).map(|l| (event.site.as_deref(), l)))
            .collect();
        let labels = categories(
            dictionary.lookup_multi(field),
            observed.iter().map(|(_, l)| l.as_str()),
        );
        let mut tally = Tally::new()
            .with_rows(centers.iter().cloned())
            .with_columns(labels.iter().cloned());
        for (site, l) in &observed {
            if let Some(site) = *site {
                tally.add_known_row(site, l);
            }
        }
        Self {
            group,
            labels,
            tally,
        }
    }

    fn header(&self) -> Vec<ColumnSpec> {
        grouped(self.group, self.labels.iter().cloned())
    }

    fn cells(&self, center: &str) -> impl Iterator<Item = Cell> + '_ {
        let center = center.to_string();
        self.labels
            .iter()
            .map(move |l| Cell::Int(self.tally.get(&center, l)))
    }
}

/// Adverse events per treating center, with severity and relationship
/// pivots.
///
/// The rate column is relative to the baseline cohort of each center.
pub fn adverse_events_by_center(
    title: &str,
    subjects: &[SubjectRecord],
    events: &[EventRecord],
    centers: &[String],
    dictionary: &DisplayDictionary,
) -> Result<ReportTable> {
    if centers.is_empty() {
        return Ok(ReportTable::no_data(title));
    }
    let adverse: Vec<&EventRecord> = events.iter().filter(|e| e.is_adverse_event()).collect();

    let mut totals = Counter::new();
    let mut with_event: HashSet<i64> = HashSet::new();
    for event in &adverse {
        with_event.insert(event.record_id);
        if let Some(site) = event.site.as_deref() {
            totals.add(site, 1);
        }
    }
    let severity = Breakdown::new(
        "Severity",
        AE_SEVERITY_FIELD,
        dictionary,
        centers,
        &adverse,
        |e| e.ae_severity.as_ref(),
    );
    let relation = Breakdown::new(
        "Relationship",
        AE_RELATION_FIELD,
        dictionary,
        centers,
        &adverse,
        |e| e.ae_relation.as_ref(),
    );

    let cohort = BaselineCohort::new(subjects);
    let mut header = grouped(
        "",
        [
            "Center",
            "Patients",
            "# With Adverse Event",
            "% with 1+ Adverse Events",
            "Total # of A.E.",
        ],
    );
    header.extend(severity.header());
    header.extend(relation.header());
    let mut table = ReportTable::new(title, header);

    let rows: Vec<Vec<Cell>> = centers
        .iter()
        .map(|center| {
            let patients = cohort.size(center);
            let with = cohort.with_records(center, &with_event);
            let mut row = vec![
                Cell::text(center.as_str()),
                Cell::Int(patients),
                Cell::Int(with),
                Cell::text(format_percent(with as f64, patients as f64)),
                Cell::Int(totals.get(center)),
            ];
            row.extend(severity.cells(center));
            row.extend(relation.cells(center));
            row
        })
        .collect();

    let mut total = sum_row(ALL_SITES, &rows, table.columns.len());
    if let (Some(patients), Some(with)) = (total[1].as_f64(), total[2].as_f64()) {
        total[3] = Cell::text(format_percent(with, patients));
    }
    for row in rows {
        table.push_row(row)?;
    }
    table.push_row(total)?;
    Ok(table)
}

/// Adverse events with onset in the listing window, latest onset first.
pub fn adverse_event_listing(
    title: &str,
    events: &[EventRecord],
    window: &ReportWindow,
) -> Result<ReportTable> {
    let range = window.listing_range()?;
    let mut recent: Vec<&EventRecord> = events
        .iter()
        .filter(|event| event.is_adverse_event())
        .filter(|event| event.onset_date.is_some_and(|at| range.contains(at)))
        .collect();
    if recent.is_empty() {
        return Ok(ReportTable::placeholder(title, NO_ADVERSE_EVENTS_MESSAGE));
    }
    recent.sort_by(|a, b| {
        b.onset_date
            .cmp(&a.onset_date)
            .then(a.record_id.cmp(&b.record_id))
            .then(a.instance.cmp(&b.instance))
    });

    let mut table = ReportTable::new(
        title,
        columns([
            "Center",
            "PID",
            "AE Date",
            "Severity",
            "Relationship",
            "Description",
            "Action",
            "Outcome",
        ]),
    );
    for event in recent {
        table.push_row(vec![
            Cell::opt_text(event.site.clone()),
            Cell::Int(event.record_id),
            Cell::opt_date(event.onset_date.map(|at| at.date())),
            Cell::opt_text(label(event.ae_severity.as_ref())),
            Cell::opt_text(label(event.ae_relation.as_ref())),
            Cell::opt_text(event.ae_description.clone()),
            Cell::opt_text(event.action_taken.clone()),
            Cell::opt_text(event.outcome.clone()),
        ])?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use trialdash_model::{TermLookup, VisitProgress};

    fn at(day: u32) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(2024, 5, day).and_then(|d| d.and_hms_opt(8, 30, 0))
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

    fn adverse(record_id: i64, instance: i64, site: &str, severity: (i64, &str), day: u32) -> EventRecord {
        EventRecord {
            record_id,
            instance,
            site: Some(site.to_string()),
            ae_flag: Some(Coded::labelled(1, "Yes")),
            ae_severity: Some(Coded::labelled(severity.0, severity.1)),
            ae_relation: Some(Coded::labelled(3, "Not Related")),
            onset_date: at(day),
            ..EventRecord::default()
        }
    }

    fn dictionary() -> DisplayDictionary {
        let mut dictionary = DisplayDictionary::default();
        dictionary.multi.insert(
            AE_SEVERITY_FIELD.into(),
            [(1, "Mild"), (2, "Moderate"), (3, "Severe")]
                .into_iter()
                .collect::<TermLookup>(),
        );
        dictionary.multi.insert(
            AE_RELATION_FIELD.into(),
            [
                (1, "Definitely Related"),
                (2, "Possibly/Probably Related"),
                (3, "Not Related"),
            ]
            .into_iter()
            .collect::<TermLookup>(),
        );
        dictionary
    }

    #[test]
    fn by_center_pivots_severity_and_relationship() {
        let subjects = vec![
            baseline_subject("A", 1),
            baseline_subject("A", 2),
            baseline_subject("A", 3),
            baseline_subject("A", 4),
        ];
        let events = vec![
            adverse(1, 1, "A", (1, "Mild"), 10),
            adverse(1, 2, "A", (3, "Severe"), 11),
            EventRecord {
                ae_flag: Some(Coded::labelled(0, "No")),
                ..adverse(2, 1, "A", (1, "Mild"), 10)
            },
        ];
        let centers = vec!["A".to_string(), "B".to_string()];
        let table =
            adverse_events_by_center("t", &subjects, &events, &centers, &dictionary()).unwrap();

        let idx = |group: &str, label: &str| table.grouped_column_index(group, label).unwrap();
        let a = table.row_by_label("A").unwrap();
        assert_eq!(a[idx("", "Patients")], Cell::Int(4));
        assert_eq!(a[idx("", "# With Adverse Event")], Cell::Int(1));
        assert_eq!(a[idx("", "% with 1+ Adverse Events")], Cell::text("25.00"));
        assert_eq!(a[idx("", "Total # of A.E.")], Cell::Int(2));
        assert_eq!(a[idx("Severity", "Mild")], Cell::Int(1));
        assert_eq!(a[idx("Severity", "Moderate")], Cell::Int(0));
        assert_eq!(a[idx("Relationship", "Not Related")], Cell::Int(2));

        let b = table.row_by_label("B").unwrap();
        assert_eq!(b[idx("", "% with 1+ Adverse Events")], Cell::text("-"));
        let all = table.row_by_label(ALL_SITES).unwrap();
        assert_eq!(all[idx("Severity", "Severe")], Cell::Int(1));
        assert_eq!(all[idx("", "% with 1+ Adverse Events")], Cell::text("25.00"));
    }

    #[test]
    fn listing_is_newest_first_within_window() {
        let events = vec![
            adverse(4, 1, "A", (1, "Mild"), 9),
            adverse(2, 1, "B", (2, "Moderate"), 13),
            adverse(3, 1, "A", (1, "Mild"), 3),
        ];
        let window = ReportWindow::new(NaiveDate::from_ymd_opt(2024, 5, 15).unwrap());
        let table = adverse_event_listing("t", &events, &window).unwrap();
        let ids: Vec<i64> = table.rows.iter().filter_map(|r| r[1].as_i64()).collect();
        assert_eq!(ids, vec![2, 4]);
        assert_eq!(table.rows[0][3], Cell::text("Moderate"));

        let none = adverse_event_listing("t", &events[2..], &window).unwrap();
        assert_eq!(none.columns[0].label, NO_ADVERSE_EVENTS_MESSAGE);
    }
}
