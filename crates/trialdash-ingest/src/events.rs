//! Multi-row event records (protocol deviations and adverse events).
//!
//! The endpoint returns `{record_id: {instance: {field: value}}}`, or a list
//! of such objects when several pages are concatenated. Each innermost
//! object becomes one row keyed by `(record_id, instance)`.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use tracing::debug;

use trialdash_model::{DisplayDictionary, EventRecord, SubjectRecord};

use crate::error::{IngestError, Result};
use crate::frame::{FrameReader, attach_display, coerce_numeric, frame_from_rows};
use crate::report::{LoadReport, load_units};
use crate::source::{Fetcher, Location};
use crate::subjects::json_row;

pub const EVENT_DATE_COLUMNS: &[&str] = &[
    "erep_local_dtime",
    "erep_ae_date",
    "erep_onset_date",
    "erep_resolution_date",
];

const EVENT_TEXT_COLUMNS: &[&str] = &[
    "erep_protdev_desc",
    "erep_protdev_caplan",
    "erep_ae_desc",
    "erep_action_taken",
    "erep_outcome",
];

pub fn load_event_records<F: Fetcher + ?Sized>(
    location: &Location,
    units: &[String],
    dictionary: &DisplayDictionary,
    fetcher: &F,
) -> LoadReport<EventRecord> {
    load_units("events", location, units, fetcher, |bytes| {
        parse_event_json(&bytes, dictionary)
    })
}

/// Flattens the nested payload into one text row per (record, instance).
pub fn flatten_event_payload(bytes: &[u8]) -> Result<Vec<BTreeMap<String, String>>> {
    let value: Value = serde_json::from_slice(bytes)?;
    let pages = match value {
        Value::Array(pages) => pages,
        object @ Value::Object(_) => vec![object],
        // An empty payload is sometimes sent as `null` or `""`.
        Value::Null => Vec::new(),
        Value::String(text) if text.trim().is_empty() => Vec::new(),
        other => return Err(shape_error(&format!("unexpected top-level {}", kind(&other)))),
    };

    let mut rows = Vec::new();
    for page in pages {
        let Value::Object(records) = page else {
            return Err(shape_error("page is not an object"));
        };
        for (record_id, instances) in records {
            for (instance, fields) in instances_of(instances)? {
                let Value::Object(fields) = fields else {
                    return Err(shape_error(&format!(
                        "record {record_id} instance {instance} is not an object"
                    )));
                };
                let mut row = json_row(fields);
                row.insert("record_id".to_string(), record_id.clone());
                row.insert("instance".to_string(), instance);
                rows.push(row);
            }
        }
    }
    Ok(rows)
}

/// Instances keyed by number; a JSON array is numbered from 1.
fn instances_of(value: Value) -> Result<Vec<(String, Value)>> {
    match value {
        Value::Object(map) => Ok(map.into_iter().collect()),
        Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| ((idx + 1).to_string(), item))
            .collect()),
        other => Err(shape_error(&format!("instances are a {}", kind(&other)))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn shape_error(reason: &str) -> IngestError {
    IngestError::Parse {
        what: "event records".to_string(),
        reason: reason.to_string(),
    }
}

pub fn parse_event_json(bytes: &[u8], dictionary: &DisplayDictionary) -> Result<Vec<EventRecord>> {
    let rows = flatten_event_payload(bytes)?;
    let mut df = frame_from_rows(&rows)?;
    let keep_text: Vec<&str> = EVENT_DATE_COLUMNS
        .iter()
        .chain(EVENT_TEXT_COLUMNS)
        .copied()
        .collect();
    coerce_numeric(&mut df, &keep_text)?;
    attach_display(&mut df, &dictionary.multi)?;

    let reader = FrameReader::new(&df);
    let mut records = Vec::with_capacity(reader.height());
    for idx in 0..reader.height() {
        let (Some(record_id), Some(instance)) =
            (reader.int("record_id", idx), reader.int("instance", idx))
        else {
            debug!(row = idx, "event row without numeric record id or instance skipped");
            continue;
        };
        records.push(EventRecord {
            record_id,
            instance,
            site: None,
            deviation_flag: reader.int("erep_prot_dev", idx),
            deviation_datetime: reader.datetime("erep_local_dtime", idx),
            deviation_type: reader.coded("erep_protdev_type", idx),
            deviation_description: reader.text("erep_protdev_desc", idx),
            corrective_action: reader.text("erep_protdev_caplan", idx),
            ae_flag: reader.coded("erep_ae_yn", idx),
            ae_relation: reader.coded("erep_ae_relation", idx),
            ae_severity: reader.coded("erep_ae_severity", idx),
            ae_serious: reader.coded("erep_ae_serious", idx),
            ae_date: reader.datetime("erep_ae_date", idx),
            onset_date: reader.datetime("erep_onset_date", idx),
            resolution_date: reader.datetime("erep_resolution_date", idx),
            ae_description: reader.text("erep_ae_desc", idx),
            action_taken: reader.label_or_text("erep_action_taken", idx),
            outcome: reader.label_or_text("erep_outcome", idx),
        });
    }
    Ok(records)
}

/// Attaches each event's treating center from the subject with the same
/// record id. Events with no matching subject keep `site = None`.
pub fn join_event_sites(events: &mut [EventRecord], subjects: &[SubjectRecord]) -> usize {
    let mut by_record: HashMap<i64, String> = HashMap::new();
    for subject in subjects {
        if let (Some(record_id), Some(center)) = (subject.record_id, subject.center()) {
            by_record
                .entry(record_id)
                .or_insert_with(|| center.into_owned());
        }
    }
    let mut matched = 0;
    for event in events.iter_mut() {
        event.site = by_record.get(&event.record_id).cloned();
        if event.site.is_some() {
            matched += 1;
        }
    }
    matched
}
