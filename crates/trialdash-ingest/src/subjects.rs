//! Subject-level ("weekly") record loading.

use std::collections::BTreeMap;

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use trialdash_model::{
    Demographics, DisplayDictionary, EligibilityScreen, SubjectRecord, VisitProgress,
};

use crate::error::{IngestError, Result};
use crate::frame::{FrameReader, attach_display, coerce_numeric, frame_from_rows, read_csv_frame};
use crate::report::{LoadReport, load_units};
use crate::source::{Fetcher, Location};

/// Date/time columns of the subject payload.
pub const SUBJECT_DATE_COLUMNS: &[&str] = &[
    "date_of_contact",
    "date_and_time",
    "obtain_date",
    "ewdateterm",
    "sp_surg_date",
];

/// Free-text columns that must never be cast to numbers.
const SUBJECT_TEXT_COLUMNS: &[&str] = &["reason_not_interested", "ptinterest_comment", "ewcomments"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectFormat {
    /// One CSV payload per fetch.
    Csv,
    /// A JSON array of row objects per fetch.
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectSource {
    pub format: SubjectFormat,
    pub location: Location,
}

/// Loads subject records from every unit of `source`.
pub fn load_subject_records<F: Fetcher + ?Sized>(
    source: &SubjectSource,
    units: &[String],
    dictionary: &DisplayDictionary,
    fetcher: &F,
) -> LoadReport<SubjectRecord> {
    load_units("subjects", &source.location, units, fetcher, |bytes| {
        match source.format {
            SubjectFormat::Csv => parse_subject_csv(bytes, dictionary),
            SubjectFormat::Json => parse_subject_json(&bytes, dictionary),
        }
    })
}

pub fn parse_subject_csv(bytes: Vec<u8>, dictionary: &DisplayDictionary) -> Result<Vec<SubjectRecord>> {
    let df = read_csv_frame(bytes)?;
    subjects_from_frame(df, dictionary)
}

pub fn parse_subject_json(bytes: &[u8], dictionary: &DisplayDictionary) -> Result<Vec<SubjectRecord>> {
    let value: Value = serde_json::from_slice(bytes)?;
    let Value::Array(items) = value else {
        return Err(IngestError::Parse {
            what: "subject records".to_string(),
            reason: "expected a JSON array of records".to_string(),
        });
    };
    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        let Value::Object(fields) = item else {
            return Err(IngestError::Parse {
                what: "subject records".to_string(),
                reason: "array element is not an object".to_string(),
            });
        };
        rows.push(json_row(fields));
    }
    subjects_from_frame(frame_from_rows(&rows)?, dictionary)
}

/// Flattens one JSON object into text cells; nulls are left out.
pub(crate) fn json_row(fields: serde_json::Map<String, Value>) -> BTreeMap<String, String> {
    fields
        .into_iter()
        .filter_map(|(key, value)| json_text(value).map(|text| (key, text)))
        .collect()
}

pub(crate) fn json_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        Value::Bool(flag) => Some(if flag { "1" } else { "0" }.to_string()),
        Value::Number(number) => Some(number.to_string()),
        other => Some(other.to_string()),
    }
}

fn subjects_from_frame(mut df: DataFrame, dictionary: &DisplayDictionary) -> Result<Vec<SubjectRecord>> {
    let keep_text: Vec<&str> = SUBJECT_DATE_COLUMNS
        .iter()
        .chain(SUBJECT_TEXT_COLUMNS)
        .copied()
        .collect();
    let coerced = coerce_numeric(&mut df, &keep_text)?;
    let labelled = attach_display(&mut df, &dictionary.single)?;
    debug!(
        rows = df.height(),
        numeric_columns = coerced.len(),
        display_columns = labelled,
        "subject frame prepared"
    );

    let reader = FrameReader::new(&df);
    Ok((0..reader.height())
        .map(|idx| subject_from_row(&reader, idx))
        .collect())
}

fn subject_from_row(row: &FrameReader<'_>, idx: usize) -> SubjectRecord {
    SubjectRecord {
        screening_id: row.int("screening_id", idx),
        record_id: row.int("record_id", idx),
        site: row.coded("redcap_data_access_group", idx),
        screening_site: None,
        participation_interest: row.coded("participation_interest", idx),
        decline_reasons: row.text("reason_not_interested", idx),
        decline_comment: row.text("ptinterest_comment", idx),
        contact_date: row.datetime("date_of_contact", idx),
        consent_datetime: row.datetime("date_and_time", idx),
        consent_obtained: row.datetime("obtain_date", idx),
        termination_date: row.datetime("ewdateterm", idx),
        termination_reason: row.coded("ewprimaryreason", idx),
        termination_comments: row.text("ewcomments", idx),
        surgery_date: row.datetime("sp_surg_date", idx),
        eligibility: EligibilityScreen {
            cohort: row.int("mcc", idx),
            incl_comply: row.int("sp_inclcomply", idx),
            incl_age: row.int("sp_inclage1884", idx),
            incl_surgery: row.int("sp_inclsurg", idx),
            excl_knee_replacement: row.int("sp_exclarthkneerep", idx),
            excl_joint_infection: row.int("sp_exclinfdxjoint", idx),
            excl_no_english: row.int("sp_exclnoreadspkenglish", idx),
            mri_compatible: row.int("sp_mricompatscr", idx),
            excl_other_major_surgery: row.int("sp_exclothmajorsurg", idx),
            excl_prior_thoracic: row.int("sp_exclprevbilthorpro", idx),
        },
        visits: VisitProgress {
            baseline: row.flag("start_v1_preop", idx),
            week_6: row.flag("start_v2_6wk", idx),
            month_3: row.flag("start_v3_3mo", idx),
            month_6: row.flag("start_6mo", idx),
            month_12: row.flag("start_12mo", idx),
        },
        demographics: Demographics {
            age: row.float("age", idx),
            race: row.label("dem_race", idx),
            ethnicity: row.label("ethnic", idx),
            sex: row.label("sex", idx),
            screening_age: row.float("screening_age", idx),
            screening_race: row.label("screening_race", idx),
            screening_ethnicity: row.label("screening_ethnicity", idx),
            screening_sex: row.label("screening_gender", idx),
        },
    }
}

/// Distinct treating-center labels in first-seen order.
pub fn centers(records: &[SubjectRecord]) -> Vec<String> {
    let mut centers: Vec<String> = Vec::new();
    for center in records.iter().filter_map(SubjectRecord::center) {
        if !centers.iter().any(|known| known == center.as_ref()) {
            centers.push(center.into_owned());
        }
    }
    centers
}
