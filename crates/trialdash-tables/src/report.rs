//! Assembly of the full weekly report.
//!
//! Every sheet is built independently: a builder that fails leaves a
//! placeholder sheet and a [`TableFailure`] behind, and the rest of the
//! report is unaffected.

use serde::Serialize;
use tracing::{debug, info, warn};

use trialdash_model::{
    DisplayDictionary, EnrollmentCurve, EventRecord, ReportTable, ReportWindow, SiteActivation,
    SubjectRecord,
};

use crate::adverse::{adverse_event_listing, adverse_events_by_center};
use crate::common::SiteKey;
use crate::consent::consent_summary;
use crate::demographics::{DemographicField, age_summary, demographic_rollup};
use crate::deviations::{deviation_listing, deviations_by_center};
use crate::enrollment::{enrollment_curve, enrollment_table};
use crate::error::Result;
use crate::screening::{decline_comments, decline_reasons, screening_funnel};
use crate::status::{rescinded_split, study_status};

/// Prefix of the placeholder header left by a failed builder.
pub const BUILD_ERROR_PREFIX: &str = "Error building table";

/// The fixed, ordered sheet list of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetId {
    Screening,
    DeclineReasons,
    DeclineComments,
    Consent,
    StudyStatus,
    RescindedPreSurgery,
    RescindedPostSurgery,
    Deviations,
    DeviationListing,
    AdverseEvents,
    AdverseEventListing,
    Sex,
    Race,
    Ethnicity,
    Age,
    Enrollment,
}

impl SheetId {
    pub const ALL: [SheetId; 16] = [
        Self::Screening,
        Self::DeclineReasons,
        Self::DeclineComments,
        Self::Consent,
        Self::StudyStatus,
        Self::RescindedPreSurgery,
        Self::RescindedPostSurgery,
        Self::Deviations,
        Self::DeviationListing,
        Self::AdverseEvents,
        Self::AdverseEventListing,
        Self::Sex,
        Self::Race,
        Self::Ethnicity,
        Self::Age,
        Self::Enrollment,
    ];

    pub const fn id(self) -> &'static str {
        match self {
            Self::Screening => "screening",
            Self::DeclineReasons => "decline_reasons",
            Self::DeclineComments => "decline_comments",
            Self::Consent => "consent",
            Self::StudyStatus => "study_status",
            Self::RescindedPreSurgery => "rescinded_pre_surgery",
            Self::RescindedPostSurgery => "rescinded_post_surgery",
            Self::Deviations => "deviations",
            Self::DeviationListing => "deviation_listing",
            Self::AdverseEvents => "adverse_events",
            Self::AdverseEventListing => "adverse_event_listing",
            Self::Sex => "sex",
            Self::Race => "race",
            Self::Ethnicity => "ethnicity",
            Self::Age => "age",
            Self::Enrollment => "enrollment",
        }
    }

    /// Export sheet name; at most 31 characters.
    pub const fn sheet_name(self) -> &'static str {
        match self {
            Self::Screening => "Screening",
            Self::DeclineReasons => "Decline Reasons",
            Self::DeclineComments => "Decline Comments",
            Self::Consent => "Consent",
            Self::StudyStatus => "Study Status",
            Self::RescindedPreSurgery => "Rescinded Consent",
            Self::RescindedPostSurgery => "Early Termination",
            Self::Deviations => "Deviations",
            Self::DeviationListing => "Deviation Descriptions",
            Self::AdverseEvents => "Adverse Events",
            Self::AdverseEventListing => "Adverse Event Descriptions",
            Self::Sex => "Gender",
            Self::Race => "Race",
            Self::Ethnicity => "Ethnicity",
            Self::Age => "Age",
            Self::Enrollment => "Enrollment",
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            Self::Screening => "Table 1. Number of Subjects Screened",
            Self::DeclineReasons => "Table 2.a. Reasons for declining by Site",
            Self::DeclineComments => "Table 2.b. Reasons for declining 'Additional Comments'",
            Self::Consent => "Table 3. Number of Subjects Consented",
            Self::StudyStatus => "Table 4. Ongoing Study Status",
            Self::RescindedPreSurgery => "Table 5. Rescinded Consent",
            Self::RescindedPostSurgery => "Table 6. Early Study Termination Listing",
            Self::Deviations => "Table 7.a. Protocol Deviations",
            Self::DeviationListing => "Table 7.b. Description of Protocol Deviations",
            Self::AdverseEvents => "Table 8.a. Adverse Events",
            Self::AdverseEventListing => "Table 8.b. Description of Adverse Events",
            Self::Sex => "Table 9.a. Demographic Characteristics: Gender",
            Self::Race => "Table 9.b. Demographic Characteristics: Race",
            Self::Ethnicity => "Table 9.c. Demographic Characteristics: Ethnicity",
            Self::Age => "Table 9.d. Demographic Characteristics: Age",
            Self::Enrollment => "Enrollment: Actual vs. Expected",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|sheet| sheet.id() == id)
    }
}

/// Everything the builders read, loaded once per report.
#[derive(Debug, Clone, Copy)]
pub struct ReportInputs<'a> {
    pub subjects: &'a [SubjectRecord],
    pub events: &'a [EventRecord],
    pub dictionary: &'a DisplayDictionary,
    pub activation: &'a [SiteActivation],
    /// Row set of the per-center tables.
    pub centers: &'a [String],
    /// Site the screening tables group by.
    pub screening_key: SiteKey,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sheet {
    pub id: SheetId,
    pub name: &'static str,
    pub table: ReportTable,
}

/// A sheet whose builder returned an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableFailure {
    pub id: SheetId,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub window: ReportWindow,
    pub date_message: String,
    pub range_message: String,
    pub sheets: Vec<Sheet>,
    pub curve: EnrollmentCurve,
    pub failures: Vec<TableFailure>,
}

impl Report {
    pub fn sheet(&self, id: SheetId) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.id == id)
    }

    pub fn table(&self, id: SheetId) -> Option<&ReportTable> {
        self.sheet(id).map(|sheet| &sheet.table)
    }
}

/// Builds every sheet of the report, in [`SheetId::ALL`] order.
pub fn build_report(inputs: &ReportInputs<'_>, window: &ReportWindow) -> Report {
    let mut curve = None;
    let mut sheets = Vec::with_capacity(SheetId::ALL.len());
    let mut failures = Vec::new();
    for id in SheetId::ALL {
        let table = match build_sheet(id, inputs, window, &mut curve) {
            Ok(table) => {
                debug!(table = id.id(), rows = table.rows.len(), "table built");
                table
            }
            Err(err) => {
                let reason = err.to_string();
                warn!(table = id.id(), %reason, "table builder failed");
                let placeholder =
                    ReportTable::placeholder(id.title(), format!("{BUILD_ERROR_PREFIX}: {reason}"));
                failures.push(TableFailure { id, reason });
                placeholder
            }
        };
        sheets.push(Sheet {
            id,
            name: id.sheet_name(),
            table,
        });
    }

    info!(
        sheets = sheets.len(),
        failures = failures.len(),
        "report assembled"
    );
    Report {
        window: *window,
        date_message: window.date_message(),
        range_message: window.range_message(),
        sheets,
        curve: curve.unwrap_or_default(),
        failures,
    }
}

fn build_sheet(
    id: SheetId,
    inputs: &ReportInputs<'_>,
    window: &ReportWindow,
    curve: &mut Option<EnrollmentCurve>,
) -> Result<ReportTable> {
    let ReportInputs {
        subjects,
        events,
        dictionary,
        activation,
        centers,
        screening_key,
    } = *inputs;
    let title = id.title();
    match id {
        SheetId::Screening => screening_funnel(title, subjects, screening_key),
        SheetId::DeclineReasons => decline_reasons(title, subjects, dictionary, screening_key),
        SheetId::DeclineComments => decline_comments(title, subjects, window, screening_key),
        SheetId::Consent => consent_summary(title, subjects, window),
        SheetId::StudyStatus => study_status(title, subjects, centers, window),
        SheetId::RescindedPreSurgery | SheetId::RescindedPostSurgery => {
            let (pre, post) = rescinded_split(
                SheetId::RescindedPreSurgery.title(),
                SheetId::RescindedPostSurgery.title(),
                subjects,
            )?;
            Ok(if id == SheetId::RescindedPreSurgery { pre } else { post })
        }
        SheetId::Deviations => deviations_by_center(title, subjects, events, centers, dictionary),
        SheetId::DeviationListing => deviation_listing(title, events, window),
        SheetId::AdverseEvents => {
            adverse_events_by_center(title, subjects, events, centers, dictionary)
        }
        SheetId::AdverseEventListing => adverse_event_listing(title, events, window),
        SheetId::Sex => demographic_rollup(title, subjects, dictionary, DemographicField::Sex),
        SheetId::Race => demographic_rollup(title, subjects, dictionary, DemographicField::Race),
        SheetId::Ethnicity => {
            demographic_rollup(title, subjects, dictionary, DemographicField::Ethnicity)
        }
        SheetId::Age => age_summary(title, subjects),
        SheetId::Enrollment => {
            let built = enrollment_curve(subjects, activation)?;
            let table = enrollment_table(title, &built)?;
            *curve = Some(built);
            Ok(table)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_names_fit_spreadsheet_limit() {
        for sheet in SheetId::ALL {
            assert!(sheet.sheet_name().chars().count() <= 31, "{}", sheet.sheet_name());
            assert_eq!(SheetId::from_id(sheet.id()), Some(sheet));
        }
    }

    #[test]
    fn sheet_ids_serialize_as_snake_case() {
        let json = serde_json::to_string(&SheetId::AdverseEventListing).unwrap();
        assert_eq!(json, "\"adverse_event_listing\"");
    }
}
