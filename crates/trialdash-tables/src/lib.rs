//! Report table builders for the weekly trial report.
//!
//! Each builder is a pure function of typed records, the display dictionary
//! and a [`ReportWindow`](trialdash_model::ReportWindow). [`build_report`]
//! runs all of them and isolates failures per sheet.

pub mod adverse;
pub mod common;
pub mod consent;
pub mod demographics;
pub mod deviations;
pub mod enrollment;
pub mod error;
pub mod report;
pub mod screening;
pub mod status;

pub use adverse::{adverse_event_listing, adverse_events_by_center};
pub use common::{ALL_SITES, SiteKey};
pub use consent::consent_summary;
pub use demographics::{DemographicField, age_summary, demographic_rollup};
pub use deviations::{deviation_listing, deviations_by_center};
pub use enrollment::{enrollment_curve, enrollment_table};
pub use error::{Result, TableError};
pub use report::{
    BUILD_ERROR_PREFIX, Report, ReportInputs, Sheet, SheetId, TableFailure, build_report,
};
pub use screening::{decline_comments, decline_reasons, screening_funnel};
pub use status::{rescinded_split, study_status};
