//! Typed data model for the trial operations report.
//!
//! Source records, reference tables and report tables are explicit types
//! rather than string-keyed frames, so a renamed field is a compile error
//! instead of an empty column at render time.

pub mod enrollment;
pub mod error;
pub mod event;
pub mod site;
pub mod subject;
pub mod table;
pub mod terms;
pub mod window;

pub use enrollment::{CurveSeries, EnrollmentCurve, EnrollmentMonth, EnrollmentPoint};
pub use error::{ModelError, Result};
pub use event::{EventKind, EventRecord};
pub use site::{SiteActivation, SiteRange, SiteRangeTable};
pub use subject::{
    Cohort, Coded, Demographics, EligibilityScreen, MRI_COMPATIBLE_CODE, ParticipationInterest,
    SubjectRecord, VisitProgress,
};
pub use table::{Cell, ColumnSpec, NO_DATA_MESSAGE, ReportTable};
pub use terms::{DisplayDictionary, DisplayTerm, TermKey, TermLookup};
pub use window::{DEFAULT_CONSENT_DAYS, DEFAULT_REPORT_DAYS, ListingRange, ReportWindow};
