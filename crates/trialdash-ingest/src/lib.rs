//! Ingestion for the trial operations report.
//!
//! Fetches the display-term dictionary, subject and event records, and the
//! site reference tables, and turns them into the typed records of
//! `trialdash-model`. Record loaders never fail as a whole: each
//! organizational unit is fetched and parsed on its own and its outcome is
//! recorded in a [`LoadReport`].

pub mod datetime;
pub mod dictionary;
pub mod error;
pub mod events;
pub mod frame;
pub mod report;
pub mod sites;
pub mod source;
pub mod subjects;

pub use datetime::parse_datetime;
pub use dictionary::{build_display_dictionary, load_display_terms, parse_display_terms};
pub use error::{IngestError, Result};
pub use events::{flatten_event_payload, join_event_sites, load_event_records, parse_event_json};
pub use report::{LoadReport, UnitLoad, UnitStatus};
pub use sites::{
    load_site_activation, load_site_ranges, parse_site_activation, parse_site_ranges,
    resolve_screening_sites,
};
pub use source::{
    DEFAULT_FETCH_TIMEOUT, Fetcher, HttpFetcher, Location, StaticFetcher, unit_locations,
};
pub use subjects::{
    SubjectFormat, SubjectSource, centers, load_subject_records, parse_subject_csv,
    parse_subject_json,
};
