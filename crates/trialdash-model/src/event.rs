//! One-to-many event records: protocol deviations and adverse events.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::subject::Coded;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Deviation,
    AdverseEvent,
}

/// One (record id, instance) row from the multi-row endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub record_id: i64,
    pub instance: i64,
    /// Treating center, joined from the subject records.
    pub site: Option<String>,
    pub deviation_flag: Option<i64>,
    pub deviation_datetime: Option<NaiveDateTime>,
    pub deviation_type: Option<Coded>,
    pub deviation_description: Option<String>,
    pub corrective_action: Option<String>,
    pub ae_flag: Option<Coded>,
    pub ae_relation: Option<Coded>,
    pub ae_severity: Option<Coded>,
    pub ae_serious: Option<Coded>,
    pub ae_date: Option<NaiveDateTime>,
    pub onset_date: Option<NaiveDateTime>,
    pub resolution_date: Option<NaiveDateTime>,
    pub ae_description: Option<String>,
    pub action_taken: Option<String>,
    pub outcome: Option<String>,
}

impl EventRecord {
    /// Classifies the record.
    ///
    /// A deviation type code makes the record a deviation; otherwise an AE
    /// flag of 1 makes it an adverse event. Anything else is neither.
    pub fn kind(&self) -> Option<EventKind> {
        if self.deviation_type.is_some() {
            Some(EventKind::Deviation)
        } else if self.ae_flag.as_ref().and_then(Coded::code) == Some(1) {
            Some(EventKind::AdverseEvent)
        } else {
            None
        }
    }

    pub fn is_deviation(&self) -> bool {
        self.kind() == Some(EventKind::Deviation)
    }

    pub fn is_adverse_event(&self) -> bool {
        self.kind() == Some(EventKind::AdverseEvent)
    }
}
