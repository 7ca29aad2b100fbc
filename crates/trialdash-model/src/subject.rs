//! Subject-level ("weekly") records: one row per screened subject.

use std::borrow::Cow;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::terms::TermKey;

/// A coded cell together with its left-joined display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coded {
    pub key: TermKey,
    /// `None` when the dictionary has no term for this code.
    pub label: Option<String>,
}

impl Coded {
    pub fn new(key: impl Into<TermKey>, label: Option<&str>) -> Self {
        Self {
            key: key.into(),
            label: label.map(str::to_string),
        }
    }

    pub fn labelled(key: impl Into<TermKey>, label: &str) -> Self {
        Self::new(key, Some(label))
    }

    pub fn code(&self) -> Option<i64> {
        self.key.as_int()
    }

    /// The label when known, the raw code otherwise.
    pub fn display(&self) -> Cow<'_, str> {
        match &self.label {
            Some(label) => Cow::Borrowed(label.as_str()),
            None => Cow::Owned(self.key.to_string()),
        }
    }
}

/// Answer to the screening question "interested in participating?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ParticipationInterest {
    No,
    Maybe,
    Yes,
}

impl ParticipationInterest {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::No),
            1 => Some(Self::Maybe),
            2 => Some(Self::Yes),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::No => "No",
            Self::Maybe => "Maybe",
            Self::Yes => "Yes",
        }
    }
}

/// Surgical cohort a subject is screened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cohort {
    /// Total knee arthroplasty.
    Knee,
    /// Thoracic surgery.
    Thoracic,
}

impl Cohort {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Knee),
            2 => Some(Self::Thoracic),
            _ => None,
        }
    }
}

/// Screening inclusion/exclusion answers used to decide eligibility.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityScreen {
    pub cohort: Option<i64>,
    pub incl_comply: Option<i64>,
    pub incl_age: Option<i64>,
    pub incl_surgery: Option<i64>,
    pub excl_knee_replacement: Option<i64>,
    pub excl_joint_infection: Option<i64>,
    pub excl_no_english: Option<i64>,
    pub mri_compatible: Option<i64>,
    pub excl_other_major_surgery: Option<i64>,
    pub excl_prior_thoracic: Option<i64>,
}

/// Code recorded for "MRI compatible" on the MRI screening question.
pub const MRI_COMPATIBLE_CODE: i64 = 4;

impl EligibilityScreen {
    fn is(value: Option<i64>, expected: i64) -> bool {
        value == Some(expected)
    }

    fn common_criteria(&self) -> bool {
        Self::is(self.incl_comply, 1)
            && Self::is(self.incl_age, 1)
            && Self::is(self.incl_surgery, 1)
            && Self::is(self.excl_no_english, 0)
            && Self::is(self.mri_compatible, MRI_COMPATIBLE_CODE)
    }

    /// Knee cohort rule set.
    pub fn knee_eligible(&self) -> bool {
        self.common_criteria()
            && Self::is(self.excl_knee_replacement, 0)
            && Self::is(self.excl_joint_infection, 0)
    }

    /// Thoracic cohort rule set.
    pub fn thoracic_eligible(&self) -> bool {
        self.common_criteria()
            && Self::is(self.excl_other_major_surgery, 0)
            && Self::is(self.excl_prior_thoracic, 0)
    }

    /// Eligible under the rule set of the subject's cohort.
    ///
    /// Subjects without a cohort code are judged by the knee rules, the only
    /// rule set that existed before cohorts were recorded.
    pub fn is_eligible(&self) -> bool {
        match self.cohort.and_then(Cohort::from_code) {
            Some(Cohort::Knee) | None => self.knee_eligible(),
            Some(Cohort::Thoracic) => self.thoracic_eligible(),
        }
    }
}

/// Which study visits a subject has started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitProgress {
    pub baseline: bool,
    pub week_6: bool,
    pub month_3: bool,
    pub month_6: bool,
    pub month_12: bool,
}

/// Demographic answers, as display labels.
///
/// Study-visit answers take precedence; the screening answers fill gaps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Demographics {
    pub age: Option<f64>,
    pub race: Option<String>,
    pub ethnicity: Option<String>,
    pub sex: Option<String>,
    pub screening_age: Option<f64>,
    pub screening_race: Option<String>,
    pub screening_ethnicity: Option<String>,
    pub screening_sex: Option<String>,
}

impl Demographics {
    pub fn merged_age(&self) -> Option<f64> {
        self.age.or(self.screening_age)
    }

    pub fn merged_race(&self) -> Option<&str> {
        self.race.as_deref().or(self.screening_race.as_deref())
    }

    pub fn merged_ethnicity(&self) -> Option<&str> {
        self.ethnicity
            .as_deref()
            .or(self.screening_ethnicity.as_deref())
    }

    pub fn merged_sex(&self) -> Option<&str> {
        self.sex.as_deref().or(self.screening_sex.as_deref())
    }
}

/// One screened subject.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectRecord {
    pub screening_id: Option<i64>,
    /// Study record id, assigned at consent.
    pub record_id: Option<i64>,
    /// Data-access-group (treating center).
    pub site: Option<Coded>,
    /// Center resolved from the screening id ranges.
    pub screening_site: Option<String>,
    pub participation_interest: Option<Coded>,
    /// Raw `|`-joined decline reason codes.
    pub decline_reasons: Option<String>,
    pub decline_comment: Option<String>,
    pub contact_date: Option<NaiveDateTime>,
    pub consent_datetime: Option<NaiveDateTime>,
    pub consent_obtained: Option<NaiveDateTime>,
    pub termination_date: Option<NaiveDateTime>,
    pub termination_reason: Option<Coded>,
    pub termination_comments: Option<String>,
    pub surgery_date: Option<NaiveDateTime>,
    pub eligibility: EligibilityScreen,
    pub visits: VisitProgress,
    pub demographics: Demographics,
}

impl SubjectRecord {
    pub fn is_consented(&self) -> bool {
        self.consent_obtained.is_some()
    }

    /// Active until an early-termination date is recorded.
    pub fn is_active(&self) -> bool {
        self.termination_date.is_none()
    }

    pub fn is_rescinded(&self) -> bool {
        self.termination_date.is_some()
    }

    /// Treating center label.
    pub fn center(&self) -> Option<Cow<'_, str>> {
        self.site.as_ref().map(Coded::display)
    }

    pub fn participation(&self) -> Option<ParticipationInterest> {
        self.participation_interest
            .as_ref()
            .and_then(Coded::code)
            .and_then(ParticipationInterest::from_code)
    }
}
