//! Site reference tables: screening id ranges and activation schedules.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Inclusive screening id range owned by one screening site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRange {
    pub site: String,
    pub start: i64,
    pub end: i64,
}

impl SiteRange {
    pub fn new(site: impl Into<String>, start: i64, end: i64) -> Result<Self> {
        let site = site.into();
        if start > end {
            return Err(ModelError::InvertedRange { site, start, end });
        }
        Ok(Self { site, start, end })
    }

    pub fn contains(&self, id: i64) -> bool {
        (self.start..=self.end).contains(&id)
    }
}

/// Ordered list of screening ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRangeTable {
    ranges: Vec<SiteRange>,
}

impl SiteRangeTable {
    pub fn new(ranges: Vec<SiteRange>) -> Self {
        Self { ranges }
    }

    /// Site of the first range (in table order) containing `id`.
    pub fn resolve(&self, id: i64) -> Option<&str> {
        self.ranges
            .iter()
            .find(|range| range.contains(id))
            .map(|range| range.site.as_str())
    }

    pub fn ranges(&self) -> &[SiteRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

/// When a site started enrolling and how many consents it planned per month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteActivation {
    pub site: String,
    pub start_year: i32,
    pub start_month: u32,
    /// Expected consents for study month 1, 2, ...
    pub expected_monthly: Vec<u32>,
}

impl SiteActivation {
    pub fn new(
        site: impl Into<String>,
        start_year: i32,
        start_month: u32,
        expected_monthly: Vec<u32>,
    ) -> Result<Self> {
        let site = site.into();
        if !(1..=12).contains(&start_month) {
            return Err(ModelError::InvalidMonth {
                site,
                month: start_month,
            });
        }
        Ok(Self {
            site,
            start_year,
            start_month,
            expected_monthly,
        })
    }

    /// Parses a `|`-joined expected enrollment list such as `"2|4|4|6"`.
    ///
    /// Blank entries count as zero.
    pub fn parse_expected(site: &str, raw: &str) -> Result<Vec<u32>> {
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        raw.split('|')
            .map(|part| {
                let part = part.trim();
                if part.is_empty() {
                    return Ok(0);
                }
                part.parse::<u32>()
                    .or_else(|_| {
                        part.parse::<f64>()
                            .ok()
                            .filter(|v| *v >= 0.0 && v.fract() == 0.0)
                            .map(|v| v as u32)
                            .ok_or(())
                    })
                    .map_err(|()| ModelError::InvalidExpected {
                        site: site.to_string(),
                        value: part.to_string(),
                    })
            })
            .collect()
    }

    /// Site-relative month index of a calendar month, clamped to at least 1.
    pub fn study_month(&self, year: i32, month: u32) -> u32 {
        let offset = 12 * (i64::from(year) - i64::from(self.start_year)) + i64::from(month)
            - i64::from(self.start_month)
            + 1;
        u32::try_from(offset.max(1)).unwrap_or(u32::MAX)
    }
}
