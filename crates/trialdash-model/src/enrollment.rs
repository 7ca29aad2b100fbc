//! Actual vs. expected enrollment, aligned by site-relative study month.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CurveSeries {
    ActualMonthly,
    ActualCumulative,
    ExpectedMonthly,
    ExpectedCumulative,
}

impl CurveSeries {
    pub const ALL: [CurveSeries; 4] = [
        CurveSeries::ActualMonthly,
        CurveSeries::ActualCumulative,
        CurveSeries::ExpectedMonthly,
        CurveSeries::ExpectedCumulative,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::ActualMonthly => "Actual: Monthly",
            Self::ActualCumulative => "Actual: Cumulative",
            Self::ExpectedMonthly => "Expected: Monthly",
            Self::ExpectedCumulative => "Expected: Cumulative",
        }
    }

    pub const fn is_cumulative(self) -> bool {
        matches!(self, Self::ActualCumulative | Self::ExpectedCumulative)
    }
}

impl fmt::Display for CurveSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One long-form observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentPoint {
    pub site: String,
    pub study_month: u32,
    pub series: CurveSeries,
    pub value: u64,
}

/// One study month of a per-site wide view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentMonth {
    pub study_month: u32,
    pub actual_monthly: u64,
    pub actual_cumulative: u64,
    pub expected_monthly: u64,
    pub expected_cumulative: u64,
}

/// Long-form enrollment curve: the canonical output of the curve builder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentCurve {
    pub points: Vec<EnrollmentPoint>,
}

impl EnrollmentCurve {
    pub fn new(points: Vec<EnrollmentPoint>) -> Self {
        Self { points }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Sites in first-seen order.
    pub fn sites(&self) -> Vec<&str> {
        let mut sites: Vec<&str> = Vec::new();
        for point in &self.points {
            if !sites.contains(&point.site.as_str()) {
                sites.push(point.site.as_str());
            }
        }
        sites
    }

    pub fn series<'a>(
        &'a self,
        site: &'a str,
        series: CurveSeries,
    ) -> impl Iterator<Item = &'a EnrollmentPoint> + 'a {
        self.points
            .iter()
            .filter(move |point| point.site == site && point.series == series)
    }

    /// Pivots one site's long-form points into months `1..=last`.
    ///
    /// Monthly gaps are 0; cumulative gaps carry the last known value
    /// forward.
    pub fn wide_view(&self, site: &str) -> Vec<EnrollmentMonth> {
        let last = self
            .points
            .iter()
            .filter(|point| point.site == site)
            .map(|point| point.study_month)
            .max()
            .unwrap_or(0);
        let mut months: Vec<EnrollmentMonth> = (1..=last)
            .map(|study_month| EnrollmentMonth {
                study_month,
                actual_monthly: 0,
                actual_cumulative: 0,
                expected_monthly: 0,
                expected_cumulative: 0,
            })
            .collect();
        let mut seen = vec![[false; 2]; months.len()];
        for point in self.points.iter().filter(|point| point.site == site) {
            // Study months start at 1; anything else has no slot.
            let Some(idx) = point.study_month.checked_sub(1).map(|idx| idx as usize) else {
                continue;
            };
            let month = &mut months[idx];
            match point.series {
                CurveSeries::ActualMonthly => month.actual_monthly = point.value,
                CurveSeries::ExpectedMonthly => month.expected_monthly = point.value,
                CurveSeries::ActualCumulative => {
                    month.actual_cumulative = point.value;
                    seen[idx][0] = true;
                }
                CurveSeries::ExpectedCumulative => {
                    month.expected_cumulative = point.value;
                    seen[idx][1] = true;
                }
            }
        }
        let mut carry = [0_u64; 2];
        for (month, seen) in months.iter_mut().zip(seen) {
            if seen[0] {
                carry[0] = month.actual_cumulative;
            } else {
                month.actual_cumulative = carry[0];
            }
            if seen[1] {
                carry[1] = month.expected_cumulative;
            } else {
                month.expected_cumulative = carry[1];
            }
        }
        months
    }
}
