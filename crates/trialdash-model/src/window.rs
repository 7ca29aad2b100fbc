//! Report-date parameters shared by every time-windowed table.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

pub const DEFAULT_REPORT_DAYS: i64 = 7;
pub const DEFAULT_CONSENT_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportWindow {
    /// Date the report is generated.
    pub today: NaiveDate,
    /// Last day covered by the report; earlier dates regenerate past reports.
    pub end: NaiveDate,
    /// Width of the listing window ending at `end`.
    pub report_days: i64,
    /// Width of the "consents in last N days" window.
    pub consent_days: i64,
}

impl ReportWindow {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            end: today,
            report_days: DEFAULT_REPORT_DAYS,
            consent_days: DEFAULT_CONSENT_DAYS,
        }
    }

    #[must_use]
    pub fn with_end(mut self, end: NaiveDate) -> Self {
        self.end = end;
        self
    }

    #[must_use]
    pub fn with_report_days(mut self, days: i64) -> Self {
        self.report_days = days;
        self
    }

    #[must_use]
    pub fn with_consent_days(mut self, days: i64) -> Self {
        self.consent_days = days;
        self
    }

    /// First day before the listing window.
    ///
    /// Fails when `report_days` reaches past the calendar range.
    pub fn start(&self) -> Result<NaiveDate> {
        TimeDelta::try_days(self.report_days)
            .and_then(|span| self.end.checked_sub_signed(span))
            .ok_or(ModelError::WindowOutOfRange {
                end: self.end,
                days: self.report_days,
            })
    }

    /// The `(start, end]` range listings filter on.
    pub fn listing_range(&self) -> Result<ListingRange> {
        Ok(ListingRange {
            start: self.start()?,
            end: self.end,
        })
    }

    /// `true` when `at` falls in `(start, end]`, compared by calendar day.
    pub fn in_listing_window(&self, at: NaiveDateTime) -> Result<bool> {
        Ok(self.listing_range()?.contains(at))
    }

    /// Whole days from `at` to the report end.
    pub fn days_before_end(&self, at: NaiveDateTime) -> i64 {
        (self.end - at.date()).num_days()
    }

    pub fn date_message(&self) -> String {
        format!("This report generated on: {}", self.today)
    }

    pub fn range_message(&self) -> String {
        format!(
            "This report generated on: {} covering the previous {} days.",
            self.today, self.report_days
        )
    }
}

/// Resolved listing window: `start` exclusive, `end` inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ListingRange {
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        let day = at.date();
        day > self.start && day <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn listing_window_is_half_open() {
        let window = ReportWindow::new(day(2024, 5, 15));
        let at = |d: u32| day(2024, 5, d).and_hms_opt(9, 0, 0).unwrap();
        assert!(!window.in_listing_window(at(8)).unwrap());
        assert!(window.in_listing_window(at(9)).unwrap());
        assert!(window.in_listing_window(at(15)).unwrap());
        assert!(!window.in_listing_window(at(16)).unwrap());
    }

    #[test]
    fn oversized_window_is_an_error() {
        let window = ReportWindow::new(day(2024, 6, 1)).with_report_days(100_000_000);
        assert!(matches!(
            window.start(),
            Err(ModelError::WindowOutOfRange { days: 100_000_000, .. })
        ));
        assert!(window.listing_range().is_err());
        assert!(ReportWindow::new(day(2024, 6, 1)).with_report_days(i64::MAX).start().is_err());
    }

    #[test]
    fn messages_mention_dates() {
        let window = ReportWindow::new(day(2024, 5, 15)).with_report_days(14);
        assert_eq!(window.date_message(), "This report generated on: 2024-05-15");
        assert!(window.range_message().ends_with("covering the previous 14 days."));
    }
}
