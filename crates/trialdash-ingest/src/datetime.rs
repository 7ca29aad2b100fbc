//! Date/time cells as exported by the data capture system.

use chrono::{NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Parses a date or date-time cell; date-only values land at midnight.
///
/// Returns `None` for blank or unrecognised input so that a malformed date
/// behaves like a missing one downstream.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    // Fractional seconds are dropped.
    let value = match value.split_once('.') {
        Some((head, tail)) if tail.chars().all(|c| c.is_ascii_digit()) && head.contains(':') => {
            head
        }
        _ => value,
    };
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap();
        assert_eq!(parse_datetime("2024-03-09 14:05"), Some(expected));
        assert_eq!(parse_datetime("2024-03-09 14:05:00"), Some(expected));
        assert_eq!(parse_datetime("2024-03-09T14:05:00.000"), Some(expected));
        assert_eq!(parse_datetime("03/09/2024 14:05"), Some(expected));
        assert_eq!(
            parse_datetime("2024-03-09").map(|dt| dt.date()),
            NaiveDate::from_ymd_opt(2024, 3, 9)
        );
    }

    #[test]
    fn rejects_blank_and_garbage() {
        assert_eq!(parse_datetime(""), None);
        assert_eq!(parse_datetime("not a date"), None);
        assert_eq!(parse_datetime("2024-13-40"), None);
    }
}
