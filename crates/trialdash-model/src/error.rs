use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("site range for {site} starts after it ends ({start} > {end})")]
    InvertedRange { site: String, start: i64, end: i64 },
    #[error("invalid start month {month} for site {site}")]
    InvalidMonth { site: String, month: u32 },
    #[error("invalid expected enrollment entry {value:?} for site {site}")]
    InvalidExpected { site: String, value: String },
    #[error("row has {actual} cells but table {table} has {expected} columns")]
    RowWidth {
        table: String,
        expected: usize,
        actual: usize,
    },
    #[error("report window of {days} days before {end} is out of the calendar range")]
    WindowOutOfRange { end: NaiveDate, days: i64 },
    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
