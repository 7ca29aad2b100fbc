use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

use trialdash_model::ModelError;

/// Failures at the ingestion boundary.
///
/// Fetch-side variants (`Fetch`, `Status`, `Io`) and parse-side variants are
/// kept apart so that callers can report "unit unreachable" differently from
/// "unit returned garbage".
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("fetch {location}: {reason}")]
    Fetch { location: String, reason: String },
    #[error("fetch {location}: HTTP status {status}")]
    Status { location: String, status: u16 },
    #[error("read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {what}: {reason}")]
    Parse { what: String, reason: String },
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("dataframe: {0}")]
    Polars(#[from] PolarsError),
    #[error("display terms: {0}")]
    Dictionary(String),
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl IngestError {
    /// `true` when the payload never arrived.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            Self::Fetch { .. } | Self::Status { .. } | Self::Io { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
