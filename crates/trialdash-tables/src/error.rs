use thiserror::Error;

use trialdash_model::ModelError;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("display dictionary has no terms for {field}")]
    MissingTerms { field: String },
    #[error("no site activation schedule is configured")]
    NoActivation,
    #[error(transparent)]
    Model(#[from] ModelError),
}

pub type Result<T> = std::result::Result<T, TableError>;
