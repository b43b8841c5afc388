//! Error types for the matching core.
//!
//! Configuration problems are rejected when a model is built, never at
//! query time. Normalization failures are not errors at all: they degrade
//! to an empty string (see `matching::normalize_field`).

use thiserror::Error;

use crate::models::core::RecordId;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatchError {
    #[error("{operation} requires a group_id column")]
    MissingGroundTruthColumn { operation: &'static str },

    #[error("Record {id} not found in dataset")]
    RecordNotFound { id: RecordId },

    #[error("Unsupported blocking method: {method}")]
    UnsupportedBlockingMethod { method: String },

    #[error("No TF-IDF vectorizer fitted for field '{field}'; call train() first")]
    VectorizerNotFitted { field: String },

    #[error("Invalid field type: {value}")]
    InvalidFieldType { value: String },

    #[error("Invalid comparison method: {value}")]
    InvalidComparisonMethod { value: String },

    #[error("Field '{field}' is not part of the dataset schema")]
    UnknownField { field: String },

    #[error("Duplicate record id: {id}")]
    DuplicateRecordId { id: RecordId },

    #[error("Blocking method {method} needs a threshold of at least 1, got {threshold}")]
    InvalidBlockingThreshold { method: String, threshold: usize },
}

pub type Result<T> = std::result::Result<T, MatchError>;
