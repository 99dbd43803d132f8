//! Error types for the ingest normalizer

use thiserror::Error;

/// Errors that can occur while normalizing a record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IngestError {
    /// A required field is missing or empty
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// The record names a domain outside digital/physical/constitutional
    #[error("Unknown domain: {0}")]
    UnknownDomain(String),

    /// Record shape is wrong (payload not an object, bad identifier, ...)
    #[error("Invalid record format: {0}")]
    InvalidFormat(String),

    /// Payload exceeds the configured attribute limit
    #[error("Payload too large: {0} attributes (max: {1})")]
    PayloadTooLarge(usize, usize),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for IngestError {
    fn from(e: serde_json::Error) -> Self {
        IngestError::JsonParse(e.to_string())
    }
}
