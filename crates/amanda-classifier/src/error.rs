//! Error types for the Classifier

use thiserror::Error;

/// Errors that can occur while setting up a classifier
///
/// Classification itself never fails: unrecognized payloads yield no element
/// and conflicts are recorded, not raised.
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A rule pattern failed to compile
    #[error("Invalid rule pattern: {0}")]
    Pattern(#[from] regex::Error),
}
