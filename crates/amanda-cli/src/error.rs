//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Engine error
    #[error("Engine error: {0}")]
    Engine(#[from] amanda_engine::EngineError),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] amanda_store::StoreError),

    /// Ingest error
    #[error("Ingest error: {0}")]
    Ingest(#[from] amanda_ingest::IngestError),

    /// Query error
    #[error("Query error: {0}")]
    Query(#[from] amanda_query::QueryError),

    /// Classifier error
    #[error("Classifier error: {0}")]
    Classifier(#[from] amanda_classifier::ClassifierError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
