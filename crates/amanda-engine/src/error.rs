//! Engine error types

use amanda_classifier::ClassifierError;
use amanda_correlator::CorrelatorError;
use amanda_graph::GraphError;
use amanda_ingest::IngestError;
use amanda_query::QueryError;
use thiserror::Error;

/// Errors that can occur while configuring or driving the engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Failed to read a config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A configuration section failed validation
    #[error("Invalid [{section}] configuration: {message}")]
    Config {
        /// Section name
        section: &'static str,
        /// Validation message
        message: String,
    },

    /// Ingest error
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// Classifier error
    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    /// Graph error
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Correlator error
    #[error(transparent)]
    Correlator(#[from] CorrelatorError),

    /// Query error
    #[error(transparent)]
    Query(#[from] QueryError),

    /// A correlation task panicked or was aborted
    #[error("Worker error: {0}")]
    Worker(String),
}
