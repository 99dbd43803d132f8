//! Error types for the Temporal Correlator

use amanda_domain::ScopeRef;
use thiserror::Error;

/// Errors that can occur during correlation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CorrelatorError {
    /// A checkpoint was taken for a different scope
    #[error("Checkpoint scope mismatch: expected {expected}, got {actual}")]
    ScopeMismatch {
        /// Scope of the correlator
        expected: ScopeRef,
        /// Scope named by the checkpoint
        actual: ScopeRef,
    },

    /// The fact consumer went away
    #[error("Output channel closed")]
    ChannelClosed,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Worker error (tokio runtime issues)
    #[error("Worker error: {0}")]
    Worker(String),
}
