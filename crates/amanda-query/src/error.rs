//! Error types for query evaluation

use amanda_domain::{ScopeRef, Timestamp};
use thiserror::Error;

/// Errors surfaced to the caller of a query
///
/// Never replaced by a default answer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// No graph has been built for the scope
    #[error("Unknown scope: {0}")]
    UnknownScope(ScopeRef),

    /// A strict point-in-time query matched several facts for the node
    #[error("Ambiguous time: {matches} facts for node '{node}' at {at}")]
    AmbiguousTime {
        /// Node asked about
        node: String,
        /// Point in time asked about
        at: Timestamp,
        /// Number of matching facts
        matches: usize,
    },

    /// A query description could not be turned into a query
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
