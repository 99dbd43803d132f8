//! Graph builder error types

use amanda_domain::ScopeRef;
use thiserror::Error;

/// Errors that can occur while building or updating a structural graph
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    /// An element claims a descriptor for a different scope than the one being built
    ///
    /// Blocks this scope's graph until the caller resolves the conflict; other
    /// scopes are unaffected.
    #[error("Incoherent scope {scope}: descriptor '{descriptor}' is claimed by scope {claimed_by}")]
    IncoherentScope {
        /// Scope being built
        scope: ScopeRef,
        /// Descriptor key in dispute
        descriptor: String,
        /// Scope the offending element names
        claimed_by: ScopeRef,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
