//! Trait definitions for the pluggable seams
//!
//! Rule sets and adjacency functions are supplied per domain; persistence is
//! implemented by the infrastructure layer (amanda-store).

use crate::{
    Answer, ConstraintElement, CorrelatedFact, Descriptor, Domain, ElementKind, Observation, ScopeRef,
};

/// One structural reading produced by a classification rule
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    /// Agency or Constraint
    pub kind: ElementKind,

    /// Scope the element belongs to
    pub scope_ref: ScopeRef,

    /// Position the element describes
    pub descriptor: Descriptor,

    /// Length of the matched descriptor text; longer matches are more specific
    pub specificity: usize,
}

/// A domain-specific classification rule
///
/// Implemented by the application layer (amanda-classifier). Rules must be
/// pure functions of the observation.
pub trait ClassificationRule: Send + Sync {
    /// Rule name, used in conflict records and logs
    fn name(&self) -> &str;

    /// Domain whose observations this rule reads
    fn domain(&self) -> Domain;

    /// Map an observation to zero or more structural readings
    fn apply(&self, observation: &Observation) -> Vec<RuleMatch>;
}

/// Domain-supplied adjacency between two descriptors of the same scope
///
/// Directed: `adjacent(a, b)` says whether a transition from `a` to `b` is
/// structurally possible, before any tagging.
pub trait Adjacency: Send + Sync {
    /// Whether `to` is adjacent to `from`
    fn adjacent(&self, from: &Descriptor, to: &Descriptor) -> bool;
}

/// Trait for persisting classified elements
///
/// Implemented by the infrastructure layer (amanda-store)
pub trait ElementStore {
    /// Error type for store operations
    type Error;

    /// Insert elements, corroborating any that already exist
    fn put_elements(&mut self, elements: &[ConstraintElement]) -> Result<usize, Self::Error>;

    /// All elements recorded for a scope
    fn elements_for_scope(&self, scope: &ScopeRef) -> Result<Vec<ConstraintElement>, Self::Error>;

    /// Every scope with at least one element
    fn scopes(&self) -> Result<Vec<ScopeRef>, Self::Error>;
}

/// Trait for the read-only export of facts and answers
///
/// Implemented by the infrastructure layer (amanda-store)
pub trait FactSink {
    /// Error type for sink operations
    type Error;

    /// Append correlated facts
    fn record_facts(&mut self, facts: &[CorrelatedFact]) -> Result<usize, Self::Error>;

    /// Append an answer
    fn record_answer(&mut self, answer: &Answer) -> Result<(), Self::Error>;
}
