//! Classification conflicts

use crate::element::ScopeRef;
use crate::observation::ObservationId;

/// Two rules read the same position with opposite kinds and equal specificity
///
/// Recorded, never raised; the element is tagged Constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationConflict {
    /// Observation both rules matched
    pub observation_id: ObservationId,

    /// Scope of the disputed position
    pub scope_ref: ScopeRef,

    /// Descriptor key of the disputed position
    pub descriptor: String,

    /// Strongest rule reading Agency
    pub agency_rule: String,

    /// Strongest rule reading Constraint
    pub constraint_rule: String,

    /// Specificity both rules matched with
    pub specificity: usize,
}
