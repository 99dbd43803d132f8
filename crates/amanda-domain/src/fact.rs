//! Correlated facts - observations joined against a structural graph

use crate::element::ScopeRef;
use crate::observation::{ObservationId, Timestamp};

/// Whether a fact was emitted in timestamp order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactStatus {
    /// Emitted in non-decreasing timestamp order
    OnTime,

    /// Arrived after facts with later timestamps were already emitted
    LateObservation,
}

impl FactStatus {
    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            FactStatus::OnTime => "on_time",
            FactStatus::LateObservation => "late_observation",
        }
    }

    /// Parse a status from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "on_time" => Some(FactStatus::OnTime),
            "late_observation" => Some(FactStatus::LateObservation),
            _ => None,
        }
    }
}

/// One observation located on a scope's structural graph
///
/// Derived and recomputable from the observation and the graph snapshot; not
/// independently authoritative.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelatedFact {
    /// Observation the fact was derived from
    pub observation_id: ObservationId,

    /// Subject of the observation
    pub subject_ref: String,

    /// When the observation was made
    pub timestamp: Timestamp,

    /// Scope the observation was correlated against
    pub scope_ref: ScopeRef,

    /// Nearest graph node, if any node could be located
    pub node_ref: Option<String>,

    /// Whether the subject-facing system reacted
    pub event_observed: bool,

    /// Whether the observation fell inside an allowed node's region
    pub within_agency_region: bool,

    /// Ordering status
    pub status: FactStatus,
}

impl CorrelatedFact {
    /// True if the fact is about the given node
    pub fn is_at(&self, node: &str) -> bool {
        self.node_ref.as_deref() == Some(node)
    }

    /// True if the fact was flagged as a late observation
    pub fn is_late(&self) -> bool {
        self.status == FactStatus::LateObservation
    }
}
