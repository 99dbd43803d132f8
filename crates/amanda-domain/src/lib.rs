//! Amanda Domain Layer
//!
//! This crate contains the core data model of the constraint contextualization
//! engine. It depends only on `uuid` and defines the value objects and trait
//! interfaces that every other crate in the workspace builds upon.
//!
//! ## Key Concepts
//!
//! - **Observation**: an immutable, timestamped record from an external source
//! - **Domain**: digital, physical or constitutional, with an explicit priority table
//! - **ConstraintElement**: a classified piece of structure, either Agency or Constraint
//! - **Scope**: one bounded instance (a device, a network segment, a property, a jurisdiction)
//! - **ClassificationConflict**: an equal-specificity split between two rules, always recorded
//! - **CorrelatedFact**: the join of one observation against a scope's structural graph
//! - **Query / Answer**: declarative questions over facts and graphs
//!
//! ## Architecture
//!
//! - No infrastructure concerns (storage, transport, logging) live here
//! - Trait definitions for the pluggable seams (rules, adjacency, persistence)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod conflict;
pub mod descriptor;
pub mod domain;
pub mod element;
pub mod fact;
pub mod observation;
pub mod query;
pub mod traits;

// Re-exports for convenience
pub use conflict::ClassificationConflict;
pub use descriptor::{Descriptor, Locator, Region};
pub use domain::{Domain, PriorityTable};
pub use element::{ConstraintElement, ElementId, ElementKind, ScopeRef};
pub use fact::{CorrelatedFact, FactStatus};
pub use observation::{AttrValue, Observation, ObservationId, Payload, Timestamp};
pub use query::{
    Answer, AnswerValue, ApproachPrediction, InteractionSummary, Predicate, Query, SpeedZoneCheck, TimeRange,
    TimeResolution,
};
