//! Amanda Query Evaluator
//!
//! Answers declarative questions about one scope by combining graph
//! reachability with correlated facts.
//!
//! # Predicates
//!
//! - **state_at**: was the subject at node N inside the agency region at T
//! - **event_at**: did an event-observed fact exist for node N at T
//! - **path_exists**: is there an allowed-edge path from A to B
//! - **region_violation**: was any fact outside the agency region in a range
//! - **interaction_summary**: valid, silent and out-of-region counts in a range
//! - **approach**: is a moving subject about to reach a node's region
//! - **speed_zone**: must a vehicle be warned before a speed-limited zone
//!
//! # Examples
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! use amanda_domain::{Query, ScopeRef};
//! use amanda_graph::GraphBuilder;
//! use amanda_query::{evaluate, FactLog, QueryError};
//!
//! let scope = ScopeRef::from("lan-a");
//! let graph = GraphBuilder::default().build(&scope, &[]).unwrap();
//! let graphs = HashMap::from([(scope.clone(), Arc::new(graph))]);
//!
//! let unknown = Query::path_exists("q1", ScopeRef::from("lan-b"), "gw", "db");
//! assert!(matches!(
//!     evaluate(&unknown, &FactLog::new(), &graphs),
//!     Err(QueryError::UnknownScope(_))
//! ));
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod evaluator;
mod facts;
pub mod kinematics;
mod records;

pub use config::{QueryConfig, ResolutionMode};
pub use error::QueryError;
pub use evaluator::{evaluate, summarize, QueryEvaluator};
pub use facts::FactLog;
pub use records::{parse_queries, PredicateRecord, QueryRecord};
