//! Amanda Structural Graph Builder
//!
//! Turns the classified elements of one scope into a directed graph of
//! positions and tagged transitions, and keeps one immutable snapshot per
//! scope.
//!
//! # Overview
//!
//! - **Nodes** are the distinct descriptor keys seen for a scope
//! - **Edges** connect descriptors related by a domain-supplied [`Adjacency`]
//! - Every edge is tagged [`Tag::Allowed`] or [`Tag::Blocked`] from the
//!   elements at its endpoints and their priorities
//! - Reachability over allowed edges is cached per node and recomputed
//!   incrementally on update
//!
//! # Examples
//!
//! ```
//! use amanda_domain::{ConstraintElement, Descriptor, Domain, ElementKind, ScopeRef};
//! use amanda_graph::{GraphBuilder, GraphConfig};
//!
//! let scope = ScopeRef::from("lan-a");
//! let hop = |key: &str, next: &str| ConstraintElement::new(
//!     Domain::Digital,
//!     ElementKind::Agency,
//!     scope.clone(),
//!     Descriptor::logical(key).linked_to(next),
//!     1,
//!     vec![],
//! );
//!
//! let builder = GraphBuilder::new(GraphConfig::default());
//! let graph = builder.build(&scope, &[hop("gw", "core"), hop("core", "db")]).unwrap();
//!
//! assert!(graph.path_exists("gw", "core"));
//! assert!(!graph.path_exists("core", "gw"));
//! ```
//!
//! [`Adjacency`]: amanda_domain::traits::Adjacency

#![warn(missing_docs)]

mod adjacency;
mod builder;
mod config;
mod error;
mod graph;
mod registry;

pub use adjacency::{LinkAdjacency, StandardAdjacency};
pub use builder::GraphBuilder;
pub use config::{AdjacencyMode, GraphConfig};
pub use error::GraphError;
pub use graph::{Edge, GraphDelta, Node, StructuralGraph, Tag};
pub use registry::{GraphRegistry, GraphSource};
