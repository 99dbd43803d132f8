//! Amanda Engine
//!
//! Wires the pipeline together: raw records are normalized into observations,
//! classified into constraint elements, folded into one structural graph per
//! scope, and correlated into facts that queries are evaluated against.
//!
//! # Architecture
//!
//! ```text
//! RawRecord ─► Normalizer ─► Classifier ─► GraphRegistry ─┐
//!                   │                                      ▼
//!                   └──────────────► CorrelatorWorker (per scope) ─► FactLog ─► QueryEvaluator
//! ```
//!
//! - Scopes are independent: graph failures and correlation failures are
//!   reported per scope and never stall the others
//! - Graph snapshots are immutable and shared by reference; a query reads
//!   the snapshot it started with
//! - Correlation runs one tokio task per scope and honours a shared
//!   cancellation token
//!
//! # Examples
//!
//! ```
//! use amanda_engine::{Engine, EngineConfig};
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let mut engine = Engine::new(EngineConfig::default()).unwrap();
//! let report = runtime.block_on(engine.run(Vec::new())).unwrap();
//! assert_eq!(report.observations, 0);
//! ```

#![warn(missing_docs)]

mod config;
mod engine;
mod error;

pub use config::EngineConfig;
pub use engine::{BuildReport, CorrelationReport, Engine, RunReport};
pub use error::EngineError;
