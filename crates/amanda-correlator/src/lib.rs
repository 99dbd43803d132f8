//! Amanda Temporal Correlator
//!
//! Aligns a timestamped observation stream against a scope's structural
//! graph and produces [`CorrelatedFact`]s in non-decreasing timestamp order.
//!
//! # Overview
//!
//! - Observations are located on the graph by label or by point; a point
//!   outside every allowed region is kept with `within_agency_region = false`
//! - A bounded lateness window buffers out-of-order input; anything older than
//!   the last emitted fact is emitted at once as a late observation
//! - Duplicate deliveries (same subject, timestamp and locator) are dropped,
//!   first seen wins
//! - [`Checkpoint`]s let an unbounded correlation restart where it stopped
//! - [`CorrelatorWorker`] runs one scope as a cancellable tokio task
//!
//! [`CorrelatedFact`]: amanda_domain::CorrelatedFact

#![warn(missing_docs)]

mod config;
mod correlator;
mod error;
mod locate;
mod metrics;
mod worker;

pub use config::CorrelatorConfig;
pub use correlator::{correlate, Checkpoint, Correlate, Correlator};
pub use error::CorrelatorError;
pub use locate::{locate, Location};
pub use metrics::CorrelatorMetrics;
pub use worker::{CorrelatorWorker, WorkerExit, WorkerReport};
