//! Amanda Observation Ingest Normalizer
//!
//! Converts heterogeneous external records (UI events, routing tables, source
//! code, statutes, sensor samples) into uniform [`Observation`] records.
//!
//! # Overview
//!
//! - [`Normalizer`] accepts the generic inbound shape
//!   `{domain, subject_ref, timestamp, payload, source_ref}` as JSON lines or
//!   a JSON array, flattening nested payloads into dotted attribute paths
//! - [`adapters`] turn specific collaborator outputs (touch-screen layouts,
//!   raw touches, source files) into observations directly
//!
//! Normalization is a pure transformation with no state. A malformed record is
//! reported in [`IngestBatch::failures`] and never fails the batch.
//!
//! # Example Usage
//!
//! ```
//! use amanda_ingest::Normalizer;
//!
//! let text = r#"{"domain":"digital","subject_ref":"user-1","timestamp":1200,"payload":{"x":10,"y":20},"source_ref":"kiosk-7"}"#;
//! let batch = Normalizer::default().parse_json_lines(text);
//!
//! assert_eq!(batch.observations.len(), 1);
//! assert!(batch.failures.is_empty());
//! ```
//!
//! [`Observation`]: amanda_domain::Observation

#![warn(missing_docs)]

pub mod adapters;
mod config;
mod error;
mod normalizer;
mod types;

pub use adapters::{layout_observation, source_line_observations, touch_observations};
pub use config::IngestConfig;
pub use error::IngestError;
pub use normalizer::{flatten_payload, Normalizer};
pub use types::{IngestBatch, IngestFailure, RawRecord, Touch, TouchLayout};
