//! Inbound record shapes

use amanda_domain::Observation;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One inbound record as delivered by an external collaborator
///
/// `{domain, subject_ref, timestamp, payload, source_ref}`; `id` is optional
/// and must be a UUID when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    /// Identifier supplied by the source
    #[serde(default)]
    pub id: Option<String>,

    /// `digital`, `physical` or `constitutional`
    pub domain: String,

    /// Who or what the record is about
    pub subject_ref: String,

    /// Milliseconds since the source's epoch
    pub timestamp: u64,

    /// Domain-specific attributes; nested objects are flattened
    #[serde(default)]
    pub payload: Value,

    /// Originating device, capture or document
    #[serde(default)]
    pub source_ref: Option<String>,
}

/// A touch-screen layout description
///
/// Buttons are stacked in a vertically centered column, `spacing_px` apart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchLayout {
    /// Screen width in pixels
    pub screen_width: u32,
    /// Screen height in pixels
    pub screen_height: u32,
    /// Number of buttons in the column
    pub button_count: u32,
    /// Width of each button
    pub button_width: u32,
    /// Height of each button
    pub button_height: u32,
    /// Free space between consecutive buttons
    pub spacing_px: u32,
}

/// One raw touch on a screen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Touch {
    /// Milliseconds since the source's epoch
    pub timestamp: u64,
    /// Horizontal position
    pub x: f64,
    /// Vertical position
    pub y: f64,
    /// Whether the device reacted to the touch
    #[serde(default = "default_event_fired")]
    pub event_fired: bool,
}

fn default_event_fired() -> bool {
    true
}

/// A record that could not be normalized
#[derive(Debug, Clone, PartialEq)]
pub struct IngestFailure {
    /// Position of the record in its batch (or line number for JSON lines)
    pub index: usize,

    /// Why it was rejected
    pub reason: String,
}

/// Result of normalizing a batch
///
/// One malformed record never fails the batch; it lands in `failures`.
#[derive(Debug, Clone, Default)]
pub struct IngestBatch {
    /// Successfully normalized observations, in input order
    pub observations: Vec<Observation>,

    /// Rejected records
    pub failures: Vec<IngestFailure>,
}

impl IngestBatch {
    /// Append another batch, keeping order
    pub fn extend(&mut self, other: IngestBatch) {
        self.observations.extend(other.observations);
        self.failures.extend(other.failures);
    }
}
