//! Observation module - the immutable input record of the engine

use std::collections::BTreeMap;
use std::fmt;

use crate::descriptor::Locator;
use crate::domain::Domain;
use crate::element::ScopeRef;

/// Well-known payload attribute names shared by the normalizer, the rule sets
/// and the correlator.
pub mod keys {
    /// Record kind within a domain (`layout`, `touch`, `route`, `statute`, ...)
    pub const KIND: &str = "kind";
    /// Logical position label
    pub const DESCRIPTOR: &str = "descriptor";
    /// Horizontal coordinate of a spatial position
    pub const X: &str = "x";
    /// Vertical coordinate of a spatial position
    pub const Y: &str = "y";
    /// Whether the subject-facing system reacted to the observation
    pub const EVENT_FIRED: &str = "event_fired";
    /// Scope override carried inside a payload
    pub const SCOPE: &str = "scope";
}

/// Unique identifier for an observation based on UUIDv7
///
/// UUIDv7 keeps identifiers chronologically sortable, which matches the
/// arrival order of an ingest batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObservationId(u128);

impl ObservationId {
    /// Generate a new UUIDv7-based ObservationId
    ///
    /// # Examples
    ///
    /// ```
    /// use amanda_domain::ObservationId;
    ///
    /// let id = ObservationId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create an ObservationId from a raw u128 value
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse an ObservationId from its UUID string form
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid observation id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for ObservationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// Milliseconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Latest timestamp accepted from outside sources
    ///
    /// Keeps every accepted timestamp representable as a signed 64-bit
    /// integer, the width persistence layers store.
    pub const MAX_ACCEPTED: u64 = i64::MAX as u64;

    /// Create a timestamp from milliseconds since the Unix epoch
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Milliseconds since the Unix epoch
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Subtract a duration in milliseconds, clamping at zero
    pub fn saturating_sub(&self, ms: u64) -> Self {
        Self(self.0.saturating_sub(ms))
    }

    /// Add a duration in milliseconds, clamping at `u64::MAX`
    pub fn saturating_add(&self, ms: u64) -> Self {
        Self(self.0.saturating_add(ms))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// A single domain-specific attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Boolean flag
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Free text
    Text(String),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(b) => write!(f, "{}", b),
            AttrValue::Int(i) => write!(f, "{}", i),
            AttrValue::Float(v) => write!(f, "{}", v),
            AttrValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Domain-specific attributes of an observation
///
/// Keys are flat; nested source structures are flattened with dotted paths
/// (`button_dimensions.0`) by the ingest normalizer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Payload {
    attrs: BTreeMap<String, AttrValue>,
}

impl Payload {
    /// Create an empty payload
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: AttrValue) -> Self {
        self.attrs.insert(key.into(), value);
        self
    }

    /// Insert or replace an attribute
    pub fn insert(&mut self, key: impl Into<String>, value: AttrValue) {
        self.attrs.insert(key.into(), value);
    }

    /// Raw attribute lookup
    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    /// Text attribute lookup
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.attrs.get(key) {
            Some(AttrValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Integer attribute lookup; floats with no fractional part are accepted
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.attrs.get(key) {
            Some(AttrValue::Int(i)) => Some(*i),
            Some(AttrValue::Float(v)) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    /// Numeric attribute lookup; integers are widened
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        match self.attrs.get(key) {
            Some(AttrValue::Float(v)) => Some(*v),
            Some(AttrValue::Int(i)) => Some(*i as f64),
            _ => None,
        }
    }

    /// Boolean attribute lookup
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.attrs.get(key) {
            Some(AttrValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// The record kind, if present
    pub fn kind(&self) -> Option<&str> {
        self.get_str(keys::KIND)
    }

    /// Where in a scope this payload points, if anywhere
    ///
    /// A `descriptor` label takes precedence over `x`/`y` coordinates.
    pub fn locator(&self) -> Option<Locator> {
        if let Some(label) = self.get_str(keys::DESCRIPTOR) {
            return Some(Locator::Label(label.to_string()));
        }
        match (self.get_f64(keys::X), self.get_f64(keys::Y)) {
            (Some(x), Some(y)) => Some(Locator::Point { x, y }),
            _ => None,
        }
    }

    /// Iterate over attributes in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttrValue)> {
        self.attrs.iter()
    }

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    /// True if the payload carries no attributes
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}

/// An observation - one timestamped record from an external source
///
/// Observations are immutable once created; the ingest normalizer is the only
/// producer.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Unique identifier
    pub id: ObservationId,

    /// Constraint domain the record belongs to
    pub domain: Domain,

    /// Who or what the observation is about (a user, a vehicle, a packet flow)
    pub subject_ref: String,

    /// When the observation was made
    pub timestamp: Timestamp,

    /// Domain-specific attributes
    pub payload: Payload,

    /// Where the record came from (device id, capture file, document)
    pub source_ref: String,
}

impl Observation {
    /// Create a new observation with a fresh identifier
    pub fn new(
        domain: Domain,
        subject_ref: impl Into<String>,
        timestamp: Timestamp,
        payload: Payload,
        source_ref: impl Into<String>,
    ) -> Self {
        Self {
            id: ObservationId::new(),
            domain,
            subject_ref: subject_ref.into(),
            timestamp,
            payload,
            source_ref: source_ref.into(),
        }
    }

    /// Replace the identifier (used when the source supplies its own)
    pub fn with_id(mut self, id: ObservationId) -> Self {
        self.id = id;
        self
    }

    /// Scope the observation belongs to
    ///
    /// An explicit `scope` attribute wins; otherwise the source is the scope.
    pub fn scope_ref(&self) -> ScopeRef {
        match self.payload.get_str(keys::SCOPE) {
            Some(scope) => ScopeRef::new(scope),
            None => ScopeRef::new(self.source_ref.clone()),
        }
    }

    /// Key used to detect duplicate deliveries: subject, timestamp and locator
    pub fn dedup_key(&self) -> (String, Timestamp, String) {
        let locator = match self.payload.locator() {
            Some(l) => l.to_string(),
            None => String::new(),
        };
        (self.subject_ref.clone(), self.timestamp, locator)
    }
}
