//! Constraint elements - classified structure within a scope

use std::fmt;

use crate::descriptor::Descriptor;
use crate::domain::Domain;
use crate::observation::ObservationId;

/// UUIDv5 namespace for element identifiers
const ELEMENT_NAMESPACE: uuid::Uuid = uuid::Uuid::from_u128(0x6a1d_2c4e_8f0b_4d7a_9c13_52e8_b07f_a3e1);

/// Identifier of one bounded instance (a device, a network segment, a property, a jurisdiction)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeRef(String);

impl ScopeRef {
    /// Create a scope reference
    pub fn new(scope: impl Into<String>) -> Self {
        Self(scope.into())
    }

    /// Get the scope name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScopeRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ScopeRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Whether an element opens or closes a pathway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    /// An option or permitted pathway available to a subject
    Agency,

    /// A structure that forbids or bounds movement or action
    Constraint,
}

impl ElementKind {
    /// Get the kind name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Agency => "agency",
            ElementKind::Constraint => "constraint",
        }
    }

    /// Parse a kind from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "agency" => Some(ElementKind::Agency),
            "constraint" => Some(ElementKind::Constraint),
            _ => None,
        }
    }
}

/// Deterministic identifier of a constraint element
///
/// Derived from scope, domain, kind and descriptor key so that observations
/// corroborating the same structure produce the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(u128);

impl ElementId {
    /// Derive the id for an element
    pub fn derive(scope: &ScopeRef, domain: Domain, kind: ElementKind, key: &str) -> Self {
        let name = format!("{}\u{1f}{}\u{1f}{}\u{1f}{}", scope, domain.as_str(), kind.as_str(), key);
        Self(uuid::Uuid::new_v5(&ELEMENT_NAMESPACE, name.as_bytes()).as_u128())
    }

    /// Create an ElementId from a raw u128 value
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// A classified structural element
///
/// Several observations may corroborate one element; their ids accumulate in
/// `sources`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintElement {
    /// Deterministic identifier
    pub id: ElementId,

    /// Domain the element was classified in
    pub domain: Domain,

    /// Agency or Constraint
    pub kind: ElementKind,

    /// The instance the element belongs to
    pub scope_ref: ScopeRef,

    /// Position the element describes
    pub descriptor: Descriptor,

    /// Priority tagged from the domain priority table
    pub priority: u8,

    /// Observations that produced or corroborated this element
    pub sources: Vec<ObservationId>,
}

impl ConstraintElement {
    /// Create an element, deriving its id
    pub fn new(
        domain: Domain,
        kind: ElementKind,
        scope_ref: ScopeRef,
        descriptor: Descriptor,
        priority: u8,
        sources: Vec<ObservationId>,
    ) -> Self {
        let id = ElementId::derive(&scope_ref, domain, kind, &descriptor.key);
        Self {
            id,
            domain,
            kind,
            scope_ref,
            descriptor,
            priority,
            sources,
        }
    }

    /// Node key of the descriptor
    pub fn key(&self) -> &str {
        &self.descriptor.key
    }

    /// True for Agency elements
    pub fn is_agency(&self) -> bool {
        self.kind == ElementKind::Agency
    }

    /// Fold a corroborating element (same id) into this one
    pub fn corroborate(&mut self, other: &ConstraintElement) {
        self.descriptor.merge(&other.descriptor);
        for source in &other.sources {
            if !self.sources.contains(source) {
                self.sources.push(*source);
            }
        }
        self.sources.sort();
    }
}
