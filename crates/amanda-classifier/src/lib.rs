//! Amanda Constraint Classifier
//!
//! Tags observations as Agency (an available option or pathway) or Constraint
//! (a forbidding or bounding structure) within their domain.
//!
//! # Overview
//!
//! - Rule sets are pluggable per domain through
//!   [`ClassificationRule`](amanda_domain::traits::ClassificationRule)
//! - Built-in rules cover pre-classified elements, touch-screen layouts,
//!   source code, building blueprints, routing/firewall tables and statutes
//! - When readings disagree, the more specific one wins; an equal-specificity
//!   split is recorded as a [`ClassificationConflict`] and tagged Constraint
//! - Unrecognized payloads yield no element and are logged at debug level
//!
//! # Examples
//!
//! ```
//! use amanda_classifier::Classifier;
//! use amanda_domain::observation::keys;
//! use amanda_domain::{AttrValue, Domain, ElementKind, Observation, Payload, Timestamp};
//!
//! let classifier = Classifier::default_config().unwrap();
//!
//! let payload = Payload::new()
//!     .with(keys::KIND, AttrValue::Text("firewall".into()))
//!     .with("hop", AttrValue::Text("db".into()))
//!     .with("action", AttrValue::Text("deny".into()));
//! let obs = Observation::new(Domain::Digital, "flow-1", Timestamp::from_millis(0), payload, "lan-a");
//!
//! let outcome = classifier.classify(&obs);
//! assert_eq!(outcome.elements[0].kind, ElementKind::Constraint);
//! ```

#![warn(missing_docs)]

mod classifier;
mod config;
mod error;
mod profile;
pub mod rules;

pub use amanda_domain::ClassificationConflict;
pub use classifier::{ClassificationOutcome, Classifier};
pub use config::{ClassifierConfig, PrioritySettings, RuleSets};
pub use error::ClassifierError;
pub use profile::{CodeContext, CodeProfile, DOMINANCE_RATIO};
