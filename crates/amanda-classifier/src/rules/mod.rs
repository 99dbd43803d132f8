//! Built-in classification rule sets
//!
//! Each rule reads one record `kind` in one domain. Rules are pure functions
//! of the observation and can be registered alongside user-supplied
//! [`ClassificationRule`] implementations.
//!
//! [`ClassificationRule`]: amanda_domain::traits::ClassificationRule

mod blueprint;
mod code;
mod declared;
mod layout;
mod network;
mod statute;

pub use blueprint::BlueprintRule;
pub use code::{code_patterns, CodePattern};
pub use declared::DeclaredElementRule;
pub use layout::{TouchLayoutRule, DEFAULT_MAX_LAYOUT_BUTTONS};
pub use network::{FirewallRule, RouteRule};
pub use statute::StatuteRule;

use amanda_domain::{Payload, Region};

/// Read a list attribute: comma-separated text, or indexed `key.0`, `key.1`, ...
pub(crate) fn list_attr(payload: &Payload, key: &str) -> Vec<String> {
    if let Some(text) = payload.get_str(key) {
        return text
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect();
    }
    let mut items = Vec::new();
    while let Some(item) = payload.get_str(&format!("{}.{}", key, items.len())) {
        items.push(item.to_string());
    }
    items
}

/// Read an `x0`/`y0`/`x1`/`y1` rectangle, if all four corners are present
pub(crate) fn region_attr(payload: &Payload) -> Option<Region> {
    Some(Region::new(
        payload.get_f64("x0")?,
        payload.get_f64("y0")?,
        payload.get_f64("x1")?,
        payload.get_f64("y1")?,
    ))
}
