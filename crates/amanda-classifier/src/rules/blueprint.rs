//! Building blueprints

use amanda_domain::observation::keys;
use amanda_domain::traits::{ClassificationRule, RuleMatch};
use amanda_domain::{Descriptor, Domain, ElementKind, Observation};

/// Reads physical `structure` records
///
/// Doors, rooms and openings can be passed through; walls cannot.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlueprintRule;

impl BlueprintRule {
    fn kind_of(structure: &str) -> Option<ElementKind> {
        match structure.to_lowercase().as_str() {
            "door" | "room" | "opening" | "corridor" => Some(ElementKind::Agency),
            "wall" | "barrier" => Some(ElementKind::Constraint),
            _ => None,
        }
    }
}

impl ClassificationRule for BlueprintRule {
    fn name(&self) -> &str {
        "blueprint.structure"
    }

    fn domain(&self) -> Domain {
        Domain::Physical
    }

    fn apply(&self, observation: &Observation) -> Vec<RuleMatch> {
        let payload = &observation.payload;
        if payload.kind() != Some("structure") {
            return Vec::new();
        }
        let Some(structure) = payload.get_str("structure") else {
            return Vec::new();
        };
        let Some(kind) = Self::kind_of(structure) else {
            return Vec::new();
        };
        let Some(key) = payload.get_str(keys::DESCRIPTOR) else {
            return Vec::new();
        };

        let mut descriptor = match super::region_attr(payload) {
            Some(region) => Descriptor::spatial(key, region),
            None => Descriptor::logical(key),
        };
        for link in super::list_attr(payload, "links") {
            descriptor = descriptor.linked_to(link);
        }

        vec![RuleMatch {
            kind,
            scope_ref: observation.scope_ref(),
            specificity: key.len() + structure.len(),
            descriptor,
        }]
    }
}
