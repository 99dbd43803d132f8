//! Pre-classified elements supplied by an upstream labeler

use amanda_domain::observation::keys;
use amanda_domain::traits::{ClassificationRule, RuleMatch};
use amanda_domain::{Descriptor, Domain, ElementKind, Observation};

/// Reads `element` records: `{element_kind, descriptor, [x0,y0,x1,y1], [links]}`
#[derive(Debug, Clone)]
pub struct DeclaredElementRule {
    domain: Domain,
    name: String,
}

impl DeclaredElementRule {
    /// Rule for one domain
    pub fn new(domain: Domain) -> Self {
        Self {
            domain,
            name: format!("declared.{}", domain.as_str()),
        }
    }
}

impl ClassificationRule for DeclaredElementRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn domain(&self) -> Domain {
        self.domain
    }

    fn apply(&self, observation: &Observation) -> Vec<RuleMatch> {
        let payload = &observation.payload;
        if payload.kind() != Some("element") {
            return Vec::new();
        }
        let (Some(kind), Some(key)) = (
            payload.get_str("element_kind").and_then(ElementKind::parse),
            payload.get_str(keys::DESCRIPTOR),
        ) else {
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
            specificity: key.len(),
            descriptor,
        }]
    }
}
