//! Statutes and regulations

use amanda_domain::traits::{ClassificationRule, RuleMatch};
use amanda_domain::{Descriptor, Domain, ElementKind, Observation};

/// Reads constitutional `statute` records: `{segment, effect, [links]}`
///
/// `permit` opens the segment, `prohibit` closes it. Links name the segments
/// a permitted segment leads to (a road to the next road, a process step to
/// the next step).
#[derive(Debug, Clone, Copy, Default)]
pub struct StatuteRule;

impl ClassificationRule for StatuteRule {
    fn name(&self) -> &str {
        "constitutional.statute"
    }

    fn domain(&self) -> Domain {
        Domain::Constitutional
    }

    fn apply(&self, observation: &Observation) -> Vec<RuleMatch> {
        let payload = &observation.payload;
        if payload.kind() != Some("statute") {
            return Vec::new();
        }
        let (Some(segment), Some(effect)) = (payload.get_str("segment"), payload.get_str("effect")) else {
            return Vec::new();
        };
        let kind = match effect.to_lowercase().as_str() {
            "permit" => ElementKind::Agency,
            "prohibit" => ElementKind::Constraint,
            _ => return Vec::new(),
        };

        let mut descriptor = Descriptor::logical(segment);
        for link in super::list_attr(payload, "links") {
            descriptor = descriptor.linked_to(link);
        }

        vec![RuleMatch {
            kind,
            scope_ref: observation.scope_ref(),
            specificity: segment.len(),
            descriptor,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amanda_domain::observation::keys;
    use amanda_domain::{AttrValue, Payload, Timestamp};

    #[test]
    fn test_prohibit_is_constraint() {
        let payload = Payload::new()
            .with(keys::KIND, AttrValue::Text("statute".into()))
            .with("segment", AttrValue::Text("school_zone".into()))
            .with("effect", AttrValue::Text("prohibit".into()));
        let obs = Observation::new(Domain::Constitutional, "code-1", Timestamp::from_millis(0), payload, "county-9");

        let matches = StatuteRule.apply(&obs);
        assert_eq!(matches[0].kind, ElementKind::Constraint);
        assert_eq!(matches[0].descriptor.key, "school_zone");
    }

    #[test]
    fn test_permit_with_links() {
        let payload = Payload::new()
            .with(keys::KIND, AttrValue::Text("statute".into()))
            .with("segment", AttrValue::Text("main_st".into()))
            .with("effect", AttrValue::Text("Permit".into()))
            .with("links.0", AttrValue::Text("school_zone".into()));
        let obs = Observation::new(Domain::Constitutional, "code-1", Timestamp::from_millis(0), payload, "county-9");

        let matches = StatuteRule.apply(&obs);
        assert_eq!(matches[0].kind, ElementKind::Agency);
        assert_eq!(matches[0].descriptor.links, vec!["school_zone".to_string()]);
    }
}
