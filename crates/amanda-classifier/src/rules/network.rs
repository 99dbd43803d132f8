//! Routing and firewall tables

use amanda_domain::traits::{ClassificationRule, RuleMatch};
use amanda_domain::{Descriptor, Domain, ElementKind, Observation};

/// Reads `route` records: `{from_hop, to_hop}`
///
/// Both hops are Agency; the source hop links to the target, so adjacency
/// follows the routing direction.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteRule;

impl ClassificationRule for RouteRule {
    fn name(&self) -> &str {
        "network.route"
    }

    fn domain(&self) -> Domain {
        Domain::Digital
    }

    fn apply(&self, observation: &Observation) -> Vec<RuleMatch> {
        let payload = &observation.payload;
        if payload.kind() != Some("route") {
            return Vec::new();
        }
        let (Some(from), Some(to)) = (payload.get_str("from_hop"), payload.get_str("to_hop")) else {
            return Vec::new();
        };

        let scope = observation.scope_ref();
        let mut matches = vec![RuleMatch {
            kind: ElementKind::Agency,
            scope_ref: scope.clone(),
            specificity: from.len(),
            descriptor: Descriptor::logical(from).linked_to(to),
        }];
        if from != to {
            matches.push(RuleMatch {
                kind: ElementKind::Agency,
                scope_ref: scope,
                specificity: to.len(),
                descriptor: Descriptor::logical(to),
            });
        }
        matches
    }
}

/// Reads `firewall` records: `{hop, action}`
///
/// `deny`/`drop`/`reject` put a Constraint on the hop; `allow`/`accept` an Agency.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirewallRule;

impl ClassificationRule for FirewallRule {
    fn name(&self) -> &str {
        "network.firewall"
    }

    fn domain(&self) -> Domain {
        Domain::Digital
    }

    fn apply(&self, observation: &Observation) -> Vec<RuleMatch> {
        let payload = &observation.payload;
        if payload.kind() != Some("firewall") {
            return Vec::new();
        }
        let (Some(hop), Some(action)) = (payload.get_str("hop"), payload.get_str("action")) else {
            return Vec::new();
        };
        let kind = match action.to_lowercase().as_str() {
            "deny" | "drop" | "reject" => ElementKind::Constraint,
            "allow" | "accept" => ElementKind::Agency,
            _ => return Vec::new(),
        };

        vec![RuleMatch {
            kind,
            scope_ref: observation.scope_ref(),
            specificity: hop.len(),
            descriptor: Descriptor::logical(hop),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amanda_domain::observation::keys;
    use amanda_domain::{AttrValue, Payload, Timestamp};

    fn record(attrs: &[(&str, &str)]) -> Observation {
        let mut payload = Payload::new();
        for (k, v) in attrs {
            payload.insert(*k, AttrValue::Text(v.to_string()));
        }
        Observation::new(Domain::Digital, "flow-1", Timestamp::from_millis(0), payload, "lan-a")
    }

    #[test]
    fn test_route_links_hops() {
        let matches = RouteRule.apply(&record(&[(keys::KIND, "route"), ("from_hop", "gw"), ("to_hop", "core")]));
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].descriptor.links, vec!["core".to_string()]);
        assert!(matches[1].descriptor.links.is_empty());
    }

    #[test]
    fn test_firewall_actions() {
        let deny = FirewallRule.apply(&record(&[(keys::KIND, "firewall"), ("hop", "db"), ("action", "DENY")]));
        assert_eq!(deny[0].kind, ElementKind::Constraint);

        let allow = FirewallRule.apply(&record(&[(keys::KIND, "firewall"), ("hop", "db"), ("action", "accept")]));
        assert_eq!(allow[0].kind, ElementKind::Agency);

        assert!(FirewallRule
            .apply(&record(&[(keys::KIND, "firewall"), ("hop", "db"), ("action", "log")]))
            .is_empty());
    }
}
