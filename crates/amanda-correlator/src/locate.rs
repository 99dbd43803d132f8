//! Point and label location on a structural graph

use amanda_domain::Locator;
use amanda_graph::StructuralGraph;

/// Where an observation landed
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    /// Nearest node, if any could be found
    pub node_ref: Option<String>,

    /// Whether the observation fell inside an allowed node
    pub within_agency_region: bool,
}

impl Location {
    fn nowhere() -> Self {
        Self {
            node_ref: None,
            within_agency_region: false,
        }
    }
}

/// Locate an observation on a graph
///
/// A label names its node directly. A point inside an allowed node's region
/// locates that node; any other point takes the nearest node by region
/// distance (ties broken by key) and is outside the agency region.
pub fn locate(graph: &StructuralGraph, locator: Option<&Locator>) -> Location {
    match locator {
        None => Location::nowhere(),
        Some(Locator::Label(label)) => match graph.node(label) {
            Some(node) => Location {
                node_ref: Some(node.key.clone()),
                within_agency_region: node.tag.is_allowed(),
            },
            None => Location::nowhere(),
        },
        Some(Locator::Point { x, y }) => {
            let inside_allowed = graph.nodes().find(|node| {
                node.tag.is_allowed() && node.region.is_some_and(|r| r.contains(*x, *y))
            });
            if let Some(node) = inside_allowed {
                return Location {
                    node_ref: Some(node.key.clone()),
                    within_agency_region: true,
                };
            }

            // Nodes iterate in key order, so strict < keeps the smallest key on ties
            let mut nearest: Option<(&str, f64)> = None;
            for node in graph.nodes() {
                let Some(region) = node.region else { continue };
                let distance = region.distance_to(*x, *y);
                if nearest.is_none_or(|(_, best)| distance < best) {
                    nearest = Some((node.key.as_str(), distance));
                }
            }

            Location {
                node_ref: nearest.map(|(key, _)| key.to_string()),
                within_agency_region: false,
            }
        }
    }
}
