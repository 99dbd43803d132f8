//! Structural graph snapshot

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use amanda_domain::{ConstraintElement, ElementId, Region, ScopeRef};

/// The single tag every node and edge carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Supported by Agency and not overridden by any Constraint
    Allowed,

    /// No supporting Agency, or overridden by a Constraint of equal or higher priority
    Blocked,
}

impl Tag {
    /// Tag a body of evidence
    ///
    /// Allowed iff at least one Agency element is present and no Constraint
    /// element has priority greater than or equal to the strongest Agency.
    pub fn from_evidence<'a, I>(evidence: I) -> Tag
    where
        I: IntoIterator<Item = &'a ConstraintElement>,
    {
        let mut strongest_agency: Option<u8> = None;
        let mut strongest_constraint: Option<u8> = None;

        for element in evidence {
            let slot = if element.is_agency() {
                &mut strongest_agency
            } else {
                &mut strongest_constraint
            };
            *slot = Some(slot.map_or(element.priority, |p| p.max(element.priority)));
        }

        match (strongest_agency, strongest_constraint) {
            (Some(agency), Some(constraint)) if constraint >= agency => Tag::Blocked,
            (Some(_), _) => Tag::Allowed,
            (None, _) => Tag::Blocked,
        }
    }

    /// True for [`Tag::Allowed`]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Tag::Allowed)
    }

    /// Get the tag name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Allowed => "allowed",
            Tag::Blocked => "blocked",
        }
    }
}

/// A discrete position within a scope
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Descriptor key
    pub key: String,

    /// Union of the regions of every element at this key
    pub region: Option<Region>,

    /// Union of the links of every element at this key
    pub links: Vec<String>,

    /// Whether the position itself is part of the agency region
    pub tag: Tag,

    /// Elements located at this key
    pub elements: Vec<ElementId>,
}

/// A tagged transition between two nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// Source node key
    pub from: String,
    /// Target node key
    pub to: String,
    /// Allowed or blocked
    pub tag: Tag,
}

/// What the last incremental update touched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphDelta {
    /// Edges whose allowed status changed, appeared or vanished
    pub changed_edges: usize,

    /// Nodes whose reachability was recomputed
    pub recomputed: BTreeSet<String>,
}

/// Immutable directed graph of one scope
///
/// Snapshots are exchanged by `Arc`; an update produces a new snapshot and
/// never mutates one that readers may hold.
#[derive(Debug, Clone)]
pub struct StructuralGraph {
    pub(crate) scope: ScopeRef,
    pub(crate) version: u64,
    pub(crate) elements: BTreeMap<ElementId, ConstraintElement>,
    pub(crate) nodes: BTreeMap<String, Node>,
    pub(crate) edges: BTreeMap<(String, String), Tag>,
    pub(crate) reachable: BTreeMap<String, BTreeSet<String>>,
    pub(crate) delta: GraphDelta,
}

impl StructuralGraph {
    /// Scope this graph describes
    pub fn scope(&self) -> &ScopeRef {
        &self.scope
    }

    /// Monotonic snapshot version; 1 for a fresh build
    pub fn version(&self) -> u64 {
        self.version
    }

    /// What the update that produced this snapshot touched
    pub fn last_delta(&self) -> &GraphDelta {
        &self.delta
    }

    /// Look up a node
    pub fn node(&self, key: &str) -> Option<&Node> {
        self.nodes.get(key)
    }

    /// Iterate over nodes in key order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Tag of the edge from `from` to `to`, if the edge exists
    pub fn edge(&self, from: &str, to: &str) -> Option<Tag> {
        self.edges.get(&(from.to_string(), to.to_string())).copied()
    }

    /// Iterate over edges in (from, to) order
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.edges.iter().map(|((from, to), tag)| Edge {
            from: from.clone(),
            to: to.clone(),
            tag: *tag,
        })
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Elements the graph was built from, corroborations merged
    pub fn elements(&self) -> impl Iterator<Item = &ConstraintElement> {
        self.elements.values()
    }

    /// Keys one allowed edge away from `key`
    pub fn outgoing_allowed(&self, key: &str) -> impl Iterator<Item = &str> {
        let owned = key.to_string();
        let start = (owned.clone(), String::new());
        self.edges
            .range(start..)
            .take_while(move |((from, _), _)| *from == owned)
            .filter(|(_, tag)| tag.is_allowed())
            .map(|((_, to), _)| to.as_str())
    }

    /// A node with no outgoing allowed edge is terminal
    pub fn is_terminal(&self, key: &str) -> bool {
        self.nodes.contains_key(key) && self.outgoing_allowed(key).next().is_none()
    }

    /// Whether an allowed-edge path leads from `from` to `to`
    ///
    /// Unknown or disconnected nodes answer `false`. A node reaches itself.
    pub fn path_exists(&self, from: &str, to: &str) -> bool {
        if !self.nodes.contains_key(to) {
            return false;
        }
        if from == to {
            return self.nodes.contains_key(from);
        }
        self.reachable
            .get(from)
            .map(|set| set.contains(to))
            .unwrap_or(false)
    }

    /// Cached reachability set of a node (excluding the node itself)
    pub fn reachable_from(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.reachable.get(key)
    }

    /// Forward breadth-first search over allowed edges
    pub(crate) fn search_forward(&self, start: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(start.to_string());

        while let Some(current) = queue.pop_front() {
            for next in self.outgoing_allowed(&current) {
                if next != start && seen.insert(next.to_string()) {
                    queue.push_back(next.to_string());
                }
            }
        }

        seen
    }

    /// Every node that reaches one of `targets` over allowed edges, targets included
    pub(crate) fn search_backward(&self, targets: &BTreeSet<String>) -> BTreeSet<String> {
        let mut incoming: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for ((from, to), tag) in &self.edges {
            if tag.is_allowed() {
                incoming.entry(to.as_str()).or_default().push(from.as_str());
            }
        }

        let mut seen: BTreeSet<String> = targets.clone();
        let mut queue: VecDeque<String> = targets.iter().cloned().collect();

        while let Some(current) = queue.pop_front() {
            if let Some(sources) = incoming.get(current.as_str()) {
                for source in sources {
                    if seen.insert(source.to_string()) {
                        queue.push_back(source.to_string());
                    }
                }
            }
        }

        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amanda_domain::{Descriptor, Domain, ElementKind};

    fn element(kind: ElementKind, domain: Domain, priority: u8) -> ConstraintElement {
        ConstraintElement::new(domain, kind, ScopeRef::from("s"), Descriptor::logical("k"), priority, vec![])
    }

    #[test]
    fn test_tag_requires_agency() {
        assert_eq!(Tag::from_evidence(std::iter::empty()), Tag::Blocked);
        let constraint = element(ElementKind::Constraint, Domain::Digital, 1);
        assert_eq!(Tag::from_evidence([&constraint]), Tag::Blocked);
    }

    #[test]
    fn test_tag_equal_priority_constraint_blocks() {
        let agency = element(ElementKind::Agency, Domain::Digital, 1);
        let constraint = element(ElementKind::Constraint, Domain::Physical, 1);
        assert_eq!(Tag::from_evidence([&agency]), Tag::Allowed);
        assert_eq!(Tag::from_evidence([&agency, &constraint]), Tag::Blocked);
    }

    #[test]
    fn test_tag_lower_priority_constraint_does_not_block() {
        let agency = element(ElementKind::Agency, Domain::Constitutional, 2);
        let constraint = element(ElementKind::Constraint, Domain::Digital, 1);
        assert_eq!(Tag::from_evidence([&agency, &constraint]), Tag::Allowed);
    }
}
