//! Full and incremental graph construction

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use amanda_domain::traits::Adjacency;
use amanda_domain::{ConstraintElement, Descriptor, ElementId, ScopeRef};

use crate::adjacency::{LinkAdjacency, StandardAdjacency};
use crate::config::{AdjacencyMode, GraphConfig};
use crate::graph::{GraphDelta, Node, StructuralGraph, Tag};
use crate::GraphError;

/// Builds structural graphs from classified elements
///
/// # Examples
///
/// ```
/// use amanda_domain::{ConstraintElement, Descriptor, Domain, ElementKind, Region, ScopeRef};
/// use amanda_graph::{GraphBuilder, GraphConfig, Tag};
///
/// let scope = ScopeRef::from("hallway");
/// let at = |kind, key: &str, y0: f64| ConstraintElement::new(
///     Domain::Physical,
///     kind,
///     scope.clone(),
///     Descriptor::spatial(key, Region::new(0.0, y0, 1.0, y0 + 1.0)),
///     1,
///     vec![],
/// );
///
/// let builder = GraphBuilder::new(GraphConfig::default());
/// let graph = builder
///     .build(&scope, &[
///         at(ElementKind::Agency, "room", 0.0),
///         at(ElementKind::Constraint, "wall", 1.0),
///     ])
///     .unwrap();
///
/// assert_eq!(graph.edge("room", "wall"), Some(Tag::Blocked));
/// assert!(graph.is_terminal("room"));
/// ```
#[derive(Clone)]
pub struct GraphBuilder {
    adjacency: Arc<dyn Adjacency>,
}

impl GraphBuilder {
    /// Create a builder using the adjacency function named by the configuration
    pub fn new(config: GraphConfig) -> Self {
        let adjacency: Arc<dyn Adjacency> = match config.adjacency {
            AdjacencyMode::Standard => Arc::new(StandardAdjacency::new(config.region_tolerance)),
            AdjacencyMode::LinksOnly => Arc::new(LinkAdjacency),
        };
        Self { adjacency }
    }

    /// Create a builder with a domain-supplied adjacency function
    pub fn with_adjacency(adjacency: Arc<dyn Adjacency>) -> Self {
        Self { adjacency }
    }

    /// Build a graph for `scope` from scratch
    ///
    /// # Errors
    ///
    /// [`GraphError::IncoherentScope`] if any element names a different scope.
    pub fn build(
        &self,
        scope: &ScopeRef,
        elements: &[ConstraintElement],
    ) -> Result<StructuralGraph, GraphError> {
        check_coherence(scope, elements)?;

        let merged = merge_elements(BTreeMap::new(), elements);
        let nodes = derive_nodes(&merged, None);

        let mut edges = BTreeMap::new();
        for from in nodes.values() {
            for to in nodes.values() {
                if let Some(tag) = self.tag_pair(from, to, &merged) {
                    edges.insert((from.key.clone(), to.key.clone()), tag);
                }
            }
        }

        let mut graph = StructuralGraph {
            scope: scope.clone(),
            version: 1,
            elements: merged,
            nodes,
            edges,
            reachable: BTreeMap::new(),
            delta: GraphDelta::default(),
        };

        let keys: Vec<String> = graph.nodes.keys().cloned().collect();
        for key in keys {
            let reach = graph.search_forward(&key);
            graph.reachable.insert(key, reach);
        }

        tracing::info!(
            scope = %scope,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Built structural graph"
        );

        Ok(graph)
    }

    /// Apply new elements on top of a previous snapshot
    ///
    /// Only nodes touched by the new elements get their edges re-tagged, and
    /// only nodes whose reachability can depend on a changed edge are
    /// recomputed; the rest of the reachability cache carries over.
    ///
    /// # Errors
    ///
    /// [`GraphError::IncoherentScope`] if any element names a different scope.
    /// The previous snapshot is left untouched.
    pub fn update(
        &self,
        previous: &StructuralGraph,
        new_elements: &[ConstraintElement],
    ) -> Result<StructuralGraph, GraphError> {
        let scope = previous.scope.clone();
        check_coherence(&scope, new_elements)?;

        let merged = merge_elements(previous.elements.clone(), new_elements);
        let touched: BTreeSet<String> = new_elements.iter().map(|e| e.key().to_string()).collect();
        let added: BTreeSet<String> = touched
            .iter()
            .filter(|key| !previous.nodes.contains_key(*key))
            .cloned()
            .collect();

        let mut nodes = previous.nodes.clone();
        for (key, node) in derive_nodes(&merged, Some(&touched)) {
            nodes.insert(key, node);
        }

        let mut edges = previous.edges.clone();
        edges.retain(|(from, to), _| !touched.contains(from) && !touched.contains(to));
        for key in &touched {
            let Some(changed) = nodes.get(key) else { continue };
            for other in nodes.values() {
                if let Some(tag) = self.tag_pair(changed, other, &merged) {
                    edges.insert((changed.key.clone(), other.key.clone()), tag);
                }
                if other.key != changed.key {
                    if let Some(tag) = self.tag_pair(other, changed, &merged) {
                        edges.insert((other.key.clone(), changed.key.clone()), tag);
                    }
                }
            }
        }

        // Sources of edges whose allowed status differs between the snapshots
        let mut changed_sources = BTreeSet::new();
        let mut changed_edges = 0;
        let pairs: BTreeSet<&(String, String)> = previous.edges.keys().chain(edges.keys()).collect();
        for pair in pairs {
            let before = previous.edges.get(pair).map(Tag::is_allowed).unwrap_or(false);
            let after = edges.get(pair).map(Tag::is_allowed).unwrap_or(false);
            let existed = previous.edges.contains_key(pair) == edges.contains_key(pair);
            if before != after || !existed {
                changed_edges += 1;
            }
            if before != after {
                changed_sources.insert(pair.0.clone());
            }
        }

        let mut graph = StructuralGraph {
            scope: scope.clone(),
            version: previous.version + 1,
            elements: merged,
            nodes,
            edges,
            reachable: previous.reachable.clone(),
            delta: GraphDelta::default(),
        };

        let mut recompute = previous.search_backward(&changed_sources);
        recompute.extend(graph.search_backward(&changed_sources));
        recompute.extend(added);
        recompute.retain(|key| graph.nodes.contains_key(key));

        for key in &recompute {
            let reach = graph.search_forward(key);
            graph.reachable.insert(key.clone(), reach);
        }

        graph.delta = GraphDelta {
            changed_edges,
            recomputed: recompute,
        };

        tracing::info!(
            scope = %scope,
            version = graph.version,
            changed_edges,
            recomputed = graph.delta.recomputed.len(),
            "Updated structural graph"
        );

        Ok(graph)
    }

    /// Tag the transition from `from` to `to`, or `None` if they are not adjacent
    fn tag_pair(
        &self,
        from: &Node,
        to: &Node,
        elements: &BTreeMap<ElementId, ConstraintElement>,
    ) -> Option<Tag> {
        if from.key == to.key {
            return None;
        }
        let from_descriptor = node_descriptor(from);
        let to_descriptor = node_descriptor(to);
        if !self.adjacency.adjacent(&from_descriptor, &to_descriptor) {
            return None;
        }
        let evidence = from
            .elements
            .iter()
            .chain(to.elements.iter())
            .filter_map(|id| elements.get(id));
        Some(Tag::from_evidence(evidence))
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new(GraphConfig::default())
    }
}

fn check_coherence(scope: &ScopeRef, elements: &[ConstraintElement]) -> Result<(), GraphError> {
    if let Some(stray) = elements.iter().find(|e| &e.scope_ref != scope) {
        tracing::warn!(
            scope = %scope,
            descriptor = stray.key(),
            claimed_by = %stray.scope_ref,
            "Incoherent scope; graph not built"
        );
        return Err(GraphError::IncoherentScope {
            scope: scope.clone(),
            descriptor: stray.key().to_string(),
            claimed_by: stray.scope_ref.clone(),
        });
    }
    Ok(())
}

fn merge_elements(
    mut merged: BTreeMap<ElementId, ConstraintElement>,
    elements: &[ConstraintElement],
) -> BTreeMap<ElementId, ConstraintElement> {
    for element in elements {
        match merged.get_mut(&element.id) {
            Some(existing) => existing.corroborate(element),
            None => {
                merged.insert(element.id, element.clone());
            }
        }
    }
    merged
}

/// Group elements by descriptor key; restricted to `only` when given
fn derive_nodes(
    elements: &BTreeMap<ElementId, ConstraintElement>,
    only: Option<&BTreeSet<String>>,
) -> BTreeMap<String, Node> {
    let mut grouped: BTreeMap<String, (Descriptor, Vec<&ConstraintElement>)> = BTreeMap::new();
    for element in elements.values() {
        if only.is_some_and(|keys| !keys.contains(element.key())) {
            continue;
        }
        match grouped.get_mut(element.key()) {
            Some((descriptor, members)) => {
                descriptor.merge(&element.descriptor);
                members.push(element);
            }
            None => {
                let mut descriptor = element.descriptor.clone();
                descriptor.links.sort();
                descriptor.links.dedup();
                grouped.insert(element.key().to_string(), (descriptor, vec![element]));
            }
        }
    }

    grouped
        .into_iter()
        .map(|(key, (descriptor, members))| {
            let node = Node {
                key: key.clone(),
                region: descriptor.region,
                links: descriptor.links,
                tag: Tag::from_evidence(members.iter().copied()),
                elements: members.iter().map(|e| e.id).collect(),
            };
            (key, node)
        })
        .collect()
}

fn node_descriptor(node: &Node) -> Descriptor {
    Descriptor {
        key: node.key.clone(),
        region: node.region,
        links: node.links.clone(),
    }
}
