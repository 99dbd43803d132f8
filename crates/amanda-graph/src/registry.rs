//! Per-scope snapshot registry
//!
//! Each scope has one writer at a time. Readers get the latest published
//! `Arc<StructuralGraph>` and are never blocked by a rebuild in progress.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use amanda_domain::{ConstraintElement, ScopeRef};
use tokio::sync::watch;

use crate::builder::GraphBuilder;
use crate::graph::StructuralGraph;
use crate::GraphError;

/// Anything that can hand out the current graph of a scope
pub trait GraphSource {
    /// Latest snapshot for `scope`, if one has been built
    fn graph(&self, scope: &ScopeRef) -> Option<Arc<StructuralGraph>>;
}

impl GraphSource for HashMap<ScopeRef, Arc<StructuralGraph>> {
    fn graph(&self, scope: &ScopeRef) -> Option<Arc<StructuralGraph>> {
        self.get(scope).cloned()
    }
}

struct ScopeSlot {
    writer: Mutex<()>,
    snapshot: watch::Sender<Option<Arc<StructuralGraph>>>,
}

impl ScopeSlot {
    fn new() -> Self {
        let (snapshot, _) = watch::channel(None);
        Self {
            writer: Mutex::new(()),
            snapshot,
        }
    }
}

/// Latest structural graph of every scope
pub struct GraphRegistry {
    builder: GraphBuilder,
    slots: RwLock<HashMap<ScopeRef, Arc<ScopeSlot>>>,
}

impl GraphRegistry {
    /// Create an empty registry
    pub fn new(builder: GraphBuilder) -> Self {
        Self {
            builder,
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Rebuild `scope` from scratch and publish the result
    ///
    /// On error nothing is published and the previous snapshot stays current.
    pub fn build(
        &self,
        scope: &ScopeRef,
        elements: &[ConstraintElement],
    ) -> Result<Arc<StructuralGraph>, GraphError> {
        let slot = self.slot(scope);
        let _writer = slot.writer.lock().unwrap_or_else(|e| e.into_inner());

        let previous_version = slot.snapshot.borrow().as_ref().map(|g| g.version());
        let mut graph = self.builder.build(scope, elements)?;
        if let Some(version) = previous_version {
            graph.version = version + 1;
        }

        let graph = Arc::new(graph);
        slot.snapshot.send_replace(Some(graph.clone()));
        Ok(graph)
    }

    /// Apply new elements to the current snapshot of `scope`, building one if none exists
    pub fn update(
        &self,
        scope: &ScopeRef,
        new_elements: &[ConstraintElement],
    ) -> Result<Arc<StructuralGraph>, GraphError> {
        let slot = self.slot(scope);
        let _writer = slot.writer.lock().unwrap_or_else(|e| e.into_inner());

        let current = slot.snapshot.borrow().clone();
        let graph = match current {
            Some(previous) => self.builder.update(&previous, new_elements)?,
            None => self.builder.build(scope, new_elements)?,
        };

        let graph = Arc::new(graph);
        slot.snapshot.send_replace(Some(graph.clone()));
        Ok(graph)
    }

    /// Latest snapshot for `scope`
    pub fn get(&self, scope: &ScopeRef) -> Option<Arc<StructuralGraph>> {
        let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
        slots.get(scope).and_then(|slot| slot.snapshot.borrow().clone())
    }

    /// Watch for new snapshots of `scope`
    ///
    /// The receiver starts at the current snapshot (or `None`) and sees every
    /// later publication.
    pub fn subscribe(&self, scope: &ScopeRef) -> watch::Receiver<Option<Arc<StructuralGraph>>> {
        self.slot(scope).snapshot.subscribe()
    }

    /// Scopes with a published snapshot, sorted
    pub fn scopes(&self) -> Vec<ScopeRef> {
        let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
        let mut scopes: Vec<ScopeRef> = slots
            .iter()
            .filter(|(_, slot)| slot.snapshot.borrow().is_some())
            .map(|(scope, _)| scope.clone())
            .collect();
        scopes.sort();
        scopes
    }

    /// Forget a scope; existing subscribers see `None`
    pub fn remove(&self, scope: &ScopeRef) -> bool {
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        match slots.remove(scope) {
            Some(slot) => {
                slot.snapshot.send_replace(None);
                tracing::debug!(scope = %scope, "Removed scope graph");
                true
            }
            None => false,
        }
    }

    fn slot(&self, scope: &ScopeRef) -> Arc<ScopeSlot> {
        if let Some(slot) = self.slots.read().unwrap_or_else(|e| e.into_inner()).get(scope) {
            return slot.clone();
        }
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        slots
            .entry(scope.clone())
            .or_insert_with(|| Arc::new(ScopeSlot::new()))
            .clone()
    }
}

impl Default for GraphRegistry {
    fn default() -> Self {
        Self::new(GraphBuilder::default())
    }
}

impl GraphSource for GraphRegistry {
    fn graph(&self, scope: &ScopeRef) -> Option<Arc<StructuralGraph>> {
        self.get(scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amanda_domain::{Descriptor, Domain, ElementKind};

    fn hop(scope: &ScopeRef, key: &str, next: &str) -> ConstraintElement {
        ConstraintElement::new(
            Domain::Digital,
            ElementKind::Agency,
            scope.clone(),
            Descriptor::logical(key).linked_to(next),
            1,
            vec![],
        )
    }

    #[test]
    fn test_update_without_snapshot_builds() {
        let registry = GraphRegistry::default();
        let scope = ScopeRef::from("lan");

        assert!(registry.get(&scope).is_none());
        let graph = registry.update(&scope, &[hop(&scope, "a", "b"), hop(&scope, "b", "a")]).unwrap();
        assert_eq!(graph.version(), 1);
        assert!(registry.get(&scope).unwrap().path_exists("a", "b"));
        assert_eq!(registry.scopes(), vec![scope]);
    }

    #[test]
    fn test_failed_update_keeps_previous_snapshot() {
        let registry = GraphRegistry::default();
        let scope = ScopeRef::from("lan");
        registry.build(&scope, &[hop(&scope, "a", "b"), hop(&scope, "b", "a")]).unwrap();

        let other = ScopeRef::from("wan");
        let result = registry.update(&scope, &[hop(&other, "b", "c")]);
        assert!(matches!(result, Err(GraphError::IncoherentScope { .. })));

        let current = registry.get(&scope).unwrap();
        assert_eq!(current.version(), 1);
        assert!(current.path_exists("b", "a"));
    }

    #[test]
    fn test_readers_keep_old_snapshot() {
        let registry = GraphRegistry::default();
        let scope = ScopeRef::from("lan");
        let before = registry.build(&scope, &[hop(&scope, "a", "b")]).unwrap();

        let after = registry.update(&scope, &[hop(&scope, "b", "a")]).unwrap();
        assert_eq!(after.version(), 2);
        assert!(after.path_exists("a", "b"));
        assert!(!before.path_exists("a", "b"));
    }

    #[test]
    fn test_rebuild_bumps_version() {
        let registry = GraphRegistry::default();
        let scope = ScopeRef::from("lan");
        registry.build(&scope, &[hop(&scope, "a", "b")]).unwrap();
        let rebuilt = registry.build(&scope, &[hop(&scope, "a", "b")]).unwrap();
        assert_eq!(rebuilt.version(), 2);
    }

    #[test]
    fn test_subscriber_sees_publications() {
        let registry = GraphRegistry::default();
        let scope = ScopeRef::from("lan");
        let mut rx = registry.subscribe(&scope);
        assert!(rx.borrow().is_none());

        registry.build(&scope, &[hop(&scope, "a", "b")]).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().as_ref().unwrap().version(), 1);

        assert!(registry.remove(&scope));
        assert!(rx.borrow_and_update().is_none());
        assert!(!registry.remove(&scope));
    }

    #[test]
    fn test_scopes_are_independent() {
        let registry = Arc::new(GraphRegistry::default());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    let scope = ScopeRef::new(format!("scope-{}", i));
                    registry.build(&scope, &[hop(&scope, "a", "b"), hop(&scope, "b", "a")]).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.scopes().len(), 4);
    }
}
