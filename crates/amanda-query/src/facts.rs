//! Timestamp-ordered fact view per scope

use std::collections::HashMap;

use amanda_domain::{CorrelatedFact, ScopeRef, TimeRange};

/// Correlated facts grouped by scope, each group kept in timestamp order
///
/// Late facts are slotted into place; facts with equal timestamps keep their
/// arrival order.
#[derive(Debug, Clone, Default)]
pub struct FactLog {
    scopes: HashMap<ScopeRef, Vec<CorrelatedFact>>,
}

impl FactLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one fact
    pub fn insert(&mut self, fact: CorrelatedFact) {
        let facts = self.scopes.entry(fact.scope_ref.clone()).or_default();
        let at = facts.partition_point(|existing| existing.timestamp <= fact.timestamp);
        facts.insert(at, fact);
    }

    /// Add facts in bulk
    pub fn extend<I>(&mut self, facts: I)
    where
        I: IntoIterator<Item = CorrelatedFact>,
    {
        for fact in facts {
            self.insert(fact);
        }
    }

    /// All facts for a scope, in timestamp order
    pub fn facts(&self, scope: &ScopeRef) -> &[CorrelatedFact] {
        self.scopes.get(scope).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Facts for a scope whose timestamp lies in `range`
    pub fn range(&self, scope: &ScopeRef, range: TimeRange) -> &[CorrelatedFact] {
        let facts = self.facts(scope);
        let start = facts.partition_point(|f| f.timestamp < range.start);
        let end = facts.partition_point(|f| f.timestamp <= range.end);
        &facts[start..end.max(start)]
    }

    /// Every fact across scopes, ordered by timestamp then scope
    pub fn all(&self) -> Vec<&CorrelatedFact> {
        let mut all: Vec<_> = self.scopes.values().flatten().collect();
        all.sort_by(|a, b| (a.timestamp, &a.scope_ref).cmp(&(b.timestamp, &b.scope_ref)));
        all
    }

    /// Total number of facts
    pub fn len(&self) -> usize {
        self.scopes.values().map(Vec::len).sum()
    }

    /// Check if the log holds no facts
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<CorrelatedFact> for FactLog {
    fn from_iter<I: IntoIterator<Item = CorrelatedFact>>(iter: I) -> Self {
        let mut log = Self::new();
        log.extend(iter);
        log
    }
}
