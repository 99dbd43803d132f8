//! Lateness-window correlation of observations against a structural graph

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap, HashSet, VecDeque};

use amanda_domain::observation::keys;
use amanda_domain::{CorrelatedFact, FactStatus, Observation, ScopeRef, Timestamp};
use amanda_graph::StructuralGraph;
use tracing::{debug, warn};

use crate::config::CorrelatorConfig;
use crate::error::CorrelatorError;
use crate::locate::locate;
use crate::metrics::CorrelatorMetrics;

/// Where a correlation can be restarted from
///
/// Resuming skips observations strictly earlier than `resume_at`. Facts at
/// exactly `resume_at` may be emitted twice across a restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    /// Scope the checkpoint belongs to
    pub scope: ScopeRef,

    /// First timestamp not yet known to be emitted
    pub resume_at: Timestamp,
}

/// A buffered observation, ordered by timestamp then arrival
#[derive(Debug)]
struct Pending {
    timestamp: Timestamp,
    seq: u64,
    observation: Observation,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.timestamp, self.seq).cmp(&(other.timestamp, other.seq))
    }
}

/// Correlator for one scope
///
/// Owns the lateness buffer for its scope. Observations are pushed one at a
/// time together with the graph snapshot to locate them on; facts come back
/// in non-decreasing timestamp order except for those flagged
/// [`FactStatus::LateObservation`].
#[derive(Debug)]
pub struct Correlator {
    scope: ScopeRef,
    config: CorrelatorConfig,
    buffer: BinaryHeap<Reverse<Pending>>,
    seq: u64,
    floor: Option<Timestamp>,
    max_seen: Option<Timestamp>,
    seen: BTreeMap<Timestamp, HashSet<(String, String)>>,
    resume_at: Option<Timestamp>,
    metrics: CorrelatorMetrics,
}

impl Correlator {
    /// Create a correlator for a scope
    pub fn new(scope: ScopeRef, config: CorrelatorConfig) -> Self {
        Self {
            scope,
            config,
            buffer: BinaryHeap::new(),
            seq: 0,
            floor: None,
            max_seen: None,
            seen: BTreeMap::new(),
            resume_at: None,
            metrics: CorrelatorMetrics::new(),
        }
    }

    /// Restart a correlation from a checkpoint
    pub fn resume(scope: ScopeRef, checkpoint: &Checkpoint, config: CorrelatorConfig) -> Result<Self, CorrelatorError> {
        if checkpoint.scope != scope {
            return Err(CorrelatorError::ScopeMismatch {
                expected: scope,
                actual: checkpoint.scope.clone(),
            });
        }
        let mut correlator = Self::new(scope, config);
        correlator.resume_at = Some(checkpoint.resume_at);
        Ok(correlator)
    }

    /// Scope this correlator serves
    pub fn scope(&self) -> &ScopeRef {
        &self.scope
    }

    /// Configuration in use
    pub fn config(&self) -> &CorrelatorConfig {
        &self.config
    }

    /// Counters so far
    pub fn metrics(&self) -> &CorrelatorMetrics {
        &self.metrics
    }

    /// Number of buffered, not yet emitted observations
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Timestamp of the last on-time fact emitted
    pub fn floor(&self) -> Option<Timestamp> {
        self.floor
    }

    /// Offer one observation; returns the facts it released
    pub fn push(&mut self, graph: &StructuralGraph, observation: Observation) -> Vec<CorrelatedFact> {
        self.metrics.received += 1;

        let scope = observation.scope_ref();
        if scope != self.scope {
            self.metrics.foreign_scope += 1;
            debug!(expected = %self.scope, actual = %scope, "Skipping observation for another scope");
            return Vec::new();
        }

        let timestamp = observation.timestamp;
        if self.resume_at.is_some_and(|resume_at| timestamp < resume_at) {
            self.metrics.skipped_before_checkpoint += 1;
            return Vec::new();
        }

        let (subject, _, locator) = observation.dedup_key();
        if !self.seen.entry(timestamp).or_default().insert((subject, locator)) {
            self.metrics.duplicates += 1;
            debug!(id = %observation.id, %timestamp, "Dropping duplicate observation");
            return Vec::new();
        }

        let mut released = Vec::new();
        match self.floor {
            Some(floor) if timestamp < floor => {
                warn!(
                    scope = %self.scope,
                    id = %observation.id,
                    %timestamp,
                    %floor,
                    "Observation arrived after its lateness window"
                );
                released.push(self.fact(graph, &observation, FactStatus::LateObservation));
            }
            _ => {
                self.max_seen = Some(self.max_seen.map_or(timestamp, |max| max.max(timestamp)));
                self.seq += 1;
                self.buffer.push(Reverse(Pending {
                    timestamp,
                    seq: self.seq,
                    observation,
                }));
                self.release(graph, &mut released);
            }
        }

        self.prune_seen();
        released
    }

    /// Emit everything still buffered, in order
    ///
    /// Used at the end of a finite input.
    pub fn flush(&mut self, graph: &StructuralGraph) -> Vec<CorrelatedFact> {
        let mut released = Vec::with_capacity(self.buffer.len());
        while let Some(Reverse(pending)) = self.buffer.pop() {
            self.floor = Some(pending.timestamp);
            released.push(self.fact(graph, &pending.observation, FactStatus::OnTime));
        }
        released
    }

    /// Drop everything still buffered without emitting it
    ///
    /// Returns the number of observations dropped.
    pub fn discard(&mut self) -> usize {
        let dropped = self.buffer.len();
        self.buffer.clear();
        self.metrics.dropped_on_cancel += dropped;
        dropped
    }

    /// Point to restart from without losing buffered observations
    pub fn checkpoint(&self) -> Checkpoint {
        let resume_at = self
            .buffer
            .peek()
            .map(|Reverse(pending)| pending.timestamp)
            .or(self.floor)
            .or(self.resume_at)
            .unwrap_or_default();
        Checkpoint {
            scope: self.scope.clone(),
            resume_at,
        }
    }

    /// Turn this correlator into a lazy fact iterator over `observations`
    pub fn stream<I>(self, graph: &StructuralGraph, observations: I) -> Correlate<'_, I::IntoIter>
    where
        I: IntoIterator<Item = Observation>,
    {
        Correlate {
            correlator: self,
            graph,
            input: observations.into_iter(),
            ready: VecDeque::new(),
            finished: false,
        }
    }

    fn release(&mut self, graph: &StructuralGraph, out: &mut Vec<CorrelatedFact>) {
        let Some(max_seen) = self.max_seen else { return };
        let watermark = max_seen.saturating_sub(self.config.lateness_ms);
        while self
            .buffer
            .peek()
            .is_some_and(|Reverse(pending)| pending.timestamp <= watermark)
        {
            let Some(Reverse(pending)) = self.buffer.pop() else { break };
            self.floor = Some(pending.timestamp);
            out.push(self.fact(graph, &pending.observation, FactStatus::OnTime));
        }
    }

    fn prune_seen(&mut self) {
        let Some(max_seen) = self.max_seen else { return };
        let horizon = max_seen.saturating_sub(self.config.dedup_horizon_ms);
        if self.seen.first_key_value().is_some_and(|(oldest, _)| *oldest < horizon) {
            self.seen = self.seen.split_off(&horizon);
        }
    }

    fn fact(&mut self, graph: &StructuralGraph, observation: &Observation, status: FactStatus) -> CorrelatedFact {
        let location = locate(graph, observation.payload.locator().as_ref());
        let event_observed = observation.payload.get_bool(keys::EVENT_FIRED).unwrap_or(true);

        match status {
            FactStatus::OnTime => self.metrics.emitted += 1,
            FactStatus::LateObservation => self.metrics.late += 1,
        }
        if !location.within_agency_region {
            self.metrics.outside_region += 1;
        }

        CorrelatedFact {
            observation_id: observation.id,
            subject_ref: observation.subject_ref.clone(),
            timestamp: observation.timestamp,
            scope_ref: self.scope.clone(),
            node_ref: location.node_ref,
            event_observed,
            within_agency_region: location.within_agency_region,
            status,
        }
    }
}

/// Lazy, timestamp-ordered fact sequence over an observation iterator
///
/// Finite when the input is finite: the buffer is flushed once the input is
/// exhausted.
#[derive(Debug)]
pub struct Correlate<'g, I> {
    correlator: Correlator,
    graph: &'g StructuralGraph,
    input: I,
    ready: VecDeque<CorrelatedFact>,
    finished: bool,
}

impl<I> Correlate<'_, I> {
    /// Checkpoint of the underlying correlator
    pub fn checkpoint(&self) -> Checkpoint {
        self.correlator.checkpoint()
    }

    /// Counters of the underlying correlator
    pub fn metrics(&self) -> &CorrelatorMetrics {
        self.correlator.metrics()
    }

    /// Stop early, returning the correlator with its buffer intact
    pub fn into_correlator(self) -> Correlator {
        self.correlator
    }
}

impl<I> Iterator for Correlate<'_, I>
where
    I: Iterator<Item = Observation>,
{
    type Item = CorrelatedFact;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(fact) = self.ready.pop_front() {
                return Some(fact);
            }
            if self.finished {
                return None;
            }
            match self.input.next() {
                Some(observation) => {
                    let released = self.correlator.push(self.graph, observation);
                    self.ready.extend(released);
                }
                None => {
                    let released = self.correlator.flush(self.graph);
                    self.ready.extend(released);
                    self.finished = true;
                }
            }
        }
    }
}

/// Correlate an observation sequence against one scope's graph
///
/// # Examples
///
/// ```
/// use amanda_correlator::{correlate, CorrelatorConfig};
/// use amanda_domain::observation::keys;
/// use amanda_domain::{AttrValue, Domain, Observation, Payload, ScopeRef, Timestamp};
/// use amanda_graph::GraphBuilder;
///
/// let scope = ScopeRef::from("kiosk");
/// let graph = GraphBuilder::default().build(&scope, &[]).unwrap();
/// let touch = |ms| {
///     let payload = Payload::new()
///         .with(keys::X, AttrValue::Float(1.0))
///         .with(keys::Y, AttrValue::Float(2.0));
///     Observation::new(Domain::Digital, "user", Timestamp::from_millis(ms), payload, "kiosk")
/// };
///
/// let facts: Vec<_> = correlate(scope, &graph, vec![touch(20), touch(10)], CorrelatorConfig::default())
///     .collect();
/// assert_eq!(facts[0].timestamp, Timestamp::from_millis(10));
/// assert!(!facts[1].within_agency_region);
/// ```
pub fn correlate<I>(
    scope: ScopeRef,
    graph: &StructuralGraph,
    observations: I,
    config: CorrelatorConfig,
) -> Correlate<'_, I::IntoIter>
where
    I: IntoIterator<Item = Observation>,
{
    Correlator::new(scope, config).stream(graph, observations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use amanda_domain::{
        AttrValue, ConstraintElement, Descriptor, Domain, ElementKind, Payload, Region,
    };
    use amanda_graph::GraphBuilder;

    fn scope() -> ScopeRef {
        ScopeRef::from("kiosk-7")
    }

    fn graph() -> StructuralGraph {
        let element = |kind, key: &str, y0: f64, y1: f64| {
            ConstraintElement::new(
                Domain::Digital,
                kind,
                scope(),
                Descriptor::spatial(key, Region::new(0.0, y0, 100.0, y1)),
                1,
                vec![],
            )
        };
        GraphBuilder::default()
            .build(
                &scope(),
                &[
                    element(ElementKind::Agency, "button_1", 0.0, 50.0),
                    element(ElementKind::Constraint, "gap_1", 50.0, 60.0),
                    element(ElementKind::Agency, "button_2", 60.0, 110.0),
                ],
            )
            .unwrap()
    }

    fn touch(ms: u64, x: f64, y: f64) -> Observation {
        let payload = Payload::new()
            .with(keys::X, AttrValue::Float(x))
            .with(keys::Y, AttrValue::Float(y));
        Observation::new(Domain::Digital, "user-1", Timestamp::from_millis(ms), payload, "kiosk-7")
    }

    fn config(lateness_ms: u64) -> CorrelatorConfig {
        CorrelatorConfig {
            lateness_ms,
            dedup_horizon_ms: 10_000,
            channel_capacity: 8,
        }
    }

    fn millis(facts: &[CorrelatedFact]) -> Vec<u64> {
        facts.iter().map(|f| f.timestamp.as_millis()).collect()
    }

    #[test]
    fn test_reorders_within_window() {
        let g = graph();
        let mut correlator = Correlator::new(scope(), config(100));

        assert!(correlator.push(&g, touch(50, 10.0, 10.0)).is_empty());
        assert!(correlator.push(&g, touch(20, 10.0, 10.0)).is_empty());
        assert_eq!(correlator.pending(), 2);

        let released = correlator.push(&g, touch(160, 10.0, 10.0));
        assert_eq!(millis(&released), vec![20, 50]);
        assert!(released.iter().all(|f| f.status == FactStatus::OnTime));

        assert_eq!(millis(&correlator.flush(&g)), vec![160]);
        assert_eq!(correlator.floor(), Some(Timestamp::from_millis(160)));
    }

    #[test]
    fn test_observation_below_floor_is_late() {
        let g = graph();
        let mut correlator = Correlator::new(scope(), config(0));

        correlator.push(&g, touch(100, 10.0, 10.0));
        let late = correlator.push(&g, touch(40, 10.0, 10.0));

        assert_eq!(late.len(), 1);
        assert!(late[0].is_late());
        assert_eq!(correlator.metrics().late, 1);
    }

    #[test]
    fn test_duplicates_first_seen_wins() {
        let g = graph();
        let mut correlator = Correlator::new(scope(), config(0));

        let first = touch(10, 10.0, 10.0);
        let first_id = first.id;
        let facts = correlator.push(&g, first);
        assert!(correlator.push(&g, touch(10, 10.0, 10.0)).is_empty());

        assert_eq!(facts[0].observation_id, first_id);
        assert_eq!(correlator.metrics().duplicates, 1);
    }

    #[test]
    fn test_touch_outside_buttons_is_kept() {
        let g = graph();
        let facts: Vec<_> = correlate(scope(), &g, vec![touch(5, 10.0, 55.0), touch(6, 10.0, 80.0)], config(0)).collect();

        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].node_ref.as_deref(), Some("gap_1"));
        assert!(!facts[0].within_agency_region);
        assert!(facts[0].event_observed);
        assert_eq!(facts[1].node_ref.as_deref(), Some("button_2"));
        assert!(facts[1].within_agency_region);
    }

    #[test]
    fn test_event_fired_flag() {
        let g = graph();
        let mut silent = touch(5, 10.0, 10.0);
        silent.payload.insert(keys::EVENT_FIRED, AttrValue::Bool(false));

        let facts: Vec<_> = correlate(scope(), &g, vec![silent], config(0)).collect();
        assert!(!facts[0].event_observed);
        assert!(facts[0].within_agency_region);
    }

    #[test]
    fn test_foreign_scope_skipped() {
        let g = graph();
        let stray = Observation::new(Domain::Digital, "u", Timestamp::from_millis(1), Payload::new(), "kiosk-8");

        let mut stream = correlate(scope(), &g, vec![stray], config(0));
        assert!(stream.next().is_none());
        assert_eq!(stream.metrics().foreign_scope, 1);
    }

    #[test]
    fn test_checkpoint_resume() {
        let g = graph();
        let mut correlator = Correlator::new(scope(), config(100));
        for ms in [10, 20, 200] {
            correlator.push(&g, touch(ms, 10.0, 10.0));
        }

        // 10 and 20 released, 200 still buffered
        let checkpoint = correlator.checkpoint();
        assert_eq!(checkpoint.resume_at, Timestamp::from_millis(200));

        let resumed = Correlator::resume(scope(), &checkpoint, config(100)).unwrap();
        let replay = vec![touch(10, 10.0, 10.0), touch(20, 10.0, 10.0), touch(200, 10.0, 10.0)];
        let mut stream = resumed.stream(&g, replay);
        let facts: Vec<_> = stream.by_ref().collect();

        assert_eq!(millis(&facts), vec![200]);
        assert_eq!(stream.metrics().skipped_before_checkpoint, 2);
    }

    #[test]
    fn test_resume_rejects_other_scope() {
        let checkpoint = Checkpoint {
            scope: ScopeRef::from("elsewhere"),
            resume_at: Timestamp::from_millis(0),
        };
        let err = Correlator::resume(scope(), &checkpoint, config(0)).unwrap_err();
        assert!(matches!(err, CorrelatorError::ScopeMismatch { .. }));
    }

    #[test]
    fn test_discard_drops_buffer() {
        let g = graph();
        let mut correlator = Correlator::new(scope(), config(1_000));
        correlator.push(&g, touch(1, 10.0, 10.0));
        correlator.push(&g, touch(2, 10.0, 10.0));

        assert_eq!(correlator.discard(), 2);
        assert!(correlator.flush(&g).is_empty());
        assert_eq!(correlator.metrics().dropped_on_cancel, 2);
    }

    #[test]
    fn test_empty_checkpoint_starts_at_zero() {
        let correlator = Correlator::new(scope(), config(0));
        assert_eq!(correlator.checkpoint().resume_at, Timestamp::from_millis(0));
    }
}
