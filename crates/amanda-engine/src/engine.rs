//! Pipeline facade: ingest, classify, build, correlate, evaluate

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use amanda_classifier::Classifier;
use amanda_correlator::{Checkpoint, Correlator, CorrelatorWorker, WorkerReport};
use amanda_domain::{
    Answer, ClassificationConflict, ConstraintElement, CorrelatedFact, Observation, Query, ScopeRef, Timestamp,
};
use amanda_graph::{GraphBuilder, GraphError, GraphRegistry, StructuralGraph};
use amanda_ingest::{IngestFailure, Normalizer, RawRecord};
use amanda_query::{FactLog, QueryError, QueryEvaluator};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::EngineError;

/// Outcome of applying classified elements to the scope graphs
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Scopes whose graph was built or updated, with the new version
    pub built: BTreeMap<ScopeRef, u64>,

    /// Scopes left on their previous snapshot, with the reason
    pub failed: BTreeMap<ScopeRef, GraphError>,
}

/// Outcome of one correlation pass
#[derive(Debug, Clone, Default)]
pub struct CorrelationReport {
    /// Final report of each scope's worker; counters accumulate across runs
    pub scopes: BTreeMap<ScopeRef, WorkerReport>,

    /// Scopes whose worker failed, with the reason
    pub failed: BTreeMap<ScopeRef, String>,

    /// Observations for scopes that have no graph
    pub unknown_scope: usize,

    /// Facts added to the fact log
    pub facts: usize,
}

impl CorrelationReport {
    /// True if any worker was cancelled
    pub fn cancelled(&self) -> bool {
        self.scopes.values().any(|r| r.cancelled)
    }
}

/// Outcome of a full pipeline run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Observations accepted
    pub observations: usize,

    /// Records rejected by the normalizer
    pub ingest_failures: Vec<IngestFailure>,

    /// Observations that produced structure
    pub structural: usize,

    /// Elements classified
    pub elements: usize,

    /// Classification conflicts found in this run
    pub conflicts: Vec<ClassificationConflict>,

    /// Graph build results
    pub build: BuildReport,

    /// Correlation results
    pub correlation: CorrelationReport,
}

/// The constraint contextualization engine
///
/// Holds one graph snapshot and one correlator per scope, and the facts
/// correlated so far. A scope's correlator lives as long as the engine, so
/// its lateness floor and dedup set carry from one run to the next.
/// Scopes are processed independently: a failing scope never stalls the
/// others.
pub struct Engine {
    config: EngineConfig,
    normalizer: Normalizer,
    classifier: Classifier,
    registry: Arc<GraphRegistry>,
    evaluator: QueryEvaluator,
    facts: FactLog,
    conflicts: Vec<ClassificationConflict>,
    correlators: HashMap<ScopeRef, Correlator>,
    checkpoints: HashMap<ScopeRef, Checkpoint>,
    cancel: CancellationToken,
}

impl Engine {
    /// Create an engine from a validated configuration
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let classifier = Classifier::new(&config.classifier)?;
        Ok(Self::with_classifier(config, classifier))
    }

    /// Create an engine with a custom classifier (extra rules registered)
    pub fn with_classifier(config: EngineConfig, classifier: Classifier) -> Self {
        Self {
            normalizer: Normalizer::new(config.ingest.clone()),
            registry: Arc::new(GraphRegistry::new(GraphBuilder::new(config.graph.clone()))),
            evaluator: QueryEvaluator::new(config.query.clone()),
            classifier,
            facts: FactLog::new(),
            conflicts: Vec::new(),
            correlators: HashMap::new(),
            checkpoints: HashMap::new(),
            cancel: CancellationToken::new(),
            config,
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The normalizer used for raw records
    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// The classifier in use
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Graph snapshots per scope
    pub fn registry(&self) -> &Arc<GraphRegistry> {
        &self.registry
    }

    /// Latest graph snapshot of a scope
    pub fn graph(&self, scope: &ScopeRef) -> Option<Arc<StructuralGraph>> {
        self.registry.get(scope)
    }

    /// Facts correlated so far
    pub fn facts(&self) -> &FactLog {
        &self.facts
    }

    /// Every classification conflict recorded so far
    pub fn conflicts(&self) -> &[ClassificationConflict] {
        &self.conflicts
    }

    /// Token that cancels the next or in-flight correlation pass
    ///
    /// A triggered token is spent by the pass it cancels; later passes run
    /// under a fresh token, so take a new one with this method before each.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Checkpoint left by the last correlation of a scope
    pub fn checkpoint(&self, scope: &ScopeRef) -> Option<&Checkpoint> {
        self.checkpoints.get(scope)
    }

    /// Resume correlation of a scope from a stored position
    ///
    /// For restarts: the scope's live correlator, if any, is replaced by one
    /// that skips everything before `resume_at`.
    pub fn set_checkpoint(&mut self, scope: ScopeRef, resume_at: Timestamp) {
        self.correlators.remove(&scope);
        self.checkpoints
            .insert(scope.clone(), Checkpoint { scope, resume_at });
    }

    /// Load previously correlated facts, e.g. from a store after restart
    pub fn import_facts<I>(&mut self, facts: I) -> usize
    where
        I: IntoIterator<Item = CorrelatedFact>,
    {
        let before = self.facts.len();
        self.facts.extend(facts);
        self.facts.len() - before
    }

    /// Normalize, classify, build and correlate raw records
    pub async fn run_records(&mut self, records: &[RawRecord]) -> Result<RunReport, EngineError> {
        let batch = self.normalizer.normalize_batch(records);
        let mut report = self.run(batch.observations).await?;
        report.ingest_failures = batch.failures;
        Ok(report)
    }

    /// Classify, build and correlate observations
    ///
    /// Observations that classify into elements describe structure; the rest
    /// are events and are correlated against the updated graphs.
    pub async fn run(&mut self, observations: Vec<Observation>) -> Result<RunReport, EngineError> {
        let total = observations.len();
        let mut by_scope: BTreeMap<ScopeRef, Vec<ConstraintElement>> = BTreeMap::new();
        let mut events = Vec::new();
        let mut conflicts = Vec::new();

        for observation in observations {
            let outcome = self.classifier.classify(&observation);
            conflicts.extend(outcome.conflicts);
            if outcome.elements.is_empty() {
                events.push(observation);
            } else {
                // Filed under the observation's own scope; an element naming
                // another scope makes this one incoherent
                by_scope
                    .entry(observation.scope_ref())
                    .or_default()
                    .extend(outcome.elements);
            }
        }
        self.conflicts.extend(conflicts.iter().cloned());

        let structural = total - events.len();
        let element_count = by_scope.values().map(Vec::len).sum();
        let build = self.apply_scoped(by_scope);
        let correlation = self.correlate(events).await?;

        info!(
            observations = total,
            structural,
            elements = element_count,
            conflicts = conflicts.len(),
            scopes = build.built.len(),
            facts = correlation.facts,
            "Pipeline run complete"
        );

        Ok(RunReport {
            observations: total,
            ingest_failures: Vec::new(),
            structural,
            elements: element_count,
            conflicts,
            build,
            correlation,
        })
    }

    /// Fold elements into their scopes' graphs
    ///
    /// Elements are grouped by the scope they name. Each scope is updated on
    /// its own; an incoherent scope keeps its previous snapshot and does not
    /// affect the others.
    pub fn apply_elements(&self, elements: &[ConstraintElement]) -> BuildReport {
        let mut by_scope: BTreeMap<ScopeRef, Vec<ConstraintElement>> = BTreeMap::new();
        for element in elements {
            by_scope
                .entry(element.scope_ref.clone())
                .or_default()
                .push(element.clone());
        }
        self.apply_scoped(by_scope)
    }

    /// Fold pre-grouped elements into the graph of the scope they are filed under
    ///
    /// An element whose own scope differs from the one it is filed under
    /// fails that scope with `GraphError::IncoherentScope`.
    pub fn apply_scoped(&self, by_scope: BTreeMap<ScopeRef, Vec<ConstraintElement>>) -> BuildReport {
        let mut report = BuildReport::default();
        for (scope, elements) in by_scope {
            match self.registry.update(&scope, &elements) {
                Ok(graph) => {
                    report.built.insert(scope, graph.version());
                }
                Err(e) => {
                    warn!(scope = %scope, error = %e, "Scope graph left unchanged");
                    report.failed.insert(scope, e);
                }
            }
        }
        report
    }

    /// Rebuild one scope from scratch with the given elements
    pub fn build_scope(&self, scope: &ScopeRef, elements: &[ConstraintElement]) -> Result<Arc<StructuralGraph>, EngineError> {
        Ok(self.registry.build(scope, elements)?)
    }

    /// Correlate event observations, one concurrent worker per scope
    ///
    /// Facts are appended to the fact log. Observations for scopes without a
    /// graph are counted and skipped. Each scope's correlator is handed to
    /// its worker and taken back afterwards; a cancelled pass drops what the
    /// correlator still buffered and spends the cancel token.
    pub async fn correlate(&mut self, observations: Vec<Observation>) -> Result<CorrelationReport, EngineError> {
        let mut by_scope: BTreeMap<ScopeRef, Vec<Observation>> = BTreeMap::new();
        for observation in observations {
            by_scope.entry(observation.scope_ref()).or_default().push(observation);
        }

        let cancel = self.cancel.clone();
        let mut report = CorrelationReport::default();
        let mut running = Vec::new();

        for (scope, batch) in by_scope {
            if self.registry.get(&scope).is_none() {
                warn!(scope = %scope, count = batch.len(), "No graph for scope, skipping observations");
                report.unknown_scope += batch.len();
                continue;
            }

            let correlator = self.take_correlator(&scope)?;
            let worker = CorrelatorWorker::new(correlator, self.registry.subscribe(&scope));

            let (tx, rx) = mpsc::channel(self.config.correlator.channel_capacity);
            let (handle, mut facts_rx) = worker.spawn(rx, cancel.child_token());

            let feeder = tokio::spawn(async move {
                for observation in batch {
                    if tx.send(observation).await.is_err() {
                        break;
                    }
                }
            });
            let collector = tokio::spawn(async move {
                let mut facts = Vec::new();
                while let Some(fact) = facts_rx.recv().await {
                    facts.push(fact);
                }
                facts
            });

            running.push((scope, handle, feeder, collector));
        }

        for (scope, handle, feeder, collector) in running {
            let outcome = handle.await;
            let _ = feeder.await;
            let facts: Vec<CorrelatedFact> = collector
                .await
                .map_err(|e| EngineError::Worker(e.to_string()))?;

            match outcome {
                Ok(Ok(exit)) => {
                    report.facts += facts.len();
                    self.facts.extend(facts);
                    self.checkpoints
                        .insert(scope.clone(), exit.report.checkpoint.clone());
                    self.correlators.insert(scope.clone(), exit.correlator);
                    report.scopes.insert(scope, exit.report);
                }
                Ok(Err(e)) => {
                    // The correlator is lost; the next pass resumes from the last checkpoint
                    warn!(scope = %scope, error = %e, "Correlation failed");
                    report.failed.insert(scope, e.to_string());
                }
                Err(e) => {
                    warn!(scope = %scope, error = %e, "Correlation task aborted");
                    report.failed.insert(scope, e.to_string());
                }
            }
        }

        if cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }

        Ok(report)
    }

    /// The scope's live correlator, or a new one resumed from its checkpoint
    fn take_correlator(&mut self, scope: &ScopeRef) -> Result<Correlator, EngineError> {
        if let Some(correlator) = self.correlators.remove(scope) {
            return Ok(correlator);
        }
        let config = self.config.correlator.clone();
        Ok(match self.checkpoints.get(scope) {
            Some(checkpoint) => Correlator::resume(scope.clone(), checkpoint, config)?,
            None => Correlator::new(scope.clone(), config),
        })
    }

    /// Answer one query against the current snapshots and fact log
    pub fn evaluate(&self, query: &Query) -> Result<Answer, QueryError> {
        self.evaluator.evaluate(query, &self.facts, self.registry.as_ref())
    }

    /// Answer several queries; each succeeds or fails on its own
    pub fn evaluate_all(&self, queries: &[Query]) -> Vec<Result<Answer, QueryError>> {
        self.evaluator
            .evaluate_all(queries, &self.facts, self.registry.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amanda_domain::{AnswerValue, Descriptor, Domain, ElementKind, TimeRange};
    use amanda_ingest::{layout_observation, touch_observations, Touch, TouchLayout};

    fn layout() -> TouchLayout {
        TouchLayout {
            screen_width: 1080,
            screen_height: 1920,
            button_count: 10,
            button_width: 800,
            button_height: 100,
            spacing_px: 40,
        }
    }

    fn engine() -> Engine {
        Engine::new(EngineConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_layout_and_touches() {
        let mut engine = engine();
        let scope = ScopeRef::from("kiosk-7");

        let mut observations = vec![layout_observation(&scope, "installer", Timestamp::from_millis(0), &layout())];
        // Column starts at y = (1920 - 1360) / 2 = 280, buttons at x 140..940
        observations.extend(touch_observations(
            &scope,
            "user-1",
            &[
                Touch { timestamp: 1_000, x: 540.0, y: 330.0, event_fired: true },
                Touch { timestamp: 2_000, x: 540.0, y: 400.0, event_fired: true },
                Touch { timestamp: 3_000, x: 540.0, y: 470.0, event_fired: false },
            ],
        ));

        let report = engine.run(observations).await.unwrap();
        assert_eq!(report.structural, 1);
        assert_eq!(report.elements, 19);
        assert_eq!(report.correlation.facts, 3);

        let summary = Query::new(
            "summary",
            scope.clone(),
            amanda_domain::Predicate::InteractionSummary { range: TimeRange::all() },
        );
        match engine.evaluate(&summary).unwrap().result {
            AnswerValue::Summary(s) => {
                assert_eq!(s.valid, 1);
                assert_eq!(s.out_of_region, 1);
                assert_eq!(s.silent, 1);
            }
            other => panic!("unexpected answer {:?}", other),
        }

        let path = Query::path_exists("path", scope.clone(), "button_1", "button_10");
        assert_eq!(engine.evaluate(&path).unwrap().result, AnswerValue::Bool(false));
        assert!(engine.checkpoint(&scope).is_some());
    }

    #[tokio::test]
    async fn test_unknown_scope_events_are_counted() {
        let mut engine = engine();
        let touches = touch_observations(
            &ScopeRef::from("never-built"),
            "u",
            &[Touch { timestamp: 1, x: 0.0, y: 0.0, event_fired: true }],
        );

        let report = engine.correlate(touches).await.unwrap();
        assert_eq!(report.unknown_scope, 1);
        assert!(engine.facts().is_empty());
        assert!(matches!(
            engine.evaluate(&Query::path_exists("q", ScopeRef::from("never-built"), "a", "b")),
            Err(QueryError::UnknownScope(_))
        ));
    }

    #[test]
    fn test_incoherent_scope_does_not_block_others() {
        let engine = engine();
        let good = ScopeRef::from("good");
        let stray = ConstraintElement::new(
            Domain::Physical,
            ElementKind::Constraint,
            ScopeRef::from("elsewhere"),
            Descriptor::logical("wall_1"),
            1,
            vec![],
        );

        assert!(engine.build_scope(&ScopeRef::from("bad"), &[stray]).is_err());
        assert!(engine.graph(&ScopeRef::from("bad")).is_none());

        let door = ConstraintElement::new(
            Domain::Physical,
            ElementKind::Agency,
            good.clone(),
            Descriptor::logical("door_1"),
            1,
            vec![],
        );
        let report = engine.apply_elements(&[door]);
        assert_eq!(report.built.get(&good), Some(&1));
        assert!(report.failed.is_empty());
    }

    #[tokio::test]
    async fn test_checkpoint_skips_replayed_events() {
        let mut engine = engine();
        let scope = ScopeRef::from("kiosk-7");
        engine
            .run(vec![layout_observation(&scope, "installer", Timestamp::from_millis(0), &layout())])
            .await
            .unwrap();

        engine.set_checkpoint(scope.clone(), Timestamp::from_millis(2_000));
        let touches = touch_observations(
            &scope,
            "u",
            &[
                Touch { timestamp: 1_000, x: 540.0, y: 330.0, event_fired: true },
                Touch { timestamp: 2_000, x: 540.0, y: 330.0, event_fired: true },
            ],
        );
        let report = engine.correlate(touches).await.unwrap();

        assert_eq!(report.facts, 1);
        assert_eq!(report.scopes[&scope].metrics.skipped_before_checkpoint, 1);
    }

    #[tokio::test]
    async fn test_cancelled_engine_emits_nothing() {
        let mut engine = engine();
        let scope = ScopeRef::from("kiosk-7");
        engine
            .run(vec![layout_observation(&scope, "installer", Timestamp::from_millis(0), &layout())])
            .await
            .unwrap();

        engine.cancel_token().cancel();
        let touches = touch_observations(
            &scope,
            "u",
            &[Touch { timestamp: 1_000, x: 540.0, y: 330.0, event_fired: true }],
        );
        let report = engine.correlate(touches).await.unwrap();

        assert!(report.cancelled());
        assert_eq!(report.facts, 0);
    }
}
