//! Correlation across successive runs of one engine

use std::sync::Arc;

use amanda_classifier::Classifier;
use amanda_domain::traits::{ClassificationRule, RuleMatch};
use amanda_domain::{
    AnswerValue, Descriptor, Domain, ElementKind, FactStatus, Observation, Payload, PriorityTable, Query, ScopeRef,
    Timestamp,
};
use amanda_engine::{Engine, EngineConfig};
use amanda_graph::GraphError;
use amanda_ingest::{layout_observation, touch_observations, Touch, TouchLayout};

fn kiosk() -> ScopeRef {
    ScopeRef::from("kiosk-7")
}

// Column starts at y = 280: button_1 spans 280..380, gap_1 380..420
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

fn touch(timestamp: u64, y: f64, event_fired: bool) -> Vec<Observation> {
    touch_observations(&kiosk(), "user-1", &[Touch { timestamp, x: 540.0, y, event_fired }])
}

async fn laid_out() -> Engine {
    let mut engine = Engine::new(EngineConfig::default()).unwrap();
    engine
        .run(vec![layout_observation(&kiosk(), "installer", Timestamp::from_millis(0), &layout())])
        .await
        .unwrap();
    engine
}

#[tokio::test]
async fn test_older_event_in_later_run_is_late() {
    let mut engine = laid_out().await;

    let first = engine.run(touch(10_000, 330.0, true)).await.unwrap();
    assert_eq!(first.correlation.facts, 1);

    let second = engine.run(touch(5_000, 400.0, true)).await.unwrap();
    assert_eq!(second.correlation.facts, 1);
    let metrics = &second.correlation.scopes[&kiosk()].metrics;
    assert_eq!(metrics.skipped_before_checkpoint, 0);
    assert_eq!(metrics.late, 1);

    let late: Vec<_> = engine.facts().all().into_iter().filter(|f| f.is_late()).collect();
    assert_eq!(late.len(), 1);
    assert_eq!(late[0].timestamp, Timestamp::from_millis(5_000));
    assert_eq!(late[0].status, FactStatus::LateObservation);
}

#[tokio::test]
async fn test_redelivery_in_later_run_is_dropped() {
    let mut engine = laid_out().await;

    engine.run(touch(10_000, 330.0, true)).await.unwrap();
    let again = engine.run(touch(10_000, 330.0, true)).await.unwrap();

    assert_eq!(again.correlation.facts, 0);
    assert_eq!(again.correlation.scopes[&kiosk()].metrics.duplicates, 1);
    assert_eq!(engine.facts().len(), 1);
}

#[tokio::test]
async fn test_restored_checkpoint_skips_earlier_events() {
    let mut engine = laid_out().await;
    engine.run(touch(10_000, 330.0, true)).await.unwrap();

    // As after a restart: the position is all that survives
    engine.set_checkpoint(kiosk(), Timestamp::from_millis(10_000));
    let report = engine.run(touch(5_000, 400.0, true)).await.unwrap();

    assert_eq!(report.correlation.facts, 0);
    assert_eq!(report.correlation.scopes[&kiosk()].metrics.skipped_before_checkpoint, 1);
}

#[tokio::test]
async fn test_run_after_cancel_still_correlates() {
    let mut engine = laid_out().await;

    engine.cancel_token().cancel();
    let cancelled = engine.run(touch(1_000, 330.0, true)).await.unwrap();
    assert!(cancelled.correlation.cancelled());
    assert_eq!(cancelled.correlation.facts, 0);

    let resumed = engine.run(touch(2_000, 330.0, true)).await.unwrap();
    assert!(!resumed.correlation.cancelled());
    assert_eq!(resumed.correlation.facts, 1);
    assert!(!engine.cancel_token().is_cancelled());
}

#[tokio::test]
async fn test_press_outside_button_end_to_end() {
    let mut engine = laid_out().await;
    engine.run(touch(2_000, 400.0, true)).await.unwrap();

    let query = Query::event_at("gap", kiosk(), "gap_1", Timestamp::from_millis(2_000));
    let answer = engine.evaluate(&query).unwrap();

    assert_eq!(answer.result, AnswerValue::Bool(true));
    assert_eq!(answer.supporting_facts.len(), 1);
    let fact = &answer.supporting_facts[0];
    assert!(fact.event_observed);
    assert!(!fact.within_agency_region);
    assert_eq!(fact.node_ref.as_deref(), Some("gap_1"));
    assert_eq!(fact.timestamp, Timestamp::from_millis(2_000));
}

/// Files every reading under a fixed scope, whatever the observation says
struct Misfiled;

impl ClassificationRule for Misfiled {
    fn name(&self) -> &str {
        "misfiled"
    }

    fn domain(&self) -> Domain {
        Domain::Physical
    }

    fn apply(&self, _observation: &Observation) -> Vec<RuleMatch> {
        vec![RuleMatch {
            kind: ElementKind::Constraint,
            scope_ref: ScopeRef::from("elsewhere"),
            descriptor: Descriptor::logical("wall_1"),
            specificity: 1,
        }]
    }
}

#[tokio::test]
async fn test_element_for_another_scope_is_incoherent() {
    let classifier = Classifier::empty(PriorityTable::default()).with_rule(Arc::new(Misfiled));
    let mut engine = Engine::with_classifier(EngineConfig::default(), classifier);

    let observation = Observation::new(Domain::Physical, "surveyor", Timestamp::from_millis(0), Payload::new(), "house-1");
    let report = engine.run(vec![observation]).await.unwrap();

    assert!(matches!(
        report.build.failed.get(&ScopeRef::from("house-1")),
        Some(GraphError::IncoherentScope { .. })
    ));
    assert!(engine.graph(&ScopeRef::from("house-1")).is_none());
    assert!(engine.graph(&ScopeRef::from("elsewhere")).is_none());
}
