//! Query evaluation over correlated facts and graph snapshots

use amanda_domain::{
    Answer, AnswerValue, CorrelatedFact, InteractionSummary, Predicate, Query, ScopeRef, TimeRange,
    TimeResolution, Timestamp,
};
use amanda_graph::GraphSource;
use tracing::debug;

use crate::config::QueryConfig;
use crate::error::QueryError;
use crate::facts::FactLog;
use crate::kinematics::{check_speed_zone, predict_approach};

/// Read-only evaluator of declarative queries
///
/// Evaluation never mutates graphs or facts. A graph snapshot taken at the
/// start of an evaluation is read to completion even if the scope is updated
/// meanwhile.
#[derive(Debug, Clone, Default)]
pub struct QueryEvaluator {
    config: QueryConfig,
}

impl QueryEvaluator {
    /// Create an evaluator
    pub fn new(config: QueryConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Evaluate one query
    ///
    /// # Errors
    ///
    /// - [`QueryError::UnknownScope`] if no graph has been built for the scope
    /// - [`QueryError::AmbiguousTime`] if a strict point-in-time query matches
    ///   more than one fact
    /// - [`QueryError::InvalidQuery`] if an approach names a node without a
    ///   region, or a speed-zone check has unusable inputs
    pub fn evaluate<G>(&self, query: &Query, facts: &FactLog, graphs: &G) -> Result<Answer, QueryError>
    where
        G: GraphSource + ?Sized,
    {
        let scope = &query.scope_ref;
        let graph = graphs
            .graph(scope)
            .ok_or_else(|| QueryError::UnknownScope(scope.clone()))?;

        let (result, supporting_facts) = match &query.predicate {
            Predicate::StateAt {
                node,
                at,
                window_ms,
                resolution,
            } => match self.point_fact(facts, scope, node, *at, *window_ms, *resolution)? {
                Some(fact) => (AnswerValue::Bool(fact.within_agency_region), vec![fact.clone()]),
                None => (AnswerValue::NoEvidence, Vec::new()),
            },
            Predicate::EventAt {
                node,
                at,
                window_ms,
                resolution,
            } => match self.point_fact(facts, scope, node, *at, *window_ms, *resolution)? {
                Some(fact) => (AnswerValue::Bool(fact.event_observed), vec![fact.clone()]),
                None => (AnswerValue::Bool(false), Vec::new()),
            },
            Predicate::PathExists { from, to } => (AnswerValue::Bool(graph.path_exists(from, to)), Vec::new()),
            Predicate::RegionViolation { range } => {
                let violations: Vec<_> = facts
                    .range(scope, *range)
                    .iter()
                    .filter(|f| !f.within_agency_region)
                    .cloned()
                    .collect();
                (AnswerValue::Bool(!violations.is_empty()), violations)
            }
            Predicate::InteractionSummary { range } => {
                let in_range = facts.range(scope, *range);
                (AnswerValue::Summary(summarize(in_range)), in_range.to_vec())
            }
            Predicate::Approach {
                node,
                position,
                velocity,
            } => {
                let target = graph
                    .node(node)
                    .ok_or_else(|| QueryError::InvalidQuery(format!("no node '{}' in scope {}", node, scope)))?;
                let region = target
                    .region
                    .ok_or_else(|| QueryError::InvalidQuery(format!("node '{}' has no region", node)))?;
                let prediction = predict_approach(
                    &region,
                    target.tag.is_allowed(),
                    *position,
                    *velocity,
                    self.config.interaction_range,
                );
                (AnswerValue::Approach(prediction), Vec::new())
            }
            Predicate::SpeedZone {
                speed_mph,
                limit_mph,
                distance_to_zone_m,
                max_decel_mps2,
            } => {
                let check = check_speed_zone(
                    *speed_mph,
                    *limit_mph,
                    *distance_to_zone_m,
                    *max_decel_mps2,
                    self.config.warning_band,
                )?;
                (AnswerValue::SpeedZone(check), Vec::new())
            }
        };

        debug!(
            query = %query.id,
            scope = %scope,
            predicate = query.predicate.name(),
            graph_version = graph.version(),
            supporting = supporting_facts.len(),
            "Evaluated query"
        );

        Ok(Answer {
            query_id: query.id.clone(),
            result,
            supporting_facts,
        })
    }

    /// Evaluate several queries against the same view
    ///
    /// Each query succeeds or fails on its own.
    pub fn evaluate_all<G>(&self, queries: &[Query], facts: &FactLog, graphs: &G) -> Vec<Result<Answer, QueryError>>
    where
        G: GraphSource + ?Sized,
    {
        queries.iter().map(|q| self.evaluate(q, facts, graphs)).collect()
    }

    fn point_fact<'f>(
        &self,
        facts: &'f FactLog,
        scope: &ScopeRef,
        node: &str,
        at: Timestamp,
        window_ms: u64,
        resolution: TimeResolution,
    ) -> Result<Option<&'f CorrelatedFact>, QueryError> {
        let window = TimeRange::new(at.saturating_sub(window_ms.max(self.config.point_window_ms)), at);
        let matches: Vec<_> = facts.range(scope, window).iter().filter(|f| f.is_at(node)).collect();

        if resolution == TimeResolution::Strict && matches.len() > 1 {
            return Err(QueryError::AmbiguousTime {
                node: node.to_string(),
                at,
                matches: matches.len(),
            });
        }

        // Facts are in timestamp order; ties resolve to the last recorded
        Ok(matches.last().copied())
    }
}

/// Count valid, silent and out-of-region interactions
pub fn summarize(facts: &[CorrelatedFact]) -> InteractionSummary {
    facts.iter().fold(InteractionSummary::default(), |mut summary, fact| {
        match (fact.within_agency_region, fact.event_observed) {
            (true, true) => summary.valid += 1,
            (true, false) => summary.silent += 1,
            (false, _) => summary.out_of_region += 1,
        }
        summary
    })
}

/// Evaluate a query with the default configuration
pub fn evaluate<G>(query: &Query, facts: &FactLog, graphs: &G) -> Result<Answer, QueryError>
where
    G: GraphSource + ?Sized,
{
    QueryEvaluator::default().evaluate(query, facts, graphs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    use amanda_domain::{
        ConstraintElement, Descriptor, Domain, ElementKind, FactStatus, ObservationId, Region,
    };
    use amanda_graph::{GraphBuilder, StructuralGraph};

    fn scope() -> ScopeRef {
        ScopeRef::from("kiosk-7")
    }

    fn graphs() -> HashMap<ScopeRef, Arc<StructuralGraph>> {
        let mut elements = Vec::new();
        for i in 1..=10 {
            let y0 = (i - 1) as f64 * 60.0;
            elements.push(ConstraintElement::new(
                Domain::Digital,
                ElementKind::Agency,
                scope(),
                Descriptor::spatial(format!("button_{}", i), Region::new(0.0, y0, 100.0, y0 + 40.0)),
                1,
                vec![],
            ));
            if i < 10 {
                elements.push(ConstraintElement::new(
                    Domain::Digital,
                    ElementKind::Constraint,
                    scope(),
                    Descriptor::spatial(format!("gap_{}", i), Region::new(0.0, y0 + 40.0, 100.0, y0 + 60.0)),
                    1,
                    vec![],
                ));
            }
        }
        let graph = GraphBuilder::default().build(&scope(), &elements).unwrap();
        HashMap::from([(scope(), Arc::new(graph))])
    }

    fn fact(ms: u64, node: &str, within: bool, event: bool) -> CorrelatedFact {
        CorrelatedFact {
            observation_id: ObservationId::from_value(ms as u128),
            subject_ref: "user".into(),
            timestamp: Timestamp::from_millis(ms),
            scope_ref: scope(),
            node_ref: Some(node.to_string()),
            event_observed: event,
            within_agency_region: within,
            status: FactStatus::OnTime,
        }
    }

    fn log() -> FactLog {
        vec![
            fact(100, "button_1", true, true),
            fact(200, "button_2", true, false),
            fact(300, "gap_2", false, true),
            fact(300, "button_3", true, true),
            fact(310, "button_3", true, false),
        ]
        .into_iter()
        .collect()
    }

    fn at(ms: u64) -> Timestamp {
        Timestamp::from_millis(ms)
    }

    #[test]
    fn test_unknown_scope_is_an_error() {
        let query = Query::path_exists("q", ScopeRef::from("never-built"), "a", "b");
        let err = evaluate(&query, &log(), &graphs()).unwrap_err();
        assert_eq!(err, QueryError::UnknownScope(ScopeRef::from("never-built")));
    }

    #[test]
    fn test_isolated_buttons_have_no_path() {
        let g = graphs();
        let answer = evaluate(&Query::path_exists("q", scope(), "button_1", "button_10"), &log(), &g).unwrap();
        assert_eq!(answer.result, AnswerValue::Bool(false));
        assert!(answer.supporting_facts.is_empty());

        let answer = evaluate(&Query::path_exists("q", scope(), "button_1", "button_1"), &log(), &g).unwrap();
        assert_eq!(answer.result, AnswerValue::Bool(true));

        let answer = evaluate(&Query::path_exists("q", scope(), "nowhere", "button_1"), &log(), &g).unwrap();
        assert_eq!(answer.result, AnswerValue::Bool(false));
    }

    #[test]
    fn test_state_at() {
        let g = graphs();
        let answer = evaluate(&Query::state_at("q", scope(), "button_1", at(100)), &log(), &g).unwrap();
        assert_eq!(answer.result, AnswerValue::Bool(true));
        assert_eq!(answer.query_id, "q");
        assert_eq!(answer.supporting_facts.len(), 1);

        let answer = evaluate(&Query::state_at("q", scope(), "button_1", at(101)), &log(), &g).unwrap();
        assert_eq!(answer.result, AnswerValue::NoEvidence);
    }

    #[test]
    fn test_event_at_outside_region() {
        let answer = evaluate(&Query::event_at("q", scope(), "gap_2", at(300)), &log(), &graphs()).unwrap();
        assert_eq!(answer.result, AnswerValue::Bool(true));
        assert!(!answer.supporting_facts[0].within_agency_region);
    }

    #[test]
    fn test_event_at_without_evidence_is_false() {
        let answer = evaluate(&Query::event_at("q", scope(), "button_9", at(300)), &log(), &graphs()).unwrap();
        assert_eq!(answer.result, AnswerValue::Bool(false));
        assert!(answer.supporting_facts.is_empty());
    }

    #[test]
    fn test_window_most_recent_and_strict() {
        let g = graphs();
        let predicate = |resolution| Predicate::EventAt {
            node: "button_3".into(),
            at: at(310),
            window_ms: 20,
            resolution,
        };

        let recent = Query::new("q", scope(), predicate(TimeResolution::MostRecent));
        let answer = evaluate(&recent, &log(), &g).unwrap();
        assert_eq!(answer.result, AnswerValue::Bool(false));
        assert_eq!(answer.supporting_facts[0].timestamp, at(310));

        let strict = Query::new("q", scope(), predicate(TimeResolution::Strict));
        let err = evaluate(&strict, &log(), &g).unwrap_err();
        assert_eq!(
            err,
            QueryError::AmbiguousTime {
                node: "button_3".into(),
                at: at(310),
                matches: 2
            }
        );
    }

    #[test]
    fn test_config_window_applies() {
        let evaluator = QueryEvaluator::new(QueryConfig {
            point_window_ms: 50,
            ..Default::default()
        });
        let answer = evaluator
            .evaluate(&Query::state_at("q", scope(), "button_2", at(240)), &log(), &graphs())
            .unwrap();
        assert_eq!(answer.result, AnswerValue::Bool(true));
    }

    #[test]
    fn test_region_violation() {
        let g = graphs();
        let range = TimeRange::new(at(0), at(250));
        let answer = evaluate(&Query::region_violation("q", scope(), range), &log(), &g).unwrap();
        assert_eq!(answer.result, AnswerValue::Bool(false));

        let answer = evaluate(&Query::region_violation("q", scope(), TimeRange::all()), &log(), &g).unwrap();
        assert_eq!(answer.result, AnswerValue::Bool(true));
        assert_eq!(answer.supporting_facts.len(), 1);
        assert!(answer.supporting_facts[0].is_at("gap_2"));
    }

    #[test]
    fn test_interaction_summary() {
        let query = Query::new("q", scope(), Predicate::InteractionSummary { range: TimeRange::all() });
        let answer = evaluate(&query, &log(), &graphs()).unwrap();
        assert_eq!(
            answer.result,
            AnswerValue::Summary(InteractionSummary {
                valid: 2,
                silent: 2,
                out_of_region: 1
            })
        );
        let stamps: Vec<_> = answer.supporting_facts.iter().map(|f| f.timestamp.as_millis()).collect();
        assert_eq!(stamps, vec![100, 200, 300, 300, 310]);
    }

    #[test]
    fn test_evaluate_all_isolates_failures() {
        let queries = vec![
            Query::path_exists("ok", scope(), "button_1", "button_2"),
            Query::path_exists("bad", ScopeRef::from("other"), "a", "b"),
        ];
        let results = QueryEvaluator::default().evaluate_all(&queries, &log(), &graphs());
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    fn house() -> HashMap<ScopeRef, Arc<StructuralGraph>> {
        let house = ScopeRef::from("house-1");
        let at = |kind, key: &str, region| {
            ConstraintElement::new(Domain::Physical, kind, house.clone(), Descriptor::spatial(key, region), 1, vec![])
        };
        let elements = vec![
            at(ElementKind::Agency, "front_door", Region::new(6.5, 6.5, 7.5, 7.5)),
            at(ElementKind::Constraint, "north_wall", Region::new(0.0, 10.0, 10.0, 10.2)),
            ConstraintElement::new(Domain::Physical, ElementKind::Agency, house.clone(), Descriptor::logical("hall"), 1, vec![]),
        ];
        let graph = GraphBuilder::default().build(&house, &elements).unwrap();
        HashMap::from([(house, Arc::new(graph))])
    }

    fn approach(node: &str, position: (f64, f64), velocity: (f64, f64)) -> Query {
        Query::new(
            "approach",
            ScopeRef::from("house-1"),
            Predicate::Approach {
                node: node.to_string(),
                position,
                velocity,
            },
        )
    }

    #[test]
    fn test_approach_to_door() {
        let answer = evaluate(&approach("front_door", (5.8, 5.8), (1.0, 1.0)), &FactLog::new(), &house()).unwrap();
        match answer.result {
            AnswerValue::Approach(prediction) => {
                assert!(prediction.imminent);
                assert!(prediction.target_allowed);
            }
            other => panic!("unexpected answer {:?}", other),
        }
        assert!(answer.result.needs_cue());
        assert!(answer.supporting_facts.is_empty());

        let wall = evaluate(&approach("north_wall", (5.0, 9.5), (0.0, 1.0)), &FactLog::new(), &house()).unwrap();
        match wall.result {
            AnswerValue::Approach(prediction) => {
                assert!(prediction.imminent);
                assert!(!prediction.target_allowed);
            }
            other => panic!("unexpected answer {:?}", other),
        }
    }

    #[test]
    fn test_approach_needs_a_located_node() {
        let missing = evaluate(&approach("back_door", (0.0, 0.0), (1.0, 0.0)), &FactLog::new(), &house());
        assert!(matches!(missing, Err(QueryError::InvalidQuery(_))));

        let logical = evaluate(&approach("hall", (0.0, 0.0), (1.0, 0.0)), &FactLog::new(), &house());
        assert!(matches!(logical, Err(QueryError::InvalidQuery(_))));
    }

    #[test]
    fn test_speed_zone_uses_configured_band() {
        let query = Query::new(
            "zone",
            ScopeRef::from("house-1"),
            Predicate::SpeedZone {
                speed_mph: 18.5,
                limit_mph: 20.0,
                distance_to_zone_m: 0.0,
                max_decel_mps2: 4.0,
            },
        );

        // 18.5 is below the default 19 mph band floor
        let answer = evaluate(&query, &FactLog::new(), &house()).unwrap();
        assert_eq!(answer.result, AnswerValue::SpeedZone(Default::default()));
        assert!(!answer.result.needs_cue());

        let wide = QueryEvaluator::new(QueryConfig {
            warning_band: 0.9,
            ..Default::default()
        });
        let answer = wide.evaluate(&query, &FactLog::new(), &house()).unwrap();
        match answer.result {
            AnswerValue::SpeedZone(check) => {
                assert!(check.near_limit);
                assert!(check.warning_required);
            }
            other => panic!("unexpected answer {:?}", other),
        }
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    use amanda_domain::{FactStatus, ObservationId};
    use amanda_graph::{GraphBuilder, StructuralGraph};
    use proptest::prelude::*;

    fn arb_fact() -> impl Strategy<Value = CorrelatedFact> {
        (0u64..500, 0usize..3, any::<bool>(), any::<bool>()).prop_map(|(ms, node, within, event)| CorrelatedFact {
            observation_id: ObservationId::from_value(ms as u128),
            subject_ref: "u".into(),
            timestamp: Timestamp::from_millis(ms),
            scope_ref: ScopeRef::from("s"),
            node_ref: Some(format!("n{}", node)),
            event_observed: event,
            within_agency_region: within,
            status: FactStatus::OnTime,
        })
    }

    proptest! {
        #[test]
        fn summary_partitions_the_range(
            facts in prop::collection::vec(arb_fact(), 0..40),
            start in 0u64..500,
            len in 0u64..500,
        ) {
            let scope = ScopeRef::from("s");
            let graphs = HashMap::from([(
                scope.clone(),
                Arc::new(GraphBuilder::default().build(&scope, &[]).unwrap()),
            )]);
            let log: FactLog = facts.into_iter().collect();
            let range = TimeRange::new(Timestamp::from_millis(start), Timestamp::from_millis(start + len));

            let query = Query::new("q", scope.clone(), Predicate::InteractionSummary { range });
            let answer = evaluate(&query, &log, &graphs).unwrap();
            let summary = match answer.result {
                AnswerValue::Summary(summary) => summary,
                other => panic!("expected a summary, got {:?}", other),
            };
            prop_assert_eq!(summary.total(), answer.supporting_facts.len());
            prop_assert!(answer.supporting_facts.iter().all(|f| range.contains(f.timestamp)));
            prop_assert!(answer.supporting_facts.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        }

        #[test]
        fn most_recent_never_fails(
            facts in prop::collection::vec(arb_fact(), 0..40),
            at in 0u64..500,
            window in 0u64..200,
        ) {
            let scope = ScopeRef::from("s");
            let graph: Arc<StructuralGraph> = Arc::new(GraphBuilder::default().build(&scope, &[]).unwrap());
            let graphs = HashMap::from([(scope.clone(), graph)]);
            let log: FactLog = facts.into_iter().collect();

            let query = Query::new("q", scope, Predicate::StateAt {
                node: "n1".into(),
                at: Timestamp::from_millis(at),
                window_ms: window,
                resolution: TimeResolution::MostRecent,
            });
            prop_assert!(evaluate(&query, &log, &graphs).is_ok());
        }
    }
}
