//! Observation classification

use std::collections::BTreeMap;
use std::sync::Arc;

use amanda_domain::traits::{ClassificationRule, RuleMatch};
use amanda_domain::{
    ClassificationConflict, ConstraintElement, Descriptor, Domain, ElementId, ElementKind, Observation,
    PriorityTable, ScopeRef,
};
use tracing::{debug, warn};

use crate::rules::{
    code_patterns, BlueprintRule, CodePattern, DeclaredElementRule, FirewallRule, RouteRule,
    StatuteRule, TouchLayoutRule,
};
use crate::{ClassifierConfig, ClassifierError};

/// Elements and conflicts produced from one or more observations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassificationOutcome {
    /// Classified elements, ordered by id
    pub elements: Vec<ConstraintElement>,

    /// Equal-specificity conflicts
    pub conflicts: Vec<ClassificationConflict>,
}

impl ClassificationOutcome {
    /// True if nothing was classified
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty() && self.conflicts.is_empty()
    }

    /// Elements grouped by scope
    pub fn by_scope(&self) -> BTreeMap<ScopeRef, Vec<ConstraintElement>> {
        let mut grouped: BTreeMap<ScopeRef, Vec<ConstraintElement>> = BTreeMap::new();
        for element in &self.elements {
            grouped
                .entry(element.scope_ref.clone())
                .or_default()
                .push(element.clone());
        }
        grouped
    }
}

/// A rule and the reading it produced
struct Reading<'a> {
    rule: &'a str,
    matched: RuleMatch,
}

/// The Classifier tags observations as Agency or Constraint elements
///
/// Holds an ordered list of rules; each observation is offered to every rule
/// of its domain. The classifier is immutable once built and can be shared
/// across threads.
#[derive(Clone)]
pub struct Classifier {
    rules: Vec<Arc<dyn ClassificationRule>>,
    code: Vec<Arc<CodePattern>>,
    priorities: PriorityTable,
}

impl Classifier {
    /// Create a classifier with the built-in rule sets named by the configuration
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        config.validate().map_err(ClassifierError::Config)?;

        let mut classifier = Self::empty(config.priority_table());

        let sets = &config.rule_sets;
        if sets.declared {
            for domain in Domain::ALL {
                classifier.register(Arc::new(DeclaredElementRule::new(domain)));
            }
        }
        if sets.layout {
            classifier.register(Arc::new(TouchLayoutRule::new(config.max_layout_buttons)));
        }
        if sets.code {
            for pattern in code_patterns()? {
                let pattern = Arc::new(pattern);
                classifier.code.push(pattern.clone());
                classifier.register(pattern);
            }
        }
        if sets.blueprint {
            classifier.register(Arc::new(BlueprintRule));
        }
        if sets.network {
            classifier.register(Arc::new(RouteRule));
            classifier.register(Arc::new(FirewallRule));
        }
        if sets.statute {
            classifier.register(Arc::new(StatuteRule));
        }

        Ok(classifier)
    }

    /// Create a classifier with no rules
    pub fn empty(priorities: PriorityTable) -> Self {
        Self {
            rules: Vec::new(),
            code: Vec::new(),
            priorities,
        }
    }

    /// Create a classifier with default configuration
    pub fn default_config() -> Result<Self, ClassifierError> {
        Self::new(&ClassifierConfig::default())
    }

    /// Add a rule
    pub fn register(&mut self, rule: Arc<dyn ClassificationRule>) {
        self.rules.push(rule);
    }

    /// Builder-style [`register`](Self::register)
    pub fn with_rule(mut self, rule: Arc<dyn ClassificationRule>) -> Self {
        self.register(rule);
        self
    }

    /// Names of registered rules, in registration order
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Priority table tagged onto elements
    pub fn priorities(&self) -> PriorityTable {
        self.priorities
    }

    pub(crate) fn code_patterns(&self) -> &[Arc<CodePattern>] {
        &self.code
    }

    /// Classify one observation
    ///
    /// Pure: the same observation and rule set always give the same outcome.
    /// Readings that disagree on kind for one position are settled by
    /// specificity; an equal-specificity split is recorded as a conflict and
    /// tagged Constraint.
    pub fn classify(&self, observation: &Observation) -> ClassificationOutcome {
        let readings: Vec<Reading<'_>> = self
            .rules
            .iter()
            .filter(|rule| rule.domain() == observation.domain)
            .flat_map(|rule| {
                rule.apply(observation)
                    .into_iter()
                    .map(move |matched| Reading {
                        rule: rule.name(),
                        matched,
                    })
            })
            .collect();

        if readings.is_empty() {
            debug!(
                observation = %observation.id,
                domain = %observation.domain,
                kind = observation.payload.kind().unwrap_or("-"),
                "Unrecognized payload dropped"
            );
            return ClassificationOutcome::default();
        }

        let mut positions: BTreeMap<(ScopeRef, String), Vec<Reading<'_>>> = BTreeMap::new();
        for reading in readings {
            let key = (
                reading.matched.scope_ref.clone(),
                reading.matched.descriptor.key.clone(),
            );
            positions.entry(key).or_default().push(reading);
        }

        let mut outcome = ClassificationOutcome::default();
        for ((scope, key), readings) in positions {
            let (kind, conflict) = settle(&readings);

            if let Some((agency_rule, constraint_rule, specificity)) = conflict {
                warn!(
                    observation = %observation.id,
                    scope = %scope,
                    descriptor = %key,
                    agency_rule,
                    constraint_rule,
                    "Classification conflict; tagged Constraint"
                );
                outcome.conflicts.push(ClassificationConflict {
                    observation_id: observation.id,
                    scope_ref: scope.clone(),
                    descriptor: key.clone(),
                    agency_rule: agency_rule.to_string(),
                    constraint_rule: constraint_rule.to_string(),
                    specificity,
                });
            }

            let mut descriptor = Descriptor::logical(key);
            for reading in &readings {
                descriptor.merge(&reading.matched.descriptor);
            }

            outcome.elements.push(ConstraintElement::new(
                observation.domain,
                kind,
                scope,
                descriptor,
                self.priorities.priority_of(observation.domain),
                vec![observation.id],
            ));
        }

        outcome.elements.sort_by_key(|e| e.id);
        outcome
    }

    /// Classify many observations, merging corroborating elements
    pub fn classify_batch(&self, observations: &[Observation]) -> ClassificationOutcome {
        let mut merged: BTreeMap<ElementId, ConstraintElement> = BTreeMap::new();
        let mut conflicts = Vec::new();

        for observation in observations {
            let outcome = self.classify(observation);
            for element in outcome.elements {
                match merged.get_mut(&element.id) {
                    Some(existing) => existing.corroborate(&element),
                    None => {
                        merged.insert(element.id, element);
                    }
                }
            }
            conflicts.extend(outcome.conflicts);
        }

        ClassificationOutcome {
            elements: merged.into_values().collect(),
            conflicts,
        }
    }
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("rules", &self.rule_names())
            .field("priorities", &self.priorities)
            .finish()
    }
}

/// Decide the kind of one position from its readings
///
/// Returns the kind and, for an equal-specificity split, the two rules and
/// their shared specificity.
fn settle<'a>(readings: &[Reading<'a>]) -> (ElementKind, Option<(&'a str, &'a str, usize)>) {
    let strongest = |kind: ElementKind| {
        readings
            .iter()
            .filter(|r| r.matched.kind == kind)
            // Earliest registered rule wins ties within one kind
            .fold(None::<&Reading<'a>>, |best, r| match best {
                Some(b) if b.matched.specificity >= r.matched.specificity => Some(b),
                _ => Some(r),
            })
    };

    match (strongest(ElementKind::Agency), strongest(ElementKind::Constraint)) {
        (Some(_), None) => (ElementKind::Agency, None),
        (None, _) => (ElementKind::Constraint, None),
        (Some(a), Some(c)) => {
            if a.matched.specificity > c.matched.specificity {
                (ElementKind::Agency, None)
            } else if c.matched.specificity > a.matched.specificity {
                (ElementKind::Constraint, None)
            } else {
                (
                    ElementKind::Constraint,
                    Some((a.rule, c.rule, a.matched.specificity)),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amanda_domain::observation::keys;
    use amanda_domain::{AttrValue, Payload, Timestamp};

    fn source_line(text: &str) -> Observation {
        let payload = Payload::new()
            .with(keys::KIND, AttrValue::Text("source_line".into()))
            .with(keys::DESCRIPTOR, AttrValue::Text("main.py:1".into()))
            .with("text", AttrValue::Text(text.into()));
        Observation::new(Domain::Digital, "main.py", Timestamp::from_millis(0), payload, "repo")
    }

    fn declared(domain: Domain, kind: &str, key: &str) -> Observation {
        let payload = Payload::new()
            .with(keys::KIND, AttrValue::Text("element".into()))
            .with("element_kind", AttrValue::Text(kind.into()))
            .with(keys::DESCRIPTOR, AttrValue::Text(key.into()));
        Observation::new(domain, "labeler", Timestamp::from_millis(0), payload, "scope-1")
    }

    /// Fixed-kind rule for tie-break tests
    struct Fixed {
        name: &'static str,
        kind: ElementKind,
        specificity: usize,
    }

    impl ClassificationRule for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn domain(&self) -> Domain {
            Domain::Physical
        }

        fn apply(&self, observation: &Observation) -> Vec<RuleMatch> {
            vec![RuleMatch {
                kind: self.kind,
                scope_ref: observation.scope_ref(),
                descriptor: Descriptor::logical("hall"),
                specificity: self.specificity,
            }]
        }
    }

    fn fixed_pair(agency: usize, constraint: usize) -> Classifier {
        Classifier::empty(PriorityTable::default())
            .with_rule(Arc::new(Fixed {
                name: "open",
                kind: ElementKind::Agency,
                specificity: agency,
            }))
            .with_rule(Arc::new(Fixed {
                name: "closed",
                kind: ElementKind::Constraint,
                specificity: constraint,
            }))
    }

    fn physical() -> Observation {
        Observation::new(Domain::Physical, "walker", Timestamp::from_millis(0), Payload::new(), "house-1")
    }

    #[test]
    fn test_more_specific_rule_wins() {
        let outcome = fixed_pair(5, 3).classify(&physical());
        assert_eq!(outcome.elements.len(), 1);
        assert_eq!(outcome.elements[0].kind, ElementKind::Agency);
        assert!(outcome.conflicts.is_empty());

        let outcome = fixed_pair(3, 5).classify(&physical());
        assert_eq!(outcome.elements[0].kind, ElementKind::Constraint);
    }

    #[test]
    fn test_equal_specificity_records_conflict_and_restricts() {
        let obs = physical();
        let outcome = fixed_pair(4, 4).classify(&obs);

        assert_eq!(outcome.elements[0].kind, ElementKind::Constraint);
        assert_eq!(
            outcome.conflicts,
            vec![ClassificationConflict {
                observation_id: obs.id,
                scope_ref: ScopeRef::from("house-1"),
                descriptor: "hall".to_string(),
                agency_rule: "open".to_string(),
                constraint_rule: "closed".to_string(),
                specificity: 4,
            }]
        );
    }

    #[test]
    fn test_conflicts_always_recorded() {
        // Older configuration files may still carry the retired switch
        let config: ClassifierConfig = toml::from_str("record_conflicts = false").unwrap();
        let classifier = Classifier::new(&config)
            .unwrap()
            .with_rule(Arc::new(Fixed {
                name: "open",
                kind: ElementKind::Agency,
                specificity: 2,
            }))
            .with_rule(Arc::new(Fixed {
                name: "closed",
                kind: ElementKind::Constraint,
                specificity: 2,
            }));

        let outcome = classifier.classify(&physical());
        assert_eq!(outcome.elements[0].kind, ElementKind::Constraint);
        assert_eq!(outcome.conflicts.len(), 1);
    }

    #[test]
    fn test_rules_only_see_their_domain() {
        let outcome = fixed_pair(4, 4).classify(&source_line("x = 1"));
        assert!(outcome.is_empty());
    }

    #[test]
    fn test_unrecognized_payload_yields_nothing() {
        let classifier = Classifier::default_config().unwrap();
        let obs = Observation::new(
            Domain::Digital,
            "u",
            Timestamp::from_millis(0),
            Payload::new().with(keys::KIND, AttrValue::Text("heartbeat".into())),
            "s",
        );
        assert!(classifier.classify(&obs).is_empty());
    }

    #[test]
    fn test_code_line_tie_break() {
        let classifier = Classifier::default_config().unwrap();

        let agency = classifier.classify(&source_line("    def execute_pipeline(self, steps):"));
        assert_eq!(agency.elements[0].kind, ElementKind::Agency);

        let branch = classifier.classify(&source_line("if user_role in ['guest', 'viewer']:"));
        assert_eq!(branch.elements[0].kind, ElementKind::Constraint);
        assert!(branch.conflicts.is_empty());

        // The assignment reading covers more of the line than the branch prefix
        let compare = classifier.classify(&source_line("if mode == 'read_only':"));
        assert_eq!(compare.elements[0].kind, ElementKind::Agency);

        // `limit = 100` is matched in full by both sides
        let tie = classifier.classify(&source_line("limit = 100"));
        assert_eq!(tie.elements[0].kind, ElementKind::Constraint);
        assert_eq!(tie.conflicts.len(), 1);
        assert_eq!(tie.conflicts[0].agency_rule, "code.assignment");
        assert_eq!(tie.conflicts[0].constraint_rule, "code.hardcoded_limit");
    }

    #[test]
    fn test_priority_tagged_from_domain() {
        let classifier = Classifier::default_config().unwrap();
        let outcome = classifier.classify(&declared(Domain::Constitutional, "constraint", "school_zone"));
        assert_eq!(outcome.elements[0].priority, 2);
        assert_eq!(outcome.elements[0].sources.len(), 1);
    }

    #[test]
    fn test_batch_corroborates() {
        let classifier = Classifier::default_config().unwrap();
        let a = declared(Domain::Digital, "agency", "button_1");
        let b = declared(Domain::Digital, "agency", "button_1");
        let c = declared(Domain::Digital, "constraint", "gap_1");

        let outcome = classifier.classify_batch(&[a.clone(), b.clone(), c]);
        assert_eq!(outcome.elements.len(), 2);
        let button = outcome.elements.iter().find(|e| e.key() == "button_1").unwrap();
        let mut expected = vec![a.id, b.id];
        expected.sort();
        assert_eq!(button.sources, expected);

        let by_scope = outcome.by_scope();
        assert_eq!(by_scope[&ScopeRef::from("scope-1")].len(), 2);
    }

    #[test]
    fn test_invalid_priorities_rejected() {
        let mut config = ClassifierConfig::default();
        config.priorities.constitutional = 1;
        assert!(matches!(Classifier::new(&config), Err(ClassifierError::Config(_))));
    }

    #[test]
    fn test_declared_only_registers_three_rules() {
        let classifier = Classifier::new(&ClassifierConfig::declared_only()).unwrap();
        assert_eq!(
            classifier.rule_names(),
            vec!["declared.digital", "declared.physical", "declared.constitutional"]
        );
    }
}
