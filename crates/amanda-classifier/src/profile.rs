//! Agency/constraint profile of source text

use std::collections::BTreeMap;

use amanda_domain::traits::ClassificationRule;
use amanda_domain::{ElementKind, Observation};

use crate::Classifier;

/// One side must outnumber the other by this factor to dominate
pub const DOMINANCE_RATIO: f64 = 1.5;

/// Predominant context of a body of code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeContext {
    /// Dominated by definitions and free state
    HighAgency,
    /// Dominated by limits, option checks and fixed branching
    HighConstraint,
    /// Neither side dominates
    Balanced,
}

impl CodeContext {
    /// Get the context name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeContext::HighAgency => "high_agency",
            CodeContext::HighConstraint => "high_constraint",
            CodeContext::Balanced => "balanced",
        }
    }

    /// Agency share score: 0.75, 0.25 or 0.5
    pub fn score(&self) -> f64 {
        match self {
            CodeContext::HighAgency => 0.75,
            CodeContext::HighConstraint => 0.25,
            CodeContext::Balanced => 0.5,
        }
    }

    /// Classify indicator totals
    pub fn from_totals(agency: usize, constraint: usize) -> Self {
        let (agency, constraint) = (agency as f64, constraint as f64);
        if agency > constraint * DOMINANCE_RATIO {
            CodeContext::HighAgency
        } else if constraint > agency * DOMINANCE_RATIO {
            CodeContext::HighConstraint
        } else {
            CodeContext::Balanced
        }
    }
}

/// Summary of the code patterns found across `source_line` observations
#[derive(Debug, Clone, PartialEq)]
pub struct CodeProfile {
    /// Lines examined
    pub lines: usize,

    /// Matches per Agency pattern
    pub agency_indicators: BTreeMap<String, usize>,

    /// Matches per Constraint pattern
    pub constraint_indicators: BTreeMap<String, usize>,

    /// Lines classified Agency
    pub agency_lines: usize,

    /// Lines classified Constraint
    pub constraint_lines: usize,

    /// Lines where the tie-break fell back to Constraint
    pub conflicts: usize,

    /// Predominant context
    pub context: CodeContext,
}

impl CodeProfile {
    /// Total Agency pattern matches
    pub fn total_agency(&self) -> usize {
        self.agency_indicators.values().sum()
    }

    /// Total Constraint pattern matches
    pub fn total_constraint(&self) -> usize {
        self.constraint_indicators.values().sum()
    }
}

impl Classifier {
    /// Profile `source_line` observations with the registered code patterns
    ///
    /// Other observations are ignored. Indicator counts include every
    /// non-overlapping match on a line; line counts use the classified kind.
    pub fn profile_code(&self, observations: &[Observation]) -> CodeProfile {
        let mut agency_indicators = BTreeMap::new();
        let mut constraint_indicators = BTreeMap::new();
        for pattern in self.code_patterns() {
            let slot = match pattern.kind() {
                ElementKind::Agency => &mut agency_indicators,
                ElementKind::Constraint => &mut constraint_indicators,
            };
            slot.insert(pattern.name().to_string(), 0usize);
        }

        let mut lines = 0;
        let mut agency_lines = 0;
        let mut constraint_lines = 0;
        let mut conflicts = 0;

        for observation in observations {
            if observation.payload.kind() != Some("source_line") {
                continue;
            }
            lines += 1;

            let text = observation.payload.get_str("text").unwrap_or("");
            for pattern in self.code_patterns() {
                let count = pattern.count(text);
                if count == 0 {
                    continue;
                }
                let slot = match pattern.kind() {
                    ElementKind::Agency => &mut agency_indicators,
                    ElementKind::Constraint => &mut constraint_indicators,
                };
                *slot.entry(pattern.name().to_string()).or_insert(0) += count;
            }

            let outcome = self.classify(observation);
            conflicts += outcome.conflicts.len();
            for element in &outcome.elements {
                match element.kind {
                    ElementKind::Agency => agency_lines += 1,
                    ElementKind::Constraint => constraint_lines += 1,
                }
            }
        }

        let mut profile = CodeProfile {
            lines,
            agency_indicators,
            constraint_indicators,
            agency_lines,
            constraint_lines,
            conflicts,
            context: CodeContext::Balanced,
        };
        profile.context = CodeContext::from_totals(profile.total_agency(), profile.total_constraint());
        profile
    }
}
