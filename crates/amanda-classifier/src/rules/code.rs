//! Source-code patterns
//!
//! Definitions and free assignments read as Agency; hardcoded limits, option
//! and permission checks and fixed branching read as Constraint.

use amanda_domain::observation::keys;
use amanda_domain::traits::{ClassificationRule, RuleMatch};
use amanda_domain::{Descriptor, Domain, ElementKind, Observation};
use regex::{Regex, RegexBuilder};

use crate::ClassifierError;

const PATTERNS: [(&str, ElementKind, &str); 6] = [
    ("code.definition", ElementKind::Agency, r"(def\s+|class\s+|function\s+)"),
    ("code.assignment", ElementKind::Agency, r"[a-zA-Z_][a-zA-Z0-9_]*\s*=\s*.*"),
    ("code.type_declaration", ElementKind::Agency, r"(type\s+|interface\s+|struct\s+)"),
    (
        "code.hardcoded_limit",
        ElementKind::Constraint,
        r"range\((\d+)\)|limit\s*=\s*(\d+)|max_items\s*=\s*(\d+)",
    ),
    (
        "code.option_check",
        ElementKind::Constraint,
        r"(config\s*\.|options\s*\.|check_permission|is_valid)",
    ),
    (
        "code.fixed_branch",
        ElementKind::Constraint,
        r#"if\s+\S+\s*in\s*\[.*\]|if\s+\S+\s*==\s*['"]"#,
    ),
];

/// One case-insensitive pattern over `source_line` text
#[derive(Debug, Clone)]
pub struct CodePattern {
    name: String,
    kind: ElementKind,
    regex: Regex,
}

impl CodePattern {
    /// Compile a pattern
    pub fn new(name: impl Into<String>, kind: ElementKind, pattern: &str) -> Result<Self, ClassifierError> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self {
            name: name.into(),
            kind,
            regex,
        })
    }

    /// Agency or Constraint
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Number of non-overlapping matches in `text`
    pub fn count(&self, text: &str) -> usize {
        self.regex.find_iter(text).count()
    }

    /// Length of the longest match in `text`
    pub fn longest(&self, text: &str) -> Option<usize> {
        self.regex.find_iter(text).map(|m| m.as_str().len()).max()
    }
}

impl ClassificationRule for CodePattern {
    fn name(&self) -> &str {
        &self.name
    }

    fn domain(&self) -> Domain {
        Domain::Digital
    }

    fn apply(&self, observation: &Observation) -> Vec<RuleMatch> {
        let payload = &observation.payload;
        if payload.kind() != Some("source_line") {
            return Vec::new();
        }
        let (Some(text), Some(label)) = (payload.get_str("text"), payload.get_str(keys::DESCRIPTOR)) else {
            return Vec::new();
        };

        match self.longest(text) {
            Some(specificity) => vec![RuleMatch {
                kind: self.kind,
                scope_ref: observation.scope_ref(),
                descriptor: Descriptor::logical(label),
                specificity,
            }],
            None => Vec::new(),
        }
    }
}

/// The built-in code patterns
pub fn code_patterns() -> Result<Vec<CodePattern>, ClassifierError> {
    PATTERNS
        .iter()
        .map(|(name, kind, pattern)| CodePattern::new(*name, *kind, pattern))
        .collect()
}
