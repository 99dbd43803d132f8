//! Engine configuration, one TOML section per stage

use std::path::Path;

use amanda_classifier::ClassifierConfig;
use amanda_correlator::CorrelatorConfig;
use amanda_graph::GraphConfig;
use amanda_ingest::IngestConfig;
use amanda_query::QueryConfig;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Configuration for the whole pipeline
///
/// Every section and every field has a default, so an empty file is valid.
///
/// ```toml
/// [classifier]
/// max_layout_buttons = 64
///
/// [classifier.priorities]
/// constitutional = 5
///
/// [graph]
/// adjacency = "links_only"
///
/// [correlator]
/// lateness_ms = 2000
///
/// [query]
/// default_resolution = "strict"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Ingest normalizer settings
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Classifier settings
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Graph builder settings
    #[serde(default)]
    pub graph: GraphConfig,

    /// Correlator settings
    #[serde(default)]
    pub correlator: CorrelatorConfig,

    /// Query evaluator settings
    #[serde(default)]
    pub query: QueryConfig,
}

impl EngineConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), EngineError> {
        let sections = [
            ("ingest", self.ingest.validate()),
            ("classifier", self.classifier.validate()),
            ("graph", self.graph.validate()),
            ("correlator", self.correlator.validate()),
            ("query", self.query.validate()),
        ];
        for (section, result) in sections {
            result.map_err(|message| EngineError::Config { section, message })?;
        }
        Ok(())
    }
}
