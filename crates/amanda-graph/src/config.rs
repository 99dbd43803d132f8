//! Graph builder configuration

use serde::{Deserialize, Serialize};

/// Which built-in adjacency function the builder uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdjacencyMode {
    /// Explicit links, plus touching regions
    #[default]
    Standard,
    /// Explicit links only
    LinksOnly,
}

/// Configuration for structural graph construction
///
/// # Examples
///
/// ```
/// use amanda_graph::GraphConfig;
///
/// let config: GraphConfig = toml::from_str("region_tolerance = 0.5").unwrap();
/// assert_eq!(config.region_tolerance, 0.5);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Gap (in scope units) still treated as touching when comparing regions
    #[serde(default)]
    pub region_tolerance: f64,

    /// Adjacency function
    #[serde(default)]
    pub adjacency: AdjacencyMode,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            region_tolerance: 0.0,
            adjacency: AdjacencyMode::Standard,
        }
    }
}

impl GraphConfig {
    /// Only explicit links create edges
    pub fn links_only() -> Self {
        Self {
            region_tolerance: 0.0,
            adjacency: AdjacencyMode::LinksOnly,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.region_tolerance.is_finite() || self.region_tolerance < 0.0 {
            return Err("region_tolerance must be a non-negative number".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GraphConfig::default();
        assert_eq!(config.adjacency, AdjacencyMode::Standard);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let config = GraphConfig {
            region_tolerance: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_adjacency_mode() {
        let config: GraphConfig = toml::from_str(r#"adjacency = "links_only""#).unwrap();
        assert_eq!(config.adjacency, AdjacencyMode::LinksOnly);
    }
}
