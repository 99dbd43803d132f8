//! Configuration for the ingest normalizer

use serde::{Deserialize, Serialize};

/// Configuration for the ingest normalizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Maximum number of flattened payload attributes per record
    #[serde(default = "default_max_payload_attrs")]
    pub max_payload_attrs: usize,

    /// Source used when a record omits `source_ref`
    #[serde(default = "default_source_ref")]
    pub default_source_ref: String,

    /// Source lines longer than this (characters) are skipped
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,

    /// Skip blank and whitespace-only source lines
    #[serde(default = "default_skip_blank_lines")]
    pub skip_blank_lines: bool,
}

fn default_max_payload_attrs() -> usize {
    256
}

fn default_source_ref() -> String {
    "unknown".to_string()
}

fn default_max_line_length() -> usize {
    2_000
}

fn default_skip_blank_lines() -> bool {
    true
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_payload_attrs: default_max_payload_attrs(),
            default_source_ref: default_source_ref(),
            max_line_length: default_max_line_length(),
            skip_blank_lines: default_skip_blank_lines(),
        }
    }
}

impl IngestConfig {
    /// Strict preset: small payloads, records must carry their own source
    pub fn strict() -> Self {
        Self {
            max_payload_attrs: 64,
            default_source_ref: String::new(),
            max_line_length: 500,
            skip_blank_lines: true,
        }
    }

    /// Lenient preset: large payloads, every source line kept
    pub fn lenient() -> Self {
        Self {
            max_payload_attrs: 4_096,
            default_source_ref: default_source_ref(),
            max_line_length: 20_000,
            skip_blank_lines: false,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_payload_attrs == 0 {
            return Err("max_payload_attrs must be greater than 0".to_string());
        }
        if self.max_line_length == 0 {
            return Err("max_line_length must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(IngestConfig::default().validate().is_ok());
        assert!(IngestConfig::strict().validate().is_ok());
        assert!(IngestConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = IngestConfig::from_toml("max_line_length = 80").unwrap();
        assert_eq!(config.max_line_length, 80);
        assert_eq!(config.max_payload_attrs, 256);
        assert!(config.skip_blank_lines);
    }

    #[test]
    fn test_zero_limits_rejected() {
        let config = IngestConfig {
            max_payload_attrs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
