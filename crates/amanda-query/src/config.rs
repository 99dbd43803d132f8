//! Query evaluator configuration

use amanda_domain::TimeResolution;
use serde::{Deserialize, Serialize};

/// Serializable form of [`TimeResolution`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMode {
    /// The latest matching fact wins
    #[default]
    MostRecent,
    /// Several matching facts are an error
    Strict,
}

impl From<ResolutionMode> for TimeResolution {
    fn from(mode: ResolutionMode) -> Self {
        match mode {
            ResolutionMode::MostRecent => TimeResolution::MostRecent,
            ResolutionMode::Strict => TimeResolution::Strict,
        }
    }
}

impl From<TimeResolution> for ResolutionMode {
    fn from(resolution: TimeResolution) -> Self {
        match resolution {
            TimeResolution::MostRecent => ResolutionMode::MostRecent,
            TimeResolution::Strict => ResolutionMode::Strict,
        }
    }
}

/// Configuration for query evaluation
///
/// # Examples
///
/// ```
/// use amanda_query::{QueryConfig, ResolutionMode};
///
/// let config: QueryConfig = toml::from_str(r#"
///     default_resolution = "strict"
///     point_window_ms = 250
/// "#).unwrap();
/// assert_eq!(config.default_resolution, ResolutionMode::Strict);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Resolution applied to query descriptions that do not name one
    #[serde(default)]
    pub default_resolution: ResolutionMode,

    /// Minimum tolerance (ms) before `at` for point-in-time queries
    #[serde(default)]
    pub point_window_ms: u64,

    /// Distance below which an approach counts as imminent (metres on blueprints)
    #[serde(default = "default_interaction_range")]
    pub interaction_range: f64,

    /// Fraction of a speed limit above which a speed counts as near the limit
    #[serde(default = "default_warning_band")]
    pub warning_band: f64,
}

fn default_interaction_range() -> f64 {
    1.5
}

fn default_warning_band() -> f64 {
    0.95
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_resolution: ResolutionMode::MostRecent,
            point_window_ms: 0,
            interaction_range: default_interaction_range(),
            warning_band: default_warning_band(),
        }
    }
}

impl QueryConfig {
    /// Exact timestamps, ambiguity is an error
    pub fn strict() -> Self {
        Self {
            default_resolution: ResolutionMode::Strict,
            point_window_ms: 0,
            ..Default::default()
        }
    }

    /// One second of tolerance, most recent wins
    pub fn lenient() -> Self {
        Self {
            default_resolution: ResolutionMode::MostRecent,
            point_window_ms: 1_000,
            ..Default::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        const DAY_MS: u64 = 24 * 60 * 60 * 1_000;
        if self.point_window_ms > DAY_MS {
            return Err("point_window_ms must not exceed one day".to_string());
        }
        if !(self.interaction_range.is_finite() && self.interaction_range > 0.0) {
            return Err("interaction_range must be positive".to_string());
        }
        if !(self.warning_band > 0.0 && self.warning_band <= 1.0) {
            return Err("warning_band must be in (0, 1]".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(QueryConfig::default().default_resolution, ResolutionMode::MostRecent);
        assert_eq!(QueryConfig::strict().default_resolution, ResolutionMode::Strict);
        assert!(QueryConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_oversized_window_rejected() {
        let config = QueryConfig {
            point_window_ms: u64::MAX,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_kinematic_settings() {
        let config: QueryConfig = toml::from_str("interaction_range = 2.0").unwrap();
        assert_eq!(config.interaction_range, 2.0);
        assert_eq!(config.warning_band, 0.95);
        assert!(config.validate().is_ok());

        let band = QueryConfig {
            warning_band: 1.5,
            ..Default::default()
        };
        assert!(band.validate().is_err());
    }

    #[test]
    fn test_resolution_conversion() {
        let resolution: TimeResolution = ResolutionMode::Strict.into();
        assert_eq!(resolution, TimeResolution::Strict);
        assert_eq!(ResolutionMode::from(TimeResolution::MostRecent), ResolutionMode::MostRecent);
    }
}
