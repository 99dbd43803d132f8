//! Configuration for the Temporal Correlator

use serde::{Deserialize, Serialize};

/// Configuration for the Temporal Correlator
///
/// # Examples
///
/// ```
/// use amanda_correlator::CorrelatorConfig;
///
/// let config = CorrelatorConfig::default();
/// assert_eq!(config.lateness_ms, 5_000);
///
/// // Emit every observation as soon as it arrives
/// let config = CorrelatorConfig::strict();
/// assert_eq!(config.lateness_ms, 0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelatorConfig {
    /// How long (ms of observation time) an observation is held back waiting
    /// for earlier ones; larger windows tolerate more disorder
    #[serde(default = "default_lateness_ms")]
    pub lateness_ms: u64,

    /// How far behind the newest observation duplicates are still detected
    #[serde(default = "default_dedup_horizon_ms")]
    pub dedup_horizon_ms: u64,

    /// Capacity of the worker's fact channel
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_lateness_ms() -> u64 {
    5_000
}

fn default_dedup_horizon_ms() -> u64 {
    60_000
}

fn default_channel_capacity() -> usize {
    1_024
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self {
            lateness_ms: default_lateness_ms(),
            dedup_horizon_ms: default_dedup_horizon_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl CorrelatorConfig {
    /// No reordering window: anything older than the last fact is late
    pub fn strict() -> Self {
        Self {
            lateness_ms: 0,
            dedup_horizon_ms: 10_000,
            channel_capacity: 256,
        }
    }

    /// Wide window for bursty, badly ordered sources
    pub fn lenient() -> Self {
        Self {
            lateness_ms: 30_000,
            dedup_horizon_ms: 600_000,
            channel_capacity: 4_096,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.dedup_horizon_ms < self.lateness_ms {
            return Err("dedup_horizon_ms must be at least lateness_ms".to_string());
        }
        if self.channel_capacity == 0 {
            return Err("channel_capacity must be greater than 0".to_string());
        }
        Ok(())
    }
}
