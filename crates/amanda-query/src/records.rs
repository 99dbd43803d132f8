//! Serializable query descriptions

use amanda_domain::{Predicate, Query, ScopeRef, TimeRange, Timestamp};
use serde::{Deserialize, Serialize};

use crate::config::{QueryConfig, ResolutionMode};
use crate::error::QueryError;

/// Predicate part of a [`QueryRecord`], tagged by `predicate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "predicate", rename_all = "snake_case")]
pub enum PredicateRecord {
    /// See [`Predicate::StateAt`]
    StateAt {
        /// Node key
        node: String,
        /// Milliseconds since the epoch
        at: u64,
        /// Tolerance before `at`
        #[serde(default)]
        window_ms: u64,
        /// Falls back to the configured default
        #[serde(default)]
        resolution: Option<ResolutionMode>,
    },
    /// See [`Predicate::EventAt`]
    EventAt {
        /// Node key
        node: String,
        /// Milliseconds since the epoch
        at: u64,
        /// Tolerance before `at`
        #[serde(default)]
        window_ms: u64,
        /// Falls back to the configured default
        #[serde(default)]
        resolution: Option<ResolutionMode>,
    },
    /// See [`Predicate::PathExists`]
    PathExists {
        /// Start node key
        from: String,
        /// Target node key
        to: String,
    },
    /// See [`Predicate::RegionViolation`]
    RegionViolation {
        /// Range start, open when absent
        #[serde(default)]
        start: Option<u64>,
        /// Range end, open when absent
        #[serde(default)]
        end: Option<u64>,
    },
    /// See [`Predicate::InteractionSummary`]
    InteractionSummary {
        /// Range start, open when absent
        #[serde(default)]
        start: Option<u64>,
        /// Range end, open when absent
        #[serde(default)]
        end: Option<u64>,
    },
    /// See [`Predicate::Approach`]
    Approach {
        /// Target node key
        node: String,
        /// Position `[x, y]`
        position: [f64; 2],
        /// Velocity `[vx, vy]` per second
        velocity: [f64; 2],
    },
    /// See [`Predicate::SpeedZone`]
    SpeedZone {
        /// Current speed, mph
        speed_mph: f64,
        /// Enforced limit, mph
        limit_mph: f64,
        /// Distance to the zone, metres
        distance_to_zone_m: f64,
        /// Largest safe deceleration, m/s²
        max_decel_mps2: f64,
    },
}

/// A query as it appears in a JSON query file
///
/// ```json
/// {"id": "q1", "scope": "kiosk-7", "predicate": "path_exists", "from": "button_1", "to": "button_10"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    /// Caller-supplied identifier
    pub id: String,

    /// Scope the query is about
    pub scope: String,

    /// What is asked
    #[serde(flatten)]
    pub predicate: PredicateRecord,
}

impl QueryRecord {
    /// Convert into a [`Query`], filling unspecified resolutions from `config`
    pub fn into_query(self, config: &QueryConfig) -> Result<Query, QueryError> {
        if self.id.trim().is_empty() {
            return Err(QueryError::InvalidQuery("query id must not be empty".to_string()));
        }
        if self.scope.trim().is_empty() {
            return Err(QueryError::InvalidQuery(format!("query {} has no scope", self.id)));
        }

        let resolve = |r: Option<ResolutionMode>| r.unwrap_or(config.default_resolution).into();
        let range = |start: Option<u64>, end: Option<u64>| {
            TimeRange::new(
                Timestamp::from_millis(start.unwrap_or(0)),
                Timestamp::from_millis(end.unwrap_or(u64::MAX)),
            )
        };

        let predicate = match self.predicate {
            PredicateRecord::StateAt {
                node,
                at,
                window_ms,
                resolution,
            } => Predicate::StateAt {
                node,
                at: Timestamp::from_millis(at),
                window_ms,
                resolution: resolve(resolution),
            },
            PredicateRecord::EventAt {
                node,
                at,
                window_ms,
                resolution,
            } => Predicate::EventAt {
                node,
                at: Timestamp::from_millis(at),
                window_ms,
                resolution: resolve(resolution),
            },
            PredicateRecord::PathExists { from, to } => Predicate::PathExists { from, to },
            PredicateRecord::RegionViolation { start, end } => Predicate::RegionViolation {
                range: range(start, end),
            },
            PredicateRecord::InteractionSummary { start, end } => Predicate::InteractionSummary {
                range: range(start, end),
            },
            PredicateRecord::Approach {
                node,
                position: [x, y],
                velocity: [vx, vy],
            } => Predicate::Approach {
                node,
                position: (x, y),
                velocity: (vx, vy),
            },
            PredicateRecord::SpeedZone {
                speed_mph,
                limit_mph,
                distance_to_zone_m,
                max_decel_mps2,
            } => Predicate::SpeedZone {
                speed_mph,
                limit_mph,
                distance_to_zone_m,
                max_decel_mps2,
            },
        };

        Ok(Query::new(self.id, ScopeRef::new(self.scope), predicate))
    }
}

/// Parse a JSON array of query records
pub fn parse_queries(text: &str, config: &QueryConfig) -> Result<Vec<Query>, QueryError> {
    let records: Vec<QueryRecord> =
        serde_json::from_str(text).map_err(|e| QueryError::InvalidQuery(e.to_string()))?;
    records.into_iter().map(|r| r.into_query(config)).collect()
}
