//! Queries and answers

use crate::element::ScopeRef;
use crate::fact::CorrelatedFact;
use crate::observation::Timestamp;

/// Inclusive time range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    /// First millisecond included
    pub start: Timestamp,
    /// Last millisecond included
    pub end: Timestamp,
}

impl TimeRange {
    /// Create a range, normalizing the bound order
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    /// Range covering all time
    pub fn all() -> Self {
        Self {
            start: Timestamp::from_millis(0),
            end: Timestamp::from_millis(u64::MAX),
        }
    }

    /// Check if the range contains a timestamp
    pub fn contains(&self, t: Timestamp) -> bool {
        t >= self.start && t <= self.end
    }
}

/// How a point-in-time query resolves several matching facts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeResolution {
    /// The latest matching fact wins
    MostRecent,

    /// More than one matching fact is an `AmbiguousTime` error
    Strict,
}

impl Default for TimeResolution {
    /// Most recent wins unless the caller asks for strict matching
    fn default() -> Self {
        TimeResolution::MostRecent
    }
}

impl TimeResolution {
    /// Get the resolution name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeResolution::MostRecent => "most_recent",
            TimeResolution::Strict => "strict",
        }
    }
}

impl std::str::FromStr for TimeResolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "most_recent" | "most-recent" | "latest" => Ok(TimeResolution::MostRecent),
            "strict" => Ok(TimeResolution::Strict),
            _ => Err(format!("Invalid time resolution: {}", s)),
        }
    }
}

/// The predicate forms a query can ask
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Was the subject at `node` inside the agency region at `at`?
    StateAt {
        /// Node key
        node: String,
        /// Point in time
        at: Timestamp,
        /// Facts up to this many milliseconds before `at` also match
        window_ms: u64,
        /// How several matches are resolved
        resolution: TimeResolution,
    },

    /// Did an event-observed fact exist for `node` at `at`?
    EventAt {
        /// Node key
        node: String,
        /// Point in time
        at: Timestamp,
        /// Facts up to this many milliseconds before `at` also match
        window_ms: u64,
        /// How several matches are resolved
        resolution: TimeResolution,
    },

    /// Is there an allowed-edge path from `from` to `to`?
    PathExists {
        /// Start node key
        from: String,
        /// Target node key
        to: String,
    },

    /// Was any fact recorded outside the agency region during `range`?
    RegionViolation {
        /// Time range to inspect
        range: TimeRange,
    },

    /// Counts of valid, silent and out-of-region interactions during `range`
    InteractionSummary {
        /// Time range to inspect
        range: TimeRange,
    },

    /// Is a subject at `position` moving at `velocity` about to reach `node`?
    ///
    /// Positions are in the scope's own units (metres for blueprints).
    Approach {
        /// Node key of the target, which must have a region
        node: String,
        /// Current position `(x, y)`
        position: (f64, f64),
        /// Current velocity `(vx, vy)` per second
        velocity: (f64, f64),
    },

    /// Must a vehicle be warned before it enters a speed-limited zone?
    SpeedZone {
        /// Current speed in miles per hour
        speed_mph: f64,
        /// Enforced limit in miles per hour
        limit_mph: f64,
        /// Distance to the zone boundary in metres
        distance_to_zone_m: f64,
        /// Largest safe deceleration in metres per second squared
        max_decel_mps2: f64,
    },
}

impl Predicate {
    /// Short name of the predicate form
    pub fn name(&self) -> &'static str {
        match self {
            Predicate::StateAt { .. } => "state_at",
            Predicate::EventAt { .. } => "event_at",
            Predicate::PathExists { .. } => "path_exists",
            Predicate::RegionViolation { .. } => "region_violation",
            Predicate::InteractionSummary { .. } => "interaction_summary",
            Predicate::Approach { .. } => "approach",
            Predicate::SpeedZone { .. } => "speed_zone",
        }
    }
}

/// A declarative question about one scope
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Caller-supplied identifier, echoed in the answer
    pub id: String,

    /// Scope the question is about
    pub scope_ref: ScopeRef,

    /// What is asked
    pub predicate: Predicate,
}

impl Query {
    /// Create a query
    pub fn new(id: impl Into<String>, scope_ref: ScopeRef, predicate: Predicate) -> Self {
        Self {
            id: id.into(),
            scope_ref,
            predicate,
        }
    }

    /// Exact-time state check with most-recent resolution
    pub fn state_at(id: impl Into<String>, scope_ref: ScopeRef, node: impl Into<String>, at: Timestamp) -> Self {
        Self::new(
            id,
            scope_ref,
            Predicate::StateAt {
                node: node.into(),
                at,
                window_ms: 0,
                resolution: TimeResolution::MostRecent,
            },
        )
    }

    /// Exact-time event check with most-recent resolution
    pub fn event_at(id: impl Into<String>, scope_ref: ScopeRef, node: impl Into<String>, at: Timestamp) -> Self {
        Self::new(
            id,
            scope_ref,
            Predicate::EventAt {
                node: node.into(),
                at,
                window_ms: 0,
                resolution: TimeResolution::MostRecent,
            },
        )
    }

    /// Path-existence check
    pub fn path_exists(
        id: impl Into<String>,
        scope_ref: ScopeRef,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self::new(
            id,
            scope_ref,
            Predicate::PathExists {
                from: from.into(),
                to: to.into(),
            },
        )
    }

    /// Region-violation check
    pub fn region_violation(id: impl Into<String>, scope_ref: ScopeRef, range: TimeRange) -> Self {
        Self::new(id, scope_ref, Predicate::RegionViolation { range })
    }
}

/// Counts behind an interaction summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InteractionSummary {
    /// Inside the agency region, event observed
    pub valid: usize,

    /// Inside the agency region, no event observed
    pub silent: usize,

    /// Outside the agency region
    pub out_of_region: usize,
}

impl InteractionSummary {
    /// Total interactions counted
    pub fn total(&self) -> usize {
        self.valid + self.silent + self.out_of_region
    }
}

/// Where a moving subject stands relative to a target node
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ApproachPrediction {
    /// Distance to the target's region, zero when inside it
    pub distance: f64,

    /// Velocity points toward the target
    pub approaching: bool,

    /// Seconds until the target is reached at the current speed, if moving
    pub time_to_reach_s: Option<f64>,

    /// The target node is Allowed
    pub target_allowed: bool,

    /// Approaching and within interaction range
    pub imminent: bool,
}

/// Speed checked against a limit ahead
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpeedZoneCheck {
    /// Already above the limit
    pub speeding: bool,

    /// Not above the limit but inside the warning band below it
    pub near_limit: bool,

    /// Metres needed to slow below the warning band, when near the limit
    pub stopping_distance_m: Option<f64>,

    /// A warning must be issued
    pub warning_required: bool,
}

/// The value of an answer
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerValue {
    /// Yes/no result
    Bool(bool),

    /// No fact matched, so the state cannot be stated
    NoEvidence,

    /// Enumerated interaction counts
    Summary(InteractionSummary),

    /// Approach toward a node
    Approach(ApproachPrediction),

    /// Speed-zone warning check
    SpeedZone(SpeedZoneCheck),
}

impl AnswerValue {
    /// The boolean value, if this is a yes/no answer
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AnswerValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Whether the answer calls for a cue to the subject
    ///
    /// An imminent approach or a required speed warning does; nothing else.
    pub fn needs_cue(&self) -> bool {
        match self {
            AnswerValue::Approach(p) => p.imminent,
            AnswerValue::SpeedZone(c) => c.warning_required,
            _ => false,
        }
    }
}

/// The result of evaluating a query
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    /// Identifier of the query answered
    pub query_id: String,

    /// Result value
    pub result: AnswerValue,

    /// Facts the result rests on, in timestamp order
    pub supporting_facts: Vec<CorrelatedFact>,
}
