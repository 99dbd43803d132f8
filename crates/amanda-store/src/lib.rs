//! Amanda Storage Layer
//!
//! Implements the `ElementStore` and `FactSink` traits on SQLite.
//!
//! # Architecture
//!
//! - Classified elements are kept per scope so graphs can be rebuilt after a restart
//! - Correlated facts and answers are append-only and exported in timestamp order
//!   for downstream notification and training collaborators
//! - Correlation checkpoints are kept per scope
//! - Classification conflicts are appended as they are found
//!
//! # Examples
//!
//! ```
//! use amanda_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! assert!(store.fact_count().unwrap() == 0);
//! ```

#![warn(missing_docs)]

use std::path::Path;

use amanda_domain::traits::{ElementStore, FactSink};
use amanda_domain::{
    Answer, AnswerValue, ApproachPrediction, ClassificationConflict, SpeedZoneCheck, ConstraintElement, CorrelatedFact, Descriptor, Domain, ElementId, ElementKind,
    FactStatus, InteractionSummary, ObservationId, Region, ScopeRef, TimeRange, Timestamp,
};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

const FACT_COLUMNS: &str =
    "observation_id, subject, timestamp, scope, node, event_observed, within_agency_region, status";

const ANSWER_COLUMNS: &str =
    "result, flag, valid, silent, out_of_region, distance, seconds, approaching, target_allowed, speeding, near_limit";

/// SQLite-based element store and fact/answer export
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Each thread should have its own SqliteStore instance.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a store at `path`
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.conn.execute_batch(include_str!("schema.sql"))?;
        Ok(store)
    }

    /// Look up one element by id
    pub fn get_element(&self, id: ElementId) -> Result<Option<ConstraintElement>, StoreError> {
        load_element(&self.conn, id)
    }

    /// Every recorded fact, optionally for one scope, in timestamp order
    pub fn export_facts(&self, scope: Option<&ScopeRef>) -> Result<Vec<CorrelatedFact>, StoreError> {
        let range = TimeRange::all();
        match scope {
            Some(scope) => self.facts_in_range(scope, range),
            None => {
                let sql = format!("SELECT {} FROM facts ORDER BY timestamp, seq", FACT_COLUMNS);
                let mut stmt = self.conn.prepare(&sql)?;
                let facts = stmt.query_map([], fact_from_row)?.collect::<Result<Vec<_>, _>>()?;
                Ok(facts)
            }
        }
    }

    /// Facts for a scope within an inclusive time range, in timestamp order
    pub fn facts_in_range(&self, scope: &ScopeRef, range: TimeRange) -> Result<Vec<CorrelatedFact>, StoreError> {
        let sql = format!(
            "SELECT {} FROM facts WHERE scope = ?1 AND timestamp >= ?2 AND timestamp <= ?3 ORDER BY timestamp, seq",
            FACT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let facts = stmt
            .query_map(
                params![scope.as_str(), to_sql_time(range.start), to_sql_time(range.end)],
                fact_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(facts)
    }

    /// Number of recorded facts
    pub fn fact_count(&self) -> Result<usize, StoreError> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM facts", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Every recorded answer in the order it was recorded
    pub fn export_answers(&self) -> Result<Vec<Answer>, StoreError> {
        let mut stmt = self.conn.prepare(&format!("SELECT seq, query_id, {} FROM answers ORDER BY seq", ANSWER_COLUMNS))?;
        let headers = stmt
            .query_map([], |row| {
                let seq: i64 = row.get(0)?;
                let query_id: String = row.get(1)?;
                let columns = AnswerColumns {
                    kind: row.get(2)?,
                    flag: row.get(3)?,
                    valid: row.get(4)?,
                    silent: row.get(5)?,
                    out_of_region: row.get(6)?,
                    distance: row.get(7)?,
                    seconds: row.get(8)?,
                    approaching: row.get(9)?,
                    target_allowed: row.get(10)?,
                    speeding: row.get(11)?,
                    near_limit: row.get(12)?,
                };
                let result = columns
                    .into_value()
                    .map_err(|e| conversion(2, Type::Text, e))?;
                Ok((seq, query_id, result))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let sql = format!(
            "SELECT {} FROM answer_facts WHERE answer_seq = ?1 ORDER BY position",
            FACT_COLUMNS
        );
        let mut facts = self.conn.prepare(&sql)?;
        let mut answers = Vec::with_capacity(headers.len());
        for (seq, query_id, result) in headers {
            let supporting_facts = facts
                .query_map(params![seq], fact_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            answers.push(Answer {
                query_id,
                result,
                supporting_facts,
            });
        }
        Ok(answers)
    }

    /// Append classification conflicts
    pub fn record_conflicts(&mut self, conflicts: &[ClassificationConflict]) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO conflicts (observation_id, scope, descriptor, agency_rule, constraint_rule, specificity)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for conflict in conflicts {
                stmt.execute(params![
                    conflict.observation_id.value().to_be_bytes().to_vec(),
                    conflict.scope_ref.as_str(),
                    &conflict.descriptor,
                    &conflict.agency_rule,
                    &conflict.constraint_rule,
                    conflict.specificity as i64,
                ])?;
            }
        }
        tx.commit()?;

        debug!(count = conflicts.len(), "Stored classification conflicts");
        Ok(conflicts.len())
    }

    /// Every recorded conflict in the order it was recorded
    pub fn export_conflicts(&self) -> Result<Vec<ClassificationConflict>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT observation_id, scope, descriptor, agency_rule, constraint_rule, specificity
             FROM conflicts ORDER BY seq",
        )?;
        let conflicts = stmt
            .query_map([], |row| {
                let id: Vec<u8> = row.get(0)?;
                let observation_id = bytes_to_u128(&id)
                    .map(ObservationId::from_value)
                    .map_err(|e| conversion(0, Type::Blob, e))?;
                Ok(ClassificationConflict {
                    observation_id,
                    scope_ref: ScopeRef::new(row.get::<_, String>(1)?),
                    descriptor: row.get(2)?,
                    agency_rule: row.get(3)?,
                    constraint_rule: row.get(4)?,
                    specificity: row.get::<_, i64>(5)? as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(conflicts)
    }

    /// Remember where correlation of a scope should resume
    pub fn save_checkpoint(&mut self, scope: &ScopeRef, resume_at: Timestamp) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO checkpoints (scope, resume_at) VALUES (?1, ?2)
             ON CONFLICT(scope) DO UPDATE SET resume_at = excluded.resume_at",
            params![scope.as_str(), to_sql_time(resume_at)],
        )?;
        Ok(())
    }

    /// Where correlation of a scope should resume, if a checkpoint was saved
    pub fn load_checkpoint(&self, scope: &ScopeRef) -> Result<Option<Timestamp>, StoreError> {
        let resume_at = self
            .conn
            .query_row(
                "SELECT resume_at FROM checkpoints WHERE scope = ?1",
                params![scope.as_str()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(resume_at.map(from_sql_time))
    }
}

impl ElementStore for SqliteStore {
    type Error = StoreError;

    fn put_elements(&mut self, elements: &[ConstraintElement]) -> Result<usize, Self::Error> {
        let tx = self.conn.transaction()?;
        for element in elements {
            let merged = match load_element(&tx, element.id)? {
                Some(mut existing) => {
                    existing.corroborate(element);
                    existing
                }
                None => element.clone(),
            };
            write_element(&tx, &merged)?;
        }
        tx.commit()?;

        debug!(count = elements.len(), "Stored elements");
        Ok(elements.len())
    }

    fn elements_for_scope(&self, scope: &ScopeRef) -> Result<Vec<ConstraintElement>, Self::Error> {
        let mut stmt = self.conn.prepare("SELECT id FROM elements WHERE scope = ?1 ORDER BY id")?;
        let ids = stmt
            .query_map(params![scope.as_str()], |row| {
                let bytes: Vec<u8> = row.get(0)?;
                bytes_to_u128(&bytes).map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Blob, Box::new(e)))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut elements = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(element) = load_element(&self.conn, ElementId::from_value(id))? {
                elements.push(element);
            }
        }
        Ok(elements)
    }

    fn scopes(&self) -> Result<Vec<ScopeRef>, Self::Error> {
        let mut stmt = self.conn.prepare("SELECT DISTINCT scope FROM elements ORDER BY scope")?;
        let scopes = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .map(|scope| scope.map(ScopeRef::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(scopes)
    }
}

impl FactSink for SqliteStore {
    type Error = StoreError;

    fn record_facts(&mut self, facts: &[CorrelatedFact]) -> Result<usize, Self::Error> {
        let tx = self.conn.transaction()?;
        {
            let sql = format!("INSERT INTO facts ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)", FACT_COLUMNS);
            let mut stmt = tx.prepare(&sql)?;
            for fact in facts {
                stmt.execute(params![
                    fact.observation_id.value().to_be_bytes().to_vec(),
                    &fact.subject_ref,
                    to_sql_time(fact.timestamp),
                    fact.scope_ref.as_str(),
                    fact.node_ref.as_deref(),
                    fact.event_observed,
                    fact.within_agency_region,
                    fact.status.as_str(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(facts.len())
    }

    fn record_answer(&mut self, answer: &Answer) -> Result<(), Self::Error> {
        let columns = AnswerColumns::from_value(&answer.result);

        let tx = self.conn.transaction()?;
        tx.execute(
            &format!(
                "INSERT INTO answers (query_id, {}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                ANSWER_COLUMNS
            ),
            params![
                &answer.query_id,
                columns.kind,
                columns.flag,
                columns.valid,
                columns.silent,
                columns.out_of_region,
                columns.distance,
                columns.seconds,
                columns.approaching,
                columns.target_allowed,
                columns.speeding,
                columns.near_limit,
            ],
        )?;
        let seq = tx.last_insert_rowid();
        {
            let sql = format!(
                "INSERT INTO answer_facts (answer_seq, position, {}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                FACT_COLUMNS
            );
            let mut stmt = tx.prepare(&sql)?;
            for (position, fact) in answer.supporting_facts.iter().enumerate() {
                stmt.execute(params![
                    seq,
                    position as i64,
                    fact.observation_id.value().to_be_bytes().to_vec(),
                    &fact.subject_ref,
                    to_sql_time(fact.timestamp),
                    fact.scope_ref.as_str(),
                    fact.node_ref.as_deref(),
                    fact.event_observed,
                    fact.within_agency_region,
                    fact.status.as_str(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

/// Timestamps beyond `i64::MAX` clamp to it, so range bounds such as
/// `TimeRange::all()` keep their meaning and stored rows keep their order
fn to_sql_time(t: Timestamp) -> i64 {
    i64::try_from(t.as_millis()).unwrap_or(i64::MAX)
}

fn from_sql_time(v: i64) -> Timestamp {
    Timestamp::from_millis(u64::try_from(v).unwrap_or(0))
}

fn bytes_to_u128(bytes: &[u8]) -> Result<u128, StoreError> {
    let arr: [u8; 16] = bytes
        .try_into()
        .map_err(|_| StoreError::InvalidData(format!("Expected 16 bytes for an id, got {}", bytes.len())))?;
    Ok(u128::from_be_bytes(arr))
}

fn conversion(idx: usize, ty: Type, e: StoreError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(e))
}

fn fact_from_row(row: &Row<'_>) -> rusqlite::Result<CorrelatedFact> {
    let id: Vec<u8> = row.get(0)?;
    let observation_id = bytes_to_u128(&id)
        .map(ObservationId::from_value)
        .map_err(|e| conversion(0, Type::Blob, e))?;
    let status: String = row.get(7)?;
    let status = FactStatus::parse(&status)
        .ok_or_else(|| conversion(7, Type::Text, StoreError::InvalidData(format!("Unknown fact status: {}", status))))?;

    Ok(CorrelatedFact {
        observation_id,
        subject_ref: row.get(1)?,
        timestamp: from_sql_time(row.get(2)?),
        scope_ref: ScopeRef::new(row.get::<_, String>(3)?),
        node_ref: row.get(4)?,
        event_observed: row.get(5)?,
        within_agency_region: row.get(6)?,
        status,
    })
}

/// One answer row, minus its id and supporting facts
///
/// `flag` holds the yes/no value, the imminence of an approach or whether a
/// speed warning is due.
#[derive(Debug, Default)]
struct AnswerColumns {
    kind: String,
    flag: Option<bool>,
    valid: Option<i64>,
    silent: Option<i64>,
    out_of_region: Option<i64>,
    distance: Option<f64>,
    seconds: Option<f64>,
    approaching: Option<bool>,
    target_allowed: Option<bool>,
    speeding: Option<bool>,
    near_limit: Option<bool>,
}

impl AnswerColumns {
    fn from_value(value: &AnswerValue) -> Self {
        match value {
            AnswerValue::Bool(b) => Self {
                kind: "bool".to_string(),
                flag: Some(*b),
                ..Default::default()
            },
            AnswerValue::NoEvidence => Self {
                kind: "no_evidence".to_string(),
                ..Default::default()
            },
            AnswerValue::Summary(summary) => Self {
                kind: "summary".to_string(),
                valid: Some(summary.valid as i64),
                silent: Some(summary.silent as i64),
                out_of_region: Some(summary.out_of_region as i64),
                ..Default::default()
            },
            AnswerValue::Approach(p) => Self {
                kind: "approach".to_string(),
                flag: Some(p.imminent),
                distance: Some(p.distance),
                seconds: p.time_to_reach_s,
                approaching: Some(p.approaching),
                target_allowed: Some(p.target_allowed),
                ..Default::default()
            },
            AnswerValue::SpeedZone(c) => Self {
                kind: "speed_zone".to_string(),
                flag: Some(c.warning_required),
                distance: c.stopping_distance_m,
                speeding: Some(c.speeding),
                near_limit: Some(c.near_limit),
                ..Default::default()
            },
        }
    }

    fn into_value(self) -> Result<AnswerValue, StoreError> {
        let malformed = || StoreError::InvalidData(format!("Malformed answer row of kind {}", self.kind));
        match self.kind.as_str() {
            "bool" => self.flag.map(AnswerValue::Bool).ok_or_else(malformed),
            "no_evidence" => Ok(AnswerValue::NoEvidence),
            "summary" => match (self.valid, self.silent, self.out_of_region) {
                (Some(valid), Some(silent), Some(out_of_region)) => Ok(AnswerValue::Summary(InteractionSummary {
                    valid: valid as usize,
                    silent: silent as usize,
                    out_of_region: out_of_region as usize,
                })),
                _ => Err(malformed()),
            },
            "approach" => match (self.flag, self.distance, self.approaching, self.target_allowed) {
                (Some(imminent), Some(distance), Some(approaching), Some(target_allowed)) => {
                    Ok(AnswerValue::Approach(ApproachPrediction {
                        distance,
                        approaching,
                        time_to_reach_s: self.seconds,
                        target_allowed,
                        imminent,
                    }))
                }
                _ => Err(malformed()),
            },
            "speed_zone" => match (self.flag, self.speeding, self.near_limit) {
                (Some(warning_required), Some(speeding), Some(near_limit)) => Ok(AnswerValue::SpeedZone(SpeedZoneCheck {
                    speeding,
                    near_limit,
                    stopping_distance_m: self.distance,
                    warning_required,
                })),
                _ => Err(malformed()),
            },
            _ => Err(malformed()),
        }
    }
}

fn load_element(conn: &Connection, id: ElementId) -> Result<Option<ConstraintElement>, StoreError> {
    let id_bytes = id.value().to_be_bytes().to_vec();

    let row = conn
        .query_row(
            "SELECT scope, domain, kind, descriptor, x0, y0, x1, y1, priority FROM elements WHERE id = ?1",
            params![&id_bytes],
            |row| {
                let domain: String = row.get(1)?;
                let domain = Domain::parse(&domain).ok_or_else(|| {
                    conversion(1, Type::Text, StoreError::InvalidData(format!("Unknown domain: {}", domain)))
                })?;
                let kind: String = row.get(2)?;
                let kind = ElementKind::parse(&kind).ok_or_else(|| {
                    conversion(2, Type::Text, StoreError::InvalidData(format!("Unknown element kind: {}", kind)))
                })?;
                let corners: (Option<f64>, Option<f64>, Option<f64>, Option<f64>) =
                    (row.get(4)?, row.get(5)?, row.get(6)?, row.get(7)?);
                let region = match corners {
                    (Some(x0), Some(y0), Some(x1), Some(y1)) => Some(Region::new(x0, y0, x1, y1)),
                    _ => None,
                };
                Ok((
                    ScopeRef::new(row.get::<_, String>(0)?),
                    domain,
                    kind,
                    Descriptor {
                        key: row.get(3)?,
                        region,
                        links: Vec::new(),
                    },
                    row.get::<_, u8>(8)?,
                ))
            },
        )
        .optional()?;

    let Some((scope_ref, domain, kind, mut descriptor, priority)) = row else {
        return Ok(None);
    };

    let mut links = conn.prepare("SELECT link FROM element_links WHERE element_id = ?1 ORDER BY link")?;
    descriptor.links = links
        .query_map(params![&id_bytes], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut sources = conn.prepare("SELECT observation_id FROM element_sources WHERE element_id = ?1")?;
    let mut sources = sources
        .query_map(params![&id_bytes], |row| {
            let bytes: Vec<u8> = row.get(0)?;
            bytes_to_u128(&bytes)
                .map(ObservationId::from_value)
                .map_err(|e| conversion(0, Type::Blob, e))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    sources.sort();

    Ok(Some(ConstraintElement {
        id,
        domain,
        kind,
        scope_ref,
        descriptor,
        priority,
        sources,
    }))
}

fn write_element(conn: &Connection, element: &ConstraintElement) -> Result<(), StoreError> {
    let id_bytes = element.id.value().to_be_bytes().to_vec();
    let region = element.descriptor.region;

    conn.execute(
        "INSERT INTO elements (id, scope, domain, kind, descriptor, x0, y0, x1, y1, priority)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT(id) DO UPDATE SET
         x0 = excluded.x0, y0 = excluded.y0, x1 = excluded.x1, y1 = excluded.y1,
         priority = excluded.priority",
        params![
            &id_bytes,
            element.scope_ref.as_str(),
            element.domain.as_str(),
            element.kind.as_str(),
            element.key(),
            region.map(|r| r.x0),
            region.map(|r| r.y0),
            region.map(|r| r.x1),
            region.map(|r| r.y1),
            element.priority,
        ],
    )?;

    for link in &element.descriptor.links {
        conn.execute(
            "INSERT OR IGNORE INTO element_links (element_id, link) VALUES (?1, ?2)",
            params![&id_bytes, link],
        )?;
    }
    for source in &element.sources {
        conn.execute(
            "INSERT OR IGNORE INTO element_sources (element_id, observation_id) VALUES (?1, ?2)",
            params![&id_bytes, source.value().to_be_bytes().to_vec()],
        )?;
    }
    Ok(())
}
