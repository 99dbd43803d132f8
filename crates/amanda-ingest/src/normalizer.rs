//! Raw records into observations

use amanda_domain::{AttrValue, Domain, Observation, ObservationId, Payload, Timestamp};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::types::{IngestBatch, IngestFailure, RawRecord};

/// Converts heterogeneous inbound records into uniform observations
///
/// Stateless: the same record always normalizes to the same observation
/// (apart from a fresh id when the source supplies none).
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: IngestConfig,
}

impl Normalizer {
    /// Create a normalizer
    pub fn new(config: IngestConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Normalize one record
    pub fn normalize(&self, record: &RawRecord) -> Result<Observation, IngestError> {
        let domain = Domain::parse(&record.domain)
            .ok_or_else(|| IngestError::UnknownDomain(record.domain.clone()))?;

        if record.subject_ref.trim().is_empty() {
            return Err(IngestError::MissingField("subject_ref"));
        }

        if record.timestamp > Timestamp::MAX_ACCEPTED {
            return Err(IngestError::InvalidFormat(format!(
                "timestamp {} is beyond {}",
                record.timestamp,
                Timestamp::MAX_ACCEPTED
            )));
        }

        let source_ref = match record.source_ref.as_deref() {
            Some(source) if !source.trim().is_empty() => source.to_string(),
            _ if !self.config.default_source_ref.is_empty() => self.config.default_source_ref.clone(),
            _ => return Err(IngestError::MissingField("source_ref")),
        };

        let payload = flatten_payload(&record.payload)?;
        if payload.len() > self.config.max_payload_attrs {
            return Err(IngestError::PayloadTooLarge(
                payload.len(),
                self.config.max_payload_attrs,
            ));
        }

        let observation = Observation::new(
            domain,
            record.subject_ref.clone(),
            Timestamp::from_millis(record.timestamp),
            payload,
            source_ref,
        );

        match &record.id {
            Some(id) => {
                let id = ObservationId::from_string(id).map_err(IngestError::InvalidFormat)?;
                Ok(observation.with_id(id))
            }
            None => Ok(observation),
        }
    }

    /// Normalize a batch; failures are collected, not fatal
    pub fn normalize_batch(&self, records: &[RawRecord]) -> IngestBatch {
        let mut batch = IngestBatch::default();
        for (index, record) in records.iter().enumerate() {
            match self.normalize(record) {
                Ok(observation) => batch.observations.push(observation),
                Err(e) => {
                    warn!("Record {} rejected: {}", index, e);
                    batch.failures.push(IngestFailure {
                        index,
                        reason: e.to_string(),
                    });
                }
            }
        }
        debug!(
            accepted = batch.observations.len(),
            rejected = batch.failures.len(),
            "Normalized batch"
        );
        batch
    }

    /// Parse and normalize records from text
    ///
    /// Accepts either a JSON array of records or one JSON record per line.
    /// For JSON lines, failure indices are 1-based line numbers.
    pub fn parse_records(&self, text: &str) -> Result<IngestBatch, IngestError> {
        if text.trim_start().starts_with('[') {
            let records: Vec<RawRecord> = serde_json::from_str(text)?;
            return Ok(self.normalize_batch(&records));
        }
        Ok(self.parse_json_lines(text))
    }

    /// Normalize newline-delimited JSON records
    pub fn parse_json_lines(&self, text: &str) -> IngestBatch {
        let mut batch = IngestBatch::default();
        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            if line.trim().is_empty() {
                continue;
            }
            let result = serde_json::from_str::<RawRecord>(line)
                .map_err(IngestError::from)
                .and_then(|record| self.normalize(&record));
            match result {
                Ok(observation) => batch.observations.push(observation),
                Err(e) => {
                    warn!("Line {} rejected: {}", line_no, e);
                    batch.failures.push(IngestFailure {
                        index: line_no,
                        reason: e.to_string(),
                    });
                }
            }
        }
        batch
    }
}

/// Flatten a JSON payload into dotted attribute paths
///
/// Objects nest as `outer.inner`, arrays as `list.0`, `list.1`. Nulls are
/// dropped. A missing payload is an empty one.
pub fn flatten_payload(value: &Value) -> Result<Payload, IngestError> {
    let mut payload = Payload::new();
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (key, value) in map {
                flatten_into(&mut payload, key.clone(), value);
            }
        }
        other => {
            return Err(IngestError::InvalidFormat(format!(
                "payload must be an object, got {}",
                json_type(other)
            )))
        }
    }
    Ok(payload)
}

fn flatten_into(payload: &mut Payload, path: String, value: &Value) {
    match value {
        Value::Null => {}
        Value::Bool(b) => payload.insert(path, AttrValue::Bool(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                payload.insert(path, AttrValue::Int(i));
            } else if let Some(f) = n.as_f64() {
                payload.insert(path, AttrValue::Float(f));
            }
        }
        Value::String(s) => payload.insert(path, AttrValue::Text(s.clone())),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten_into(payload, format!("{}.{}", path, i), item);
            }
        }
        Value::Object(map) => {
            for (key, value) in map {
                flatten_into(payload, format!("{}.{}", path, key), value);
            }
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    proptest! {
        /// Property: normalizing is a pure transformation of the record
        #[test]
        fn test_normalize_is_deterministic(
            subject in "[a-z]{1,8}",
            ts in 0u64..1_000_000,
            x in -1_000i64..1_000,
            label in "[a-z_]{1,10}",
        ) {
            let raw = RawRecord {
                id: Some(ObservationId::from_value(7).to_string()),
                domain: "digital".to_string(),
                subject_ref: subject,
                timestamp: ts,
                payload: json!({"x": x, "descriptor": label}),
                source_ref: Some("src".to_string()),
            };
            let normalizer = Normalizer::default();
            prop_assert_eq!(normalizer.normalize(&raw).unwrap(), normalizer.normalize(&raw).unwrap());
        }
    }
}
