//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use amanda_classifier::CodeProfile;
use amanda_domain::{Answer, AnswerValue, CorrelatedFact};
use amanda_engine::RunReport;
use amanda_query::QueryError;
use colored::*;
use serde_json::{json, Value};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// A query id with its answer or the reason it has none.
pub type AnswerRow = (String, std::result::Result<Answer, QueryError>);

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Selected output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format a pipeline run report.
    pub fn format_run_report(&self, report: &RunReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&run_report_json(report))?),
            OutputFormat::Quiet => Ok(report.correlation.facts.to_string()),
            OutputFormat::Table => Ok(self.run_report_table(report)),
        }
    }

    fn run_report_table(&self, report: &RunReport) -> String {
        let mut builder = Builder::default();
        builder.push_record(["Stage", "Count"]);
        let rows = [
            ("observations", report.observations),
            ("rejected records", report.ingest_failures.len()),
            ("structural observations", report.structural),
            ("elements", report.elements),
            ("classification conflicts", report.conflicts.len()),
            ("graphs built", report.build.built.len()),
            ("graphs rejected", report.build.failed.len()),
            ("facts", report.correlation.facts),
            ("unknown scope", report.correlation.unknown_scope),
        ];
        for (stage, count) in rows {
            builder.push_record([stage.to_string(), count.to_string()]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        let mut lines = vec![table.to_string()];
        for failure in &report.ingest_failures {
            lines.push(self.warning(&format!("record {} rejected: {}", failure.index, failure.reason)));
        }
        for conflict in &report.conflicts {
            lines.push(self.warning(&format!(
                "{} in {}: {} and {} disagree, tagged constraint",
                conflict.descriptor, conflict.scope_ref, conflict.agency_rule, conflict.constraint_rule
            )));
        }
        for (scope, error) in &report.build.failed {
            lines.push(self.error(&format!("scope {}: {}", scope, error)));
        }
        for (scope, error) in &report.correlation.failed {
            lines.push(self.error(&format!("correlation of {} failed: {}", scope, error)));
        }
        if report.correlation.cancelled() {
            lines.push(self.warning("correlation was cancelled"));
        }
        lines.join("\n")
    }

    /// Format query answers.
    pub fn format_answers(&self, rows: &[AnswerRow]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let values: Vec<Value> = rows.iter().map(|(id, outcome)| answer_row_json(id, outcome)).collect();
                Ok(serde_json::to_string_pretty(&values)?)
            }
            OutputFormat::Quiet => Ok(rows
                .iter()
                .map(|(id, outcome)| match outcome {
                    Ok(answer) => format!("{}\t{}", id, answer_text(&answer.result)),
                    Err(e) => format!("{}\terror: {}", id, e),
                })
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => Ok(self.answers_table(rows)),
        }
    }

    fn answers_table(&self, rows: &[AnswerRow]) -> String {
        if rows.is_empty() {
            return self.colorize("No answers.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record(["Query", "Result", "Supporting facts"]);
        for (id, outcome) in rows {
            match outcome {
                Ok(answer) => builder.push_record([
                    id.clone(),
                    self.answer_cell(&answer.result),
                    answer.supporting_facts.len().to_string(),
                ]),
                Err(e) => builder.push_record([id.clone(), self.colorize(&e.to_string(), "red"), "-".to_string()]),
            }
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    fn answer_cell(&self, value: &AnswerValue) -> String {
        let text = answer_text(value);
        match value {
            AnswerValue::Bool(true) => self.colorize(&text, "green"),
            AnswerValue::Bool(false) => self.colorize(&text, "red"),
            AnswerValue::NoEvidence => self.colorize(&text, "yellow"),
            AnswerValue::Summary(_) => text,
            AnswerValue::Approach(_) | AnswerValue::SpeedZone(_) if value.needs_cue() => self.colorize(&text, "red"),
            AnswerValue::Approach(_) | AnswerValue::SpeedZone(_) => text,
        }
    }

    /// Format correlated facts.
    pub fn format_facts(&self, facts: &[CorrelatedFact]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let values: Vec<Value> = facts.iter().map(fact_json).collect();
                Ok(serde_json::to_string_pretty(&values)?)
            }
            OutputFormat::Quiet => Ok(facts
                .iter()
                .map(|f| f.observation_id.to_string())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if facts.is_empty() {
                    return Ok(self.colorize("No facts found.", "yellow"));
                }

                let mut builder = Builder::default();
                builder.push_record(["Time", "Scope", "Subject", "Node", "Event", "In region", "Status"]);
                for fact in facts {
                    builder.push_record([
                        fact.timestamp.as_millis().to_string(),
                        fact.scope_ref.to_string(),
                        fact.subject_ref.clone(),
                        fact.node_ref.clone().unwrap_or_else(|| "-".to_string()),
                        fact.event_observed.to_string(),
                        fact.within_agency_region.to_string(),
                        fact.status.as_str().to_string(),
                    ]);
                }

                let mut table = builder.build();
                table
                    .with(Style::rounded())
                    .with(Modify::new(Rows::first()).with(Alignment::center()));
                Ok(table.to_string())
            }
        }
    }

    /// Format per-file code profiles.
    pub fn format_profiles(&self, profiles: &[(String, CodeProfile)]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let values: Vec<Value> = profiles
                    .iter()
                    .map(|(file, profile)| profile_json(file, profile))
                    .collect();
                Ok(serde_json::to_string_pretty(&values)?)
            }
            OutputFormat::Quiet => Ok(profiles
                .iter()
                .map(|(file, profile)| format!("{}\t{}", file, profile.context.as_str()))
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["File", "Lines", "Agency", "Constraint", "Conflicts", "Context"]);
                for (file, profile) in profiles {
                    builder.push_record([
                        file.clone(),
                        profile.lines.to_string(),
                        format!("{} ({} matches)", profile.agency_lines, profile.total_agency()),
                        format!("{} ({} matches)", profile.constraint_lines, profile.total_constraint()),
                        profile.conflicts.to_string(),
                        profile.context.as_str().to_string(),
                    ]);
                }

                let mut table = builder.build();
                table
                    .with(Style::rounded())
                    .with(Modify::new(Rows::first()).with(Alignment::center()));
                Ok(table.to_string())
            }
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

/// Human-readable answer value.
pub fn answer_text(value: &AnswerValue) -> String {
    match value {
        AnswerValue::Bool(b) => b.to_string(),
        AnswerValue::NoEvidence => "no evidence".to_string(),
        AnswerValue::Summary(s) => format!(
            "valid={} silent={} out_of_region={}",
            s.valid, s.silent, s.out_of_region
        ),
        AnswerValue::Approach(p) => {
            let eta = p
                .time_to_reach_s
                .map(|t| format!("{:.1}s", t))
                .unwrap_or_else(|| "-".to_string());
            format!(
                "distance={:.2} approaching={} eta={} allowed={} imminent={}",
                p.distance, p.approaching, eta, p.target_allowed, p.imminent
            )
        }
        AnswerValue::SpeedZone(c) => {
            let stopping = c
                .stopping_distance_m
                .map(|d| format!("{:.1}m", d))
                .unwrap_or_else(|| "-".to_string());
            format!(
                "speeding={} near_limit={} stopping={} warn={}",
                c.speeding, c.near_limit, stopping, c.warning_required
            )
        }
    }
}

/// JSON form of a correlated fact.
pub fn fact_json(fact: &CorrelatedFact) -> Value {
    json!({
        "observation_id": fact.observation_id.to_string(),
        "subject_ref": fact.subject_ref,
        "timestamp": fact.timestamp.as_millis(),
        "scope_ref": fact.scope_ref.to_string(),
        "node_ref": fact.node_ref,
        "event_observed": fact.event_observed,
        "within_agency_region": fact.within_agency_region,
        "status": fact.status.as_str(),
    })
}

fn answer_value_json(value: &AnswerValue) -> Value {
    match value {
        AnswerValue::Bool(b) => json!(b),
        AnswerValue::NoEvidence => json!("no_evidence"),
        AnswerValue::Summary(s) => json!({
            "valid": s.valid,
            "silent": s.silent,
            "out_of_region": s.out_of_region,
        }),
        AnswerValue::Approach(p) => json!({
            "distance": p.distance,
            "approaching": p.approaching,
            "time_to_reach_s": p.time_to_reach_s,
            "target_allowed": p.target_allowed,
            "imminent": p.imminent,
        }),
        AnswerValue::SpeedZone(c) => json!({
            "speeding": c.speeding,
            "near_limit": c.near_limit,
            "stopping_distance_m": c.stopping_distance_m,
            "warning_required": c.warning_required,
        }),
    }
}

fn answer_row_json(id: &str, outcome: &std::result::Result<Answer, QueryError>) -> Value {
    match outcome {
        Ok(answer) => json!({
            "query_id": id,
            "result": answer_value_json(&answer.result),
            "supporting_facts": answer.supporting_facts.iter().map(fact_json).collect::<Vec<_>>(),
        }),
        Err(e) => json!({
            "query_id": id,
            "error": e.to_string(),
        }),
    }
}

fn run_report_json(report: &RunReport) -> Value {
    let graphs: serde_json::Map<String, Value> = report
        .build
        .built
        .iter()
        .map(|(scope, version)| (scope.to_string(), json!(version)))
        .collect();
    let rejected: serde_json::Map<String, Value> = report
        .build
        .failed
        .iter()
        .map(|(scope, e)| (scope.to_string(), json!(e.to_string())))
        .collect();
    let correlation: serde_json::Map<String, Value> = report
        .correlation
        .scopes
        .iter()
        .map(|(scope, worker)| {
            (
                scope.to_string(),
                json!({
                    "resume_at": worker.checkpoint.resume_at.as_millis(),
                    "received": worker.metrics.received,
                    "emitted": worker.metrics.emitted,
                    "late": worker.metrics.late,
                    "duplicates": worker.metrics.duplicates,
                    "outside_region": worker.metrics.outside_region,
                    "cancelled": worker.cancelled,
                }),
            )
        })
        .collect();

    let correlation_failures: serde_json::Map<String, Value> = report
        .correlation
        .failed
        .iter()
        .map(|(scope, e)| (scope.to_string(), json!(e)))
        .collect();

    json!({
        "observations": report.observations,
        "ingest_failures": report
            .ingest_failures
            .iter()
            .map(|f| json!({"index": f.index, "reason": f.reason}))
            .collect::<Vec<_>>(),
        "structural": report.structural,
        "elements": report.elements,
        "conflicts": report
            .conflicts
            .iter()
            .map(|c| json!({
                "observation_id": c.observation_id.to_string(),
                "scope": c.scope_ref.to_string(),
                "descriptor": c.descriptor,
                "agency_rule": c.agency_rule,
                "constraint_rule": c.constraint_rule,
                "specificity": c.specificity,
            }))
            .collect::<Vec<_>>(),
        "graphs": graphs,
        "rejected_scopes": rejected,
        "correlation": correlation,
        "correlation_failures": correlation_failures,
        "unknown_scope": report.correlation.unknown_scope,
        "facts": report.correlation.facts,
    })
}

fn profile_json(file: &str, profile: &CodeProfile) -> Value {
    json!({
        "file": file,
        "lines": profile.lines,
        "agency_lines": profile.agency_lines,
        "constraint_lines": profile.constraint_lines,
        "conflicts": profile.conflicts,
        "agency_indicators": profile.agency_indicators,
        "constraint_indicators": profile.constraint_indicators,
        "context": profile.context.as_str(),
        "score": profile.context.score(),
    })
}
