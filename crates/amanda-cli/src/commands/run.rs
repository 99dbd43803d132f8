//! Run command implementation.

use crate::cli::RunArgs;
use crate::commands::restore_engine;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::{AnswerRow, Formatter};
use amanda_domain::traits::{ElementStore, FactSink};
use amanda_domain::{ConstraintElement, CorrelatedFact, ScopeRef, Timestamp};
use amanda_engine::{Engine, RunReport};
use amanda_ingest::{layout_observation, touch_observations, IngestBatch, Touch, TouchLayout};
use amanda_query::parse_queries;
use amanda_store::SqliteStore;
use std::fs;
use std::path::Path;
use tracing::info;

/// Everything a run produced.
pub struct RunOutcome {
    /// Pipeline report
    pub report: RunReport,

    /// Answers to the queries, in file order
    pub answers: Vec<AnswerRow>,
}

/// Execute the run command.
pub async fn execute_run(args: RunArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let outcome = run_pipeline(&args, config).await?;

    println!("{}", formatter.format_run_report(&outcome.report)?);
    if args.queries.is_some() {
        println!("{}", formatter.format_answers(&outcome.answers)?);
    }

    Ok(())
}

/// Run the pipeline over the inputs named in `args`.
///
/// With a database, stored graphs and checkpoints are restored first and the
/// updated elements, new facts, classification conflicts, checkpoints and
/// answers are written back.
pub async fn run_pipeline(args: &RunArgs, config: &Config) -> Result<RunOutcome> {
    if args.records.is_empty() && args.layout.is_none() && args.touches.is_none() {
        return Err(CliError::InvalidInput(
            "Nothing to run. Give --records, --layout or --touches.".to_string(),
        ));
    }

    let mut engine = Engine::new(config.engine.clone())?;
    let mut store = match config.database(args.db.as_deref()) {
        Some(path) => {
            let store = SqliteStore::new(&path)?;
            let restored = restore_engine(&mut engine, &store)?;
            info!(path = %path.display(), scopes = restored, "Opened database");
            Some(store)
        }
        None => None,
    };

    let batch = read_inputs(args, &engine)?;
    let failures = batch.failures;
    let mut report = engine.run(batch.observations).await?;
    report.ingest_failures = failures;

    let new_facts: Vec<CorrelatedFact> = engine.facts().all().into_iter().cloned().collect();

    if let Some(store) = store.as_mut() {
        let earlier = store.export_facts(None)?;
        persist_run(store, &engine, &report, &new_facts)?;
        engine.import_facts(earlier);
    }

    let mut answers = Vec::new();
    if let Some(path) = &args.queries {
        let text = fs::read_to_string(path)?;
        let queries = parse_queries(&text, &config.engine.query)?;
        let results = engine.evaluate_all(&queries);

        for (query, result) in queries.iter().zip(results) {
            if let (Some(store), Ok(answer)) = (store.as_mut(), &result) {
                store.record_answer(answer)?;
            }
            answers.push((query.id.clone(), result));
        }
    }

    Ok(RunOutcome { report, answers })
}

fn read_inputs(args: &RunArgs, engine: &Engine) -> Result<IngestBatch> {
    let mut batch = IngestBatch::default();
    for path in &args.records {
        let text = fs::read_to_string(path)?;
        batch.extend(engine.normalizer().parse_records(&text)?);
    }

    let scope = ScopeRef::new(args.scope.clone());
    if let Some(path) = &args.layout {
        let layout: TouchLayout = read_json(path)?;
        batch
            .observations
            .push(layout_observation(&scope, &args.subject, Timestamp::from_millis(0), &layout));
    }
    if let Some(path) = &args.touches {
        let touches: Vec<Touch> = read_json(path)?;
        batch
            .observations
            .extend(touch_observations(&scope, &args.subject, &touches));
    }
    Ok(batch)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn persist_run(
    store: &mut SqliteStore,
    engine: &Engine,
    report: &RunReport,
    facts: &[CorrelatedFact],
) -> Result<()> {
    for scope in report.build.built.keys() {
        if let Some(graph) = engine.graph(scope) {
            let elements: Vec<ConstraintElement> = graph.elements().cloned().collect();
            store.put_elements(&elements)?;
        }
    }
    store.record_facts(facts)?;
    store.record_conflicts(&report.conflicts)?;
    for (scope, worker) in &report.correlation.scopes {
        store.save_checkpoint(scope, worker.checkpoint.resume_at)?;
    }
    Ok(())
}
