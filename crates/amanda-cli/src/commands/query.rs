//! Query command implementation.

use crate::cli::QueryArgs;
use crate::commands::{require_store, restore_engine};
use crate::config::Config;
use crate::error::Result;
use crate::output::{AnswerRow, Formatter};
use amanda_domain::traits::FactSink;
use amanda_engine::Engine;
use amanda_query::parse_queries;
use std::fs;

/// Execute the query command.
pub async fn execute_query(args: QueryArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let answers = answer_queries(&args, config)?;
    println!("{}", formatter.format_answers(&answers)?);
    Ok(())
}

/// Answer the queries in `args` against the stored graphs and facts.
pub fn answer_queries(args: &QueryArgs, config: &Config) -> Result<Vec<AnswerRow>> {
    let text = fs::read_to_string(&args.queries)?;
    let queries = parse_queries(&text, &config.engine.query)?;

    let mut store = require_store(config.database(args.db.as_deref()).as_deref())?;
    let mut engine = Engine::new(config.engine.clone())?;
    restore_engine(&mut engine, &store)?;
    engine.import_facts(store.export_facts(None)?);

    let results = engine.evaluate_all(&queries);
    let mut answers = Vec::with_capacity(queries.len());
    for (query, result) in queries.iter().zip(results) {
        if let Ok(answer) = &result {
            if !args.no_record {
                store.record_answer(answer)?;
            }
        }
        answers.push((query.id.clone(), result));
    }
    Ok(answers)
}
