//! Export command implementation.

use crate::cli::{ExportArgs, ExportKind};
use crate::commands::require_store;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use amanda_domain::ScopeRef;

/// Execute the export command.
pub async fn execute_export(args: ExportArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let store = require_store(config.database(args.db.as_deref()).as_deref())?;

    let output = match args.what {
        ExportKind::Facts => {
            let scope = args.scope.map(ScopeRef::new);
            formatter.format_facts(&store.export_facts(scope.as_ref())?)?
        }
        ExportKind::Answers => {
            let rows: Vec<_> = store
                .export_answers()?
                .into_iter()
                .map(|answer| (answer.query_id.clone(), Ok(answer)))
                .collect();
            formatter.format_answers(&rows)?
        }
    };

    println!("{}", output);
    Ok(())
}
