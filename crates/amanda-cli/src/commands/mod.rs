//! Command implementations.

pub mod config;
pub mod export;
pub mod profile;
pub mod query;
pub mod run;

pub use self::config::execute_config;
pub use self::export::execute_export;
pub use self::profile::execute_profile;
pub use self::query::execute_query;
pub use self::run::execute_run;

use crate::error::{CliError, Result};
use amanda_domain::traits::ElementStore;
use amanda_engine::Engine;
use amanda_store::SqliteStore;
use std::path::Path;
use tracing::{info, warn};

/// Open the database a command needs, failing if none is configured.
pub(crate) fn require_store(db: Option<&Path>) -> Result<SqliteStore> {
    let path = db.ok_or_else(|| {
        CliError::InvalidInput("No database given. Use --db, AMANDA_DB or `database` in the config file.".to_string())
    })?;
    Ok(SqliteStore::new(path)?)
}

/// Rebuild graphs and checkpoints from a store.
///
/// Returns the number of scopes restored. A scope whose stored elements no
/// longer build is skipped with a warning.
pub(crate) fn restore_engine(engine: &mut Engine, store: &SqliteStore) -> Result<usize> {
    let mut restored = 0;
    for scope in store.scopes()? {
        let elements = store.elements_for_scope(&scope)?;
        match engine.build_scope(&scope, &elements) {
            Ok(graph) => {
                restored += 1;
                info!(scope = %scope, nodes = graph.node_count(), "Restored scope graph");
            }
            Err(e) => {
                warn!(scope = %scope, error = %e, "Stored scope does not build");
                continue;
            }
        }
        if let Some(resume_at) = store.load_checkpoint(&scope)? {
            engine.set_checkpoint(scope, resume_at);
        }
    }
    Ok(restored)
}
