//! Profile command implementation.

use crate::cli::ProfileArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use amanda_classifier::{Classifier, CodeProfile};
use amanda_domain::{ScopeRef, Timestamp};
use amanda_ingest::source_line_observations;
use std::fs;

/// Execute the profile command.
pub async fn execute_profile(args: ProfileArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let profiles = profile_files(&args, config)?;
    println!("{}", formatter.format_profiles(&profiles)?);
    Ok(())
}

/// Profile each file on its own.
pub fn profile_files(args: &ProfileArgs, config: &Config) -> Result<Vec<(String, CodeProfile)>> {
    let classifier = Classifier::new(&config.engine.classifier)?;

    let mut profiles = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let name = path.display().to_string();
        let text = fs::read_to_string(path)?;
        let observations = source_line_observations(
            &config.engine.ingest,
            &ScopeRef::new(name.clone()),
            &name,
            &text,
            Timestamp::from_millis(0),
        );
        profiles.push((name, classifier.profile_code(&observations)));
    }
    Ok(profiles)
}
