//! Amanda CLI library.
//!
//! Command-line front end for the Amanda engine: runs the pipeline over
//! record files, answers queries against a database of earlier runs,
//! exports facts and answers, and profiles source code.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::{Cli, Command};
pub use config::Config;
pub use error::{CliError, Result};
pub use output::Formatter;
