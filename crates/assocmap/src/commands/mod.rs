//! Subcommand handlers.

pub mod check_config;
pub mod collect;
pub mod serve;

use assocmap_config::{Config, load_config};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Load the configuration named by `--config`.
fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    load_config(&global.config).map_err(|source| CliError::Config {
        path: global.config.display().to_string(),
        source,
    })
}
