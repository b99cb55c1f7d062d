//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function.

pub mod case_status;
pub mod cases;
pub mod log;
pub mod node_data;
pub mod recover;

use crate::Result;
use autoingest_core::config::AutoIngestConfig;

/// Load node configuration from `.env` and the environment
pub(crate) fn load_config() -> Result<AutoIngestConfig> {
    Ok(AutoIngestConfig::load()?)
}
