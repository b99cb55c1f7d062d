//! Append to a case's auto ingest log
//!
//! Implements `autoingest log`.

use super::load_config;
use crate::error::{CliError, Result};
use autoingest_core::{alert_file, AutoIngestJobLogger, MessageCategory};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

/// Run the log command
pub fn run(
    case_dir: PathBuf,
    manifest: PathBuf,
    data_source: String,
    category: MessageCategory,
    message: String,
) -> Result<()> {
    if !case_dir.is_dir() {
        return Err(CliError::file_not_found(case_dir.display().to_string()));
    }

    let config = load_config()?;
    let coordination = Arc::new(config.coordination_service()?);

    let logger = AutoIngestJobLogger::new(manifest, data_source, &case_dir, coordination)
        .with_host_name(config.host_name.clone())
        .with_lock_timeout(config.lock_timeout());
    logger.log(category, &message)?;

    println!(
        "{} Logged {} entry to {}",
        "✓".green().bold(),
        category,
        logger.log_path().display()
    );
    if category.raises_alert() && alert_file::exists(&case_dir) {
        println!("  {} Alert file raised for this case", "!".yellow().bold());
    }
    Ok(())
}
