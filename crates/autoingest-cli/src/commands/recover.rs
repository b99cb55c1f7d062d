//! Requeue a job left behind by a crashed node
//!
//! Implements `autoingest recover`.

use super::load_config;
use crate::error::{CliError, Result};
use crate::output;
use autoingest_core::recovery::{CrashRecovery, RecoveryOutcome};
use autoingest_core::{stage_display_text, JobNodeData, Manifest};
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Arguments of the recover command
#[derive(Debug, Clone)]
pub struct RecoverArgs {
    pub manifest: PathBuf,
    pub case_name: String,
    pub data_source: PathBuf,
    pub device_id: String,
    pub cases_root: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct RecoveryReport {
    outcome: &'static str,
    job: Option<JobNodeData>,
}

fn outcome_name(outcome: &RecoveryOutcome) -> &'static str {
    match outcome {
        RecoveryOutcome::Skipped => "skipped",
        RecoveryOutcome::NotCrashed => "not_crashed",
        RecoveryOutcome::Requeued(_) => "requeued",
        RecoveryOutcome::RetryLimitReached(_) => "retry_limit_reached",
    }
}

/// Run the recover command
pub fn run(args: RecoverArgs, json: bool) -> Result<()> {
    let config = load_config()?;
    let manifest = Manifest::new(
        &args.manifest,
        manifest_created(&args.manifest)?,
        args.case_name,
        args.device_id,
        args.data_source,
    );

    let recovery = CrashRecovery::new(
        Arc::new(config.coordination_service()?),
        args.cases_root.unwrap_or_else(|| config.cases_dir.clone()),
        config.max_attempts,
    )
    .with_host_name(config.host_name.clone())
    .with_log_lock_timeout(config.lock_timeout());

    let outcome = recovery.recover_if_crashed(&manifest)?;

    if json {
        return output::print_json(&RecoveryReport {
            outcome: outcome_name(&outcome),
            job: outcome.job().map(|job| job.to_node_data()),
        });
    }

    match &outcome {
        RecoveryOutcome::Skipped => println!(
            "{} Manifest is held by another node or its node data is unreadable; nothing changed",
            "!".yellow().bold()
        ),
        RecoveryOutcome::NotCrashed => println!("{} Manifest was not left in processing", "✓".green().bold()),
        RecoveryOutcome::Requeued(_) => println!("{} Job requeued", "✓".green().bold()),
        RecoveryOutcome::RetryLimitReached(_) => {
            println!("{} Job has used all its attempts and is completed", "✗".red().bold())
        },
    }

    if let Some(job) = outcome.job() {
        println!();
        output::field("Crashes", job.number_of_crashes());
        output::field("Priority", job.priority());
        output::field("Stage", stage_display_text(job.stage()));
        output::field(
            "Case directory",
            job.case_directory_path()
                .map(|dir| dir.display().to_string())
                .unwrap_or_else(|| "not found".to_string()),
        );
    }
    Ok(())
}

fn manifest_created(path: &Path) -> Result<DateTime<Utc>> {
    let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => CliError::file_not_found(path.display().to_string()),
        _ => e.into(),
    })?;
    let created = metadata.created().or_else(|_| metadata.modified())?;
    Ok(created.into())
}
