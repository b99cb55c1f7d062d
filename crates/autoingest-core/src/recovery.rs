//! Crash recovery for manifests left in PROCESSING
//!
//! A node that dies mid-job leaves the manifest node marked PROCESSING with
//! nobody holding its lock. When a node scanning the input finds such a
//! manifest it can take the lock immediately, count the crash, and either
//! requeue the job or give up on it once the retry limit is reached.

use crate::alert_file::{AlertFile, AlertWriter};
use crate::case::find_case_directory;
use crate::coordination::{CategoryNode, CoordinationService};
use crate::job::AutoIngestJob;
use crate::job_logger::AutoIngestJobLogger;
use crate::manifest::Manifest;
use crate::node_data::{ManifestNodeData, ProcessingStatus};
use crate::stage::Stage;
use crate::system_log::{default_system_log, SystemLog};
use autoingest_common::host::local_host_name;
use autoingest_common::{AutoIngestError, Result};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Result of a recovery attempt
#[derive(Debug)]
pub enum RecoveryOutcome {
    /// Another node holds the manifest, or its node could not be read or written
    Skipped,
    /// The manifest was not left in PROCESSING
    NotCrashed,
    /// Crash counted; the job goes back on the pending queue
    Requeued(AutoIngestJob),
    /// Crash counted; the job has used up its attempts and is completed
    RetryLimitReached(AutoIngestJob),
}

impl RecoveryOutcome {
    pub fn job(&self) -> Option<&AutoIngestJob> {
        match self {
            RecoveryOutcome::Requeued(job) | RecoveryOutcome::RetryLimitReached(job) => Some(job),
            RecoveryOutcome::Skipped | RecoveryOutcome::NotCrashed => None,
        }
    }
}

/// Recovers crashed jobs for one node
pub struct CrashRecovery {
    coordination: Arc<dyn CoordinationService>,
    cases_root: PathBuf,
    max_attempts: i32,
    host_name: String,
    system_log: Arc<dyn SystemLog>,
    alert_writer: Arc<dyn AlertWriter>,
    log_lock_timeout: Option<Duration>,
}

impl CrashRecovery {
    pub fn new(coordination: Arc<dyn CoordinationService>, cases_root: impl Into<PathBuf>, max_attempts: i32) -> Self {
        Self {
            coordination,
            cases_root: cases_root.into(),
            max_attempts,
            host_name: local_host_name().to_string(),
            system_log: default_system_log(),
            alert_writer: Arc::new(AlertFile),
            log_lock_timeout: None,
        }
    }

    pub fn with_host_name(mut self, host_name: impl Into<String>) -> Self {
        self.host_name = host_name.into();
        self
    }

    pub fn with_system_log(mut self, system_log: Arc<dyn SystemLog>) -> Self {
        self.system_log = system_log;
        self
    }

    pub fn with_alert_writer(mut self, alert_writer: Arc<dyn AlertWriter>) -> Self {
        self.alert_writer = alert_writer;
        self
    }

    /// Bound the wait for the case log lock
    pub fn with_log_lock_timeout(mut self, timeout: Duration) -> Self {
        self.log_lock_timeout = Some(timeout);
        self
    }

    /// Count a crash against `manifest` if its node was left in PROCESSING.
    ///
    /// Coordination and case log failures are written to the system log and
    /// never returned; only an interruption is.
    pub fn recover_if_crashed(&self, manifest: &Manifest) -> Result<RecoveryOutcome> {
        let manifest_path = manifest.node_path();

        let lock = match self
            .coordination
            .try_exclusive_lock_now(CategoryNode::Manifests, &manifest_path)
        {
            Ok(Some(lock)) => lock,
            Ok(None) => return Ok(RecoveryOutcome::Skipped),
            Err(e) if e.is_interrupted() => return Err(AutoIngestError::Interrupted),
            Err(e) => {
                self.system_log.error(
                    &format!("Error attempting to get exclusive lock for {}", manifest_path),
                    Some(&e),
                );
                return Ok(RecoveryOutcome::Skipped);
            },
        };

        let outcome = self.recover_locked(manifest, &manifest_path)?;

        if let Err(e) = lock.release() {
            self.system_log.error(
                &format!("Error attempting to release exclusive lock for {}", manifest_path),
                Some(&e),
            );
        }
        Ok(outcome)
    }

    fn recover_locked(&self, manifest: &Manifest, manifest_path: &str) -> Result<RecoveryOutcome> {
        let bytes = match self.coordination.node_data(CategoryNode::Manifests, manifest_path) {
            Ok(bytes) => bytes.unwrap_or_default(),
            Err(e) => {
                self.system_log.error(
                    &format!("Error attempting to get node data for {}", manifest_path),
                    Some(&e),
                );
                return Ok(RecoveryOutcome::Skipped);
            },
        };
        let mut node_data = match ManifestNodeData::decode(&bytes) {
            Ok(node_data) => node_data,
            Err(e) => {
                self.system_log.error(
                    &format!("Error attempting to decode node data for {}", manifest_path),
                    Some(&e),
                );
                return Ok(RecoveryOutcome::Skipped);
            },
        };

        if !node_data.is_set() || node_data.status() != ProcessingStatus::Processing {
            return Ok(RecoveryOutcome::NotCrashed);
        }

        self.system_log
            .error(&format!("Attempting crash recovery for {}", manifest_path), None);
        let crashes = node_data.record_crash();
        let retry = crashes <= self.max_attempts;

        let case_directory = find_case_directory(&self.cases_root, manifest.case_name());
        let job = AutoIngestJob::new(manifest.clone());
        job.set_node_name(self.host_name.clone());
        job.set_priority(node_data.priority());
        job.set_number_of_crashes(crashes);
        job.set_errors_occurred(true);
        if let Some(dir) = &case_directory {
            job.set_case_directory_path(dir);
        }

        if retry {
            node_data.set_status(ProcessingStatus::Pending);
            job.set_stage(Stage::Pending, DateTime::UNIX_EPOCH);
            job.set_processing_status(ProcessingStatus::Pending);
        } else {
            node_data.set_status(ProcessingStatus::Completed);
            let now = Utc::now();
            job.set_stage(Stage::Completed, now);
            job.set_completed_date(now);
            job.set_processing_status(ProcessingStatus::Completed);
        }
        tracing::warn!(
            manifest = %manifest_path,
            crashes,
            max_attempts = self.max_attempts,
            retry,
            "Recovered crashed job"
        );

        if let Some(dir) = &case_directory {
            self.record_in_case(manifest, dir.clone(), retry)?;
        }

        if let Err(e) = self
            .coordination
            .set_node_data(CategoryNode::Manifests, manifest_path, &node_data.encode())
        {
            self.system_log.error(
                &format!("Error attempting to set node data for {}", manifest_path),
                Some(&e),
            );
        }

        Ok(if retry {
            RecoveryOutcome::Requeued(job)
        } else {
            RecoveryOutcome::RetryLimitReached(job)
        })
    }

    fn record_in_case(&self, manifest: &Manifest, case_directory: PathBuf, retry: bool) -> Result<()> {
        let manifest_path = manifest.node_path();
        if let Err(e) = self.alert_writer.create_alert(&case_directory) {
            self.system_log.error(
                &format!("Error creating alert file for crashed job for {}", manifest_path),
                Some(&e),
            );
        }

        let mut logger = AutoIngestJobLogger::new(
            manifest.file_path(),
            manifest.data_source_file_name(),
            case_directory,
            self.coordination.clone(),
        )
        .with_host_name(self.host_name.clone())
        .with_system_log(self.system_log.clone())
        .with_alert_writer(self.alert_writer.clone());
        if let Some(timeout) = self.log_lock_timeout {
            logger = logger.with_lock_timeout(timeout);
        }

        let logged = if retry {
            logger.log_crash_recovery_with_retry()
        } else {
            logger.log_crash_recovery_no_retry()
        };
        match logged {
            Ok(()) => Ok(()),
            Err(e) if e.is_interrupted() => Err(AutoIngestError::Interrupted),
            Err(e) => {
                self.system_log.error(
                    &format!("Error creating case auto ingest log entry for crashed job for {}", manifest_path),
                    Some(&e),
                );
                Ok(())
            },
        }
    }
}
