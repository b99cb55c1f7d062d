//! Per-case auto ingest log
//!
//! Every node processing jobs for a case appends to the same
//! `auto_ingest_log.txt` in the case directory. Appends are serialized by an
//! exclusive CASES lock keyed on the log path, so the log is totally ordered
//! per case. Warnings and errors also raise the case alert file.

use crate::alert_file::{AlertFile, AlertFileError, AlertWriter};
use crate::coordination::{CategoryNode, CoordinationError, CoordinationService};
use crate::system_log::{default_system_log, SystemLog};
use autoingest_common::host::local_host_name;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const LOG_FILE_NAME: &str = "auto_ingest_log.txt";

/// Longest wait for another node to finish appending
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Timestamp layout of log lines
pub const DATE_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageCategory {
    Info,
    Warning,
    Error,
}

impl MessageCategory {
    pub fn label(&self) -> &'static str {
        match self {
            MessageCategory::Info => "INFO",
            MessageCategory::Warning => "WARNING",
            MessageCategory::Error => "ERROR",
        }
    }

    pub fn raises_alert(&self) -> bool {
        !matches!(self, MessageCategory::Info)
    }
}

impl std::str::FromStr for MessageCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INFO" => Ok(MessageCategory::Info),
            "WARNING" | "WARN" => Ok(MessageCategory::Warning),
            "ERROR" => Ok(MessageCategory::Error),
            _ => Err(format!("Invalid message category: {}", s)),
        }
    }
}

impl std::fmt::Display for MessageCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

pub fn log_path(case_directory_path: &Path) -> PathBuf {
    case_directory_path.join(LOG_FILE_NAME)
}

/// One log line, without the line terminator
pub fn format_log_line(
    timestamp: NaiveDateTime,
    host_name: &str,
    manifest_path: &Path,
    data_source_file_name: &str,
    category: MessageCategory,
    message: &str,
) -> String {
    format!(
        "{} {}: {}\\{}: {:<8}: {}",
        timestamp.format(DATE_FORMAT),
        host_name,
        manifest_path.display(),
        data_source_file_name,
        category.label(),
        message
    )
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Why a log entry could not be recorded
#[derive(Error, Debug)]
pub enum JobLoggerError {
    #[error("Timed out after {}s acquiring the lock on {}", .timeout.as_secs(), .log_path.display())]
    LockTimeout { log_path: PathBuf, timeout: Duration },

    #[error("Interrupted while waiting for the lock on {}", .log_path.display())]
    Interrupted { log_path: PathBuf },

    #[error("Coordination service failure locking {}", .log_path.display())]
    Coordination {
        log_path: PathBuf,
        #[source]
        source: CoordinationError,
    },

    #[error("Failed to write {}", .log_path.display())]
    Io {
        log_path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Alert creation failed; `prior` holds the write failure, if any
    #[error("Failed to raise case alert")]
    AlertFile {
        #[source]
        source: AlertFileError,
        prior: Option<Box<JobLoggerError>>,
    },
}

impl JobLoggerError {
    /// Whether the calling thread was asked to stop while waiting
    pub fn is_interrupted(&self) -> bool {
        match self {
            JobLoggerError::Interrupted { .. } => true,
            JobLoggerError::AlertFile { prior: Some(prior), .. } => prior.is_interrupted(),
            _ => false,
        }
    }
}

impl From<JobLoggerError> for autoingest_common::AutoIngestError {
    fn from(err: JobLoggerError) -> Self {
        if err.is_interrupted() {
            autoingest_common::AutoIngestError::Interrupted
        } else {
            autoingest_common::AutoIngestError::JobLog(crate::system_log::error_chain(&err))
        }
    }
}

/// Appends entries for one job to its case log
pub struct AutoIngestJobLogger {
    manifest_path: PathBuf,
    data_source_file_name: String,
    case_directory_path: PathBuf,
    host_name: String,
    coordination: Arc<dyn CoordinationService>,
    system_log: Arc<dyn SystemLog>,
    alert_writer: Arc<dyn AlertWriter>,
    lock_timeout: Duration,
    clock: fn() -> NaiveDateTime,
}

impl AutoIngestJobLogger {
    pub fn new(
        manifest_path: impl Into<PathBuf>,
        data_source_file_name: impl Into<String>,
        case_directory_path: impl Into<PathBuf>,
        coordination: Arc<dyn CoordinationService>,
    ) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            data_source_file_name: data_source_file_name.into(),
            case_directory_path: case_directory_path.into(),
            host_name: local_host_name().to_string(),
            coordination,
            system_log: default_system_log(),
            alert_writer: Arc::new(AlertFile),
            lock_timeout: LOCK_TIMEOUT,
            clock: local_now,
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

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Source of line timestamps, local time by default
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn log_path(&self) -> PathBuf {
        log_path(&self.case_directory_path)
    }

    pub fn log_job_cancelled(&self) -> Result<(), JobLoggerError> {
        self.log(MessageCategory::Warning, "Auto ingest job cancelled during processing")
    }

    pub fn log_missing_data_source(&self) -> Result<(), JobLoggerError> {
        self.log(MessageCategory::Error, "Data source file not found")
    }

    pub fn log_failed_to_extract_data_source(&self) -> Result<(), JobLoggerError> {
        self.log(MessageCategory::Error, "Failed to extract data source from archive")
    }

    pub fn log_failed_to_parse_logical_report_data_source(&self) -> Result<(), JobLoggerError> {
        self.log(MessageCategory::Error, "Failed to parse Cellebrite logical report data source")
    }

    pub fn log_failed_to_identify_data_source(&self) -> Result<(), JobLoggerError> {
        self.log(MessageCategory::Error, "Failed to identify data source")
    }

    pub fn log_data_source_processor_cancelled(&self) -> Result<(), JobLoggerError> {
        self.log(MessageCategory::Warning, "Cancelled adding data source to case")
    }

    pub fn log_data_source_processor_selected(&self, processor: &str) -> Result<(), JobLoggerError> {
        self.log(MessageCategory::Info, &format!("Using data source processor: {}", processor))
    }

    pub fn log_skipping_data_source(&self) -> Result<(), JobLoggerError> {
        self.log(MessageCategory::Info, "File type can not currently be processed")
    }

    pub fn log_data_source_processor_error(&self, processor: &str) -> Result<(), JobLoggerError> {
        self.log(
            MessageCategory::Error,
            &format!("Error processing with data source processor: {}", processor),
        )
    }

    pub fn log_data_source_added(&self) -> Result<(), JobLoggerError> {
        self.log(MessageCategory::Info, "Added data source to case")
    }

    pub fn log_failed_to_add_data_source(&self) -> Result<(), JobLoggerError> {
        self.log(MessageCategory::Error, "Failed to add data source to case")
    }

    pub fn log_no_data_source_content(&self) -> Result<(), JobLoggerError> {
        self.log(MessageCategory::Error, "Data source failed to produce content")
    }

    pub fn log_ingest_job_settings_errors(&self) -> Result<(), JobLoggerError> {
        self.log(MessageCategory::Error, "Failed to analyze data source due to settings errors")
    }

    pub fn log_probable_ingest_job_settings_errors(&self) -> Result<(), JobLoggerError> {
        self.log(
            MessageCategory::Error,
            "Failed to analyze data source, probably due to ingest settings errors",
        )
    }

    pub fn log_ingest_module_startup_errors(&self) -> Result<(), JobLoggerError> {
        self.log(
            MessageCategory::Error,
            "Failed to analyze data source due to ingest module startup errors",
        )
    }

    pub fn log_analysis_startup_error(&self) -> Result<(), JobLoggerError> {
        self.log(
            MessageCategory::Error,
            "Failed to analyze data source due to ingest job startup error",
        )
    }

    pub fn log_analysis_completed(&self) -> Result<(), JobLoggerError> {
        self.log(MessageCategory::Info, "Analysis of data source by ingest modules completed")
    }

    pub fn log_ingest_module_cancelled(&self, module_name: &str) -> Result<(), JobLoggerError> {
        self.log(
            MessageCategory::Warning,
            &format!("{} analysis of data source cancelled", module_name),
        )
    }

    pub fn log_analysis_cancelled(&self) -> Result<(), JobLoggerError> {
        self.log(MessageCategory::Warning, "Analysis of data source cancelled")
    }

    pub fn log_file_export_completed(&self) -> Result<(), JobLoggerError> {
        self.log(MessageCategory::Info, "Automated file export completed")
    }

    pub fn log_file_export_error(&self) -> Result<(), JobLoggerError> {
        self.log(MessageCategory::Error, "Error exporting files")
    }

    pub fn log_crash_recovery_with_retry(&self) -> Result<(), JobLoggerError> {
        self.log(MessageCategory::Error, "Detected crash while processing, reprocessing")
    }

    pub fn log_crash_recovery_no_retry(&self) -> Result<(), JobLoggerError> {
        self.log(
            MessageCategory::Error,
            "Detected crash while processing, reached retry limit for processing",
        )
    }

    /// Append one entry; warnings and errors also raise the case alert.
    ///
    /// The alert is attempted whether or not the append succeeded. Every
    /// failure is written to the system log before it is returned.
    pub fn log(&self, category: MessageCategory, message: &str) -> Result<(), JobLoggerError> {
        let written = self.append(category, message);
        if let Err(e) = &written {
            self.system_log.error(
                &format!(
                    "Failed to write case auto ingest log message (\"{}\") for {}",
                    message,
                    self.manifest_path.display()
                ),
                Some(e),
            );
        }

        if category.raises_alert() {
            if let Err(source) = self.alert_writer.create_alert(&self.case_directory_path) {
                self.system_log.error(
                    &format!(
                        "Failed to create alert file for {} after logging \"{}\"",
                        self.manifest_path.display(),
                        message
                    ),
                    Some(&source),
                );
                return Err(JobLoggerError::AlertFile {
                    source,
                    prior: written.err().map(Box::new),
                });
            }
        }

        written
    }

    fn append(&self, category: MessageCategory, message: &str) -> Result<(), JobLoggerError> {
        let log_path = self.log_path();
        let node_path = log_path.to_string_lossy().into_owned();

        let lock = match self
            .coordination
            .try_exclusive_lock(CategoryNode::Cases, &node_path, self.lock_timeout)
        {
            Ok(Some(lock)) => lock,
            Ok(None) => {
                return Err(JobLoggerError::LockTimeout {
                    log_path,
                    timeout: self.lock_timeout,
                })
            },
            Err(e) if e.is_interrupted() => return Err(JobLoggerError::Interrupted { log_path }),
            Err(source) => return Err(JobLoggerError::Coordination { log_path, source }),
        };

        let mut line = format_log_line(
            (self.clock)(),
            &self.host_name,
            &self.manifest_path,
            &self.data_source_file_name,
            category,
            message,
        );
        line.push('\n');

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .and_then(|mut file| file.write_all(line.as_bytes()))
            .map_err(|source| JobLoggerError::Io {
                log_path: log_path.clone(),
                source,
            })?;

        // The entry is already written; a failed release must not report it as lost
        if let Err(e) = lock.release() {
            self.system_log.error(
                &format!("Failed to release lock on {} after appending", log_path.display()),
                Some(&e),
            );
        }

        tracing::debug!(
            manifest = %self.manifest_path.display(),
            category = %category,
            "Appended case log entry"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::coordination::{InMemoryCoordinationService, Lock, LockRelease};
    use crate::system_log::MemorySystemLog;
    use chrono::NaiveDate;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn fixed_clock() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap()
    }

    #[derive(Default)]
    struct CountingAlerts {
        calls: AtomicUsize,
        fail: bool,
    }

    impl AlertWriter for CountingAlerts {
        fn create_alert(&self, case_directory: &Path) -> Result<(), AlertFileError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AlertFileError {
                    case_directory: case_directory.to_path_buf(),
                    source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only share"),
                });
            }
            Ok(())
        }
    }

    fn logger(case_dir: &Path, alerts: Arc<CountingAlerts>, log: Arc<MemorySystemLog>) -> AutoIngestJobLogger {
        AutoIngestJobLogger::new(
            "/cases/X/input/foo.E01",
            "foo.E01",
            case_dir,
            Arc::new(InMemoryCoordinationService::new()),
        )
        .with_host_name("node7")
        .with_clock(fixed_clock)
        .with_alert_writer(alerts)
        .with_system_log(log)
    }

    #[test]
    fn test_line_format() {
        let line = format_log_line(
            fixed_clock(),
            "node7",
            Path::new("/cases/X/input/foo.E01"),
            "foo.E01",
            MessageCategory::Info,
            "Analysis of data source by ingest modules completed",
        );
        assert_eq!(
            line,
            "2024/01/02 03:04:05 node7: /cases/X/input/foo.E01\\foo.E01: INFO    : Analysis of data source by ingest modules completed"
        );
    }

    #[test]
    fn test_info_appends_without_alert() {
        let dir = TempDir::new().unwrap();
        let alerts = Arc::new(CountingAlerts::default());
        let logger = logger(dir.path(), alerts.clone(), Arc::new(MemorySystemLog::new()));

        logger.log_analysis_completed().unwrap();
        logger.log_data_source_processor_selected("Disk Image").unwrap();

        let contents = fs::read_to_string(dir.path().join(LOG_FILE_NAME)).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "2024/01/02 03:04:05 node7: /cases/X/input/foo.E01\\foo.E01: INFO    : Analysis of data source by ingest modules completed"
        );
        assert!(lines[1].ends_with("INFO    : Using data source processor: Disk Image"));
        assert_eq!(alerts.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_warning_and_error_raise_one_alert_each() {
        let dir = TempDir::new().unwrap();
        let alerts = Arc::new(CountingAlerts::default());
        let logger = logger(dir.path(), alerts.clone(), Arc::new(MemorySystemLog::new()));

        logger.log_job_cancelled().unwrap();
        assert_eq!(alerts.calls.load(Ordering::SeqCst), 1);
        logger.log_file_export_error().unwrap();
        assert_eq!(alerts.calls.load(Ordering::SeqCst), 2);

        let contents = fs::read_to_string(dir.path().join(LOG_FILE_NAME)).unwrap();
        assert!(contents.contains("WARNING : Auto ingest job cancelled during processing"));
        assert!(contents.contains("ERROR   : Error exporting files"));
    }

    #[test]
    fn test_alert_raised_when_write_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        let alerts = Arc::new(CountingAlerts::default());
        let log = Arc::new(MemorySystemLog::new());
        let logger = logger(&missing, alerts.clone(), log.clone());

        let err = logger.log_missing_data_source().unwrap_err();
        assert!(matches!(err, JobLoggerError::Io { .. }));
        assert_eq!(alerts.calls.load(Ordering::SeqCst), 1);
        assert_eq!(log.errors().len(), 1);
    }

    #[test]
    fn test_alert_failure_keeps_prior_failure() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        let alerts = Arc::new(CountingAlerts {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let log = Arc::new(MemorySystemLog::new());
        let logger = logger(&missing, alerts, log.clone());

        let err = logger.log_crash_recovery_no_retry().unwrap_err();
        match err {
            JobLoggerError::AlertFile { prior, .. } => {
                assert!(matches!(prior.as_deref(), Some(JobLoggerError::Io { .. })));
            },
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(log.errors().len(), 2);
    }

    #[test]
    fn test_lock_timeout() {
        let dir = TempDir::new().unwrap();
        let service = Arc::new(InMemoryCoordinationService::new());
        let path = log_path(dir.path());
        let _held = service
            .try_exclusive_lock_now(CategoryNode::Cases, &path.to_string_lossy())
            .unwrap()
            .unwrap();

        let alerts = Arc::new(CountingAlerts::default());
        let logger = AutoIngestJobLogger::new("/m", "ds", dir.path(), service)
            .with_alert_writer(alerts.clone())
            .with_system_log(Arc::new(MemorySystemLog::new()))
            .with_lock_timeout(Duration::from_millis(20));

        let err = logger.log_data_source_added().unwrap_err();
        assert!(matches!(err, JobLoggerError::LockTimeout { .. }));
        assert!(!err.is_interrupted());
        assert_eq!(alerts.calls.load(Ordering::SeqCst), 0);
        assert!(!path.exists());
    }

    #[test]
    fn test_interrupted_wait_is_reported() {
        let dir = TempDir::new().unwrap();
        let service = InMemoryCoordinationService::new();
        service.interrupt_handle().interrupt();

        let logger = AutoIngestJobLogger::new("/m", "ds", dir.path(), Arc::new(service))
            .with_alert_writer(Arc::new(CountingAlerts::default()))
            .with_system_log(Arc::new(MemorySystemLog::new()));

        let err = logger.log_analysis_cancelled().unwrap_err();
        assert!(err.is_interrupted());
        assert!(autoingest_common::AutoIngestError::from(err).is_interrupted());
    }

    /// Coordination whose lock acquisition or lock release always fails
    enum BrokenCoordination {
        Unavailable,
        ReleaseFails,
    }

    struct FailingRelease;

    impl LockRelease for FailingRelease {
        fn release(&mut self) -> Result<(), CoordinationError> {
            Err(CoordinationError::Unavailable("coordination share went away".to_string()))
        }
    }

    impl CoordinationService for BrokenCoordination {
        fn try_exclusive_lock(
            &self,
            category: CategoryNode,
            node_path: &str,
            _timeout: Duration,
        ) -> Result<Option<Lock>, CoordinationError> {
            match self {
                Self::Unavailable => Err(CoordinationError::Unavailable("coordination share offline".to_string())),
                Self::ReleaseFails => Ok(Some(Lock::new(category, node_path, Box::new(FailingRelease)))),
            }
        }

        fn node_data(&self, _: CategoryNode, _: &str) -> Result<Option<Vec<u8>>, CoordinationError> {
            Ok(None)
        }

        fn set_node_data(&self, _: CategoryNode, _: &str, _: &[u8]) -> Result<(), CoordinationError> {
            Ok(())
        }

        fn delete_node_data(&self, _: CategoryNode, _: &str) -> Result<(), CoordinationError> {
            Ok(())
        }

        fn node_list(&self, _: CategoryNode) -> Result<Vec<String>, CoordinationError> {
            Ok(Vec::new())
        }
    }

    fn broken_logger(
        case_dir: &Path,
        coordination: BrokenCoordination,
        alerts: Arc<CountingAlerts>,
        log: Arc<MemorySystemLog>,
    ) -> AutoIngestJobLogger {
        AutoIngestJobLogger::new("/cases/X/input/foo.E01", "foo.E01", case_dir, Arc::new(coordination))
            .with_host_name("node7")
            .with_clock(fixed_clock)
            .with_alert_writer(alerts)
            .with_system_log(log)
    }

    #[test]
    fn test_coordination_failure_is_logged_and_still_alerts() {
        let dir = TempDir::new().unwrap();
        let alerts = Arc::new(CountingAlerts::default());
        let log = Arc::new(MemorySystemLog::new());
        let logger = broken_logger(dir.path(), BrokenCoordination::Unavailable, alerts.clone(), log.clone());

        let err = logger
            .log(MessageCategory::Error, "Error exporting files")
            .unwrap_err();
        assert!(matches!(err, JobLoggerError::Coordination { .. }));
        assert!(!err.is_interrupted());
        assert_eq!(log.errors().len(), 1);
        assert_eq!(alerts.calls.load(Ordering::SeqCst), 1);
        assert!(!log_path(dir.path()).exists());

        let err = logger
            .log(MessageCategory::Warning, "Auto ingest job cancelled during processing")
            .unwrap_err();
        assert!(matches!(err, JobLoggerError::Coordination { .. }));
        assert_eq!(log.errors().len(), 2);
        assert_eq!(alerts.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_coordination_and_alert_failure_keeps_both() {
        let dir = TempDir::new().unwrap();
        let alerts = Arc::new(CountingAlerts {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let log = Arc::new(MemorySystemLog::new());
        let logger = broken_logger(dir.path(), BrokenCoordination::Unavailable, alerts.clone(), log.clone());

        match logger.log_file_export_error().unwrap_err() {
            JobLoggerError::AlertFile { prior, .. } => {
                assert!(matches!(prior.as_deref(), Some(JobLoggerError::Coordination { .. })));
            },
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(alerts.calls.load(Ordering::SeqCst), 1);
        assert_eq!(log.errors().len(), 2);
    }

    #[test]
    fn test_release_failure_after_write_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let alerts = Arc::new(CountingAlerts::default());
        let log = Arc::new(MemorySystemLog::new());
        let logger = broken_logger(dir.path(), BrokenCoordination::ReleaseFails, alerts.clone(), log.clone());

        logger.log_analysis_completed().unwrap();

        let contents = fs::read_to_string(log_path(dir.path())).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.ends_with("INFO    : Analysis of data source by ingest modules completed\n"));
        assert_eq!(log.errors().len(), 1);
        assert_eq!(alerts.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unbounded_lock_timeout_appends() {
        let dir = TempDir::new().unwrap();
        let logger = logger(dir.path(), Arc::new(CountingAlerts::default()), Arc::new(MemorySystemLog::new()))
            .with_lock_timeout(Duration::from_secs(u64::MAX));

        logger.log_data_source_added().unwrap();
        assert_eq!(fs::read_to_string(log_path(dir.path())).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!("warn".parse::<MessageCategory>().unwrap(), MessageCategory::Warning);
        assert_eq!("ERROR".parse::<MessageCategory>().unwrap(), MessageCategory::Error);
        assert!("fatal".parse::<MessageCategory>().is_err());
    }
}
