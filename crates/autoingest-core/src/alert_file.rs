//! Case alert marker
//!
//! Any warning or error recorded against a case drops an alert file in the
//! case directory so monitoring can flag the case without reading its log.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ALERT_FILE_NAME: &str = "autoingest.alert";

#[derive(Error, Debug)]
#[error("Failed to create alert file in {}", .case_directory.display())]
pub struct AlertFileError {
    pub case_directory: PathBuf,
    #[source]
    pub source: io::Error,
}

pub fn alert_file_path(case_directory: &Path) -> PathBuf {
    case_directory.join(ALERT_FILE_NAME)
}

pub fn exists(case_directory: &Path) -> bool {
    alert_file_path(case_directory).is_file()
}

/// Create the alert file if it is not already there
pub fn create(case_directory: &Path) -> Result<(), AlertFileError> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(alert_file_path(case_directory))
        .map(|_| ())
        .map_err(|source| AlertFileError {
            case_directory: case_directory.to_path_buf(),
            source,
        })
}

/// Raises case alerts
pub trait AlertWriter: Send + Sync {
    fn create_alert(&self, case_directory: &Path) -> Result<(), AlertFileError>;
}

/// Writes [`ALERT_FILE_NAME`] into the case directory
#[derive(Debug, Default, Clone, Copy)]
pub struct AlertFile;

impl AlertWriter for AlertFile {
    fn create_alert(&self, case_directory: &Path) -> Result<(), AlertFileError> {
        create(case_directory)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_is_idempotent() {
        let dir = TempDir::new().unwrap();
        assert!(!exists(dir.path()));
        AlertFile.create_alert(dir.path()).unwrap();
        AlertFile.create_alert(dir.path()).unwrap();
        assert!(exists(dir.path()));
        assert!(dir.path().join("autoingest.alert").is_file());
    }

    #[test]
    fn test_missing_case_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        let err = create(&missing).unwrap_err();
        assert_eq!(err.case_directory, missing);
    }
}
