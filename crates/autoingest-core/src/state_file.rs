//! Presence-only marker files in case and input directories

use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Kinds of marker file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateFileType {
    Ready,
    Processing,
    Done,
    Cancelled,
    Error,
    Interrupted,
    Deleted,
    Prioritized,
}

impl StateFileType {
    pub const ALL: [StateFileType; 8] = [
        StateFileType::Ready,
        StateFileType::Processing,
        StateFileType::Done,
        StateFileType::Cancelled,
        StateFileType::Error,
        StateFileType::Interrupted,
        StateFileType::Deleted,
        StateFileType::Prioritized,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            StateFileType::Ready => "READY",
            StateFileType::Processing => "PROCESSING",
            StateFileType::Done => "DONE",
            StateFileType::Cancelled => "CANCELLED",
            StateFileType::Error => "ERROR",
            StateFileType::Interrupted => "INTERRUPTED",
            StateFileType::Deleted => "DELETED",
            StateFileType::Prioritized => "PRIORITIZED",
        }
    }

    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }
}

impl std::fmt::Display for StateFileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_name())
    }
}

#[derive(Error, Debug)]
#[error("Failed to {operation} {file_type} state file in {}", .dir.display())]
pub struct StateFileError {
    pub operation: &'static str,
    pub file_type: StateFileType,
    pub dir: PathBuf,
    #[source]
    pub source: io::Error,
}

pub fn exists(dir: &Path, file_type: StateFileType) -> Result<bool, StateFileError> {
    file_type
        .path_in(dir)
        .try_exists()
        .map_err(|source| StateFileError {
            operation: "check",
            file_type,
            dir: dir.to_path_buf(),
            source,
        })
}

/// Create the marker; an existing marker is left as is
pub fn create(dir: &Path, file_type: StateFileType) -> Result<(), StateFileError> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(file_type.path_in(dir))
        .map(|_| ())
        .map_err(|source| StateFileError {
            operation: "create",
            file_type,
            dir: dir.to_path_buf(),
            source,
        })
}

/// Remove the marker; a missing marker is not an error
pub fn delete(dir: &Path, file_type: StateFileType) -> Result<(), StateFileError> {
    match fs::remove_file(file_type.path_in(dir)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(StateFileError {
            operation: "delete",
            file_type,
            dir: dir.to_path_buf(),
            source,
        }),
    }
}

/// Answers whether a marker file is present
pub trait StateFileChecker: Send + Sync {
    fn exists(&self, dir: &Path, file_type: StateFileType) -> Result<bool, StateFileError>;
}

/// Checker backed by the local file system
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSystemChecker;

impl StateFileChecker for FileSystemChecker {
    fn exists(&self, dir: &Path, file_type: StateFileType) -> Result<bool, StateFileError> {
        exists(dir, file_type)
    }
}
