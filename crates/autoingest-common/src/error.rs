//! Error types shared across the auto ingest crates

use thiserror::Error;

/// Result type alias for auto ingest operations
pub type Result<T> = std::result::Result<T, AutoIngestError>;

/// Top-level error for auto ingest components.
///
/// Component errors (codec, coordination, job logger) convert into this type
/// when they cross a crate boundary that does not care about the distinction.
#[derive(Error, Debug)]
pub enum AutoIngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid node data: {0}")]
    NodeData(String),

    #[error("Coordination service error: {0}")]
    Coordination(String),

    #[error("Job log error: {0}")]
    JobLog(String),

    #[error("Operation interrupted")]
    Interrupted,
}

impl AutoIngestError {
    /// Whether the failure came from a cooperative interruption rather than a fault
    pub fn is_interrupted(&self) -> bool {
        matches!(self, AutoIngestError::Interrupted)
    }
}
