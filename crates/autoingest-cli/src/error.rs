//! Error types for the auto ingest CLI
//!
//! Messages are shown to operators as-is, so each one says what to check next.

use autoingest_common::AutoIngestError;
use autoingest_core::node_data::ManifestNodeError;
use autoingest_core::{JobLoggerError, NodeDataError};
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check the AUTOINGEST_* environment variables or .env file.")]
    Config(String),

    /// Required file is missing
    #[error("File not found: '{0}'. Verify the path exists and you have read permissions.")]
    FileNotFound(String),

    /// Path exists but is not a case folder
    #[error("Not a case folder: '{0}'. Run 'autoingest cases' to list case folders.")]
    NotACase(String),

    /// Hex input could not be parsed
    #[error("Invalid hex input: {0}. Pass the raw record bytes as an even number of hex digits.")]
    InvalidHex(#[from] hex::FromHexError),

    /// Bytes are neither a manifest nor a job record
    #[error("Unrecognized node data: {0}")]
    NodeData(#[from] NodeDataError),

    /// Manifest node is held by another node
    #[error("Manifest '{0}' is locked by another node. Retry once its job finishes.")]
    ManifestLocked(String),

    /// Manifest node could not be read or written
    #[error("Manifest node error: {0}. Check the coordination directory is reachable.")]
    ManifestNode(#[from] ManifestNodeError),

    /// Case log write failed
    #[error("Case log error: {0}")]
    JobLog(#[from] JobLoggerError),

    /// Core operation failed
    #[error(transparent)]
    Core(#[from] AutoIngestError),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// JSON rendering failed
    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a file not found error
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound(path.into())
    }

    /// Exit code for this error: 3 for lock contention, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::ManifestLocked(_) => 3,
            _ => 1,
        }
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        Self::Config(format!("{:#}", err))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_are_actionable() {
        let err = CliError::file_not_found("/input/manifest.xml");
        assert!(err.to_string().contains("/input/manifest.xml"));
        assert!(err.to_string().contains("Verify the path"));

        let err = CliError::ManifestLocked("/input/manifest.xml".to_string());
        assert!(err.to_string().contains("Retry"));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_anyhow_maps_to_config() {
        let err: CliError = anyhow::anyhow!("Host name cannot be empty").into();
        assert!(matches!(err, CliError::Config(_)));
        assert!(err.to_string().contains("AUTOINGEST_"));
        assert_eq!(err.exit_code(), 1);
    }
}
