//! Auto Ingest Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared utilities for the auto ingest workspace members.
//!
//! # Overview
//!
//! - **Error Handling**: the workspace-wide error type and result alias
//! - **Logging**: tracing subscriber setup for nodes and tools
//! - **Host Identity**: the local host name every node stamps on its work
//!
//! # Example
//!
//! ```no_run
//! use autoingest_common::host::local_host_name;
//! use autoingest_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&LogConfig::from_env()?)?;
//!     tracing::info!(host = %local_host_name(), "Auto ingest node starting");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod host;
pub mod logging;

// Re-export commonly used types
pub use error::{AutoIngestError, Result};
