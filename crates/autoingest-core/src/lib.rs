//! Auto Ingest Core Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Job coordination model for a multi-node forensic auto ingest cluster.
//!
//! # Overview
//!
//! - **Coordination**: exclusive locks and node data shared between nodes
//!   ([`coordination`]), with in-memory and shared-directory services
//! - **Node Data**: the fixed manifest record ([`node_data`]) and the
//!   versioned job record ([`job_node_data`])
//! - **Jobs**: stage tracking, cancellation and orderings ([`job`], [`stage`])
//! - **Cases**: case folder status and dates ([`case`], [`state_file`])
//! - **Case Log**: the shared per-case log and alert file ([`job_logger`],
//!   [`alert_file`])
//! - **Recovery**: requeueing jobs of crashed nodes ([`recovery`])
//!
//! # Example
//!
//! ```no_run
//! use autoingest_core::config::AutoIngestConfig;
//! use autoingest_core::job_logger::AutoIngestJobLogger;
//! use std::sync::Arc;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = AutoIngestConfig::load()?;
//!     let coordination = Arc::new(config.coordination_service()?);
//!
//!     let logger = AutoIngestJobLogger::new(
//!         "/input/Case X/manifest.xml",
//!         "disk.E01",
//!         config.cases_dir.join("Case X_20240102_030405"),
//!         coordination,
//!     )
//!     .with_lock_timeout(config.lock_timeout());
//!     logger.log_analysis_completed()?;
//!     Ok(())
//! }
//! ```

pub mod alert_file;
pub mod case;
pub mod config;
pub mod coordination;
pub mod job;
pub mod job_logger;
pub mod job_node_data;
pub mod manifest;
pub mod node_data;
pub mod recovery;
pub mod stage;
pub mod state_file;
pub mod system_log;

pub use case::{AutoIngestCase, CaseStatus};
pub use coordination::{CategoryNode, CoordinationError, CoordinationService, Lock};
pub use job::AutoIngestJob;
pub use job_logger::{AutoIngestJobLogger, JobLoggerError, MessageCategory};
pub use job_node_data::JobNodeData;
pub use manifest::Manifest;
pub use node_data::{ManifestNodeData, NodeDataError, ProcessingStatus};
pub use stage::{stage_display_text, Stage, StageDetails};
pub use system_log::SystemLog;
