//! Distributed coordination service
//!
//! Auto ingest nodes share no memory. Everything they agree on goes through a
//! coordination service that offers two things:
//!
//! - exclusive locks keyed by a category and a node path, acquired with a
//!   bounded wait and released when the returned [`Lock`] guard is dropped
//! - a small byte payload stored per node (see `node_data` and
//!   `job_node_data` for the layouts kept there)
//!
//! Two implementations ship with the crate: [`InMemoryCoordinationService`]
//! for a single process and [`FileCoordinationService`] for hosts sharing a
//! network volume.

pub mod file;
pub mod memory;

pub use file::FileCoordinationService;
pub use memory::InMemoryCoordinationService;

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Top-level namespaces of coordination nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryNode {
    /// Case-level resources such as the shared case log
    Cases,
    /// One node per manifest, holding its processing state
    Manifests,
    /// Shared configuration
    Config,
}

impl CategoryNode {
    pub const ALL: [CategoryNode; 3] = [
        CategoryNode::Cases,
        CategoryNode::Manifests,
        CategoryNode::Config,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryNode::Cases => "cases",
            CategoryNode::Manifests => "manifests",
            CategoryNode::Config => "config",
        }
    }
}

impl std::fmt::Display for CategoryNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures reported by a coordination service
#[derive(Error, Debug)]
pub enum CoordinationError {
    /// The waiting thread was asked to stop
    #[error("Interrupted while waiting for lock on {category}/{node_path}")]
    Interrupted {
        category: CategoryNode,
        node_path: String,
    },

    #[error("Failed to {operation} for {category}/{node_path}")]
    Io {
        operation: &'static str,
        category: CategoryNode,
        node_path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Coordination service unavailable: {0}")]
    Unavailable(String),
}

impl CoordinationError {
    pub fn is_interrupted(&self) -> bool {
        matches!(self, CoordinationError::Interrupted { .. })
    }
}

impl From<CoordinationError> for autoingest_common::AutoIngestError {
    fn from(err: CoordinationError) -> Self {
        match err {
            CoordinationError::Interrupted { .. } => autoingest_common::AutoIngestError::Interrupted,
            other => autoingest_common::AutoIngestError::Coordination(
                crate::system_log::error_chain(&other),
            ),
        }
    }
}

/// Release hook behind a [`Lock`]
pub trait LockRelease: Send {
    fn release(&mut self) -> Result<(), CoordinationError>;
}

/// Held exclusive lock.
///
/// Dropping the guard releases the lock; call [`Lock::release`] instead when
/// the caller needs to see a release failure.
pub struct Lock {
    category: CategoryNode,
    node_path: String,
    handle: Option<Box<dyn LockRelease>>,
}

impl Lock {
    pub fn new(category: CategoryNode, node_path: impl Into<String>, handle: Box<dyn LockRelease>) -> Self {
        Self {
            category,
            node_path: node_path.into(),
            handle: Some(handle),
        }
    }

    pub fn category(&self) -> CategoryNode {
        self.category
    }

    pub fn node_path(&self) -> &str {
        &self.node_path
    }

    pub fn release(mut self) -> Result<(), CoordinationError> {
        match self.handle.take() {
            Some(mut handle) => handle.release(),
            None => Ok(()),
        }
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            if let Err(e) = handle.release() {
                tracing::warn!(
                    error = %e,
                    category = %self.category,
                    node_path = %self.node_path,
                    "Failed to release coordination lock"
                );
            }
        }
    }
}

impl std::fmt::Debug for Lock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lock")
            .field("category", &self.category)
            .field("node_path", &self.node_path)
            .field("held", &self.handle.is_some())
            .finish()
    }
}

/// Cooperative interruption flag shared with a coordination service.
///
/// Setting it makes every in-progress and future lock wait on that service
/// return [`CoordinationError::Interrupted`] until it is cleared.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Distributed lock and node data provider
pub trait CoordinationService: Send + Sync {
    /// Try to take an exclusive lock, waiting up to `timeout`.
    ///
    /// Returns `Ok(None)` when the wait timed out.
    fn try_exclusive_lock(
        &self,
        category: CategoryNode,
        node_path: &str,
        timeout: Duration,
    ) -> Result<Option<Lock>, CoordinationError>;

    /// Try to take an exclusive lock without waiting
    fn try_exclusive_lock_now(
        &self,
        category: CategoryNode,
        node_path: &str,
    ) -> Result<Option<Lock>, CoordinationError> {
        self.try_exclusive_lock(category, node_path, Duration::ZERO)
    }

    /// Payload stored at a node, `None` when the node has never been written
    fn node_data(&self, category: CategoryNode, node_path: &str) -> Result<Option<Vec<u8>>, CoordinationError>;

    fn set_node_data(&self, category: CategoryNode, node_path: &str, data: &[u8]) -> Result<(), CoordinationError>;

    /// Remove a node's payload; removing a missing node is not an error
    fn delete_node_data(&self, category: CategoryNode, node_path: &str) -> Result<(), CoordinationError>;

    /// Paths of every node in a category that carries data
    fn node_list(&self, category: CategoryNode) -> Result<Vec<String>, CoordinationError>;
}
