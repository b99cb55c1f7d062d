//! Manifest node data
//!
//! Every manifest has a node in the MANIFESTS category of the coordination
//! service. Its payload is a fixed 12 byte record:
//!
//! ```text
//! [i32 BE status ordinal][i32 BE priority][i32 BE number of crashes]
//! ```
//!
//! An empty payload means the node has never been written.

use crate::coordination::{CategoryNode, CoordinationError, CoordinationService};
use byteorder::{BigEndian, ByteOrder};
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Serialized size of [`ManifestNodeData`]
pub const MANIFEST_NODE_DATA_SIZE: usize = 12;

/// Processing state of a manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProcessingStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Deleted,
    /// Ordinal written by a node that knows a status this build does not
    Unknown(i32),
}

impl ProcessingStatus {
    pub fn ordinal(&self) -> i32 {
        match self {
            ProcessingStatus::Pending => 0,
            ProcessingStatus::Processing => 1,
            ProcessingStatus::Completed => 2,
            ProcessingStatus::Deleted => 3,
            ProcessingStatus::Unknown(ordinal) => *ordinal,
        }
    }

    pub fn from_ordinal(ordinal: i32) -> Self {
        match ordinal {
            0 => ProcessingStatus::Pending,
            1 => ProcessingStatus::Processing,
            2 => ProcessingStatus::Completed,
            3 => ProcessingStatus::Deleted,
            other => ProcessingStatus::Unknown(other),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ProcessingStatus::Unknown(_))
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingStatus::Pending => f.write_str("PENDING"),
            ProcessingStatus::Processing => f.write_str("PROCESSING"),
            ProcessingStatus::Completed => f.write_str("COMPLETED"),
            ProcessingStatus::Deleted => f.write_str("DELETED"),
            ProcessingStatus::Unknown(ordinal) => write!(f, "UNKNOWN({})", ordinal),
        }
    }
}

impl Serialize for ProcessingStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Errors decoding coordination node payloads
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeDataError {
    #[error("Manifest node data must be empty or {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Node data is empty")]
    Empty,

    #[error("Node data truncated while reading {field}")]
    Truncated { field: &'static str },

    #[error("Value for {field} is {len} bytes, longer than the {max} byte limit")]
    StringTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("Field {field} is not valid UTF-8")]
    InvalidUtf8 { field: &'static str },

    #[error("Unknown stage ordinal {0}")]
    UnknownStage(u8),

    #[error("Timestamp {millis} ms out of range for {field}")]
    InvalidTimestamp { field: &'static str, millis: i64 },
}

impl From<NodeDataError> for autoingest_common::AutoIngestError {
    fn from(err: NodeDataError) -> Self {
        autoingest_common::AutoIngestError::NodeData(err.to_string())
    }
}

/// Processing state of one manifest as shared between nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ManifestNodeData {
    status: ProcessingStatus,
    priority: i32,
    number_of_crashes: i32,
    #[serde(rename = "set")]
    is_set: bool,
}

impl ManifestNodeData {
    /// Record for a manifest no node has written yet
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(status: ProcessingStatus, priority: i32, number_of_crashes: i32) -> Self {
        Self {
            status,
            priority,
            number_of_crashes,
            is_set: true,
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, NodeDataError> {
        if bytes.is_empty() {
            return Ok(Self::new());
        }
        if bytes.len() != MANIFEST_NODE_DATA_SIZE {
            return Err(NodeDataError::InvalidLength {
                expected: MANIFEST_NODE_DATA_SIZE,
                actual: bytes.len(),
            });
        }

        Ok(Self {
            status: ProcessingStatus::from_ordinal(BigEndian::read_i32(&bytes[0..4])),
            priority: BigEndian::read_i32(&bytes[4..8]),
            number_of_crashes: BigEndian::read_i32(&bytes[8..12]),
            is_set: true,
        })
    }

    pub fn encode(&self) -> [u8; MANIFEST_NODE_DATA_SIZE] {
        let mut bytes = [0u8; MANIFEST_NODE_DATA_SIZE];
        BigEndian::write_i32(&mut bytes[0..4], self.status.ordinal());
        BigEndian::write_i32(&mut bytes[4..8], self.priority);
        BigEndian::write_i32(&mut bytes[8..12], self.number_of_crashes);
        bytes
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.encode().to_vec()
    }

    /// False only for a record decoded from an empty payload
    pub fn is_set(&self) -> bool {
        self.is_set
    }

    pub fn status(&self) -> ProcessingStatus {
        self.status
    }

    pub fn set_status(&mut self, status: ProcessingStatus) {
        self.status = status;
        self.is_set = true;
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
        self.is_set = true;
    }

    pub fn number_of_crashes(&self) -> i32 {
        self.number_of_crashes
    }

    pub fn set_number_of_crashes(&mut self, number_of_crashes: i32) {
        self.number_of_crashes = number_of_crashes.max(0);
        self.is_set = true;
    }

    /// Count one more crash and return the new total
    pub fn record_crash(&mut self) -> i32 {
        self.set_number_of_crashes(self.number_of_crashes.saturating_add(1));
        self.number_of_crashes
    }
}

/// Failure updating a manifest node
#[derive(Error, Debug)]
pub enum ManifestNodeError {
    #[error(transparent)]
    Coordination(#[from] CoordinationError),

    #[error("Corrupt node data for manifest {manifest_path}")]
    Corrupt {
        manifest_path: String,
        #[source]
        source: NodeDataError,
    },
}

impl From<ManifestNodeError> for autoingest_common::AutoIngestError {
    fn from(err: ManifestNodeError) -> Self {
        let rendered = crate::system_log::error_chain(&err);
        match err {
            ManifestNodeError::Coordination(e) => e.into(),
            ManifestNodeError::Corrupt { .. } => autoingest_common::AutoIngestError::NodeData(rendered),
        }
    }
}

/// Read a manifest node without taking its lock
pub fn read_manifest_node(
    service: &dyn CoordinationService,
    manifest_path: &str,
) -> Result<ManifestNodeData, ManifestNodeError> {
    let bytes = service
        .node_data(CategoryNode::Manifests, manifest_path)?
        .unwrap_or_default();
    ManifestNodeData::decode(&bytes).map_err(|source| ManifestNodeError::Corrupt {
        manifest_path: manifest_path.to_string(),
        source,
    })
}

/// Read-modify-write a manifest node under its exclusive lock.
///
/// Returns `Ok(None)` when the lock could not be taken within `timeout`; the
/// node is left untouched in that case.
pub fn update_manifest_node<T>(
    service: &dyn CoordinationService,
    manifest_path: &str,
    timeout: Duration,
    update: impl FnOnce(&mut ManifestNodeData) -> T,
) -> Result<Option<T>, ManifestNodeError> {
    let Some(lock) = service.try_exclusive_lock(CategoryNode::Manifests, manifest_path, timeout)? else {
        tracing::debug!(manifest = %manifest_path, "Manifest node is locked by another node");
        return Ok(None);
    };

    let mut node_data = read_manifest_node(service, manifest_path)?;
    let result = update(&mut node_data);
    service.set_node_data(CategoryNode::Manifests, manifest_path, &node_data.encode())?;
    lock.release()?;

    tracing::debug!(
        manifest = %manifest_path,
        status = %node_data.status(),
        priority = node_data.priority(),
        crashes = node_data.number_of_crashes(),
        "Updated manifest node"
    );
    Ok(Some(result))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::coordination::InMemoryCoordinationService;
    use proptest::prelude::*;

    #[test]
    fn test_empty_bytes_decode_to_unset_defaults() {
        let data = ManifestNodeData::decode(&[]).unwrap();
        assert!(!data.is_set());
        assert_eq!(data.status(), ProcessingStatus::Pending);
        assert_eq!(data.priority(), 0);
        assert_eq!(data.number_of_crashes(), 0);
    }

    #[test]
    fn test_layout_is_big_endian() {
        let data = ManifestNodeData::with_values(ProcessingStatus::Completed, -1, 3);
        assert_eq!(
            data.encode(),
            [0, 0, 0, 2, 0xff, 0xff, 0xff, 0xff, 0, 0, 0, 3]
        );
    }

    #[test]
    fn test_wrong_length_is_rejected() {
        assert_eq!(
            ManifestNodeData::decode(&[0; 11]),
            Err(NodeDataError::InvalidLength {
                expected: 12,
                actual: 11
            })
        );
        assert!(ManifestNodeData::decode(&[0; 13]).is_err());
    }

    #[test]
    fn test_unknown_status_survives_rewrite() {
        let bytes = [0, 0, 0, 42, 0, 0, 0, 1, 0, 0, 0, 0];
        let data = ManifestNodeData::decode(&bytes).unwrap();
        assert_eq!(data.status(), ProcessingStatus::Unknown(42));
        assert!(!data.status().is_known());
        assert_eq!(data.encode(), bytes);
    }

    #[test]
    fn test_setters_mark_record_set() {
        let mut data = ManifestNodeData::new();
        data.set_priority(7);
        assert!(data.is_set());
        assert_eq!(data.record_crash(), 1);
        data.set_number_of_crashes(-4);
        assert_eq!(data.number_of_crashes(), 0);
    }

    #[test]
    fn test_update_manifest_node_persists_changes() {
        let service = InMemoryCoordinationService::new();
        let updated = update_manifest_node(&service, "/input/a/manifest.xml", Duration::ZERO, |data| {
            data.set_status(ProcessingStatus::Processing);
            data.set_priority(10);
            data.priority()
        })
        .unwrap();
        assert_eq!(updated, Some(10));

        let stored = read_manifest_node(&service, "/input/a/manifest.xml").unwrap();
        assert_eq!(stored, ManifestNodeData::with_values(ProcessingStatus::Processing, 10, 0));
        assert!(!service.is_locked(CategoryNode::Manifests, "/input/a/manifest.xml"));
    }

    #[test]
    fn test_update_manifest_node_skips_locked_node() {
        let service = InMemoryCoordinationService::new();
        let _held = service
            .try_exclusive_lock_now(CategoryNode::Manifests, "/m")
            .unwrap()
            .unwrap();

        let updated = update_manifest_node(&service, "/m", Duration::ZERO, |data| data.set_priority(1)).unwrap();
        assert!(updated.is_none());
        assert!(service.node_data(CategoryNode::Manifests, "/m").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_node_reports_manifest() {
        let service = InMemoryCoordinationService::new();
        service.set_node_data(CategoryNode::Manifests, "/m", &[1, 2, 3]).unwrap();
        let err = read_manifest_node(&service, "/m").unwrap_err();
        assert!(matches!(err, ManifestNodeError::Corrupt { ref manifest_path, .. } if manifest_path == "/m"));
    }

    fn status_strategy() -> impl Strategy<Value = ProcessingStatus> {
        prop_oneof![
            Just(ProcessingStatus::Pending),
            Just(ProcessingStatus::Processing),
            Just(ProcessingStatus::Completed),
            Just(ProcessingStatus::Deleted),
            (4i32..).prop_map(ProcessingStatus::Unknown),
        ]
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(
            status in status_strategy(),
            priority in any::<i32>(),
            crashes in 0i32..,
        ) {
            let data = ManifestNodeData::with_values(status, priority, crashes);
            prop_assert_eq!(ManifestNodeData::decode(&data.encode()).unwrap(), data);
        }
    }
}
