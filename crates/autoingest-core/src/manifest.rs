//! Manifest descriptors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Pairs a data source with the case it should be ingested into.
///
/// Manifests are parsed by the orchestrator; this type only carries what the
/// job model needs from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    file_path: PathBuf,
    date_file_created: DateTime<Utc>,
    case_name: String,
    device_id: String,
    data_source_path: PathBuf,
    #[serde(default)]
    properties: BTreeMap<String, String>,
}

impl Manifest {
    pub fn new(
        file_path: impl Into<PathBuf>,
        date_file_created: DateTime<Utc>,
        case_name: impl Into<String>,
        device_id: impl Into<String>,
        data_source_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            date_file_created,
            case_name: case_name.into(),
            device_id: device_id.into(),
            data_source_path: data_source_path.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_properties(mut self, properties: BTreeMap<String, String>) -> Self {
        self.properties = properties;
        self
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Manifest path as used for coordination node keys
    pub fn node_path(&self) -> String {
        self.file_path.to_string_lossy().into_owned()
    }

    pub fn date_file_created(&self) -> DateTime<Utc> {
        self.date_file_created
    }

    pub fn case_name(&self) -> &str {
        &self.case_name
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn data_source_path(&self) -> &Path {
        &self.data_source_path
    }

    pub fn data_source_file_name(&self) -> String {
        self.data_source_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_source_file_name() {
        let manifest = Manifest::new(
            "/input/a/manifest.xml",
            DateTime::UNIX_EPOCH,
            "Case A",
            "dev",
            "/input/a/disk.E01",
        );
        assert_eq!(manifest.data_source_file_name(), "disk.E01");
        assert_eq!(manifest.node_path(), "/input/a/manifest.xml");

        let no_source = Manifest::new("/m.xml", DateTime::UNIX_EPOCH, "c", "d", "");
        assert_eq!(no_source.data_source_file_name(), "");
    }
}
