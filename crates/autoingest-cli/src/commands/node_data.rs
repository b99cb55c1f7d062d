//! Inspect and update coordination node data
//!
//! Implements `autoingest node-data decode/show/set-priority`.

use super::load_config;
use crate::error::{CliError, Result};
use crate::output;
use autoingest_core::node_data::{self, MANIFEST_NODE_DATA_SIZE};
use autoingest_core::{stage_display_text, JobNodeData, ManifestNodeData};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A record decoded from raw node bytes
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodedRecord {
    Manifest(ManifestNodeData),
    Job(JobNodeData),
}

/// Decode raw bytes, telling the record kinds apart by length.
///
/// Empty or twelve-byte input is a manifest record; anything else must be a
/// job record.
pub fn decode_record(bytes: &[u8]) -> Result<DecodedRecord> {
    if bytes.is_empty() || bytes.len() == MANIFEST_NODE_DATA_SIZE {
        Ok(DecodedRecord::Manifest(ManifestNodeData::decode(bytes)?))
    } else {
        Ok(DecodedRecord::Job(JobNodeData::decode(bytes)?))
    }
}

/// Run `node-data decode`
pub fn decode(file: Option<PathBuf>, hex_input: Option<String>, json: bool) -> Result<()> {
    let bytes = match (file, hex_input) {
        (_, Some(hex_input)) => hex::decode(hex_input.trim())?,
        (Some(file), None) => read_file(&file)?,
        (None, None) => return Err(CliError::config("either a file or --hex is required")),
    };

    let record = decode_record(&bytes)?;
    if json {
        return output::print_json(&record);
    }

    match &record {
        DecodedRecord::Manifest(data) => print_manifest_record(data),
        DecodedRecord::Job(data) => print_job_record(data),
    }
    Ok(())
}

/// Run `node-data show`
pub fn show(manifest: PathBuf, json: bool) -> Result<()> {
    let config = load_config()?;
    let service = config.coordination_service()?;
    let node_path = manifest.to_string_lossy().into_owned();

    let data = node_data::read_manifest_node(&service, &node_path)?;
    if json {
        return output::print_json(&data);
    }

    println!("{}", format!("Manifest {}", node_path).cyan().bold());
    println!();
    if !data.is_set() {
        println!("  {}", "No node data recorded for this manifest".yellow());
        return Ok(());
    }
    print_manifest_record(&data);
    Ok(())
}

#[derive(Debug, Serialize)]
struct PriorityChange<'a> {
    manifest: &'a str,
    previous: i32,
    priority: i32,
}

/// Run `node-data set-priority`
pub fn set_priority(manifest: PathBuf, priority: i32, json: bool) -> Result<()> {
    let config = load_config()?;
    let service = config.coordination_service()?;
    let node_path = manifest.to_string_lossy().into_owned();

    if !node_data::read_manifest_node(&service, &node_path)?.is_set() {
        return Err(CliError::file_not_found(format!("node data for {}", node_path)));
    }

    let previous = node_data::update_manifest_node(&service, &node_path, config.lock_timeout(), |data| {
        let previous = data.priority();
        data.set_priority(priority);
        previous
    })?
    .ok_or_else(|| CliError::ManifestLocked(node_path.clone()))?;

    tracing::info!(manifest = %node_path, previous, priority, "Changed manifest priority");

    if json {
        return output::print_json(&PriorityChange {
            manifest: &node_path,
            previous,
            priority,
        });
    }

    println!(
        "{} Priority of {} changed from {} to {}",
        "✓".green().bold(),
        node_path.bold(),
        previous,
        priority.to_string().green()
    );
    Ok(())
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => CliError::file_not_found(path.display().to_string()),
        _ => e.into(),
    })
}

fn print_manifest_record(data: &ManifestNodeData) {
    output::field("Status", data.status());
    output::field("Priority", data.priority());
    output::field("Crashes", data.number_of_crashes());
}

fn print_job_record(data: &JobNodeData) {
    output::field("Version", data.version);
    output::field("Status", data.processing_status);
    output::field("Priority", data.priority);
    output::field("Crashes", data.number_of_crashes);
    output::field("Errors occurred", data.errors_occurred);
    output::field("Completed", output::format_date(data.completed_date));
    if data.version < 1 {
        return;
    }
    output::field("Case", &data.case_name);
    output::field("Device", &data.device_id);
    output::field("Case directory", &data.case_directory_path);
    output::field("Manifest", &data.manifest_file_path);
    output::field("Manifest date", output::format_date(data.manifest_file_date));
    output::field("Data source", &data.data_source_path);
    output::field("Stage", stage_display_text(data.stage));
    output::field("Stage started", output::format_date(data.stage_start_date));
    output::field("Details", &data.stage_details_description);
    output::field("Host", &data.processing_host_name);
    if data.version >= 2 {
        output::field("Data source size", data.data_source_size);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use autoingest_core::ProcessingStatus;

    #[test]
    fn test_twelve_bytes_decode_as_manifest() {
        let bytes = ManifestNodeData::with_values(ProcessingStatus::Processing, 5, 1).encode();
        match decode_record(&bytes).unwrap() {
            DecodedRecord::Manifest(data) => {
                assert_eq!(data.status(), ProcessingStatus::Processing);
                assert_eq!(data.priority(), 5);
            },
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_longer_input_decodes_as_job() {
        let job = JobNodeData {
            case_name: "Case X".to_string(),
            priority: 3,
            ..JobNodeData::default()
        };
        let bytes = job.encode().unwrap();
        match decode_record(&bytes).unwrap() {
            DecodedRecord::Job(data) => assert_eq!(data, job),
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(decode_record(&[1, 2, 3]), Err(CliError::NodeData(_))));
    }

    #[test]
    fn test_json_is_tagged() {
        let record = decode_record(&[]).unwrap();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["kind"], "manifest");
        assert_eq!(value["status"], "PENDING");
        assert_eq!(value["set"], false);
    }
}
