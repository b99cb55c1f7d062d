//! Versioned job node data
//!
//! Monitoring views rebuild [`AutoIngestJob`](crate::job::AutoIngestJob)
//! instances from this richer payload. The record grew over time; each
//! version appends a block and readers stop at the end of the data:
//!
//! ```text
//! v0  i32 status | i32 priority | i32 crashes | i64 completed ms | i32 errors flag
//! v1  i32 version | str8 device id | str8 case name | str16 case dir
//!     | i64 manifest date ms | str16 manifest path | str16 data source path
//!     | u8 stage | i64 stage start ms | str8 details text | i64 details start ms
//!     | str16 host name
//! v2  i64 data source size
//! ```
//!
//! `strN` is an unsigned N-bit byte length followed by UTF-8 bytes. All
//! integers are big-endian.

use crate::node_data::{NodeDataError, ProcessingStatus};
use crate::stage::Stage;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::{self, Cursor, Read};

pub const CURRENT_VERSION: i32 = 2;

#[derive(Debug, Clone, Copy)]
enum LengthPrefix {
    Byte,
    Short,
}

impl LengthPrefix {
    fn max(self) -> usize {
        match self {
            LengthPrefix::Byte => usize::from(u8::MAX),
            LengthPrefix::Short => usize::from(u16::MAX),
        }
    }
}

/// Full coordination record for one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobNodeData {
    pub version: i32,
    pub processing_status: ProcessingStatus,
    pub priority: i32,
    pub number_of_crashes: i32,
    pub completed_date: DateTime<Utc>,
    pub errors_occurred: bool,
    pub device_id: String,
    pub case_name: String,
    /// Empty while no case directory has been assigned
    pub case_directory_path: String,
    pub manifest_file_date: DateTime<Utc>,
    pub manifest_file_path: String,
    pub data_source_path: String,
    pub stage: Stage,
    pub stage_start_date: DateTime<Utc>,
    pub stage_details_description: String,
    pub stage_details_start_date: DateTime<Utc>,
    pub processing_host_name: String,
    pub data_source_size: i64,
}

impl Default for JobNodeData {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            processing_status: ProcessingStatus::Pending,
            priority: 0,
            number_of_crashes: 0,
            completed_date: DateTime::UNIX_EPOCH,
            errors_occurred: false,
            device_id: String::new(),
            case_name: String::new(),
            case_directory_path: String::new(),
            manifest_file_date: DateTime::UNIX_EPOCH,
            manifest_file_path: String::new(),
            data_source_path: String::new(),
            stage: Stage::Pending,
            stage_start_date: DateTime::UNIX_EPOCH,
            stage_details_description: String::new(),
            stage_details_start_date: DateTime::UNIX_EPOCH,
            processing_host_name: String::new(),
            data_source_size: 0,
        }
    }
}

fn truncated(field: &'static str) -> impl FnOnce(io::Error) -> NodeDataError {
    move |_| NodeDataError::Truncated { field }
}

fn read_i32(reader: &mut Cursor<&[u8]>, field: &'static str) -> Result<i32, NodeDataError> {
    reader.read_i32::<BigEndian>().map_err(truncated(field))
}

fn read_date(reader: &mut Cursor<&[u8]>, field: &'static str) -> Result<DateTime<Utc>, NodeDataError> {
    let millis = reader.read_i64::<BigEndian>().map_err(truncated(field))?;
    DateTime::from_timestamp_millis(millis).ok_or(NodeDataError::InvalidTimestamp { field, millis })
}

fn read_string(reader: &mut Cursor<&[u8]>, prefix: LengthPrefix, field: &'static str) -> Result<String, NodeDataError> {
    let len = match prefix {
        LengthPrefix::Byte => usize::from(reader.read_u8().map_err(truncated(field))?),
        LengthPrefix::Short => usize::from(reader.read_u16::<BigEndian>().map_err(truncated(field))?),
    };
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes).map_err(truncated(field))?;
    String::from_utf8(bytes).map_err(|_| NodeDataError::InvalidUtf8 { field })
}

fn write_string(
    out: &mut Vec<u8>,
    value: &str,
    prefix: LengthPrefix,
    field: &'static str,
) -> Result<(), NodeDataError> {
    let len = value.len();
    if len > prefix.max() {
        return Err(NodeDataError::StringTooLong {
            field,
            len,
            max: prefix.max(),
        });
    }
    // Writes into a Vec cannot fail
    let _ = match prefix {
        LengthPrefix::Byte => out.write_u8(len as u8),
        LengthPrefix::Short => out.write_u16::<BigEndian>(len as u16),
    };
    out.extend_from_slice(value.as_bytes());
    Ok(())
}

fn has_remaining(reader: &Cursor<&[u8]>) -> bool {
    (reader.position() as usize) < reader.get_ref().len()
}

impl JobNodeData {
    pub fn decode(bytes: &[u8]) -> Result<Self, NodeDataError> {
        if bytes.is_empty() {
            return Err(NodeDataError::Empty);
        }

        let mut reader = Cursor::new(bytes);
        let mut data = JobNodeData {
            version: 0,
            processing_status: ProcessingStatus::from_ordinal(read_i32(&mut reader, "processing status")?),
            priority: read_i32(&mut reader, "priority")?,
            number_of_crashes: read_i32(&mut reader, "number of crashes")?,
            completed_date: read_date(&mut reader, "completed date")?,
            errors_occurred: read_i32(&mut reader, "errors occurred")? == 1,
            ..JobNodeData::default()
        };

        if has_remaining(&reader) {
            data.version = read_i32(&mut reader, "version")?;
            data.device_id = read_string(&mut reader, LengthPrefix::Byte, "device id")?;
            data.case_name = read_string(&mut reader, LengthPrefix::Byte, "case name")?;
            data.case_directory_path = read_string(&mut reader, LengthPrefix::Short, "case directory path")?;
            data.manifest_file_date = read_date(&mut reader, "manifest file date")?;
            data.manifest_file_path = read_string(&mut reader, LengthPrefix::Short, "manifest file path")?;
            data.data_source_path = read_string(&mut reader, LengthPrefix::Short, "data source path")?;
            let stage = reader.read_u8().map_err(truncated("stage"))?;
            data.stage = Stage::from_ordinal(stage).ok_or(NodeDataError::UnknownStage(stage))?;
            data.stage_start_date = read_date(&mut reader, "stage start date")?;
            data.stage_details_description = read_string(&mut reader, LengthPrefix::Byte, "stage details description")?;
            data.stage_details_start_date = read_date(&mut reader, "stage details start date")?;
            data.processing_host_name = read_string(&mut reader, LengthPrefix::Short, "processing host name")?;
        }

        if has_remaining(&reader) {
            data.data_source_size = reader
                .read_i64::<BigEndian>()
                .map_err(truncated("data source size"))?;
        }

        Ok(data)
    }

    /// Serialize the blocks that `version` covers
    pub fn encode(&self) -> Result<Vec<u8>, NodeDataError> {
        let mut out = Vec::with_capacity(128);
        // Writes into a Vec cannot fail
        let _ = out.write_i32::<BigEndian>(self.processing_status.ordinal());
        let _ = out.write_i32::<BigEndian>(self.priority);
        let _ = out.write_i32::<BigEndian>(self.number_of_crashes);
        let _ = out.write_i64::<BigEndian>(self.completed_date.timestamp_millis());
        let _ = out.write_i32::<BigEndian>(i32::from(self.errors_occurred));

        if self.version >= 1 {
            let _ = out.write_i32::<BigEndian>(self.version);
            write_string(&mut out, &self.device_id, LengthPrefix::Byte, "device id")?;
            write_string(&mut out, &self.case_name, LengthPrefix::Byte, "case name")?;
            write_string(&mut out, &self.case_directory_path, LengthPrefix::Short, "case directory path")?;
            let _ = out.write_i64::<BigEndian>(self.manifest_file_date.timestamp_millis());
            write_string(&mut out, &self.manifest_file_path, LengthPrefix::Short, "manifest file path")?;
            write_string(&mut out, &self.data_source_path, LengthPrefix::Short, "data source path")?;
            let _ = out.write_u8(self.stage.ordinal());
            let _ = out.write_i64::<BigEndian>(self.stage_start_date.timestamp_millis());
            write_string(
                &mut out,
                &self.stage_details_description,
                LengthPrefix::Byte,
                "stage details description",
            )?;
            let _ = out.write_i64::<BigEndian>(self.stage_details_start_date.timestamp_millis());
            write_string(&mut out, &self.processing_host_name, LengthPrefix::Short, "processing host name")?;

            if self.version >= 2 {
                let _ = out.write_i64::<BigEndian>(self.data_source_size);
            }
        }

        Ok(out)
    }

    /// File name of the data source, empty when no path is recorded
    pub fn data_source_file_name(&self) -> &str {
        self.data_source_path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> JobNodeData {
        JobNodeData {
            processing_status: ProcessingStatus::Processing,
            priority: 4,
            number_of_crashes: 1,
            completed_date: DateTime::UNIX_EPOCH,
            errors_occurred: true,
            device_id: "dev-01".to_string(),
            case_name: "Case X".to_string(),
            case_directory_path: "/cases/Case X_20240102_030405".to_string(),
            manifest_file_date: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            manifest_file_path: "/input/Case X/manifest.xml".to_string(),
            data_source_path: "/input/Case X/foo.E01".to_string(),
            stage: Stage::AnalyzingFiles,
            stage_start_date: Utc.with_ymd_and_hms(2024, 1, 2, 4, 0, 0).unwrap(),
            stage_details_description: "Hash Lookup".to_string(),
            stage_details_start_date: Utc.with_ymd_and_hms(2024, 1, 2, 4, 1, 0).unwrap(),
            processing_host_name: "node7".to_string(),
            data_source_size: 1 << 33,
            ..JobNodeData::default()
        }
    }

    #[test]
    fn test_current_version_round_trip() {
        let data = sample();
        assert_eq!(JobNodeData::decode(&data.encode().unwrap()).unwrap(), data);
        assert_eq!(data.data_source_file_name(), "foo.E01");
    }

    #[test]
    fn test_version_zero_decodes_with_defaults() {
        let data = JobNodeData {
            version: 0,
            ..sample()
        };
        let bytes = data.encode().unwrap();
        assert_eq!(bytes.len(), 24);

        let decoded = JobNodeData::decode(&bytes).unwrap();
        assert_eq!(decoded.version, 0);
        assert_eq!(decoded.priority, 4);
        assert!(decoded.errors_occurred);
        assert_eq!(decoded.stage, Stage::Pending);
        assert!(decoded.manifest_file_path.is_empty());
    }

    #[test]
    fn test_version_one_has_no_size() {
        let data = JobNodeData {
            version: 1,
            ..sample()
        };
        let decoded = JobNodeData::decode(&data.encode().unwrap()).unwrap();
        assert_eq!(decoded.version, 1);
        assert_eq!(decoded.case_name, "Case X");
        assert_eq!(decoded.data_source_size, 0);
    }

    #[test]
    fn test_empty_and_truncated_are_errors() {
        assert_eq!(JobNodeData::decode(&[]), Err(NodeDataError::Empty));

        let bytes = sample().encode().unwrap();
        let err = JobNodeData::decode(&bytes[..40]).unwrap_err();
        assert!(matches!(err, NodeDataError::Truncated { .. }));
    }

    #[test]
    fn test_overlong_string_is_rejected() {
        let data = JobNodeData {
            case_name: "x".repeat(256),
            ..sample()
        };
        assert_eq!(
            data.encode(),
            Err(NodeDataError::StringTooLong {
                field: "case name",
                len: 256,
                max: 255
            })
        );
    }

    #[test]
    fn test_unknown_stage_is_rejected() {
        let mut bytes = sample().encode().unwrap();
        // v0 block (24) + version (4) + three strings and a date precede the stage byte
        let s = sample();
        let stage_offset = 24
            + 4
            + 1
            + s.device_id.len()
            + 1
            + s.case_name.len()
            + 2
            + s.case_directory_path.len()
            + 8
            + 2
            + s.manifest_file_path.len()
            + 2
            + s.data_source_path.len();
        bytes[stage_offset] = 200;
        assert_eq!(JobNodeData::decode(&bytes), Err(NodeDataError::UnknownStage(200)));
    }
}
