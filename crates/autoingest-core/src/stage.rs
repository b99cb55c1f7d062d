//! Processing stages of an auto ingest job

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Phase of processing for one job.
///
/// Declaration order is the typical progression; ordinals are persisted in
/// job node data and must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    #[default]
    Pending,
    Starting,
    UpdatingSharedConfig,
    CheckingServices,
    OpeningCase,
    IdentifyingDataSource,
    AddingDataSource,
    AnalyzingDataSource,
    AnalyzingFiles,
    ExportingFiles,
    CancellingModule,
    Cancelled,
    Completed,
}

impl Stage {
    pub const ALL: [Stage; 13] = [
        Stage::Pending,
        Stage::Starting,
        Stage::UpdatingSharedConfig,
        Stage::CheckingServices,
        Stage::OpeningCase,
        Stage::IdentifyingDataSource,
        Stage::AddingDataSource,
        Stage::AnalyzingDataSource,
        Stage::AnalyzingFiles,
        Stage::ExportingFiles,
        Stage::CancellingModule,
        Stage::Cancelled,
        Stage::Completed,
    ];

    pub fn ordinal(&self) -> u8 {
        *self as u8
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Stage> {
        Stage::ALL.get(usize::from(ordinal)).copied()
    }

    /// Whether a job in this stage is being worked on by some node
    pub fn is_in_progress(&self) -> bool {
        !matches!(self, Stage::Pending | Stage::Cancelled | Stage::Completed)
    }
}

/// Text shown to operators for a stage
pub fn stage_display_text(stage: Stage) -> &'static str {
    match stage {
        Stage::Pending => "Pending",
        Stage::Starting => "Starting",
        Stage::UpdatingSharedConfig => "Updating shared configuration",
        Stage::CheckingServices => "Checking services",
        Stage::OpeningCase => "Opening case",
        Stage::IdentifyingDataSource => "Identifying data source type",
        Stage::AddingDataSource => "Adding data source",
        Stage::AnalyzingDataSource => "Analyzing data source",
        Stage::AnalyzingFiles => "Analyzing files",
        Stage::ExportingFiles => "Exporting files",
        Stage::CancellingModule => "Cancelling module",
        Stage::Cancelled => "Cancelled",
        Stage::Completed => "Completed",
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(stage_display_text(*self))
    }
}

/// Description of what a job is doing right now and since when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDetails {
    pub description: String,
    pub start_date: DateTime<Utc>,
}

impl StageDetails {
    pub fn new(description: impl Into<String>, start_date: DateTime<Utc>) -> Self {
        Self {
            description: description.into(),
            start_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinals_follow_declaration_order() {
        for (index, stage) in Stage::ALL.iter().enumerate() {
            assert_eq!(usize::from(stage.ordinal()), index);
            assert_eq!(Stage::from_ordinal(stage.ordinal()), Some(*stage));
        }
        assert_eq!(Stage::Cancelled.ordinal(), 11);
        assert_eq!(Stage::from_ordinal(13), None);
    }

    #[test]
    fn test_display_text() {
        assert_eq!(stage_display_text(Stage::IdentifyingDataSource), "Identifying data source type");
        assert_eq!(Stage::UpdatingSharedConfig.to_string(), "Updating shared configuration");
    }

    #[test]
    fn test_in_progress() {
        assert!(Stage::AnalyzingFiles.is_in_progress());
        assert!(Stage::CancellingModule.is_in_progress());
        assert!(!Stage::Pending.is_in_progress());
        assert!(!Stage::Completed.is_in_progress());
    }
}
