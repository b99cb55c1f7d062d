//! Show one case folder
//!
//! Implements `autoingest case-status`.

use super::cases::CaseSummary;
use crate::error::{CliError, Result};
use crate::output;
use autoingest_core::case::AutoIngestCase;
use autoingest_core::job_logger;
use autoingest_core::{alert_file, state_file::{self, StateFileType}};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
pub struct CaseReport {
    #[serde(flatten)]
    pub summary: CaseSummary,
    pub metadata_file: PathBuf,
    pub markers: Vec<StateFileType>,
    pub alert: bool,
    pub log_entries: usize,
}

/// Run the case-status command
pub fn run(case_dir: PathBuf, json: bool) -> Result<()> {
    let report = inspect(&case_dir)?;

    if json {
        return output::print_json(&report);
    }

    println!("{}", format!("Case {}", report.summary.case_name).cyan().bold());
    println!();
    output::field("Status", output::colored_status(report.summary.status));
    output::field("Folder", report.summary.case_folder.display());
    output::field("Metadata file", report.metadata_file.display());
    output::field("Created", output::format_date(report.summary.created));
    output::field("Last accessed", output::format_date(report.summary.last_accessed));
    let markers = if report.markers.is_empty() {
        "none".dimmed().to_string()
    } else {
        report
            .markers
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };
    output::field("Markers", markers);
    output::field(
        "Alert",
        if report.alert { "raised".red().bold() } else { "none".green() },
    );
    output::field("Log entries", report.log_entries);

    Ok(())
}

/// Gather the status report of a case folder
pub fn inspect(case_dir: &Path) -> Result<CaseReport> {
    if !case_dir.is_dir() {
        return Err(CliError::file_not_found(case_dir.display().to_string()));
    }

    let case = AutoIngestCase::new(case_dir);
    if !case.metadata_file_path().is_file() {
        return Err(CliError::NotACase(case_dir.display().to_string()));
    }
    case.last_accessed_date();

    let mut markers = Vec::new();
    for file_type in StateFileType::ALL {
        match state_file::exists(case_dir, file_type) {
            Ok(true) => markers.push(file_type),
            Ok(false) => {},
            Err(e) => tracing::warn!(error = %e, "Cannot check marker file"),
        }
    }

    let log_entries = match std::fs::read_to_string(job_logger::log_path(case_dir)) {
        Ok(contents) => contents.lines().count(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
        Err(e) => return Err(e.into()),
    };

    Ok(CaseReport {
        summary: CaseSummary::from(&case),
        metadata_file: case.metadata_file_path().to_path_buf(),
        markers,
        alert: alert_file::exists(case_dir),
        log_entries,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use autoingest_core::CaseStatus;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_inspect_case() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("Case X_20240102_030405");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("Case X.aut"), b"").unwrap();
        state_file::create(&dir, StateFileType::Interrupted).unwrap();
        alert_file::create(&dir).unwrap();
        fs::write(job_logger::log_path(&dir), "line one\nline two\n").unwrap();

        let report = inspect(&dir).unwrap();
        assert_eq!(report.summary.case_name, "Case X");
        assert_eq!(report.summary.status, CaseStatus::Interrupts);
        assert_eq!(report.markers, vec![StateFileType::Interrupted]);
        assert!(report.alert);
        assert_eq!(report.log_entries, 2);
    }

    #[test]
    fn test_folder_without_metadata_is_rejected() {
        let root = TempDir::new().unwrap();
        let err = inspect(root.path()).unwrap_err();
        assert!(matches!(err, CliError::NotACase(_)));
    }
}
