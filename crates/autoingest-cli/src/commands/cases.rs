//! List case folders
//!
//! Implements `autoingest cases`.

use super::load_config;
use crate::error::{CliError, Result};
use crate::output;
use autoingest_core::case::{self, AutoIngestCase};
use autoingest_core::CaseStatus;
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One case as rendered by the listing commands
#[derive(Debug, Serialize)]
pub struct CaseSummary {
    pub case_name: String,
    pub case_folder: PathBuf,
    pub status: CaseStatus,
    pub created: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

impl From<&AutoIngestCase> for CaseSummary {
    fn from(case: &AutoIngestCase) -> Self {
        Self {
            case_name: case.case_name().to_string(),
            case_folder: case.case_folder_path().to_path_buf(),
            status: case.status(),
            created: case.create_date(),
            last_accessed: case.cached_last_accessed_date(),
        }
    }
}

/// Run the cases command
pub fn run(root: Option<PathBuf>, json: bool) -> Result<()> {
    let root = match root {
        Some(root) => root,
        None => load_config()?.cases_dir,
    };

    let summaries = collect(&root)?;

    if json {
        return output::print_json(&summaries);
    }

    println!("{}", format!("Cases in {}", root.display()).cyan().bold());
    println!();

    if summaries.is_empty() {
        println!("  {}", "No cases found".yellow());
        return Ok(());
    }

    let mut table = output::table(vec!["Case", "Status", "Created", "Last Accessed", "Folder"]);
    for summary in &summaries {
        table.add_row(vec![
            summary.case_name.clone(),
            summary.status.to_string(),
            output::format_date(summary.created),
            output::format_date(summary.last_accessed),
            summary.case_folder.display().to_string(),
        ]);
    }
    println!("{}", table);
    println!();
    println!("  {} {}", "Total:".bold(), summaries.len());

    Ok(())
}

/// Summaries of every case under `root`, most recently accessed first
pub fn collect(root: &Path) -> Result<Vec<CaseSummary>> {
    if !root.is_dir() {
        return Err(CliError::file_not_found(root.display().to_string()));
    }
    let cases = case::list_cases(root)?;
    tracing::debug!(root = %root.display(), count = cases.len(), "Listed cases");
    Ok(cases.iter().map(CaseSummary::from).collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use autoingest_core::state_file::{self, StateFileType};
    use std::fs;
    use tempfile::TempDir;

    fn make_case(root: &Path, folder: &str, name: &str) -> PathBuf {
        let dir = root.join(folder);
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join(format!("{}.aut", name)), b"").unwrap();
        dir
    }

    #[test]
    fn test_collect_reports_status() {
        let root = TempDir::new().unwrap();
        make_case(root.path(), "Alpha_20240102_030405", "Alpha");
        let beta = make_case(root.path(), "Beta_20240103_030405", "Beta");
        fs::create_dir(root.path().join("not-a-case")).unwrap();
        state_file::create(&beta, StateFileType::Error).unwrap();

        let summaries = collect(root.path()).unwrap();
        assert_eq!(summaries.len(), 2);
        let beta = summaries.iter().find(|s| s.case_name == "Beta").unwrap();
        assert_eq!(beta.status, CaseStatus::Errors);
        let alpha = summaries.iter().find(|s| s.case_name == "Alpha").unwrap();
        assert_eq!(alpha.status, CaseStatus::Ok);
    }

    #[test]
    fn test_collect_missing_root() {
        let root = TempDir::new().unwrap();
        let err = collect(&root.path().join("missing")).unwrap_err();
        assert!(matches!(err, CliError::FileNotFound(_)));
    }
}
