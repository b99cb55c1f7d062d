//! Case folder views
//!
//! An [`AutoIngestCase`] is a read-only projection of a case folder on shared
//! storage. Dates come from the case metadata file and status from marker
//! files; neither failure mode is surfaced to callers.

use crate::state_file::{FileSystemChecker, StateFileChecker, StateFileType};
use crate::system_log::{default_system_log, SystemLog};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

/// Extension of the case metadata file
pub const CASE_METADATA_FILE_EXTENSION: &str = ".aut";

/// Timestamp appended to case folder names, `_yyyyMMdd_HHmmss`
const CASE_FOLDER_SUFFIX_PATTERN: &str = r"_\d{8}_\d{6}$";

/// Aggregate health of a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    Ok,
    Errors,
    Interrupts,
    Cancellations,
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CaseStatus::Ok => "OK",
            CaseStatus::Errors => "ERRORS",
            CaseStatus::Interrupts => "INTERRUPTS",
            CaseStatus::Cancellations => "CANCELLATIONS",
        })
    }
}

/// Marker checks in precedence order
const STATUS_MARKERS: [(StateFileType, CaseStatus); 3] = [
    (StateFileType::Cancelled, CaseStatus::Cancellations),
    (StateFileType::Error, CaseStatus::Errors),
    (StateFileType::Interrupted, CaseStatus::Interrupts),
];

/// Case name for a case folder name
pub fn case_name_from_folder(folder_name: &str) -> String {
    static SUFFIX: OnceLock<Option<Regex>> = OnceLock::new();
    match SUFFIX.get_or_init(|| Regex::new(CASE_FOLDER_SUFFIX_PATTERN).ok()) {
        Some(suffix) => suffix.replace(folder_name, "").into_owned(),
        None => folder_name.to_string(),
    }
}

#[derive(Debug, Clone, Copy)]
struct CaseDates {
    create_date: DateTime<Utc>,
    last_accessed_date: DateTime<Utc>,
}

fn read_dates(metadata_file_path: &Path) -> io::Result<CaseDates> {
    let metadata = fs::metadata(metadata_file_path)?;
    let modified = metadata.modified()?;
    // Not every file system records a creation time
    let created = metadata.created().unwrap_or(modified);
    Ok(CaseDates {
        create_date: created.into(),
        last_accessed_date: modified.into(),
    })
}

/// View of one case folder
pub struct AutoIngestCase {
    case_folder_path: PathBuf,
    case_name: String,
    metadata_file_path: PathBuf,
    dates: Mutex<CaseDates>,
    checker: Arc<dyn StateFileChecker>,
    system_log: Arc<dyn SystemLog>,
}

impl AutoIngestCase {
    pub fn new(case_folder_path: impl Into<PathBuf>) -> Self {
        Self::with_collaborators(case_folder_path, Arc::new(FileSystemChecker), default_system_log())
    }

    pub fn with_collaborators(
        case_folder_path: impl Into<PathBuf>,
        checker: Arc<dyn StateFileChecker>,
        system_log: Arc<dyn SystemLog>,
    ) -> Self {
        let case_folder_path = case_folder_path.into();
        let folder_name = case_folder_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let case_name = case_name_from_folder(&folder_name);
        let metadata_file_path = case_folder_path.join(format!("{}{}", case_name, CASE_METADATA_FILE_EXTENSION));

        let dates = match read_dates(&metadata_file_path) {
            Ok(dates) => dates,
            Err(e) => {
                system_log.error(
                    &format!(
                        "Failed to read case metadata file attributes for {}",
                        metadata_file_path.display()
                    ),
                    Some(&e),
                );
                let now = Utc::now();
                CaseDates {
                    create_date: now,
                    last_accessed_date: now,
                }
            },
        };

        Self {
            case_folder_path,
            case_name,
            metadata_file_path,
            dates: Mutex::new(dates),
            checker,
            system_log,
        }
    }

    fn dates(&self) -> MutexGuard<'_, CaseDates> {
        self.dates.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn case_folder_path(&self) -> &Path {
        &self.case_folder_path
    }

    pub fn case_name(&self) -> &str {
        &self.case_name
    }

    pub fn metadata_file_path(&self) -> &Path {
        &self.metadata_file_path
    }

    pub fn create_date(&self) -> DateTime<Utc> {
        self.dates().create_date
    }

    /// Re-read the metadata file attributes and return the last access date.
    ///
    /// Both cached dates are refreshed; on failure the previous values are
    /// kept and the failure goes to the system log.
    pub fn last_accessed_date(&self) -> DateTime<Utc> {
        match read_dates(&self.metadata_file_path) {
            Ok(fresh) => {
                *self.dates() = fresh;
                fresh.last_accessed_date
            },
            Err(e) => {
                self.system_log.error(
                    &format!(
                        "Failed to read case metadata file attributes for {}",
                        self.metadata_file_path.display()
                    ),
                    Some(&e),
                );
                self.dates().last_accessed_date
            },
        }
    }

    /// Last access date as of the most recent refresh
    pub fn cached_last_accessed_date(&self) -> DateTime<Utc> {
        self.dates().last_accessed_date
    }

    /// Status from the marker files in the case folder
    pub fn status(&self) -> CaseStatus {
        for (file_type, status) in STATUS_MARKERS {
            match self.checker.exists(&self.case_folder_path, file_type) {
                Ok(true) => return status,
                Ok(false) => {},
                Err(e) => {
                    self.system_log.error(
                        &format!("Failed to determine status of case {}", self.case_folder_path.display()),
                        Some(&e),
                    );
                    return CaseStatus::Errors;
                },
            }
        }
        CaseStatus::Ok
    }
}

impl PartialEq for AutoIngestCase {
    fn eq(&self, other: &Self) -> bool {
        self.case_folder_path == other.case_folder_path
    }
}

impl Eq for AutoIngestCase {}

impl fmt::Debug for AutoIngestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoIngestCase")
            .field("case_folder_path", &self.case_folder_path)
            .field("case_name", &self.case_name)
            .finish()
    }
}

/// Natural order: most recently accessed first
pub fn by_last_accessed_desc(a: &AutoIngestCase, b: &AutoIngestCase) -> Ordering {
    b.cached_last_accessed_date().cmp(&a.cached_last_accessed_date())
}

/// Explicit reverse-by-last-accessed ordering used by case review lists
pub fn reverse_by_last_accessed(a: &AutoIngestCase, b: &AutoIngestCase) -> Ordering {
    by_last_accessed_desc(a, b)
}

/// Most recently created first
pub fn reverse_by_create_date(a: &AutoIngestCase, b: &AutoIngestCase) -> Ordering {
    b.create_date().cmp(&a.create_date())
}

fn has_metadata_file(folder: &Path, folder_name: &str) -> bool {
    folder
        .join(format!("{}{}", case_name_from_folder(folder_name), CASE_METADATA_FILE_EXTENSION))
        .is_file()
}

/// Folder under `cases_root` holding the case named `case_name`, if one exists
pub fn find_case_directory(cases_root: &Path, case_name: &str) -> Option<PathBuf> {
    let entries = match fs::read_dir(cases_root) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(root = %cases_root.display(), error = %e, "Cannot read cases root");
            return None;
        },
    };

    entries.flatten().map(|entry| entry.path()).find(|folder| {
        let folder_name = folder
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        folder.is_dir() && case_name_from_folder(&folder_name) == case_name && has_metadata_file(folder, &folder_name)
    })
}

/// Every case folder directly under `cases_root`, most recently accessed first.
///
/// A folder counts as a case when it holds its metadata file.
pub fn list_cases(cases_root: &Path) -> io::Result<Vec<AutoIngestCase>> {
    let mut cases = Vec::new();
    for entry in fs::read_dir(cases_root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let folder = entry.path();
        let folder_name = entry.file_name().to_string_lossy().into_owned();
        if has_metadata_file(&folder, &folder_name) {
            cases.push(AutoIngestCase::new(folder));
        } else {
            tracing::debug!(folder = %folder.display(), "Skipping folder without case metadata");
        }
    }
    cases.sort_by(by_last_accessed_desc);
    Ok(cases)
}
