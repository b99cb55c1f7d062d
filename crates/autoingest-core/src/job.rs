//! Auto ingest jobs
//!
//! An [`AutoIngestJob`] is a node-local view of one manifest's processing.
//! All state sits behind a single mutex; each accessor locks it for the
//! duration of the call only, so a check followed by an update is not atomic.

use crate::job_node_data::{JobNodeData, CURRENT_VERSION};
use crate::manifest::Manifest;
use crate::node_data::ProcessingStatus;
use crate::stage::{stage_display_text, Stage, StageDetails};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Data source level ingest module currently running
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningModule {
    pub display_name: String,
    pub start_time: DateTime<Utc>,
    pub cancelled: bool,
}

/// What a job needs to know about the ingest execution running it
pub trait IngestProgress: Send + Sync {
    fn running_data_source_module(&self) -> Option<RunningModule>;

    /// When file level analysis started
    fn file_ingest_start_time(&self) -> DateTime<Utc>;

    /// Ask the execution to stop
    fn cancel(&self) {}
}

struct JobState {
    node_name: String,
    case_directory_path: Option<PathBuf>,
    priority: i32,
    stage: Stage,
    stage_start_date: DateTime<Utc>,
    processing_status: ProcessingStatus,
    number_of_crashes: i32,
    completed_date: DateTime<Utc>,
    errors_occurred: bool,
    data_source_size: i64,
    progress: Option<Arc<dyn IngestProgress>>,
    cancelled: bool,
    completed: bool,
}

impl JobState {
    fn set_stage(&mut self, stage: Stage, timestamp: DateTime<Utc>) -> bool {
        if self.stage == Stage::Cancelled && stage != Stage::Completed {
            return false;
        }
        self.stage = stage;
        self.stage_start_date = timestamp;
        true
    }

    fn stage_details(&self) -> StageDetails {
        let progress = match (&self.progress, self.stage) {
            (Some(progress), stage) if stage != Stage::Cancelled => progress,
            _ => return StageDetails::new(stage_display_text(self.stage), self.stage_start_date),
        };

        match progress.running_data_source_module() {
            Some(module) if module.cancelled => StageDetails::new(
                format!("{} ({})", stage_display_text(Stage::CancellingModule), module.display_name),
                module.start_time,
            ),
            Some(module) => StageDetails::new(module.display_name, module.start_time),
            // File level modules, or another ingest job for the same data source
            None => StageDetails::new(
                stage_display_text(Stage::AnalyzingFiles),
                progress.file_ingest_start_time(),
            ),
        }
    }
}

/// One manifest's processing, as seen by this node
pub struct AutoIngestJob {
    manifest: Manifest,
    state: Mutex<JobState>,
}

impl AutoIngestJob {
    /// Job for a manifest this node just picked up
    pub fn new(manifest: Manifest) -> Self {
        let created = manifest.date_file_created();
        Self {
            manifest,
            state: Mutex::new(JobState {
                node_name: String::new(),
                case_directory_path: None,
                priority: 0,
                stage: Stage::Pending,
                stage_start_date: created,
                processing_status: ProcessingStatus::Pending,
                number_of_crashes: 0,
                completed_date: DateTime::UNIX_EPOCH,
                errors_occurred: false,
                data_source_size: 0,
                progress: None,
                cancelled: false,
                completed: false,
            }),
        }
    }

    /// Rebuild a job from coordination service data
    pub fn from_node_data(data: &JobNodeData) -> Self {
        let manifest = Manifest::new(
            &data.manifest_file_path,
            data.manifest_file_date,
            &data.case_name,
            &data.device_id,
            &data.data_source_path,
        );
        let case_directory_path = if data.case_directory_path.is_empty() {
            None
        } else {
            Some(PathBuf::from(&data.case_directory_path))
        };

        Self {
            manifest,
            state: Mutex::new(JobState {
                node_name: data.processing_host_name.clone(),
                case_directory_path,
                priority: data.priority,
                stage: data.stage,
                stage_start_date: data.stage_start_date,
                processing_status: data.processing_status,
                number_of_crashes: data.number_of_crashes,
                completed_date: data.completed_date,
                errors_occurred: data.errors_occurred,
                data_source_size: data.data_source_size,
                progress: None,
                cancelled: false,
                completed: false,
            }),
        }
    }

    /// Snapshot for the coordination service
    pub fn to_node_data(&self) -> JobNodeData {
        let state = self.state();
        let details = state.stage_details();
        JobNodeData {
            version: CURRENT_VERSION,
            processing_status: state.processing_status,
            priority: state.priority,
            number_of_crashes: state.number_of_crashes,
            completed_date: state.completed_date,
            errors_occurred: state.errors_occurred,
            device_id: self.manifest.device_id().to_string(),
            case_name: self.manifest.case_name().to_string(),
            case_directory_path: state
                .case_directory_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            manifest_file_date: self.manifest.date_file_created(),
            manifest_file_path: self.manifest.node_path(),
            data_source_path: self.manifest.data_source_path().to_string_lossy().into_owned(),
            stage: state.stage,
            stage_start_date: state.stage_start_date,
            stage_details_description: details.description,
            stage_details_start_date: details.start_date,
            processing_host_name: state.node_name.clone(),
            data_source_size: state.data_source_size,
        }
    }

    fn state(&self) -> MutexGuard<'_, JobState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn set_case_directory_path(&self, path: impl Into<PathBuf>) {
        self.state().case_directory_path = Some(path.into());
    }

    pub fn clear_case_directory_path(&self) {
        self.state().case_directory_path = None;
    }

    /// `None` until the case directory has been created or resolved
    pub fn case_directory_path(&self) -> Option<PathBuf> {
        self.state().case_directory_path.clone()
    }

    pub fn has_case_directory_path(&self) -> bool {
        self.state().case_directory_path.is_some()
    }

    pub fn priority(&self) -> i32 {
        self.state().priority
    }

    pub fn set_priority(&self, priority: i32) {
        self.state().priority = priority;
    }

    /// Move to a new stage.
    ///
    /// A cancelled job only accepts [`Stage::Completed`]; any other
    /// transition is ignored and `false` is returned.
    pub fn set_stage(&self, stage: Stage, timestamp: DateTime<Utc>) -> bool {
        self.state().set_stage(stage, timestamp)
    }

    pub fn set_stage_now(&self, stage: Stage) -> bool {
        self.set_stage(stage, Utc::now())
    }

    pub fn stage(&self) -> Stage {
        self.state().stage
    }

    pub fn stage_start_date(&self) -> DateTime<Utc> {
        self.state().stage_start_date
    }

    /// Current activity, preferring live data from an attached execution
    pub fn stage_details(&self) -> StageDetails {
        self.state().stage_details()
    }

    pub fn set_ingest_progress(&self, progress: Option<Arc<dyn IngestProgress>>) {
        self.state().progress = progress;
    }

    pub fn has_ingest_progress(&self) -> bool {
        self.state().progress.is_some()
    }

    /// Cancel the job and the execution attached to it
    pub fn cancel(&self) {
        let progress = {
            let mut state = self.state();
            state.set_stage(Stage::Cancelled, Utc::now());
            state.cancelled = true;
            state.errors_occurred = true;
            state.progress.clone()
        };
        // The execution may call back into this job while cancelling
        if let Some(progress) = progress {
            progress.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state().cancelled
    }

    pub fn set_completed(&self) {
        let mut state = self.state();
        let now = Utc::now();
        state.set_stage(Stage::Completed, now);
        state.completed = true;
        state.completed_date = now;
    }

    pub fn is_completed(&self) -> bool {
        self.state().completed
    }

    pub fn completed_date(&self) -> DateTime<Utc> {
        self.state().completed_date
    }

    pub fn set_completed_date(&self, completed_date: DateTime<Utc>) {
        self.state().completed_date = completed_date;
    }

    pub fn errors_occurred(&self) -> bool {
        self.state().errors_occurred
    }

    pub fn set_errors_occurred(&self, errors_occurred: bool) {
        self.state().errors_occurred = errors_occurred;
    }

    /// Host processing the job, empty when none has claimed it
    pub fn node_name(&self) -> String {
        self.state().node_name.clone()
    }

    pub fn set_node_name(&self, node_name: impl Into<String>) {
        self.state().node_name = node_name.into();
    }

    pub fn processing_status(&self) -> ProcessingStatus {
        self.state().processing_status
    }

    pub fn set_processing_status(&self, status: ProcessingStatus) {
        self.state().processing_status = status;
    }

    pub fn number_of_crashes(&self) -> i32 {
        self.state().number_of_crashes
    }

    pub fn set_number_of_crashes(&self, number_of_crashes: i32) {
        self.state().number_of_crashes = number_of_crashes;
    }

    pub fn data_source_size(&self) -> i64 {
        self.state().data_source_size
    }

    pub fn set_data_source_size(&self, size: i64) {
        self.state().data_source_size = size;
    }

    fn manifest_path(&self) -> &Path {
        self.manifest.file_path()
    }
}

impl PartialEq for AutoIngestJob {
    fn eq(&self, other: &Self) -> bool {
        self.manifest_path() == other.manifest_path()
    }
}

impl Eq for AutoIngestJob {}

impl Hash for AutoIngestJob {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.manifest_path().hash(state);
    }
}

impl fmt::Debug for AutoIngestJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("AutoIngestJob")
            .field("manifest", &self.manifest.file_path())
            .field("case_name", &self.manifest.case_name())
            .field("node_name", &state.node_name)
            .field("priority", &state.priority)
            .field("stage", &state.stage)
            .finish()
    }
}

/// Natural order: most recently created manifest first
pub fn by_manifest_date_desc(a: &AutoIngestJob, b: &AutoIngestJob) -> Ordering {
    b.manifest.date_file_created().cmp(&a.manifest.date_file_created())
}

/// Most recently changed stage first
pub fn by_stage_start_desc(a: &AutoIngestJob, b: &AutoIngestJob) -> Ordering {
    b.stage_start_date().cmp(&a.stage_start_date())
}

/// Highest priority first; within a priority the oldest manifest comes first
pub fn by_priority(a: &AutoIngestJob, b: &AutoIngestJob) -> Ordering {
    b.priority()
        .cmp(&a.priority())
        .then_with(|| a.manifest.date_file_created().cmp(&b.manifest.date_file_created()))
}

/// Most recently completed first
pub fn by_completed_date_desc(a: &AutoIngestJob, b: &AutoIngestJob) -> Ordering {
    b.completed_date().cmp(&a.completed_date())
}

/// Jobs processed by `local_host` first, then by case name ignoring case
pub fn by_local_host_then_case_name(local_host: &str) -> impl Fn(&AutoIngestJob, &AutoIngestJob) -> Ordering + '_ {
    move |a: &AutoIngestJob, b: &AutoIngestJob| {
        let a_local = a.node_name().eq_ignore_ascii_case(local_host);
        let b_local = b.node_name().eq_ignore_ascii_case(local_host);
        b_local.cmp(&a_local).then_with(|| {
            a.manifest
                .case_name()
                .to_lowercase()
                .cmp(&b.manifest.case_name().to_lowercase())
        })
    }
}
