//! Coordination over a shared directory
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<category>/locks/<sha256(node_path)>.lock   owner record, present while held
//! <root>/<category>/data/<sha256(node_path)>.node    node payload
//! <root>/<category>/data/<sha256(node_path)>.key     node path as given
//! ```
//!
//! A lock is taken by creating its lock file with `create_new`, which is
//! atomic on local and NFS v3+ volumes. While the [`Lock`] guard is alive a
//! heartbeat thread keeps touching the file. Hosts that die while holding a
//! lock leave the file behind and its modification time stops moving; a lock
//! file untouched for longer than the configured stale age is broken by the
//! next waiter.
//!
//! Breaking renames the file to a unique name before deleting it, and puts it
//! back when the renamed file turns out to belong to a newer owner than the
//! one judged stale.

use super::{CategoryNode, CoordinationError, CoordinationService, Interrupt, Lock, LockRelease};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime};
use uuid::Uuid;

/// Default pause between attempts to create a held lock file
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Longest gap between two touches of a held lock file
pub const MAX_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

const LOCKS_DIR: &str = "locks";
const DATA_DIR: &str = "data";
const LOCK_EXTENSION: &str = "lock";
const NODE_EXTENSION: &str = "node";
const KEY_EXTENSION: &str = "key";

/// Contents of a lock file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockOwner {
    pub host_name: String,
    pub process_id: u32,
    pub token: Uuid,
    pub node_path: String,
    pub acquired_at: DateTime<Utc>,
}

/// Coordination service for hosts sharing a directory
#[derive(Debug, Clone)]
pub struct FileCoordinationService {
    root: PathBuf,
    host_name: String,
    poll_interval: Duration,
    stale_lock_age: Option<Duration>,
    interrupt: Interrupt,
}

impl FileCoordinationService {
    /// Open (and if needed create) the coordination directory tree
    pub fn new(root: impl Into<PathBuf>, host_name: impl Into<String>) -> io::Result<Self> {
        let root = root.into();
        for category in CategoryNode::ALL {
            fs::create_dir_all(root.join(category.as_str()).join(LOCKS_DIR))?;
            fs::create_dir_all(root.join(category.as_str()).join(DATA_DIR))?;
        }

        Ok(Self {
            root,
            host_name: host_name.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            stale_lock_age: None,
            interrupt: Interrupt::default(),
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(Duration::from_millis(1));
        self
    }

    /// Break lock files untouched for longer than `age`; `None` never breaks locks.
    ///
    /// Holders touch their lock files every quarter of their own stale age and
    /// at least every [`MAX_HEARTBEAT_INTERVAL`], so ages well above that bound
    /// are safe even between hosts configured differently.
    pub fn with_stale_lock_age(mut self, age: Option<Duration>) -> Self {
        self.stale_lock_age = age;
        self
    }

    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn interrupt_handle(&self) -> Interrupt {
        self.interrupt.clone()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn heartbeat_interval(&self) -> Duration {
        self.stale_lock_age
            .map(|age| age / 4)
            .unwrap_or(MAX_HEARTBEAT_INTERVAL)
            .clamp(Duration::from_millis(1), MAX_HEARTBEAT_INTERVAL)
    }

    fn node_file_stem(node_path: &str) -> String {
        hex::encode(Sha256::digest(node_path.as_bytes()))
    }

    fn lock_file_path(&self, category: CategoryNode, node_path: &str) -> PathBuf {
        self.root
            .join(category.as_str())
            .join(LOCKS_DIR)
            .join(format!("{}.{}", Self::node_file_stem(node_path), LOCK_EXTENSION))
    }

    fn data_file_path(&self, category: CategoryNode, node_path: &str, extension: &str) -> PathBuf {
        self.root
            .join(category.as_str())
            .join(DATA_DIR)
            .join(format!("{}.{}", Self::node_file_stem(node_path), extension))
    }

    /// Create the lock file; `Ok(false)` when another owner holds it
    fn try_create_lock_file(&self, path: &Path, owner: &LockOwner) -> io::Result<bool> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(e),
        };

        let record = serde_json::to_vec(owner).map_err(io::Error::other)?;
        if let Err(e) = file.write_all(&record).and_then(|_| file.sync_all()) {
            // A half-written lock file would block every other host until it went stale
            let _ = fs::remove_file(path);
            return Err(e);
        }
        Ok(true)
    }

    /// Break the lock file if it has gone untouched for the stale age.
    ///
    /// Returns `Ok(true)` when the caller should retry creating the lock.
    fn break_if_stale(&self, path: &Path, node_path: &str) -> io::Result<bool> {
        let Some(max_age) = self.stale_lock_age else {
            return Ok(false);
        };

        let modified = match fs::metadata(path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(e),
        };

        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if age < max_age {
            return Ok(false);
        }

        let observed = read_lock_owner(path).ok();
        tracing::warn!(
            node_path = %node_path,
            age_secs = age.as_secs(),
            owner_host = observed.as_ref().map(|o| o.host_name.as_str()).unwrap_or("unknown"),
            "Breaking stale coordination lock"
        );
        self.claim_stale_lock(path, observed.map(|o| o.token), node_path)
    }

    /// Move a lock file judged stale out of the way and delete it.
    ///
    /// `observed` is the owner token seen when the file was judged stale. If the
    /// moved file carries another token, a new owner took the lock in between;
    /// its file is linked back into place and `Ok(false)` is returned.
    fn claim_stale_lock(&self, path: &Path, observed: Option<Uuid>, node_path: &str) -> io::Result<bool> {
        let claimed = path.with_extension(format!("stale-{}", Uuid::new_v4().simple()));
        match fs::rename(path, &claimed) {
            Ok(()) => {},
            // Another waiter broke it first
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(e),
        }

        let claimed_token = read_lock_owner(&claimed).ok().map(|o| o.token);
        if claimed_token != observed {
            match fs::hard_link(&claimed, path) {
                Ok(()) => {},
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    tracing::warn!(
                        node_path = %node_path,
                        "Live lock moved aside while breaking a stale one could not be restored"
                    );
                },
                Err(e) => {
                    let _ = fs::remove_file(&claimed);
                    return Err(e);
                },
            }
            remove_if_present(&claimed)?;
            return Ok(false);
        }

        remove_if_present(&claimed)?;
        Ok(true)
    }

    fn io_error<'a>(
        operation: &'static str,
        category: CategoryNode,
        node_path: &'a str,
    ) -> impl FnOnce(io::Error) -> CoordinationError + 'a {
        move |source| CoordinationError::Io {
            operation,
            category,
            node_path: node_path.to_string(),
            source,
        }
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn read_lock_owner(path: &Path) -> io::Result<LockOwner> {
    let bytes = fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Write through a temporary sibling and rename so readers never see a partial payload
fn write_atomically(path: &Path, contents: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension(format!("tmp-{}", Uuid::new_v4().simple()));
    let result = (|| {
        let mut file = OpenOptions::new().write(true).create_new(true).open(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// Touch the lock file if it still belongs to `token`; `false` stops the heartbeat
fn touch_lock_file(path: &Path, token: Uuid) -> bool {
    match read_lock_owner(path) {
        Ok(owner) if owner.token == token => {
            let touched = OpenOptions::new()
                .write(true)
                .open(path)
                .and_then(|file| file.set_modified(SystemTime::now()));
            if let Err(e) = touched {
                tracing::warn!(file = %path.display(), error = %e, "Failed to refresh held lock");
            }
            true
        },
        Ok(owner) => {
            tracing::warn!(
                file = %path.display(),
                current_owner = %owner.host_name,
                "Held lock was broken and taken over"
            );
            false
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(file = %path.display(), "Held lock file vanished");
            false
        },
        Err(e) => {
            tracing::warn!(file = %path.display(), error = %e, "Failed to read held lock");
            true
        },
    }
}

/// Background thread keeping a held lock file fresh
struct Heartbeat {
    stop: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl Heartbeat {
    fn start(path: PathBuf, token: Uuid, interval: Duration) -> io::Result<Self> {
        let (stop, stopped) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("lock-heartbeat".to_string())
            .spawn(move || loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if !touch_lock_file(&path, token) {
                            break;
                        }
                    },
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;
        Ok(Self { stop, handle })
    }

    fn stop(self) {
        drop(self.stop);
        let _ = self.handle.join();
    }
}

struct FileLockRelease {
    path: PathBuf,
    token: Uuid,
    category: CategoryNode,
    node_path: String,
    heartbeat: Option<Heartbeat>,
}

impl LockRelease for FileLockRelease {
    fn release(&mut self) -> Result<(), CoordinationError> {
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.stop();
        }

        let to_error = |source: io::Error| CoordinationError::Io {
            operation: "release exclusive lock",
            category: self.category,
            node_path: self.node_path.clone(),
            source,
        };

        match read_lock_owner(&self.path) {
            Ok(owner) if owner.token == self.token => remove_if_present(&self.path).map_err(to_error),
            Ok(owner) => {
                tracing::warn!(
                    node_path = %self.node_path,
                    current_owner = %owner.host_name,
                    "Lock was broken and taken over before release"
                );
                Ok(())
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(node_path = %self.node_path, "Lock file vanished before release");
                Ok(())
            },
            Err(e) => Err(to_error(e)),
        }
    }
}

impl CoordinationService for FileCoordinationService {
    fn try_exclusive_lock(
        &self,
        category: CategoryNode,
        node_path: &str,
        timeout: Duration,
    ) -> Result<Option<Lock>, CoordinationError> {
        let path = self.lock_file_path(category, node_path);
        let owner = LockOwner {
            host_name: self.host_name.clone(),
            process_id: std::process::id(),
            token: Uuid::new_v4(),
            node_path: node_path.to_string(),
            acquired_at: Utc::now(),
        };
        // A timeout too large to represent waits forever
        let deadline = Instant::now().checked_add(timeout);

        loop {
            if self.interrupt.is_interrupted() {
                return Err(CoordinationError::Interrupted {
                    category,
                    node_path: node_path.to_string(),
                });
            }

            let created = self
                .try_create_lock_file(&path, &owner)
                .map_err(Self::io_error("get exclusive lock", category, node_path))?;
            if created {
                let heartbeat = match Heartbeat::start(path.clone(), owner.token, self.heartbeat_interval()) {
                    Ok(heartbeat) => heartbeat,
                    Err(e) => {
                        let _ = fs::remove_file(&path);
                        return Err(Self::io_error("start lock heartbeat", category, node_path)(e));
                    },
                };
                tracing::debug!(category = %category, node_path = %node_path, "Acquired exclusive lock");
                return Ok(Some(Lock::new(
                    category,
                    node_path,
                    Box::new(FileLockRelease {
                        path,
                        token: owner.token,
                        category,
                        node_path: node_path.to_string(),
                        heartbeat: Some(heartbeat),
                    }),
                )));
            }

            if self
                .break_if_stale(&path, node_path)
                .map_err(Self::io_error("break stale lock", category, node_path))?
            {
                continue;
            }

            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        tracing::debug!(category = %category, node_path = %node_path, "Timed out waiting for exclusive lock");
                        return Ok(None);
                    }
                    (deadline - now).min(self.poll_interval)
                },
                None => self.poll_interval,
            };
            thread::sleep(pause);
        }
    }

    fn node_data(&self, category: CategoryNode, node_path: &str) -> Result<Option<Vec<u8>>, CoordinationError> {
        match fs::read(self.data_file_path(category, node_path, NODE_EXTENSION)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error("get node data", category, node_path)(e)),
        }
    }

    fn set_node_data(&self, category: CategoryNode, node_path: &str, data: &[u8]) -> Result<(), CoordinationError> {
        let key_path = self.data_file_path(category, node_path, KEY_EXTENSION);
        if !key_path.exists() {
            write_atomically(&key_path, node_path.as_bytes())
                .map_err(Self::io_error("set node data", category, node_path))?;
        }
        write_atomically(&self.data_file_path(category, node_path, NODE_EXTENSION), data)
            .map_err(Self::io_error("set node data", category, node_path))
    }

    fn delete_node_data(&self, category: CategoryNode, node_path: &str) -> Result<(), CoordinationError> {
        for extension in [NODE_EXTENSION, KEY_EXTENSION] {
            match fs::remove_file(self.data_file_path(category, node_path, extension)) {
                Ok(()) => {},
                Err(e) if e.kind() == io::ErrorKind::NotFound => {},
                Err(e) => return Err(Self::io_error("delete node data", category, node_path)(e)),
            }
        }
        Ok(())
    }

    fn node_list(&self, category: CategoryNode) -> Result<Vec<String>, CoordinationError> {
        let dir = self.root.join(category.as_str()).join(DATA_DIR);
        let list_error = |source: io::Error| CoordinationError::Io {
            operation: "list nodes",
            category,
            node_path: String::new(),
            source,
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(&dir).map_err(list_error)? {
            let entry = entry.map_err(list_error)?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(NODE_EXTENSION) {
                continue;
            }
            match fs::read_to_string(path.with_extension(KEY_EXTENSION)) {
                Ok(key) => paths.push(key),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::warn!(file = %path.display(), "Node data without key file, skipping");
                },
                Err(e) => return Err(list_error(e)),
            }
        }
        paths.sort();
        Ok(paths)
    }
}
