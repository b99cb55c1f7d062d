//! Node-local diagnostic log
//!
//! Components that must leave a diagnostic trail on the local node (lock
//! timeouts, failed alert files, unreadable case metadata) write through a
//! [`SystemLog`] handed to them at construction instead of reaching for a
//! global logger. Production code uses [`TracingSystemLog`]; tests and
//! embedding applications can capture entries with [`MemorySystemLog`].

use std::error::Error as StdError;
use std::sync::{Arc, Mutex, PoisonError};

/// Tracing target used for system log records
pub const SYSTEM_LOG_TARGET: &str = "autoingest::system";

/// Injected logging capability
pub trait SystemLog: Send + Sync {
    fn info(&self, message: &str);

    fn warn(&self, message: &str);

    /// Record a failure, with its cause chain when there is one
    fn error(&self, message: &str, cause: Option<&(dyn StdError + 'static)>);
}

/// Shared handle to the default system log
pub fn default_system_log() -> Arc<dyn SystemLog> {
    Arc::new(TracingSystemLog)
}

/// Render an error and all of its sources as one line
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

/// Forwards system log entries to the installed tracing subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSystemLog;

impl SystemLog for TracingSystemLog {
    fn info(&self, message: &str) {
        tracing::info!(target: SYSTEM_LOG_TARGET, "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: SYSTEM_LOG_TARGET, "{}", message);
    }

    fn error(&self, message: &str, cause: Option<&(dyn StdError + 'static)>) {
        match cause {
            Some(cause) => {
                tracing::error!(target: SYSTEM_LOG_TARGET, error = %error_chain(cause), "{}", message)
            },
            None => tracing::error!(target: SYSTEM_LOG_TARGET, "{}", message),
        }
    }
}

/// Severity of a captured entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemLogLevel {
    Info,
    Warn,
    Error,
}

/// One captured entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemLogEntry {
    pub level: SystemLogLevel,
    pub message: String,
    /// Rendered cause chain for error entries
    pub cause: Option<String>,
}

/// Keeps entries in memory
#[derive(Debug, Default)]
pub struct MemorySystemLog {
    entries: Mutex<Vec<SystemLogEntry>>,
}

impl MemorySystemLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<SystemLogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn errors(&self) -> Vec<SystemLogEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.level == SystemLogLevel::Error)
            .collect()
    }

    fn push(&self, level: SystemLogLevel, message: &str, cause: Option<String>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SystemLogEntry {
                level,
                message: message.to_string(),
                cause,
            });
    }
}

impl SystemLog for MemorySystemLog {
    fn info(&self, message: &str) {
        self.push(SystemLogLevel::Info, message, None);
    }

    fn warn(&self, message: &str) {
        self.push(SystemLogLevel::Warn, message, None);
    }

    fn error(&self, message: &str, cause: Option<&(dyn StdError + 'static)>) {
        self.push(SystemLogLevel::Error, message, cause.map(error_chain));
    }
}
