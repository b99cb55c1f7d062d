//! Node configuration

use crate::coordination::file::MAX_HEARTBEAT_INTERVAL;
use crate::coordination::FileCoordinationService;
use anyhow::Context;
use autoingest_common::host::local_host_name;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default shared coordination directory.
pub const DEFAULT_COORDINATION_DIR: &str = "./coordination";

/// Default root holding case folders.
pub const DEFAULT_CASES_DIR: &str = "./cases";

/// Default wait for the case log lock in seconds (15 minutes).
pub const DEFAULT_LOCK_TIMEOUT_SECS: u64 = 900;

/// Default pause between lock file attempts in milliseconds.
pub const DEFAULT_LOCK_POLL_MS: u64 = 250;

/// Default age after which a lock file is considered abandoned (1 hour).
pub const DEFAULT_STALE_LOCK_SECS: u64 = 3600;

/// Longest accepted lock wait in seconds (1 day).
pub const MAX_LOCK_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Default number of times a crashed job is retried.
pub const DEFAULT_MAX_ATTEMPTS: i32 = 2;

/// Auto ingest node configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoIngestConfig {
    pub coordination_dir: PathBuf,
    pub cases_dir: PathBuf,
    pub lock_timeout_secs: u64,
    pub lock_poll_ms: u64,
    /// Zero disables breaking stale locks
    pub stale_lock_secs: u64,
    pub max_attempts: i32,
    pub host_name: String,
}

impl Default for AutoIngestConfig {
    fn default() -> Self {
        Self {
            coordination_dir: PathBuf::from(DEFAULT_COORDINATION_DIR),
            cases_dir: PathBuf::from(DEFAULT_CASES_DIR),
            lock_timeout_secs: DEFAULT_LOCK_TIMEOUT_SECS,
            lock_poll_ms: DEFAULT_LOCK_POLL_MS,
            stale_lock_secs: DEFAULT_STALE_LOCK_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            host_name: local_host_name().to_string(),
        }
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {} ({})", name, value, e)),
        Err(_) => Ok(default),
    }
}

impl AutoIngestConfig {
    /// Load `.env` if present, then read the environment
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Read the environment over the defaults and validate
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let config = Self {
            coordination_dir: std::env::var("AUTOINGEST_COORDINATION_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.coordination_dir),
            cases_dir: std::env::var("AUTOINGEST_CASES_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cases_dir),
            lock_timeout_secs: env_parsed("AUTOINGEST_LOCK_TIMEOUT_SECS", defaults.lock_timeout_secs)?,
            lock_poll_ms: env_parsed("AUTOINGEST_LOCK_POLL_MS", defaults.lock_poll_ms)?,
            stale_lock_secs: env_parsed("AUTOINGEST_STALE_LOCK_SECS", defaults.stale_lock_secs)?,
            max_attempts: env_parsed("AUTOINGEST_MAX_ATTEMPTS", defaults.max_attempts)?,
            host_name: std::env::var("AUTOINGEST_HOST_NAME").unwrap_or(defaults.host_name),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.coordination_dir.as_os_str().is_empty() {
            anyhow::bail!("Coordination directory cannot be empty");
        }

        if self.cases_dir.as_os_str().is_empty() {
            anyhow::bail!("Cases directory cannot be empty");
        }

        if self.lock_poll_ms == 0 {
            anyhow::bail!("Lock poll interval must be greater than 0");
        }

        if self.lock_poll_ms > self.lock_timeout_secs.saturating_mul(1000) && self.lock_timeout_secs > 0 {
            anyhow::bail!("Lock poll interval cannot be longer than the lock timeout");
        }

        if self.lock_timeout_secs > MAX_LOCK_TIMEOUT_SECS {
            anyhow::bail!("Lock timeout cannot exceed {} seconds", MAX_LOCK_TIMEOUT_SECS);
        }

        // Every holder touches its lock at least this often, whatever its own settings
        let min_stale_secs = 2 * MAX_HEARTBEAT_INTERVAL.as_secs();
        if self.stale_lock_secs > 0 && self.stale_lock_secs < min_stale_secs {
            anyhow::bail!(
                "Stale lock age must be 0 (disabled) or at least {} seconds",
                min_stale_secs
            );
        }

        if self.max_attempts < 1 {
            anyhow::bail!("Max attempts must be at least 1");
        }

        if self.host_name.trim().is_empty() {
            anyhow::bail!("Host name cannot be empty");
        }

        Ok(())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    pub fn lock_poll_interval(&self) -> Duration {
        Duration::from_millis(self.lock_poll_ms)
    }

    pub fn stale_lock_age(&self) -> Option<Duration> {
        (self.stale_lock_secs > 0).then(|| Duration::from_secs(self.stale_lock_secs))
    }

    /// Open the shared-directory coordination service this node uses
    pub fn coordination_service(&self) -> anyhow::Result<FileCoordinationService> {
        let service = FileCoordinationService::new(&self.coordination_dir, &self.host_name)
            .with_context(|| {
                format!(
                    "Failed to open coordination directory {}",
                    self.coordination_dir.display()
                )
            })?
            .with_poll_interval(self.lock_poll_interval())
            .with_stale_lock_age(self.stale_lock_age());
        Ok(service)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 7] = [
        "AUTOINGEST_COORDINATION_DIR",
        "AUTOINGEST_CASES_DIR",
        "AUTOINGEST_LOCK_TIMEOUT_SECS",
        "AUTOINGEST_LOCK_POLL_MS",
        "AUTOINGEST_STALE_LOCK_SECS",
        "AUTOINGEST_MAX_ATTEMPTS",
        "AUTOINGEST_HOST_NAME",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = AutoIngestConfig::from_env().unwrap();
        assert_eq!(config.coordination_dir, PathBuf::from("./coordination"));
        assert_eq!(config.lock_timeout(), Duration::from_secs(900));
        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.stale_lock_age(), Some(Duration::from_secs(3600)));
        assert_eq!(config.host_name, local_host_name());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        std::env::set_var("AUTOINGEST_CASES_DIR", "/srv/cases");
        std::env::set_var("AUTOINGEST_LOCK_TIMEOUT_SECS", "30");
        std::env::set_var("AUTOINGEST_STALE_LOCK_SECS", "0");
        std::env::set_var("AUTOINGEST_HOST_NAME", "node7");

        let config = AutoIngestConfig::from_env().unwrap();
        assert_eq!(config.cases_dir, PathBuf::from("/srv/cases"));
        assert_eq!(config.lock_timeout(), Duration::from_secs(30));
        assert_eq!(config.stale_lock_age(), None);
        assert_eq!(config.host_name, "node7");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_values_are_rejected() {
        clear_env();
        std::env::set_var("AUTOINGEST_MAX_ATTEMPTS", "many");
        let err = AutoIngestConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("AUTOINGEST_MAX_ATTEMPTS"));

        std::env::set_var("AUTOINGEST_MAX_ATTEMPTS", "0");
        assert!(AutoIngestConfig::from_env().is_err());
        clear_env();
    }

    #[test]
    fn test_validate_poll_interval() {
        let config = AutoIngestConfig {
            lock_poll_ms: 0,
            ..AutoIngestConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_lock_timeout_bound() {
        let config = AutoIngestConfig {
            lock_timeout_secs: MAX_LOCK_TIMEOUT_SECS,
            ..AutoIngestConfig::default()
        };
        assert!(config.validate().is_ok());

        let config = AutoIngestConfig {
            lock_timeout_secs: u64::MAX,
            ..AutoIngestConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Lock timeout cannot exceed"));
    }

    #[test]
    fn test_validate_stale_lock_age() {
        for (secs, ok) in [(0, true), (1, false), (59, false), (60, true), (3600, true)] {
            let config = AutoIngestConfig {
                stale_lock_secs: secs,
                ..AutoIngestConfig::default()
            };
            assert_eq!(config.validate().is_ok(), ok, "stale_lock_secs = {}", secs);
        }
    }

    #[test]
    #[serial]
    fn test_huge_lock_timeout_from_env_is_rejected() {
        clear_env();
        std::env::set_var("AUTOINGEST_LOCK_TIMEOUT_SECS", u64::MAX.to_string());
        assert!(AutoIngestConfig::from_env().is_err());
        clear_env();
    }

    #[test]
    fn test_coordination_service_creates_layout() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = AutoIngestConfig {
            coordination_dir: dir.path().join("coord"),
            ..AutoIngestConfig::default()
        };
        let service = config.coordination_service().unwrap();
        assert!(service.root().join("manifests").is_dir());
    }
}
