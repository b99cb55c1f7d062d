//! Local host identity
//!
//! Every auto ingest node stamps its host name on the jobs it processes and on
//! the case log lines it writes, so the name must be stable for the life of the
//! process.

use std::sync::OnceLock;

/// Host name used when the operating system refuses to report one
pub const UNKNOWN_HOST_NAME: &str = "unknown";

static LOCAL_HOST_NAME: OnceLock<String> = OnceLock::new();

/// Name of the machine running this process.
///
/// Looked up once and cached. Falls back to [`UNKNOWN_HOST_NAME`] when the
/// lookup fails.
pub fn local_host_name() -> &'static str {
    LOCAL_HOST_NAME.get_or_init(|| match hostname::get() {
        Ok(name) => {
            let name = name.to_string_lossy().trim().to_string();
            if name.is_empty() {
                UNKNOWN_HOST_NAME.to_string()
            } else {
                name
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "Failed to determine local host name");
            UNKNOWN_HOST_NAME.to_string()
        },
    })
}

/// Case-insensitive host name comparison, the way node names are matched
pub fn is_same_host(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}
