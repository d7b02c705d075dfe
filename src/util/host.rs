//! Host identification for execution records.

use std::sync::OnceLock;

/// Placeholder used when the host name cannot be determined.
pub const UNKNOWN_HOST: &str = "<error>";

static HOSTNAME: OnceLock<String> = OnceLock::new();

/// Name of the machine running the executor, resolved once.
pub fn hostname() -> &'static str {
    HOSTNAME.get_or_init(resolve)
}

fn resolve() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| UNKNOWN_HOST.to_string())
}
