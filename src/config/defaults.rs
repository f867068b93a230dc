//! Default values for configuration options.
//!
//! Centralized constants to avoid magic numbers scattered across the codebase.

use std::time::Duration;

/// Default polling interval in milliseconds.
pub const POLL_INTERVAL_MS: u64 = 2000;

/// Default output path of `ifwatch init`.
pub const CONFIG_FILE: &str = "ifwatch.toml";

/// Default polling interval as Duration.
#[must_use]
pub const fn poll_interval() -> Duration {
    Duration::from_millis(POLL_INTERVAL_MS)
}
