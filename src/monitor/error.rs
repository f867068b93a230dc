//! Error types for the monitor layer.

use crate::network::SupplyError;
use thiserror::Error;

/// Error type for monitor operations.
///
/// Describes failures during interface monitoring.
/// Callers decide recovery strategy based on the error variant.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The interface supplier failed.
    #[error("Failed to get network interfaces: {0}")]
    Supply(#[from] SupplyError),

    /// The poll interval must be greater than zero.
    #[error("Invalid poll interval: must be greater than zero")]
    InvalidInterval,

    /// `start()` was called on a monitor that is already running.
    #[error("Network monitor is already running")]
    AlreadyStarted,

    /// `start()` was called on a stopped monitor. Stopped monitors cannot be restarted.
    #[error("Network monitor has been stopped and cannot be restarted")]
    AlreadyStopped,

    /// `start()` was called outside a tokio runtime.
    #[error("Network monitor must be started from within a tokio runtime")]
    NoRuntime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn supply_error_displays_with_context() {
        let monitor_error = MonitorError::Supply(SupplyError::platform("test failure"));

        assert!(monitor_error.to_string().contains("Failed to get network interfaces"));
        assert!(monitor_error.to_string().contains("test failure"));
    }

    #[test]
    fn supply_error_preserves_source_chain() {
        let monitor_error = MonitorError::Supply(SupplyError::platform("inner error"));

        let source = monitor_error.source();
        assert!(source.is_some());
        assert!(source.unwrap().to_string().contains("inner error"));
    }

    #[test]
    fn from_supply_error_conversion() {
        let supply_error = SupplyError::PermissionDenied {
            context: "elevated required".to_string(),
        };
        let monitor_error: MonitorError = supply_error.into();

        assert!(matches!(monitor_error, MonitorError::Supply(_)));
    }

    #[test]
    fn lifecycle_errors_have_no_source() {
        for error in [
            MonitorError::InvalidInterval,
            MonitorError::AlreadyStarted,
            MonitorError::AlreadyStopped,
            MonitorError::NoRuntime,
        ] {
            assert!(error.source().is_none());
            assert!(!error.to_string().is_empty());
        }
    }
}
