//! Monitor layer for detecting network interface changes.
//!
//! This module provides types and functions for:
//! - Representing change events ([`ChangeEvent`], [`ChangeType`], [`StateType`])
//! - Detecting changes between snapshots ([`diff`])
//! - Fanning events out to listeners ([`NetworkChangeListener`], [`ListenerRegistry`])
//! - Error handling ([`MonitorError`])
//! - Polling-based monitoring ([`NetworkMonitor`], [`ChangeStream`])

mod change;
mod error;
mod listener;
mod poller;
mod stream;

pub use change::{ChangeEvent, ChangeType, StateType, diff};
pub use error::MonitorError;
pub use listener::{ListenerError, ListenerId, ListenerRegistry, NetworkChangeListener};
pub use poller::{MonitorPhase, NetworkMonitor};
pub use stream::ChangeStream;
