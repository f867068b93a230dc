//! Application execution logic.
//!
//! This module contains the `watch` loop that reports interface changes
//! until shutdown, and the one-shot `list` command.

use std::fmt::Write as _;
use std::net::IpAddr;

use serde::Serialize;
use thiserror::Error;
use tokio::signal;
use tokio_stream::StreamExt;

use ifwatch::config::ValidatedConfig;
use ifwatch::monitor::{MonitorError, NetworkMonitor};
use ifwatch::network::filter::FilteredSupplier;
use ifwatch::network::platform::SystemSupplier;
use ifwatch::network::{InterfaceDescriptor, InterfaceSnapshot, InterfaceSupplier, SupplyError};

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;

/// Error type for runtime execution failures.
#[derive(Debug, Error)]
pub enum RunError {
    /// The monitor failed to start or to query interfaces.
    #[error(transparent)]
    Monitor(#[from] MonitorError),

    /// Interfaces could not be enumerated for `list`.
    #[error("Failed to list network interfaces: {0}")]
    List(#[from] SupplyError),

    /// The listing could not be rendered as JSON.
    #[error("Failed to render interfaces as JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Unexpected stream termination.
    #[error("Monitor stream terminated unexpectedly")]
    StreamTerminated,
}

/// Watches the configured interfaces until a shutdown signal arrives.
///
/// The monitor logs every change event itself; this loop only keeps the
/// subscription alive and handles shutdown.
///
/// # Errors
///
/// Returns an error if:
/// - The initial interface query fails
/// - The monitor cannot be started
/// - The change stream ends before shutdown
///
/// # Coverage Note
///
/// Excluded from coverage because it needs real interfaces and signal handling.
#[cfg(not(tarpaulin_include))]
pub async fn watch(config: ValidatedConfig) -> Result<(), RunError> {
    let supplier = FilteredSupplier::new(SystemSupplier::new(), config.filter);
    let monitor = NetworkMonitor::new(supplier, config.poll_interval)?;

    let initial = monitor.get_current_interface_list()?;
    tracing::info!(
        "Watching {} interface(s), polling every {}ms",
        initial.len(),
        config.poll_interval.as_millis()
    );

    let mut stream = monitor.subscribe();
    monitor.start()?;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let result = loop {
        tokio::select! {
            biased;

            () = &mut shutdown => {
                tracing::info!("Shutdown signal received, stopping...");
                break Ok(());
            }

            event = stream.next() => {
                match event {
                    Some(event) => {
                        tracing::debug!(listener = %stream.listener_id(), "Received {event}");
                    }
                    None => break Err(RunError::StreamTerminated),
                }
            }
        }
    };

    monitor.stop();
    monitor.join().await;
    result
}

/// Prints the configured interfaces once.
///
/// # Errors
///
/// Returns an error if interfaces cannot be enumerated or serialized.
#[cfg(not(tarpaulin_include))]
pub fn list(config: ValidatedConfig, json: bool) -> Result<(), RunError> {
    let supplier = FilteredSupplier::new(SystemSupplier::new(), config.filter);
    let snapshot = InterfaceSnapshot::new(supplier.get()?);

    if json {
        println!("{}", render_json(&snapshot)?);
    } else {
        print!("{}", render_text(&snapshot));
    }
    Ok(())
}

/// JSON view of one interface.
///
/// Flags that could not be queried are serialized as `null`.
#[derive(Debug, Serialize, PartialEq, Eq)]
struct InterfaceReport<'a> {
    name: &'a str,
    index: u32,
    up: Option<bool>,
    loopback: Option<bool>,
    point_to_point: bool,
    addresses: Vec<IpAddr>,
}

impl<'a> From<&'a InterfaceDescriptor> for InterfaceReport<'a> {
    fn from(interface: &'a InterfaceDescriptor) -> Self {
        Self {
            name: interface.name(),
            index: interface.index(),
            up: interface.is_up().ok(),
            loopback: interface.is_loopback().ok(),
            point_to_point: interface.is_point_to_point(),
            addresses: interface
                .addresses()
                .map(<[IpAddr]>::to_vec)
                .unwrap_or_default(),
        }
    }
}

fn render_json(snapshot: &InterfaceSnapshot) -> Result<String, serde_json::Error> {
    let reports: Vec<InterfaceReport<'_>> = snapshot.iter().map(InterfaceReport::from).collect();
    serde_json::to_string_pretty(&reports)
}

fn render_text(snapshot: &InterfaceSnapshot) -> String {
    let mut out = String::new();
    for interface in snapshot {
        let _ = writeln!(
            out,
            "{} (index {}): {}, loopback={}, point-to-point={}",
            interface.name(),
            interface.index(),
            flag(interface.is_up().ok(), "up", "down"),
            flag(interface.is_loopback().ok(), "yes", "no"),
            if interface.is_point_to_point() { "yes" } else { "no" },
        );
        match interface.addresses() {
            Ok(addresses) => {
                for address in addresses {
                    let _ = writeln!(out, "    {address}");
                }
            }
            Err(e) => {
                let _ = writeln!(out, "    <addresses unavailable: {e}>");
            }
        }
    }
    out
}

const fn flag(value: Option<bool>, yes: &'static str, no: &'static str) -> &'static str {
    match value {
        Some(true) => yes,
        Some(false) => no,
        None => "unknown",
    }
}

/// Returns a future that completes when a shutdown signal is received.
///
/// A handler that cannot be installed is logged and never fires.
///
/// Excluded from coverage - requires OS signal handling.
#[cfg(not(tarpaulin_include))]
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
