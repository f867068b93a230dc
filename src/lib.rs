//! ifwatch: network interface monitoring
//!
//! A library that polls the host's network interfaces on a fixed interval
//! and reports interfaces being added, removed, or changing up/down state
//! or addresses to registered listeners.
//!
//! The building blocks are:
//! - [`network`]: interface descriptors, snapshots, suppliers and filters
//! - [`monitor`]: the diff engine, listener registry and [`NetworkMonitor`](monitor::NetworkMonitor)
//! - [`time`]: the injectable clock used for scheduling
//! - [`config`]: CLI and TOML configuration for the `ifwatch` binary

pub mod config;
pub mod monitor;
pub mod network;
pub mod time;

#[cfg(test)]
mod testing;
