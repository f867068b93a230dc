//! Real OS interface enumeration.
//!
//! [`SystemSupplier`] implements [`InterfaceSupplier`] on top of the
//! `netdev` crate, which reads interfaces via netlink/`getifaddrs` on Unix
//! and `GetAdaptersAddresses` on Windows.

use std::net::IpAddr;

use crate::network::{InterfaceDescriptor, InterfaceSupplier, SupplyError};

/// Supplies the host's network interfaces.
///
/// Every interface the OS reports is returned, loopback included; wrap the
/// supplier in a [`FilteredSupplier`](crate::network::filter::FilteredSupplier)
/// to narrow the set.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSupplier;

impl SystemSupplier {
    /// Creates a new system supplier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl InterfaceSupplier for SystemSupplier {
    fn get(&self) -> Result<Vec<InterfaceDescriptor>, SupplyError> {
        let interfaces = netdev::get_interfaces();
        tracing::debug!(count = interfaces.len(), "Enumerated network interfaces");

        Ok(interfaces.iter().map(descriptor_from).collect())
    }
}

fn descriptor_from(iface: &netdev::Interface) -> InterfaceDescriptor {
    let addresses = iface
        .ipv4
        .iter()
        .map(|net| IpAddr::V4(net.addr()))
        .chain(iface.ipv6.iter().map(|net| IpAddr::V6(net.addr())));

    InterfaceDescriptor::new(iface.name.clone())
        .with_index(iface.index)
        .with_up(iface.is_up())
        .with_loopback(iface.is_loopback())
        .with_point_to_point(iface.is_point_to_point())
        .with_addresses(addresses)
}
