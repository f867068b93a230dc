//! Core network types for interface representation.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;
use std::sync::Arc;

use thiserror::Error;

/// A per-interface query (up/down, loopback, addresses) that failed.
///
/// The failure is captured in the descriptor at supply time so that it can
/// be cloned, compared, and reported later without re-querying the OS.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[error("{message}")]
pub struct QueryError {
    message: String,
}

impl QueryError {
    /// Creates a query error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A network interface as observed by one supply call.
///
/// Each queryable property holds either its value or the [`QueryError`]
/// raised while reading it.
///
/// # Equality
///
/// Two descriptors are equal if they have the same name, index, and bound
/// addresses (a failed address query compares as no addresses). The up/down
/// state is not part of equality; change detection compares it separately.
#[derive(Debug, Clone)]
pub struct InterfaceDescriptor {
    name: String,
    index: u32,
    up: Result<bool, QueryError>,
    loopback: Result<bool, QueryError>,
    point_to_point: bool,
    addresses: Result<Vec<IpAddr>, QueryError>,
}

impl InterfaceDescriptor {
    /// Creates a descriptor for an up, non-loopback interface with no addresses.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index: 0,
            up: Ok(true),
            loopback: Ok(false),
            point_to_point: false,
            addresses: Ok(Vec::new()),
        }
    }

    /// Sets the OS interface index.
    #[must_use]
    pub const fn with_index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    /// Sets the up/down state.
    #[must_use]
    pub fn with_up(mut self, up: bool) -> Self {
        self.up = Ok(up);
        self
    }

    /// Records that the up/down query failed.
    #[must_use]
    pub fn with_up_error(mut self, error: QueryError) -> Self {
        self.up = Err(error);
        self
    }

    /// Sets whether this is a loopback interface.
    #[must_use]
    pub fn with_loopback(mut self, loopback: bool) -> Self {
        self.loopback = Ok(loopback);
        self
    }

    /// Records that the loopback query failed.
    #[must_use]
    pub fn with_loopback_error(mut self, error: QueryError) -> Self {
        self.loopback = Err(error);
        self
    }

    /// Sets whether this is a point-to-point link.
    #[must_use]
    pub const fn with_point_to_point(mut self, point_to_point: bool) -> Self {
        self.point_to_point = point_to_point;
        self
    }

    /// Sets the bound addresses.
    #[must_use]
    pub fn with_addresses(mut self, addresses: impl IntoIterator<Item = IpAddr>) -> Self {
        self.addresses = Ok(addresses.into_iter().collect());
        self
    }

    /// Records that the address query failed.
    #[must_use]
    pub fn with_address_error(mut self, error: QueryError) -> Self {
        self.addresses = Err(error);
        self
    }

    /// Returns the interface name (unique within a snapshot).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the OS interface index (0 when unknown).
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Returns whether the interface is up.
    ///
    /// # Errors
    ///
    /// Returns the [`QueryError`] recorded when the state could not be read.
    pub fn is_up(&self) -> Result<bool, QueryError> {
        self.up.clone()
    }

    /// Returns whether the interface is a loopback interface.
    ///
    /// # Errors
    ///
    /// Returns the [`QueryError`] recorded when the flag could not be read.
    pub fn is_loopback(&self) -> Result<bool, QueryError> {
        self.loopback.clone()
    }

    /// Returns whether the interface is a point-to-point link.
    #[must_use]
    pub const fn is_point_to_point(&self) -> bool {
        self.point_to_point
    }

    /// Returns the bound addresses.
    ///
    /// # Errors
    ///
    /// Returns the [`QueryError`] recorded when the addresses could not be read.
    pub fn addresses(&self) -> Result<&[IpAddr], QueryError> {
        self.addresses.as_deref().map_err(QueryError::clone)
    }

    fn addresses_or_empty(&self) -> &[IpAddr] {
        self.addresses.as_deref().unwrap_or_default()
    }
}

impl PartialEq for InterfaceDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.index == other.index
            && self.addresses_or_empty() == other.addresses_or_empty()
    }
}

impl Eq for InterfaceDescriptor {}

impl Hash for InterfaceDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.index.hash(state);
        self.addresses_or_empty().hash(state);
    }
}

/// An immutable, name-keyed view of all interfaces seen by one supply call.
///
/// Iteration follows the supplier's order. Names are unique: if the supplier
/// reports a name twice, the later descriptor replaces the earlier one in
/// the earlier one's position. Clones share the same storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceSnapshot {
    interfaces: Arc<[InterfaceDescriptor]>,
}

impl InterfaceSnapshot {
    /// Builds a snapshot from supplied descriptors.
    #[must_use]
    pub fn new(descriptors: impl IntoIterator<Item = InterfaceDescriptor>) -> Self {
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut interfaces: Vec<InterfaceDescriptor> = Vec::new();

        for descriptor in descriptors {
            if let Some(&position) = positions.get(descriptor.name()) {
                interfaces[position] = descriptor;
            } else {
                positions.insert(descriptor.name().to_string(), interfaces.len());
                interfaces.push(descriptor);
            }
        }

        Self {
            interfaces: interfaces.into(),
        }
    }

    /// Returns the descriptor with the given name, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&InterfaceDescriptor> {
        self.interfaces.iter().find(|i| i.name() == name)
    }

    /// Returns true if an interface with the given name is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates over the descriptors in supply order.
    pub fn iter(&self) -> std::slice::Iter<'_, InterfaceDescriptor> {
        self.interfaces.iter()
    }

    /// Returns the descriptors as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[InterfaceDescriptor] {
        &self.interfaces
    }

    /// Returns the interface names in supply order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.interfaces.iter().map(InterfaceDescriptor::name).collect()
    }

    /// Returns the number of interfaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    /// Returns true if the snapshot holds no interfaces.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }
}

impl<'a> IntoIterator for &'a InterfaceSnapshot {
    type Item = &'a InterfaceDescriptor;
    type IntoIter = std::slice::Iter<'a, InterfaceDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    mod descriptor {
        use super::*;

        #[test]
        fn new_has_sensible_defaults() {
            let eth = InterfaceDescriptor::new("eth0");

            assert_eq!(eth.name(), "eth0");
            assert_eq!(eth.index(), 0);
            assert_eq!(eth.is_up(), Ok(true));
            assert_eq!(eth.is_loopback(), Ok(false));
            assert!(!eth.is_point_to_point());
            assert!(eth.addresses().unwrap().is_empty());
        }

        #[test]
        fn query_errors_are_reported() {
            let eth = InterfaceDescriptor::new("eth0")
                .with_up_error(QueryError::new("no state"))
                .with_loopback_error(QueryError::new("no flags"))
                .with_address_error(QueryError::new("no addresses"));

            assert_eq!(eth.is_up().unwrap_err().message(), "no state");
            assert_eq!(eth.is_loopback().unwrap_err().to_string(), "no flags");
            assert_eq!(eth.addresses().unwrap_err().message(), "no addresses");
        }

        #[test]
        fn equality_ignores_up_state() {
            let up = InterfaceDescriptor::new("eth0").with_up(true);
            let down = InterfaceDescriptor::new("eth0").with_up(false);

            assert_eq!(up, down);
        }

        #[test]
        fn equality_considers_addresses() {
            let a = InterfaceDescriptor::new("eth0").with_addresses([addr("10.0.0.1")]);
            let b = InterfaceDescriptor::new("eth0").with_addresses([addr("10.0.0.2")]);

            assert_ne!(a, b);
        }

        #[test]
        fn equality_considers_name_and_index() {
            assert_ne!(InterfaceDescriptor::new("eth0"), InterfaceDescriptor::new("eth1"));
            assert_ne!(
                InterfaceDescriptor::new("eth0").with_index(1),
                InterfaceDescriptor::new("eth0").with_index(2)
            );
        }

        #[test]
        fn failed_address_query_equals_no_addresses() {
            let failed =
                InterfaceDescriptor::new("eth0").with_address_error(QueryError::new("boom"));
            let empty = InterfaceDescriptor::new("eth0");

            assert_eq!(failed, empty);
        }

        #[test]
        fn equal_descriptors_hash_equally() {
            use std::collections::hash_map::DefaultHasher;

            fn hash_of(d: &InterfaceDescriptor) -> u64 {
                let mut hasher = DefaultHasher::new();
                d.hash(&mut hasher);
                hasher.finish()
            }

            let up = InterfaceDescriptor::new("eth0").with_addresses([addr("fe80::1")]);
            let down = up.clone().with_up(false);

            assert_eq!(hash_of(&up), hash_of(&down));
        }
    }

    mod snapshot {
        use super::*;

        #[test]
        fn preserves_supply_order() {
            let snapshot = InterfaceSnapshot::new([
                InterfaceDescriptor::new("wlan0"),
                InterfaceDescriptor::new("eth0"),
                InterfaceDescriptor::new("lo"),
            ]);

            assert_eq!(snapshot.names(), vec!["wlan0", "eth0", "lo"]);
        }

        #[test]
        fn later_duplicate_replaces_earlier_in_place() {
            let snapshot = InterfaceSnapshot::new([
                InterfaceDescriptor::new("eth0").with_up(true),
                InterfaceDescriptor::new("lo"),
                InterfaceDescriptor::new("eth0").with_up(false),
            ]);

            assert_eq!(snapshot.names(), vec!["eth0", "lo"]);
            assert_eq!(snapshot.get("eth0").unwrap().is_up(), Ok(false));
        }

        #[test]
        fn lookup_by_name() {
            let snapshot = InterfaceSnapshot::new([InterfaceDescriptor::new("lo")]);

            assert!(snapshot.contains("lo"));
            assert!(!snapshot.contains("eth0"));
            assert!(snapshot.get("eth0").is_none());
        }

        #[test]
        fn empty_snapshot() {
            let snapshot = InterfaceSnapshot::default();

            assert!(snapshot.is_empty());
            assert_eq!(snapshot.len(), 0);
            assert!(snapshot.iter().next().is_none());
        }

        #[test]
        fn clones_share_storage() {
            let snapshot = InterfaceSnapshot::new([InterfaceDescriptor::new("lo")]);
            let clone = snapshot.clone();

            assert!(std::ptr::eq(snapshot.as_slice(), clone.as_slice()));
        }
    }
}
