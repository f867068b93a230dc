//! Interface change detection types and functions.

use std::collections::HashSet;
use std::fmt;

use crate::network::{InterfaceDescriptor, InterfaceSnapshot};

/// The observable state of an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateType {
    /// The interface is up.
    Up,
    /// The interface is down.
    Down,
    /// The state could not be determined, or the interface no longer exists.
    Unknown,
}

impl StateType {
    /// Determines the state of `interface`.
    ///
    /// Query failures are absorbed: they map to [`StateType::Unknown`] and
    /// log one warning.
    #[must_use]
    pub fn of(interface: &InterfaceDescriptor) -> Self {
        let up = match interface.is_up() {
            Ok(up) => up,
            Err(e) => {
                tracing::warn!(
                    "Could not determine up/down state of interface '{}': {e}",
                    interface.name()
                );
                return Self::Unknown;
            }
        };

        if let Err(e) = interface.addresses() {
            tracing::warn!(
                "Could not read addresses of interface '{}': {e}",
                interface.name()
            );
            return Self::Unknown;
        }

        if up { Self::Up } else { Self::Down }
    }
}

impl fmt::Display for StateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// The kind of interface change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    /// An interface appeared.
    Added,
    /// An interface disappeared.
    Removed,
    /// An interface changed its up/down state or its bound addresses.
    StateChanged,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Removed => write!(f, "removed"),
            Self::StateChanged => write!(f, "state changed"),
        }
    }
}

/// An interface change event.
///
/// Carries the descriptor as last observed. For a removal that is the
/// descriptor from the snapshot before the interface vanished.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeEvent {
    interface_name: String,
    change_type: ChangeType,
    state_type: StateType,
    interface: InterfaceDescriptor,
}

impl ChangeEvent {
    /// Creates a new change event.
    #[must_use]
    pub fn new(
        interface: InterfaceDescriptor,
        change_type: ChangeType,
        state_type: StateType,
    ) -> Self {
        Self {
            interface_name: interface.name().to_string(),
            change_type,
            state_type,
            interface,
        }
    }

    /// Creates an "added" event.
    #[must_use]
    pub fn added(interface: InterfaceDescriptor, state_type: StateType) -> Self {
        Self::new(interface, ChangeType::Added, state_type)
    }

    /// Creates a "removed" event. The state of a removed interface is always unknown.
    #[must_use]
    pub fn removed(interface: InterfaceDescriptor) -> Self {
        Self::new(interface, ChangeType::Removed, StateType::Unknown)
    }

    /// Creates a "state changed" event.
    #[must_use]
    pub fn state_changed(interface: InterfaceDescriptor, state_type: StateType) -> Self {
        Self::new(interface, ChangeType::StateChanged, state_type)
    }

    /// Returns the name of the interface that changed.
    #[must_use]
    pub fn interface_name(&self) -> &str {
        &self.interface_name
    }

    /// Returns the kind of change.
    #[must_use]
    pub const fn change_type(&self) -> ChangeType {
        self.change_type
    }

    /// Returns the resulting state.
    #[must_use]
    pub const fn state_type(&self) -> StateType {
        self.state_type
    }

    /// Returns the interface as last observed.
    #[must_use]
    pub const fn interface(&self) -> &InterfaceDescriptor {
        &self.interface
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} / {}",
            self.interface_name, self.change_type, self.state_type
        )
    }
}

/// Compares two snapshots and returns the interface changes between them.
///
/// This is a pure function apart from logging: per-interface query failures
/// become [`StateType::Unknown`] and are logged, never returned.
///
/// # Arguments
///
/// * `previous` - The earlier snapshot
/// * `current` - The later snapshot
///
/// # Returns
///
/// At most one [`ChangeEvent`] per interface name: all `Added` events
/// first, then `Removed`, then `StateChanged`. Within each group events
/// follow the order of the snapshot they were found in.
///
/// # Algorithm
///
/// 1. Names only in `current` → `Added` with the current state
/// 2. Names only in `previous` → `Removed` with `Unknown` state
/// 3. Names in both → `StateChanged` with the current state if the state
///    or the descriptor (index, addresses) differs
#[must_use]
pub fn diff(previous: &InterfaceSnapshot, current: &InterfaceSnapshot) -> Vec<ChangeEvent> {
    let previous_names: HashSet<&str> = previous.iter().map(InterfaceDescriptor::name).collect();
    let current_names: HashSet<&str> = current.iter().map(InterfaceDescriptor::name).collect();

    let added = current
        .iter()
        .filter(|i| !previous_names.contains(i.name()))
        .map(|i| ChangeEvent::added(i.clone(), StateType::of(i)));

    let removed = previous
        .iter()
        .filter(|i| !current_names.contains(i.name()))
        .map(|i| ChangeEvent::removed(i.clone()));

    let changed = current.iter().filter_map(|new| {
        let old = previous.get(new.name())?;
        let old_state = StateType::of(old);
        let new_state = StateType::of(new);
        (old_state != new_state || old != new)
            .then(|| ChangeEvent::state_changed(new.clone(), new_state))
    });

    added.chain(removed).chain(changed).collect()
}

#[cfg(test)]
#[path = "change_tests.rs"]
mod tests;
