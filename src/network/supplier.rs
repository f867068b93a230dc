//! Interface supplying trait and error types.

use std::sync::Arc;

use super::InterfaceDescriptor;
use thiserror::Error;

/// Error type for a whole supply call.
///
/// Describes what went wrong without dictating recovery strategy.
/// Callers decide how to handle each error variant.
#[derive(Debug, Error)]
pub enum SupplyError {
    /// Permission denied to access network information.
    #[error("Permission denied: {context}")]
    PermissionDenied {
        /// Additional context about what permission was denied.
        context: String,
    },

    /// Platform-specific error with a generic message.
    #[error("Platform error: {message}")]
    Platform {
        /// Error message describing the platform-specific failure.
        message: String,
    },
}

impl SupplyError {
    /// Creates a [`SupplyError::Platform`] error.
    #[must_use]
    pub fn platform(message: impl Into<String>) -> Self {
        Self::Platform {
            message: message.into(),
        }
    }
}

/// Trait for obtaining the interfaces the monitor should watch.
///
/// # Design
///
/// - The real OS query lives in [`platform`](super::platform); tests supply fixtures
/// - Filtering is layered on by wrapping a supplier in a
///   [`FilteredSupplier`](super::filter::FilteredSupplier)
///
/// # Example
///
/// ```
/// use ifwatch::network::{InterfaceDescriptor, InterfaceSupplier, SupplyError};
///
/// struct Fixed;
///
/// impl InterfaceSupplier for Fixed {
///     fn get(&self) -> Result<Vec<InterfaceDescriptor>, SupplyError> {
///         Ok(vec![InterfaceDescriptor::new("lo").with_loopback(true)])
///     }
/// }
///
/// assert_eq!(Fixed.get().unwrap()[0].name(), "lo");
/// ```
pub trait InterfaceSupplier: Send + Sync {
    /// Returns the current interfaces, in a stable order where possible.
    ///
    /// May block on an OS call.
    ///
    /// # Errors
    ///
    /// Returns [`SupplyError`] when the interface list as a whole cannot be
    /// obtained. Failures reading a single interface's properties are
    /// recorded in its [`InterfaceDescriptor`] instead.
    fn get(&self) -> Result<Vec<InterfaceDescriptor>, SupplyError>;
}

impl<T: InterfaceSupplier + ?Sized> InterfaceSupplier for &T {
    fn get(&self) -> Result<Vec<InterfaceDescriptor>, SupplyError> {
        (**self).get()
    }
}

impl<T: InterfaceSupplier + ?Sized> InterfaceSupplier for Arc<T> {
    fn get(&self) -> Result<Vec<InterfaceDescriptor>, SupplyError> {
        (**self).get()
    }
}

impl<T: InterfaceSupplier + ?Sized> InterfaceSupplier for Box<T> {
    fn get(&self) -> Result<Vec<InterfaceDescriptor>, SupplyError> {
        (**self).get()
    }
}
