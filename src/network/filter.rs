//! Interface filtering for selective monitoring.
//!
//! # Design
//!
//! - **Pure Matchers**: [`LoopbackFilter`] and [`NameRegexFilter`] only answer
//!   "does this interface match?" without include/exclude semantics.
//! - **Filter Chain**: [`FilterChain`] combines matchers:
//!   - Exclude filters: AND logic (must pass ALL excludes)
//!   - Include filters: OR logic (pass ANY include, empty = match all)
//! - **Decorator**: [`FilteredSupplier`] applies filtering transparently
//!   to any [`InterfaceSupplier`] implementation.
//!
//! Matching can fail (the loopback flag may be unreadable). A supplier
//! treats an interface whose filter evaluation fails as absent.

use regex::Regex;

use super::{InterfaceDescriptor, InterfaceSupplier, QueryError, SupplyError};

/// Trait for filtering network interfaces.
///
/// # Thread Safety
///
/// Filters must be `Send + Sync` so filtered suppliers can be polled from
/// the monitor task.
pub trait InterfaceFilter: Send + Sync {
    /// Returns whether the interface matches.
    ///
    /// # Errors
    ///
    /// Returns a [`QueryError`] when a property the filter depends on could
    /// not be read.
    fn matches(&self, interface: &InterfaceDescriptor) -> Result<bool, QueryError>;
}

/// Matches loopback interfaces.
///
/// # Examples
///
/// ```
/// use ifwatch::network::filter::{InterfaceFilter, LoopbackFilter};
/// use ifwatch::network::InterfaceDescriptor;
///
/// let lo = InterfaceDescriptor::new("lo").with_loopback(true);
/// let eth = InterfaceDescriptor::new("eth0");
///
/// assert_eq!(LoopbackFilter.matches(&lo), Ok(true));
/// assert_eq!(LoopbackFilter.matches(&eth), Ok(false));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopbackFilter;

impl InterfaceFilter for LoopbackFilter {
    fn matches(&self, interface: &InterfaceDescriptor) -> Result<bool, QueryError> {
        interface.is_loopback().map_err(|e| {
            QueryError::new(format!(
                "Could not determine whether network interface '{}' is loopback: {e}",
                interface.name()
            ))
        })
    }
}

/// Matches interfaces by name pattern.
///
/// # Examples
///
/// ```
/// use ifwatch::network::filter::{InterfaceFilter, NameRegexFilter};
/// use ifwatch::network::InterfaceDescriptor;
///
/// let filter = NameRegexFilter::new(r"^eth").unwrap();
///
/// assert_eq!(filter.matches(&InterfaceDescriptor::new("eth0")), Ok(true));
/// assert_eq!(filter.matches(&InterfaceDescriptor::new("wlan0")), Ok(false));
/// ```
#[derive(Debug)]
pub struct NameRegexFilter {
    pattern: Regex,
}

impl NameRegexFilter {
    /// Creates a name filter with the given regex pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the regex pattern is invalid.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    /// Returns a reference to the regex pattern.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Regex is not a const type
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }
}

impl InterfaceFilter for NameRegexFilter {
    fn matches(&self, interface: &InterfaceDescriptor) -> Result<bool, QueryError> {
        Ok(self.pattern.is_match(interface.name()))
    }
}

/// Filter chain with include/exclude semantics.
///
/// Evaluation order:
/// 1. **Exclude filters (AND)**: Any match → reject.
/// 2. **Include filters (OR)**: Any match → accept. Empty includes = match all.
///
/// The first failing matcher aborts evaluation with its error.
///
/// # Examples
///
/// ```
/// use ifwatch::network::filter::{FilterChain, InterfaceFilter, LoopbackFilter, NameRegexFilter};
/// use ifwatch::network::InterfaceDescriptor;
///
/// let chain = FilterChain::new()
///     .exclude(LoopbackFilter)
///     .include(NameRegexFilter::new("^eth").unwrap());
///
/// let eth = InterfaceDescriptor::new("eth0");
/// let wlan = InterfaceDescriptor::new("wlan0");
/// let lo = InterfaceDescriptor::new("lo").with_loopback(true);
///
/// assert_eq!(chain.matches(&eth), Ok(true));
/// assert_eq!(chain.matches(&wlan), Ok(false));
/// assert_eq!(chain.matches(&lo), Ok(false));
/// ```
#[derive(Default)]
pub struct FilterChain {
    includes: Vec<Box<dyn InterfaceFilter>>,
    excludes: Vec<Box<dyn InterfaceFilter>>,
}

impl FilterChain {
    /// Creates an empty filter chain (matches all interfaces).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an include filter (OR semantics).
    #[must_use]
    pub fn include<F: InterfaceFilter + 'static>(mut self, filter: F) -> Self {
        self.includes.push(Box::new(filter));
        self
    }

    /// Adds an exclude filter (reject on ANY match).
    #[must_use]
    pub fn exclude<F: InterfaceFilter + 'static>(mut self, filter: F) -> Self {
        self.excludes.push(Box::new(filter));
        self
    }

    /// Returns the number of include filters.
    #[must_use]
    pub fn include_count(&self) -> usize {
        self.includes.len()
    }

    /// Returns the number of exclude filters.
    #[must_use]
    pub fn exclude_count(&self) -> usize {
        self.excludes.len()
    }

    /// Returns true if no filters are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.excludes.is_empty()
    }

    fn any_match(
        filters: &[Box<dyn InterfaceFilter>],
        interface: &InterfaceDescriptor,
    ) -> Result<bool, QueryError> {
        for filter in filters {
            if filter.matches(interface)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl InterfaceFilter for FilterChain {
    fn matches(&self, interface: &InterfaceDescriptor) -> Result<bool, QueryError> {
        if Self::any_match(&self.excludes, interface)? {
            return Ok(false);
        }
        Ok(self.includes.is_empty() || Self::any_match(&self.includes, interface)?)
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterChain")
            .field("include_count", &self.includes.len())
            .field("exclude_count", &self.excludes.len())
            .finish()
    }
}

// Blanket implementation: any &T where T: InterfaceFilter also implements InterfaceFilter
impl<T: InterfaceFilter + ?Sized> InterfaceFilter for &T {
    fn matches(&self, interface: &InterfaceDescriptor) -> Result<bool, QueryError> {
        (**self).matches(interface)
    }
}

impl InterfaceFilter for Box<dyn InterfaceFilter> {
    fn matches(&self, interface: &InterfaceDescriptor) -> Result<bool, QueryError> {
        self.as_ref().matches(interface)
    }
}

/// A supplier decorator that keeps only the interfaces a filter accepts.
///
/// Interfaces whose filter evaluation fails are logged and dropped, as if
/// the underlying supplier had not reported them.
///
/// # Examples
///
/// ```
/// use ifwatch::network::filter::FilteredSupplier;
/// use ifwatch::network::{InterfaceDescriptor, InterfaceSupplier, SupplyError};
///
/// struct Fixed;
///
/// impl InterfaceSupplier for Fixed {
///     fn get(&self) -> Result<Vec<InterfaceDescriptor>, SupplyError> {
///         Ok(vec![
///             InterfaceDescriptor::new("lo").with_loopback(true),
///             InterfaceDescriptor::new("eth0"),
///         ])
///     }
/// }
///
/// let supplier = FilteredSupplier::non_loopback(Fixed);
/// let names: Vec<String> = supplier
///     .get()
///     .unwrap()
///     .iter()
///     .map(|i| i.name().to_string())
///     .collect();
/// assert_eq!(names, ["eth0"]);
/// ```
#[derive(Debug)]
pub struct FilteredSupplier<S, F> {
    inner: S,
    filter: F,
}

impl<S, F> FilteredSupplier<S, F> {
    /// Creates a new filtered supplier.
    #[must_use]
    pub const fn new(inner: S, filter: F) -> Self {
        Self { inner, filter }
    }

    /// Returns a reference to the inner supplier.
    pub const fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns a reference to the filter.
    pub const fn filter(&self) -> &F {
        &self.filter
    }
}

impl<S> FilteredSupplier<S, FilterChain> {
    /// Wraps `inner` so that loopback interfaces are never reported.
    #[must_use]
    pub fn non_loopback(inner: S) -> Self {
        Self::new(inner, FilterChain::new().exclude(LoopbackFilter))
    }
}

impl<S: InterfaceSupplier, F: InterfaceFilter> InterfaceSupplier for FilteredSupplier<S, F> {
    fn get(&self) -> Result<Vec<InterfaceDescriptor>, SupplyError> {
        let interfaces = self.inner.get()?;
        Ok(interfaces
            .into_iter()
            .filter(|interface| match self.filter.matches(interface) {
                Ok(keep) => keep,
                Err(e) => {
                    tracing::warn!("{e}");
                    false
                }
            })
            .collect())
    }
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
