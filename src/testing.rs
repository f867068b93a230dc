//! Shared test fixtures: interface descriptors, scripted suppliers and a
//! log-capturing tracing layer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use crate::network::{InterfaceDescriptor, InterfaceSupplier, QueryError, SupplyError};
use crate::time::Clock;

// ============================================================================
// Interface fixtures
// ============================================================================

/// The loopback interface `lo`.
pub fn local(up: bool) -> InterfaceDescriptor {
    InterfaceDescriptor::new("lo")
        .with_index(1)
        .with_up(up)
        .with_loopback(true)
        .with_addresses(["127.0.0.1".parse().unwrap(), "::1".parse().unwrap()])
}

/// An ethernet interface `eth0`.
pub fn ethernet(up: bool) -> InterfaceDescriptor {
    InterfaceDescriptor::new("eth0")
        .with_index(2)
        .with_up(up)
        .with_addresses(["192.168.1.10".parse().unwrap()])
}

/// An ethernet interface `eth0` whose up/down state cannot be read.
pub fn ethernet_unknown() -> InterfaceDescriptor {
    InterfaceDescriptor::new("eth0")
        .with_index(2)
        .with_up_error(QueryError::new("device busy"))
        .with_addresses(["192.168.1.10".parse().unwrap()])
}

// ============================================================================
// Suppliers
// ============================================================================

/// Serves a scripted sequence of supplies and counts the calls.
///
/// Once the script is exhausted the last entry is served again.
/// `Err(message)` entries are served as [`SupplyError::Platform`].
pub struct CountingSupplier {
    script: Vec<Result<Vec<InterfaceDescriptor>, String>>,
    calls: AtomicUsize,
}

impl CountingSupplier {
    pub fn new(script: Vec<Result<Vec<InterfaceDescriptor>, String>>) -> Self {
        assert!(!script.is_empty(), "script needs at least one supply");
        Self {
            script,
            calls: AtomicUsize::new(0),
        }
    }

    /// A supplier that always reports the same interfaces.
    pub fn fixed(interfaces: Vec<InterfaceDescriptor>) -> Self {
        Self::new(vec![Ok(interfaces)])
    }

    /// Number of times `get` has been called.
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl InterfaceSupplier for CountingSupplier {
    fn get(&self) -> Result<Vec<InterfaceDescriptor>, SupplyError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let step = &self.script[call.min(self.script.len() - 1)];
        step.clone().map_err(SupplyError::platform)
    }
}

/// Records the clock instant of every call.
pub struct PollIntervalMeasuringSupplier<C> {
    clock: C,
    interfaces: Vec<InterfaceDescriptor>,
    calls: Mutex<Vec<Instant>>,
}

impl<C: Clock> PollIntervalMeasuringSupplier<C> {
    pub fn new(clock: C, interfaces: Vec<InterfaceDescriptor>) -> Self {
        Self {
            clock,
            interfaces,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Gaps between consecutive calls, as measured by the clock.
    pub fn gaps(&self) -> Vec<Duration> {
        self.calls
            .lock()
            .unwrap()
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .collect()
    }

    /// Panics if any two consecutive calls were closer than `interval`.
    pub fn validate_intervals(&self, interval: Duration) {
        for (i, gap) in self.gaps().into_iter().enumerate() {
            assert!(
                gap >= interval,
                "calls {i} and {} were only {gap:?} apart (interval {interval:?})",
                i + 1
            );
        }
    }
}

impl<C: Clock> InterfaceSupplier for PollIntervalMeasuringSupplier<C> {
    fn get(&self) -> Result<Vec<InterfaceDescriptor>, SupplyError> {
        self.calls.lock().unwrap().push(self.clock.now());
        Ok(self.interfaces.clone())
    }
}

// ============================================================================
// Log capture
// ============================================================================

/// A tracing layer that keeps every event's level and message.
#[derive(Clone, Default)]
pub struct LogCapture {
    records: Arc<Mutex<Vec<(Level, String)>>>,
}

impl LogCapture {
    /// Installs the capture as the thread's default subscriber.
    pub fn install(&self) -> DefaultGuard {
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }

    pub fn messages(&self) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn at(&self, level: Level) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.at(Level::WARN)
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages().iter().any(|m| m.contains(needle))
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.records
            .lock()
            .unwrap()
            .push((*event.metadata().level(), visitor.message));
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }
}
