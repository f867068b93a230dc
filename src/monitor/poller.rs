//! Polling-based network interface monitor.
//!
//! This module provides [`NetworkMonitor`], which periodically supplies
//! interface snapshots, diffs each one against the previous one, and fans
//! the resulting [`ChangeEvent`]s out to registered listeners.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::Instrument;
use tracing::instrument::WithSubscriber;

use super::change::{ChangeEvent, StateType, diff};
use super::listener::{ListenerId, ListenerRegistry, NetworkChangeListener};
use super::stream::ChangeStream;
use super::MonitorError;
use crate::network::{InterfaceSnapshot, InterfaceSupplier, SupplyError};
use crate::time::{Clock, StopSignal, SystemClock, Wake};

/// Lifecycle phase of a [`NetworkMonitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitorPhase {
    /// Constructed; the polling task has not been started.
    Created,
    /// The polling task has been started.
    Running,
    /// Stop was requested. Terminal: a stopped monitor cannot be restarted.
    Stopped,
}

#[derive(Debug)]
struct MonitorState {
    last_snapshot: Option<InterfaceSnapshot>,
    /// Clock time of the first successful supply.
    first_poll: Option<Instant>,
    running: bool,
    phase: MonitorPhase,
}

/// State shared between the monitor handle and its polling task.
struct Shared<S, C> {
    supplier: S,
    clock: C,
    interval: Duration,
    state: Mutex<MonitorState>,
    listeners: ListenerRegistry,
    stop: StopSignal,
}

impl<S, C> Shared<S, C>
where
    S: InterfaceSupplier,
    C: Clock,
{
    fn lock_state(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Supplies a fresh snapshot and caches it.
    ///
    /// The first successful supply also logs every interface's initial
    /// state and records the first-poll time.
    fn refresh(&self, state: &mut MonitorState) -> Result<InterfaceSnapshot, SupplyError> {
        let snapshot = InterfaceSnapshot::new(self.supplier.get()?);
        tracing::debug!(interfaces = snapshot.len(), "Polled network interfaces");

        if state.first_poll.is_none() {
            state.first_poll = Some(self.clock.now());
            for interface in &snapshot {
                tracing::info!("{}: {}", interface.name(), StateType::of(interface));
            }
        }

        state.last_snapshot = Some(snapshot.clone());
        Ok(snapshot)
    }

    fn current(&self) -> Result<InterfaceSnapshot, SupplyError> {
        let mut state = self.lock_state();
        if !state.running {
            if let Some(snapshot) = &state.last_snapshot {
                return Ok(snapshot.clone());
            }
        }
        self.refresh(&mut state)
    }

    /// One supply-and-diff step, performed under the state lock.
    ///
    /// With no previous snapshot the new one becomes the baseline and no
    /// events are produced.
    fn poll_cycle(&self, last: &mut Option<InterfaceSnapshot>) -> Vec<ChangeEvent> {
        let mut state = self.lock_state();
        let current = match self.refresh(&mut state) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Could not get network interfaces: {e}");
                return Vec::new();
            }
        };

        let events = last
            .as_ref()
            .map_or_else(Vec::new, |previous| diff(previous, &current));
        drop(state);

        *last = Some(current);
        events
    }

    /// Time to wait before the first background poll.
    ///
    /// If an explicit query already supplied interfaces, the wait is
    /// shortened so that the first background poll lands one interval after
    /// that query. Otherwise the first poll happens now.
    fn initial_delay(&self) -> Duration {
        let first_poll = self.lock_state().first_poll;
        match first_poll {
            Some(at) => {
                let elapsed = self.clock.now().saturating_duration_since(at);
                self.interval.saturating_sub(elapsed)
            }
            None => {
                if let Err(e) = self.current() {
                    tracing::warn!("Could not get network interfaces: {e}");
                }
                self.interval
            }
        }
    }

    async fn run(self: Arc<Self>) {
        tracing::info!("Network monitor started");

        let delay = self.initial_delay();
        if self.clock.sleep_cancellable(delay, &self.stop).await == Wake::Elapsed {
            let mut last = self.lock_state().last_snapshot.clone();

            while !self.stop.is_raised() {
                for event in self.poll_cycle(&mut last) {
                    tracing::info!("{event}");
                    self.listeners.dispatch(&event);
                }

                if self.clock.sleep_cancellable(self.interval, &self.stop).await == Wake::Stopped {
                    break;
                }
            }
        }

        self.lock_state().running = false;
        tracing::info!("Network monitor stopped");
    }
}

/// Polling-based network interface monitor.
///
/// Every poll interval the monitor asks its [`InterfaceSupplier`] for the
/// current interfaces, diffs them against the previous poll, and dispatches
/// one [`ChangeEvent`] per changed interface to every registered listener.
///
/// Polling runs on a tokio task started with [`start`](Self::start). The
/// task does not keep the runtime alive, and dropping the monitor stops it.
///
/// # Type Parameters
///
/// * `S` - The [`InterfaceSupplier`] implementation
/// * `C` - The [`Clock`] used for sleeping and time measurement (defaults to [`SystemClock`])
///
/// # Example
///
/// ```no_run
/// use ifwatch::monitor::NetworkMonitor;
/// use ifwatch::network::filter::FilteredSupplier;
/// use ifwatch::network::platform::SystemSupplier;
/// use std::time::Duration;
/// use tokio_stream::StreamExt;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let supplier = FilteredSupplier::non_loopback(SystemSupplier::new());
/// let monitor = NetworkMonitor::new(supplier, Duration::from_secs(2))?;
///
/// let mut changes = monitor.subscribe();
/// monitor.start()?;
/// while let Some(change) = changes.next().await {
///     println!("{change}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct NetworkMonitor<S, C = SystemClock> {
    shared: Arc<Shared<S, C>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<S> NetworkMonitor<S>
where
    S: InterfaceSupplier + 'static,
{
    /// Creates a monitor driven by the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidInterval`] if `interval` is zero.
    pub fn new(supplier: S, interval: Duration) -> Result<Self, MonitorError> {
        Self::with_clock(supplier, SystemClock, interval)
    }
}

impl<S, C> NetworkMonitor<S, C>
where
    S: InterfaceSupplier + 'static,
    C: Clock,
{
    /// Creates a monitor driven by the given clock.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidInterval`] if `interval` is zero.
    pub fn with_clock(supplier: S, clock: C, interval: Duration) -> Result<Self, MonitorError> {
        if interval.is_zero() {
            return Err(MonitorError::InvalidInterval);
        }

        Ok(Self {
            shared: Arc::new(Shared {
                supplier,
                clock,
                interval,
                state: Mutex::new(MonitorState {
                    last_snapshot: None,
                    first_poll: None,
                    running: false,
                    phase: MonitorPhase::Created,
                }),
                listeners: ListenerRegistry::new(),
                stop: StopSignal::new(),
            }),
            task: Mutex::new(None),
        })
    }

    /// Returns the poll interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.shared.interval
    }

    /// Returns the lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> MonitorPhase {
        self.shared.lock_state().phase
    }

    /// Returns true while the polling task is executing.
    ///
    /// After [`stop`](Self::stop) this stays true until the task has
    /// observed the stop signal and exited.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.lock_state().running
    }

    /// Returns the current interfaces.
    ///
    /// Before [`start`](Self::start) the first successful result is cached
    /// and returned by later calls without consulting the supplier again.
    /// While polling runs, every call supplies a fresh snapshot (which the
    /// polling task then diffs against).
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Supply`] if the supplier fails.
    pub fn get_current_interface_list(&self) -> Result<InterfaceSnapshot, MonitorError> {
        Ok(self.shared.current()?)
    }

    /// Starts the polling task.
    ///
    /// Must be called from within a tokio runtime. The task inherits the
    /// caller's current `tracing` subscriber.
    ///
    /// # Errors
    ///
    /// - [`MonitorError::AlreadyStarted`] if the monitor is running
    /// - [`MonitorError::AlreadyStopped`] if the monitor was stopped
    /// - [`MonitorError::NoRuntime`] outside a tokio runtime
    pub fn start(&self) -> Result<(), MonitorError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| MonitorError::NoRuntime)?;

        {
            let mut state = self.shared.lock_state();
            match state.phase {
                MonitorPhase::Running => return Err(MonitorError::AlreadyStarted),
                MonitorPhase::Stopped => return Err(MonitorError::AlreadyStopped),
                MonitorPhase::Created => {}
            }
            state.phase = MonitorPhase::Running;
            state.running = true;
        }

        let span = tracing::info_span!(
            "network_monitor",
            interval_ms = u64::try_from(self.shared.interval.as_millis()).unwrap_or(u64::MAX)
        );
        let task = runtime.spawn(
            Arc::clone(&self.shared)
                .run()
                .instrument(span)
                .with_current_subscriber(),
        );
        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
        Ok(())
    }

    /// Requests the polling task to stop.
    ///
    /// Returns immediately; a sleeping task wakes at once and no further
    /// poll starts after the signal is observed. An in-flight supplier call
    /// or dispatch is not interrupted. Use [`join`](Self::join) to wait for
    /// the task to exit.
    pub fn stop(&self) {
        self.shared.stop.raise();
        self.shared.lock_state().phase = MonitorPhase::Stopped;
    }

    /// Waits for the polling task to exit.
    ///
    /// Returns immediately if the monitor was never started. Only meaningful
    /// after [`stop`](Self::stop); otherwise it waits indefinitely.
    pub async fn join(&self) {
        let task = self.task.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!("Network monitor task failed: {e}");
            }
        }
    }

    /// Registers a change listener.
    pub fn add_network_change_listener<L>(&self, listener: L) -> ListenerId
    where
        L: NetworkChangeListener + 'static,
    {
        self.shared.listeners.add(listener)
    }

    /// Unregisters a change listener. Returns false if it was not registered.
    pub fn remove_network_change_listener(&self, id: ListenerId) -> bool {
        self.shared.listeners.remove(id)
    }

    /// Returns a handle to the listener registry.
    ///
    /// Listeners that need to remove themselves can hold a clone.
    #[must_use]
    pub fn listener_registry(&self) -> ListenerRegistry {
        self.shared.listeners.clone()
    }

    /// Returns a stream of all future change events.
    #[must_use]
    pub fn subscribe(&self) -> ChangeStream {
        ChangeStream::register(&self.shared.listeners)
    }
}

impl<S, C> Drop for NetworkMonitor<S, C> {
    fn drop(&mut self) {
        self.shared.stop.raise();
    }
}

impl<S, C> std::fmt::Debug for NetworkMonitor<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkMonitor")
            .field("interval", &self.shared.interval)
            .field("listeners", &self.shared.listeners)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "poller_tests.rs"]
mod tests;
