//! Time abstraction for testability.
//!
//! This module provides a [`Clock`] trait so the monitor never reads the
//! system time or sleeps directly, a real-time [`SystemClock`], an
//! accelerated [`ScaledClock`] for tests, and the [`StopSignal`] that
//! interrupts a sleeping clock.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;

/// Error type for clock construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    /// The acceleration factor must be at least 1.
    #[error("Invalid time acceleration factor {0}: must be at least 1")]
    InvalidFactor(u32),
}

/// How a cancellable sleep ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The full duration elapsed.
    Elapsed,
    /// The stop signal was raised before the duration elapsed.
    Stopped,
}

/// Level-triggered cancellation signal.
///
/// Once raised it stays raised. Clones share the same signal, so one clone
/// can be handed to a sleeping task and another kept by whoever stops it.
///
/// # Example
///
/// ```
/// use ifwatch::time::StopSignal;
///
/// let stop = StopSignal::new();
/// let observer = stop.clone();
/// assert!(!observer.is_raised());
///
/// stop.raise();
/// assert!(observer.is_raised());
/// ```
#[derive(Debug, Clone)]
pub struct StopSignal {
    sender: Arc<watch::Sender<bool>>,
}

impl StopSignal {
    /// Creates a signal that has not been raised.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Raises the signal, waking every task waiting in [`raised`](Self::raised).
    pub fn raise(&self) {
        self.sender.send_replace(true);
    }

    /// Returns true once the signal has been raised.
    #[must_use]
    pub fn is_raised(&self) -> bool {
        *self.sender.borrow()
    }

    /// Completes when the signal is raised (immediately if it already was).
    pub async fn raised(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender is owned by `self`, so the channel cannot close while we wait.
        let _ = receiver.wait_for(|raised| *raised).await;
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Abstraction over time for testability.
///
/// Implementations provide the current instant and a sleep primitive.
/// Sleeping can be interrupted through
/// [`sleep_cancellable`](Clock::sleep_cancellable).
pub trait Clock: Send + Sync + 'static {
    /// Returns the current instant.
    fn now(&self) -> Instant;

    /// Sleeps for (at least) `duration`, as measured by this clock.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;

    /// Sleeps for `duration` unless `stop` is raised first.
    ///
    /// A signal that was already raised wins immediately.
    fn sleep_cancellable(
        &self,
        duration: Duration,
        stop: &StopSignal,
    ) -> impl Future<Output = Wake> + Send {
        async move {
            tokio::select! {
                biased;

                () = stop.raised() => Wake::Stopped,
                () = self.sleep(duration) => Wake::Elapsed,
            }
        }
    }
}

/// Production clock using tokio's notion of time.
///
/// Under a paused tokio runtime (`start_paused = true`) this clock follows
/// the virtual time, which keeps polling tests deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

/// A clock that runs `factor` times faster than real time.
///
/// `now()` reports the scaled time elapsed since the clock was created and
/// `sleep(d)` really waits `d / factor` (rounded up), so durations measured
/// with the same clock stay consistent.
///
/// # Example
///
/// ```
/// use ifwatch::time::ScaledClock;
///
/// assert!(ScaledClock::new(4).is_ok());
/// assert!(ScaledClock::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ScaledClock {
    factor: u32,
    origin: Instant,
}

impl ScaledClock {
    /// Creates a clock accelerated by `factor`.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidFactor`] if `factor` is zero.
    pub fn new(factor: u32) -> Result<Self, ClockError> {
        if factor == 0 {
            return Err(ClockError::InvalidFactor(factor));
        }
        Ok(Self {
            factor,
            origin: Instant::now(),
        })
    }

    /// Returns the acceleration factor.
    #[must_use]
    pub const fn factor(&self) -> u32 {
        self.factor
    }

    fn real_duration(&self, scaled: Duration) -> Duration {
        let nanos = scaled.as_nanos().div_ceil(u128::from(self.factor));
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

impl Clock for ScaledClock {
    fn now(&self) -> Instant {
        self.origin + self.origin.elapsed() * self.factor
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(self.real_duration(duration))
    }
}
