//! Change listeners and the registry that fans events out to them.
//!
//! Dispatch copies the listener list under the registry lock and invokes
//! the listeners after releasing it, so a listener may add or remove
//! listeners (itself included) while it runs.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use super::ChangeEvent;

/// Error a listener may return from [`NetworkChangeListener::network_changed`].
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Receives interface change events.
///
/// Listeners run synchronously on the polling task; a slow listener delays
/// the next poll. Closures of the matching signature implement this trait.
///
/// # Example
///
/// ```
/// use ifwatch::monitor::{ChangeEvent, ListenerError, ListenerRegistry};
///
/// let registry = ListenerRegistry::new();
/// registry.add(|event: &ChangeEvent| -> Result<(), ListenerError> {
///     println!("{event}");
///     Ok(())
/// });
/// assert_eq!(registry.count(), 1);
/// ```
pub trait NetworkChangeListener: Send + Sync {
    /// Called once per change event.
    ///
    /// # Errors
    ///
    /// A returned error is logged by the registry; it does not affect other
    /// listeners or the monitor.
    fn network_changed(&self, event: &ChangeEvent) -> Result<(), ListenerError>;
}

impl<F> NetworkChangeListener for F
where
    F: Fn(&ChangeEvent) -> Result<(), ListenerError> + Send + Sync,
{
    fn network_changed(&self, event: &ChangeEvent) -> Result<(), ListenerError> {
        self(event)
    }
}

/// Identifies a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<(ListenerId, Arc<dyn NetworkChangeListener>)>,
}

/// Thread-safe collection of listeners.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle that does not keep the registry alive.
    pub(crate) fn downgrade(&self) -> WeakListenerRegistry {
        WeakListenerRegistry {
            inner: Arc::downgrade(&self.inner),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a listener and returns its id.
    ///
    /// The same listener value may be added more than once; each
    /// registration gets its own id and receives every event.
    pub fn add<L: NetworkChangeListener + 'static>(&self, listener: L) -> ListenerId {
        self.add_shared(Arc::new(listener))
    }

    /// Registers an already shared listener.
    pub fn add_shared(&self, listener: Arc<dyn NetworkChangeListener>) -> ListenerId {
        let mut registry = self.lock();
        let id = ListenerId(registry.next_id);
        registry.next_id += 1;
        registry.entries.push((id, listener));
        id
    }

    /// Unregisters a listener. Returns false if `id` was not registered.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut registry = self.lock();
        let before = registry.entries.len();
        registry.entries.retain(|(entry, _)| *entry != id);
        registry.entries.len() != before
    }

    /// Returns true if `id` is registered.
    #[must_use]
    pub fn contains(&self, id: ListenerId) -> bool {
        self.lock().entries.iter().any(|(entry, _)| *entry == id)
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn count(&self) -> usize {
        self.lock().entries.len()
    }

    /// Sends `event` to every listener registered at the time of the call,
    /// in registration order.
    ///
    /// A listener that returns an error or panics is logged and skipped.
    pub fn dispatch(&self, event: &ChangeEvent) {
        let listeners: Vec<(ListenerId, Arc<dyn NetworkChangeListener>)> =
            self.lock().entries.clone();

        for (id, listener) in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener.network_changed(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!("Listener {id} failed to handle '{event}': {e}");
                }
                Err(panic) => {
                    tracing::error!(
                        "Listener {id} panicked while handling '{event}': {}",
                        panic_message(&*panic)
                    );
                }
            }
        }
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("count", &self.count())
            .finish()
    }
}

/// Non-owning handle to a [`ListenerRegistry`].
#[derive(Clone)]
pub(crate) struct WeakListenerRegistry {
    inner: Weak<Mutex<Registry>>,
}

impl WeakListenerRegistry {
    pub(crate) fn upgrade(&self) -> Option<ListenerRegistry> {
        self.inner.upgrade().map(|inner| ListenerRegistry { inner })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::StateType;
    use crate::testing::{LogCapture, ethernet};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn event() -> ChangeEvent {
        ChangeEvent::added(ethernet(true), StateType::Up)
    }

    /// Listener that records the names of the events it receives.
    #[derive(Clone, Default)]
    struct Recorder {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl NetworkChangeListener for Recorder {
        fn network_changed(&self, event: &ChangeEvent) -> Result<(), ListenerError> {
            self.seen.lock().unwrap().push(event.to_string());
            Ok(())
        }
    }

    mod registration {
        use super::*;

        #[test]
        fn add_and_remove() {
            let registry = ListenerRegistry::new();
            let id = registry.add(Recorder::default());

            assert_eq!(registry.count(), 1);
            assert!(registry.contains(id));

            assert!(registry.remove(id));
            assert_eq!(registry.count(), 0);
            assert!(!registry.contains(id));
        }

        #[test]
        fn removing_unknown_id_returns_false() {
            let registry = ListenerRegistry::new();
            let id = registry.add(Recorder::default());
            registry.remove(id);

            assert!(!registry.remove(id));
        }

        #[test]
        fn ids_are_unique() {
            let registry = ListenerRegistry::new();
            let recorder = Recorder::default();

            let first = registry.add(recorder.clone());
            let second = registry.add(recorder);

            assert_ne!(first, second);
            assert_eq!(registry.count(), 2);
        }

        #[test]
        fn clones_share_listeners() {
            let registry = ListenerRegistry::new();
            let handle = registry.clone();

            handle.add(Recorder::default());

            assert_eq!(registry.count(), 1);
        }

        #[test]
        fn debug_shows_count() {
            let registry = ListenerRegistry::new();
            registry.add(Recorder::default());

            assert_eq!(format!("{registry:?}"), "ListenerRegistry { count: 1 }");
        }
    }

    mod dispatch {
        use super::*;

        #[test]
        fn reaches_every_listener_in_order() {
            let registry = ListenerRegistry::new();
            let order = Arc::new(Mutex::new(Vec::new()));
            for n in 0..3 {
                let order = Arc::clone(&order);
                registry.add(move |_: &ChangeEvent| -> Result<(), ListenerError> {
                    order.lock().unwrap().push(n);
                    Ok(())
                });
            }

            registry.dispatch(&event());

            assert_eq!(*order.lock().unwrap(), [0, 1, 2]);
        }

        #[test]
        fn duplicate_registration_receives_twice() {
            let registry = ListenerRegistry::new();
            let recorder = Recorder::default();
            registry.add(recorder.clone());
            registry.add(recorder.clone());

            registry.dispatch(&event());

            assert_eq!(recorder.seen().len(), 2);
        }

        #[test]
        fn listener_can_remove_itself() {
            let registry = ListenerRegistry::new();
            let calls = Arc::new(AtomicUsize::new(0));
            let own_id = Arc::new(Mutex::new(None));

            let id = {
                let registry = registry.clone();
                let calls = Arc::clone(&calls);
                let own_id = Arc::clone(&own_id);
                registry.clone().add(move |_: &ChangeEvent| -> Result<(), ListenerError> {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if let Some(id) = *own_id.lock().unwrap() {
                        registry.remove(id);
                    }
                    Ok(())
                })
            };
            *own_id.lock().unwrap() = Some(id);

            registry.dispatch(&event());
            registry.dispatch(&event());

            assert_eq!(calls.load(Ordering::SeqCst), 1);
            assert_eq!(registry.count(), 0);
        }

        #[test]
        fn listener_added_during_dispatch_waits_for_next_event() {
            let registry = ListenerRegistry::new();
            let late = Recorder::default();
            {
                let registry = registry.clone();
                let late = late.clone();
                let added = Arc::new(AtomicUsize::new(0));
                registry.clone().add(move |_: &ChangeEvent| -> Result<(), ListenerError> {
                    if added.fetch_add(1, Ordering::SeqCst) == 0 {
                        registry.add(late.clone());
                    }
                    Ok(())
                });
            }

            registry.dispatch(&event());
            assert!(late.seen().is_empty());

            registry.dispatch(&event());
            assert_eq!(late.seen().len(), 1);
        }

        #[test]
        fn failing_listener_does_not_stop_others() {
            let logs = LogCapture::default();
            let _guard = logs.install();
            let registry = ListenerRegistry::new();
            let before = Recorder::default();
            let after = Recorder::default();

            registry.add(before.clone());
            registry.add(|_: &ChangeEvent| Err::<(), ListenerError>("socket closed".into()));
            registry.add(after.clone());

            registry.dispatch(&event());

            assert_eq!(before.seen(), ["eth0: added / up"]);
            assert_eq!(after.seen(), ["eth0: added / up"]);
            let warnings = logs.warnings();
            assert_eq!(warnings.len(), 1);
            assert!(warnings[0].contains("socket closed"));
        }

        #[test]
        fn panicking_listener_does_not_stop_others() {
            let logs = LogCapture::default();
            let _guard = logs.install();
            let registry = ListenerRegistry::new();
            let after = Recorder::default();

            registry.add(|_: &ChangeEvent| -> Result<(), ListenerError> { panic!("listener bug") });
            registry.add(after.clone());

            registry.dispatch(&event());

            assert_eq!(after.seen().len(), 1);
            let errors = logs.at(tracing::Level::ERROR);
            assert_eq!(errors.len(), 1);
            assert!(errors[0].contains("listener bug"));
        }

        #[test]
        fn empty_registry_is_a_no_op() {
            ListenerRegistry::new().dispatch(&event());
        }
    }
}
