//! Stream adapter over the listener registry.

use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::mpsc;
use tokio_stream::Stream;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::listener::WeakListenerRegistry;
use super::{ChangeEvent, ListenerError, ListenerId, ListenerRegistry};

/// A stream of change events.
///
/// Created by [`NetworkMonitor::subscribe`](super::NetworkMonitor::subscribe).
/// The stream is backed by a listener registered with the monitor; dropping
/// the stream unregisters it. Events are buffered without bound, so a slow
/// consumer never delays the polling task.
///
/// The stream ends when the monitor (and with it the registry) is dropped.
pub struct ChangeStream {
    events: UnboundedReceiverStream<ChangeEvent>,
    registry: WeakListenerRegistry,
    id: ListenerId,
}

impl ChangeStream {
    pub(crate) fn register(registry: &ListenerRegistry) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = registry.add(move |event: &ChangeEvent| -> Result<(), ListenerError> {
            sender.send(event.clone())?;
            Ok(())
        });

        Self {
            events: UnboundedReceiverStream::new(receiver),
            registry: registry.downgrade(),
            id,
        }
    }

    /// Returns the id of the listener backing this stream.
    #[must_use]
    pub const fn listener_id(&self) -> ListenerId {
        self.id
    }
}

impl Stream for ChangeStream {
    type Item = ChangeEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

impl Drop for ChangeStream {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

impl std::fmt::Debug for ChangeStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeStream")
            .field("listener_id", &self.id)
            .finish_non_exhaustive()
    }
}
