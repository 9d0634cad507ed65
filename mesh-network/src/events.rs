//! Typed publish/subscribe for transport and synchronizer events.
//!
//! A fixed event type per bus, one-to-many delivery to independently
//! registered subscribers. Built on `tokio::sync::broadcast`, so a slow
//! subscriber lags (and is told so) instead of blocking the producer.

use parking_lot::Mutex;
use tokio::sync::broadcast;

/// Default number of events buffered per subscriber.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// A closable broadcast bus for one event type.
#[derive(Debug)]
pub struct EventBus<E> {
    tx: broadcast::Sender<E>,
    open: Mutex<bool>,
}

impl<E: Clone> EventBus<E> {
    /// Create a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            open: Mutex::new(true),
        }
    }

    /// Register a new subscriber.
    ///
    /// Subscribers only see events emitted after they subscribed.
    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.tx.subscribe()
    }

    /// Deliver an event to every current subscriber.
    ///
    /// Returns the number of subscribers reached. Events emitted with no
    /// subscribers, or after [`close_with`](Self::close_with), are dropped.
    pub fn emit(&self, event: E) -> usize {
        let open = self.open.lock();
        if !*open {
            return 0;
        }
        self.tx.send(event).unwrap_or(0)
    }

    /// Emit a final event, then silence the bus for good.
    ///
    /// Only the first call emits anything.
    pub fn close_with(&self, event: E) {
        let mut open = self.open.lock();
        if *open {
            let _ = self.tx.send(event);
            *open = false;
        }
    }

    /// Whether the bus has been closed.
    pub fn is_closed(&self) -> bool {
        !*self.open.lock()
    }
}

impl<E: Clone> Default for EventBus<E> {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
