//! In-process broadcast medium.
//!
//! A [`Medium`] is a registry of named channels. Everything posted on a
//! channel reaches every listener registered on that name at the time of
//! the post, including the poster's own listener. There is no addressing:
//! filtering is the listener's job.
//!
//! [`Medium::shared`] is the process-wide registry, so independent
//! transports that agree on a channel name see each other's traffic.
//! [`Medium::new`] gives an isolated registry (useful in tests).
//!
//! A channel is dropped from the registry once its last handle goes away
//! with no listener left on it.

use bytes::Bytes;
use dashmap::DashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tokio::sync::broadcast;

static SHARED: OnceLock<Medium> = OnceLock::new();

type Registry = DashMap<String, Arc<broadcast::Sender<Bytes>>>;

/// A registry of named broadcast channels.
#[derive(Debug, Clone, Default)]
pub struct Medium {
    channels: Arc<Registry>,
}

impl Medium {
    /// Create an isolated medium.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide medium.
    pub fn shared() -> Self {
        SHARED.get_or_init(Medium::new).clone()
    }

    /// Open (or join) the channel called `name`.
    ///
    /// `capacity` bounds how many unread posts a listener may fall behind
    /// by; it only applies when this call creates the channel.
    pub fn open(&self, name: &str, capacity: usize) -> BroadcastChannel {
        let tx = self
            .channels
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(broadcast::channel(capacity.max(1)).0))
            .clone();
        BroadcastChannel {
            name: name.to_string(),
            tx,
            registry: Arc::clone(&self.channels),
        }
    }

    /// Whether a channel called `name` is currently registered.
    pub fn is_open(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    /// Number of listeners currently registered on `name`.
    pub fn listeners(&self, name: &str) -> usize {
        self.channels
            .get(name)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}

/// A handle to one named channel.
#[derive(Clone)]
pub struct BroadcastChannel {
    name: String,
    tx: Arc<broadcast::Sender<Bytes>>,
    registry: Arc<Registry>,
}

impl BroadcastChannel {
    /// The channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Post raw bytes to every current listener.
    ///
    /// Returns how many listeners the post reached. Delivery is best effort.
    pub fn post(&self, data: Bytes) -> usize {
        self.tx.send(data).unwrap_or(0)
    }

    /// Register a listener.
    pub fn listen(&self) -> broadcast::Receiver<Bytes> {
        self.tx.subscribe()
    }
}

impl fmt::Debug for BroadcastChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastChannel")
            .field("name", &self.name)
            .field("listeners", &self.tx.receiver_count())
            .finish()
    }
}

impl Drop for BroadcastChannel {
    fn drop(&mut self) {
        // The registry's own reference plus ours.
        self.registry.remove_if(&self.name, |_, tx| {
            Arc::ptr_eq(tx, &self.tx) && Arc::strong_count(tx) == 2 && tx.receiver_count() == 0
        });
    }
}
