//! The contract between a transport owner and whatever keeps documents in
//! sync.
//!
//! A synchronizer consumes inbound [`Message`]s and produces outbound
//! [`MessageContents`] (no sender yet) plus sync-state notifications.

use std::sync::Arc;

use mesh_types::{Message, MessageContents, PeerId, SyncState};
use parking_lot::Mutex;
use tokio::sync::broadcast::Receiver;

use crate::events::EventBus;

/// What a synchronizer reports to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynchronizerEvent {
    /// A message to send; the owner stamps the sender.
    Message(MessageContents),
    /// Sync progress with one peer.
    SyncState {
        /// The peer the state refers to.
        peer_id: PeerId,
        /// Shared heads for the document.
        state: SyncState,
    },
}

/// Consumes inbound messages and emits outbound ones.
pub trait Synchronizer: Send {
    /// Handle one inbound message.
    fn receive_message(&mut self, message: Message);

    /// Register an event subscriber.
    fn subscribe(&self) -> Receiver<SynchronizerEvent>;
}

/// Synchronizer double for tests.
///
/// Records every received message and lets the test emit events. Clones
/// share state.
#[derive(Debug, Clone, Default)]
pub struct MockSynchronizer {
    received: Arc<Mutex<Vec<Message>>>,
    events: Arc<EventBus<SynchronizerEvent>>,
}

impl MockSynchronizer {
    /// Create a new mock synchronizer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages received so far.
    pub fn received(&self) -> Vec<Message> {
        self.received.lock().clone()
    }

    /// Emit an outbound message.
    pub fn emit_message(&self, contents: MessageContents) -> usize {
        self.events.emit(SynchronizerEvent::Message(contents))
    }

    /// Emit a sync-state notification.
    pub fn emit_sync_state(&self, peer_id: PeerId, state: SyncState) -> usize {
        self.events
            .emit(SynchronizerEvent::SyncState { peer_id, state })
    }
}

impl Synchronizer for MockSynchronizer {
    fn receive_message(&mut self, message: Message) {
        self.received.lock().push(message);
    }

    fn subscribe(&self) -> Receiver<SynchronizerEvent> {
        self.events.subscribe()
    }
}
