//! Mock transport for testing.
//!
//! Allows injecting events and capturing sent messages for verification.

use std::sync::Arc;

use mesh_core::{Event, TransportState};
use mesh_types::{Message, PeerId, PeerMetadata};
use parking_lot::Mutex;
use tokio::sync::broadcast::Receiver;

use super::{Transport, TransportError, TransportEvent};
use crate::events::EventBus;

/// Channel name reported in the mock's `Ready` event.
pub const MOCK_CHANNEL: &str = "mock";

/// Mock transport for testing.
///
/// Clones share state, so a test can keep one handle while the code under
/// test owns another.
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
    events: Arc<EventBus<TransportEvent>>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    state: TransportState,
    local: Option<(PeerId, PeerMetadata)>,
    sent_messages: Vec<Message>,
    fail_next_connect: Option<TransportError>,
    fail_next_send: Option<TransportError>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an event to every subscriber, as if it came from the network.
    pub fn inject(&self, event: TransportEvent) -> usize {
        self.events.emit(event)
    }

    /// Get all messages that were sent.
    pub fn sent_messages(&self) -> Vec<Message> {
        self.inner.lock().sent_messages.clone()
    }

    /// Get the last message that was sent.
    pub fn last_sent(&self) -> Option<Message> {
        self.inner.lock().sent_messages.last().cloned()
    }

    /// The identity passed to `connect`.
    pub fn connected_as(&self) -> Option<(PeerId, PeerMetadata)> {
        self.inner.lock().local.clone()
    }

    /// Cause the next connect() to fail with the given error.
    pub fn fail_next_connect(&self, error: TransportError) {
        self.inner.lock().fail_next_connect = Some(error);
    }

    /// Cause the next send() to fail with the given error.
    pub fn fail_next_send(&self, error: TransportError) {
        self.inner.lock().fail_next_send = Some(error);
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            events: Arc::clone(&self.events),
        }
    }
}

impl Transport for MockTransport {
    fn connect(&self, peer_id: PeerId, peer_metadata: PeerMetadata) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();

        // Check for forced failure
        if let Some(error) = inner.fail_next_connect.take() {
            return Err(error);
        }

        match inner.state {
            TransportState::Unconnected => {}
            TransportState::Closed => return Err(TransportError::Closed),
            _ => return Err(TransportError::AlreadyConnected),
        }

        let (state, _) = inner.state.on_event(Event::ConnectRequested);
        let (state, _) = state.on_event(Event::ChannelOpened);
        inner.state = state;
        inner.local = Some((peer_id, peer_metadata));
        self.events.emit(TransportEvent::Ready {
            channel: MOCK_CHANNEL.to_string(),
        });
        Ok(())
    }

    fn send(&self, message: Message) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();

        match inner.state {
            TransportState::Ready => {}
            TransportState::Closed => return Err(TransportError::Closed),
            _ => return Err(TransportError::NotConnected),
        }

        // Check for forced failure
        if let Some(error) = inner.fail_next_send.take() {
            return Err(error);
        }

        inner.sent_messages.push(message);
        Ok(())
    }

    fn disconnect(&self) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();

        match inner.state {
            TransportState::Unconnected => return Err(TransportError::NotConnected),
            TransportState::Closed => return Err(TransportError::Closed),
            _ => {}
        }

        inner.state = inner.state.on_event(Event::DisconnectRequested).0;
        self.events.close_with(TransportEvent::Close);
        Ok(())
    }

    fn subscribe(&self) -> Receiver<TransportEvent> {
        self.events.subscribe()
    }

    fn is_ready(&self) -> bool {
        self.inner.lock().state.is_ready()
    }
}
