//! Transport abstraction for docmesh.
//!
//! A transport moves repo [`Message`]s between peers and reports who is
//! out there. The layers above it only see this contract, so a broadcast
//! channel, a socket or a test double are interchangeable.
//!
//! # Design
//!
//! The transport trait is synchronous and event-driven:
//! - `connect()` announces the local peer and starts listening
//! - `send()` posts one message, best effort
//! - `subscribe()` yields a stream of [`TransportEvent`]s
//! - `disconnect()` announces departure and stops all events
//!
//! # Example
//!
//! ```ignore
//! let transport = BroadcastTransport::new(BroadcastOptions::default());
//! let mut events = transport.subscribe();
//! transport.connect(PeerId::new("alice"), PeerMetadata::new())?;
//! while let Ok(event) = events.recv().await {
//!     if let TransportEvent::PeerCandidate { peer_id, .. } = event {
//!         transport.send(Message::to_peer(me.clone(), peer_id, body.clone()))?;
//!     }
//! }
//! ```

mod broadcast;
mod mock;

pub use self::broadcast::BroadcastTransport;
pub use mock::{MockTransport, MOCK_CHANNEL};

use mesh_types::{Message, PeerId, PeerMetadata, WireError};
use thiserror::Error;
use tokio::sync::broadcast::Receiver;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The operation needs a connected transport.
    #[error("not connected")]
    NotConnected,

    /// `connect` was already called.
    #[error("already connected")]
    AlreadyConnected,

    /// The transport was disconnected and cannot be reused.
    #[error("transport closed")]
    Closed,

    /// No tokio runtime to run the channel listener on.
    #[error("no tokio runtime available")]
    NoRuntime,

    /// The transport does not implement this operation.
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),

    /// A frame could not be encoded.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),
}

/// Notifications a transport emits to its subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The transport is connected and usable on the named channel.
    Ready {
        /// Channel the transport joined.
        channel: String,
    },
    /// The transport was torn down. Always the last event.
    Close,
    /// A remote peer was discovered.
    PeerCandidate {
        /// The discovered peer.
        peer_id: PeerId,
        /// What the peer advertised about itself.
        peer_metadata: PeerMetadata,
    },
    /// A remote peer announced its departure.
    PeerDisconnected {
        /// The departed peer.
        peer_id: PeerId,
    },
    /// A message for the local peer arrived.
    Message(Message),
}

/// Transport trait for exchanging repo messages with peers.
///
/// Implementations own their delivery mechanism (broadcast channel, mock,
/// etc). All methods return immediately; results arrive as events.
pub trait Transport: Send + Sync {
    /// Announce `peer_id` on the network and start delivering events.
    ///
    /// Subscribe first to observe [`TransportEvent::Ready`].
    fn connect(&self, peer_id: PeerId, peer_metadata: PeerMetadata)
        -> Result<(), TransportError>;

    /// Send a message. Delivery is best effort; only misuse is an error.
    fn send(&self, message: Message) -> Result<(), TransportError>;

    /// Leave the network. No events are emitted after [`TransportEvent::Close`].
    fn disconnect(&self) -> Result<(), TransportError>;

    /// Register an event subscriber.
    fn subscribe(&self) -> Receiver<TransportEvent>;

    /// Check if the transport can send.
    fn is_ready(&self) -> bool;
}
