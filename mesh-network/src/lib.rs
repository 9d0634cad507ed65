//! # mesh-network
//!
//! Transports for docmesh peer-to-peer document sync.
//!
//! A transport tells the layers above it which peers exist and moves repo
//! messages between them. This crate provides the contract and an
//! implementation over a shared broadcast medium.
//!
//! ## Features
//!
//! - **Transport Contract**: [`Transport`] with typed [`TransportEvent`]s
//! - **Broadcast Transport**: arrive/welcome discovery on a named channel
//! - **Pure State Machine**: lifecycle and handshake logic come from mesh-core
//! - **Test Doubles**: [`MockTransport`] and [`MockSynchronizer`]
//!
//! ## Example
//!
//! ```ignore
//! use mesh_network::{BroadcastOptions, BroadcastTransport, Transport};
//!
//! let transport = BroadcastTransport::new(BroadcastOptions::default());
//! let mut events = transport.subscribe();
//! transport.connect(PeerId::random(), PeerMetadata::new())?;
//!
//! // Ready, then one PeerCandidate per peer already on the channel
//! let event = events.recv().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bridge;
pub mod config;
pub mod events;
pub mod medium;
pub mod synchronizer;
pub mod transport;

pub use bridge::Bridge;
pub use config::{BroadcastOptions, Config, ConfigError, PeerSettings};
pub use events::EventBus;
pub use medium::{BroadcastChannel, Medium};
pub use synchronizer::{MockSynchronizer, Synchronizer, SynchronizerEvent};
pub use transport::{
    BroadcastTransport, MockTransport, Transport, TransportError, TransportEvent,
};
