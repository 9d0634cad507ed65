//! # mesh-types
//!
//! Wire format types for docmesh peer-to-peer document sync.
//!
//! This crate provides the foundational types used across all docmesh crates:
//! - [`PeerId`], [`StorageId`], [`DocumentId`] - Identity types
//! - [`PeerMetadata`] - Capabilities a peer advertises during the handshake
//! - [`Message`] - Repo messages (sync, request, ephemeral, sync-state, ...)
//! - [`Frame`] - What is actually posted on a broadcast channel
//! - [`WireError`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod frame;
mod ids;
mod messages;
mod metadata;

pub use error::WireError;
pub use frame::Frame;
pub use ids::{DocumentId, PeerId, StorageId};
pub use messages::{Message, MessageBody, MessageContents, SyncState};
pub use metadata::PeerMetadata;
