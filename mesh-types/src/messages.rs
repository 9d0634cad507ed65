//! Repo messages carried between peers.
//!
//! A [`Message`] is what the transport delivers to, and accepts from, the
//! layers above it. Its [`MessageBody`] is an explicit tagged variant: a
//! payload-less message is never mistaken for a sync-state report.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{DocumentId, PeerId};

/// An addressed (or broadcast) repo message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Peer that produced the message.
    pub sender_id: PeerId,
    /// Intended recipient; `None` means every peer on the channel.
    pub target_id: Option<PeerId>,
    /// What the message carries.
    pub body: MessageBody,
}

impl Message {
    /// Create a message addressed to a single peer.
    pub fn to_peer(sender_id: PeerId, target_id: PeerId, body: MessageBody) -> Self {
        Self {
            sender_id,
            target_id: Some(target_id),
            body,
        }
    }

    /// Create a message for every peer on the channel.
    pub fn broadcast(sender_id: PeerId, body: MessageBody) -> Self {
        Self {
            sender_id,
            target_id: None,
            body,
        }
    }

    /// Whether this message is meant for `peer`.
    ///
    /// Broadcast messages are meant for everyone.
    pub fn is_for(&self, peer: &PeerId) -> bool {
        self.target_id.as_ref().map_or(true, |target| target == peer)
    }
}

/// Message kinds understood by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    /// CRDT sync payload for a document.
    Sync {
        /// Document being synchronized.
        document_id: DocumentId,
        /// Opaque sync payload.
        data: Bytes,
    },
    /// Request for a document the sender does not have.
    Request {
        /// Requested document.
        document_id: DocumentId,
        /// Opaque initial sync payload.
        data: Bytes,
    },
    /// Transient application payload, never persisted.
    Ephemeral {
        /// Document the payload relates to.
        document_id: DocumentId,
        /// Session of the sending repo.
        session_id: String,
        /// Per-session sequence number.
        count: u64,
        /// Opaque payload.
        data: Bytes,
    },
    /// Reply that the sender cannot provide a requested document.
    DocUnavailable {
        /// Document that is unavailable.
        document_id: DocumentId,
    },
    /// Synchronization progress report; carries no binary payload.
    SyncState(SyncState),
}

impl MessageBody {
    /// The binary payload, if this kind carries one.
    pub fn payload(&self) -> Option<&Bytes> {
        match self {
            Self::Sync { data, .. } | Self::Request { data, .. } | Self::Ephemeral { data, .. } => {
                Some(data)
            }
            Self::DocUnavailable { .. } | Self::SyncState(_) => None,
        }
    }

    /// Whether this is a sync-state report rather than a data message.
    pub fn is_sync_state(&self) -> bool {
        matches!(self, Self::SyncState(_))
    }

    /// The document this message concerns.
    pub fn document_id(&self) -> DocumentId {
        match self {
            Self::Sync { document_id, .. }
            | Self::Request { document_id, .. }
            | Self::Ephemeral { document_id, .. }
            | Self::DocUnavailable { document_id } => *document_id,
            Self::SyncState(state) => state.document_id,
        }
    }

    /// Short kind name, matching the wire `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Sync { .. } => "sync",
            Self::Request { .. } => "request",
            Self::Ephemeral { .. } => "ephemeral",
            Self::DocUnavailable { .. } => "doc-unavailable",
            Self::SyncState(_) => "sync-state",
        }
    }
}

/// Synchronization status with a peer for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    /// Document the status refers to.
    pub document_id: DocumentId,
    /// Change hashes both sides are known to share.
    pub heads: Vec<String>,
}

/// A message before a sender has been stamped on it.
///
/// This is what a synchronizer emits; whoever owns the transport knows the
/// local peer id and turns it into a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageContents {
    /// Intended recipient; `None` means every peer.
    pub target_id: Option<PeerId>,
    /// What the message carries.
    pub body: MessageBody,
}

impl MessageContents {
    /// Stamp the sender and produce a sendable message.
    pub fn into_message(self, sender_id: PeerId) -> Message {
        Message {
            sender_id,
            target_id: self.target_id,
            body: self.body,
        }
    }
}
