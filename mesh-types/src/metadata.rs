//! Capability advertisement exchanged during the handshake.

use serde::{Deserialize, Serialize};

use crate::StorageId;

/// How a peer presents itself to the rest of the group.
///
/// Immutable once the handshake has carried it to a remote peer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerMetadata {
    /// Key of the peer's durable storage, if it has any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_id: Option<StorageId>,
    /// Whether the peer is transient and not worth recording sync state for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_ephemeral: Option<bool>,
}

impl PeerMetadata {
    /// Metadata with no advertised capabilities.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertise a durable storage key.
    pub fn with_storage_id(mut self, storage_id: StorageId) -> Self {
        self.storage_id = Some(storage_id);
        self
    }

    /// Mark the peer as ephemeral (or explicitly not).
    pub fn ephemeral(mut self, is_ephemeral: bool) -> Self {
        self.is_ephemeral = Some(is_ephemeral);
        self
    }

    /// True only when the peer explicitly declared itself ephemeral.
    pub fn is_ephemeral(&self) -> bool {
        self.is_ephemeral.unwrap_or(false)
    }
}
