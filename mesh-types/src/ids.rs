//! Identity types for docmesh.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier for one participant in the sync group.
///
/// Unique per process instance for the lifetime of a connection. The wire
/// form is the plain string.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Create a PeerId from a caller-chosen string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a new random PeerId (`peer-` followed by 22 base64 chars).
    pub fn random() -> Self {
        let bytes = uuid::Uuid::new_v4();
        Self(format!("peer-{}", URL_SAFE_NO_PAD.encode(bytes.as_bytes())))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PeerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", self.0)
    }
}

/// Key of a peer's durable storage.
///
/// Upstream layers use it to decide what sync state a peer already has.
/// The wire form is the hyphenated UUID string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorageId(uuid::Uuid);

impl StorageId {
    /// Create a new random StorageId.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for StorageId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<uuid::Uuid> for StorageId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

impl TryFrom<String> for StorageId {
    type Error = uuid::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        uuid::Uuid::parse_str(&value).map(Self)
    }
}

impl From<StorageId> for String {
    fn from(id: StorageId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorageId({})", self.0)
    }
}

/// Identifier of a synchronized document.
///
/// UUID v4, displayed (and sent on the wire) as URL-safe base64.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(uuid::Uuid);

impl DocumentId {
    /// Create a new random DocumentId.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Parse the base64 display form back into a DocumentId.
    pub fn parse(encoded: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(encoded).ok()?;
        uuid::Uuid::from_slice(&bytes).ok().map(Self)
    }

    /// Get the raw bytes of this DocumentId.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<String> for DocumentId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid document id: {value}"))
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", URL_SAFE_NO_PAD.encode(self.0.as_bytes()))
    }
}

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentId({})", &self.to_string()[..8])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_id_random_has_prefix() {
        let id = PeerId::random();
        assert!(id.as_str().starts_with("peer-"));
        assert_eq!(id.as_str().len(), 5 + 22); // 16 bytes = 22 base64 chars
    }

    #[test]
    fn peer_id_random_is_unique() {
        assert_ne!(PeerId::random(), PeerId::random());
    }

    #[test]
    fn peer_id_ordering_follows_string() {
        let a = PeerId::new("alice");
        let b = PeerId::new("bob");
        assert!(a < b);
    }

    #[test]
    fn peer_id_serializes_as_plain_string() {
        let id = PeerId::new("peer-a");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"peer-a\"");
    }

    #[test]
    fn storage_id_display_is_hyphenated_uuid() {
        let id = StorageId::new();
        assert_eq!(id.to_string().len(), 36);
        assert_eq!(id.as_uuid().get_version_num(), 4);
    }

    #[test]
    fn document_id_parse_display() {
        let id = DocumentId::new();
        let display = id.to_string();
        assert_eq!(display.len(), 22);
        assert_eq!(DocumentId::parse(&display), Some(id));
    }

    #[test]
    fn storage_id_serializes_as_string() {
        let id = StorageId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let restored: StorageId = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, id);
    }

    #[test]
    fn document_id_rejects_bad_wire_string() {
        assert!(serde_json::from_str::<DocumentId>("\"nope\"").is_err());
    }

    #[test]
    fn document_id_parse_rejects_garbage() {
        assert!(DocumentId::parse("not base64 at all!").is_none());
        assert!(DocumentId::parse("AAAA").is_none()); // valid base64, wrong length
    }
}
