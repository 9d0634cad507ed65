//! Frame - the object posted on a broadcast channel.
//!
//! Every frame reaches every listener on the channel, so each one carries
//! its own addressing. Handshake frames (`arrive`, `welcome`, `leave`) and
//! repo-message frames share one tagged union; the `type` tag is the only
//! discriminator, never the presence or absence of a field.
//!
//! Frames are encoded as MessagePack with named fields:
//!
//! ```text
//! { type: "arrive",  sender_id, peer_metadata }
//! { type: "welcome", sender_id, peer_metadata, target_id }
//! { type: "leave",   sender_id }
//! { type: "sync" | "request", sender_id, target_id?, document_id, data }
//! { type: "ephemeral", sender_id, target_id?, document_id, session_id, count, data }
//! { type: "doc-unavailable", sender_id, target_id?, document_id }
//! { type: "sync-state", sender_id, target_id?, document_id, heads }
//! ```

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{
    DocumentId, Message, MessageBody, PeerId, PeerMetadata, SyncState, WireError,
};

/// All frames understood on a broadcast channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Frame {
    /// A peer joined the channel. Implicitly addressed to everyone.
    Arrive {
        /// The arriving peer
        sender_id: PeerId,
        /// How the arriving peer presents itself
        #[serde(default)]
        peer_metadata: PeerMetadata,
    },
    /// Reply to an arrival, addressed to the arriving peer.
    Welcome {
        /// The peer already present
        sender_id: PeerId,
        /// How the present peer presents itself
        #[serde(default)]
        peer_metadata: PeerMetadata,
        /// The arriving peer
        target_id: PeerId,
    },
    /// A peer is leaving the channel.
    Leave {
        /// The departing peer
        sender_id: PeerId,
    },
    /// CRDT sync payload
    Sync {
        /// Sender of the message
        sender_id: PeerId,
        /// Recipient (absent = broadcast)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_id: Option<PeerId>,
        /// Document being synchronized
        document_id: DocumentId,
        /// Detached payload bytes
        data: Bytes,
    },
    /// Document request
    Request {
        /// Sender of the message
        sender_id: PeerId,
        /// Recipient (absent = broadcast)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_id: Option<PeerId>,
        /// Requested document
        document_id: DocumentId,
        /// Detached payload bytes
        data: Bytes,
    },
    /// Transient payload
    Ephemeral {
        /// Sender of the message
        sender_id: PeerId,
        /// Recipient (absent = broadcast)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_id: Option<PeerId>,
        /// Related document
        document_id: DocumentId,
        /// Session of the sending repo
        session_id: String,
        /// Per-session sequence number
        count: u64,
        /// Detached payload bytes
        data: Bytes,
    },
    /// Requested document is unavailable
    DocUnavailable {
        /// Sender of the message
        sender_id: PeerId,
        /// Recipient (absent = broadcast)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_id: Option<PeerId>,
        /// Unavailable document
        document_id: DocumentId,
    },
    /// Synchronization progress report
    SyncState {
        /// Sender of the message
        sender_id: PeerId,
        /// Recipient (absent = broadcast)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_id: Option<PeerId>,
        /// Document the status refers to
        document_id: DocumentId,
        /// Shared change hashes
        heads: Vec<String>,
    },
}

impl Frame {
    /// Build the frame carrying a repo message.
    ///
    /// A `Bytes` payload may be a view into a larger buffer; the frame gets
    /// a freshly sized copy of exactly the viewed range, so nothing outside
    /// the view can reach the channel.
    pub fn from_message(message: &Message) -> Self {
        let sender_id = message.sender_id.clone();
        let target_id = message.target_id.clone();
        match &message.body {
            MessageBody::Sync { document_id, data } => Frame::Sync {
                sender_id,
                target_id,
                document_id: *document_id,
                data: detach(data),
            },
            MessageBody::Request { document_id, data } => Frame::Request {
                sender_id,
                target_id,
                document_id: *document_id,
                data: detach(data),
            },
            MessageBody::Ephemeral {
                document_id,
                session_id,
                count,
                data,
            } => Frame::Ephemeral {
                sender_id,
                target_id,
                document_id: *document_id,
                session_id: session_id.clone(),
                count: *count,
                data: detach(data),
            },
            MessageBody::DocUnavailable { document_id } => Frame::DocUnavailable {
                sender_id,
                target_id,
                document_id: *document_id,
            },
            MessageBody::SyncState(state) => Frame::SyncState {
                sender_id,
                target_id,
                document_id: state.document_id,
                heads: state.heads.clone(),
            },
        }
    }

    /// Rebuild the repo message carried by this frame.
    ///
    /// The decoded payload is already an owned `Bytes` holding exactly the
    /// transmitted range. Returns `None` for handshake frames.
    pub fn into_message(self) -> Option<Message> {
        let (sender_id, target_id, body) = match self {
            Frame::Arrive { .. } | Frame::Welcome { .. } | Frame::Leave { .. } => return None,
            Frame::Sync {
                sender_id,
                target_id,
                document_id,
                data,
            } => (
                sender_id,
                target_id,
                MessageBody::Sync { document_id, data },
            ),
            Frame::Request {
                sender_id,
                target_id,
                document_id,
                data,
            } => (
                sender_id,
                target_id,
                MessageBody::Request { document_id, data },
            ),
            Frame::Ephemeral {
                sender_id,
                target_id,
                document_id,
                session_id,
                count,
                data,
            } => (
                sender_id,
                target_id,
                MessageBody::Ephemeral {
                    document_id,
                    session_id,
                    count,
                    data,
                },
            ),
            Frame::DocUnavailable {
                sender_id,
                target_id,
                document_id,
            } => (sender_id, target_id, MessageBody::DocUnavailable { document_id }),
            Frame::SyncState {
                sender_id,
                target_id,
                document_id,
                heads,
            } => (
                sender_id,
                target_id,
                MessageBody::SyncState(SyncState { document_id, heads }),
            ),
        };
        Some(Message {
            sender_id,
            target_id,
            body,
        })
    }

    /// The peer that posted this frame.
    pub fn sender_id(&self) -> &PeerId {
        match self {
            Frame::Arrive { sender_id, .. }
            | Frame::Welcome { sender_id, .. }
            | Frame::Leave { sender_id }
            | Frame::Sync { sender_id, .. }
            | Frame::Request { sender_id, .. }
            | Frame::Ephemeral { sender_id, .. }
            | Frame::DocUnavailable { sender_id, .. }
            | Frame::SyncState { sender_id, .. } => sender_id,
        }
    }

    /// The addressed recipient, or `None` for frames meant for everyone.
    pub fn target_id(&self) -> Option<&PeerId> {
        match self {
            Frame::Arrive { .. } | Frame::Leave { .. } => None,
            Frame::Welcome { target_id, .. } => Some(target_id),
            Frame::Sync { target_id, .. }
            | Frame::Request { target_id, .. }
            | Frame::Ephemeral { target_id, .. }
            | Frame::DocUnavailable { target_id, .. }
            | Frame::SyncState { target_id, .. } => target_id.as_ref(),
        }
    }

    /// The wire `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Arrive { .. } => "arrive",
            Frame::Welcome { .. } => "welcome",
            Frame::Leave { .. } => "leave",
            Frame::Sync { .. } => "sync",
            Frame::Request { .. } => "request",
            Frame::Ephemeral { .. } => "ephemeral",
            Frame::DocUnavailable { .. } => "doc-unavailable",
            Frame::SyncState { .. } => "sync-state",
        }
    }

    /// Serialize to MessagePack bytes (named fields).
    pub fn encode(&self) -> Result<Bytes, WireError> {
        rmp_serde::to_vec_named(self)
            .map(Bytes::from)
            .map_err(WireError::Serialization)
    }

    /// Deserialize from MessagePack bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        rmp_serde::from_slice(bytes).map_err(WireError::Deserialization)
    }
}

/// Copy exactly the viewed range into a new buffer.
fn detach(view: &Bytes) -> Bytes {
    Bytes::copy_from_slice(view)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(id: &str) -> PeerId {
        PeerId::new(id)
    }

    #[test]
    fn arrive_roundtrip_keeps_metadata() {
        let frame = Frame::Arrive {
            sender_id: peer("a"),
            peer_metadata: PeerMetadata::new().ephemeral(true),
        };
        let restored = Frame::decode(&frame.encode().unwrap()).unwrap();
        assert_eq!(restored, frame);
        assert!(restored.target_id().is_none());
    }

    #[test]
    fn welcome_is_addressed() {
        let frame = Frame::Welcome {
            sender_id: peer("a"),
            peer_metadata: PeerMetadata::default(),
            target_id: peer("b"),
        };
        let restored = Frame::decode(&frame.encode().unwrap()).unwrap();
        assert_eq!(restored.target_id(), Some(&peer("b")));
        assert_eq!(restored.sender_id(), &peer("a"));
    }

    #[test]
    fn logical_shape_uses_type_tag() {
        let frame = Frame::Arrive {
            sender_id: peer("a"),
            peer_metadata: PeerMetadata::default(),
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["type"], "arrive");
        assert_eq!(json["sender_id"], "a");
        assert!(json.get("target_id").is_none());
    }

    #[test]
    fn broadcast_message_omits_target() {
        let msg = Message::broadcast(
            peer("a"),
            MessageBody::DocUnavailable {
                document_id: DocumentId::new(),
            },
        );
        let json = serde_json::to_value(Frame::from_message(&msg)).unwrap();
        assert_eq!(json["type"], "doc-unavailable");
        assert!(json.get("target_id").is_none());
        assert!(json.get("data").is_none());
    }

    #[test]
    fn payload_view_is_detached_to_exact_range() {
        let backing = Bytes::from((0u8..64).collect::<Vec<_>>());
        let view = backing.slice(8..24);
        let msg = Message::to_peer(
            peer("a"),
            peer("b"),
            MessageBody::Sync {
                document_id: DocumentId::new(),
                data: view.clone(),
            },
        );

        let frame = Frame::from_message(&msg);
        let Frame::Sync { data, .. } = &frame else {
            panic!("expected sync frame");
        };
        assert_eq!(data.len(), 16);
        assert_eq!(&data[..], &view[..]);
        assert_ne!(data.as_ptr(), view.as_ptr());

        let restored = Frame::decode(&frame.encode().unwrap())
            .unwrap()
            .into_message()
            .unwrap();
        assert_eq!(&restored.body.payload().unwrap()[..], &backing[8..24]);
    }

    #[test]
    fn doc_unavailable_stays_a_data_message() {
        let msg = Message::to_peer(
            peer("a"),
            peer("b"),
            MessageBody::DocUnavailable {
                document_id: DocumentId::new(),
            },
        );
        let frame = Frame::decode(&Frame::from_message(&msg).encode().unwrap()).unwrap();
        let restored = frame.into_message().unwrap();
        assert!(!restored.body.is_sync_state());
        assert_eq!(restored, msg);
    }

    #[test]
    fn sync_state_survives_the_wire() {
        let msg = Message::broadcast(
            peer("a"),
            MessageBody::SyncState(SyncState {
                document_id: DocumentId::new(),
                heads: vec!["h1".into(), "h2".into()],
            }),
        );
        let frame = Frame::decode(&Frame::from_message(&msg).encode().unwrap()).unwrap();
        assert_eq!(frame.kind(), "sync-state");
        assert_eq!(frame.into_message(), Some(msg));
    }

    #[test]
    fn ephemeral_keeps_session_fields() {
        let msg = Message::broadcast(
            peer("a"),
            MessageBody::Ephemeral {
                document_id: DocumentId::new(),
                session_id: "session-1".into(),
                count: 300,
                data: Bytes::from_static(b"cursor moved"),
            },
        );
        let frame = Frame::decode(&Frame::from_message(&msg).encode().unwrap()).unwrap();
        assert_eq!(frame.into_message(), Some(msg));
    }

    #[test]
    fn handshake_frames_carry_no_message() {
        let frame = Frame::Leave {
            sender_id: peer("a"),
        };
        assert!(frame.into_message().is_none());
    }

    #[test]
    fn unknown_type_fails_to_decode() {
        #[derive(Serialize)]
        struct Bogus {
            r#type: &'static str,
            sender_id: &'static str,
        }
        let bytes = rmp_serde::to_vec_named(&Bogus {
            r#type: "teleport",
            sender_id: "a",
        })
        .unwrap();
        assert!(matches!(
            Frame::decode(&bytes),
            Err(WireError::Deserialization(_))
        ));
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(Frame::decode(&[0xc1, 0x00, 0xff]).is_err());
    }
}
