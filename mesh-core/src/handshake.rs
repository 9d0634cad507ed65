//! Discovery handshake and addressing filter.
//!
//! Every frame posted on a broadcast channel reaches every listener,
//! including the peer that posted it. [`Handshake::on_frame`] decides, for
//! one listener, what a frame means: a reply to post, a peer to announce,
//! a message to deliver, or nothing at all.
//!
//! One round trip completes discovery:
//!
//! ```text
//! B (new)                      A (present)
//!   ── arrive{B, meta_B} ──────▶   post welcome{A, meta_A, →B}
//!                                  emit peer-candidate(B, meta_B)
//!   ◀──── welcome{A, meta_A, →B} ─
//! emit peer-candidate(A, meta_A)
//! ```
//!
//! When two peers arrive at the same moment each one sees both the other's
//! `arrive` and its `welcome`. A peer is announced once until it leaves.

use std::collections::HashSet;

use mesh_types::{Frame, Message, PeerId, PeerMetadata};

/// What a listener should do in response to one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Post this frame on the channel.
    Post(Frame),
    /// A remote peer was discovered.
    PeerCandidate {
        /// The discovered peer.
        peer_id: PeerId,
        /// What it advertised.
        peer_metadata: PeerMetadata,
    },
    /// A remote peer announced that it is leaving.
    PeerDisconnected {
        /// The departing peer.
        peer_id: PeerId,
    },
    /// Hand a repo message to local consumers.
    Deliver(Message),
}

/// The local side of the handshake for one transport instance.
///
/// Remembers which remote peers it has announced, and nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    peer_id: PeerId,
    peer_metadata: PeerMetadata,
    announced: HashSet<PeerId>,
}

impl Handshake {
    /// Create the handshake for the local peer.
    pub fn new(peer_id: PeerId, peer_metadata: PeerMetadata) -> Self {
        Self {
            peer_id,
            peer_metadata,
            announced: HashSet::new(),
        }
    }

    /// The local peer id.
    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    /// The local peer metadata.
    pub fn peer_metadata(&self) -> &PeerMetadata {
        &self.peer_metadata
    }

    /// The frame announcing the local peer to the channel.
    pub fn arrival(&self) -> Frame {
        Frame::Arrive {
            sender_id: self.peer_id.clone(),
            peer_metadata: self.peer_metadata,
        }
    }

    /// The frame announcing that the local peer is leaving.
    pub fn departure(&self) -> Frame {
        Frame::Leave {
            sender_id: self.peer_id.clone(),
        }
    }

    /// Whether a frame concerns this listener at all.
    ///
    /// Frames addressed to someone else and frames echoed back from our own
    /// posts are not.
    pub fn accepts(&self, frame: &Frame) -> bool {
        if let Some(target) = frame.target_id() {
            if target != &self.peer_id {
                return false;
            }
        }
        frame.sender_id() != &self.peer_id
    }

    /// Process one frame and return what to do, in order.
    ///
    /// A rejected frame yields no dispatches. An `arrive` is always welcomed,
    /// but a peer becomes a candidate only the first time it is seen since
    /// it last left.
    pub fn on_frame(&mut self, frame: Frame) -> Vec<Dispatch> {
        if !self.accepts(&frame) {
            return vec![];
        }

        match frame {
            Frame::Arrive {
                sender_id,
                peer_metadata,
            } => {
                let mut dispatches = vec![Dispatch::Post(Frame::Welcome {
                    sender_id: self.peer_id.clone(),
                    peer_metadata: self.peer_metadata,
                    target_id: sender_id.clone(),
                })];
                dispatches.extend(self.announce(sender_id, peer_metadata));
                dispatches
            }
            Frame::Welcome {
                sender_id,
                peer_metadata,
                ..
            } => self.announce(sender_id, peer_metadata).into_iter().collect(),
            Frame::Leave { sender_id } => {
                self.announced.remove(&sender_id);
                vec![Dispatch::PeerDisconnected { peer_id: sender_id }]
            }
            data => data.into_message().map(Dispatch::Deliver).into_iter().collect(),
        }
    }

    /// Whether `peer_id` has been announced and has not left since.
    pub fn has_announced(&self, peer_id: &PeerId) -> bool {
        self.announced.contains(peer_id)
    }

    fn announce(&mut self, peer_id: PeerId, peer_metadata: PeerMetadata) -> Option<Dispatch> {
        self.announced
            .insert(peer_id.clone())
            .then_some(Dispatch::PeerCandidate {
                peer_id,
                peer_metadata,
            })
    }
}
