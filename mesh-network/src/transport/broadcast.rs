//! Transport over a named broadcast channel.
//!
//! Every instance joined to the same channel name on the same [`Medium`]
//! sees every frame. Discovery is the arrive/welcome handshake from
//! `mesh_core::handshake`; addressing is enforced by each listener.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use mesh_core::{Action, Dispatch, Event, Handshake, TransportState};
use mesh_types::{Frame, Message, PeerId, PeerMetadata};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::broadcast::{error::RecvError, Receiver};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{Transport, TransportError, TransportEvent};
use crate::config::BroadcastOptions;
use crate::events::EventBus;
use crate::medium::{BroadcastChannel, Medium};

/// A [`Transport`] backed by a [`BroadcastChannel`].
///
/// Subscribe before calling [`connect`](Transport::connect) to observe the
/// `Ready` event. A transport connects once; after
/// [`disconnect`](Transport::disconnect) it stays closed.
#[derive(Debug)]
pub struct BroadcastTransport {
    options: BroadcastOptions,
    medium: Medium,
    events: Arc<EventBus<TransportEvent>>,
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    state: TransportState,
    handshake: Option<Handshake>,
    // Queued frames between `Subscribe` and `Listen`. Declared before the
    // channel so the receiver is released first.
    frames: Option<Receiver<Bytes>>,
    channel: Option<BroadcastChannel>,
    listener: Option<JoinHandle<()>>,
    // Held by the listener while it acts on a frame; cleared on stop so no
    // reply can be posted after the leave frame.
    live: Arc<Mutex<bool>>,
}

impl BroadcastTransport {
    /// Create a transport on the process-wide medium.
    pub fn new(options: BroadcastOptions) -> Self {
        Self::with_medium(Medium::shared(), options)
    }

    /// Create a transport on a specific medium.
    pub fn with_medium(medium: Medium, options: BroadcastOptions) -> Self {
        Self {
            options,
            medium,
            events: Arc::new(EventBus::default()),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// The channel this transport joins.
    pub fn channel_name(&self) -> &str {
        &self.options.channel_name
    }

    /// The local peer id, once connected.
    pub fn peer_id(&self) -> Option<PeerId> {
        self.inner
            .lock()
            .handshake
            .as_ref()
            .map(|handshake| handshake.peer_id().clone())
    }

    /// Drive the state machine from `event`, executing actions in order.
    fn step(
        &self,
        inner: &mut Inner,
        event: Event,
        runtime: Option<&Handle>,
    ) -> Result<(), TransportError> {
        let mut pending = VecDeque::from([event]);

        while let Some(event) = pending.pop_front() {
            let (state, actions) = inner.state.on_event(event);
            inner.state = state;

            for action in actions {
                if let Some(next) = self.execute(inner, action, runtime)? {
                    pending.push_back(next);
                }
            }
        }

        Ok(())
    }

    fn execute(
        &self,
        inner: &mut Inner,
        action: Action,
        runtime: Option<&Handle>,
    ) -> Result<Option<Event>, TransportError> {
        match action {
            Action::OpenChannel => {
                inner.channel = Some(
                    self.medium
                        .open(&self.options.channel_name, self.options.capacity),
                );
                return Ok(Some(Event::ChannelOpened));
            }
            Action::Subscribe => {
                let channel = inner.channel.as_ref().ok_or(TransportError::NotConnected)?;
                inner.frames = Some(channel.listen());
            }
            Action::Listen => {
                let (Some(channel), Some(handshake), Some(frames)) =
                    (&inner.channel, &inner.handshake, inner.frames.take())
                else {
                    return Err(TransportError::NotConnected);
                };
                let runtime = runtime.ok_or(TransportError::NoRuntime)?;
                *inner.live.lock() = true;
                let listener = Listener {
                    frames,
                    handshake: handshake.clone(),
                    channel: channel.clone(),
                    events: Arc::clone(&self.events),
                    live: Arc::clone(&inner.live),
                };
                inner.listener = Some(runtime.spawn(listener.run()));
            }
            Action::AnnounceArrival => {
                if let (Some(channel), Some(handshake)) = (&inner.channel, &inner.handshake) {
                    let reached = channel.post(handshake.arrival().encode()?);
                    debug!(peer = %handshake.peer_id(), reached, "posted arrive");
                }
            }
            Action::EmitReady => {
                self.events.emit(TransportEvent::Ready {
                    channel: self.options.channel_name.clone(),
                });
            }
            Action::StopListening => {
                *inner.live.lock() = false;
                inner.frames = None;
                if let Some(listener) = inner.listener.take() {
                    listener.abort();
                }
            }
            Action::AnnounceLeave => {
                if let (Some(channel), Some(handshake)) = (inner.channel.take(), &inner.handshake)
                {
                    let reached = channel.post(handshake.departure().encode()?);
                    debug!(peer = %handshake.peer_id(), reached, "posted leave");
                }
            }
            Action::EmitClose => {
                self.events.close_with(TransportEvent::Close);
            }
        }
        Ok(None)
    }
}

impl Transport for BroadcastTransport {
    fn connect(&self, peer_id: PeerId, peer_metadata: PeerMetadata) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        match inner.state {
            TransportState::Unconnected => {}
            TransportState::Closed => return Err(TransportError::Closed),
            TransportState::Connecting | TransportState::Ready => {
                return Err(TransportError::AlreadyConnected)
            }
        }

        let runtime = Handle::try_current().map_err(|_| TransportError::NoRuntime)?;

        info!(peer = %peer_id, channel = %self.options.channel_name, "connecting");
        inner.handshake = Some(Handshake::new(peer_id, peer_metadata));
        self.step(&mut inner, Event::ConnectRequested, Some(&runtime))
    }

    fn send(&self, message: Message) -> Result<(), TransportError> {
        let inner = self.inner.lock();
        let channel = match (inner.state, &inner.channel) {
            (TransportState::Ready, Some(channel)) => channel,
            (TransportState::Closed, _) => return Err(TransportError::Closed),
            _ => return Err(TransportError::NotConnected),
        };

        let frame = Frame::from_message(&message);
        let kind = frame.kind();
        let reached = channel.post(frame.encode()?);
        debug!(kind, to = ?message.target_id, reached, "posted message");
        Ok(())
    }

    fn disconnect(&self) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        match inner.state {
            TransportState::Unconnected => return Err(TransportError::NotConnected),
            TransportState::Closed => return Err(TransportError::Closed),
            TransportState::Connecting | TransportState::Ready => {}
        }

        info!(channel = %self.options.channel_name, "disconnecting");
        self.step(&mut inner, Event::DisconnectRequested, None)
    }

    fn subscribe(&self) -> Receiver<TransportEvent> {
        self.events.subscribe()
    }

    fn is_ready(&self) -> bool {
        self.inner.lock().state.is_ready()
    }
}

impl Drop for BroadcastTransport {
    fn drop(&mut self) {
        if let Some(listener) = self.inner.get_mut().listener.take() {
            listener.abort();
        }
    }
}

/// The per-transport channel listener task.
///
/// Owns its own [`Handshake`], so the set of announced peers lives and dies
/// with the task.
struct Listener {
    frames: Receiver<Bytes>,
    handshake: Handshake,
    channel: BroadcastChannel,
    events: Arc<EventBus<TransportEvent>>,
    live: Arc<Mutex<bool>>,
}

impl Listener {
    async fn run(mut self) {
        loop {
            let received = self.frames.recv().await;
            match received {
                Ok(bytes) => self.on_bytes(&bytes),
                Err(RecvError::Lagged(missed)) => {
                    warn!(
                        peer = %self.handshake.peer_id(),
                        missed,
                        "listener lagged, frames dropped"
                    );
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    fn on_bytes(&mut self, bytes: &[u8]) {
        let frame = match Frame::decode(bytes) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(peer = %self.handshake.peer_id(), error = %e, "dropping malformed frame");
                return;
            }
        };

        let live = self.live.lock();
        if !*live {
            return;
        }

        for dispatch in self.handshake.on_frame(frame) {
            match dispatch {
                Dispatch::Post(reply) => match reply.encode() {
                    Ok(bytes) => {
                        debug!(kind = reply.kind(), to = ?reply.target_id(), "posting reply");
                        self.channel.post(bytes);
                    }
                    Err(e) => warn!(error = %e, "failed to encode reply"),
                },
                Dispatch::PeerCandidate {
                    peer_id,
                    peer_metadata,
                } => {
                    debug!(peer = %peer_id, "peer candidate");
                    self.events.emit(TransportEvent::PeerCandidate {
                        peer_id,
                        peer_metadata,
                    });
                }
                Dispatch::PeerDisconnected { peer_id } => {
                    debug!(peer = %peer_id, "peer left");
                    self.events
                        .emit(TransportEvent::PeerDisconnected { peer_id });
                }
                Dispatch::Deliver(message) => {
                    self.events.emit(TransportEvent::Message(message));
                }
            }
        }
    }
}
