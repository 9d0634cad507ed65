//! Run several peers in one process and show what each one observes.

use anyhow::{ensure, Context, Result};
use bytes::Bytes;
use mesh_network::{Bridge, BroadcastTransport, Config, Transport, TransportEvent};
use mesh_types::{DocumentId, Message, MessageBody, PeerId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{error::TryRecvError, Receiver};
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use crate::synchronizer::NullSynchronizer;

/// Demo parameters.
#[derive(Debug, Clone)]
pub struct DemoOptions {
    /// Number of peers to start.
    pub peers: usize,
    /// Channel and peer settings shared by every peer.
    pub config: Config,
    /// Payload each peer sends to every candidate.
    pub payload: String,
    /// How long to let the medium settle between phases.
    pub settle: Duration,
}

/// What one peer observed during the demo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerReport {
    pub peer_id: PeerId,
    pub candidates: Vec<PeerId>,
    pub received: Vec<Message>,
    pub departed: Vec<PeerId>,
}

struct DemoPeer {
    report: PeerReport,
    transport: Arc<BroadcastTransport>,
    events: Receiver<TransportEvent>,
    bridge: Bridge,
}

impl DemoPeer {
    fn absorb(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(TransportEvent::PeerCandidate { peer_id, .. }) => {
                    self.report.candidates.push(peer_id)
                }
                Ok(TransportEvent::PeerDisconnected { peer_id }) => {
                    self.report.departed.push(peer_id)
                }
                Ok(TransportEvent::Message(message)) => self.report.received.push(message),
                Ok(TransportEvent::Ready { .. } | TransportEvent::Close) => {}
                Err(TryRecvError::Lagged(missed)) => {
                    warn!(peer = %self.report.peer_id, missed, "demo missed events")
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }
}

/// Run the demo command.
pub async fn run(options: DemoOptions) -> Result<()> {
    let channel = options.config.channel.channel_name.clone();
    let reports = run_demo(options).await?;

    println!("=== docmesh demo ===");
    println!();
    println!("Channel: {}", channel);
    println!("Peers:   {}", reports.len());

    for report in &reports {
        println!();
        println!("{}", report.peer_id);
        println!(
            "  candidates: {} ({})",
            report.candidates.len(),
            join_ids(&report.candidates)
        );
        println!("  received:   {}", report.received.len());
        for message in &report.received {
            println!("    {}", describe(message));
        }
        println!(
            "  departed:   {} ({})",
            report.departed.len(),
            join_ids(&report.departed)
        );
    }

    Ok(())
}

/// Start the peers, exchange messages, tear everything down.
///
/// Every peer sends `payload` in a `sync` message to each candidate it saw.
/// The first peer also broadcasts a `request`, which every other peer's
/// [`NullSynchronizer`] answers through its bridge.
pub async fn run_demo(options: DemoOptions) -> Result<Vec<PeerReport>> {
    ensure!(options.peers >= 2, "a demo needs at least two peers");

    let mut peers = Vec::with_capacity(options.peers);
    for index in 0..options.peers {
        let peer_id = match &options.config.peer.peer_id {
            Some(base) => PeerId::new(format!("{base}-{index}")),
            None => PeerId::random(),
        };
        let transport = Arc::new(BroadcastTransport::new(options.config.channel.clone()));
        let events = transport.subscribe();
        let bridge = Bridge::spawn(peer_id.clone(), transport.clone(), NullSynchronizer::new())
            .context("Failed to start bridge")?;

        transport
            .connect(peer_id.clone(), options.config.peer.metadata())
            .with_context(|| format!("Failed to connect {}", peer_id))?;
        info!(peer = %peer_id, "demo peer connected");

        peers.push(DemoPeer {
            report: PeerReport {
                peer_id,
                candidates: Vec::new(),
                received: Vec::new(),
                departed: Vec::new(),
            },
            transport,
            events,
            bridge,
        });
    }

    sleep(options.settle).await;
    peers.iter_mut().for_each(DemoPeer::absorb);

    let document_id = DocumentId::new();
    let payload = Bytes::from(options.payload.clone().into_bytes());
    for peer in &peers {
        for candidate in &peer.report.candidates {
            let message = Message::to_peer(
                peer.report.peer_id.clone(),
                candidate.clone(),
                MessageBody::Sync {
                    document_id,
                    data: payload.clone(),
                },
            );
            peer.transport.send(message).context("Failed to send sync")?;
        }
    }

    if let Some(first) = peers.first() {
        let request = Message::broadcast(
            first.report.peer_id.clone(),
            MessageBody::Request {
                document_id: DocumentId::new(),
                data: Bytes::new(),
            },
        );
        first.transport.send(request).context("Failed to send request")?;
    }

    sleep(options.settle).await;
    peers.iter_mut().for_each(DemoPeer::absorb);

    // One at a time, so the remaining peers observe each departure.
    for peer in &peers {
        peer.transport
            .disconnect()
            .with_context(|| format!("Failed to disconnect {}", peer.report.peer_id))?;
        sleep(options.settle).await;
    }

    let mut reports = Vec::with_capacity(peers.len());
    for mut peer in peers {
        peer.absorb();
        match timeout(options.settle, peer.bridge.wait()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(peer = %peer.report.peer_id, error = %e, "bridge failed"),
            Err(_) => warn!(peer = %peer.report.peer_id, "bridge did not stop after close"),
        }
        reports.push(peer.report);
    }

    Ok(reports)
}

fn join_ids(ids: &[PeerId]) -> String {
    ids.iter()
        .map(PeerId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe(message: &Message) -> String {
    match &message.body {
        MessageBody::Sync { data, .. } => format!(
            "sync from {} ({} bytes): {:?}",
            message.sender_id,
            data.len(),
            String::from_utf8_lossy(data)
        ),
        body => format!("{} from {}", body.kind(), message.sender_id),
    }
}
