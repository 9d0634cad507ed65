//! Wires one transport to one synchronizer.
//!
//! Inbound transport messages go to [`Synchronizer::receive_message`];
//! outbound synchronizer messages are stamped with the local peer id and
//! handed to [`Transport::send`]. The loop ends when the transport closes.

use std::sync::Arc;

use mesh_types::PeerId;
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use crate::synchronizer::{Synchronizer, SynchronizerEvent};
use crate::transport::{Transport, TransportError, TransportEvent};

/// A running transport/synchronizer pairing.
#[derive(Debug)]
pub struct Bridge {
    task: JoinHandle<()>,
}

impl Bridge {
    /// Start forwarding between `transport` and `synchronizer`.
    ///
    /// Both event streams are subscribed before this returns, so connect the
    /// transport afterwards to have the bridge see every event.
    pub fn spawn<S>(
        local_id: PeerId,
        transport: Arc<dyn Transport>,
        mut synchronizer: S,
    ) -> Result<Self, TransportError>
    where
        S: Synchronizer + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| TransportError::NoRuntime)?;
        let mut transport_events = transport.subscribe();
        let mut sync_events = synchronizer.subscribe();

        let task = runtime.spawn(async move {
            loop {
                tokio::select! {
                    event = transport_events.recv() => match event {
                        Ok(TransportEvent::Message(message)) => {
                            debug!(
                                from = %message.sender_id,
                                kind = message.body.kind(),
                                "forwarding to synchronizer"
                            );
                            synchronizer.receive_message(message);
                        }
                        Ok(TransportEvent::Close) | Err(RecvError::Closed) => break,
                        Ok(other) => debug!(event = ?other, "transport event"),
                        Err(RecvError::Lagged(missed)) => {
                            warn!(missed, "bridge lagged behind transport events");
                        }
                    },
                    event = sync_events.recv() => match event {
                        Ok(SynchronizerEvent::Message(contents)) => {
                            let message = contents.into_message(local_id.clone());
                            if let Err(e) = transport.send(message) {
                                warn!(error = %e, "failed to send synchronizer message");
                            }
                        }
                        Ok(SynchronizerEvent::SyncState { peer_id, state }) => {
                            debug!(
                                peer = %peer_id,
                                document = %state.document_id,
                                heads = state.heads.len(),
                                "sync state"
                            );
                        }
                        Err(RecvError::Lagged(missed)) => {
                            warn!(missed, "bridge lagged behind synchronizer events");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            info!(peer = %local_id, "bridge stopped");
        });

        Ok(Self { task })
    }

    /// Whether the forwarding loop has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the forwarding loop to end on its own.
    ///
    /// Fails if the loop panicked (for instance inside the synchronizer) or
    /// was aborted.
    pub async fn wait(self) -> Result<(), JoinError> {
        self.task.await.inspect_err(|e| warn!(error = %e, "bridge task failed"))
    }

    /// Stop forwarding immediately.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::synchronizer::MockSynchronizer;
    use crate::transport::MockTransport;
    use mesh_types::{DocumentId, Message, MessageBody, MessageContents, PeerMetadata};
    use std::time::Duration;
    use tokio::sync::broadcast::Receiver;
    use tokio::time::{sleep, timeout};

    #[derive(Default)]
    struct FailingSynchronizer {
        events: EventBus<SynchronizerEvent>,
    }

    impl Synchronizer for FailingSynchronizer {
        fn receive_message(&mut self, message: Message) {
            panic!("cannot handle {}", message.body.kind());
        }

        fn subscribe(&self) -> Receiver<SynchronizerEvent> {
            self.events.subscribe()
        }
    }

    fn doc_unavailable(target: Option<&str>) -> MessageContents {
        MessageContents {
            target_id: target.map(PeerId::new),
            body: MessageBody::DocUnavailable {
                document_id: DocumentId::new(),
            },
        }
    }

    async fn settle() {
        sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn inbound_messages_reach_synchronizer() {
        let transport = MockTransport::new();
        let synchronizer = MockSynchronizer::new();
        let _bridge = Bridge::spawn(
            PeerId::new("a"),
            Arc::new(transport.clone()),
            synchronizer.clone(),
        )
        .unwrap();

        let message = doc_unavailable(Some("a")).into_message(PeerId::new("b"));
        transport.inject(TransportEvent::Message(message.clone()));
        settle().await;

        assert_eq!(synchronizer.received(), vec![message]);
    }

    #[tokio::test]
    async fn outbound_messages_are_stamped_and_sent() {
        let transport = MockTransport::new();
        transport
            .connect(PeerId::new("a"), PeerMetadata::new())
            .unwrap();
        let synchronizer = MockSynchronizer::new();
        let _bridge = Bridge::spawn(
            PeerId::new("a"),
            Arc::new(transport.clone()),
            synchronizer.clone(),
        )
        .unwrap();

        let contents = doc_unavailable(Some("b"));
        synchronizer.emit_message(contents.clone());
        settle().await;

        let expected: Message = contents.into_message(PeerId::new("a"));
        assert_eq!(transport.sent_messages(), vec![expected]);
    }

    #[tokio::test]
    async fn send_failure_does_not_stop_bridge() {
        let transport = MockTransport::new();
        let synchronizer = MockSynchronizer::new();
        let bridge = Bridge::spawn(
            PeerId::new("a"),
            Arc::new(transport.clone()),
            synchronizer.clone(),
        )
        .unwrap();

        // Not connected: send fails, the bridge logs and carries on.
        synchronizer.emit_message(doc_unavailable(None));
        settle().await;

        assert!(!bridge.is_finished());
        assert!(transport.sent_messages().is_empty());
        bridge.shutdown();
    }

    #[tokio::test]
    async fn bridge_ends_on_transport_close() {
        let transport = MockTransport::new();
        transport
            .connect(PeerId::new("a"), PeerMetadata::new())
            .unwrap();
        let bridge = Bridge::spawn(
            PeerId::new("a"),
            Arc::new(transport.clone()),
            MockSynchronizer::new(),
        )
        .unwrap();

        transport.disconnect().unwrap();

        timeout(Duration::from_secs(2), bridge.wait())
            .await
            .expect("bridge did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn synchronizer_panic_is_reported_by_wait() {
        let transport = MockTransport::new();
        let bridge = Bridge::spawn(
            PeerId::new("a"),
            Arc::new(transport.clone()),
            FailingSynchronizer::default(),
        )
        .unwrap();

        let message = doc_unavailable(Some("a")).into_message(PeerId::new("b"));
        transport.inject(TransportEvent::Message(message));

        let err = timeout(Duration::from_secs(2), bridge.wait())
            .await
            .expect("bridge did not stop")
            .unwrap_err();
        assert!(err.is_panic());
    }

    #[tokio::test]
    async fn shutdown_bridge_reports_cancellation() {
        let bridge = Bridge::spawn(
            PeerId::new("a"),
            Arc::new(MockTransport::new()),
            MockSynchronizer::new(),
        )
        .unwrap();
        bridge.task.abort();

        let err = bridge.wait().await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn spawn_without_runtime_fails() {
        let result = Bridge::spawn(
            PeerId::new("a"),
            Arc::new(MockTransport::new()),
            MockSynchronizer::new(),
        );
        assert!(matches!(result, Err(TransportError::NoRuntime)));
    }
}
