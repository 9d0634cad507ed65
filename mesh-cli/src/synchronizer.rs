//! A synchronizer that holds no documents.

use std::sync::Arc;

use mesh_network::{EventBus, Synchronizer, SynchronizerEvent};
use mesh_types::{Message, MessageBody, MessageContents};
use tokio::sync::broadcast::Receiver;
use tracing::debug;

/// Answers every request with `doc-unavailable` and ignores everything
/// else.
#[derive(Debug, Clone, Default)]
pub struct NullSynchronizer {
    events: Arc<EventBus<SynchronizerEvent>>,
}

impl NullSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Synchronizer for NullSynchronizer {
    fn receive_message(&mut self, message: Message) {
        match message.body {
            MessageBody::Request { document_id, .. } => {
                debug!(from = %message.sender_id, document = %document_id, "no such document");
                self.events.emit(SynchronizerEvent::Message(MessageContents {
                    target_id: Some(message.sender_id),
                    body: MessageBody::DocUnavailable { document_id },
                }));
            }
            body => debug!(from = %message.sender_id, kind = body.kind(), "ignored"),
        }
    }

    fn subscribe(&self) -> Receiver<SynchronizerEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use mesh_types::{DocumentId, PeerId};

    #[test]
    fn request_is_answered_with_doc_unavailable() {
        let mut synchronizer = NullSynchronizer::new();
        let mut events = synchronizer.subscribe();
        let document_id = DocumentId::new();

        synchronizer.receive_message(Message::broadcast(
            PeerId::new("asker"),
            MessageBody::Request {
                document_id,
                data: Bytes::new(),
            },
        ));

        assert_eq!(
            events.try_recv().unwrap(),
            SynchronizerEvent::Message(MessageContents {
                target_id: Some(PeerId::new("asker")),
                body: MessageBody::DocUnavailable { document_id },
            })
        );
    }

    #[test]
    fn other_messages_are_ignored() {
        let mut synchronizer = NullSynchronizer::new();
        let mut events = synchronizer.subscribe();

        synchronizer.receive_message(Message::broadcast(
            PeerId::new("b"),
            MessageBody::Sync {
                document_id: DocumentId::new(),
                data: Bytes::from_static(b"x"),
            },
        ));

        assert!(events.try_recv().is_err());
    }
}
