//! Transport lifecycle state machine for docmesh.
//!
//! This module provides a pure, side-effect-free state machine for a
//! transport's lifecycle. The state machine takes events as input and
//! produces a new state plus a list of actions to execute.
//!
//! The actual I/O (opening channels, posting frames, emitting events) is
//! performed by mesh-network, not by this module.

/// Transport lifecycle - NO I/O, just state transitions.
///
/// ```text
/// Unconnected → Connecting → Ready → Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    /// `connect` has not been called.
    #[default]
    Unconnected,
    /// Channel is being opened.
    Connecting,
    /// Channel open, arrival announced, usable for `send`.
    Ready,
    /// Torn down; terminal.
    Closed,
}

impl TransportState {
    /// Create a new state machine in the Unconnected state.
    pub fn new() -> Self {
        Self::Unconnected
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller is responsible
    /// for executing the returned actions in order.
    pub fn on_event(self, event: Event) -> (Self, Vec<Action>) {
        match (self, event) {
            (Self::Unconnected, Event::ConnectRequested) => {
                (Self::Connecting, vec![Action::OpenChannel])
            }

            // Subscribed before announcing, so no welcome is missed. Ready is
            // emitted before the listener can emit anything else.
            (Self::Connecting, Event::ChannelOpened) => (
                Self::Ready,
                vec![
                    Action::Subscribe,
                    Action::EmitReady,
                    Action::Listen,
                    Action::AnnounceArrival,
                ],
            ),

            (Self::Ready, Event::DisconnectRequested) => (
                Self::Closed,
                vec![
                    Action::StopListening,
                    Action::AnnounceLeave,
                    Action::EmitClose,
                ],
            ),
            (Self::Connecting, Event::DisconnectRequested) => {
                (Self::Closed, vec![Action::EmitClose])
            }

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// Check if the transport can send.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Check if the transport has been torn down.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Events that drive the transport lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Caller invoked `connect`.
    ConnectRequested,
    /// The shared channel handle was obtained.
    ChannelOpened,
    /// Caller invoked `disconnect`.
    DisconnectRequested,
}

/// Actions to be executed by the transport.
///
/// These are instructions, not side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Open (or join) the named broadcast channel.
    OpenChannel,
    /// Register a receiver on the channel; frames queue until `Listen`.
    Subscribe,
    /// Start processing the frames queued since `Subscribe`.
    Listen,
    /// Post an `arrive` frame.
    AnnounceArrival,
    /// Emit the `ready` event.
    EmitReady,
    /// Post a `leave` frame and release the channel.
    AnnounceLeave,
    /// Stop the channel listener.
    StopListening,
    /// Emit the `close` event; nothing is emitted afterwards.
    EmitClose,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_unconnected() {
        let state = TransportState::new();
        assert_eq!(state, TransportState::Unconnected);
        assert!(!state.is_ready());
        assert!(!state.is_closed());
    }

    #[test]
    fn connect_opens_channel() {
        let (state, actions) = TransportState::new().on_event(Event::ConnectRequested);
        assert_eq!(state, TransportState::Connecting);
        assert_eq!(actions, vec![Action::OpenChannel]);
    }

    #[test]
    fn channel_opened_emits_ready_before_listening() {
        let (state, actions) = TransportState::Connecting.on_event(Event::ChannelOpened);
        assert!(state.is_ready());
        assert_eq!(
            actions,
            vec![
                Action::Subscribe,
                Action::EmitReady,
                Action::Listen,
                Action::AnnounceArrival
            ]
        );
    }

    #[test]
    fn disconnect_from_ready_leaves_and_closes() {
        let (state, actions) = TransportState::Ready.on_event(Event::DisconnectRequested);
        assert!(state.is_closed());
        assert_eq!(
            actions,
            vec![
                Action::StopListening,
                Action::AnnounceLeave,
                Action::EmitClose
            ]
        );
    }

    #[test]
    fn disconnect_while_connecting_only_closes() {
        let (state, actions) = TransportState::Connecting.on_event(Event::DisconnectRequested);
        assert!(state.is_closed());
        assert_eq!(actions, vec![Action::EmitClose]);
    }

    #[test]
    fn second_connect_is_ignored() {
        let (state, actions) = TransportState::Ready.on_event(Event::ConnectRequested);
        assert_eq!(state, TransportState::Ready);
        assert!(actions.is_empty());
    }

    #[test]
    fn closed_is_terminal() {
        for event in [
            Event::ConnectRequested,
            Event::ChannelOpened,
            Event::DisconnectRequested,
        ] {
            let (state, actions) = TransportState::Closed.on_event(event);
            assert_eq!(state, TransportState::Closed);
            assert!(actions.is_empty());
        }
    }

    #[test]
    fn disconnect_before_connect_is_ignored() {
        let (state, actions) = TransportState::Unconnected.on_event(Event::DisconnectRequested);
        assert_eq!(state, TransportState::Unconnected);
        assert!(actions.is_empty());
    }
}
