//! Transport status events

use crate::core::NodeAddr;
use crate::message::Message;

/// Outcome reported through the status callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventKind {
    /// A complete message was received
    RxMsg,
    /// A consecutive frame carried an unexpected sequence number; the partial message is dropped
    RxSnError,
    /// A peer announced a message longer than the receive buffer
    RxExceededCapacity,
    /// A frame arrived that the receiver state does not accept
    RxInvalidFrame,
    /// The last frame of a message was acknowledged by the peer
    TxDone,
    /// The peer did not acknowledge a frame in time
    TxTimeout,
    /// The transport failed to write a frame
    Failure,
}

impl EventKind {
    pub fn is_error(self) -> bool {
        !matches!(self, EventKind::RxMsg | EventKind::TxDone)
    }

    pub fn is_rx(self) -> bool {
        matches!(
            self,
            EventKind::RxMsg
                | EventKind::RxSnError
                | EventKind::RxExceededCapacity
                | EventKind::RxInvalidFrame
        )
    }
}

/// Status event
///
/// `node` is the source node of received messages and the destination node of transmitted ones.
/// `message` is the received message for `RxMsg`, the transmitted message for Tx outcomes and
/// `None` for receive errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Event<'a> {
    pub kind: EventKind,
    pub node: NodeAddr,
    pub message: Option<Message<'a>>,
}

impl<'a> Event<'a> {
    pub fn new(kind: EventKind, node: NodeAddr, message: Option<Message<'a>>) -> Self {
        Self {
            kind,
            node,
            message,
        }
    }
}

/// Application status callback
///
/// Called from `tick` and from notification delivery, so it must not block.
/// Implemented for every `FnMut(Event)` closure; the closure captures whatever context the
/// application needs.
pub trait Handler {
    fn on_event(&mut self, event: Event<'_>);
}

impl<F> Handler for F
where
    F: FnMut(Event<'_>),
{
    fn on_event(&mut self, event: Event<'_>) {
        (*self)(event)
    }
}
