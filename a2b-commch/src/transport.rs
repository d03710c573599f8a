//! Transport plumbing shared by the slave and master adapters
//!
//! A transport glues the engines to a mailbox writer, a clock and the application handler.
//! The adapters differ only in how frames reach the bus and how acknowledgments come back.

use crate::core::NodeAddr;
use crate::engine::{EncodeError, Storage, TxStatus};
use crate::event::{Event, EventKind, Handler};
use crate::format::Frame;
use crate::message::Message;
use crate::time::{Duration, Instant};

/// Error returned by transport operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// The operation is not possible in the current state, e.g., a message is already in flight
    Failed,
    /// The message does not fit the transmit buffer
    ExceededCapacity,
    /// A frame or a status register could not be written
    MailboxWrite,
    /// A mailbox could not be read
    MailboxRead,
}

impl From<EncodeError> for TransportError {
    fn from(value: EncodeError) -> Self {
        match value {
            EncodeError::ExceededCapacity => TransportError::ExceededCapacity,
            EncodeError::Failed => TransportError::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MailboxWriteError {
    /// The bus transaction or request submission failed
    Bus,
    /// The request queue has no room left
    QueueFull,
    /// The writer cannot reach the destination node
    InvalidDestination,
}

/// Frame sink of a transport
///
/// Implementations must not block. A successful return means the frame was handed over, not
/// that the peer consumed it; consumption is reported separately as an acknowledgment.
pub trait MailboxWriter {
    fn write_frame(
        &mut self,
        frame: &Frame,
        destination: NodeAddr,
    ) -> Result<(), MailboxWriteError>;
}

/// Transport counters
///
/// Counters saturate instead of wrapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Statistics {
    pub frames_sent: u32,
    pub frames_received: u32,
    pub messages_sent: u32,
    pub messages_received: u32,
    /// Sequence errors, invalid frames and oversized messages
    pub rx_errors: u32,
    pub tx_timeouts: u32,
    /// Failed mailbox reads and writes. Unreachable destinations are not counted.
    pub io_failures: u32,
}

fn increment(counter: &mut u32) {
    *counter = counter.saturating_add(1);
}

/// Engine driver state of one adapter
pub(crate) struct Session<'a, H: Handler> {
    storage: &'a mut Storage,
    handler: H,
    frame_timeout: Duration,
    last_write: Instant,
    tx_ack: bool,
    stats: Statistics,
}

impl<'a, H: Handler> Session<'a, H> {
    pub fn new(storage: &'a mut Storage, handler: H, frame_timeout: Duration) -> Self {
        storage.reset();
        Self {
            storage,
            handler,
            frame_timeout,
            last_write: Instant::from_ticks(0),
            tx_ack: false,
            stats: Statistics::default(),
        }
    }

    pub fn storage(&self) -> &Storage {
        &*self.storage
    }

    pub fn statistics(&self) -> Statistics {
        self.stats
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Loads a message and writes its first frame.
    ///
    /// Failures are reported through the return value only.
    pub fn start<W: MailboxWriter>(
        &mut self,
        writer: &mut W,
        message: Message<'_>,
        destination: NodeAddr,
        now: Instant,
    ) -> Result<(), TransportError> {
        let tx = &mut self.storage.tx;
        if tx.status() == TxStatus::Busy {
            debug!("Reject message id={:?}, transmitter busy", message.id);
            return Err(TransportError::Failed);
        }
        tx.load(message, destination)?;

        let frame = match tx.encode_next_frame() {
            Ok(frame) => frame,
            Err(err) => {
                warn!("Cannot encode message id={:?}: {:?}", message.id, err);
                tx.reset();
                return Err(err.into());
            }
        };

        if let Err(err) = writer.write_frame(&frame, destination) {
            warn!("Mailbox write to {:?} failed: {:?}", destination, err);
            tx.reset();
            if err != MailboxWriteError::InvalidDestination {
                increment(&mut self.stats.io_failures);
            }
            return Err(TransportError::MailboxWrite);
        }

        debug!(
            "Start message id={:?} length={} to {:?}",
            message.id,
            message.len(),
            destination
        );
        increment(&mut self.stats.frames_sent);
        self.last_write = now;
        self.tx_ack = false;
        Ok(())
    }

    /// Marks the last written frame as consumed by the peer.
    pub fn acknowledge(&mut self) {
        if self.storage.tx.status() == TxStatus::Busy {
            self.tx_ack = true;
        } else {
            trace!("Ignore acknowledgment, transmitter idle");
        }
    }

    /// Writes the next frame or completes the message once the last frame is acknowledged.
    pub fn advance<W: MailboxWriter>(
        &mut self,
        writer: &mut W,
        now: Instant,
    ) -> Result<(), TransportError> {
        if self.storage.tx.status() != TxStatus::Busy || !self.tx_ack {
            return Ok(());
        }
        self.tx_ack = false;

        if self.storage.tx.is_complete() {
            increment(&mut self.stats.messages_sent);
            self.finish(EventKind::TxDone);
            return Ok(());
        }

        let Some(destination) = self.storage.tx.destination() else {
            return Ok(());
        };
        let written = self
            .storage
            .tx
            .encode_next_frame()
            .map_err(|_| MailboxWriteError::Bus)
            .and_then(|frame| writer.write_frame(&frame, destination));

        match written {
            Ok(()) => {
                increment(&mut self.stats.frames_sent);
                self.last_write = now;
                Ok(())
            }
            Err(err) => {
                warn!("Mailbox write to {:?} failed: {:?}", destination, err);
                self.fail();
                Err(TransportError::MailboxWrite)
            }
        }
    }

    /// Fires the timeout transition if the last frame stayed unacknowledged for too long.
    pub fn check_timeout(&mut self, now: Instant) {
        if self.storage.tx.status() != TxStatus::Busy || self.tx_ack {
            return;
        }
        if now.saturating_duration_since(self.last_write) > self.frame_timeout {
            self.expire();
        }
    }

    /// Aborts the message in flight with a timeout.
    pub fn expire(&mut self) {
        if self.storage.tx.status() != TxStatus::Busy {
            return;
        }
        warn!(
            "Frame timeout, message to {:?} dropped at {} bytes",
            self.storage.tx.destination(),
            self.storage.tx.cursor()
        );
        increment(&mut self.stats.tx_timeouts);
        self.finish(EventKind::TxTimeout);
    }

    /// Aborts the message in flight with a failure.
    pub fn fail(&mut self) {
        if self.storage.tx.status() != TxStatus::Busy {
            return;
        }
        increment(&mut self.stats.io_failures);
        self.finish(EventKind::Failure);
    }

    fn finish(&mut self, kind: EventKind) {
        let tx = &self.storage.tx;
        if let Some(destination) = tx.destination() {
            self.handler
                .on_event(Event::new(kind, destination, tx.message()));
        }
        self.storage.tx.reset();
        self.tx_ack = false;
    }

    /// Feeds a frame received from `node` to the receiver.
    pub fn receive(&mut self, frame: Frame, node: NodeAddr) {
        increment(&mut self.stats.frames_received);
        let Some(event) = self.storage.rx.decode_frame(frame, node) else {
            return;
        };
        if event.kind == EventKind::RxMsg {
            increment(&mut self.stats.messages_received);
        } else {
            increment(&mut self.stats.rx_errors);
        }
        self.handler.on_event(event);
    }

    pub fn note_io_failure(&mut self) {
        increment(&mut self.stats.io_failures);
    }

    /// Drops both directions, failing a message in flight.
    pub fn shutdown(&mut self) {
        self.fail();
        self.storage.reset();
        self.tx_ack = false;
    }
}
