//! Slave node transport
//!
//! A slave processor reaches the bus through the I2C port of its local transceiver. It learns
//! about mailbox traffic by polling the mailbox status registers from `tick`.

use embedded_hal::i2c::I2c;

use crate::config::SlaveConfig;
use crate::core::{MailboxId, NodeAddr};
use crate::engine::{RxStatus, Storage, TxStatus};
use crate::event::Handler;
use crate::format::Frame;
use crate::message::Message;
use crate::payload::{PAYLOAD_LENGTH, Payload};
use crate::registers::{MailboxRegisters, MailboxStatus};
use crate::time::{Clock, Instant};
use crate::transport::{MailboxWriteError, MailboxWriter, Session, Statistics, TransportError};

/// Transport of a slave node
///
/// Messages are exchanged with the master only. Call `tick` periodically, at least as often
/// as `SlaveConfig::poll_interval`.
pub struct SlaveTransport<'a, I: I2c, C: Clock, H: Handler> {
    i2c: I,
    clock: C,
    config: SlaveConfig,
    next_poll: Instant,
    session: Session<'a, H>,
}

impl<'a, I: I2c, C: Clock, H: Handler> SlaveTransport<'a, I, C, H> {
    pub fn new(
        i2c: I,
        clock: C,
        handler: H,
        storage: &'a mut Storage,
        config: SlaveConfig,
    ) -> Self {
        let next_poll = clock.now();
        Self {
            i2c,
            clock,
            config,
            next_poll,
            session: Session::new(storage, handler, config.frame_timeout),
        }
    }

    /// Starts transmission of a message.
    ///
    /// The payload is copied, so `message` may be dropped on return. `destination` must be
    /// `NodeAddr::MASTER`.
    pub fn tx_msg(
        &mut self,
        message: Message<'_>,
        destination: NodeAddr,
    ) -> Result<(), TransportError> {
        let now = self.clock.now();
        let mut writer = I2cMailboxWriter {
            i2c: &mut self.i2c,
            address: self.config.local_address,
            mailbox: self.config.tx_mailbox,
        };
        self.session.start(&mut writer, message, destination, now)
    }

    /// Polls the mailboxes if due and advances transmission.
    ///
    /// Events are delivered to the handler from within this call. A failed poll is returned
    /// after the frame timeout has been checked, so a message in flight still times out while
    /// the bus is down.
    pub fn tick(&mut self) -> Result<(), TransportError> {
        let now = self.clock.now();
        if now >= self.next_poll {
            self.next_poll = now + self.config.poll_interval;
            if let Err(err) = self.poll_mailboxes() {
                self.session.note_io_failure();
                self.session.check_timeout(now);
                return Err(err);
            }
        }

        let mut writer = I2cMailboxWriter {
            i2c: &mut self.i2c,
            address: self.config.local_address,
            mailbox: self.config.tx_mailbox,
        };
        self.session.advance(&mut writer, now)?;
        self.session.check_timeout(now);
        Ok(())
    }

    fn poll_mailboxes(&mut self) -> Result<(), TransportError> {
        let rx = MailboxRegisters::of(self.config.rx_mailbox);
        let status = self.read_status(rx)?;
        if status.full_irq() {
            let mut bytes = [0; PAYLOAD_LENGTH];
            self.i2c
                .write_read(self.config.local_address, &[rx.data], &mut bytes)
                .map_err(|_| {
                    warn!("Mailbox {:?} data read failed", self.config.rx_mailbox);
                    TransportError::MailboxRead
                })?;
            self.clear_irq(rx, MailboxStatus::CLEAR_FULL_IRQ)?;
            trace!("Mailbox {:?} frame {:?}", self.config.rx_mailbox, bytes);
            self.session
                .receive(Frame::from(Payload::new(bytes)), NodeAddr::MASTER);
        }

        let tx = MailboxRegisters::of(self.config.tx_mailbox);
        let status = self.read_status(tx)?;
        if status.empty_irq() {
            self.clear_irq(tx, MailboxStatus::CLEAR_EMPTY_IRQ)?;
            self.session.acknowledge();
        }
        Ok(())
    }

    fn read_status(&mut self, mailbox: MailboxRegisters) -> Result<MailboxStatus, TransportError> {
        let mut status = [0];
        self.i2c
            .write_read(self.config.local_address, &[mailbox.status], &mut status)
            .map_err(|_| {
                warn!("Status register {} read failed", mailbox.status);
                TransportError::MailboxRead
            })?;
        Ok(MailboxStatus::from_bits(status[0]))
    }

    fn clear_irq(&mut self, mailbox: MailboxRegisters, bits: u8) -> Result<(), TransportError> {
        self.i2c
            .write(self.config.local_address, &[mailbox.status, bits])
            .map_err(|_| {
                warn!("Status register {} write failed", mailbox.status);
                TransportError::MailboxWrite
            })
    }

    pub fn tx_status(&self) -> TxStatus {
        self.session.storage().tx.status()
    }

    pub fn rx_status(&self) -> RxStatus {
        self.session.storage().rx.status()
    }

    pub fn statistics(&self) -> Statistics {
        self.session.statistics()
    }

    pub fn config(&self) -> &SlaveConfig {
        &self.config
    }

    pub fn handler(&self) -> &H {
        self.session.handler()
    }

    pub fn handler_mut(&mut self) -> &mut H {
        self.session.handler_mut()
    }

    /// Releases the I2C bus and the handler. A message in flight fails.
    pub fn release(mut self) -> (I, H) {
        self.session.shutdown();
        (self.i2c, self.session.into_handler())
    }
}

struct I2cMailboxWriter<'i, I: I2c> {
    i2c: &'i mut I,
    address: u8,
    mailbox: MailboxId,
}

impl<I: I2c> MailboxWriter for I2cMailboxWriter<'_, I> {
    fn write_frame(
        &mut self,
        frame: &Frame,
        destination: NodeAddr,
    ) -> Result<(), MailboxWriteError> {
        if !destination.is_master() {
            warn!("Slave cannot reach {:?}", destination);
            return Err(MailboxWriteError::InvalidDestination);
        }

        let registers = MailboxRegisters::of(self.mailbox);
        let mut buffer = [0; PAYLOAD_LENGTH + 1];
        buffer[0] = registers.data;
        buffer[1..].copy_from_slice(frame);
        trace!("Mailbox {:?} write {:?}", self.mailbox, buffer);
        self.i2c
            .write(self.address, &buffer)
            .map_err(|_| MailboxWriteError::Bus)
    }
}
