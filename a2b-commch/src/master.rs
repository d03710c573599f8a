//! Master node transport
//!
//! The master does not touch the bus directly. Frames go out as mailbox write requests through
//! the message router, and mailbox activity comes back as router notifications that the
//! application forwards to `on_notification`.

use crate::config::MasterConfig;
use crate::core::{MailboxId, NodeAddr};
use crate::engine::{RxStatus, Storage, TxStatus};
use crate::event::Handler;
use crate::format::Frame;
use crate::message::Message;
use crate::router::{
    MailboxEvent, MailboxRequest, Notification, NotificationKind, Router, SubscriptionId,
};
use crate::time::Clock;
use crate::transport::{MailboxWriteError, MailboxWriter, Session, Statistics, TransportError};

/// Transport of the master node
///
/// The transport is created closed. `open` subscribes to mailbox notifications; `close`, or
/// dropping the transport, removes the subscription again.
pub struct MasterTransport<'a, R: Router, C: Clock, H: Handler> {
    router: R,
    clock: C,
    config: MasterConfig,
    subscription: Option<SubscriptionId>,
    session: Session<'a, H>,
}

impl<'a, R: Router, C: Clock, H: Handler> MasterTransport<'a, R, C, H> {
    pub fn new(
        router: R,
        clock: C,
        handler: H,
        storage: &'a mut Storage,
        config: MasterConfig,
    ) -> Self {
        Self {
            router,
            clock,
            config,
            subscription: None,
            session: Session::new(storage, handler, config.frame_timeout),
        }
    }

    /// Subscribes to mailbox notifications. Opening an open transport does nothing.
    pub fn open(&mut self) -> Result<(), TransportError> {
        if self.subscription.is_some() {
            return Ok(());
        }
        let id = match self.router.subscribe(NotificationKind::Mailbox) {
            Ok(id) => id,
            Err(err) => {
                warn!("Mailbox subscription failed: {:?}", err);
                return Err(TransportError::Failed);
            }
        };
        debug!("Open master transport, subscription {:?}", id);
        self.subscription = Some(id);
        Ok(())
    }

    /// Unsubscribes and drops both directions. A message in flight fails.
    pub fn close(&mut self) {
        if let Some(id) = self.subscription.take() {
            debug!("Close master transport, subscription {:?}", id);
            self.router.unsubscribe(id);
            self.session.shutdown();
        }
    }

    pub fn is_open(&self) -> bool {
        self.subscription.is_some()
    }

    /// Starts transmission of a message to a slave node.
    ///
    /// The payload is copied, so `message` may be dropped on return.
    pub fn tx_msg(
        &mut self,
        message: Message<'_>,
        destination: NodeAddr,
    ) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::Failed);
        }
        let now = self.clock.now();
        let mut writer = RouterMailboxWriter {
            router: &self.router,
            mailbox: self.config.tx_mailbox,
        };
        self.session.start(&mut writer, message, destination, now)
    }

    /// Handles a router notification.
    ///
    /// Notifications for other mailboxes, interrupts and anything arriving while closed are
    /// ignored. Fails if a frame acknowledged by this notification cannot be followed up.
    pub fn on_notification(&mut self, notification: &Notification) -> Result<(), TransportError> {
        if !self.is_open() {
            return Ok(());
        }
        let Notification::Mailbox(event) = *notification else {
            return Ok(());
        };

        match event {
            MailboxEvent::RxData {
                node,
                mailbox,
                payload,
            } if mailbox == self.config.rx_mailbox => {
                self.session.receive(Frame::from(payload), node);
                Ok(())
            }
            MailboxEvent::TxDone { node, mailbox } if self.is_tx_target(node, mailbox) => {
                trace!("Frame consumed by {:?}", node);
                self.session.acknowledge();
                let now = self.clock.now();
                let mut writer = RouterMailboxWriter {
                    router: &self.router,
                    mailbox: self.config.tx_mailbox,
                };
                self.session.advance(&mut writer, now)
            }
            MailboxEvent::TxTimeout { node, mailbox } if self.is_tx_target(node, mailbox) => {
                self.session.expire();
                Ok(())
            }
            MailboxEvent::TxIoError { node, mailbox } if self.is_tx_target(node, mailbox) => {
                warn!("Mailbox write to {:?} failed on the bus", node);
                self.session.fail();
                Ok(())
            }
            _ => {
                trace!("Ignore {:?}", event);
                Ok(())
            }
        }
    }

    fn is_tx_target(&self, node: NodeAddr, mailbox: MailboxId) -> bool {
        mailbox == self.config.tx_mailbox && self.session.storage().tx.destination() == Some(node)
    }

    /// Advances a pending acknowledgment and checks the frame timeout.
    pub fn tick(&mut self) -> Result<(), TransportError> {
        let now = self.clock.now();
        let mut writer = RouterMailboxWriter {
            router: &self.router,
            mailbox: self.config.tx_mailbox,
        };
        self.session.advance(&mut writer, now)?;
        self.session.check_timeout(now);
        Ok(())
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

    pub fn config(&self) -> &MasterConfig {
        &self.config
    }

    pub fn handler(&self) -> &H {
        self.session.handler()
    }

    pub fn handler_mut(&mut self) -> &mut H {
        self.session.handler_mut()
    }
}

impl<R: Router, C: Clock, H: Handler> Drop for MasterTransport<'_, R, C, H> {
    fn drop(&mut self) {
        self.close();
    }
}

struct RouterMailboxWriter<'r, R: Router> {
    router: &'r R,
    mailbox: MailboxId,
}

impl<R: Router> MailboxWriter for RouterMailboxWriter<'_, R> {
    fn write_frame(
        &mut self,
        frame: &Frame,
        destination: NodeAddr,
    ) -> Result<(), MailboxWriteError> {
        if destination.is_master() {
            warn!("Master cannot send to itself");
            return Err(MailboxWriteError::InvalidDestination);
        }

        let request = MailboxRequest {
            mailbox: self.mailbox,
            destination,
            payload: frame.payload(),
        };
        self.router.try_submit(request).map_err(|err| {
            warn!("Mailbox request to {:?} rejected: {:?}", destination, err);
            MailboxWriteError::QueueFull
        })
    }
}
