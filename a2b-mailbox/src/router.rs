//! Message-router boundary of the master node
//!
//! On the master node mailbox traffic does not go through direct I/O. A transport submits
//! mailbox write requests to the router job queue and learns about their outcome, as well as
//! about incoming mailbox data, through router notifications it subscribed to.
//!
//! `QueueRouter` is a reference implementation built on `embassy_sync` channels. The bus driver
//! pulls requests with `next_job`, performs the mailbox access and reports the result with
//! `publish`. A dispatcher pulls notifications with `next_notification` and hands them to the
//! subscribed transport.

use core::cell::RefCell;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;

use a2b_core::{MailboxId, NodeAddr};

use crate::payload::Payload;

/// Mailbox write request submitted to the router job queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MailboxRequest {
    /// Mailbox of the destination node to fill
    pub mailbox: MailboxId,
    pub destination: NodeAddr,
    pub payload: Payload,
}

/// Asynchronous mailbox event reported by the bus driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MailboxEvent {
    /// A node filled a mailbox the master reads
    RxData {
        node: NodeAddr,
        mailbox: MailboxId,
        payload: Payload,
    },
    /// The destination node consumed a mailbox written on request
    TxDone { node: NodeAddr, mailbox: MailboxId },
    /// The destination node did not consume a written mailbox in time
    TxTimeout { node: NodeAddr, mailbox: MailboxId },
    /// The mailbox write request failed on the bus
    TxIoError { node: NodeAddr, mailbox: MailboxId },
}

impl MailboxEvent {
    pub fn node(&self) -> NodeAddr {
        match *self {
            MailboxEvent::RxData { node, .. } => node,
            MailboxEvent::TxDone { node, .. } => node,
            MailboxEvent::TxTimeout { node, .. } => node,
            MailboxEvent::TxIoError { node, .. } => node,
        }
    }

    pub fn mailbox(&self) -> MailboxId {
        match *self {
            MailboxEvent::RxData { mailbox, .. } => mailbox,
            MailboxEvent::TxDone { mailbox, .. } => mailbox,
            MailboxEvent::TxTimeout { mailbox, .. } => mailbox,
            MailboxEvent::TxIoError { mailbox, .. } => mailbox,
        }
    }
}

/// Router notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Notification {
    Mailbox(MailboxEvent),
    /// Transceiver interrupt unrelated to mailboxes, e.g., a line fault
    Interrupt { node: NodeAddr, source: u8 },
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Notification::Mailbox(_) => NotificationKind::Mailbox,
            Notification::Interrupt { .. } => NotificationKind::Interrupt,
        }
    }
}

/// Subscription filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NotificationKind {
    Mailbox,
    Interrupt,
}

/// Handle of a registered subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SubscriptionId(u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RouterError {
    QueueFull,
    NoSubscriptionSlotLeft,
    NoSubscriber,
}

/// Message router as seen by a transport
///
/// All methods must be non-blocking: they are called from transport callbacks.
pub trait Router {
    fn subscribe(&self, kind: NotificationKind) -> Result<SubscriptionId, RouterError>;

    /// Removes a subscription. Unknown identifiers are ignored.
    fn unsubscribe(&self, id: SubscriptionId);

    /// Enqueues a mailbox write request. Fails with `QueueFull` instead of waiting.
    fn try_submit(&self, request: MailboxRequest) -> Result<(), RouterError>;
}

impl<R: Router + ?Sized> Router for &R {
    fn subscribe(&self, kind: NotificationKind) -> Result<SubscriptionId, RouterError> {
        (**self).subscribe(kind)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        (**self).unsubscribe(id)
    }

    fn try_submit(&self, request: MailboxRequest) -> Result<(), RouterError> {
        (**self).try_submit(request)
    }
}

struct Subscriptions<const S: usize> {
    next_id: u16,
    entries: heapless::Vec<(SubscriptionId, NotificationKind), S>,
}

impl<const S: usize> Subscriptions<S> {
    const fn new() -> Self {
        Self {
            next_id: 0,
            entries: heapless::Vec::new(),
        }
    }

    fn insert(&mut self, kind: NotificationKind) -> Result<SubscriptionId, RouterError> {
        let id = SubscriptionId(self.next_id);
        self.entries
            .push((id, kind))
            .map_err(|_| RouterError::NoSubscriptionSlotLeft)?;
        self.next_id = self.next_id.wrapping_add(1);
        Ok(id)
    }

    fn remove(&mut self, id: SubscriptionId) {
        self.entries.retain(|(entry_id, _)| *entry_id != id);
    }

    fn contains(&self, kind: NotificationKind) -> bool {
        self.entries.iter().any(|(_, entry)| *entry == kind)
    }
}

/// Channel-based router
///
/// * `N` is the depth of both the job queue and the notification queue
/// * `S` is the maximum number of simultaneous subscriptions
pub struct QueueRouter<M: RawMutex, const N: usize, const S: usize> {
    jobs: Channel<M, MailboxRequest, N>,
    notifications: Channel<M, Notification, N>,
    subscriptions: Mutex<M, RefCell<Subscriptions<S>>>,
}

impl<M: RawMutex, const N: usize, const S: usize> QueueRouter<M, N, S> {
    pub const fn new() -> Self {
        Self {
            jobs: Channel::new(),
            notifications: Channel::new(),
            subscriptions: Mutex::new(RefCell::new(Subscriptions::new())),
        }
    }

    pub fn is_subscribed(&self, kind: NotificationKind) -> bool {
        self.subscriptions
            .lock(|table| table.borrow().contains(kind))
    }

    /// Queues a notification for the dispatcher.
    ///
    /// Notifications nobody subscribed to are dropped with `NoSubscriber`.
    pub fn publish(&self, notification: Notification) -> Result<(), RouterError> {
        if !self.is_subscribed(notification.kind()) {
            trace!("Drop unsubscribed notification {:?}", notification);
            return Err(RouterError::NoSubscriber);
        }
        self.notifications
            .try_send(notification)
            .map_err(|_| RouterError::QueueFull)
    }

    pub fn try_next_job(&self) -> Option<MailboxRequest> {
        self.jobs.try_receive().ok()
    }

    /// Asynchronously fetches the next mailbox write request. Safe to drop.
    pub async fn next_job(&self) -> MailboxRequest {
        self.jobs.receive().await
    }

    pub fn try_next_notification(&self) -> Option<Notification> {
        self.notifications.try_receive().ok()
    }

    /// Asynchronously fetches the next notification. Safe to drop.
    pub async fn next_notification(&self) -> Notification {
        self.notifications.receive().await
    }
}

impl<M: RawMutex, const N: usize, const S: usize> Default for QueueRouter<M, N, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex, const N: usize, const S: usize> Router for QueueRouter<M, N, S> {
    fn subscribe(&self, kind: NotificationKind) -> Result<SubscriptionId, RouterError> {
        self.subscriptions
            .lock(|table| table.borrow_mut().insert(kind))
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions
            .lock(|table| table.borrow_mut().remove(id));
    }

    fn try_submit(&self, request: MailboxRequest) -> Result<(), RouterError> {
        self.jobs
            .try_send(request)
            .map_err(|_| RouterError::QueueFull)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

    type TestRouter = QueueRouter<CriticalSectionRawMutex, 2, 2>;

    const NODE: NodeAddr = NodeAddr::slave(0).unwrap();

    fn request(byte: u8) -> MailboxRequest {
        MailboxRequest {
            mailbox: MailboxId::Mailbox1,
            destination: NODE,
            payload: Payload::new([byte, 0, 0, 0]),
        }
    }

    fn tx_done() -> Notification {
        Notification::Mailbox(MailboxEvent::TxDone {
            node: NODE,
            mailbox: MailboxId::Mailbox1,
        })
    }

    #[test]
    fn test_job_queue_is_bounded() {
        let router = TestRouter::new();
        router.try_submit(request(1)).unwrap();
        router.try_submit(request(2)).unwrap();
        assert_eq!(router.try_submit(request(3)), Err(RouterError::QueueFull));

        assert_eq!(router.try_next_job(), Some(request(1)));
        assert_eq!(router.try_next_job(), Some(request(2)));
        assert_eq!(router.try_next_job(), None);
    }

    #[test]
    fn test_async_job() {
        let router = TestRouter::new();
        router.try_submit(request(7)).unwrap();
        let job = futures_executor::block_on(router.next_job());
        assert_eq!(job, request(7));
    }

    #[test]
    fn test_unsubscribed_notification_is_dropped() {
        let router = TestRouter::new();
        assert_eq!(router.publish(tx_done()), Err(RouterError::NoSubscriber));

        let id = router.subscribe(NotificationKind::Mailbox).unwrap();
        router.publish(tx_done()).unwrap();
        let interrupt = Notification::Interrupt {
            node: NODE,
            source: 3,
        };
        assert_eq!(router.publish(interrupt), Err(RouterError::NoSubscriber));
        assert_eq!(router.try_next_notification(), Some(tx_done()));

        router.unsubscribe(id);
        assert!(!router.is_subscribed(NotificationKind::Mailbox));
        assert_eq!(router.publish(tx_done()), Err(RouterError::NoSubscriber));
    }

    #[test]
    fn test_subscription_slots() {
        let router = TestRouter::new();
        let first = router.subscribe(NotificationKind::Mailbox).unwrap();
        let second = router.subscribe(NotificationKind::Mailbox).unwrap();
        assert_ne!(first, second);
        assert_eq!(
            router.subscribe(NotificationKind::Interrupt),
            Err(RouterError::NoSubscriptionSlotLeft)
        );

        router.unsubscribe(first);
        assert!(router.is_subscribed(NotificationKind::Mailbox));
        router.subscribe(NotificationKind::Interrupt).unwrap();
    }

    #[test]
    fn test_event_accessors() {
        let event = MailboxEvent::RxData {
            node: NODE,
            mailbox: MailboxId::Mailbox0,
            payload: Payload::default(),
        };
        assert_eq!(event.node(), NODE);
        assert_eq!(event.mailbox(), MailboxId::Mailbox0);
        assert_eq!(tx_done().kind(), NotificationKind::Mailbox);
    }
}
