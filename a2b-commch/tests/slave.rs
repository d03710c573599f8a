mod common;

use a2b_commch::core::{MailboxId, MessageId, NodeAddr};
use a2b_commch::engine::{RxStatus, Storage, TxStatus};
use a2b_commch::event::EventKind;
use a2b_commch::format::MAX_MESSAGE_LENGTH;
use a2b_commch::message::Message;
use a2b_commch::slave::SlaveTransport;
use a2b_commch::time::Duration;
use a2b_commch::{SlaveConfig, TransportError};
use common::{FakeBus, ManualClock, Record, Recorder};

const MASTER: NodeAddr = NodeAddr::MASTER;
const ID: MessageId = MessageId::new(5).unwrap();
const PAYLOAD: [u8; 7] = [0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16];
const FRAMES: [[u8; 4]; 3] = [
    [0x05, 0x00, 0x07, 0x10],
    [0x41, 0x11, 0x12, 0x13],
    [0x42, 0x14, 0x15, 0x16],
];

#[test]
fn test_send_message() {
    let bus = FakeBus::new();
    let clock = ManualClock::new();
    let recorder = Recorder::default();
    let mut storage = Storage::new();
    let mut transport = SlaveTransport::new(
        bus.clone(),
        clock.clone(),
        recorder.handler(),
        &mut storage,
        SlaveConfig::default(),
    );

    transport
        .tx_msg(Message::new(ID, &PAYLOAD), MASTER)
        .unwrap();
    assert_eq!(transport.tx_status(), TxStatus::Busy);
    assert_eq!(bus.with(|t| t.written.clone()), FRAMES[..1]);

    // Nothing moves until the master drains the mailbox
    clock.advance_millis(1);
    transport.tick().unwrap();
    assert_eq!(bus.with(|t| t.written.len()), 1);

    for _ in 0..FRAMES.len() {
        assert!(bus.with(|t| t.consume()).is_some());
        clock.advance_millis(1);
        transport.tick().unwrap();
    }

    assert_eq!(bus.with(|t| t.written.clone()), FRAMES);
    assert!(!bus.with(|t| t.tx_status().empty_irq()));
    assert_eq!(transport.tx_status(), TxStatus::Idle);
    let stats = transport.statistics();
    assert_eq!((stats.frames_sent, stats.messages_sent), (3, 1));
    assert_eq!(
        recorder.take(),
        [Record::new(EventKind::TxDone, MASTER, Some(ID), &PAYLOAD)]
    );
}

#[test]
fn test_receive_message() {
    let bus = FakeBus::new();
    let clock = ManualClock::new();
    let recorder = Recorder::default();
    let mut storage = Storage::new();
    let mut transport = SlaveTransport::new(
        bus.clone(),
        clock.clone(),
        recorder.handler(),
        &mut storage,
        SlaveConfig::default(),
    );

    for frame in FRAMES {
        assert_eq!(recorder.len(), 0);
        bus.with(|t| t.deliver(frame));
        transport.tick().unwrap();
        clock.advance_millis(1);

        let status = bus.with(|t| t.rx_status());
        assert!(!status.full_irq());
        assert!(!status.full());
    }

    assert_eq!(transport.rx_status(), RxStatus::Idle);
    assert_eq!(transport.statistics().messages_received, 1);
    assert_eq!(
        recorder.take(),
        [Record::new(EventKind::RxMsg, MASTER, Some(ID), &PAYLOAD)]
    );
}

#[test]
fn test_receive_sequence_error() {
    let bus = FakeBus::new();
    let clock = ManualClock::new();
    let recorder = Recorder::default();
    let mut storage = Storage::new();
    let mut transport = SlaveTransport::new(
        bus.clone(),
        clock.clone(),
        recorder.handler(),
        &mut storage,
        SlaveConfig::default(),
    );

    bus.with(|t| t.deliver(FRAMES[0]));
    transport.tick().unwrap();
    assert_eq!(transport.rx_status(), RxStatus::Busy);

    clock.advance_millis(1);
    bus.with(|t| t.deliver(FRAMES[2]));
    transport.tick().unwrap();
    assert_eq!(transport.rx_status(), RxStatus::Idle);

    // A fresh message goes through afterwards
    clock.advance_millis(1);
    bus.with(|t| t.deliver([0x83, 0x00, 0x01, 0xaa]));
    transport.tick().unwrap();

    assert_eq!(
        recorder.take(),
        [
            Record::new(EventKind::RxSnError, MASTER, None, &[]),
            Record::new(EventKind::RxMsg, MASTER, MessageId::new(3), &[0xaa]),
        ]
    );
    assert_eq!(transport.statistics().rx_errors, 1);
}

#[test]
fn test_poll_interval() {
    let bus = FakeBus::new();
    let clock = ManualClock::new();
    let recorder = Recorder::default();
    let mut storage = Storage::new();
    let mut config = SlaveConfig::default();
    config.poll_interval = Duration::from_millis(10);
    let mut transport = SlaveTransport::new(
        bus.clone(),
        clock.clone(),
        recorder.handler(),
        &mut storage,
        config,
    );

    bus.with(|t| t.deliver([0x81, 0x00, 0x00, 0x00]));
    transport.tick().unwrap();
    assert_eq!(recorder.len(), 1);

    bus.with(|t| t.deliver([0x82, 0x00, 0x00, 0x00]));
    clock.advance_millis(5);
    transport.tick().unwrap();
    assert_eq!(recorder.len(), 1);

    clock.advance_millis(5);
    transport.tick().unwrap();
    assert_eq!(recorder.kinds(), [EventKind::RxMsg, EventKind::RxMsg]);
}

#[test]
fn test_frame_timeout() {
    let bus = FakeBus::new();
    let clock = ManualClock::new();
    let recorder = Recorder::default();
    let mut storage = Storage::new();
    let mut transport = SlaveTransport::new(
        bus.clone(),
        clock.clone(),
        recorder.handler(),
        &mut storage,
        SlaveConfig::default(),
    );

    transport
        .tx_msg(Message::new(ID, &PAYLOAD), MASTER)
        .unwrap();
    clock.advance_millis(1000);
    transport.tick().unwrap();
    assert_eq!(transport.tx_status(), TxStatus::Busy);

    clock.advance_millis(1);
    transport.tick().unwrap();
    assert_eq!(transport.tx_status(), TxStatus::Idle);
    assert_eq!(transport.statistics().tx_timeouts, 1);

    // The late acknowledgment is cleared without further events
    bus.with(|t| t.consume());
    clock.advance_millis(1);
    transport.tick().unwrap();
    assert!(!bus.with(|t| t.tx_status().empty_irq()));
    assert_eq!(bus.with(|t| t.written.len()), 1);

    let expected = Record::new(EventKind::TxTimeout, MASTER, Some(ID), &PAYLOAD);
    assert_eq!(recorder.take(), [expected]);
}

#[test]
fn test_send_rejections() {
    let bus = FakeBus::new();
    let clock = ManualClock::new();
    let recorder = Recorder::default();
    let mut storage = Storage::new();
    let mut transport = SlaveTransport::new(
        bus.clone(),
        clock.clone(),
        recorder.handler(),
        &mut storage,
        SlaveConfig::default(),
    );

    // Slaves talk to the master only
    let slave = NodeAddr::slave(3).unwrap();
    assert_eq!(
        transport.tx_msg(Message::new(ID, &PAYLOAD), slave),
        Err(TransportError::MailboxWrite)
    );
    assert_eq!(transport.tx_status(), TxStatus::Idle);
    assert_eq!(transport.statistics().io_failures, 0);

    let oversized = [0u8; MAX_MESSAGE_LENGTH];
    assert_eq!(
        transport.tx_msg(Message::new(ID, &oversized), MASTER),
        Err(TransportError::ExceededCapacity)
    );
    assert!(bus.with(|t| t.written.is_empty()));

    transport
        .tx_msg(Message::new(ID, &PAYLOAD), MASTER)
        .unwrap();
    assert_eq!(
        transport.tx_msg(Message::new(ID, &[1]), MASTER),
        Err(TransportError::Failed)
    );
    assert_eq!(bus.with(|t| t.written.clone()), FRAMES[..1]);
    assert_eq!(recorder.len(), 0);
}

#[test]
fn test_bus_failures() {
    let bus = FakeBus::new();
    let clock = ManualClock::new();
    let recorder = Recorder::default();
    let mut storage = Storage::new();
    let mut transport = SlaveTransport::new(
        bus.clone(),
        clock.clone(),
        recorder.handler(),
        &mut storage,
        SlaveConfig::default(),
    );

    bus.with(|t| t.fail_all = true);
    assert_eq!(transport.tick(), Err(TransportError::MailboxRead));
    assert_eq!(
        transport.tx_msg(Message::new(ID, &PAYLOAD), MASTER),
        Err(TransportError::MailboxWrite)
    );
    assert_eq!(transport.tx_status(), TxStatus::Idle);
    assert_eq!(transport.statistics().io_failures, 2);

    bus.with(|t| t.fail_all = false);
    transport
        .tx_msg(Message::new(ID, &PAYLOAD), MASTER)
        .unwrap();

    // The second frame cannot be written
    bus.with(|t| {
        t.fail_data_writes = true;
        t.consume();
    });
    clock.advance_millis(1);
    assert_eq!(transport.tick(), Err(TransportError::MailboxWrite));
    assert_eq!(transport.tx_status(), TxStatus::Idle);
    assert_eq!(
        recorder.take(),
        [Record::new(EventKind::Failure, MASTER, Some(ID), &PAYLOAD)]
    );
}

#[test]
fn test_timeout_while_bus_is_down() {
    let bus = FakeBus::new();
    let clock = ManualClock::new();
    let recorder = Recorder::default();
    let mut storage = Storage::new();
    let mut transport = SlaveTransport::new(
        bus.clone(),
        clock.clone(),
        recorder.handler(),
        &mut storage,
        SlaveConfig::default(),
    );

    transport
        .tx_msg(Message::new(ID, &PAYLOAD), MASTER)
        .unwrap();
    bus.with(|t| t.fail_all = true);

    clock.advance_millis(1000);
    assert_eq!(transport.tick(), Err(TransportError::MailboxRead));
    assert_eq!(transport.tx_status(), TxStatus::Busy);

    clock.advance_millis(1);
    assert_eq!(transport.tick(), Err(TransportError::MailboxRead));
    assert_eq!(transport.tx_status(), TxStatus::Idle);
    let stats = transport.statistics();
    assert_eq!((stats.tx_timeouts, stats.io_failures), (1, 2));

    let expected = Record::new(EventKind::TxTimeout, MASTER, Some(ID), &PAYLOAD);
    assert_eq!(recorder.take(), [expected]);

    // The transmitter accepts a new message once the bus is back
    bus.with(|t| t.fail_all = false);
    transport.tx_msg(Message::new(ID, &[1]), MASTER).unwrap();
}

#[test]
fn test_status_clear_failure() {
    let bus = FakeBus::new();
    let clock = ManualClock::new();
    let recorder = Recorder::default();
    let mut storage = Storage::new();
    let mut transport = SlaveTransport::new(
        bus.clone(),
        clock.clone(),
        recorder.handler(),
        &mut storage,
        SlaveConfig::default(),
    );

    bus.with(|t| {
        t.deliver([0x81, 0x00, 0x00, 0x00]);
        t.fail_status_writes = true;
    });
    assert_eq!(transport.tick(), Err(TransportError::MailboxWrite));
    assert_eq!(recorder.len(), 0);
    assert!(bus.with(|t| t.rx_status().full_irq()));

    // The frame is read again once the interrupt can be cleared
    bus.with(|t| t.fail_status_writes = false);
    clock.advance_millis(1);
    transport.tick().unwrap();
    assert!(!bus.with(|t| t.rx_status().full_irq()));
    assert_eq!(recorder.kinds(), [EventKind::RxMsg]);
    assert_eq!(transport.statistics().io_failures, 1);
}

#[test]
fn test_swapped_mailboxes() {
    let bus = FakeBus::with_mailboxes(MailboxId::Mailbox0, MailboxId::Mailbox1);
    let clock = ManualClock::new();
    let recorder = Recorder::default();
    let mut storage = Storage::new();
    let mut config = SlaveConfig::default();
    config.rx_mailbox = MailboxId::Mailbox0;
    config.tx_mailbox = MailboxId::Mailbox1;
    let mut transport = SlaveTransport::new(
        bus.clone(),
        clock.clone(),
        recorder.handler(),
        &mut storage,
        config,
    );

    let message = Message::new(ID, &[0x42]);
    transport.tx_msg(message, MASTER).unwrap();
    assert_eq!(bus.with(|t| t.written.clone()), [[0x85, 0x00, 0x01, 0x42]]);

    bus.with(|t| {
        t.consume();
        t.deliver([0x86, 0x00, 0x00, 0x00]);
    });
    transport.tick().unwrap();
    assert_eq!(recorder.kinds(), [EventKind::RxMsg, EventKind::TxDone]);
}

#[test]
fn test_release_fails_message_in_flight() {
    let bus = FakeBus::new();
    let clock = ManualClock::new();
    let recorder = Recorder::default();
    let mut storage = Storage::new();
    let mut transport = SlaveTransport::new(
        bus.clone(),
        clock.clone(),
        recorder.handler(),
        &mut storage,
        SlaveConfig::default(),
    );

    transport
        .tx_msg(Message::new(ID, &PAYLOAD), MASTER)
        .unwrap();
    let (_bus, _handler) = transport.release();
    assert_eq!(recorder.kinds(), [EventKind::Failure]);
}
