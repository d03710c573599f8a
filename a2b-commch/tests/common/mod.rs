#![allow(dead_code)]

use a2b_commch::core::{MailboxId, MessageId, NodeAddr};
use a2b_commch::event::{Event, EventKind};
use a2b_commch::registers::{MailboxRegisters, MailboxStatus};
use a2b_commch::time::{Clock, Duration, Instant};
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::vec::Vec;

pub const LOCAL_ADDRESS: u8 = 0x68;

const BUSY: u8 = 1 << 0;
const FULL: u8 = 1 << 1;
const EMPTY: u8 = 1 << 2;
const IRQ_MASK: u8 = MailboxStatus::CLEAR_FULL_IRQ | MailboxStatus::CLEAR_EMPTY_IRQ;

/// Register file of a slave-side transceiver
///
/// The slave processor fills `tx` and drains `rx`. The test plays the master side with
/// `deliver` and `consume`.
pub struct Transceiver {
    registers: [u8; 256],
    rx: MailboxRegisters,
    tx: MailboxRegisters,
    /// Frames completed in the tx mailbox, oldest first
    pub written: Vec<[u8; 4]>,
    /// Every transaction fails
    pub fail_all: bool,
    /// Writes starting at the tx data register fail
    pub fail_data_writes: bool,
    /// Writes to either status register fail
    pub fail_status_writes: bool,
}

impl Transceiver {
    fn new(rx: MailboxId, tx: MailboxId) -> Self {
        let rx = MailboxRegisters::of(rx);
        let tx = MailboxRegisters::of(tx);
        let mut registers = [0; 256];
        registers[usize::from(rx.status)] = EMPTY;
        registers[usize::from(tx.status)] = EMPTY;
        Self {
            registers,
            rx,
            tx,
            written: Vec::new(),
            fail_all: false,
            fail_data_writes: false,
            fail_status_writes: false,
        }
    }

    fn read_register(&mut self, address: u8) -> u8 {
        let value = self.registers[usize::from(address)];
        if address == self.rx.data + 3 {
            let status = &mut self.registers[usize::from(self.rx.status)];
            *status = (*status & !FULL) | EMPTY;
        }
        value
    }

    fn is_status(&self, address: u8) -> bool {
        address == self.rx.status || address == self.tx.status
    }

    fn write_register(&mut self, address: u8, value: u8) {
        if self.is_status(address) {
            self.registers[usize::from(address)] &= !(value & IRQ_MASK);
            return;
        }
        self.registers[usize::from(address)] = value;
        if address == self.tx.data + 3 {
            let data = usize::from(self.tx.data);
            let mut frame = [0; 4];
            frame.copy_from_slice(&self.registers[data..data + 4]);
            self.written.push(frame);
            let status = &mut self.registers[usize::from(self.tx.status)];
            *status = (*status & !EMPTY) | FULL | BUSY;
        }
    }

    /// Master fills the rx mailbox
    pub fn deliver(&mut self, frame: [u8; 4]) {
        let data = usize::from(self.rx.data);
        self.registers[data..data + 4].copy_from_slice(&frame);
        let status = &mut self.registers[usize::from(self.rx.status)];
        *status = (*status & !EMPTY) | FULL | MailboxStatus::CLEAR_FULL_IRQ;
    }

    /// Master drains the tx mailbox
    pub fn consume(&mut self) -> Option<[u8; 4]> {
        let status = self.tx_status();
        if !status.full() {
            return None;
        }
        let data = usize::from(self.tx.data);
        let mut frame = [0; 4];
        frame.copy_from_slice(&self.registers[data..data + 4]);
        self.registers[usize::from(self.tx.status)] = EMPTY | MailboxStatus::CLEAR_EMPTY_IRQ;
        Some(frame)
    }

    pub fn rx_status(&self) -> MailboxStatus {
        MailboxStatus::from_bits(self.registers[usize::from(self.rx.status)])
    }

    pub fn tx_status(&self) -> MailboxStatus {
        MailboxStatus::from_bits(self.registers[usize::from(self.tx.status)])
    }
}

/// Shared handle to a fake transceiver, usable as the slave I2C bus
#[derive(Clone)]
pub struct FakeBus(Rc<RefCell<Transceiver>>);

impl FakeBus {
    pub fn new() -> Self {
        Self::with_mailboxes(MailboxId::Mailbox1, MailboxId::Mailbox0)
    }

    pub fn with_mailboxes(rx: MailboxId, tx: MailboxId) -> Self {
        Self(Rc::new(RefCell::new(Transceiver::new(rx, tx))))
    }

    pub fn with<T>(&self, f: impl FnOnce(&mut Transceiver) -> T) -> T {
        f(&mut self.0.borrow_mut())
    }
}

impl ErrorType for FakeBus {
    type Error = ErrorKind;
}

impl I2c for FakeBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut transceiver = self.0.borrow_mut();
        if address != LOCAL_ADDRESS {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        if transceiver.fail_all {
            return Err(ErrorKind::Bus);
        }

        let mut pointer = 0u8;
        for operation in operations {
            match operation {
                Operation::Write(bytes) => {
                    let Some((&register, data)) = bytes.split_first() else {
                        continue;
                    };
                    if transceiver.fail_data_writes && register == transceiver.tx.data {
                        return Err(ErrorKind::Bus);
                    }
                    let status_write = transceiver.is_status(register) && !data.is_empty();
                    if transceiver.fail_status_writes && status_write {
                        return Err(ErrorKind::Bus);
                    }
                    pointer = register;
                    for &byte in data {
                        transceiver.write_register(pointer, byte);
                        pointer = pointer.wrapping_add(1);
                    }
                }
                Operation::Read(buffer) => {
                    for byte in buffer.iter_mut() {
                        *byte = transceiver.read_register(pointer);
                        pointer = pointer.wrapping_add(1);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Clock the test moves by hand
#[derive(Clone)]
pub struct ManualClock(Rc<Cell<Instant>>);

impl ManualClock {
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(Instant::from_millis(0))))
    }

    pub fn advance(&self, duration: Duration) {
        self.0.set(self.0.get() + duration);
    }

    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.0.get()
    }
}

/// Owned copy of a delivered event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub kind: EventKind,
    pub node: NodeAddr,
    pub id: Option<MessageId>,
    pub payload: Vec<u8>,
}

impl Record {
    pub fn new(kind: EventKind, node: NodeAddr, id: Option<MessageId>, payload: &[u8]) -> Self {
        Self {
            kind,
            node,
            id,
            payload: payload.to_vec(),
        }
    }
}

impl From<Event<'_>> for Record {
    fn from(event: Event<'_>) -> Self {
        Self {
            kind: event.kind,
            node: event.node,
            id: event.message.map(|message| message.id),
            payload: event
                .message
                .map_or_else(Vec::new, |message| message.payload.to_vec()),
        }
    }
}

/// Event log shared with a transport handler
#[derive(Clone, Default)]
pub struct Recorder(Rc<RefCell<Vec<Record>>>);

impl Recorder {
    pub fn handler(&self) -> impl FnMut(Event<'_>) + use<> {
        let records = self.0.clone();
        move |event: Event<'_>| records.borrow_mut().push(Record::from(event))
    }

    pub fn take(&self) -> Vec<Record> {
        self.0.take()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.0.borrow().iter().map(|record| record.kind).collect()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }
}
