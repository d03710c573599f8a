//! A2B communication channel core data types
//!
//! This crate provides basic data type definitions used by the other A2B crates.
//! Users should not depend on this crate directly. Use the `a2b_commch::core` reexport instead.
#![no_std]

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidValue;

/// Application-defined message identifier
///
/// The identifier occupies the low 6 bits of a Single or First frame header byte.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MessageId(u8);

impl MessageId {
    const MAX_VALUE: u8 = 0x3f;
    pub const MAX: MessageId = MessageId(Self::MAX_VALUE);

    pub const fn new(value: u8) -> Option<Self> {
        if value <= Self::MAX_VALUE {
            Some(Self::from_u8_truncating(value))
        } else {
            None
        }
    }

    pub const fn from_u8_truncating(value: u8) -> Self {
        Self(value & Self::MAX_VALUE)
    }

    pub const fn into_u8(self) -> u8 {
        self.0
    }
}

impl From<MessageId> for u8 {
    fn from(value: MessageId) -> Self {
        value.into_u8()
    }
}

impl TryFrom<u8> for MessageId {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidValue)
    }
}

/// Consecutive frame sequence number
///
/// Counts modulo 64. Every message restarts the count at `START`; within a message the counter
/// rolls over from 63 to 0, not back to `START`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SequenceNumber(u8);

impl SequenceNumber {
    const MAX_VALUE: u8 = 0x3f;
    pub const MAX: SequenceNumber = SequenceNumber(Self::MAX_VALUE);

    /// Sequence number of the first consecutive frame of every message
    pub const START: SequenceNumber = SequenceNumber(1);

    pub const fn new(value: u8) -> Option<Self> {
        if value <= Self::MAX_VALUE {
            Some(Self::from_u8_truncating(value))
        } else {
            None
        }
    }

    pub const fn from_u8_truncating(value: u8) -> Self {
        Self(value & Self::MAX_VALUE)
    }

    pub const fn into_u8(self) -> u8 {
        self.0
    }

    pub const fn next(self) -> Self {
        Self((self.0 + 1) & Self::MAX_VALUE)
    }
}

impl Default for SequenceNumber {
    fn default() -> Self {
        Self::START
    }
}

impl From<SequenceNumber> for u8 {
    fn from(value: SequenceNumber) -> Self {
        value.into_u8()
    }
}

impl TryFrom<u8> for SequenceNumber {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidValue)
    }
}

/// Logical bus node address
///
/// The master node is addressed as -1, slave nodes are numbered from 0 in discovery order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NodeAddr(i8);

impl NodeAddr {
    pub const MASTER: NodeAddr = NodeAddr(-1);
    pub const MAX_SLAVE: NodeAddr = NodeAddr(i8::MAX);

    pub const fn new(value: i8) -> Option<Self> {
        if value >= Self::MASTER.0 {
            Some(Self(value))
        } else {
            None
        }
    }

    pub const fn slave(index: u8) -> Option<Self> {
        if index <= Self::MAX_SLAVE.0 as u8 {
            Some(Self(index as i8))
        } else {
            None
        }
    }

    pub const fn is_master(self) -> bool {
        self.0 == Self::MASTER.0
    }

    /// Slave index, `None` for the master node
    pub const fn slave_index(self) -> Option<u8> {
        if self.0 >= 0 { Some(self.0 as u8) } else { None }
    }

    pub const fn into_i8(self) -> i8 {
        self.0
    }
}

impl From<NodeAddr> for i8 {
    fn from(value: NodeAddr) -> Self {
        value.into_i8()
    }
}

impl TryFrom<i8> for NodeAddr {
    type Error = InvalidValue;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidValue)
    }
}

/// One of the two mailbox register sets of an A2B transceiver
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MailboxId {
    Mailbox0 = 0,
    Mailbox1 = 1,
}

impl MailboxId {
    pub const fn try_from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(MailboxId::Mailbox0),
            1 => Some(MailboxId::Mailbox1),
            _ => None,
        }
    }

    pub const fn into_u8(self) -> u8 {
        self as u8
    }

    /// The opposite mailbox
    pub const fn other(self) -> Self {
        match self {
            MailboxId::Mailbox0 => MailboxId::Mailbox1,
            MailboxId::Mailbox1 => MailboxId::Mailbox0,
        }
    }
}

impl From<MailboxId> for u8 {
    fn from(value: MailboxId) -> Self {
        value.into_u8()
    }
}

impl TryFrom<u8> for MailboxId {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::try_from_u8(value).ok_or(InvalidValue)
    }
}
