//! AD242x mailbox register map
//!
//! Each transceiver has two mailboxes. A mailbox consists of a control register, a status
//! register and four data registers at consecutive addresses. Writing the last data register
//! (`B3`) marks the mailbox full; reading it on the other side marks it empty again.
//! The transceiver auto-increments the register address, so the complete payload moves in a
//! single I2C transaction starting at `B0`.

use a2b_core::MailboxId;

/// Register addresses of a single mailbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MailboxRegisters {
    pub control: u8,
    pub status: u8,
    pub data: u8,
}

impl MailboxRegisters {
    const MAILBOX0: Self = Self {
        control: 0x90,
        status: 0x91,
        data: 0x92,
    };

    const MAILBOX1: Self = Self {
        control: 0x96,
        status: 0x97,
        data: 0x98,
    };

    pub const fn of(mailbox: MailboxId) -> Self {
        match mailbox {
            MailboxId::Mailbox0 => Self::MAILBOX0,
            MailboxId::Mailbox1 => Self::MAILBOX1,
        }
    }
}

/// Content of an `MBOXnSTAT` register
///
/// The interrupt request bits are write-one-to-clear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MailboxStatus(u8);

impl MailboxStatus {
    const BUSY: u8 = 0;
    const FULL: u8 = 1;
    const EMPTY: u8 = 2;
    const FULL_IRQ: u8 = 4;
    const EMPTY_IRQ: u8 = 5;

    /// Value written to the status register to acknowledge the full interrupt
    pub const CLEAR_FULL_IRQ: u8 = 1 << Self::FULL_IRQ;
    /// Value written to the status register to acknowledge the empty interrupt
    pub const CLEAR_EMPTY_IRQ: u8 = 1 << Self::EMPTY_IRQ;

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn into_bits(self) -> u8 {
        self.0
    }

    /// A transfer to the other node is in progress
    pub const fn busy(&self) -> bool {
        (self.0 >> Self::BUSY) & 0x1 != 0
    }

    pub const fn full(&self) -> bool {
        (self.0 >> Self::FULL) & 0x1 != 0
    }

    pub const fn empty(&self) -> bool {
        (self.0 >> Self::EMPTY) & 0x1 != 0
    }

    /// The mailbox was filled by the other node since the interrupt was last cleared
    pub const fn full_irq(&self) -> bool {
        (self.0 >> Self::FULL_IRQ) & 0x1 != 0
    }

    /// The other node consumed the mailbox since the interrupt was last cleared
    pub const fn empty_irq(&self) -> bool {
        (self.0 >> Self::EMPTY_IRQ) & 0x1 != 0
    }
}

impl From<u8> for MailboxStatus {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<MailboxStatus> for u8 {
    fn from(value: MailboxStatus) -> Self {
        value.0
    }
}
