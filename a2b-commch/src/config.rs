use crate::core::MailboxId;
use crate::time::Duration;

/// Default 7-bit I2C address of the local transceiver
pub const DEFAULT_LOCAL_ADDRESS: u8 = 0x68;

const DEFAULT_FRAME_TIMEOUT: Duration = Duration::from_millis(1000);

/// Slave adapter configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub struct SlaveConfig {
    /// I2C address of the transceiver the slave processor is attached to
    pub local_address: u8,
    /// Mailbox the master fills
    pub rx_mailbox: MailboxId,
    /// Mailbox the master consumes
    pub tx_mailbox: MailboxId,
    /// Minimum time between two mailbox status polls
    pub poll_interval: Duration,
    /// Time the master has to consume a written frame
    pub frame_timeout: Duration,
}

impl Default for SlaveConfig {
    fn default() -> Self {
        Self {
            local_address: DEFAULT_LOCAL_ADDRESS,
            rx_mailbox: MailboxId::Mailbox1,
            tx_mailbox: MailboxId::Mailbox0,
            poll_interval: Duration::from_millis(1),
            frame_timeout: DEFAULT_FRAME_TIMEOUT,
        }
    }
}

/// Master adapter configuration
///
/// Mailbox numbers refer to the slave transceivers. The defaults mirror `SlaveConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub struct MasterConfig {
    /// Mailbox the slaves fill
    pub rx_mailbox: MailboxId,
    /// Mailbox the master fills
    pub tx_mailbox: MailboxId,
    /// Time a slave has to consume a written frame
    pub frame_timeout: Duration,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            rx_mailbox: MailboxId::Mailbox0,
            tx_mailbox: MailboxId::Mailbox1,
            frame_timeout: DEFAULT_FRAME_TIMEOUT,
        }
    }
}
