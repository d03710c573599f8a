//! A2B mailbox transport interface
//!
//! The crate describes everything the communication channel needs from the outside world
//! and nothing more:
//! * `payload` is the raw 4-byte unit a mailbox moves in one write
//! * `registers` is the AD242x mailbox register map used by slave nodes over I2C
//! * `router` is the message-router boundary used by the master node, plus a queue-based
//!   reference router
//! * `time` provides the monotonic clock the transports measure timeouts with
//!
//! Slave nodes access their local transceiver directly through an `embedded_hal` I2C bus.
//! The master node is event driven: a bus driver task owns the I2C bus, consumes mailbox write
//! requests from the router job queue and reports outcomes back as router notifications.
//! Transport callbacks may therefore run at interrupt priority, so nothing in this crate blocks
//! or allocates.

#![no_std]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod payload;
pub mod registers;
pub mod router;
pub mod time;
