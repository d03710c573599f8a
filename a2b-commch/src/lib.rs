//! # A2B communication channel
//!
//! This library carries control messages of up to 1499 bytes between the master and the slave
//! nodes of an A2B bus. The transceivers only exchange 4-byte mailbox payloads, so messages are
//! segmented into single (SF), first (FF) and consecutive (CF) frames, one mailbox write at a
//! time, and reassembled on the other side. It runs in no_std environments and uses a
//! user-provided `Storage` block instead of dynamic memory allocation.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌─────────────┐
//!                 │ Application │
//!                 └──┬───────▲──┘
//!           tx_msg   │       │ Handler::on_event
//!                 ┌──▼───────┴──┐
//!                 │  Transport  │
//!                 │ ┌─────────┐ │
//!                 │ │ Storage │ │
//!                 │ │TX    RX │ │
//!                 │ └─────────┘ │
//!                 └──┬───────▲──┘
//!     MailboxWriter  │       │  polled status (slave)
//!                    │       │  router notifications (master)
//!                 ┌──▼───────┴──┐
//!                 │   Mailbox   │
//!                 └─────────────┘
//! ```
//! Components:
//! * _Engines_ segment an outgoing message into frames and reassemble incoming frames. They
//!   know nothing about the bus.
//! * _SlaveTransport_ drives the engines of a slave node. It polls the mailbox status registers
//!   of the local transceiver over I2C from `tick` and writes frames directly.
//! * _MasterTransport_ drives the engines of the master node. It submits frames as requests to
//!   a message router and is fed with router notifications by the application.
//! * _Handler_ receives every outcome: complete messages, receive errors, transmit completion,
//!   timeouts and failures.
//!
//! ## Flow control
//!
//! A frame is written only after the peer consumed the previous one. A frame that stays
//! unconsumed for `frame_timeout` aborts the message with `EventKind::TxTimeout`. There is no
//! retransmission; retry policy belongs to the application.
//!
//! ## Concurrency model
//!
//! Only one message is in flight per direction. Transports take `&mut self` on every operation,
//! so `tick`, `tx_msg` and `on_notification` of one transport never overlap. Nothing blocks:
//! mailbox writes are single I2C transactions on a slave and non-blocking queue submissions on
//! the master.
#![no_std]

pub use a2b_core as core;
pub use a2b_mailbox::{payload, registers, router, time};

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod config;
pub mod engine;
pub mod event;
pub mod format;
pub mod master;
pub mod message;
pub mod slave;
pub mod transport;

pub use config::{MasterConfig, SlaveConfig};
pub use engine::Storage;
pub use event::{Event, EventKind, Handler};
pub use master::MasterTransport;
pub use message::Message;
pub use slave::SlaveTransport;
pub use transport::{Statistics, TransportError};
