//! Segmentation and reassembly engines
//!
//! The engines are transport-agnostic. A transport feeds them mailbox frames and acknowledgments
//! and forwards the resulting events to the application.

mod rx;
mod tx;

pub use rx::{RxEngine, RxStatus};
pub use tx::{EncodeError, TxEngine, TxStatus};

/// Codec state shared by both directions
///
/// `Init` accepts a new single or first frame, `Cts` ("continue to send") is mid-message and
/// accepts consecutive frames only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodecState {
    Init,
    Cts,
}

/// Engine memory of one transport instance
///
/// Holds a message buffer per direction. Allocate it once, typically in a `StaticCell`, and lend
/// it to a transport for the transport's lifetime.
pub struct Storage {
    pub(crate) tx: TxEngine,
    pub(crate) rx: RxEngine,
}

impl Storage {
    pub const fn new() -> Self {
        Self {
            tx: TxEngine::new(),
            rx: RxEngine::new(),
        }
    }

    pub(crate) fn reset(&mut self) {
        self.tx.reset();
        self.rx.reset();
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}
