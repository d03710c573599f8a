use crate::core::{MessageId, NodeAddr, SequenceNumber};
use crate::engine::CodecState;
use crate::format::{CF_DATA_LENGTH, Frame, MAX_MESSAGE_LENGTH};
use crate::message::{Message, MessageBuffer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxStatus {
    Idle,
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// The message does not fit the transmit buffer
    ExceededCapacity,
    /// No message is loaded, the engine is busy with another one, or all frames are sent
    Failed,
}

/// Transmission state machine
///
/// ```text
///        load            encode (SF)
/// Idle ───────► Busy/Init ───────────────────────────► complete
///                   │ encode (FF)                          ▲
///                   ▼            encode (CF), cursor<len   │ encode (CF), cursor==len
///               Busy/Cts ◄─────────────────┘───────────────┘
/// ```
/// A loaded message is owned by the engine until `reset`; the caller decides when a frame is
/// acknowledged and the next one may be encoded.
pub struct TxEngine {
    status: TxStatus,
    state: CodecState,
    seq: SequenceNumber,
    id: MessageId,
    destination: NodeAddr,
    started: bool,
    buffer: MessageBuffer,
}

impl TxEngine {
    pub const fn new() -> Self {
        Self {
            status: TxStatus::Idle,
            state: CodecState::Init,
            seq: SequenceNumber::START,
            id: MessageId::from_u8_truncating(0),
            destination: NodeAddr::MASTER,
            started: false,
            buffer: MessageBuffer::new(),
        }
    }

    pub fn status(&self) -> TxStatus {
        self.status
    }

    pub fn state(&self) -> CodecState {
        self.state
    }

    /// Sequence number of the next consecutive frame
    pub fn sequence(&self) -> SequenceNumber {
        self.seq
    }

    /// Number of message bytes already encoded
    pub fn cursor(&self) -> usize {
        self.buffer.cursor()
    }

    pub fn destination(&self) -> Option<NodeAddr> {
        match self.status {
            TxStatus::Idle => None,
            TxStatus::Busy => Some(self.destination),
        }
    }

    /// The message in flight
    pub fn message(&self) -> Option<Message<'_>> {
        match self.status {
            TxStatus::Idle => None,
            TxStatus::Busy => Some(Message::new(self.id, self.buffer.as_slice())),
        }
    }

    /// Copies a message into the engine. The caller keeps ownership of `message`.
    pub fn load(&mut self, message: Message<'_>, destination: NodeAddr) -> Result<(), EncodeError> {
        if self.status == TxStatus::Busy {
            return Err(EncodeError::Failed);
        }
        self.buffer
            .load(message.payload)
            .map_err(|_| EncodeError::ExceededCapacity)?;

        self.status = TxStatus::Busy;
        self.state = CodecState::Init;
        self.seq = SequenceNumber::START;
        self.id = message.id;
        self.destination = destination;
        self.started = false;
        Ok(())
    }

    /// All frames of the loaded message were encoded
    pub fn is_complete(&self) -> bool {
        self.status == TxStatus::Busy && self.started && self.buffer.is_complete()
    }

    pub fn encode_next_frame(&mut self) -> Result<Frame, EncodeError> {
        if self.status == TxStatus::Idle {
            return Err(EncodeError::Failed);
        }

        match self.state {
            CodecState::Init if !self.started => self.encode_header_frame(),
            CodecState::Cts if !self.buffer.is_complete() => Ok(self.encode_consecutive_frame()),
            _ => Err(EncodeError::Failed),
        }
    }

    fn encode_header_frame(&mut self) -> Result<Frame, EncodeError> {
        let length = self.buffer.len();
        if length >= MAX_MESSAGE_LENGTH {
            return Err(EncodeError::ExceededCapacity);
        }
        // Fits: MAX_MESSAGE_LENGTH < u16::MAX
        let declared = length as u16;
        self.started = true;

        let first = self.buffer.read(1).first().copied();
        if length <= 1 {
            trace!("Encode SF id={:?} length={}", self.id, length);
            Ok(Frame::single(self.id, declared, first))
        } else {
            trace!("Encode FF id={:?} length={}", self.id, length);
            self.state = CodecState::Cts;
            Ok(Frame::first(self.id, declared, unwrap!(first)))
        }
    }

    fn encode_consecutive_frame(&mut self) -> Frame {
        let seq = self.seq;
        let frame = Frame::consecutive(seq, self.buffer.read(CF_DATA_LENGTH));
        self.seq = seq.next();
        trace!("Encode CF seq={:?} cursor={}", seq, self.buffer.cursor());
        frame
    }

    pub fn reset(&mut self) {
        self.status = TxStatus::Idle;
        self.state = CodecState::Init;
        self.seq = SequenceNumber::START;
        self.started = false;
        self.buffer.clear();
    }
}

impl Default for TxEngine {
    fn default() -> Self {
        Self::new()
    }
}
