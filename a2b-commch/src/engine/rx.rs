use crate::core::{MessageId, NodeAddr, SequenceNumber};
use crate::engine::CodecState;
use crate::event::{Event, EventKind};
use crate::format::{Frame, FrameType, MAX_MESSAGE_LENGTH};
use crate::message::{Message, MessageBuffer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxStatus {
    Idle,
    /// A segmented message is being reassembled
    Busy,
}

/// Reassembly state machine
///
/// Rules:
/// 1. A single frame (SF) always restarts reception and completes a message immediately.
///    It may declare a length of 0 or 1 only.
/// 2. A first frame (FF) always restarts reception and enters `Cts`.
///    It must declare a length of at least 2.
/// 3. A length of `MAX_MESSAGE_LENGTH` or more is reported as `RxExceededCapacity`.
/// 4. A consecutive frame (CF) is accepted in `Cts` only, from the node that sent the FF, with
///    the expected sequence number. A wrong sequence number is reported as `RxSnError`.
/// 5. Any other frame is reported as `RxInvalidFrame`.
/// 6. Every error drops the partial message. A partial message is never delivered.
/// 7. CF bytes beyond the declared length are padding.
///
/// The delivered message borrows the engine buffer. It stays intact until the next SF or FF.
pub struct RxEngine {
    status: RxStatus,
    state: CodecState,
    seq: SequenceNumber,
    id: MessageId,
    source: NodeAddr,
    buffer: MessageBuffer,
}

impl RxEngine {
    pub const fn new() -> Self {
        Self {
            status: RxStatus::Idle,
            state: CodecState::Init,
            seq: SequenceNumber::START,
            id: MessageId::from_u8_truncating(0),
            source: NodeAddr::MASTER,
            buffer: MessageBuffer::new(),
        }
    }

    pub fn status(&self) -> RxStatus {
        self.status
    }

    pub fn state(&self) -> CodecState {
        self.state
    }

    /// Sequence number expected in the next consecutive frame
    pub fn sequence(&self) -> SequenceNumber {
        self.seq
    }

    /// Number of message bytes received so far
    pub fn cursor(&self) -> usize {
        self.buffer.cursor()
    }

    /// Processes a single frame received from `source`.
    ///
    /// Returns an event when the frame completes a message or breaks reception.
    pub fn decode_frame(&mut self, frame: Frame, source: NodeAddr) -> Option<Event<'_>> {
        let header = frame.header();
        match (header.frame_type(), self.state) {
            (Some(FrameType::Single), _) => self.single_frame(frame, source),
            (Some(FrameType::First), _) => self.first_frame(frame, source),
            (Some(FrameType::Consecutive), CodecState::Cts) => {
                self.consecutive_frame(frame, source)
            }
            (_, _) => {
                warn!("Unexpected {:?} from {:?}", header, source);
                self.fail(EventKind::RxInvalidFrame, source)
            }
        }
    }

    fn single_frame(&mut self, frame: Frame, source: NodeAddr) -> Option<Event<'_>> {
        self.restart();
        let length = frame.declared_length();
        if length >= MAX_MESSAGE_LENGTH {
            warn!("SF from {:?} declares {} bytes", source, length);
            return self.fail(EventKind::RxExceededCapacity, source);
        }
        if length > 1 {
            warn!("SF from {:?} declares {} bytes", source, length);
            return self.fail(EventKind::RxInvalidFrame, source);
        }

        unwrap!(self.buffer.declare(length));
        self.buffer.append(&[frame.first_byte()]);
        self.id = frame.header().message_id();
        self.source = source;
        self.complete()
    }

    fn first_frame(&mut self, frame: Frame, source: NodeAddr) -> Option<Event<'_>> {
        self.restart();
        let length = frame.declared_length();
        if length >= MAX_MESSAGE_LENGTH {
            warn!("FF from {:?} declares {} bytes", source, length);
            return self.fail(EventKind::RxExceededCapacity, source);
        }
        if length < 2 {
            warn!("FF from {:?} declares {} bytes", source, length);
            return self.fail(EventKind::RxInvalidFrame, source);
        }

        unwrap!(self.buffer.declare(length));
        self.buffer.append(&[frame.first_byte()]);
        self.id = frame.header().message_id();
        self.source = source;
        self.state = CodecState::Cts;
        self.status = RxStatus::Busy;
        trace!("FF id={:?} length={} from {:?}", self.id, length, source);
        None
    }

    fn consecutive_frame(&mut self, frame: Frame, source: NodeAddr) -> Option<Event<'_>> {
        if source != self.source {
            warn!("CF from {:?}, receiving from {:?}", source, self.source);
            return self.fail(EventKind::RxInvalidFrame, source);
        }

        let seq = frame.header().sequence();
        if seq != self.seq {
            warn!("CF seq={:?}, expected {:?}", seq, self.seq);
            return self.fail(EventKind::RxSnError, source);
        }

        self.seq = seq.next();
        self.buffer.append(frame.consecutive_data());
        if self.buffer.is_complete() {
            self.complete()
        } else {
            None
        }
    }

    fn complete(&mut self) -> Option<Event<'_>> {
        self.state = CodecState::Init;
        self.status = RxStatus::Idle;
        self.seq = SequenceNumber::START;
        self.buffer.rewind();
        debug!(
            "Received message id={:?} length={} from {:?}",
            self.id,
            self.buffer.len(),
            self.source
        );

        let message = Message::new(self.id, self.buffer.as_slice());
        Some(Event::new(EventKind::RxMsg, self.source, Some(message)))
    }

    fn fail(&mut self, kind: EventKind, source: NodeAddr) -> Option<Event<'_>> {
        self.reset();
        Some(Event::new(kind, source, None))
    }

    // An SF or FF ends any message in progress
    fn restart(&mut self) {
        if self.state == CodecState::Cts {
            warn!(
                "Abandon message id={:?} from {:?} at {}/{} bytes",
                self.id,
                self.source,
                self.buffer.cursor(),
                self.buffer.len()
            );
        }
        self.reset();
    }

    pub fn reset(&mut self) {
        self.status = RxStatus::Idle;
        self.state = CodecState::Init;
        self.seq = SequenceNumber::START;
        self.buffer.clear();
    }
}

impl Default for RxEngine {
    fn default() -> Self {
        Self::new()
    }
}
