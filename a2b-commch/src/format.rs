//! Mailbox frame format
//!
//! ```text
//!          byte 0            byte 1    byte 2    byte 3
//!  SF  | 1 0 |    id     | length (BE)         | data[0] |
//!  FF  | 0 0 |    id     | length (BE)         | data[0] |
//!  CF  | 0 1 | sequence  | data[n] | data[n+1] | data[n+2] |
//! ```

use a2b_mailbox::payload::{PAYLOAD_LENGTH, Payload};

use crate::core::{MessageId, SequenceNumber};

/// Message capacity of each direction. Messages must be strictly shorter.
pub const MAX_MESSAGE_LENGTH: usize = 1500;

/// Payload bytes carried by a consecutive frame
pub const CF_DATA_LENGTH: usize = PAYLOAD_LENGTH - 1;

pub const PAD_VALUE: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FrameType {
    First = 0,
    Consecutive = 1,
    Single = 2,
}

impl FrameType {
    pub const fn try_from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(FrameType::First),
            1 => Some(FrameType::Consecutive),
            2 => Some(FrameType::Single),
            _ => None,
        }
    }
}

/// First byte of every frame: frame type and message ID or sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HeaderByte(u8);

impl HeaderByte {
    const FRAME_TYPE: u8 = 6;
    const LOW_MASK: u8 = 0x3f;

    pub const fn new(frame_type: FrameType, low_bits: u8) -> Self {
        let type_bits = (frame_type as u8) << Self::FRAME_TYPE;
        Self(type_bits | (low_bits & Self::LOW_MASK))
    }

    /// `None` for the unassigned type code 3
    pub const fn frame_type(&self) -> Option<FrameType> {
        FrameType::try_from_bits(self.0 >> Self::FRAME_TYPE)
    }

    pub const fn message_id(&self) -> MessageId {
        MessageId::from_u8_truncating(self.0)
    }

    pub const fn sequence(&self) -> SequenceNumber {
        SequenceNumber::from_u8_truncating(self.0)
    }
}

impl From<u8> for HeaderByte {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<HeaderByte> for u8 {
    fn from(value: HeaderByte) -> Self {
        value.0
    }
}

/// A single mailbox frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame(Payload);

impl Frame {
    /// Single frame of a message with `length <= 1`
    pub fn single(id: MessageId, length: u16, first: Option<u8>) -> Self {
        Self::with_length(
            HeaderByte::new(FrameType::Single, id.into_u8()),
            length,
            first.unwrap_or(PAD_VALUE),
        )
    }

    pub fn first(id: MessageId, length: u16, first: u8) -> Self {
        Self::with_length(
            HeaderByte::new(FrameType::First, id.into_u8()),
            length,
            first,
        )
    }

    /// Consecutive frame, data beyond `CF_DATA_LENGTH` bytes is not allowed
    pub fn consecutive(sequence: SequenceNumber, data: &[u8]) -> Self {
        assert!(data.len() <= CF_DATA_LENGTH);
        let mut bytes = [PAD_VALUE; PAYLOAD_LENGTH];
        bytes[0] = HeaderByte::new(FrameType::Consecutive, sequence.into_u8()).into();
        bytes[1..1 + data.len()].copy_from_slice(data);
        Self(Payload::new(bytes))
    }

    fn with_length(header: HeaderByte, length: u16, first: u8) -> Self {
        let [length_hi, length_lo] = length.to_be_bytes();
        Self(Payload::new([header.into(), length_hi, length_lo, first]))
    }

    pub fn header(&self) -> HeaderByte {
        HeaderByte::from(self.0[0])
    }

    /// Message length declared by a single or first frame
    pub fn declared_length(&self) -> usize {
        usize::from(u16::from_be_bytes([self.0[1], self.0[2]]))
    }

    /// First message byte carried by a single or first frame
    pub fn first_byte(&self) -> u8 {
        self.0[3]
    }

    /// Data bytes of a consecutive frame, including padding
    pub fn consecutive_data(&self) -> &[u8] {
        &self.0[1..]
    }

    pub fn payload(&self) -> Payload {
        self.0
    }
}

impl From<Payload> for Frame {
    fn from(value: Payload) -> Self {
        Self(value)
    }
}

impl From<[u8; PAYLOAD_LENGTH]> for Frame {
    fn from(value: [u8; PAYLOAD_LENGTH]) -> Self {
        Self(Payload::new(value))
    }
}

impl From<Frame> for Payload {
    fn from(value: Frame) -> Self {
        value.0
    }
}

impl core::ops::Deref for Frame {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
