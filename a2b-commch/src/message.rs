//! Application messages and their fixed-capacity storage

use core::cmp::min;

use crate::core::MessageId;
use crate::format::MAX_MESSAGE_LENGTH;

/// Application message
///
/// A transmitted message is copied into the transport on submission. A received message borrows
/// the transport buffer and is only valid within the event callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Message<'a> {
    pub id: MessageId,
    pub payload: &'a [u8],
}

impl<'a> Message<'a> {
    pub fn new(id: MessageId, payload: &'a [u8]) -> Self {
        Self { id, payload }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CapacityExceeded;

/// Message storage with a declared length and a transfer cursor
///
/// The cursor counts bytes already read out (transmission) or written in (reception).
pub(crate) struct MessageBuffer {
    bytes: [u8; MAX_MESSAGE_LENGTH],
    length: usize,
    cursor: usize,
}

impl MessageBuffer {
    pub const CAPACITY: usize = MAX_MESSAGE_LENGTH;

    pub const fn new() -> Self {
        Self {
            bytes: [0; MAX_MESSAGE_LENGTH],
            length: 0,
            cursor: 0,
        }
    }

    /// Copies `data` in and rewinds the cursor.
    pub fn load(&mut self, data: &[u8]) -> Result<(), CapacityExceeded> {
        let target = self.bytes.get_mut(..data.len()).ok_or(CapacityExceeded)?;
        target.copy_from_slice(data);
        self.length = data.len();
        self.cursor = 0;
        Ok(())
    }

    /// Prepares reception of a `length`-byte message.
    pub fn declare(&mut self, length: usize) -> Result<(), CapacityExceeded> {
        if length > Self::CAPACITY {
            return Err(CapacityExceeded);
        }
        self.length = length;
        self.cursor = 0;
        Ok(())
    }

    /// Reads up to `max` bytes at the cursor and advances it.
    pub fn read(&mut self, max: usize) -> &[u8] {
        let start = self.cursor;
        let end = start + min(max, self.remaining());
        self.cursor = end;
        &self.bytes[start..end]
    }

    /// Appends the part of `data` that fits the declared length and advances the cursor.
    /// Returns the number of bytes taken.
    pub fn append(&mut self, data: &[u8]) -> usize {
        let taken = min(data.len(), self.remaining());
        self.bytes[self.cursor..self.cursor + taken].copy_from_slice(&data[..taken]);
        self.cursor += taken;
        taken
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.length - self.cursor
    }

    pub fn is_complete(&self) -> bool {
        self.cursor == self.length
    }

    /// The whole declared message, regardless of the cursor
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.length]
    }

    /// Resets the cursor, keeping the content readable.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub fn clear(&mut self) {
        self.length = 0;
        self.cursor = 0;
    }
}
