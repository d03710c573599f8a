//! Raw mailbox payload

/// Number of data bytes a mailbox moves in one transfer
pub const PAYLOAD_LENGTH: usize = 4;

/// Content of the four mailbox data registers `B0..B3`
///
/// A mailbox transfer always carries the full four bytes; unused trailing bytes are padding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Payload([u8; PAYLOAD_LENGTH]);

impl Payload {
    pub const fn new(bytes: [u8; PAYLOAD_LENGTH]) -> Self {
        Self(bytes)
    }

    pub const fn into_bytes(self) -> [u8; PAYLOAD_LENGTH] {
        self.0
    }
}

impl From<[u8; PAYLOAD_LENGTH]> for Payload {
    fn from(value: [u8; PAYLOAD_LENGTH]) -> Self {
        Self(value)
    }
}

impl From<Payload> for [u8; PAYLOAD_LENGTH] {
    fn from(value: Payload) -> Self {
        value.0
    }
}

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidLength;

impl TryFrom<&[u8]> for Payload {
    type Error = InvalidLength;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; PAYLOAD_LENGTH] = value.try_into().map_err(|_| InvalidLength)?;
        Ok(Self(bytes))
    }
}

impl core::ops::Deref for Payload {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl core::ops::DerefMut for Payload {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
