//! Fixed-size packets.

use crate::protocol::{PacketError, PacketResult};
use std::fmt;

/// Largest payload a packet can hold, in bytes.
pub const DATA_BUFFER_SIZE: usize = 32;

/// Packet flag: the payload is a query awaiting an answer.
pub const FLAG_IS_QUERY: u8 = 0x01;

/// A bounded byte payload with an explicit length.
///
/// Packets are plain values: the queue copies them into preallocated slots
/// and copies them back out on removal. The length is tracked separately, so
/// payloads may contain any byte value including `0x00`. A flag byte
/// travels with the payload through the queue untouched.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Packet {
    data: [u8; DATA_BUFFER_SIZE],
    length: usize,
    flags: u8,
}

impl Packet {
    /// An empty packet.
    pub const fn empty() -> Self {
        Self {
            data: [0u8; DATA_BUFFER_SIZE],
            length: 0,
            flags: 0,
        }
    }

    /// Copies `payload` into a new packet.
    ///
    /// Fails with `PacketIndexOutOfBounds` if the payload does not fit.
    pub fn from_slice(payload: &[u8]) -> PacketResult<Self> {
        if payload.len() > DATA_BUFFER_SIZE {
            return Err(PacketError::PacketIndexOutOfBounds);
        }
        let mut packet = Self::empty();
        packet.data[..payload.len()].copy_from_slice(payload);
        packet.length = payload.len();
        Ok(packet)
    }

    /// Replaces the flag byte.
    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    #[inline]
    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn is_query(&self) -> bool {
        self.flags & FLAG_IS_QUERY != 0
    }

    /// The payload bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.length]
    }

    /// Payload length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

impl Default for Packet {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("length", &self.length)
            .field("flags", &format_args!("{:#04x}", self.flags))
            .field("data", &String::from_utf8_lossy(self.as_bytes()))
            .finish()
    }
}
