//! Binary payload unpacking.
//!
//! Binary handlers read their arguments with a [`PayloadReader`], a cursor
//! over the bytes that follow the type identifier. Multi-byte values are
//! little-endian, floats are IEEE-754. A read past the end fails with
//! `ERROR_PACKET_INDEX_OUT_OF_BOUNDS` and does not move the cursor.

use crate::protocol::{PacketError, PacketResult};
use bytes::Buf;

/// A forward-only cursor over a frame payload.
#[derive(Debug, Clone)]
pub struct PayloadReader<'a> {
    buf: &'a [u8],
}

impl<'a> PayloadReader<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self { buf: payload }
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn ensure(&self, n: usize) -> PacketResult<()> {
        if self.buf.remaining() < n {
            Err(PacketError::PacketIndexOutOfBounds)
        } else {
            Ok(())
        }
    }

    pub fn unpack_u8(&mut self) -> PacketResult<u8> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn unpack_i8(&mut self) -> PacketResult<i8> {
        self.ensure(1)?;
        Ok(self.buf.get_i8())
    }

    pub fn unpack_u16(&mut self) -> PacketResult<u16> {
        self.ensure(2)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn unpack_i16(&mut self) -> PacketResult<i16> {
        self.ensure(2)?;
        Ok(self.buf.get_i16_le())
    }

    pub fn unpack_u32(&mut self) -> PacketResult<u32> {
        self.ensure(4)?;
        Ok(self.buf.get_u32_le())
    }

    pub fn unpack_i32(&mut self) -> PacketResult<i32> {
        self.ensure(4)?;
        Ok(self.buf.get_i32_le())
    }

    pub fn unpack_u64(&mut self) -> PacketResult<u64> {
        self.ensure(8)?;
        Ok(self.buf.get_u64_le())
    }

    pub fn unpack_i64(&mut self) -> PacketResult<i64> {
        self.ensure(8)?;
        Ok(self.buf.get_i64_le())
    }

    pub fn unpack_f32(&mut self) -> PacketResult<f32> {
        self.ensure(4)?;
        Ok(self.buf.get_f32_le())
    }

    pub fn unpack_f64(&mut self) -> PacketResult<f64> {
        self.ensure(8)?;
        Ok(self.buf.get_f64_le())
    }

    /// Reads `len` raw bytes.
    pub fn unpack_char_array(&mut self, len: usize) -> PacketResult<&'a [u8]> {
        self.ensure(len)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    /// Reads everything that is left.
    pub fn rest(&mut self) -> &'a [u8] {
        let rest = self.buf;
        self.buf = &[];
        rest
    }
}
