//! Parsed Commands
//!
//! Both framing modes converge on one [`Command`]: a dispatch key plus the
//! argument bytes that followed it.
//!
//! ## Keys
//!
//! - ASCII lines are keyed by their `<NAMESPACE>.<VERB>` token, e.g. `PQ.ENQ`.
//! - Binary frames are keyed by a [`TypeId`]: zero or more `0xFF` extension
//!   bytes followed by one terminal byte in `0x01..=0xFE`.
//!
//! ```text
//!   0x41            one-byte id
//!   0xFF 0x41       two-byte (extended) id
//!   0xFF 0xFF 0x02  three-byte id
//! ```

use crate::protocol::status::{PacketError, PacketResult};
use bytes::Bytes;
use std::fmt;

/// Longest accepted type identifier, in bytes.
pub const MAX_TYPE_ID_LEN: usize = 4;

/// Extension byte that lengthens a type identifier.
pub const TYPE_ID_EXTEND: u8 = 0xFF;

/// A validated binary type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId {
    bytes: [u8; MAX_TYPE_ID_LEN],
    len: u8,
}

impl TypeId {
    /// Validates `bytes` against the `[0xFF]*[0x01-0xFE]` grammar.
    pub fn new(bytes: &[u8]) -> PacketResult<Self> {
        if bytes.is_empty() || bytes.len() > MAX_TYPE_ID_LEN {
            return Err(PacketError::InvalidTypeId);
        }

        let (last, prefix) = match bytes.split_last() {
            Some(split) => split,
            None => return Err(PacketError::InvalidTypeId),
        };
        if *last == 0x00 || *last == TYPE_ID_EXTEND {
            return Err(PacketError::InvalidTypeId);
        }
        if prefix.iter().any(|&b| b != TYPE_ID_EXTEND) {
            return Err(PacketError::InvalidTypeId);
        }

        let mut id = [0u8; MAX_TYPE_ID_LEN];
        id[..bytes.len()].copy_from_slice(bytes);
        Ok(Self {
            bytes: id,
            len: bytes.len() as u8,
        })
    }

    /// Shorthand for a single-byte identifier.
    pub fn single(byte: u8) -> PacketResult<Self> {
        Self::new(&[byte])
    }

    /// Reads the identifier at the start of a frame.
    ///
    /// Returns the identifier and the number of bytes it occupies.
    pub fn read_prefix(frame: &[u8]) -> PacketResult<(Self, usize)> {
        for (i, &byte) in frame.iter().enumerate() {
            match byte {
                0x00 => return Err(PacketError::InvalidTypeId),
                TYPE_ID_EXTEND => {
                    if i + 1 >= MAX_TYPE_ID_LEN {
                        return Err(PacketError::InvalidTypeId);
                    }
                }
                _ => return Self::new(&frame[..=i]).map(|id| (id, i + 1)),
            }
        }
        // Empty frame, or the frame ended inside the 0xFF prefix
        Err(PacketError::InvalidPacket)
    }

    /// The identifier bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Number of bytes in the identifier.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Always false; identifiers hold at least one byte.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in self.as_bytes() {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// The key a command is dispatched on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CommandKey {
    /// ASCII `<NAMESPACE>.<VERB>` token
    Name(String),
    /// Binary type identifier
    TypeId(TypeId),
}

impl CommandKey {
    pub fn name(name: impl Into<String>) -> Self {
        CommandKey::Name(name.into())
    }

    pub fn type_id(id: TypeId) -> Self {
        CommandKey::TypeId(id)
    }

    /// Error reported when this key has no registered entry.
    pub fn no_match_error(&self) -> PacketError {
        match self {
            CommandKey::Name(_) => PacketError::NoCommandNameMatch,
            CommandKey::TypeId(_) => PacketError::NoTypeIdMatch,
        }
    }
}

impl fmt::Display for CommandKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKey::Name(name) => write!(f, "{}", name),
            CommandKey::TypeId(id) => write!(f, "{}", id),
        }
    }
}

/// A parsed request: dispatch key plus argument payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub key: CommandKey,
    pub payload: Bytes,
}

impl Command {
    pub fn new(key: CommandKey, payload: impl Into<Bytes>) -> Self {
        Self {
            key,
            payload: payload.into(),
        }
    }

    /// A named command with no arguments.
    pub fn named(name: &str) -> Self {
        Self::new(CommandKey::name(name), Bytes::new())
    }

    /// The payload interpreted as ASCII argument text.
    pub fn args(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}
