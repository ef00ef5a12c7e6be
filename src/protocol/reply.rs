//! Reply Blocks
//!
//! Every command is answered with one block of `key: value` lines followed
//! by a terminator line of exactly three dots:
//!
//! ```text
//! pqs: 0
//! pkt.length: 5
//! pkt.data: test1
//! ...
//! ```
//!
//! The first line is always the status. Its key depends on which subsystem
//! answered: `pqs` for the packet queue, `pcs` for the command table (and
//! for framing and routing errors). Numbers are written in base 10 and text
//! is written verbatim, without escaping.

use crate::protocol::status::{PacketError, Status};
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// Terminator line that closes every reply block.
pub const REPLY_TERMINATOR: &[u8] = b"...";

/// Field names used by the built-in handlers.
pub mod field {
    pub const PACKET_LENGTH: &str = "pkt.length";
    pub const PACKET_DATA: &str = "pkt.data";
    pub const SIZE: &str = "size";
    pub const COMMAND_NAME: &str = "cmd.name";
    pub const COMMAND_COUNT: &str = "cmd.count";
}

/// Which subsystem produced the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Packet queue operations (`pqs`)
    Queue,
    /// Command table operations, framing and routing (`pcs`)
    Command,
}

impl Scope {
    /// The status field key.
    pub fn status_key(self) -> &'static str {
        match self {
            Scope::Queue => "pqs",
            Scope::Command => "pcs",
        }
    }
}

/// A reply field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Float(f32),
    Text(Bytes),
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Int(n)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        FieldValue::Int(n as i64)
    }
}

impl From<usize> for FieldValue {
    fn from(n: usize) -> Self {
        FieldValue::Int(n as i64)
    }
}

impl From<f32> for FieldValue {
    fn from(x: f32) -> Self {
        FieldValue::Float(x)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(Bytes::from(s))
    }
}

impl From<Bytes> for FieldValue {
    fn from(b: Bytes) -> Self {
        FieldValue::Text(b)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(n) => write!(f, "{}", n),
            FieldValue::Float(x) => write!(f, "{}", x),
            FieldValue::Text(b) => write!(f, "{}", String::from_utf8_lossy(b)),
        }
    }
}

/// One reply: a status plus zero or more named fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    scope: Scope,
    status: Status,
    fields: Vec<(&'static str, FieldValue)>,
}

impl Reply {
    pub fn new(scope: Scope, status: Status) -> Self {
        Self {
            scope,
            status,
            fields: Vec::new(),
        }
    }

    /// A queue reply (`pqs`).
    pub fn queue(status: Status) -> Self {
        Self::new(Scope::Queue, status)
    }

    /// A command-table reply (`pcs`).
    pub fn command(status: Status) -> Self {
        Self::new(Scope::Command, status)
    }

    /// Successful command-table reply.
    pub fn ok() -> Self {
        Self::command(Status::Success)
    }

    /// Command-table reply carrying an error status.
    pub fn command_error(err: PacketError) -> Self {
        Self::command(err.status())
    }

    /// Builds a reply from a result, using `Success` on `Ok`.
    pub fn from_result<T>(scope: Scope, result: &Result<T, PacketError>) -> Self {
        match result {
            Ok(_) => Self::new(scope, Status::Success),
            Err(e) => Self::new(scope, e.status()),
        }
    }

    /// Appends a field.
    pub fn with(mut self, key: &'static str, value: impl Into<FieldValue>) -> Self {
        self.fields.push((key, value.into()));
        self
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Looks up a field by key.
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Encodes the reply block.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(64);
        self.encode_into(&mut buf);
        buf.freeze()
    }

    /// Encodes the reply block into an existing buffer.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        put_line(buf, self.scope.status_key(), |buf| {
            buf.put_slice(self.status.code().to_string().as_bytes())
        });

        for (key, value) in &self.fields {
            put_line(buf, key, |buf| match value {
                FieldValue::Int(n) => buf.put_slice(n.to_string().as_bytes()),
                FieldValue::Float(x) => buf.put_slice(x.to_string().as_bytes()),
                FieldValue::Text(b) => buf.put_slice(b),
            });
        }

        buf.put_slice(REPLY_TERMINATOR);
        buf.put_u8(b'\n');
    }
}

fn put_line(buf: &mut BytesMut, key: &str, value: impl FnOnce(&mut BytesMut)) {
    buf.put_slice(key.as_bytes());
    buf.put_slice(b": ");
    value(buf);
    buf.put_u8(b'\n');
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.scope.status_key(), self.status)?;
        for (key, value) in &self.fields {
            write!(f, ", {}: {}", key, value)?;
        }
        Ok(())
    }
}
