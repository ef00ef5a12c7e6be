//! Status Codes
//!
//! Every reply carries exactly one signed status code. `0` is success, the
//! one positive code means "nothing to do", and every negative code names a
//! specific failure.
//!
//! | Code | Name |
//! |-----:|------|
//! | 1 | `NO_PACKET_RECEIVED` |
//! | 0 | `SUCCESS` |
//! | -1 | `ERROR_EXCEDED_MAX_COMMANDS` |
//! | -2 | `ERROR_NO_COMMAND_NAME_MATCH` |
//! | -3 | `ERROR_INVALID_PACKET` |
//! | -4 | `ERROR_INVALID_TYPE_ID` |
//! | -5 | `ERROR_NO_TYPE_ID_MATCH` |
//! | -6 | `ERROR_NULL_HANDLER_FUNCTION_POINTER` |
//! | -7 | `ERROR_PACKET_INDEX_OUT_OF_BOUNDS` |
//! | -8 | `ERROR_INPUT_BUFFER_OVERRUN` |
//! | -9 | `ERROR_QUEUE_OVERFLOW` |
//! | -10 | `ERROR_QUEUE_UNDERFLOW` |

use std::fmt;
use thiserror::Error;

/// A status code as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum Status {
    NoPacketReceived = 1,
    Success = 0,
    ExceededMaxCommands = -1,
    NoCommandNameMatch = -2,
    InvalidPacket = -3,
    InvalidTypeId = -4,
    NoTypeIdMatch = -5,
    NullHandlerFunctionPointer = -6,
    PacketIndexOutOfBounds = -7,
    InputBufferOverrun = -8,
    QueueOverflow = -9,
    QueueUnderflow = -10,
}

impl Status {
    /// Every status, in wire order.
    pub const ALL: [Status; 12] = [
        Status::NoPacketReceived,
        Status::Success,
        Status::ExceededMaxCommands,
        Status::NoCommandNameMatch,
        Status::InvalidPacket,
        Status::InvalidTypeId,
        Status::NoTypeIdMatch,
        Status::NullHandlerFunctionPointer,
        Status::PacketIndexOutOfBounds,
        Status::InputBufferOverrun,
        Status::QueueOverflow,
        Status::QueueUnderflow,
    ];

    /// The signed integer sent in the status field.
    #[inline]
    pub fn code(self) -> i8 {
        self as i8
    }

    /// Looks up a status by its wire code.
    pub fn from_code(code: i8) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.code() == code)
    }

    /// The canonical upper-case name of this status.
    pub fn name(self) -> &'static str {
        match self {
            Status::NoPacketReceived => "NO_PACKET_RECEIVED",
            Status::Success => "SUCCESS",
            Status::ExceededMaxCommands => "ERROR_EXCEDED_MAX_COMMANDS",
            Status::NoCommandNameMatch => "ERROR_NO_COMMAND_NAME_MATCH",
            Status::InvalidPacket => "ERROR_INVALID_PACKET",
            Status::InvalidTypeId => "ERROR_INVALID_TYPE_ID",
            Status::NoTypeIdMatch => "ERROR_NO_TYPE_ID_MATCH",
            Status::NullHandlerFunctionPointer => "ERROR_NULL_HANDLER_FUNCTION_POINTER",
            Status::PacketIndexOutOfBounds => "ERROR_PACKET_INDEX_OUT_OF_BOUNDS",
            Status::InputBufferOverrun => "ERROR_INPUT_BUFFER_OVERRUN",
            Status::QueueOverflow => "ERROR_QUEUE_OVERFLOW",
            Status::QueueUnderflow => "ERROR_QUEUE_UNDERFLOW",
        }
    }

    /// Returns true for `SUCCESS`.
    pub fn is_success(self) -> bool {
        self == Status::Success
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<PacketError> for Status {
    fn from(err: PacketError) -> Self {
        err.status()
    }
}

/// Failures that are reported to the client through the status field.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PacketError {
    /// The dispatch table is full
    #[error("exceeded maximum number of commands")]
    ExceededMaxCommands,

    /// No entry is registered under the requested name
    #[error("no command matches the given name")]
    NoCommandNameMatch,

    /// The frame was malformed or had the wrong length
    #[error("invalid packet")]
    InvalidPacket,

    /// The type identifier does not follow `[0xFF]*[0x01-0xFE]`,
    /// or the key is already registered
    #[error("invalid type id")]
    InvalidTypeId,

    /// No entry (and no default handler) matches the type identifier
    #[error("no command matches the given type id")]
    NoTypeIdMatch,

    /// The matched entry has no handler bound to it
    #[error("command has no handler bound")]
    NullHandler,

    /// A read went past the end of a payload, or a payload is too long
    #[error("packet index out of bounds")]
    PacketIndexOutOfBounds,

    /// Unframed input outgrew the receive buffer
    #[error("input buffer overrun")]
    InputBufferOverrun,

    /// The queue is at capacity
    #[error("queue overflow")]
    QueueOverflow,

    /// The queue is empty
    #[error("queue underflow")]
    QueueUnderflow,
}

impl PacketError {
    /// The wire status for this error.
    pub fn status(self) -> Status {
        match self {
            PacketError::ExceededMaxCommands => Status::ExceededMaxCommands,
            PacketError::NoCommandNameMatch => Status::NoCommandNameMatch,
            PacketError::InvalidPacket => Status::InvalidPacket,
            PacketError::InvalidTypeId => Status::InvalidTypeId,
            PacketError::NoTypeIdMatch => Status::NoTypeIdMatch,
            PacketError::NullHandler => Status::NullHandlerFunctionPointer,
            PacketError::PacketIndexOutOfBounds => Status::PacketIndexOutOfBounds,
            PacketError::InputBufferOverrun => Status::InputBufferOverrun,
            PacketError::QueueOverflow => Status::QueueOverflow,
            PacketError::QueueUnderflow => Status::QueueUnderflow,
        }
    }
}

/// Result type for protocol operations.
pub type PacketResult<T> = Result<T, PacketError>;
