//! Serial Protocol Implementation
//!
//! This module covers everything between raw bytes and a dispatchable
//! command, and between a handler's result and the reply the client reads.
//!
//! ## Modules
//!
//! - `status`: Canonical status codes and the `PacketError` taxonomy
//! - `command`: The `Command` model shared by both framing modes
//! - `parser`: ASCII line parser, binary frame parser and the stream framer
//! - `reply`: The `key: value` reply block encoder
//!
//! ## Example
//!
//! ```
//! use packetcmd::protocol::{parse_line, Reply, Status};
//!
//! let cmd = parse_line(b"PQ.ENQ hello\n").unwrap().unwrap();
//! assert_eq!(cmd.key.to_string(), "PQ.ENQ");
//!
//! let reply = Reply::queue(Status::Success);
//! assert_eq!(&reply.encode()[..], b"pqs: 0\n...\n");
//! ```

pub mod command;
pub mod parser;
pub mod reply;
pub mod status;

// Re-export commonly used types for convenience
pub use command::{Command, CommandKey, TypeId, MAX_TYPE_ID_LEN};
pub use parser::{
    parse_frame, parse_line, Framer, FramingConfig, FramingMode, DEFAULT_FRAME_SIZE,
    DEFAULT_INPUT_BUFFER_SIZE,
};
pub use reply::{field, FieldValue, Reply, Scope};
pub use status::{PacketError, PacketResult, Status};
