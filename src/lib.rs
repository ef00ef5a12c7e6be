//! # packetcmd - Serial Command Dispatch and Packet Queueing
//!
//! packetcmd is the command core of a small serial-attached device. A host
//! sends newline-terminated ASCII commands or fixed-size binary frames; the
//! device routes each one through a fixed-capacity dispatch table and
//! answers with a `key: value` reply block. A bounded packet queue holds
//! payloads between commands.
//!
//! ## Features
//!
//! - **Two Framings**: ASCII lines keyed by `<NAMESPACE>.<VERB>` and binary
//!   frames keyed by an extensible type identifier
//! - **Bounded Memory**: The queue and the dispatch table are allocated once
//!   at startup and never grow
//! - **Runtime Registration**: Commands can be added over the wire with
//!   `PCMD.ADDCMD` and the built-in set restored with `PCMD.RESET`
//! - **Async I/O**: The same session loop serves a device node or TCP clients
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              packetcmd                                  │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ Serial node │───>│   Session   │───>│   Framer    │                  │
//! │  │ / Listener  │    │             │    │ ASCII / Bin │                  │
//! │  └─────────────┘    └──────▲──────┘    └──────┬──────┘                  │
//! │                            │                  │ Command                 │
//! │                            │ Reply            ▼                         │
//! │                     ┌──────┴──────────────────────────────────────────┐ │
//! │                     │                   Device                        │ │
//! │                     │  ┌────────────────────┐  ┌────────────────────┐ │ │
//! │                     │  │   DispatchTable    │  │    PacketQueue     │ │ │
//! │                     │  │  (max_commands)    │  │  (queue_capacity)  │ │ │
//! │                     │  └────────────────────┘  └────────────────────┘ │ │
//! │                     └─────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use packetcmd::commands::Device;
//! use packetcmd::protocol::{Framer, FramingConfig};
//!
//! let framer = Framer::new(FramingConfig::default());
//! let mut device = Device::default();
//!
//! device.process(&framer, b"PQ.ENQ hello\n");
//! let reply = device.process(&framer, b"PQ.DEQ\n").unwrap();
//!
//! assert_eq!(
//!     &reply.encode()[..],
//!     &b"pqs: 0\npkt.length: 5\npkt.data: hello\n...\n"[..]
//! );
//! ```
//!
//! ## Status Codes
//!
//! | Code | Name |
//! |------|------|
//! | 0 | `SUCCESS` |
//! | 1 | `NO_PACKET_RECEIVED` |
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
//!
//! ## Module Overview
//!
//! - [`protocol`]: Status codes, command model, parsers and reply encoding
//! - [`queue`]: Fixed-size packets and the bounded packet queue
//! - [`commands`]: Dispatch table, built-in handlers and the device
//! - [`connection`]: The session loop over a byte stream
//!
//! ## Design Highlights
//!
//! ### Run to Completion
//!
//! A session holds `&mut Device`. Each frame is parsed, dispatched and
//! answered before the next read, so no two commands ever interleave and
//! neither structure needs a lock.
//!
//! ### Tagged Handlers
//!
//! Table entries hold a small enum of handler kinds instead of boxed
//! closures. Only the add and reset handlers may touch the table, and the
//! table runs those itself.

pub mod commands;
pub mod connection;
pub mod protocol;
pub mod queue;

// Re-export commonly used types for convenience
pub use commands::{Device, DeviceConfig, DispatchTable, Handler};
pub use connection::{handle_session, ConnectionError, Session, SessionStats};
pub use protocol::{Command, CommandKey, FramingConfig, FramingMode, PacketError, Reply, Status};
pub use queue::{Packet, PacketQueue};

/// The default address the TCP transport listens on
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:7878";

/// Version of packetcmd
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
