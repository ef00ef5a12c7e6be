//! Command Processing Module
//!
//! This module turns parsed commands into replies. It owns the dispatch
//! table, the built-in handlers and the payload reader binary handlers use
//! to decode their arguments.
//!
//! ## Architecture
//!
//! ```text
//! Serial / TCP bytes
//!       │
//!       ▼
//! ┌─────────────────┐
//! │     Framer      │  (protocol module)
//! └────────┬────────┘
//!          │ Command
//!          ▼
//! ┌─────────────────┐
//! │     Device      │  (this module)
//! │                 │
//! │  - Lookup       │
//! │  - Dispatch     │
//! │  - Reply        │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  PacketQueue    │  (queue module)
//! └─────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `table`: Fixed-capacity [`DispatchTable`] and the [`Handler`] variants
//! - `handler`: Built-in command set and the [`Device`] that runs it
//! - `unpack`: Little-endian [`PayloadReader`] for binary arguments

pub mod handler;
pub mod table;
pub mod unpack;

// Re-export commonly used types
pub use handler::{install_builtins, Device, DeviceConfig, Services, DEFAULT_MAX_COMMANDS};
pub use table::{DispatchEntry, DispatchTable, Handler, HandlerFn, Installer};
pub use unpack::PayloadReader;
