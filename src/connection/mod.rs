//! Session Module
//!
//! This module runs the command loop over a byte stream. The same loop
//! serves a serial device node and TCP clients; it only needs
//! `AsyncRead + AsyncWrite`.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │            Device node  /  TCP listener                     │
//! │                    (main.rs)                                │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │
//!                        │ open() / accept()
//!                        ▼
//!           ┌────────────────────────┐
//!           │  One stream at a time  │
//!           └────────────┬───────────┘
//!                        │
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Session                                 │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │ Read bytes  │───>│ Frame input │───>│ Execute cmd │      │
//! │  └─────────────┘    └─────────────┘    └─────────────┘      │
//! │                                               │             │
//! │                                               ▼             │
//! │                                      ┌─────────────┐        │
//! │                                      │ Send reply  │        │
//! │                                      └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sessions run sequentially against one [`Device`](crate::commands::Device);
//! the device is borrowed mutably for the lifetime of a session, so two
//! sessions can never interleave commands.
//!
//! ## Example
//!
//! ```ignore
//! use packetcmd::commands::Device;
//! use packetcmd::connection::{handle_session, SessionStats};
//! use packetcmd::protocol::FramingConfig;
//! use std::sync::Arc;
//!
//! let mut device = Device::default();
//! let stats = Arc::new(SessionStats::new());
//!
//! loop {
//!     let (stream, addr) = listener.accept().await?;
//!     handle_session(stream, addr.to_string(), &mut device, FramingConfig::default(), Arc::clone(&stats)).await?;
//! }
//! ```

pub mod handler;

// Re-export commonly used types
pub use handler::{handle_session, ConnectionError, Session, SessionStats};
