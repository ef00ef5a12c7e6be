//! Session Handler Module
//!
//! A session is one command loop over a byte stream: a serial device node,
//! a TCP client, or an in-memory pipe in tests. The session owns the receive
//! buffer and borrows the [`Device`], so the queue and the command table
//! outlive any single session.
//!
//! ## Session Lifecycle
//!
//! ```text
//! 1. Stream opened (device node or accepted client)
//!        │
//!        ▼
//! 2. Session created with &mut Device
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Split frames off buffer │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Parse + dispatch        │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Write reply block       │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Read more bytes         │ │
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. End of stream / error
//! ```
//!
//! ## Buffer Management
//!
//! Bytes accumulate in a `BytesMut` until the framer can split off a whole
//! line or frame. The framer enforces the input buffer limit; an overrun is
//! answered with a single `pcs: -8`, the rest of the offending line is
//! dropped, and the session keeps going. Every buffered
//! command is answered before the next read, so commands never interleave.

use crate::commands::Device;
use crate::protocol::{Framer, FramingConfig, Reply};
use bytes::BytesMut;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, info, trace, warn};

/// Bytes reserved ahead of each read
const READ_CHUNK_SIZE: usize = 256;

/// Statistics shared by every session of one process
#[derive(Debug, Default)]
pub struct SessionStats {
    /// Total number of sessions opened
    pub sessions_opened: AtomicU64,
    /// Total commands answered
    pub commands_processed: AtomicU64,
    /// Input buffer overruns
    pub framing_errors: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn framing_error(&self) {
        self.framing_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written.fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Runs the command loop for one stream.
pub struct Session<'a, S> {
    /// The byte stream, buffered for writes
    stream: BufWriter<S>,

    /// Peer label (for logging)
    peer: String,

    /// Bytes received but not yet framed
    buffer: BytesMut,

    framer: Framer,

    /// Persistent device state
    device: &'a mut Device,

    stats: Arc<SessionStats>,
}

impl<'a, S> Session<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        peer: impl Into<String>,
        device: &'a mut Device,
        framing: FramingConfig,
        stats: Arc<SessionStats>,
    ) -> Self {
        stats.session_opened();

        Self {
            stream: BufWriter::new(stream),
            peer: peer.into(),
            buffer: BytesMut::with_capacity(framing.input_buffer_size + READ_CHUNK_SIZE),
            framer: Framer::new(framing),
            device,
            stats,
        }
    }

    /// Runs until the stream ends or fails.
    ///
    /// A clean end of stream is reported as `ClientDisconnected`.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(peer = %self.peer, mode = ?self.framer.mode(), "session opened");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(peer = %self.peer, "session closed"),
            Err(ConnectionError::ClientDisconnected) => {
                info!(peer = %self.peer, "peer disconnected")
            }
            Err(e) => warn!(peer = %self.peer, error = %e, "session error"),
        }

        result
    }

    /// The frame-dispatch-reply loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some(reply) = self.next_reply() {
                self.send_reply(&reply).await?;
            }

            self.read_more_data().await?;
        }
    }

    /// Processes buffered input up to the next reply.
    ///
    /// Returns `None` once the buffer holds no complete frame.
    fn next_reply(&mut self) -> Option<Reply> {
        loop {
            match self.framer.next_frame(&mut self.buffer) {
                Ok(Some(frame)) => {
                    trace!(
                        peer = %self.peer,
                        len = frame.len(),
                        remaining = self.buffer.len(),
                        "framed input"
                    );
                    if let Some(reply) = self.device.process(&self.framer, &frame) {
                        self.stats.command_processed();
                        return Some(reply);
                    }
                }
                Ok(None) => return None,
                Err(e) => {
                    warn!(
                        peer = %self.peer,
                        error = %e,
                        remaining = self.buffer.len(),
                        "input discarded"
                    );
                    self.stats.framing_error();
                    return Some(Reply::command_error(e));
                }
            }
        }
    }

    /// Reads more bytes into the buffer.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        self.buffer.reserve(READ_CHUNK_SIZE);

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;

        if n == 0 {
            if self.buffer.is_empty() {
                return Err(ConnectionError::ClientDisconnected);
            } else {
                // Partial frame in buffer
                return Err(ConnectionError::UnexpectedEof);
            }
        }

        self.stats.bytes_read(n);
        trace!(peer = %self.peer, bytes = n, "read data");

        Ok(())
    }

    /// Writes one reply block and flushes it.
    async fn send_reply(&mut self, reply: &Reply) -> Result<(), ConnectionError> {
        let bytes = reply.encode();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        debug!(peer = %self.peer, reply = %reply, "sent reply");
        Ok(())
    }
}

/// Errors that end a session.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error on the stream
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Stream ended between commands
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Stream ended in the middle of a frame
    #[error("Unexpected end of stream")]
    UnexpectedEof,
}

/// Runs a session to completion.
///
/// A clean disconnect is not an error; anything else is logged and
/// returned.
pub async fn handle_session<S>(
    stream: S,
    peer: impl Into<String>,
    device: &mut Device,
    framing: FramingConfig,
    stats: Arc<SessionStats>,
) -> Result<(), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let peer = peer.into();
    match Session::new(stream, peer.clone(), device, framing, stats).run().await {
        Ok(()) | Err(ConnectionError::ClientDisconnected) => Ok(()),
        Err(ConnectionError::IoError(ref io_err))
            if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
        {
            debug!(peer = %peer, "connection reset by peer");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
