//! Frame Parsers
//!
//! Two independent parsers produce the same [`Command`]:
//!
//! - [`parse_line`] handles one newline-terminated ASCII line,
//!   `<NAMESPACE>.<VERB>[ <argument-text>]`.
//! - [`parse_frame`] handles one fixed-length binary frame,
//!   `<type-id><payload...>`.
//!
//! The [`Framer`] sits in front of them. It cuts complete lines or frames
//! out of the receive buffer according to the configured [`FramingMode`],
//! and enforces the receive-buffer bound while a frame is still incomplete.
//!
//! ## How the Framer Works
//!
//! `next_frame` returns either:
//! - `Ok(Some(frame))` - A complete line/frame was split off the buffer
//! - `Ok(None)` - Need more data
//! - `Err(PacketError::InputBufferOverrun)` - The pending input outgrew the
//!   receive buffer. In ASCII mode the whole oversized line is dropped, up to
//!   and including its terminator, even when the terminator arrives in a
//!   later read. In binary mode the held bytes are dropped.

use crate::protocol::command::{Command, CommandKey, TypeId};
use crate::protocol::status::{PacketError, PacketResult};
use bytes::{Bytes, BytesMut};

/// Default receive buffer size in bytes.
pub const DEFAULT_INPUT_BUFFER_SIZE: usize = 64;

/// Default binary frame length in bytes (type id included).
pub const DEFAULT_FRAME_SIZE: usize = 10;

/// Line terminator for ASCII mode.
pub const LINE_END: u8 = b'\n';

/// Selects which parser a stream is fed to.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FramingMode {
    /// Newline-terminated ASCII command lines
    #[default]
    Ascii,
    /// Fixed-length binary frames
    Binary { frame_size: usize },
}

/// Framing configuration for one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramingConfig {
    pub mode: FramingMode,
    /// Largest amount of unframed input held before an overrun
    pub input_buffer_size: usize,
}

impl FramingConfig {
    /// Checks that a binary frame can be held by the receive buffer.
    ///
    /// A zero-length frame is `InvalidPacket`; a frame longer than the
    /// buffer is `InputBufferOverrun`.
    pub fn validate(&self) -> PacketResult<()> {
        match self.mode {
            FramingMode::Ascii => Ok(()),
            FramingMode::Binary { frame_size: 0 } => Err(PacketError::InvalidPacket),
            FramingMode::Binary { frame_size } if frame_size > self.input_buffer_size => {
                Err(PacketError::InputBufferOverrun)
            }
            FramingMode::Binary { .. } => Ok(()),
        }
    }
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            mode: FramingMode::default(),
            input_buffer_size: DEFAULT_INPUT_BUFFER_SIZE,
        }
    }
}

/// Parses one ASCII command line (terminator optional).
///
/// Returns `Ok(None)` for a blank line.
pub fn parse_line(line: &[u8]) -> PacketResult<Option<Command>> {
    let line = trim_line_end(line);

    // The name must be ASCII; the argument text is kept verbatim
    let name_end = line.iter().position(|&b| b == b' ').unwrap_or(line.len());
    let name = std::str::from_utf8(&line[..name_end]).map_err(|_| PacketError::InvalidPacket)?;
    if name.is_empty() {
        return if line.iter().all(|b| b.is_ascii_whitespace()) {
            Ok(None)
        } else {
            Err(PacketError::InvalidPacket)
        };
    }
    if !name.is_ascii() {
        return Err(PacketError::InvalidPacket);
    }

    let rest = &line[name_end..];
    let args_start = rest.iter().position(|&b| b != b' ').unwrap_or(rest.len());
    let payload = Bytes::copy_from_slice(&rest[args_start..]);

    Ok(Some(Command::new(CommandKey::name(name), payload)))
}

/// Parses one binary frame of exactly `frame_size` bytes.
pub fn parse_frame(frame: &[u8], frame_size: usize) -> PacketResult<Command> {
    if frame.len() != frame_size {
        return Err(PacketError::InvalidPacket);
    }

    let (id, used) = TypeId::read_prefix(frame)?;
    let payload = Bytes::copy_from_slice(&frame[used..]);
    Ok(Command::new(CommandKey::type_id(id), payload))
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && (line[end - 1] == b'\n' || line[end - 1] == b'\r') {
        end -= 1;
    }
    &line[..end]
}

/// Splits complete frames out of a receive buffer.
#[derive(Debug, Clone)]
pub struct Framer {
    config: FramingConfig,
    /// Dropping the rest of an oversized line
    discarding: bool,
}

impl Framer {
    pub fn new(config: FramingConfig) -> Self {
        Self {
            config,
            discarding: false,
        }
    }

    pub fn mode(&self) -> FramingMode {
        self.config.mode
    }

    /// Attempts to split the next complete line or frame off `buf`.
    ///
    /// Each oversized line is reported once.
    pub fn next_frame(&mut self, buf: &mut BytesMut) -> PacketResult<Option<Bytes>> {
        let limit = self.config.input_buffer_size;

        match self.config.mode {
            FramingMode::Ascii => {
                if self.discarding {
                    match buf.iter().position(|&b| b == LINE_END) {
                        Some(pos) => {
                            let _ = buf.split_to(pos + 1);
                            self.discarding = false;
                        }
                        None => {
                            buf.clear();
                            return Ok(None);
                        }
                    }
                }

                match buf.iter().position(|&b| b == LINE_END) {
                    Some(pos) if pos <= limit => Ok(Some(buf.split_to(pos + 1).freeze())),
                    Some(pos) => {
                        let _ = buf.split_to(pos + 1);
                        Err(PacketError::InputBufferOverrun)
                    }
                    None if buf.len() > limit => {
                        buf.clear();
                        self.discarding = true;
                        Err(PacketError::InputBufferOverrun)
                    }
                    None => Ok(None),
                }
            }
            FramingMode::Binary { frame_size } => {
                if frame_size > 0 && buf.len() >= frame_size {
                    Ok(Some(buf.split_to(frame_size).freeze()))
                } else if buf.len() > limit {
                    buf.clear();
                    Err(PacketError::InputBufferOverrun)
                } else {
                    Ok(None)
                }
            }
        }
    }

    /// Parses a frame produced by [`next_frame`](Self::next_frame).
    pub fn parse(&self, frame: &[u8]) -> PacketResult<Option<Command>> {
        match self.config.mode {
            FramingMode::Ascii => parse_line(frame),
            FramingMode::Binary { frame_size } => parse_frame(frame, frame_size).map(Some),
        }
    }
}
