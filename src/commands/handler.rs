//! Device Command Handlers
//!
//! This module wires the built-in command set into a [`DispatchTable`] and
//! wraps the table and the packet queue into a [`Device`], the single
//! stateful object a session talks to.
//!
//! ## Supported Commands
//!
//! ### Packet Queue (`pqs`)
//! - `PQ.ENQ <data>` - Append a packet at the back
//! - `PQ.REQ <data>` - Insert a packet at the front
//! - `PQ.DEQ` - Remove the front packet (`pkt.length`, `pkt.data`)
//! - `PQ.SIZE?` - Number of queued packets (`size`)
//! - `PQ.RESET` - Empty the queue
//!
//! ### Command Table (`pcs`)
//! - `PCMD.RESET` - Restore the built-in command set
//! - `PCMD.ADDCMD [<name> [ACK]]` - Register a command (`cmd.name`, `cmd.count`)
//!
//! ### Binary Frames (`pcs`)
//! - `0x41` / `0x42` - Indicator on / off (`led`)
//! - `0x43` - Little-endian i32 argument (`int`)
//! - `0x44` - Little-endian f32 argument (`float`)
//! - `0x45` - Character array, rest of the frame (`chars`)
//! - `0xFF 0x41` - i32 followed by f32 (`int`, `float`)
//! - any other well-formed id - Default handler (`type_id`)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Device                             │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │   parse()   │───>│ dispatch()  │───>│  handler()  │      │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘      │
//! │                                               │             │
//! │                                               ▼             │
//! │                                   Services (queue, led)     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::commands::table::{DispatchTable, Handler, HandlerFn};
use crate::commands::unpack::PayloadReader;
use crate::protocol::{
    field, Command, CommandKey, Framer, PacketError, PacketResult, Reply, Scope, Status, TypeId,
};
use crate::queue::{Packet, PacketQueue, DEFAULT_QUEUE_CAPACITY};
use bytes::Bytes;
use tracing::{debug, info, warn};

/// Default dispatch table capacity. The built-in set uses 13 entries.
pub const DEFAULT_MAX_COMMANDS: usize = 16;

/// Sizes of the device's fixed-capacity structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Packet queue slots
    pub queue_capacity: usize,
    /// Dispatch table slots
    pub max_commands: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_commands: DEFAULT_MAX_COMMANDS,
        }
    }
}

/// State the built-in handlers operate on.
#[derive(Debug, Default)]
pub struct Services {
    pub queue: PacketQueue,
    /// Demo indicator toggled by `0x41` / `0x42`
    pub indicator: bool,
}

/// The command table plus everything its handlers touch.
///
/// A device processes one command at a time; callers hold it by `&mut`.
#[derive(Debug)]
pub struct Device {
    commands: DispatchTable<Services>,
    services: Services,
}

impl Device {
    /// Creates a device with the built-in command set installed.
    pub fn new(config: DeviceConfig) -> Self {
        let commands = DispatchTable::with_builtins(config.max_commands, install_builtins);
        info!(
            commands = commands.len(),
            max_commands = config.max_commands,
            queue_capacity = config.queue_capacity,
            "device ready"
        );
        Self {
            commands,
            services: Services {
                queue: PacketQueue::new(config.queue_capacity),
                indicator: false,
            },
        }
    }

    /// Executes a parsed command and returns its reply.
    pub fn execute(&mut self, command: &Command) -> Reply {
        let reply = self.commands.dispatch(&mut self.services, command);
        debug!(key = %command.key, status = %reply.status(), "executed command");
        reply
    }

    /// Parses one frame and executes it.
    ///
    /// Returns `None` for blank ASCII lines. Parse failures are answered with
    /// a `pcs` error reply.
    pub fn process(&mut self, framer: &Framer, frame: &[u8]) -> Option<Reply> {
        match framer.parse(frame) {
            Ok(Some(command)) => Some(self.execute(&command)),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, len = frame.len(), "rejected frame");
                Some(Reply::command_error(e))
            }
        }
    }

    pub fn commands(&self) -> &DispatchTable<Services> {
        &self.commands
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn queue(&self) -> &PacketQueue {
        &self.services.queue
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::new(DeviceConfig::default())
    }
}

/// Registers the built-in command set and the default type-id handler.
pub fn install_builtins(table: &mut DispatchTable<Services>) {
    let named: [(&str, Handler<Services>); 7] = [
        ("PQ.ENQ", Handler::Func(cmd_enqueue)),
        ("PQ.REQ", Handler::Func(cmd_requeue)),
        ("PQ.DEQ", Handler::Func(cmd_dequeue)),
        ("PQ.SIZE?", Handler::Func(cmd_size)),
        ("PQ.RESET", Handler::Func(cmd_queue_reset)),
        ("PCMD.RESET", Handler::ResetCommands),
        ("PCMD.ADDCMD", Handler::AddCommand),
    ];
    for (name, handler) in named {
        if let Err(e) = table.register(CommandKey::name(name), name, Some(handler)) {
            warn!(command = name, error = %e, "failed to install built-in command");
        }
    }

    let binary: [(&[u8], &str, HandlerFn<Services>); 6] = [
        (&[0x41], "led on", cmd_led_on),
        (&[0x42], "led off", cmd_led_off),
        (&[0x43], "int arg", cmd_int),
        (&[0x44], "float arg", cmd_float),
        (&[0x45], "char array", cmd_chars),
        (&[0xFF, 0x41], "int and float", cmd_int_float),
    ];
    for (id, name, handler) in binary {
        let result = TypeId::new(id)
            .and_then(|id| table.register_fn(CommandKey::type_id(id), name, handler));
        if let Err(e) = result {
            warn!(command = name, error = %e, "failed to install built-in command");
        }
    }

    table.set_default_handler(Handler::Func(cmd_unrecognized));
}

/// Runs a fallible handler body, answering errors with `pcs`.
fn respond(body: impl FnOnce() -> PacketResult<Reply>) -> Reply {
    body().unwrap_or_else(Reply::command_error)
}

// ============================================================================
// Packet Queue Commands
// ============================================================================

/// Builds the packet for `PQ.ENQ` / `PQ.REQ`. The payload must hold 1 to
/// `DATA_BUFFER_SIZE` bytes.
fn payload_packet(command: &Command) -> PacketResult<Packet> {
    if command.payload.is_empty() {
        return Err(PacketError::PacketIndexOutOfBounds);
    }
    Packet::from_slice(&command.payload)
}

/// PQ.ENQ <data>
fn cmd_enqueue(services: &mut Services, command: &Command) -> Reply {
    let result = payload_packet(command).and_then(|p| services.queue.enqueue(p));
    Reply::from_result(Scope::Queue, &result)
}

/// PQ.REQ <data>
fn cmd_requeue(services: &mut Services, command: &Command) -> Reply {
    let result = payload_packet(command).and_then(|p| services.queue.requeue(p));
    Reply::from_result(Scope::Queue, &result)
}

/// PQ.DEQ
fn cmd_dequeue(services: &mut Services, _command: &Command) -> Reply {
    match services.queue.dequeue() {
        Ok(packet) => Reply::queue(Status::Success)
            .with(field::PACKET_LENGTH, packet.len())
            .with(field::PACKET_DATA, Bytes::copy_from_slice(packet.as_bytes())),
        Err(e) => Reply::queue(e.status())
            .with(field::PACKET_LENGTH, 0usize)
            .with(field::PACKET_DATA, Bytes::new()),
    }
}

/// PQ.SIZE?
fn cmd_size(services: &mut Services, _command: &Command) -> Reply {
    Reply::queue(Status::Success).with(field::SIZE, services.queue.len())
}

/// PQ.RESET
fn cmd_queue_reset(services: &mut Services, _command: &Command) -> Reply {
    let flushed = services.queue.flush();
    info!(flushed, "packet queue reset");
    Reply::queue(Status::Success)
}

// ============================================================================
// Binary Commands
// ============================================================================

fn cmd_led_on(services: &mut Services, _command: &Command) -> Reply {
    services.indicator = true;
    Reply::ok().with("led", "on")
}

fn cmd_led_off(services: &mut Services, _command: &Command) -> Reply {
    services.indicator = false;
    Reply::ok().with("led", "off")
}

fn cmd_int(_services: &mut Services, command: &Command) -> Reply {
    respond(|| {
        let mut reader = PayloadReader::new(&command.payload);
        Ok(Reply::ok().with("int", reader.unpack_i32()?))
    })
}

fn cmd_float(_services: &mut Services, command: &Command) -> Reply {
    respond(|| {
        let mut reader = PayloadReader::new(&command.payload);
        Ok(Reply::ok().with("float", reader.unpack_f32()?))
    })
}

/// Echoes the payload with trailing NUL padding removed.
fn cmd_chars(_services: &mut Services, command: &Command) -> Reply {
    let mut reader = PayloadReader::new(&command.payload);
    let chars = reader.rest();
    let end = chars.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    Reply::ok().with("chars", Bytes::copy_from_slice(&chars[..end]))
}

fn cmd_int_float(_services: &mut Services, command: &Command) -> Reply {
    respond(|| {
        let mut reader = PayloadReader::new(&command.payload);
        let int = reader.unpack_i32()?;
        let float = reader.unpack_f32()?;
        Ok(Reply::ok().with("int", int).with("float", float))
    })
}

/// Default handler for type ids with no entry.
fn cmd_unrecognized(_services: &mut Services, command: &Command) -> Reply {
    info!(key = %command.key, "unrecognized type id");
    Reply::ok().with("type_id", command.key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{parse_line, FieldValue, FramingConfig, FramingMode};

    fn create_device() -> Device {
        Device::default()
    }

    fn run(device: &mut Device, line: &str) -> Reply {
        let command = parse_line(line.as_bytes()).unwrap().unwrap();
        device.execute(&command)
    }

    fn binary(id: &[u8], payload: &[u8]) -> Command {
        Command::new(
            CommandKey::type_id(TypeId::new(id).unwrap()),
            Bytes::copy_from_slice(payload),
        )
    }

    fn text(reply: &Reply, key: &str) -> String {
        reply.field(key).map(|v| v.to_string()).unwrap_or_default()
    }

    #[test]
    fn test_builtins_installed() {
        let device = create_device();
        assert_eq!(device.commands().len(), 13);
        assert_eq!(device.commands().capacity(), DEFAULT_MAX_COMMANDS);
        assert_eq!(device.queue().capacity(), DEFAULT_QUEUE_CAPACITY);
    }

    #[test]
    fn test_scenario_fifo() {
        let mut device = create_device();
        assert_eq!(run(&mut device, "PQ.ENQ test1").status(), Status::Success);
        assert_eq!(run(&mut device, "PQ.ENQ test2").status(), Status::Success);

        let reply = run(&mut device, "PQ.DEQ");
        assert_eq!(
            &reply.encode()[..],
            &b"pqs: 0\npkt.length: 5\npkt.data: test1\n...\n"[..]
        );
        let reply = run(&mut device, "PQ.DEQ");
        assert_eq!(reply.status(), Status::Success);
        assert_eq!(text(&reply, field::PACKET_DATA), "test2");
    }

    #[test]
    fn test_scenario_overflow() {
        let mut device = create_device();
        for i in 0..DEFAULT_QUEUE_CAPACITY {
            let reply = run(&mut device, &format!("PQ.ENQ p{}", i));
            assert_eq!(reply.status(), Status::Success);
        }
        let before = run(&mut device, "PQ.SIZE?");
        assert_eq!(before.field(field::SIZE), Some(&FieldValue::Int(10)));

        let reply = run(&mut device, "PQ.ENQ rejected");
        assert_eq!(&reply.encode()[..], b"pqs: -9\n...\n");
        let reply = run(&mut device, "PQ.REQ rejected");
        assert_eq!(reply.status(), Status::QueueOverflow);

        let after = run(&mut device, "PQ.SIZE?");
        assert_eq!(after, before);

        for i in 0..DEFAULT_QUEUE_CAPACITY {
            let reply = run(&mut device, "PQ.DEQ");
            assert_eq!(text(&reply, field::PACKET_DATA), format!("p{}", i));
        }
        assert_eq!(run(&mut device, "PQ.DEQ").status(), Status::QueueUnderflow);
    }

    #[test]
    fn test_scenario_requeue() {
        let mut device = create_device();
        run(&mut device, "PQ.ENQ Y");
        run(&mut device, "PQ.REQ X");

        assert_eq!(text(&run(&mut device, "PQ.DEQ"), field::PACKET_DATA), "X");
        assert_eq!(text(&run(&mut device, "PQ.DEQ"), field::PACKET_DATA), "Y");
    }

    #[test]
    fn test_scenario_underflow_after_reset() {
        let mut device = create_device();
        run(&mut device, "PQ.ENQ leftover");
        assert_eq!(&run(&mut device, "PQ.RESET").encode()[..], b"pqs: 0\n...\n");

        let reply = run(&mut device, "PQ.DEQ");
        assert_eq!(
            &reply.encode()[..],
            &b"pqs: -10\npkt.length: 0\npkt.data: \n...\n"[..]
        );
        let size = run(&mut device, "PQ.SIZE?");
        assert_eq!(size.field(field::SIZE), Some(&FieldValue::Int(0)));
    }

    #[test]
    fn test_requeue_then_dequeue_any_contents() {
        let mut device = create_device();
        for n in 0..5 {
            run(&mut device, &format!("PQ.ENQ e{}", n));
            run(&mut device, "PQ.REQ front");
            assert_eq!(text(&run(&mut device, "PQ.DEQ"), field::PACKET_DATA), "front");
        }
    }

    #[test]
    fn test_reset_after_errors() {
        let mut device = create_device();
        run(&mut device, "PQ.DEQ");
        for _ in 0..=DEFAULT_QUEUE_CAPACITY {
            run(&mut device, "PQ.ENQ x");
        }
        let reply = run(&mut device, "PQ.RESET");
        assert_eq!(reply.status(), Status::Success);
        assert!(device.queue().is_empty());
    }

    #[test]
    fn test_payload_too_long() {
        let mut device = create_device();
        let long = "x".repeat(crate::queue::DATA_BUFFER_SIZE + 1);
        let reply = run(&mut device, &format!("PQ.ENQ {}", long));
        assert_eq!(reply.status(), Status::PacketIndexOutOfBounds);
        assert!(device.queue().is_empty());

        let max = "y".repeat(crate::queue::DATA_BUFFER_SIZE);
        assert_eq!(run(&mut device, &format!("PQ.ENQ {}", max)).status(), Status::Success);
        let reply = run(&mut device, "PQ.DEQ");
        assert_eq!(reply.field(field::PACKET_LENGTH), Some(&FieldValue::Int(32)));
    }

    #[test]
    fn test_empty_payload_rejected() {
        let mut device = create_device();
        for line in ["PQ.ENQ", "PQ.REQ", "PQ.ENQ    "] {
            let reply = run(&mut device, line);
            assert_eq!(&reply.encode()[..], &b"pqs: -7\n...\n"[..]);
        }
        assert!(device.queue().is_empty());

        let reply = run(&mut device, "PQ.DEQ");
        assert_eq!(reply.status(), Status::QueueUnderflow);
    }

    #[test]
    fn test_unknown_name() {
        let mut device = create_device();
        let reply = run(&mut device, "PQ.NOPE");
        assert_eq!(&reply.encode()[..], b"pcs: -2\n...\n");
    }

    #[test]
    fn test_addcmd_until_full() {
        let mut device = create_device();
        for n in 13..DEFAULT_MAX_COMMANDS {
            let reply = run(&mut device, "PCMD.ADDCMD");
            assert_eq!(reply.status(), Status::Success);
            assert_eq!(text(&reply, field::COMMAND_NAME), format!("PCMD.USER{}", n));
        }
        let reply = run(&mut device, "PCMD.ADDCMD");
        assert_eq!(reply.status(), Status::ExceededMaxCommands);
        assert_eq!(device.commands().len(), DEFAULT_MAX_COMMANDS);
    }

    #[test]
    fn test_resets_are_independent() {
        let mut device = create_device();
        run(&mut device, "PQ.ENQ keep");
        run(&mut device, "PCMD.ADDCMD APP.PING ACK");

        assert_eq!(&run(&mut device, "PCMD.RESET").encode()[..], b"pcs: 0\n...\n");
        assert_eq!(device.queue().len(), 1);
        assert_eq!(run(&mut device, "APP.PING").status(), Status::NoCommandNameMatch);

        run(&mut device, "PCMD.ADDCMD APP.PING ACK");
        run(&mut device, "PQ.RESET");
        assert_eq!(&run(&mut device, "APP.PING").encode()[..], b"pcs: 0\n...\n");
    }

    #[test]
    fn test_led_toggle() {
        let mut device = create_device();
        let reply = device.execute(&binary(&[0x41], b""));
        assert_eq!(&reply.encode()[..], b"pcs: 0\nled: on\n...\n");
        assert!(device.services().indicator);

        let reply = device.execute(&binary(&[0x42], b""));
        assert_eq!(text(&reply, "led"), "off");
        assert!(!device.services().indicator);
    }

    #[test]
    fn test_int_and_float_args() {
        let mut device = create_device();

        let reply = device.execute(&binary(&[0x43], &(-1234i32).to_le_bytes()));
        assert_eq!(reply.field("int"), Some(&FieldValue::Int(-1234)));

        let reply = device.execute(&binary(&[0x44], &1.5f32.to_le_bytes()));
        assert_eq!(&reply.encode()[..], b"pcs: 0\nfloat: 1.5\n...\n");

        let mut payload = 42i32.to_le_bytes().to_vec();
        payload.extend_from_slice(&0.25f32.to_le_bytes());
        let reply = device.execute(&binary(&[0xFF, 0x41], &payload));
        assert_eq!(&reply.encode()[..], b"pcs: 0\nint: 42\nfloat: 0.25\n...\n");
    }

    #[test]
    fn test_short_argument() {
        let mut device = create_device();
        let reply = device.execute(&binary(&[0x43], b"ab"));
        assert_eq!(reply.status(), Status::PacketIndexOutOfBounds);
        assert_eq!(reply.status().code(), -7);

        let reply = device.execute(&binary(&[0xFF, 0x41], &7i32.to_le_bytes()));
        assert_eq!(reply.status(), Status::PacketIndexOutOfBounds);
    }

    #[test]
    fn test_char_array() {
        let mut device = create_device();
        let reply = device.execute(&binary(&[0x45], b"hello\0\0\0\0"));
        assert_eq!(&reply.encode()[..], b"pcs: 0\nchars: hello\n...\n");
    }

    #[test]
    fn test_default_handler() {
        let mut device = create_device();
        let reply = device.execute(&binary(&[0x46], b"whatever"));
        assert_eq!(&reply.encode()[..], b"pcs: 0\ntype_id: 0x46\n...\n");

        let reply = device.execute(&binary(&[0xFF, 0x42], b""));
        assert_eq!(text(&reply, "type_id"), "0xff42");
    }

    #[test]
    fn test_process_binary_frames() {
        let framer = Framer::new(FramingConfig {
            mode: FramingMode::Binary { frame_size: 10 },
            input_buffer_size: 64,
        });
        let mut device = create_device();

        let mut frame = vec![0x43];
        frame.extend_from_slice(&7i32.to_le_bytes());
        frame.resize(10, 0);
        let reply = device.process(&framer, &frame).unwrap();
        assert_eq!(reply.field("int"), Some(&FieldValue::Int(7)));

        let reply = device.process(&framer, &[0x41; 9]).unwrap();
        assert_eq!(reply.status(), Status::InvalidPacket);

        let mut bad = vec![0x00];
        bad.resize(10, 0);
        let reply = device.process(&framer, &bad).unwrap();
        assert_eq!(&reply.encode()[..], b"pcs: -4\n...\n");
    }

    #[test]
    fn test_process_ascii_lines() {
        let framer = Framer::new(FramingConfig::default());
        let mut device = create_device();

        assert!(device.process(&framer, b"\r\n").is_none());
        let reply = device.process(&framer, b"PQ.ENQ hi\n").unwrap();
        assert_eq!(reply.status(), Status::Success);
        let reply = device.process(&framer, b"PQ.ENQ \xff\xfe\n").unwrap();
        assert_eq!(reply.status(), Status::Success);

        let reply = device.process(&framer, b"\xffQ.ENQ\n").unwrap();
        assert_eq!(reply.status(), PacketError::InvalidPacket.status());
    }

    #[test]
    fn test_custom_config() {
        let mut device = Device::new(DeviceConfig {
            queue_capacity: 2,
            max_commands: 13,
        });
        run(&mut device, "PQ.ENQ a");
        run(&mut device, "PQ.ENQ b");
        assert_eq!(run(&mut device, "PQ.ENQ c").status(), Status::QueueOverflow);
        assert_eq!(
            run(&mut device, "PCMD.ADDCMD").status(),
            Status::ExceededMaxCommands
        );
    }
}
