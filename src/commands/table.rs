//! Command Dispatch Table
//!
//! A fixed-capacity registry that maps a [`CommandKey`] to a [`Handler`].
//! The slot array is allocated once at construction; registering fills the
//! next free slot and fails with `ERROR_EXCEDED_MAX_COMMANDS` when none is
//! left. Lookup is a linear scan, which is the right trade-off for a table
//! of a few dozen entries.
//!
//! ## Handlers
//!
//! Handlers are tagged variants rather than trait objects:
//!
//! - `Func` calls a plain function pointer with the table's context `C`
//! - `Ack` answers `pcs: 0` and does nothing else
//! - `AddCommand` and `ResetCommands` are the only handlers allowed to
//!   change the table itself, so the table runs them directly
//!
//! An entry may also exist with no handler bound; dispatching it reports
//! `ERROR_NULL_HANDLER_FUNCTION_POINTER`.
//!
//! ## Built-ins
//!
//! The table is created with an installer function that registers the
//! built-in set. `reset()` clears every entry and runs the installer again.

use crate::protocol::{field, Command, CommandKey, PacketError, PacketResult, Reply};
use std::fmt;
use tracing::{debug, info, warn};

/// Signature of a function handler.
pub type HandlerFn<C> = fn(&mut C, &Command) -> Reply;

/// Function that registers the built-in entries on a fresh table.
pub type Installer<C> = fn(&mut DispatchTable<C>);

/// What runs when an entry is dispatched.
pub enum Handler<C> {
    /// A plain function over the context
    Func(HandlerFn<C>),
    /// Acknowledge with success
    Ack,
    /// Register a new entry from the command's arguments
    AddCommand,
    /// Restore the built-in entry set
    ResetCommands,
}

impl<C> Clone for Handler<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Handler<C> {}

impl<C> fmt::Debug for Handler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Func(_) => write!(f, "Func"),
            Handler::Ack => write!(f, "Ack"),
            Handler::AddCommand => write!(f, "AddCommand"),
            Handler::ResetCommands => write!(f, "ResetCommands"),
        }
    }
}

/// One registered command.
pub struct DispatchEntry<C> {
    pub key: CommandKey,
    /// Human-readable label
    pub name: String,
    pub handler: Option<Handler<C>>,
}

impl<C> fmt::Debug for DispatchEntry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchEntry")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("handler", &self.handler)
            .finish()
    }
}

fn no_builtins<C>(_: &mut DispatchTable<C>) {}

/// Fixed-capacity command registry.
pub struct DispatchTable<C> {
    /// Preallocated entry slots; `entries[..count]` are occupied
    entries: Box<[Option<DispatchEntry<C>>]>,
    count: usize,
    /// Runs for well-formed type ids that have no entry
    default_handler: Option<Handler<C>>,
    builtins: Installer<C>,
}

impl<C> DispatchTable<C> {
    /// Creates an empty table with no built-ins.
    pub fn new(capacity: usize) -> Self {
        Self::with_builtins(capacity, no_builtins::<C>)
    }

    /// Creates a table and installs the built-in set.
    pub fn with_builtins(capacity: usize, builtins: Installer<C>) -> Self {
        let entries: Vec<Option<DispatchEntry<C>>> = (0..capacity).map(|_| None).collect();
        let mut table = Self {
            entries: entries.into_boxed_slice(),
            count: 0,
            default_handler: None,
            builtins,
        };
        builtins(&mut table);
        table
    }

    /// Adds an entry.
    ///
    /// Fails with `ExceededMaxCommands` when the table is full and with
    /// `InvalidTypeId` when the key is already registered. The table is
    /// unchanged on failure.
    pub fn register(
        &mut self,
        key: CommandKey,
        name: impl Into<String>,
        handler: Option<Handler<C>>,
    ) -> PacketResult<()> {
        if self.is_full() {
            return Err(PacketError::ExceededMaxCommands);
        }
        if self.contains(&key) {
            return Err(PacketError::InvalidTypeId);
        }

        let name = name.into();
        debug!(key = %key, name = %name, slot = self.count, "registered command");
        self.entries[self.count] = Some(DispatchEntry { key, name, handler });
        self.count += 1;
        Ok(())
    }

    /// Adds an entry bound to a function handler.
    pub fn register_fn(
        &mut self,
        key: CommandKey,
        name: impl Into<String>,
        handler: HandlerFn<C>,
    ) -> PacketResult<()> {
        self.register(key, name, Some(Handler::Func(handler)))
    }

    /// Sets the handler used for unmatched type ids.
    pub fn set_default_handler(&mut self, handler: Handler<C>) {
        self.default_handler = Some(handler);
    }

    /// Resolves the handler for `key`.
    pub fn lookup(&self, key: &CommandKey) -> PacketResult<Handler<C>> {
        match self.find(key) {
            Some(entry) => entry.handler.ok_or(PacketError::NullHandler),
            None => match (key, self.default_handler) {
                (CommandKey::TypeId(_), Some(handler)) => Ok(handler),
                _ => Err(key.no_match_error()),
            },
        }
    }

    /// Routes `command` to its handler and returns the handler's reply.
    ///
    /// Routing failures are answered with a `pcs` error and leave the table
    /// unmodified.
    pub fn dispatch(&mut self, ctx: &mut C, command: &Command) -> Reply {
        let handler = match self.lookup(&command.key) {
            Ok(handler) => handler,
            Err(e) => {
                debug!(key = %command.key, error = %e, "dispatch failed");
                return Reply::command_error(e);
            }
        };

        debug!(key = %command.key, handler = ?handler, "dispatching");
        match handler {
            Handler::Func(f) => f(ctx, command),
            Handler::Ack => Reply::ok(),
            Handler::AddCommand => self.add_from_command(command),
            Handler::ResetCommands => {
                self.reset();
                Reply::ok()
            }
        }
    }

    /// Clears all entries and reinstalls the built-in set.
    pub fn reset(&mut self) {
        for slot in self.entries.iter_mut() {
            *slot = None;
        }
        self.count = 0;
        self.default_handler = None;
        let builtins = self.builtins;
        builtins(self);
        info!(commands = self.count, "command table reset");
    }

    /// Handles `PCMD.ADDCMD [<name> [ACK]]`.
    fn add_from_command(&mut self, command: &Command) -> Reply {
        let args = match command.args() {
            Some(args) => args,
            None => return Reply::command_error(PacketError::InvalidPacket),
        };
        let mut words = args.split_whitespace();

        let name = match words.next() {
            Some(name) if is_dotted_name(name) => name.to_string(),
            Some(name) => {
                warn!(command = name, "command name is not <NAMESPACE>.<VERB>");
                return Reply::command_error(PacketError::InvalidPacket);
            }
            None => format!("PCMD.USER{}", self.count),
        };
        let handler = match words.next() {
            None => None,
            Some(word) if word.eq_ignore_ascii_case("ACK") => Some(Handler::Ack),
            Some(word) => {
                warn!(binding = word, "unknown handler binding");
                return Reply::command_error(PacketError::NullHandler);
            }
        };

        match self.register(CommandKey::name(name.as_str()), name.as_str(), handler) {
            Ok(()) => Reply::ok()
                .with(field::COMMAND_NAME, name)
                .with(field::COMMAND_COUNT, self.count),
            Err(e) => {
                warn!(name = %name, error = %e, "failed to add command");
                Reply::command_error(e)
            }
        }
    }

    fn find(&self, key: &CommandKey) -> Option<&DispatchEntry<C>> {
        self.entries[..self.count]
            .iter()
            .flatten()
            .find(|entry| entry.key == *key)
    }

    /// Returns true if `key` has an entry.
    pub fn contains(&self, key: &CommandKey) -> bool {
        self.find(key).is_some()
    }

    /// Registered entries in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &DispatchEntry<C>> {
        self.entries[..self.count].iter().flatten()
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count >= self.capacity()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }
}

/// True for `<NAMESPACE>.<VERB>` with both parts non-empty.
fn is_dotted_name(name: &str) -> bool {
    match name.split_once('.') {
        Some((namespace, verb)) => !namespace.is_empty() && !verb.is_empty(),
        None => false,
    }
}

impl<C> fmt::Debug for DispatchTable<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("count", &self.count)
            .field("capacity", &self.capacity())
            .field("default_handler", &self.default_handler)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{FieldValue, Status, TypeId};

    #[derive(Default)]
    struct Counter {
        hits: u32,
    }

    fn bump(ctx: &mut Counter, _command: &Command) -> Reply {
        ctx.hits += 1;
        Reply::ok().with("hits", ctx.hits as i64)
    }

    fn install(table: &mut DispatchTable<Counter>) {
        table
            .register_fn(CommandKey::name("T.BUMP"), "bump", bump)
            .unwrap();
        table
            .register(CommandKey::name("PCMD.ADDCMD"), "add", Some(Handler::AddCommand))
            .unwrap();
        table
            .register(CommandKey::name("PCMD.RESET"), "reset", Some(Handler::ResetCommands))
            .unwrap();
    }

    fn id(byte: u8) -> CommandKey {
        CommandKey::type_id(TypeId::single(byte).unwrap())
    }

    fn with_args(name: &str, args: &str) -> Command {
        Command::new(CommandKey::name(name), args.to_string())
    }

    #[test]
    fn test_dispatch_calls_handler() {
        let mut table = DispatchTable::with_builtins(4, install);
        let mut ctx = Counter::default();

        let reply = table.dispatch(&mut ctx, &Command::named("T.BUMP"));
        assert_eq!(reply.status(), Status::Success);
        assert_eq!(reply.field("hits"), Some(&FieldValue::Int(1)));
        assert_eq!(ctx.hits, 1);
    }

    #[test]
    fn test_no_name_match() {
        let mut table = DispatchTable::with_builtins(4, install);
        let reply = table.dispatch(&mut Counter::default(), &Command::named("T.NOPE"));
        assert_eq!(reply.status(), Status::NoCommandNameMatch);
        assert_eq!(&reply.encode()[..], b"pcs: -2\n...\n");
    }

    #[test]
    fn test_no_type_id_match_without_default() {
        let mut table: DispatchTable<Counter> = DispatchTable::new(4);
        let reply = table.dispatch(&mut Counter::default(), &Command::new(id(0x46), "x"));
        assert_eq!(reply.status(), Status::NoTypeIdMatch);
    }

    #[test]
    fn test_default_handler_only_for_type_ids() {
        let mut table: DispatchTable<Counter> = DispatchTable::new(4);
        table.set_default_handler(Handler::Func(bump));
        let mut ctx = Counter::default();

        let reply = table.dispatch(&mut ctx, &Command::new(id(0x46), "x"));
        assert_eq!(reply.status(), Status::Success);
        assert_eq!(ctx.hits, 1);

        let reply = table.dispatch(&mut ctx, &Command::named("X.Y"));
        assert_eq!(reply.status(), Status::NoCommandNameMatch);
        assert_eq!(ctx.hits, 1);
    }

    #[test]
    fn test_register_until_full() {
        let mut table: DispatchTable<Counter> = DispatchTable::new(2);
        table.register_fn(id(0x41), "a", bump).unwrap();
        table.register_fn(id(0x42), "b", bump).unwrap();
        assert!(table.is_full());

        assert_eq!(
            table.register_fn(id(0x43), "c", bump),
            Err(PacketError::ExceededMaxCommands)
        );
        assert_eq!(table.len(), 2);
        assert!(!table.contains(&id(0x43)));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut table: DispatchTable<Counter> = DispatchTable::new(4);
        table.register_fn(CommandKey::name("A.B"), "first", bump).unwrap();
        assert_eq!(
            table.register(CommandKey::name("A.B"), "second", None),
            Err(PacketError::InvalidTypeId)
        );
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_unbound_entry() {
        let mut table: DispatchTable<Counter> = DispatchTable::new(4);
        table.register(CommandKey::name("A.B"), "unbound", None).unwrap();

        let reply = table.dispatch(&mut Counter::default(), &Command::named("A.B"));
        assert_eq!(reply.status(), Status::NullHandlerFunctionPointer);
        assert_eq!(reply.status().code(), -6);
    }

    #[test]
    fn test_add_command_generated_name() {
        let mut table = DispatchTable::with_builtins(8, install);
        let reply = table.dispatch(&mut Counter::default(), &Command::named("PCMD.ADDCMD"));

        assert_eq!(reply.status(), Status::Success);
        assert_eq!(
            reply.field(field::COMMAND_NAME),
            Some(&FieldValue::from("PCMD.USER3"))
        );
        assert_eq!(reply.field(field::COMMAND_COUNT), Some(&FieldValue::Int(4)));
        assert!(table.contains(&CommandKey::name("PCMD.USER3")));
    }

    #[test]
    fn test_add_command_with_ack_binding() {
        let mut table = DispatchTable::with_builtins(8, install);
        let mut ctx = Counter::default();

        let reply = table.dispatch(&mut ctx, &with_args("PCMD.ADDCMD", "APP.PING ACK"));
        assert_eq!(reply.status(), Status::Success);

        let reply = table.dispatch(&mut ctx, &Command::named("APP.PING"));
        assert_eq!(reply.status(), Status::Success);
    }

    #[test]
    fn test_add_command_unbound_then_dispatch() {
        let mut table = DispatchTable::with_builtins(8, install);
        let mut ctx = Counter::default();

        table.dispatch(&mut ctx, &with_args("PCMD.ADDCMD", "APP.LATER"));
        let reply = table.dispatch(&mut ctx, &Command::named("APP.LATER"));
        assert_eq!(reply.status(), Status::NullHandlerFunctionPointer);
    }

    #[test]
    fn test_add_command_unknown_binding() {
        let mut table = DispatchTable::with_builtins(8, install);
        let reply = table.dispatch(
            &mut Counter::default(),
            &with_args("PCMD.ADDCMD", "APP.X BOGUS"),
        );
        assert_eq!(reply.status(), Status::NullHandlerFunctionPointer);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_add_command_requires_dotted_name() {
        let mut table = DispatchTable::with_builtins(8, install);
        let mut ctx = Counter::default();

        for name in ["foo", "foo ACK", ".VERB", "APP."] {
            let reply = table.dispatch(&mut ctx, &with_args("PCMD.ADDCMD", name));
            assert_eq!(&reply.encode()[..], b"pcs: -3\n...\n");
        }
        assert_eq!(table.len(), 3);
        assert!(!table.contains(&CommandKey::name("foo")));

        let reply = table.dispatch(&mut ctx, &with_args("PCMD.ADDCMD", "APP.V2.GO"));
        assert_eq!(reply.status(), Status::Success);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_add_command_until_full() {
        let mut table = DispatchTable::with_builtins(5, install);
        let mut ctx = Counter::default();

        for _ in 0..2 {
            let reply = table.dispatch(&mut ctx, &Command::named("PCMD.ADDCMD"));
            assert_eq!(reply.status(), Status::Success);
        }
        let reply = table.dispatch(&mut ctx, &Command::named("PCMD.ADDCMD"));
        assert_eq!(reply.status(), Status::ExceededMaxCommands);
        assert_eq!(&reply.encode()[..], b"pcs: -1\n...\n");
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn test_reset_restores_builtins() {
        let mut table = DispatchTable::with_builtins(8, install);
        let mut ctx = Counter::default();

        table.dispatch(&mut ctx, &with_args("PCMD.ADDCMD", "APP.ONE ACK"));
        table.set_default_handler(Handler::Ack);
        assert_eq!(table.len(), 4);

        let reply = table.dispatch(&mut ctx, &Command::named("PCMD.RESET"));
        assert_eq!(reply.status(), Status::Success);
        assert_eq!(table.len(), 3);
        assert!(!table.contains(&CommandKey::name("APP.ONE")));
        assert!(table.contains(&CommandKey::name("T.BUMP")));
        assert_eq!(
            table.lookup(&id(0x50)).unwrap_err(),
            PacketError::NoTypeIdMatch
        );
    }

    #[test]
    fn test_entries_in_registration_order() {
        let table = DispatchTable::with_builtins(8, install);
        let names: Vec<&str> = table.entries().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["bump", "add", "reset"]);
    }
}
