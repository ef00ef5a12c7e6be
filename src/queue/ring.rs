//! Bounded Packet Queue
//!
//! A double-ended ring buffer of [`Packet`]s with a capacity fixed at
//! construction. All slots are allocated up front and never reallocated;
//! every operation is O(1).
//!
//! ## Layout
//!
//! ```text
//!            head                 tail
//!             │                    │
//!             ▼                    ▼
//! ┌──────┬──────┬──────┬──────┬──────┬──────┐
//! │      │ pkt0 │ pkt1 │ pkt2 │      │      │
//! └──────┴──────┴──────┴──────┴──────┴──────┘
//!   requeue writes at head-1, enqueue writes at tail,
//!   dequeue reads at head; both indices wrap around
//! ```
//!
//! Failed operations leave the queue untouched: an overflowing insert
//! discards its packet, and an underflowing removal returns an error
//! instead of stale slot contents.

use crate::protocol::{PacketError, PacketResult};
use crate::queue::packet::Packet;
use tracing::trace;

/// Default number of packet slots.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// A fixed-capacity FIFO with front insertion.
pub struct PacketQueue {
    /// Preallocated slots
    slots: Box<[Packet]>,
    /// Index of the front packet
    head: usize,
    /// Index one past the back packet
    tail: usize,
    /// Number of queued packets
    len: usize,
}

impl PacketQueue {
    /// Creates a queue with `capacity` preallocated slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Packet::empty(); capacity].into_boxed_slice(),
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    /// Appends a packet at the back.
    pub fn enqueue(&mut self, packet: Packet) -> PacketResult<()> {
        if self.is_full() {
            trace!(len = self.len, "enqueue overflow");
            return Err(PacketError::QueueOverflow);
        }

        self.slots[self.tail] = packet;
        self.tail = (self.tail + 1) % self.capacity();
        self.len += 1;
        trace!(len = self.len, tail = self.tail, "enqueued packet");
        Ok(())
    }

    /// Inserts a packet at the front, so it is the next one dequeued.
    pub fn requeue(&mut self, packet: Packet) -> PacketResult<()> {
        if self.is_full() {
            trace!(len = self.len, "requeue overflow");
            return Err(PacketError::QueueOverflow);
        }

        self.head = if self.head == 0 {
            self.capacity() - 1
        } else {
            self.head - 1
        };
        self.slots[self.head] = packet;
        self.len += 1;
        trace!(len = self.len, head = self.head, "requeued packet");
        Ok(())
    }

    /// Removes and returns the front packet.
    pub fn dequeue(&mut self) -> PacketResult<Packet> {
        if self.is_empty() {
            trace!("dequeue underflow");
            return Err(PacketError::QueueUnderflow);
        }

        let packet = self.slots[self.head];
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        trace!(len = self.len, head = self.head, "dequeued packet");
        Ok(packet)
    }

    /// Logically empties the queue. Slot storage is kept.
    pub fn reset(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.len = 0;
    }

    /// Empties the queue and returns how many packets were dropped.
    pub fn flush(&mut self) -> usize {
        let flushed = self.len;
        self.reset();
        trace!(flushed, "flushed queue");
        flushed
    }

    /// Number of queued packets.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len >= self.capacity()
    }

    /// Number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}

impl Default for PacketQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl std::fmt::Debug for PacketQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketQueue")
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .field("head", &self.head)
            .field("tail", &self.tail)
            .finish()
    }
}
