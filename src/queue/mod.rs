//! Packet Queue Module
//!
//! The queue backs the `PQ.*` commands. It holds at most `capacity`
//! packets of at most [`DATA_BUFFER_SIZE`] bytes each, in storage that is
//! allocated once and reused until the queue is dropped.
//!
//! ## Example
//!
//! ```
//! use packetcmd::queue::{Packet, PacketQueue};
//!
//! let mut queue = PacketQueue::new(4);
//! queue.enqueue(Packet::from_slice(b"Y").unwrap()).unwrap();
//! queue.requeue(Packet::from_slice(b"X").unwrap()).unwrap();
//!
//! assert_eq!(queue.dequeue().unwrap().as_bytes(), b"X");
//! assert_eq!(queue.dequeue().unwrap().as_bytes(), b"Y");
//! assert!(queue.dequeue().is_err());
//! ```

pub mod packet;
pub mod ring;

// Re-export commonly used types
pub use packet::{Packet, DATA_BUFFER_SIZE, FLAG_IS_QUERY};
pub use ring::{PacketQueue, DEFAULT_QUEUE_CAPACITY};
