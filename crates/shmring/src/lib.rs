//! shmring - Lock-Free SPSC Ring Buffers Over Shared Memory
//!
//! Byte-oriented single-producer single-consumer ring buffers for two
//! execution contexts (say, the two cores of a dual-core MCU) sharing one
//! physical memory region, with a marker-delimited framing layer on top.
//!
//! # Key Features
//!
//! - Borrowed storage: a ring never allocates; it is bound to an externally
//!   owned byte region and can be placed at a fixed shared-memory address
//! - Wraparound-safe partial reads/writes with best-effort byte counts,
//!   never blocking and never panicking on the data path
//! - Zero-copy linear-block access for DMA-style producers/consumers, with
//!   explicit `advance`/`skip` commits
//! - `E2 F2 … F3 E3` framing that never splits a frame across the
//!   wraparound boundary, plus consumer-side resynchronization
//! - Two-channel registry carving control blocks and data regions out of one
//!   shared region from an explicit runtime configuration
//!
//! Safety under concurrency comes from the SPSC discipline: per ring, one
//! context writes and one context reads, each owning its cursor and loading
//! the other's with acquire/release ordering. The crate provides no mutual
//! exclusion for multiple writers or readers on the same ring.
//!
//! # Example
//!
//! ```
//! use shmring::RingBuffer;
//!
//! let mut storage = vec![0u8; 64];
//! let mut ring = RingBuffer::new();
//! // SAFETY: `storage` outlives every use of the bound ring.
//! unsafe {
//!     ring.bind(storage.as_mut_ptr(), storage.len()).unwrap();
//! }
//!
//! // Byte stream
//! assert_eq!(ring.write(b"hello"), 5);
//! let mut out = [0u8; 5];
//! assert_eq!(ring.read(&mut out), 5);
//!
//! // Framed messages
//! ring.write_frame(b"ping").unwrap();
//! let frame = ring.peek_frame().unwrap();
//! assert_eq!(frame.payload, b"ping");
//! let total = frame.total_len;
//! ring.skip(total);
//! ```

mod block;
mod event;
mod frame;
mod invariants;
mod region;
mod ring;

pub use block::WriteBlock;
pub use event::{EventKind, EventListener};
pub use frame::{Frame, FRAME_END, FRAME_OVERHEAD, FRAME_START};
pub use region::{ChannelId, ChannelRegistry, RegionConfig, RegionError};
pub use ring::{BindError, RingBuffer};
