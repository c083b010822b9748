//! Zero-copy linear-block access.
//!
//! A wrapped ring holds its bytes in up to two physical runs. These accessors
//! expose the first contiguous run on each side so a DMA-style engine can
//! fill or drain the storage in place, then commit the transferred count
//! explicitly through [`RingBuffer::advance`] / [`RingBuffer::skip`] (or
//! [`WriteBlock::commit`]). Nothing is ever committed automatically.

use crate::RingBuffer;
use std::slice;

impl RingBuffer {
    /// The longest contiguous readable run starting at the read cursor.
    ///
    /// When the occupied region wraps past the physical end, only the first
    /// run is returned even though more logical data exists; consume it
    /// (via [`skip`](Self::skip)) and call again for the remainder. Empty
    /// when the ring is empty or unbound.
    ///
    /// The returned view is valid only until the next mutating call on this
    /// instance: a writer reusing the slots or a reset invalidates it.
    pub fn read_block(&self) -> &[u8] {
        let capacity = self.capacity();
        if capacity == 0 {
            return &[];
        }
        let (read, write) = self.load_cursors_consumer();
        let len = if write > read {
            write - read
        } else if read > write {
            capacity - read
        } else {
            0
        };
        // SAFETY: `[read, read+len)` is inside the occupied region published
        // by the producer's Release store; the producer will not touch those
        // slots again until the consumer returns them via `skip`/`read`.
        unsafe { slice::from_raw_parts(self.storage_ptr().add(read), len) }
    }

    /// The longest contiguous writable run starting at the write cursor,
    /// wrapped in a [`WriteBlock`] commit handle.
    ///
    /// The one-slot reservation is applied exactly when the read cursor sits
    /// at index 0, so a fill up to the physical end can never make the buffer
    /// look empty. The block is empty when the ring is full or unbound.
    pub fn write_block(&self) -> WriteBlock<'_> {
        let capacity = self.capacity();
        if capacity == 0 {
            return WriteBlock {
                slice: &mut [],
                ring: self,
            };
        }
        let (read, write) = self.load_cursors_producer();
        let len = if write >= read {
            let mut len = capacity - write;
            if read == 0 && len > 0 {
                len -= 1;
            }
            len
        } else {
            read - write - 1
        };
        // SAFETY: `[write, write+len)` lies entirely in the free region; the
        // consumer only reads `[read, write)`. Exactly one producer exists
        // (SPSC contract), so no second mutable view of these slots is live.
        let slice = unsafe { slice::from_raw_parts_mut(self.storage_ptr().add(write), len) };
        WriteBlock { slice, ring: self }
    }
}

/// Zero-copy reservation for writing directly into the ring storage.
///
/// The producer fills (a prefix of) the slice, then commits the count it
/// actually transferred. Dropping the block without committing publishes
/// nothing.
///
/// ```ignore
/// let mut block = ring.write_block();
/// let n = engine.fill(block.as_mut_slice());
/// block.commit_up_to(n);
/// ```
pub struct WriteBlock<'a> {
    slice: &'a mut [u8],
    ring: &'a RingBuffer,
}

impl WriteBlock<'_> {
    /// The writable slots.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.slice
    }

    /// Number of contiguously writable bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.slice.len()
    }

    /// True when no contiguous slot is writable.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slice.is_empty()
    }

    /// Commits the whole block. Returns the number of bytes committed.
    pub fn commit(self) -> usize {
        let n = self.slice.len();
        self.ring.advance(n)
    }

    /// Commits the first `n` filled bytes, saturating at the block length.
    /// Returns the number of bytes committed.
    pub fn commit_up_to(self, n: usize) -> usize {
        self.ring.advance(n.min(self.slice.len()))
    }
}
