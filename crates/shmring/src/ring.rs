use crate::event::{EventKind, EventListener};
use crate::invariants::{
    debug_assert_cursor_in_bounds, debug_assert_within_free, debug_assert_within_occupied,
};
use crossbeam_utils::CachePadded;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};
use thiserror::Error;

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// This is a byte-oriented SPSC ring buffer over externally owned storage.
// Exactly one context produces and exactly one context consumes; no two
// contexts ever write the same field:
//
// - `write` is mutated only by the producing context
// - `read` is mutated only by the consuming context
// - each context only *loads* the other side's cursor
//
// **Producer (write/advance path):**
// 1. Load `write` with Relaxed (only the producer stores it)
// 2. Load `read` with Acquire (synchronizes with the consumer's Release)
// 3. Copy payload bytes into the storage region (guarded by the protocol)
// 4. Store `write` with Release (publishes the copied bytes)
//
// **Consumer (read/peek/skip path):**
// 1. Load `read` with Relaxed (only the consumer stores it)
// 2. Load `write` with Acquire (synchronizes with the producer's Release)
// 3. Copy payload bytes out of the storage region
// 4. Store `read` with Release (returns the slots to the producer)
//
// Cursors are wrapped indices in `[0, capacity)`, not free-running sequence
// numbers, so one slot is reserved: `read == write` can only mean empty, and
// the usable capacity is `capacity - 1`.
//
// Platform contract: acquire/release pairs order the data copies against the
// cursor publications for coherent memory. On hardware where the two cores
// have independently cached views of the shared region, the region must be
// mapped uncached (or otherwise coherent) at the platform level; this module
// issues no stronger fences itself.
//
// =============================================================================

/// Setup-path failure when binding a ring to its backing storage.
///
/// Data-path operations never error; they report zero-effect outcomes so a
/// failed exchange cannot take either core down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BindError {
    /// The storage pointer was null.
    #[error("storage pointer is null")]
    NullStorage,
    /// The declared capacity was zero.
    #[error("capacity must be nonzero")]
    ZeroCapacity,
}

/// SPSC byte ring over borrowed storage - the core building block.
///
/// The instance never allocates: it is bound to an externally supplied,
/// externally owned byte region and holds only the pointer and declared
/// capacity. `#[repr(C)]` so a control block can be placed at a fixed
/// address inside a shared memory region and viewed from both cores.
///
/// All data-path operations take `&self`; the single-producer/single-consumer
/// discipline (one context writes, one context reads) is what makes the
/// unsynchronized storage access sound.
#[repr(C)]
pub struct RingBuffer {
    /// Read cursor (written by the consumer, loaded by the producer).
    read: CachePadded<AtomicUsize>,
    /// Write cursor (written by the producer, loaded by the consumer).
    write: CachePadded<AtomicUsize>,
    /// Borrowed storage; null while unbound. Never freed here.
    storage: AtomicPtr<u8>,
    /// Total slots in `storage`; usable capacity is one less.
    capacity: AtomicUsize,
    /// Optional mutation observer. Context-local: meaningful only to the
    /// address space that installed it.
    listener: Option<Box<dyn EventListener>>,
}

impl RingBuffer {
    /// Creates an unbound instance. Every operation reports a zero-effect
    /// outcome until [`bind`](Self::bind) succeeds.
    pub const fn new() -> Self {
        Self {
            read: CachePadded::new(AtomicUsize::new(0)),
            write: CachePadded::new(AtomicUsize::new(0)),
            storage: AtomicPtr::new(ptr::null_mut()),
            capacity: AtomicUsize::new(0),
            listener: None,
        }
    }

    // ---------------------------------------------------------------------
    // LIFECYCLE
    // ---------------------------------------------------------------------

    /// Binds the ring to its backing storage and resets both cursors.
    ///
    /// Idempotent: rebinding re-records the region and starts over empty.
    /// An installed listener survives rebinding.
    ///
    /// # Safety
    ///
    /// `storage` must point to `capacity` writable bytes that stay valid, and
    /// are touched by no one but this ring's producer and consumer, for as
    /// long as the ring remains bound.
    pub unsafe fn bind(&mut self, storage: *mut u8, capacity: usize) -> Result<(), BindError> {
        if storage.is_null() {
            return Err(BindError::NullStorage);
        }
        if capacity == 0 {
            return Err(BindError::ZeroCapacity);
        }
        self.read.store(0, Ordering::Relaxed);
        self.write.store(0, Ordering::Relaxed);
        self.capacity.store(capacity, Ordering::Relaxed);
        self.storage.store(storage, Ordering::Release);
        Ok(())
    }

    /// Detaches the ring from its storage. The bytes themselves are untouched;
    /// ownership always stayed with the caller that supplied them. No effect
    /// on an unbound instance.
    pub fn detach(&mut self) {
        self.storage.store(ptr::null_mut(), Ordering::Release);
    }

    /// True iff bound to non-null storage with nonzero capacity.
    #[inline]
    pub fn is_ready(&self) -> bool {
        !self.storage.load(Ordering::Acquire).is_null() && self.capacity.load(Ordering::Relaxed) > 0
    }

    /// Installs the mutation listener. Requires exclusive access: install
    /// during setup, before the ring is shared between contexts.
    pub fn set_listener(&mut self, listener: Box<dyn EventListener>) {
        self.listener = Some(listener);
    }

    /// Removes the mutation listener.
    pub fn clear_listener(&mut self) {
        self.listener = None;
    }

    // ---------------------------------------------------------------------
    // OCCUPANCY
    // ---------------------------------------------------------------------

    /// Total slots of the bound storage (0 when unbound). One slot is always
    /// reserved, so at most `capacity() - 1` bytes can be buffered.
    #[inline]
    pub fn capacity(&self) -> usize {
        if self.storage.load(Ordering::Acquire).is_null() {
            return 0;
        }
        self.capacity.load(Ordering::Relaxed)
    }

    /// Bytes currently buffered. 0 when unbound.
    #[inline]
    pub fn occupied_space(&self) -> usize {
        let capacity = self.capacity();
        if capacity == 0 {
            return 0;
        }
        let read = self.read.load(Ordering::Acquire);
        let write = self.write.load(Ordering::Acquire);
        occupied_between(read, write, capacity)
    }

    /// Bytes that can still be written. 0 when unbound.
    #[inline]
    pub fn free_space(&self) -> usize {
        let capacity = self.capacity();
        if capacity == 0 {
            return 0;
        }
        let read = self.read.load(Ordering::Acquire);
        let write = self.write.load(Ordering::Acquire);
        capacity - 1 - occupied_between(read, write, capacity)
    }

    /// True if nothing is buffered (also true for unbound instances).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.occupied_space() == 0
    }

    /// True if no further byte fits.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.is_ready() && self.free_space() == 0
    }

    // ---------------------------------------------------------------------
    // PRODUCER API
    // ---------------------------------------------------------------------

    /// Copies up to `data.len()` bytes into the buffer, wrapping around the
    /// physical end in at most two contiguous copies.
    ///
    /// Returns the number of bytes actually written: possibly short, 0 when
    /// the ring is unbound, the input is empty, or no space is free. Never
    /// blocks; retrying is the caller's concern.
    pub fn write(&self, data: &[u8]) -> usize {
        let capacity = self.capacity();
        if capacity == 0 || data.is_empty() {
            return 0;
        }
        let write = self.write.load(Ordering::Relaxed);
        let read = self.read.load(Ordering::Acquire);
        let free = capacity - 1 - occupied_between(read, write, capacity);
        let n = free.min(data.len());
        if n == 0 {
            return 0;
        }

        let storage = self.storage.load(Ordering::Relaxed);
        let first = n.min(capacity - write);
        // SAFETY: the bind contract guarantees `storage..storage+capacity` is
        // valid and writable. `[write, write+first)` and `[0, n-first)` lie in
        // the free region: the consumer only reads `[read, write)`, and the
        // Release store below is what moves these bytes into that range.
        unsafe {
            ptr::copy_nonoverlapping(data.as_ptr(), storage.add(write), first);
            if n > first {
                ptr::copy_nonoverlapping(data.as_ptr().add(first), storage, n - first);
            }
        }

        let mut next = write + n;
        if next >= capacity {
            next -= capacity;
        }
        debug_assert_cursor_in_bounds!("write", next, capacity);
        debug_assert_within_free!(n, free);
        self.write.store(next, Ordering::Release);

        self.emit(EventKind::Write, n);
        n
    }

    /// Commits `min(len, free_space)` bytes the producer already placed via
    /// the linear write block, without copying. Returns the amount committed.
    pub fn advance(&self, len: usize) -> usize {
        let capacity = self.capacity();
        if capacity == 0 || len == 0 {
            return 0;
        }
        let write = self.write.load(Ordering::Relaxed);
        let read = self.read.load(Ordering::Acquire);
        let free = capacity - 1 - occupied_between(read, write, capacity);
        let n = free.min(len);
        if n == 0 {
            return 0;
        }

        let mut next = write + n;
        if next >= capacity {
            next -= capacity;
        }
        debug_assert_cursor_in_bounds!("write", next, capacity);
        debug_assert_within_free!(n, free);
        self.write.store(next, Ordering::Release);

        self.emit(EventKind::Write, n);
        n
    }

    // ---------------------------------------------------------------------
    // CONSUMER API
    // ---------------------------------------------------------------------

    /// Copies up to `out.len()` bytes out of the buffer and advances the read
    /// cursor. Mirror image of [`write`](Self::write).
    pub fn read(&self, out: &mut [u8]) -> usize {
        let capacity = self.capacity();
        if capacity == 0 || out.is_empty() {
            return 0;
        }
        let read = self.read.load(Ordering::Relaxed);
        let write = self.write.load(Ordering::Acquire);
        let occupied = occupied_between(read, write, capacity);
        let n = occupied.min(out.len());
        if n == 0 {
            return 0;
        }

        let storage = self.storage.load(Ordering::Relaxed);
        let first = n.min(capacity - read);
        // SAFETY: `[read, read+first)` and `[0, n-first)` lie inside the
        // occupied region published by the producer's Release store, which the
        // Acquire load of `write` synchronized with.
        unsafe {
            ptr::copy_nonoverlapping(storage.add(read), out.as_mut_ptr(), first);
            if n > first {
                ptr::copy_nonoverlapping(storage, out.as_mut_ptr().add(first), n - first);
            }
        }

        let mut next = read + n;
        if next >= capacity {
            next -= capacity;
        }
        debug_assert_cursor_in_bounds!("read", next, capacity);
        debug_assert_within_occupied!(n, occupied);
        self.read.store(next, Ordering::Release);

        self.emit(EventKind::Read, n);
        n
    }

    /// Copies bytes like [`read`](Self::read) but never mutates the instance,
    /// starting `skip` bytes into the occupied region. Returns 0 when `skip`
    /// reaches or exceeds the occupied byte count. Fires no event.
    pub fn peek(&self, skip: usize, out: &mut [u8]) -> usize {
        let capacity = self.capacity();
        if capacity == 0 || out.is_empty() {
            return 0;
        }
        let read = self.read.load(Ordering::Relaxed);
        let write = self.write.load(Ordering::Acquire);
        let occupied = occupied_between(read, write, capacity);
        if skip >= occupied {
            return 0;
        }
        let n = (occupied - skip).min(out.len());

        let mut start = read + skip;
        if start >= capacity {
            start -= capacity;
        }
        let storage = self.storage.load(Ordering::Relaxed);
        let first = n.min(capacity - start);
        // SAFETY: same occupied-region reasoning as `read`; `start` stays
        // within `[read, write)` because `skip < occupied`.
        unsafe {
            ptr::copy_nonoverlapping(storage.add(start), out.as_mut_ptr(), first);
            if n > first {
                ptr::copy_nonoverlapping(storage, out.as_mut_ptr().add(first), n - first);
            }
        }
        n
    }

    /// Discards `min(len, occupied_space)` bytes without copying, for a
    /// consumer that drained them through the linear read block. Returns the
    /// amount actually skipped; never passes the occupied boundary.
    pub fn skip(&self, len: usize) -> usize {
        let capacity = self.capacity();
        if capacity == 0 || len == 0 {
            return 0;
        }
        let read = self.read.load(Ordering::Relaxed);
        let write = self.write.load(Ordering::Acquire);
        let occupied = occupied_between(read, write, capacity);
        let n = occupied.min(len);
        if n == 0 {
            return 0;
        }

        let mut next = read + n;
        if next >= capacity {
            next -= capacity;
        }
        debug_assert_cursor_in_bounds!("read", next, capacity);
        debug_assert_within_occupied!(n, occupied);
        self.read.store(next, Ordering::Release);

        self.emit(EventKind::Read, n);
        n
    }

    // ---------------------------------------------------------------------
    // RESET
    // ---------------------------------------------------------------------

    /// Discards all buffered content by resetting both cursors to 0 and fires
    /// exactly one reset event. No effect on an unbound instance.
    ///
    /// This writes both cursors, so it breaks the single-writer split: call
    /// it only while the opposite context is quiescent.
    pub fn reset(&self) {
        if !self.is_ready() {
            return;
        }
        self.read.store(0, Ordering::Release);
        self.write.store(0, Ordering::Release);
        self.emit(EventKind::Reset, 0);
    }

    // ---------------------------------------------------------------------
    // INTERNAL
    // ---------------------------------------------------------------------

    #[inline]
    pub(crate) fn storage_ptr(&self) -> *mut u8 {
        self.storage.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn load_cursors_consumer(&self) -> (usize, usize) {
        (
            self.read.load(Ordering::Relaxed),
            self.write.load(Ordering::Acquire),
        )
    }

    #[inline]
    pub(crate) fn load_cursors_producer(&self) -> (usize, usize) {
        (
            self.read.load(Ordering::Acquire),
            self.write.load(Ordering::Relaxed),
        )
    }

    /// Writer-side cursor jump used by the frame layer's wrap avoidance.
    #[inline]
    pub(crate) fn rewind_write_cursor(&self) {
        self.write.store(0, Ordering::Release);
    }

    #[inline]
    fn emit(&self, kind: EventKind, bytes: usize) {
        if let Some(listener) = &self.listener {
            listener.on_event(kind, bytes);
        }
    }

    #[cfg(test)]
    pub(crate) fn check_conservation(&self) {
        use crate::invariants::debug_assert_conservation;

        let capacity = self.capacity();
        if capacity > 0 {
            debug_assert_conservation!(self.free_space(), self.occupied_space(), capacity);
        }
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("ready", &self.is_ready())
            .field("capacity", &self.capacity())
            .field("read", &self.read.load(Ordering::Relaxed))
            .field("write", &self.write.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Occupied byte count from wrapped cursor positions.
#[inline]
const fn occupied_between(read: usize, write: usize, capacity: usize) -> usize {
    if write >= read {
        write - read
    } else {
        capacity - (read - write)
    }
}
