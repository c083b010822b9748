//! Marker-delimited frames over the byte ring.
//!
//! Wire format, byte exact: `E2 F2 <payload> F3 E3`. No length prefix, no
//! escaping, no checksum. Because there is no escaping, a payload must never
//! contain the end-marker pair `F3 E3`; that is a restriction on producers
//! which this layer cannot enforce.
//!
//! A frame always occupies one contiguous, non-wrapping span of the storage:
//! [`RingBuffer::write_frame`] jumps the write cursor back to index 0 rather
//! than split a frame across the physical end, and [`RingBuffer::peek_frame`]
//! scans only the current contiguous readable run. The bytes sacrificed at
//! the tail by such a jump are reclaimed on the consumer side with
//! [`RingBuffer::resync`].
//!
//! Frame operations are all-or-nothing: a frame is either written/found in
//! full or the call has no effect. Channels carrying frames must be fed
//! exclusively through `write_frame`; interleaving raw `write` calls breaks
//! frame discovery.

use crate::RingBuffer;

/// Two-byte start marker preceding every payload.
pub const FRAME_START: [u8; 2] = [0xE2, 0xF2];
/// Two-byte end marker following every payload.
pub const FRAME_END: [u8; 2] = [0xF3, 0xE3];
/// Marker bytes added around each payload.
pub const FRAME_OVERHEAD: usize = 4;

/// A complete frame located in the buffer, borrowed in place.
///
/// The payload view stays valid until the next mutating call on the ring.
/// Consume the frame with `ring.skip(frame.total_len)` once done.
#[derive(Debug)]
pub struct Frame<'a> {
    /// Payload bytes between the markers, without copying.
    pub payload: &'a [u8],
    /// Whole frame length including both markers; the amount to skip.
    pub total_len: usize,
}

impl RingBuffer {
    /// Writes one whole frame, never splitting it across the wraparound
    /// boundary. Returns the total frame length on success.
    ///
    /// Fails with `None`, changing nothing, when the ring is unbound or the
    /// frame does not fit: either `free_space()` is too small, or the frame
    /// would have to wrap and the run at index 0 cannot hold it either. In
    /// the wrap case the write cursor jumps to index 0 first, sacrificing
    /// the remaining tail run so the frame lands contiguously.
    ///
    /// Emits one write event per section (start marker, payload, end marker).
    pub fn write_frame(&self, payload: &[u8]) -> Option<usize> {
        if !self.is_ready() {
            return None;
        }
        let frame_len = payload.len() + FRAME_OVERHEAD;
        if self.free_space() < frame_len {
            return None;
        }

        if self.write_block().len() < frame_len {
            // The tail run is too short. Jumping to index 0 leaves `read - 1`
            // contiguous bytes there; a reader parked at 0 never triggers
            // this branch (the tail run would equal all free space).
            let (read, write) = self.load_cursors_producer();
            if read.saturating_sub(1) < frame_len {
                return None;
            }
            // Poison the first abandoned byte: the tail may still hold the
            // image of an already-consumed frame, and a stale start marker
            // there would replay it to the consumer.
            //
            // SAFETY: `write` is in bounds and the byte at `write` lies in
            // the free region, which only this producer touches.
            unsafe {
                self.storage_ptr().add(write).write(0);
            }
            self.rewind_write_cursor();
        }

        if self.write(&FRAME_START) != FRAME_START.len() {
            return None;
        }
        if self.write(payload) != payload.len() {
            return None;
        }
        if self.write(&FRAME_END) != FRAME_END.len() {
            return None;
        }
        Some(frame_len)
    }

    /// Locates a complete frame at the head of the current contiguous
    /// readable run, without copying or advancing any cursor.
    ///
    /// `None` when the run is shorter than [`FRAME_OVERHEAD`], does not begin
    /// with the start marker, or holds no end marker yet. A frame whose
    /// bytes sit past the wraparound boundary is found only after
    /// [`resync`](Self::resync) has discarded the dead tail run.
    pub fn peek_frame(&self) -> Option<Frame<'_>> {
        let block = self.read_block();
        if block.len() < FRAME_OVERHEAD || block[..2] != FRAME_START {
            return None;
        }
        let end: &[u8] = &FRAME_END;
        let idx = block[2..].windows(2).position(|pair| pair == end)? + 2;
        Some(Frame {
            payload: &block[2..idx],
            total_len: idx + 2,
        })
    }

    /// Discards a dead tail run left behind by a writer's wrap-avoidance
    /// jump. Returns the number of bytes skipped.
    ///
    /// The tail run is dead exactly when the occupied region wraps (the
    /// writer continued at index 0 and will never append to the tail again)
    /// and the run holds no complete frame. Returns 0 when the region does
    /// not wrap (bytes may still arrive) or a frame is still waiting to be
    /// consumed first.
    ///
    /// Only meaningful on channels fed exclusively through
    /// [`write_frame`](Self::write_frame): on a raw byte stream the wrapped
    /// tail is ordinary data and must not be discarded.
    pub fn resync(&self) -> usize {
        let capacity = self.capacity();
        if capacity == 0 {
            return 0;
        }
        let (read, write) = self.load_cursors_consumer();
        if read <= write {
            return 0;
        }
        if self.peek_frame().is_some() {
            return 0;
        }
        self.skip(capacity - read)
    }

    /// Consumer-loop convenience: resyncs as needed, copies the next complete
    /// frame's payload into `out`, consumes the whole frame, and returns the
    /// payload length.
    ///
    /// `None`, changing nothing, when no complete frame is available or
    /// `out` is too small for the payload.
    pub fn read_frame_into(&self, out: &mut [u8]) -> Option<usize> {
        loop {
            if let Some(frame) = self.peek_frame() {
                let len = frame.payload.len();
                if out.len() < len {
                    return None;
                }
                out[..len].copy_from_slice(frame.payload);
                let total = frame.total_len;
                self.skip(total);
                return Some(len);
            }
            if self.resync() == 0 {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound_ring(storage: &mut [u8]) -> RingBuffer {
        let mut ring = RingBuffer::new();
        // SAFETY: storage outlives the ring in these tests.
        unsafe {
            ring.bind(storage.as_mut_ptr(), storage.len()).unwrap();
        }
        ring
    }

    /// Parks both cursors at `pos` on an empty ring.
    fn park_cursors(ring: &RingBuffer, pos: usize) {
        assert_eq!(ring.write(&vec![0u8; pos]), pos);
        assert_eq!(ring.skip(pos), pos);
    }

    #[test]
    fn test_frame_wire_format_is_byte_exact() {
        let mut buf = vec![0u8; 8];
        let ring = bound_ring(&mut buf);

        assert_eq!(ring.write_frame(b"AB"), Some(6));
        drop(ring);
        assert_eq!(&buf[..6], &[0xE2, 0xF2, 0x41, 0x42, 0xF3, 0xE3]);
    }

    #[test]
    fn test_frame_round_trip() {
        let mut buf = vec![0u8; 8];
        let ring = bound_ring(&mut buf);

        assert_eq!(ring.write_frame(b"AB"), Some(6));
        let frame = ring.peek_frame().expect("frame must be discoverable");
        assert_eq!(frame.payload, b"AB");
        assert_eq!(frame.total_len, 6);

        let total = frame.total_len;
        assert_eq!(ring.skip(total), 6);
        assert!(ring.peek_frame().is_none());
        assert!(ring.is_empty());
    }

    #[test]
    fn test_empty_payload_frame() {
        let mut buf = vec![0u8; 8];
        let ring = bound_ring(&mut buf);

        assert_eq!(ring.write_frame(b""), Some(4));
        let frame = ring.peek_frame().unwrap();
        assert!(frame.payload.is_empty());
        assert_eq!(frame.total_len, 4);
    }

    #[test]
    fn test_write_frame_rejects_when_full() {
        let mut buf = vec![0u8; 8];
        let ring = bound_ring(&mut buf);

        assert_eq!(ring.write_frame(b"AB"), Some(6));
        // 1 byte free; even an empty frame needs 4.
        assert_eq!(ring.write_frame(b""), None);
        assert_eq!(ring.occupied_space(), 6);
    }

    #[test]
    fn test_unbound_frame_ops() {
        let ring = RingBuffer::new();
        assert_eq!(ring.write_frame(b"x"), None);
        assert!(ring.peek_frame().is_none());
        assert_eq!(ring.resync(), 0);
    }

    #[test]
    fn test_no_frame_under_four_contiguous_bytes() {
        let mut buf = vec![0u8; 16];
        let ring = bound_ring(&mut buf);

        // Occupancy is nonzero but the run is too short to hold markers.
        ring.write(&[0xE2, 0xF2, 0x41]);
        assert_eq!(ring.occupied_space(), 3);
        assert!(ring.peek_frame().is_none());
    }

    #[test]
    fn test_no_frame_without_start_marker() {
        let mut buf = vec![0u8; 16];
        let ring = bound_ring(&mut buf);
        ring.write(b"noise");
        assert!(ring.peek_frame().is_none());
    }

    #[test]
    fn test_partial_frame_not_found_until_end_marker() {
        let mut buf = vec![0u8; 16];
        let ring = bound_ring(&mut buf);

        ring.write(&[0xE2, 0xF2, 0x41, 0x42, 0x43]);
        assert!(ring.peek_frame().is_none());
        ring.write(&[0xF3, 0xE3]);
        let frame = ring.peek_frame().unwrap();
        assert_eq!(frame.payload, b"ABC");
        assert_eq!(frame.total_len, 7);
    }

    #[test]
    fn test_wrap_avoidance_jumps_to_zero() {
        let mut buf = vec![0u8; 16];
        let ring = bound_ring(&mut buf);

        // Only 3 contiguous bytes remain before the physical end.
        park_cursors(&ring, 13);

        assert_eq!(ring.write_frame(b"XY"), Some(6));
        drop(ring);
        // The frame landed contiguously at index 0, not split 3/3.
        assert_eq!(&buf[..6], &[0xE2, 0xF2, b'X', b'Y', 0xF3, 0xE3]);
    }

    #[test]
    fn test_jumped_frame_discoverable_after_resync() {
        let mut buf = vec![0u8; 16];
        let ring = bound_ring(&mut buf);
        park_cursors(&ring, 13);

        assert_eq!(ring.write_frame(b"XY"), Some(6));

        // The reader still faces the dead 3-byte tail run.
        assert!(ring.peek_frame().is_none());
        assert_eq!(ring.resync(), 3);

        let frame = ring.peek_frame().expect("frame contiguous at index 0");
        assert_eq!(frame.payload, b"XY");
        assert_eq!(frame.total_len, 6);
    }

    #[test]
    fn test_write_frame_all_or_nothing_when_jump_target_too_small() {
        let mut buf = vec![0u8; 16];
        let ring = bound_ring(&mut buf);

        // read = 6, write = 13: 8 bytes free in total, but neither the
        // 3-byte tail run nor the 5-byte run at index 0 fits the frame.
        assert_eq!(ring.write(&[1; 13]), 13);
        assert_eq!(ring.skip(6), 6);

        assert_eq!(ring.write_frame(b"XY"), None);
        // Nothing moved, nothing was written.
        assert_eq!(ring.occupied_space(), 7);
        assert_eq!(ring.write_block().len(), 3);
    }

    #[test]
    fn test_stale_tail_frame_is_not_replayed() {
        let mut buf = vec![0u8; 16];
        // A ghost of an already-consumed empty frame sits where the dead
        // tail run will begin.
        buf[12..16].copy_from_slice(&[0xE2, 0xF2, 0xF3, 0xE3]);
        let ring = bound_ring(&mut buf);
        park_cursors(&ring, 12);

        // 5-byte frame does not fit the 4-byte tail run: jump to 0.
        assert_eq!(ring.write_frame(b"X"), Some(5));

        // The poisoned tail must parse as garbage, not as the ghost frame.
        assert!(ring.peek_frame().is_none());
        assert_eq!(ring.resync(), 4);
        assert_eq!(ring.peek_frame().unwrap().payload, b"X");
    }

    #[test]
    fn test_resync_leaves_unwrapped_stream_alone() {
        let mut buf = vec![0u8; 16];
        let ring = bound_ring(&mut buf);
        ring.write(b"pending");
        assert_eq!(ring.resync(), 0);
        assert_eq!(ring.occupied_space(), 7);
    }

    #[test]
    fn test_resync_preserves_pending_tail_frame() {
        let mut buf = vec![0u8; 16];
        let ring = bound_ring(&mut buf);
        park_cursors(&ring, 10);

        // One frame fits the tail run exactly; the next forces a jump.
        assert_eq!(ring.write_frame(b""), Some(4));
        assert_eq!(ring.write_frame(b"XY"), Some(6));

        // The tail frame must survive resync and come out first.
        assert_eq!(ring.resync(), 0);
        let first = ring.peek_frame().unwrap();
        assert!(first.payload.is_empty());
        let total = first.total_len;
        assert_eq!(ring.skip(total), 4);

        // Now the dead remainder of the tail run goes, then the jumped frame.
        assert_eq!(ring.resync(), 2);
        let second = ring.peek_frame().unwrap();
        assert_eq!(second.payload, b"XY");
    }

    #[test]
    fn test_read_frame_into_drains_across_jump() {
        let mut buf = vec![0u8; 16];
        let ring = bound_ring(&mut buf);
        park_cursors(&ring, 13);
        assert_eq!(ring.write_frame(b"XY"), Some(6));

        let mut out = [0u8; 8];
        assert_eq!(ring.read_frame_into(&mut out), Some(2));
        assert_eq!(&out[..2], b"XY");
        assert!(ring.is_empty());
        assert_eq!(ring.read_frame_into(&mut out), None);
    }

    #[test]
    fn test_read_frame_into_rejects_small_buffer() {
        let mut buf = vec![0u8; 16];
        let ring = bound_ring(&mut buf);
        assert_eq!(ring.write_frame(b"ABCDEF"), Some(10));

        let mut out = [0u8; 2];
        assert_eq!(ring.read_frame_into(&mut out), None);
        // Frame stays queued for a properly sized read.
        assert_eq!(ring.occupied_space(), 10);
    }

    #[test]
    fn test_back_to_back_frames() {
        let mut buf = vec![0u8; 32];
        let ring = bound_ring(&mut buf);

        ring.write_frame(b"one").unwrap();
        ring.write_frame(b"two").unwrap();

        let first = ring.peek_frame().unwrap();
        assert_eq!(first.payload, b"one");
        let total = first.total_len;
        ring.skip(total);

        let second = ring.peek_frame().unwrap();
        assert_eq!(second.payload, b"two");
    }
}
