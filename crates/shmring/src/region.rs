//! Shared-region layout and the two-channel registry.
//!
//! One physical memory region shared by two cores is partitioned into four
//! parts, in order: A→B control block, A→B data region, B→A control block,
//! B→A data region. Control blocks are [`RingBuffer`] values placed in the
//! region itself so both cores see the same cursors; each data region is the
//! storage its control block points at. Control blocks are aligned to the
//! `RingBuffer` alignment, data regions to 4 bytes.
//!
//! Addresses and per-channel sizes arrive as an explicit [`RegionConfig`]
//! rather than compile-time constants, so the same code runs against a fixed
//! hardware region (say, a dual-core MCU's domain SRAM) or a heap allocation
//! in tests.
//!
//! Exactly one context calls [`ChannelRegistry::init`], before either
//! context touches the channels; the peer calls
//! [`ChannelRegistry::attach`] with the identical base and config.

use crate::ring::{BindError, RingBuffer};
use std::mem::{align_of, size_of};
use std::ptr::{self, NonNull};
use thiserror::Error;

/// Data regions are carved at 4-byte boundaries.
const DATA_ALIGN: usize = 4;

/// The two directional channels of a shared region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelId {
    /// Core A produces, core B consumes.
    AToB,
    /// Core B produces, core A consumes.
    BToA,
}

/// Per-direction data-region lengths for a shared region.
///
/// The directions need not be symmetric; a chatty side can get the larger
/// buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionConfig {
    /// Data-region length in bytes for the A→B channel.
    pub a_to_b: usize,
    /// Data-region length in bytes for the B→A channel.
    pub b_to_a: usize,
}

impl RegionConfig {
    /// Creates a configuration with the given per-direction lengths.
    pub const fn new(a_to_b: usize, b_to_a: usize) -> Self {
        Self { a_to_b, b_to_a }
    }

    /// Total bytes the backing region must provide, assuming its base is
    /// aligned for `RingBuffer`. `init`/`attach` report the exact
    /// requirement for a concrete base address.
    pub const fn required_len(&self) -> usize {
        layout_from(0, self).end
    }
}

/// Setup-path failures when carving a shared region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegionError {
    /// The region base pointer was null.
    #[error("region base pointer is null")]
    NullBase,
    /// A channel was configured with a zero-length data region.
    #[error("channel data regions must be nonzero")]
    ZeroChannel,
    /// The region cannot hold both control blocks and data regions.
    #[error("region too small: need {required} bytes, got {provided}")]
    TooSmall {
        /// Bytes required for this base address and configuration.
        required: usize,
        /// Bytes the caller provided.
        provided: usize,
    },
    /// Binding a control block to its data region failed.
    #[error("channel bind failed: {0}")]
    Bind(#[from] BindError),
}

/// Absolute addresses of the four region parts.
#[derive(Debug, Clone, Copy)]
struct RegionLayout {
    a_ctrl: usize,
    a_data: usize,
    b_ctrl: usize,
    b_data: usize,
    end: usize,
}

const fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

const fn layout_from(base: usize, config: &RegionConfig) -> RegionLayout {
    let ctrl_size = size_of::<RingBuffer>();
    let ctrl_align = align_of::<RingBuffer>();
    let a_ctrl = align_up(base, ctrl_align);
    let a_data = align_up(a_ctrl + ctrl_size, DATA_ALIGN);
    let b_ctrl = align_up(a_data + config.a_to_b, ctrl_align);
    let b_data = align_up(b_ctrl + ctrl_size, DATA_ALIGN);
    RegionLayout {
        a_ctrl,
        a_data,
        b_ctrl,
        b_data,
        end: b_data + config.b_to_a,
    }
}

/// Fixed lookup from [`ChannelId`] to the region-resident ring instances.
///
/// Purely a view: the registry owns neither the region nor the rings and
/// frees nothing on drop. A listener installed on a region-resident ring is
/// context-local (its code and allocation live in the installing address
/// space) and leaks with the region unless cleared first.
#[derive(Debug)]
pub struct ChannelRegistry {
    a_to_b: NonNull<RingBuffer>,
    b_to_a: NonNull<RingBuffer>,
}

// SAFETY: the registry is two pointers into a region the caller warrants
// valid and shared under the SPSC discipline; the rings themselves are Sync.
unsafe impl Send for ChannelRegistry {}
unsafe impl Sync for ChannelRegistry {}

impl ChannelRegistry {
    /// One-time owner path: validates the region, zero-fills it exactly
    /// once, places both control blocks, and binds each to its data region.
    ///
    /// # Safety
    ///
    /// `base..base+len` must be valid writable memory, not in use by anyone
    /// else, and must outlive every registry attached to it. Exactly one
    /// context may call `init` for a region, and it must happen before any
    /// context calls [`attach`](Self::attach) or uses the channels.
    pub unsafe fn init(
        base: *mut u8,
        len: usize,
        config: RegionConfig,
    ) -> Result<Self, RegionError> {
        let layout = validate(base, len, &config)?;

        // Pre-initialization: the whole region starts from a known state,
        // before either control block exists.
        ptr::write_bytes(base, 0, len);

        let a_ctrl = layout.a_ctrl as *mut RingBuffer;
        let b_ctrl = layout.b_ctrl as *mut RingBuffer;
        a_ctrl.write(RingBuffer::new());
        b_ctrl.write(RingBuffer::new());
        (*a_ctrl).bind(layout.a_data as *mut u8, config.a_to_b)?;
        (*b_ctrl).bind(layout.b_data as *mut u8, config.b_to_a)?;

        Ok(Self {
            a_to_b: NonNull::new_unchecked(a_ctrl),
            b_to_a: NonNull::new_unchecked(b_ctrl),
        })
    }

    /// Peer path: computes the same layout over an already initialized
    /// region without zero-filling or re-placing anything.
    ///
    /// # Safety
    ///
    /// Same region contract as [`init`](Self::init), and `init` must have
    /// completed on this region (same `base`, `len`, `config`) before the
    /// returned channels are used.
    pub unsafe fn attach(
        base: *mut u8,
        len: usize,
        config: RegionConfig,
    ) -> Result<Self, RegionError> {
        let layout = validate(base, len, &config)?;
        Ok(Self {
            a_to_b: NonNull::new_unchecked(layout.a_ctrl as *mut RingBuffer),
            b_to_a: NonNull::new_unchecked(layout.b_ctrl as *mut RingBuffer),
        })
    }

    /// The ring for one direction. This is the only public route to a
    /// cross-context ring handle.
    #[inline]
    pub fn channel(&self, id: ChannelId) -> &RingBuffer {
        // SAFETY: init/attach established a validly placed control block;
        // the returned borrow cannot outlive the registry view.
        match id {
            ChannelId::AToB => unsafe { self.a_to_b.as_ref() },
            ChannelId::BToA => unsafe { self.b_to_a.as_ref() },
        }
    }

    /// Exclusive handle for setup work (listener installation) by the
    /// context that holds this registry exclusively, before the channels
    /// are shared.
    #[inline]
    pub fn channel_mut(&mut self, id: ChannelId) -> &mut RingBuffer {
        // SAFETY: `&mut self` plus the setup-phase contract rule out a
        // second live view of the control block.
        match id {
            ChannelId::AToB => unsafe { self.a_to_b.as_mut() },
            ChannelId::BToA => unsafe { self.b_to_a.as_mut() },
        }
    }
}

fn validate(base: *mut u8, len: usize, config: &RegionConfig) -> Result<RegionLayout, RegionError> {
    if base.is_null() {
        return Err(RegionError::NullBase);
    }
    if config.a_to_b == 0 || config.b_to_a == 0 {
        return Err(RegionError::ZeroChannel);
    }
    let layout = layout_from(base as usize, config);
    let required = layout.end - base as usize;
    if required > len {
        return Err(RegionError::TooSmall {
            required,
            provided: len,
        });
    }
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Backing memory over-aligned for control-block placement.
    #[repr(align(128))]
    struct Region([u8; 4096]);

    impl Region {
        fn new() -> Box<Self> {
            Box::new(Self([0xFF; 4096]))
        }
    }

    #[test]
    fn test_required_len_covers_both_channels() {
        let config = RegionConfig::new(256, 512);
        assert!(config.required_len() >= 2 * size_of::<RingBuffer>() + 256 + 512);
    }

    #[test]
    fn test_init_validates_inputs() {
        let config = RegionConfig::new(256, 256);
        // SAFETY: error paths never touch memory.
        unsafe {
            assert_eq!(
                ChannelRegistry::init(ptr::null_mut(), 4096, config).unwrap_err(),
                RegionError::NullBase
            );

            let mut region = Region::new();
            assert_eq!(
                ChannelRegistry::init(region.0.as_mut_ptr(), 4096, RegionConfig::new(0, 256))
                    .unwrap_err(),
                RegionError::ZeroChannel
            );
            assert!(matches!(
                ChannelRegistry::init(region.0.as_mut_ptr(), 64, config).unwrap_err(),
                RegionError::TooSmall { provided: 64, .. }
            ));
        }
    }

    #[test]
    fn test_init_places_ready_channels() {
        let mut region = Region::new();
        let config = RegionConfig::new(256, 512);
        // SAFETY: region outlives the registry; nothing else touches it.
        let registry =
            unsafe { ChannelRegistry::init(region.0.as_mut_ptr(), region.0.len(), config) }
                .unwrap();

        let a = registry.channel(ChannelId::AToB);
        let b = registry.channel(ChannelId::BToA);
        assert!(a.is_ready());
        assert!(b.is_ready());
        assert_eq!(a.capacity(), 256);
        assert_eq!(b.capacity(), 512);
        assert!(a.is_empty());
        assert!(b.is_empty());
    }

    #[test]
    fn test_layout_alignment_and_separation() {
        let config = RegionConfig::new(100, 100);
        let layout = layout_from(0x38000000, &config);

        let ctrl_align = align_of::<RingBuffer>();
        assert_eq!(layout.a_ctrl % ctrl_align, 0);
        assert_eq!(layout.b_ctrl % ctrl_align, 0);
        assert_eq!(layout.a_data % DATA_ALIGN, 0);
        assert_eq!(layout.b_data % DATA_ALIGN, 0);

        // Parts are ordered and non-overlapping.
        assert!(layout.a_ctrl + size_of::<RingBuffer>() <= layout.a_data);
        assert!(layout.a_data + config.a_to_b <= layout.b_ctrl);
        assert!(layout.b_ctrl + size_of::<RingBuffer>() <= layout.b_data);
    }

    #[test]
    fn test_attach_sees_the_same_channels() {
        let mut region = Region::new();
        let config = RegionConfig::new(256, 256);
        let base = region.0.as_mut_ptr();
        // SAFETY: one init, then an attach over the same completed region.
        let owner = unsafe { ChannelRegistry::init(base, region.0.len(), config) }.unwrap();
        let peer = unsafe { ChannelRegistry::attach(base, region.0.len(), config) }.unwrap();

        assert_eq!(owner.channel(ChannelId::AToB).write(b"ping"), 4);

        let mut out = [0u8; 4];
        assert_eq!(peer.channel(ChannelId::AToB).read(&mut out), 4);
        assert_eq!(&out, b"ping");

        // The reverse direction is independent.
        assert!(peer.channel(ChannelId::BToA).is_empty());
    }

    #[test]
    fn test_framed_traffic_through_registry() {
        let mut region = Region::new();
        let config = RegionConfig::new(64, 64);
        let base = region.0.as_mut_ptr();
        // SAFETY: as above.
        let owner = unsafe { ChannelRegistry::init(base, region.0.len(), config) }.unwrap();
        let peer = unsafe { ChannelRegistry::attach(base, region.0.len(), config) }.unwrap();

        owner.channel(ChannelId::AToB).write_frame(b"hello").unwrap();

        let mut out = [0u8; 16];
        let n = peer
            .channel(ChannelId::AToB)
            .read_frame_into(&mut out)
            .unwrap();
        assert_eq!(&out[..n], b"hello");
    }
}
