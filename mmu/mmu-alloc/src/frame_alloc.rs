//! Arena-backed frame service.
//!
//! Frames are heap buffers of `G::PAGE_SIZE` bytes addressed by frame number.
//! The simulated physical address of a frame is `frame << POBITS`, which is
//! page aligned by construction. Frame 0 is never handed out, so physical
//! address 0 never belongs to a mapping.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::marker::PhantomData;
use log::{trace, warn};
use mmu_addresses::{PageGeometry, PhysicalPage};
use mmu_vmem::{FrameAlloc, MAX_FRAME_NUMBER, PhysMapper};

/// Owns every frame handed out to one or more address spaces.
///
/// Released frame numbers go onto a free list and are reused (LIFO) before
/// the arena grows. A reused frame gets a fresh zero-filled buffer.
pub struct FrameArena<G: PageGeometry> {
    /// Slot `n - 1` holds frame `n`; `None` once freed.
    frames: Vec<Option<Box<[u8]>>>,
    /// Frame numbers available for reuse.
    free: Vec<u64>,
    /// Maximum number of live frames, if bounded.
    limit: Option<usize>,
    live: usize,
    allocations: u64,
    _phantom: PhantomData<G>,
}

impl<G: PageGeometry> FrameArena<G> {
    /// An unbounded arena. Allocation only fails if the host is out of memory.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            frames: Vec::new(),
            free: Vec::new(),
            limit: None,
            live: 0,
            allocations: 0,
            _phantom: PhantomData,
        }
    }

    /// An arena that refuses to hold more than `max_frames` live frames.
    #[must_use]
    pub const fn with_limit(max_frames: usize) -> Self {
        let mut arena = Self::new();
        arena.limit = Some(max_frames);
        arena
    }

    /// Frames currently allocated and not yet freed.
    #[inline]
    #[must_use]
    pub const fn live_frames(&self) -> usize {
        self.live
    }

    /// Number of successful allocations over the arena's lifetime.
    #[inline]
    #[must_use]
    pub const fn total_allocations(&self) -> u64 {
        self.allocations
    }

    /// Whether `page` is currently allocated from this arena.
    #[must_use]
    pub fn contains(&self, page: PhysicalPage<G>) -> bool {
        self.slot(page).is_some_and(|slot| slot.is_some())
    }

    fn slot(&self, page: PhysicalPage<G>) -> Option<&Option<Box<[u8]>>> {
        let idx = usize::try_from(page.frame_number().checked_sub(1)?).ok()?;
        self.frames.get(idx)
    }

    fn slot_mut(&mut self, page: PhysicalPage<G>) -> Option<&mut Option<Box<[u8]>>> {
        let idx = usize::try_from(page.frame_number().checked_sub(1)?).ok()?;
        self.frames.get_mut(idx)
    }

    fn zeroed_buffer() -> Option<Box<[u8]>> {
        let size = usize::try_from(G::PAGE_SIZE).ok()?;
        let mut buf = Vec::new();
        buf.try_reserve_exact(size).ok()?;
        buf.resize(size, 0);
        Some(buf.into_boxed_slice())
    }

    fn next_frame_number(&mut self) -> Option<u64> {
        if let Some(frame) = self.free.pop() {
            return Some(frame);
        }
        let frame = u64::try_from(self.frames.len()).ok()? + 1;
        if frame > MAX_FRAME_NUMBER {
            return None;
        }
        self.frames.try_reserve(1).ok()?;
        self.frames.push(None);
        Some(frame)
    }
}

impl<G: PageGeometry> Default for FrameArena<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: PageGeometry> FrameAlloc<G> for FrameArena<G> {
    fn alloc_frame(&mut self) -> Option<PhysicalPage<G>> {
        if self.limit.is_some_and(|limit| self.live >= limit) {
            trace!("Frame limit of {} reached", self.live);
            return None;
        }
        let Some(buffer) = Self::zeroed_buffer() else {
            warn!("Host allocation of a {} byte frame failed", G::PAGE_SIZE);
            return None;
        };
        let Some(frame) = self.next_frame_number() else {
            warn!("Frame numbers exhausted");
            return None;
        };
        let page = PhysicalPage::from_frame_number(frame);
        if let Some(slot) = self.slot_mut(page) {
            *slot = Some(buffer);
        }
        self.live += 1;
        self.allocations += 1;
        trace!("Allocated frame {page}");
        Some(page)
    }

    fn free_frame(&mut self, page: PhysicalPage<G>) {
        match self.slot_mut(page) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                self.free.push(page.frame_number());
                self.live -= 1;
                trace!("Freed frame {page}");
            }
            _ => warn!("Ignoring free of unknown frame {page}"),
        }
    }
}

impl<G: PageGeometry> PhysMapper<G> for FrameArena<G> {
    /// # Panics
    /// If `page` is not currently allocated from this arena.
    fn frame(&self, page: PhysicalPage<G>) -> &[u8] {
        match self.slot(page) {
            Some(Some(buffer)) => buffer,
            _ => panic!("frame {page:?} is not allocated"),
        }
    }

    /// # Panics
    /// If `page` is not currently allocated from this arena.
    fn frame_mut(&mut self, page: PhysicalPage<G>) -> &mut [u8] {
        match self.slot_mut(page) {
            Some(Some(buffer)) => buffer,
            _ => panic!("frame {page:?} is not allocated"),
        }
    }
}
