//! Memory accessor on top of a paged address space.
//!
//! Loads and stores go through [`AddressSpace::translate`] and then read or
//! write the backing frame directly. Nothing here allocates implicitly:
//! accessing an address that was never passed to
//! [`allocate`](Vmm::allocate) fails with [`VmmError::Unmapped`].
//!
//! Word accesses only ever touch the leaf page of their address, so they
//! succeed exactly when [`translate`](Vmm::translate) does. Byte ranges
//! follow the virtual layout across pages and wrap past the top of the
//! address space to `0`.
//!
//! # Example
//! ```
//! use mmu_addresses::{Pages4KLevels3, VirtualAddress};
//! use mmu_alloc::{frame_alloc::FrameArena, vmm::Vmm};
//!
//! let mut vmm = Vmm::<Pages4KLevels3, _>::new(FrameArena::new());
//! let va = VirtualAddress::new(0x12_3456);
//!
//! vmm.allocate(va)?;
//! vmm.store(va, 42)?;
//! assert_eq!(vmm.load(va)?, 42);
//! # Ok::<(), mmu_alloc::vmm::VmmError>(())
//! ```

use mmu_addresses::{
    PageGeometry, PageOffset, PhysicalAddress, PhysicalPage, VirtualAddress, WORD_SIZE,
};
use mmu_vmem::{AddressSpace, AllocateError, FrameAlloc, PhysMapper};

/// Size of the machine word moved by [`Vmm::store`] / [`Vmm::load`].
pub const WORD_BYTES: usize = WORD_SIZE as usize;

/// Word-level and byte-level access to one address space.
pub struct Vmm<G: PageGeometry, B: FrameAlloc<G> + PhysMapper<G>> {
    aspace: AddressSpace<G, B>,
}

/// A byte range `[va, va + len)` cut at page boundaries.
#[derive(Debug, Copy, Clone)]
struct Span {
    va: VirtualAddress,
    /// Position of the first byte within the caller's buffer.
    pos: usize,
    len: usize,
}

impl<G: PageGeometry, B: FrameAlloc<G> + PhysMapper<G>> Vmm<G, B> {
    /// Start with an empty address space over `backend`.
    #[must_use]
    pub const fn new(backend: B) -> Self {
        Self::from_address_space(AddressSpace::new(backend))
    }

    #[must_use]
    pub const fn from_address_space(aspace: AddressSpace<G, B>) -> Self {
        Self { aspace }
    }

    #[inline]
    #[must_use]
    pub const fn address_space(&self) -> &AddressSpace<G, B> {
        &self.aspace
    }

    #[inline]
    pub const fn address_space_mut(&mut self) -> &mut AddressSpace<G, B> {
        &mut self.aspace
    }

    #[must_use]
    pub fn into_address_space(self) -> AddressSpace<G, B> {
        self.aspace
    }

    /// Translate VA→PA if mapped.
    #[inline]
    #[must_use]
    pub fn translate(&self, va: VirtualAddress) -> Option<PhysicalAddress> {
        self.aspace.translate(va)
    }

    /// Make sure `va` is backed by a leaf page.
    ///
    /// # Errors
    /// Allocation fails, e.g. due to OOM.
    pub fn allocate(&mut self, va: VirtualAddress) -> Result<PhysicalPage<G>, VmmError> {
        Ok(self.aspace.allocate(va)?)
    }

    /// Make sure every page touched by `[va, va + len)` is backed.
    ///
    /// Returns the number of pages the range touches.
    ///
    /// # Errors
    /// [`VmmError::Allocate`] if allocation fails; pages before the failing
    /// one stay mapped.
    pub fn allocate_range(&mut self, va: VirtualAddress, len: u64) -> Result<usize, VmmError> {
        let mut pages = 0;
        for span in Self::spans(va, len) {
            self.aspace.allocate(span.va)?;
            pages += 1;
        }
        Ok(pages)
    }

    /// Tear down the address space. Returns the number of pages freed.
    pub fn release(&mut self) -> usize {
        self.aspace.release()
    }

    /// Store a little-endian machine word at `va`.
    ///
    /// The word stays within the leaf page of `va`: bytes that would run
    /// past the end of the page continue at its start.
    ///
    /// # Errors
    /// [`VmmError::Unmapped`] if `va` is not mapped; memory is left untouched.
    pub fn store(&mut self, va: VirtualAddress, value: u64) -> Result<(), VmmError> {
        let (page, offset) = self.word_slot(va)?;
        let frame = self.aspace.backend_mut().frame_mut(page);
        for (i, byte) in (0u64..).zip(value.to_le_bytes()) {
            frame[Self::word_byte(offset, i)] = byte;
        }
        Ok(())
    }

    /// Load a little-endian machine word from `va`.
    ///
    /// Reads the same bytes [`store`](Self::store) writes.
    ///
    /// # Errors
    /// [`VmmError::Unmapped`] if `va` is not mapped.
    pub fn load(&self, va: VirtualAddress) -> Result<u64, VmmError> {
        let (page, offset) = self.word_slot(va)?;
        let frame = self.aspace.backend().frame(page);
        let mut word = [0u8; WORD_BYTES];
        for (i, byte) in (0u64..).zip(word.iter_mut()) {
            *byte = frame[Self::word_byte(offset, i)];
        }
        Ok(u64::from_le_bytes(word))
    }

    fn word_slot(&self, va: VirtualAddress) -> Result<(PhysicalPage<G>, PageOffset<G>), VmmError> {
        let pa = self.translate(va).ok_or(VmmError::Unmapped { va })?;
        Ok(pa.split::<G>())
    }

    /// Frame index of byte `i` of the word at `offset`.
    #[inline]
    const fn word_byte(offset: PageOffset<G>, i: u64) -> usize {
        PageOffset::<G>::from_bits(offset.as_u64() + i).as_usize()
    }

    /// Copy `src` into the mapped range starting at `va`.
    ///
    /// Every page is translated before the first byte is written.
    ///
    /// # Errors
    /// [`VmmError::Unmapped`] naming the first unmapped page touched.
    pub fn write(&mut self, va: VirtualAddress, src: &[u8]) -> Result<(), VmmError> {
        let spans = Self::spans(va, src.len() as u64);
        self.probe(spans.clone())?;
        for span in spans {
            let pa = self.translate(span.va).ok_or(VmmError::Unmapped { va: span.va })?;
            let (page, offset) = pa.split::<G>();
            let frame = self.aspace.backend_mut().frame_mut(page);
            frame[offset.as_usize()..offset.as_usize() + span.len]
                .copy_from_slice(&src[span.pos..span.pos + span.len]);
        }
        Ok(())
    }

    /// Fill `dst` from the mapped range starting at `va`.
    ///
    /// # Errors
    /// [`VmmError::Unmapped`] naming the first unmapped page touched; `dst`
    /// is left untouched.
    pub fn read(&self, va: VirtualAddress, dst: &mut [u8]) -> Result<(), VmmError> {
        let spans = Self::spans(va, dst.len() as u64);
        self.probe(spans.clone())?;
        for span in spans {
            let pa = self.translate(span.va).ok_or(VmmError::Unmapped { va: span.va })?;
            let (page, offset) = pa.split::<G>();
            let frame = self.aspace.backend().frame(page);
            dst[span.pos..span.pos + span.len]
                .copy_from_slice(&frame[offset.as_usize()..offset.as_usize() + span.len]);
        }
        Ok(())
    }

    fn probe(&self, mut spans: impl Iterator<Item = Span>) -> Result<(), VmmError> {
        spans.try_for_each(|span| {
            if self.aspace.is_mapped(span.va) {
                Ok(())
            } else {
                Err(VmmError::Unmapped { va: span.va })
            }
        })
    }

    /// Cut `[va, va + len)` at page boundaries, wrapping modulo 2^64.
    fn spans(va: VirtualAddress, len: u64) -> impl Iterator<Item = Span> + Clone {
        let mut next = va;
        let mut pos = 0u64;
        core::iter::from_fn(move || {
            if pos >= len {
                return None;
            }
            let chunk = next.offset::<G>().remaining().min(len - pos);
            #[allow(clippy::cast_possible_truncation)]
            let span = Span {
                va: next,
                pos: pos as usize,
                len: chunk as usize,
            };
            pos += chunk;
            next = next.wrapping_add(chunk);
            Some(span)
        })
    }
}

/// Errors reported by [`Vmm`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VmmError {
    #[error("access to unmapped memory at {va}")]
    Unmapped { va: VirtualAddress },
    #[error(transparent)]
    Allocate(#[from] AllocateError),
}
