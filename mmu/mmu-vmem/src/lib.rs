//! # Multi-Level Page Table Walk
//!
//! A software model of hierarchical address translation: a tree of fixed-size
//! table pages, walked top-down by the VPN fields of a virtual address, with
//! missing levels created on demand.
//!
//! ## What you get
//! - An [`AddressSpace`] owning the root table register and the page tree.
//! - A [`TableEntry`] word format (valid bit + frame number).
//! - [`PageTable`]/[`PageTableMut`] views and the [`TableIndex`] helpers.
//! - The page services the walk consumes ([`FrameAlloc`], [`PhysMapper`]).
//!
//! ## Virtual Address → Physical Address Walk
//!
//! With the default geometry (4 KiB pages, 3 levels) a virtual address is
//! divided into four fields:
//!
//! ```text
//! | 38‒30  | 29‒21  | 20‒12  | 11‒0   |
//! | VPN[0] | VPN[1] | VPN[2] | Offset |
//! ```
//!
//! Each VPN selects one of 512 (2⁹) 8-byte entries in the table at its level:
//!
//! ```text
//!  root  →  table  →  table  →  leaf page
//!   │        │         │
//!   │        │         └───► VPN[2] entry links the leaf page
//!   │        └─────────────► VPN[1] entry links the last table
//!   └──────────────────────► VPN[0] entry links the middle table
//! ```
//!
//! The physical address is `leaf_base | offset`. Bits above the walked span
//! (bit 39 and up here) are ignored. Other shapes are selected through the
//! [`PageGeometry`](mmu_addresses::PageGeometry) type parameter.
//!
//! ## Example
//!
//! See the `mmu-alloc` crate for a ready-made frame service; any type
//! implementing both [`FrameAlloc`] and [`PhysMapper`] works.

#![cfg_attr(not(test), no_std)]

pub mod address_space;
mod page_table;
mod table_entry;

pub use crate::address_space::{AddressSpace, AllocateError, NOT_MAPPED};
pub use crate::page_table::{
    PageTable, PageTableMut, TableIndex, all_indices, walk_indices,
};
pub use crate::table_entry::{MAX_FRAME_NUMBER, TableEntry};
pub use mmu_addresses as addresses;

use mmu_addresses::{PageGeometry, PhysicalPage};

/// Source of **zero-filled, page-aligned** frames for table and leaf pages.
///
/// The implementation decides where frames come from (arena, pool, host
/// allocator). A returned frame must be exclusively owned by the caller until
/// it is passed back to [`free_frame`](Self::free_frame), and every byte of
/// it must read as zero.
///
/// Returns `None` on out-of-memory.
pub trait FrameAlloc<G: PageGeometry> {
    /// Allocate one zero-filled frame of `G::PAGE_SIZE` bytes.
    fn alloc_frame(&mut self) -> Option<PhysicalPage<G>>;

    /// Release a frame previously returned by [`alloc_frame`](Self::alloc_frame).
    fn free_frame(&mut self, page: PhysicalPage<G>);
}

/// Gives the walk access to the bytes of a frame.
///
/// Both methods return exactly `G::PAGE_SIZE` bytes. Implementations may
/// panic for frames they never handed out.
pub trait PhysMapper<G: PageGeometry> {
    /// Borrow the contents of `page`.
    fn frame(&self, page: PhysicalPage<G>) -> &[u8];

    /// Mutably borrow the contents of `page`.
    fn frame_mut(&mut self, page: PhysicalPage<G>) -> &mut [u8];
}

impl<G: PageGeometry, T: FrameAlloc<G> + ?Sized> FrameAlloc<G> for &mut T {
    #[inline]
    fn alloc_frame(&mut self) -> Option<PhysicalPage<G>> {
        (**self).alloc_frame()
    }

    #[inline]
    fn free_frame(&mut self, page: PhysicalPage<G>) {
        (**self).free_frame(page);
    }
}

impl<G: PageGeometry, T: PhysMapper<G> + ?Sized> PhysMapper<G> for &mut T {
    #[inline]
    fn frame(&self, page: PhysicalPage<G>) -> &[u8] {
        (**self).frame(page)
    }

    #[inline]
    fn frame_mut(&mut self, page: PhysicalPage<G>) -> &mut [u8] {
        (**self).frame_mut(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmu_addresses::{Pages4KLevels3, Pages64Levels2, VirtualAddress};

    /// A trivial **bump** frame source over a vector of page buffers.
    ///
    /// Frame `n` lives at `frames[n - 1]`; frame 0 is never handed out. Freed
    /// frames are only counted, never reused, so a double free or a leak shows
    /// up in the counters.
    struct TestPhys<G: PageGeometry> {
        frames: Vec<Vec<u8>>,
        limit: usize,
        freed: Vec<u64>,
        _phantom: core::marker::PhantomData<G>,
    }

    impl<G: PageGeometry> TestPhys<G> {
        fn with_limit(limit: usize) -> Self {
            Self {
                frames: Vec::new(),
                limit,
                freed: Vec::new(),
                _phantom: core::marker::PhantomData,
            }
        }

        fn allocated(&self) -> usize {
            self.frames.len()
        }

        fn idx(page: PhysicalPage<G>) -> usize {
            usize::try_from(page.frame_number() - 1).expect("frame index")
        }
    }

    impl<G: PageGeometry> FrameAlloc<G> for TestPhys<G> {
        fn alloc_frame(&mut self) -> Option<PhysicalPage<G>> {
            if self.frames.len() >= self.limit {
                return None;
            }
            self.frames.push(vec![0u8; G::PAGE_SIZE as usize]);
            Some(PhysicalPage::from_frame_number(self.frames.len() as u64))
        }

        fn free_frame(&mut self, page: PhysicalPage<G>) {
            assert!(!self.freed.contains(&page.frame_number()), "double free");
            self.freed.push(page.frame_number());
        }
    }

    impl<G: PageGeometry> PhysMapper<G> for TestPhys<G> {
        fn frame(&self, page: PhysicalPage<G>) -> &[u8] {
            &self.frames[Self::idx(page)]
        }

        fn frame_mut(&mut self, page: PhysicalPage<G>) -> &mut [u8] {
            &mut self.frames[Self::idx(page)]
        }
    }

    fn space_4k(limit: usize) -> AddressSpace<Pages4KLevels3, TestPhys<Pages4KLevels3>> {
        AddressSpace::new(TestPhys::with_limit(limit))
    }

    #[test]
    fn fresh_space_maps_nothing() {
        let aspace = space_4k(64);
        assert!(!aspace.is_active());
        for va in [0, 0x12_3456, 0x7F_FFFF_FFFF, u64::MAX] {
            assert_eq!(aspace.translate(VirtualAddress::new(va)), None);
            assert_eq!(aspace.translate_raw(va), NOT_MAPPED);
        }
        assert_eq!(aspace.page_count(), 0);
        assert_eq!(aspace.backend().allocated(), 0);
    }

    #[test]
    fn allocate_creates_tables_and_leaf() {
        type G = Pages4KLevels3;
        let mut aspace = AddressSpace::<G, _>::new(TestPhys::<G>::with_limit(64));

        let va = VirtualAddress::new(0x12_3456);
        let leaf = aspace.allocate(va).expect("allocate");

        // root + 2 intermediate tables + leaf
        assert_eq!(aspace.backend().allocated(), 4);
        assert_eq!(aspace.page_count(), 4);

        // Walk the tables again and verify entries were created and look sane.
        let root = aspace.root_page().expect("root");
        let mut page = root;
        for (level, index) in (0..G::LEVELS).zip(walk_indices::<G>(va)) {
            let table = PageTable::<G>::new(aspace.backend().frame(page));
            let entry = table.get(index);
            assert!(entry.is_valid(), "level {level} not valid");
            assert_eq!(table.valid_entries().count(), 1);
            page = entry.next_page().expect("next");
        }
        assert_eq!(page, leaf);

        let pa = aspace.translate(va).expect("mapped");
        assert_eq!(pa, leaf.join(va.offset::<G>()));
        assert_eq!(pa.as_u64() & G::OFFSET_MASK, 0x456);
        assert_eq!(aspace.translate_raw(0x12_3456), pa.as_u64());
    }

    #[test]
    fn allocate_is_idempotent() {
        let mut aspace = space_4k(64);
        let va = VirtualAddress::new(0xDEAD_B000);

        let first = aspace.allocate(va).expect("allocate");
        let allocated = aspace.backend().allocated();
        let second = aspace.allocate(va).expect("allocate");

        assert_eq!(first, second);
        assert_eq!(aspace.backend().allocated(), allocated);
    }

    #[test]
    fn translate_never_allocates() {
        let mut aspace = space_4k(64);
        aspace.allocate(VirtualAddress::new(0x1000)).expect("allocate");
        let allocated = aspace.backend().allocated();

        // Shares the root but diverges at level 1.
        let other = VirtualAddress::new(0x4000_0000);
        assert_eq!(aspace.translate(other), None);
        assert!(!aspace.is_mapped(other));
        assert_eq!(aspace.backend().allocated(), allocated);
    }

    #[test]
    fn out_of_memory_at_root() {
        let mut aspace = space_4k(0);
        let err = aspace.allocate(VirtualAddress::new(0)).unwrap_err();
        assert_eq!(err, AllocateError::OomRoot);
        assert!(!aspace.is_active());
    }

    #[test]
    fn out_of_memory_keeps_partial_chain_linked() {
        // root + level-0 child only; the level-1 child cannot be allocated.
        let mut aspace = space_4k(2);
        let va = VirtualAddress::new(0x12_3456);
        let err = aspace.allocate(va).unwrap_err();
        assert_eq!(err, AllocateError::OomLevel { level: 1 });
        assert_eq!(aspace.translate(va), None);
        assert_eq!(aspace.page_count(), 2);

        // Leaf missing: the last level fails.
        let mut aspace = space_4k(3);
        let err = aspace.allocate(va).unwrap_err();
        assert_eq!(err, AllocateError::OomLevel { level: 2 });
        assert_eq!(aspace.release(), 3);
    }

    #[test]
    fn release_frees_every_page_once() {
        type G = Pages64Levels2;
        let mut phys = TestPhys::<G>::with_limit(1024);
        {
            let mut aspace = AddressSpace::<G, _>::new(&mut phys);
            for va in [0x000, 0x001, 0x040, 0x200, 0xFFF] {
                aspace.allocate(VirtualAddress::new(va)).expect("allocate");
            }
            let pages = aspace.page_count();
            assert_eq!(aspace.release(), pages);
            assert!(!aspace.is_active());
            assert_eq!(aspace.release(), 0);
            assert_eq!(aspace.translate(VirtualAddress::new(0x001)), None);
        }
        assert_eq!(phys.freed.len(), phys.allocated());
    }

    #[test]
    fn drop_releases_tree() {
        let mut phys = TestPhys::<Pages4KLevels3>::with_limit(64);
        {
            let mut aspace = AddressSpace::<Pages4KLevels3, _>::new(&mut phys);
            aspace.allocate(VirtualAddress::new(0x12_3456)).expect("allocate");
            aspace.allocate(VirtualAddress::new(0x40_0000_0000)).expect("allocate");
        }
        assert_eq!(phys.allocated(), 7);
        assert_eq!(phys.freed.len(), 7);
    }
}
