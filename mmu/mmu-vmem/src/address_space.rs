//! # Paged Address Space
//!
//! A single virtual address space: the root table register plus the tree of
//! table and leaf pages hanging off it.
//!
//! ## Highlights
//!
//! - [`AddressSpace::translate`] walks the tree read-only and yields the
//!   physical address, or `None` if any level is not valid.
//! - [`AddressSpace::allocate`] performs the same walk, linking a fresh
//!   zero-filled page wherever an entry is invalid. Already-valid entries are
//!   followed unchanged, so the call is idempotent.
//! - [`AddressSpace::release`] tears the whole tree down post-order.
//!
//! ## Ownership
//!
//! The root page belongs to the address space; every other page belongs to
//! the entry that links it. Pages are never unlinked individually, so the
//! only way to give them back is [`release`](AddressSpace::release), which
//! also runs on drop.

use crate::page_table::{PageTable, PageTableMut, TableIndex, all_indices, walk_indices};
use crate::{FrameAlloc, PhysMapper, TableEntry};
use core::fmt;
use core::marker::PhantomData;
use log::{debug, trace, warn};
use mmu_addresses::{PageGeometry, PhysicalAddress, PhysicalPage, VirtualAddress};

/// Raw translation result for an unmapped address (all bits set).
pub const NOT_MAPPED: u64 = u64::MAX;

/// Handle to a single, concrete address space.
///
/// `B` provides the page services: zero-filled frames ([`FrameAlloc`]) and
/// access to their bytes ([`PhysMapper`]).
pub struct AddressSpace<G: PageGeometry, B: FrameAlloc<G> + PhysMapper<G>> {
    root: Option<PhysicalPage<G>>,
    backend: B,
    _phantom: PhantomData<G>,
}

/// Error returned by [`AddressSpace::allocate`] when the frame service is
/// exhausted.
///
/// Pages linked before the failure stay linked; they are valid, reachable
/// and returned by [`AddressSpace::release`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocateError {
    /// The root table could not be allocated.
    #[error("out of memory (root table)")]
    OomRoot,
    /// The page to be linked from the table at `level` could not be allocated.
    ///
    /// `level` counts from `0` (root table); at `LEVELS - 1` the missing page
    /// is the leaf.
    #[error("out of memory (page below level {level})")]
    OomLevel { level: u32 },
}

impl<G: PageGeometry, B: FrameAlloc<G> + PhysMapper<G>> AddressSpace<G, B> {
    /// Create an address space with no root table.
    ///
    /// Nothing is allocated until the first [`allocate`](Self::allocate).
    #[inline]
    #[must_use]
    pub const fn new(backend: B) -> Self {
        let () = G::ASSERT_VALID;
        Self {
            root: None,
            backend,
            _phantom: PhantomData,
        }
    }

    /// Physical page of the root table, if one was allocated.
    #[inline]
    #[must_use]
    pub const fn root_page(&self) -> Option<PhysicalPage<G>> {
        self.root
    }

    /// Whether a root table exists.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.root.is_some()
    }

    #[inline]
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the page services.
    ///
    /// Freeing a frame that is still linked into this tree corrupts it.
    #[inline]
    pub const fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    #[inline]
    fn table(&self, page: PhysicalPage<G>) -> PageTable<'_, G> {
        PageTable::new(self.backend.frame(page))
    }

    #[inline]
    fn table_mut(&mut self, page: PhysicalPage<G>) -> PageTableMut<'_, G> {
        PageTableMut::new(self.backend.frame_mut(page))
    }

    /// The leaf page backing `va`, if every level of the walk is valid.
    ///
    /// Never allocates.
    #[must_use]
    pub fn leaf_page(&self, va: VirtualAddress) -> Option<PhysicalPage<G>> {
        let mut page = self.root?;
        for index in walk_indices::<G>(va) {
            page = self.table(page).get(index).next_page()?;
        }
        Some(page)
    }

    /// Translate a `VirtualAddress` to a `PhysicalAddress` if mapped.
    ///
    /// The result is the leaf page base with the in-page offset of `va`.
    /// `None` means the address is not mapped: either there is no root yet or
    /// some level holds an invalid entry. Never allocates.
    #[inline]
    #[must_use]
    pub fn translate(&self, va: VirtualAddress) -> Option<PhysicalAddress> {
        self.leaf_page(va).map(|leaf| leaf.join(va.offset::<G>()))
    }

    /// Like [`translate`](Self::translate), with unmapped addresses reported
    /// as [`NOT_MAPPED`].
    #[inline]
    #[must_use]
    pub fn translate_raw(&self, va: u64) -> u64 {
        self.translate(VirtualAddress::new(va))
            .map_or(NOT_MAPPED, PhysicalAddress::as_u64)
    }

    #[inline]
    #[must_use]
    pub fn is_mapped(&self, va: VirtualAddress) -> bool {
        self.leaf_page(va).is_some()
    }

    /// Ensure a mapping for `va` exists, allocating the root, any missing
    /// intermediate tables and the leaf page.
    ///
    /// Returns the leaf page. If `va` is already mapped nothing changes and
    /// the existing leaf is returned.
    ///
    /// # Errors
    /// - [`AllocateError`] if the frame service runs dry. No rollback is
    ///   attempted.
    pub fn allocate(&mut self, va: VirtualAddress) -> Result<PhysicalPage<G>, AllocateError> {
        let mut page = self.ensure_root()?;
        for (level, index) in (0..G::LEVELS).zip(walk_indices::<G>(va)) {
            let entry = self.table(page).get(index);
            page = match entry.next_page() {
                Some(next) => next,
                None => self.link_new_page(page, index, level, va)?,
            };
        }
        Ok(page)
    }

    fn ensure_root(&mut self) -> Result<PhysicalPage<G>, AllocateError> {
        if let Some(root) = self.root {
            return Ok(root);
        }
        let Some(root) = self.backend.alloc_frame() else {
            warn!("Unable to allocate root table ({} geometry)", G::as_str());
            return Err(AllocateError::OomRoot);
        };
        debug!("Created root table at {root} ({} geometry)", G::as_str());
        self.root = Some(root);
        Ok(root)
    }

    fn link_new_page(
        &mut self,
        table: PhysicalPage<G>,
        index: TableIndex<G>,
        level: u32,
        va: VirtualAddress,
    ) -> Result<PhysicalPage<G>, AllocateError> {
        let Some(next) = self.backend.alloc_frame() else {
            warn!("Unable to allocate page below level {level} for {va}");
            return Err(AllocateError::OomLevel { level });
        };
        self.table_mut(table).set(index, TableEntry::pointing_to(next));
        trace!(
            "Linked {} {next} at level {level} index {index} for {va}",
            if level + 1 == G::LEVELS { "leaf" } else { "table" }
        );
        Ok(next)
    }

    /// Number of pages owned by the tree, root included.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.root.map_or(0, |root| self.count_subtree(root, 0))
    }

    fn count_subtree(&self, page: PhysicalPage<G>, level: u32) -> usize {
        if level == G::LEVELS {
            return 1;
        }
        let table = self.table(page);
        1 + table
            .valid_entries()
            .filter_map(|(_, e)| e.next_page())
            .map(|child| self.count_subtree(child, level + 1))
            .sum::<usize>()
    }

    /// Release every table and leaf page and reset the root.
    ///
    /// Pages are handed back to the frame service children first. Returns
    /// the number of pages freed; `0` if there was no root.
    pub fn release(&mut self) -> usize {
        let Some(root) = self.root.take() else {
            return 0;
        };
        let freed = self.release_subtree(root, 0);
        debug!("Released {freed} pages ({} geometry)", G::as_str());
        freed
    }

    fn release_subtree(&mut self, page: PhysicalPage<G>, level: u32) -> usize {
        let mut freed = 0;
        if level < G::LEVELS {
            for index in all_indices::<G>() {
                let entry = self.table(page).get(index);
                if let Some(child) = entry.next_page() {
                    freed += self.release_subtree(child, level + 1);
                }
            }
        }
        self.backend.free_frame(page);
        freed + 1
    }
}

impl<G: PageGeometry, B: FrameAlloc<G> + PhysMapper<G>> Drop for AddressSpace<G, B> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<G: PageGeometry, B: FrameAlloc<G> + PhysMapper<G>> fmt::Debug for AddressSpace<G, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressSpace")
            .field("geometry", &G::as_str())
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}
