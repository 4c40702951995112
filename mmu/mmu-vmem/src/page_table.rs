//! # Table Pages
//!
//! A table page is an ordinary page whose bytes are read as an array of
//! [`TableEntry`] words (little endian). Nothing in the page marks it as a
//! table; its position in the tree does.
//!
//! - [`TableIndex`]: strongly typed VPN field for one level.
//! - [`PageTable`] / [`PageTableMut`]: entry views over a page buffer.
//! - [`walk_indices`]: the per-level indices of a virtual address, root first.

use crate::TableEntry;
use core::fmt;
use core::marker::PhantomData;
use mmu_addresses::{PageGeometry, VirtualAddress, WORD_SIZE};

const ENTRY_BYTES: usize = WORD_SIZE as usize;

/// Index into a table page of geometry `G` (range `0..G::ENTRIES_PER_TABLE`).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TableIndex<G: PageGeometry> {
    value: u64,
    _phantom: PhantomData<G>,
}

impl<G: PageGeometry> TableIndex<G> {
    /// Extract the VPN field for `level` (`0` is the root table).
    #[inline]
    #[must_use]
    pub const fn from_va(va: VirtualAddress, level: u32) -> Self {
        Self::new(va.vpn::<G>(level))
    }

    /// Construct from a raw value.
    ///
    /// ### Debug assertions
    /// - Asserts `v < G::ENTRIES_PER_TABLE` in debug builds.
    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        debug_assert!(v < G::ENTRIES_PER_TABLE);
        Self {
            value: v,
            _phantom: PhantomData,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.value
    }

    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn as_usize(self) -> usize {
        self.value as usize
    }

    #[inline]
    const fn byte_range(self) -> core::ops::Range<usize> {
        let start = self.as_usize() * ENTRY_BYTES;
        start..start + ENTRY_BYTES
    }
}

impl<G: PageGeometry> fmt::Debug for TableIndex<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TableIndex<{}>({})", G::as_str(), self.value)
    }
}

impl<G: PageGeometry> fmt::Display for TableIndex<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}

/// The table indices of `va` for every level, root first.
#[inline]
pub fn walk_indices<G: PageGeometry>(va: VirtualAddress) -> impl Iterator<Item = TableIndex<G>> {
    (0..G::LEVELS).map(move |level| TableIndex::from_va(va, level))
}

/// Every index of a table page, in ascending order.
#[inline]
pub fn all_indices<G: PageGeometry>() -> impl Iterator<Item = TableIndex<G>> {
    (0..G::ENTRIES_PER_TABLE).map(TableIndex::new)
}

#[inline]
fn read_entry(bytes: &[u8], range: core::ops::Range<usize>) -> TableEntry {
    let mut word = [0u8; ENTRY_BYTES];
    word.copy_from_slice(&bytes[range]);
    TableEntry::from_raw(u64::from_le_bytes(word))
}

/// Read-only view of a table page.
pub struct PageTable<'a, G: PageGeometry> {
    bytes: &'a [u8],
    _phantom: PhantomData<G>,
}

impl<'a, G: PageGeometry> PageTable<'a, G> {
    /// Interpret `bytes` as a table page.
    ///
    /// ### Debug assertions
    /// - Asserts `bytes.len() == G::PAGE_SIZE`.
    #[inline]
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        debug_assert_eq!(bytes.len() as u64, G::PAGE_SIZE);
        Self {
            bytes,
            _phantom: PhantomData,
        }
    }

    /// Read the entry at `i`.
    #[inline]
    #[must_use]
    pub fn get(&self, i: TableIndex<G>) -> TableEntry {
        read_entry(self.bytes, i.byte_range())
    }

    /// Iterate over all valid entries with their index.
    pub fn valid_entries(&self) -> impl Iterator<Item = (TableIndex<G>, TableEntry)> + '_ {
        all_indices::<G>()
            .map(|i| (i, self.get(i)))
            .filter(|(_, e)| e.is_valid())
    }
}

/// Mutable view of a table page.
pub struct PageTableMut<'a, G: PageGeometry> {
    bytes: &'a mut [u8],
    _phantom: PhantomData<G>,
}

impl<'a, G: PageGeometry> PageTableMut<'a, G> {
    /// Interpret `bytes` as a table page.
    ///
    /// ### Debug assertions
    /// - Asserts `bytes.len() == G::PAGE_SIZE`.
    #[inline]
    #[must_use]
    pub fn new(bytes: &'a mut [u8]) -> Self {
        debug_assert_eq!(bytes.len() as u64, G::PAGE_SIZE);
        Self {
            bytes,
            _phantom: PhantomData,
        }
    }

    /// Read the entry at `i`.
    #[inline]
    #[must_use]
    pub fn get(&self, i: TableIndex<G>) -> TableEntry {
        read_entry(self.bytes, i.byte_range())
    }

    /// Write the entry at `i`.
    #[inline]
    pub fn set(&mut self, i: TableIndex<G>, e: TableEntry) {
        self.bytes[i.byte_range()].copy_from_slice(&e.raw().to_le_bytes());
    }
}
