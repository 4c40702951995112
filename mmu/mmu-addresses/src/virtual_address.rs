use crate::{PageGeometry, PageOffset};
use core::fmt;
use core::ops::Add;

/// Virtual memory address.
///
/// A thin `u64` wrapper that denotes **virtual** addresses, i.e. the input of
/// a page-table walk. It carries no geometry; the split into VPN fields and
/// offset is computed on demand for a concrete [`PageGeometry`].
///
/// ### Semantics
/// - [`offset`](Self::offset) is the low `POBITS` bits.
/// - [`page_number`](Self::page_number) is everything above the offset.
/// - [`vpn`](Self::vpn) extracts the table index for one level, level `0`
///   being the root table.
///
/// ### Examples
/// ```rust
/// # use mmu_addresses::*;
/// let va = VirtualAddress::new(0x12_3456);
/// assert_eq!(va.offset::<Pages4KLevels3>().as_u64(), 0x456);
/// assert_eq!(va.vpn::<Pages4KLevels3>(0), 0);
/// assert_eq!(va.vpn::<Pages4KLevels3>(1), 0);
/// assert_eq!(va.vpn::<Pages4KLevels3>(2), 0x123);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualAddress(u64);

impl VirtualAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// In-page offset (low `POBITS` bits).
    #[inline]
    #[must_use]
    pub const fn offset<G: PageGeometry>(self) -> PageOffset<G> {
        PageOffset::from_bits(self.0)
    }

    /// All bits above the offset (`va >> POBITS`).
    #[inline]
    #[must_use]
    pub const fn page_number<G: PageGeometry>(self) -> u64 {
        self.0 >> G::POBITS
    }

    /// VPN field selecting the entry at `level` (`0` is the root table).
    ///
    /// Bits above [`PageGeometry::VA_BITS`] are discarded.
    ///
    /// ### Debug assertions
    /// - Asserts `level < G::LEVELS`.
    #[inline]
    #[must_use]
    pub const fn vpn<G: PageGeometry>(self, level: u32) -> u64 {
        debug_assert!(level < G::LEVELS);
        let shift = (G::LEVELS - 1 - level) * G::BITS_PER_ENTRY;
        (self.page_number::<G>() >> shift) & G::INDEX_MASK
    }

    /// Compose an address from one VPN per level (root first) and an offset.
    ///
    /// Each VPN is masked to `BITS_PER_ENTRY` bits; missing trailing levels
    /// are treated as zero.
    #[must_use]
    pub fn from_vpns<G: PageGeometry>(vpns: &[u64], offset: PageOffset<G>) -> Self {
        debug_assert!(vpns.len() <= G::LEVELS as usize);
        let mut page_number = 0u64;
        for level in 0..G::LEVELS {
            let vpn = vpns.get(level as usize).copied().unwrap_or_default();
            page_number = (page_number << G::BITS_PER_ENTRY) | (vpn & G::INDEX_MASK);
        }
        Self((page_number << G::POBITS) | offset.as_u64())
    }

    /// Address `rhs` bytes further up, wrapping past the top of the address
    /// space to `0`.
    #[inline]
    #[must_use]
    pub const fn wrapping_add(self, rhs: u64) -> Self {
        Self(self.0.wrapping_add(rhs))
    }
}

impl fmt::Debug for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VA(0x{:016X})", self.as_u64())
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.as_u64())
    }
}

impl From<u64> for VirtualAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}

impl From<VirtualAddress> for u64 {
    #[inline]
    fn from(va: VirtualAddress) -> Self {
        va.as_u64()
    }
}

impl Add<u64> for VirtualAddress {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u64) -> Self::Output {
        self.wrapping_add(rhs)
    }
}
