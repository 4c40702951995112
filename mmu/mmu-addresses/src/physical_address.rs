use crate::{PageGeometry, PageOffset, PhysicalPage};
use core::fmt;

/// Physical memory address.
///
/// The output of a successful walk: the base of a leaf page plus the in-page
/// offset carried over from the virtual address. Like [`VirtualAddress`](super::VirtualAddress),
/// this type only carries intent and prevents accidental VA↔PA mix-ups.
///
/// ### Examples
/// ```rust
/// # use mmu_addresses::*;
/// let pa = PhysicalAddress::new(0x0000_0000_0002_3042);
/// let (pp, off) = pa.split::<Pages4KLevels3>();
/// assert_eq!(pp.frame_number(), 0x23);
/// assert_eq!(off.as_u64(), 0x42);
/// assert_eq!(pp.join(off), pa);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(u64);

impl PhysicalAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// The page containing this address.
    #[inline]
    #[must_use]
    pub const fn page<G: PageGeometry>(self) -> PhysicalPage<G> {
        PhysicalPage::from_addr(self)
    }

    #[inline]
    #[must_use]
    pub const fn offset<G: PageGeometry>(self) -> PageOffset<G> {
        PageOffset::from_bits(self.0)
    }

    #[inline]
    #[must_use]
    pub const fn split<G: PageGeometry>(self) -> (PhysicalPage<G>, PageOffset<G>) {
        (self.page::<G>(), self.offset::<G>())
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA(0x{:016X})", self.as_u64())
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.as_u64())
    }
}

impl From<u64> for PhysicalAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}

impl From<PhysicalAddress> for u64 {
    #[inline]
    fn from(pa: PhysicalAddress) -> Self {
        pa.as_u64()
    }
}

impl<G> From<PhysicalPage<G>> for PhysicalAddress
where
    G: PageGeometry,
{
    fn from(value: PhysicalPage<G>) -> Self {
        value.base()
    }
}
