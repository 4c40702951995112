use crate::{PageGeometry, PageOffset, PhysicalAddress};
use core::fmt;
use core::marker::PhantomData;

/// A page-aligned physical page (frame) of geometry `G`.
///
/// Stored as a **frame number**; the base address is `frame << POBITS`, so
/// the low `POBITS` bits of [`base`](Self::base) are always zero. Table
/// entries and frame services exchange pages in this form rather than as raw
/// pointers.
///
/// ### Examples
/// ```rust
/// # use mmu_addresses::*;
/// let pp = PhysicalPage::<Pages4KLevels3>::from_frame_number(3);
/// assert_eq!(pp.base().as_u64(), 0x3000);
/// let pa = pp.join(PageOffset::new(0x10));
/// assert_eq!(pa.as_u64(), 0x3010);
/// assert_eq!(pa.page::<Pages4KLevels3>(), pp);
/// ```
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalPage<G: PageGeometry> {
    frame: u64,
    _phantom: PhantomData<G>,
}

impl<G: PageGeometry> PhysicalPage<G> {
    #[inline]
    #[must_use]
    pub const fn from_frame_number(frame: u64) -> Self {
        Self {
            frame,
            _phantom: PhantomData,
        }
    }

    /// The page containing `pa` (offset bits dropped).
    #[inline]
    #[must_use]
    pub const fn from_addr(pa: PhysicalAddress) -> Self {
        Self::from_frame_number(pa.as_u64() >> G::POBITS)
    }

    #[inline]
    #[must_use]
    pub const fn frame_number(self) -> u64 {
        self.frame
    }

    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        PhysicalAddress::new(self.frame << G::POBITS)
    }

    #[inline]
    #[must_use]
    pub const fn join(self, off: PageOffset<G>) -> PhysicalAddress {
        PhysicalAddress::new(self.base().as_u64() | off.as_u64())
    }
}

impl<G: PageGeometry> fmt::Display for PhysicalPage<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.base(), f)
    }
}

impl<G: PageGeometry> fmt::Debug for PhysicalPage<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PhysicalPage<{}>({:#018X})",
            G::as_str(),
            self.base().as_u64()
        )
    }
}
