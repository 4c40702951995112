use crate::PageGeometry;
use core::fmt;
use core::marker::PhantomData;

/// The offset within a page of geometry `G` (`0..G::PAGE_SIZE`).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PageOffset<G: PageGeometry> {
    value: u64,
    _phantom: PhantomData<G>,
}

impl<G: PageGeometry> PageOffset<G> {
    /// Create from a raw value, asserting it is `< G::PAGE_SIZE` in debug.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        debug_assert!(value < G::PAGE_SIZE, "offset must be < page size");
        Self {
            value: value & G::OFFSET_MASK,
            _phantom: PhantomData,
        }
    }

    /// Take the low `POBITS` bits of `addr`.
    #[inline]
    #[must_use]
    pub const fn from_bits(addr: u64) -> Self {
        Self {
            value: addr & G::OFFSET_MASK,
            _phantom: PhantomData,
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.value
    }

    /// The offset as a byte index into a page buffer.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn as_usize(self) -> usize {
        self.value as usize
    }

    /// Bytes left in the page from this offset on.
    #[inline]
    #[must_use]
    pub const fn remaining(self) -> u64 {
        G::PAGE_SIZE - self.value
    }
}

impl<G: PageGeometry> fmt::Debug for PageOffset<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Offset<{}>({:#X})", G::as_str(), self.value)
    }
}

impl<G: PageGeometry> fmt::Display for PageOffset<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#X}", self.value)
    }
}
