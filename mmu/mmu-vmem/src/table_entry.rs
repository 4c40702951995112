//! # Table Entry
//!
//! One machine word inside a table page.
//!
//! ```text
//! | 63 ‒ 12      | 11 ‒ 1   | 0     |
//! | frame number | reserved | valid |
//! ```
//!
//! - **valid** (bit 0): the entry links to an allocated next-level page
//!   (a table page, or the leaf page at the last level). Clear means "not yet
//!   allocated"; a zero-filled table therefore starts out fully invalid.
//! - **frame number** (bits 12..63): handle of the linked page, as handed out
//!   by the [`FrameAlloc`](crate::FrameAlloc) service.
//!
//! No permission, accessed or dirty bits exist. For 4 KiB geometries the raw
//! value of a valid entry equals `page_base | 1`.

use bitfield_struct::bitfield;
use mmu_addresses::{PageGeometry, PhysicalPage};

/// Largest frame number an entry can link to.
pub const MAX_FRAME_NUMBER: u64 = (1 << 52) - 1;

/// A single table entry.
#[doc(alias = "PTE")]
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct TableEntry {
    /// **Valid** (bit 0): the frame number links to an allocated page.
    pub valid: bool,

    /// (bits 1..11): not interpreted.
    #[bits(11)]
    __reserved: u16,

    /// **Frame number** of the next-level page (bits 12..63).
    #[bits(52)]
    frame: u64,
}

impl TableEntry {
    /// Create a zero (invalid) entry.
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self::new()
    }

    /// Build a valid entry linking to `page`.
    ///
    /// ### Panics
    /// If the frame number exceeds [`MAX_FRAME_NUMBER`].
    #[inline]
    #[must_use]
    pub const fn pointing_to<G: PageGeometry>(page: PhysicalPage<G>) -> Self {
        Self::new()
            .with_valid(true)
            .with_frame(page.frame_number())
    }

    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.valid()
    }

    /// If valid, the linked next-level page.
    #[inline]
    #[must_use]
    pub const fn next_page<G: PageGeometry>(self) -> Option<PhysicalPage<G>> {
        if !self.valid() {
            return None;
        }
        Some(PhysicalPage::from_frame_number(self.frame()))
    }

    /// Return the raw 64-bit value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.into_bits()
    }

    /// Construct from a raw 64-bit value. No validation is performed.
    #[inline]
    #[must_use]
    pub const fn from_raw(v: u64) -> Self {
        Self::from_bits(v)
    }
}
