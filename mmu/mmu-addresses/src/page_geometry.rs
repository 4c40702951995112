use core::fmt;
use core::hash::Hash;

/// Size of a table entry (one machine word) in bytes.
pub const WORD_SIZE: u64 = 8;

/// `log2(WORD_SIZE)`.
pub const WORD_SHIFT: u32 = 3;

/// Width of the addresses the walk operates on.
pub const ADDRESS_BITS: u32 = u64::BITS;

/// Shape of a multi-level page table.
///
/// A geometry fixes the page size (`2^POBITS` bytes) and the number of table
/// levels. Everything else is derived from these two values:
///
/// ```text
/// | VPN[0] | VPN[1] | … | VPN[LEVELS-1] | offset |
/// |  BPE   |  BPE   |   |      BPE      | POBITS |
/// ```
///
/// where `BPE = BITS_PER_ENTRY = POBITS - log2(WORD_SIZE)`, i.e. every table
/// page holds exactly `PAGE_SIZE / WORD_SIZE` entries.
///
/// Virtual address bits above [`VA_BITS`](Self::VA_BITS) are not looked at by
/// the walk; two addresses that only differ there alias the same mapping.
///
/// Implement this for a marker type to describe your own geometry:
///
/// ```rust
/// # use mmu_addresses::PageGeometry;
/// #[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
/// struct Sv39;
///
/// impl core::fmt::Display for Sv39 {
///     fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
///         f.write_str(Self::as_str())
///     }
/// }
///
/// impl PageGeometry for Sv39 {
///     const POBITS: u32 = 12;
///     const LEVELS: u32 = 3;
///
///     fn as_str() -> &'static str {
///         "sv39"
///     }
/// }
///
/// assert_eq!(Sv39::ENTRIES_PER_TABLE, 512);
/// assert_eq!(Sv39::VA_BITS, 39);
/// ```
pub trait PageGeometry:
    Clone + Copy + Default + Eq + PartialEq + Ord + PartialOrd + Hash + fmt::Display + fmt::Debug
{
    /// Number of page-offset bits; `PAGE_SIZE = 2^POBITS`.
    const POBITS: u32;

    /// Number of table levels walked before reaching the leaf page.
    const LEVELS: u32;

    /// Page size in bytes.
    const PAGE_SIZE: u64 = 1 << Self::POBITS;

    /// Mask selecting the in-page offset of an address.
    const OFFSET_MASK: u64 = Self::PAGE_SIZE - 1;

    /// Entries per table page.
    const ENTRIES_PER_TABLE: u64 = Self::PAGE_SIZE / WORD_SIZE;

    /// Width of one VPN field.
    const BITS_PER_ENTRY: u32 = Self::POBITS - WORD_SHIFT;

    /// Mask selecting one VPN field after shifting.
    const INDEX_MASK: u64 = Self::ENTRIES_PER_TABLE - 1;

    /// Number of virtual address bits consumed by the walk.
    const VA_BITS: u32 = Self::LEVELS * Self::BITS_PER_ENTRY + Self::POBITS;

    /// Evaluates to `()` for a usable geometry and fails compilation otherwise.
    ///
    /// Reference it (`let () = G::ASSERT_VALID;`) from code that instantiates
    /// a walk for `G`.
    const ASSERT_VALID: () = {
        assert!(Self::POBITS > WORD_SHIFT, "a table page must hold at least two entries");
        assert!(Self::POBITS < ADDRESS_BITS, "page offset must leave room for a page number");
        assert!(Self::LEVELS >= 1, "at least one table level is required");
        assert!(Self::VA_BITS <= ADDRESS_BITS, "VPN fields exceed the address width");
    };

    fn as_str() -> &'static str;
}

macro_rules! geometry {
    ($(#[$meta:meta])* $name:ident, $pobits:literal, $levels:literal, $label:literal) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name;

        impl PageGeometry for $name {
            const POBITS: u32 = $pobits;
            const LEVELS: u32 = $levels;

            fn as_str() -> &'static str {
                $label
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(Self::as_str())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self, f)
            }
        }
    };
}

geometry!(
    /// 4 KiB pages, three levels of 512 entries (39-bit span).
    ///
    /// This is the default geometry.
    Pages4KLevels3,
    12,
    3,
    "4K/3"
);

geometry!(
    /// 4 KiB pages, four levels of 512 entries (48-bit span, x86-64 / Sv48 shape).
    Pages4KLevels4,
    12,
    4,
    "4K/4"
);

geometry!(
    /// 4 KiB pages, five levels of 512 entries (57-bit span).
    Pages4KLevels5,
    12,
    5,
    "4K/5"
);

geometry!(
    /// 64-byte pages, two levels of 8 entries (12-bit span).
    ///
    /// Small enough to enumerate every address.
    Pages64Levels2,
    6,
    2,
    "64/2"
);

/// The geometry used when none is named.
pub type DefaultGeometry = Pages4KLevels3;
