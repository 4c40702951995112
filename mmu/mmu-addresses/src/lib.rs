//! # Virtual and Physical Address Types for Multi-Level Page Tables
//!
//! Strongly typed wrappers for the addresses flowing through a page-table
//! walk, and the [`PageGeometry`] trait that fixes the table shape.
//!
//! ## Overview
//!
//! | Type | Generic | Description |
//! |------|---------|-------------|
//! | [`VirtualAddress`] | – | Input of a walk; split into VPN fields and an offset. |
//! | [`PhysicalAddress`] | – | Output of a walk; leaf page base plus offset. |
//! | [`PhysicalPage<G>`] | [`G: PageGeometry`](PageGeometry) | A page-aligned frame, stored as a frame number. |
//! | [`PageOffset<G>`] | [`G: PageGeometry`](PageGeometry) | An offset within a page of geometry `G`. |
//!
//! ## Geometries
//!
//! A [`PageGeometry`] names `POBITS` (page offset bits) and `LEVELS` (table
//! depth); the rest (`PAGE_SIZE`, `ENTRIES_PER_TABLE`, `BITS_PER_ENTRY`,
//! `VA_BITS`) is derived. Stock geometries:
//!
//! - [`Pages4KLevels3`]: 4 KiB pages, 3 levels, 39-bit span (default)
//! - [`Pages4KLevels4`]: 4 KiB pages, 4 levels, 48-bit span
//! - [`Pages4KLevels5`]: 4 KiB pages, 5 levels, 57-bit span
//! - [`Pages64Levels2`]: 64-byte pages, 2 levels, 12-bit span
//!
//! ## Typical Usage
//!
//! ```rust
//! # use mmu_addresses::*;
//! type G = Pages4KLevels3;
//!
//! let va = VirtualAddress::new(0x0000_0040_2010_3ABC);
//! let vpns: [u64; 3] = [va.vpn::<G>(0), va.vpn::<G>(1), va.vpn::<G>(2)];
//! let rebuilt = VirtualAddress::from_vpns::<G>(&vpns, va.offset::<G>());
//!
//! // Bit 38 and below survive, bit 39 and above are outside the walk.
//! assert_eq!(rebuilt.as_u64(), va.as_u64() & ((1 << G::VA_BITS) - 1));
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(clippy::inline_always)]

mod page_geometry;
mod page_offset;
mod physical_address;
mod physical_page;
mod virtual_address;

pub use crate::page_geometry::{
    ADDRESS_BITS, DefaultGeometry, PageGeometry, Pages4KLevels3, Pages4KLevels4, Pages4KLevels5,
    Pages64Levels2, WORD_SHIFT, WORD_SIZE,
};
pub use crate::page_offset::PageOffset;
pub use crate::physical_address::PhysicalAddress;
pub use crate::physical_page::PhysicalPage;
pub use crate::virtual_address::VirtualAddress;
