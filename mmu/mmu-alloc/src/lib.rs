//! # Frame Service and Memory Access for Simulated Page Tables
//!
//! Host-side building blocks around [`mmu_vmem::AddressSpace`]:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                Memory Accessor ([`vmm`])            │
//! │    • store / load of a machine word                 │
//! │    • read / write of byte ranges across pages       │
//! └─────────────────┬───────────────────────────────────┘
//!                   │ translate, then touch the frame
//! ┌─────────────────▼───────────────────────────────────┐
//! │         Paged Address Space (`mmu-vmem`)            │
//! │    • root table register                            │
//! │    • translate / allocate / release                 │
//! └─────────────────┬───────────────────────────────────┘
//!                   │ FrameAlloc + PhysMapper
//! ┌─────────────────▼───────────────────────────────────┐
//! │           Frame Arena ([`frame_alloc`])             │
//! │    • zero-filled, page-aligned frames by number     │
//! │    • free list reuse, optional frame budget         │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use mmu_addresses::{Pages4KLevels3, VirtualAddress};
//! use mmu_alloc::frame_alloc::FrameArena;
//! use mmu_vmem::AddressSpace;
//!
//! let mut aspace = AddressSpace::<Pages4KLevels3, _>::new(FrameArena::new());
//! let va = VirtualAddress::new(0x12_3456);
//! assert_eq!(aspace.translate(va), None);
//!
//! let leaf = aspace.allocate(va).unwrap();
//! assert_eq!(aspace.translate(va), Some(leaf.join(va.offset())));
//! assert_eq!(aspace.release(), 4);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

pub mod frame_alloc;
pub mod vmm;

pub use crate::frame_alloc::FrameArena;
pub use crate::vmm::{Vmm, VmmError};
