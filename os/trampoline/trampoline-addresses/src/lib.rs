//! # Physical Address and Range Types
//!
//! Strongly typed wrappers for the raw physical addresses and byte ranges the
//! trampoline juggles while it moves boot data around before any paging is set
//! up.
//!
//! ## Overview
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PhysicalAddress`] | A raw 64-bit physical address. |
//! | [`PhysicalRange`] | A half-open `[start, start + len)` span of physical memory. |
//! | [`PageSize`] / [`Size4K`] | Alignment granularity used for every relocation target. |
//!
//! Multiboot2 module tags describe their payload with an **inclusive** end
//! address, descriptors and ELF segments with a length. Both are normalized into
//! [`PhysicalRange`] at the boundary (see [`PhysicalRange::from_inclusive`]) so
//! that all overlap arithmetic happens on a single representation.
//!
//! ## Typical Usage
//!
//! ```rust
//! # use trampoline_addresses::*;
//! let module = PhysicalRange::from_inclusive(
//!     PhysicalAddress::new(0x20_0000),
//!     PhysicalAddress::new(0x20_FFFF),
//! );
//! assert_eq!(module.len(), 0x1_0000);
//!
//! let segment = PhysicalRange::new(PhysicalAddress::new(0x20_8000), 0x1000);
//! assert!(module.intersects(segment));
//!
//! let aligned = PhysicalAddress::new(0x10_0042).align_up::<Size4K>();
//! assert_eq!(aligned, Some(PhysicalAddress::new(0x10_1000)));
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod physical_address;
mod physical_range;

pub use physical_address::PhysicalAddress;
pub use physical_range::PhysicalRange;

use core::fmt;

/// One mebibyte.
pub const MIB: u64 = 1024 * 1024;

/// One gibibyte.
pub const GIB: u64 = 1024 * MIB;

/// The first address that does not fit a 32-bit Multiboot2 module field.
pub const FOUR_GIB: u64 = 4 * GIB;

/// Sealed trait pattern to restrict `PageSize` impls to our markers.
mod sealed {
    pub trait Sealed {}
}

/// Marker trait for supported alignment granularities.
pub trait PageSize: sealed::Sealed + Copy + fmt::Debug {
    /// Page size in bytes (power of two).
    const SIZE: u64;
}

/// 4 KiB page (4096 bytes).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Size4K;
impl sealed::Sealed for Size4K {}
impl PageSize for Size4K {
    const SIZE: u64 = 4096;
}
