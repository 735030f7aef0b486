//! # Multiboot2 Boot Descriptor
//!
//! Read and edit the tagged boot information structure a Multiboot2 loader
//! hands to the trampoline.
//!
//! ## Wire Format
//!
//! ```text
//! +0   total_size : u32   (includes this header)
//! +4   reserved   : u32
//! +8   tag 0      : { type: u32, size: u32, payload[size - 8] }
//!      padding to the next 8-byte boundary
//!      tag 1 ...
//!      end tag    : { type: 0, size: 8 }
//! ```
//!
//! ## Trust Boundary
//!
//! The descriptor is external input. Every tag is read through a
//! bounds-checked cursor over a byte slice ([`BootDescriptor`]): a tag whose
//! declared size is smaller than its own header, or larger than what remains
//! of the descriptor, ends the walk. Payloads are decoded into value types
//! ([`Tag`]) rather than overlaid on raw memory.
//!
//! Edits ([`BootDescriptorMut`]) never change the descriptor size: tags are
//! soft-deleted by rewriting their type to [`tag_types::INVALID`].

#![cfg_attr(not(any(test, doctest)), no_std)]

#[cfg(any(test, feature = "builder"))]
extern crate alloc;

#[cfg(any(test, feature = "builder"))]
pub mod builder;
mod descriptor;
mod error;
mod tags;

pub use descriptor::{BootDescriptor, BootDescriptorMut, RawTag, Tags, peek_total_size};
pub use error::DescriptorError;
pub use tags::{
    CmdlineTag, FramebufferTag, MemoryKind, MemoryMap, MemoryMapEntries, MemoryMapEntry,
    ModuleTag, RsdpTag, Tag,
};

/// Value a Multiboot2 loader places in `EAX` when entering the next stage.
pub const BOOTLOADER_MAGIC: u32 = 0x36D7_6289;

/// Size of the descriptor header (`total_size` + `reserved`).
pub const HEADER_SIZE: usize = 8;

/// Size of a tag header (`type` + `size`).
pub const TAG_HEADER_SIZE: usize = 8;

/// Tags start on 8-byte boundaries.
pub const TAG_ALIGNMENT: usize = 8;

/// Tag type identifiers.
pub mod tag_types {
    /// Terminates the tag list.
    pub const END: u32 = 0;
    /// Boot command line.
    pub const CMDLINE: u32 = 1;
    /// Boot loader name.
    pub const BOOTLOADER_NAME: u32 = 2;
    /// Boot module.
    pub const MODULE: u32 = 3;
    /// Basic memory information.
    pub const BASIC_MEMINFO: u32 = 4;
    /// Memory map.
    pub const MEMORY_MAP: u32 = 6;
    /// Framebuffer information.
    pub const FRAMEBUFFER: u32 = 8;
    /// ACPI 1.0 RSDP copy.
    pub const ACPI_OLD: u32 = 14;
    /// ACPI 2.0+ RSDP copy.
    pub const ACPI_NEW: u32 = 15;
    /// Soft-deleted tag; consumers skip it.
    pub const INVALID: u32 = 0xBAD;
}

#[inline]
pub(crate) const fn align_up(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) & !(alignment - 1)
}

#[inline]
pub(crate) fn read_u32_le(buf: &[u8], off: usize) -> Option<u32> {
    let s = buf.get(off..off.checked_add(4)?)?;
    Some(u32::from_le_bytes([s[0], s[1], s[2], s[3]]))
}

#[inline]
pub(crate) fn read_u64_le(buf: &[u8], off: usize) -> Option<u64> {
    let s = buf.get(off..off.checked_add(8)?)?;
    Some(u64::from_le_bytes([
        s[0], s[1], s[2], s[3], s[4], s[5], s[6], s[7],
    ]))
}

#[inline]
pub(crate) fn write_u32_le(buf: &mut [u8], off: usize, value: u32) -> Option<()> {
    let s = buf.get_mut(off..off.checked_add(4)?)?;
    s.copy_from_slice(&value.to_le_bytes());
    Some(())
}

/// Bytes up to (not including) the first NUL, as UTF-8 if possible.
pub(crate) fn c_str(bytes: &[u8]) -> &str {
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    core::str::from_utf8(&bytes[..len]).unwrap_or("")
}
