//! # ELF Program Headers
//!
//! Decodes just enough of an ELF image to know where its segments want to
//! live in physical memory. Both ELF32 and ELF64 little-endian images are
//! accepted; fields are read with explicit little-endian decoding from the
//! byte slice, so the image needs no particular alignment.
//!
//! Only `PT_LOAD` segments with a non-zero memory size take part in placement
//! decisions (see [`LoadSegment::is_loadable`]).

#![cfg_attr(not(any(test, doctest)), no_std)]

#[cfg(any(test, feature = "builder"))]
extern crate alloc;

#[cfg(any(test, feature = "builder"))]
pub mod builder;
mod error;
mod parser;

pub use error::ElfError;
pub use parser::{ElfClass, ElfHeader, LoadSegment, MAX_PROGRAM_HEADERS, PFlags, PT_LOAD};
