//! # Trampoline Entry Point
//!
//! Only the bare-metal build has an entry point; the hosted build exists so
//! the workspace can be built and tested on the development machine.
//!
//! The bare-metal build targets 32-bit x86 without an operating system
//! (`target_arch = "x86"`, `target_os = "none"`): the boot loader enters
//! `_start` in protected mode, and its assembly only uses 32-bit registers.
//! Rust ships no such triple, so the image is built against a custom
//! `i686-unknown-none` target specification with `-Zbuild-std=core`:
//!
//! ```text
//! cargo +nightly build -p trampoline --release \
//!     --target i686-unknown-none.json -Zbuild-std=core
//! ```
//!
//! `x86_64-unknown-none` is not a substitute; the entry code would not
//! assemble for it.

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]
#![allow(unsafe_code)]

#[cfg(all(target_os = "none", not(target_arch = "x86")))]
compile_error!("the bare-metal trampoline only supports 32-bit x86 (see the crate docs)");

#[cfg(target_os = "none")]
mod platform;

#[cfg(not(target_os = "none"))]
fn main() {}
