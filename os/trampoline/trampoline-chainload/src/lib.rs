//! # Multiboot2 Chain Loading
//!
//! Takes the boot descriptor a Multiboot2 loader handed over, makes room for
//! the kernel (the first boot module) and hands control to an ELF loader.
//!
//! ## Components
//!
//! | Module | Role |
//! |--------|------|
//! | [`exclusion`] | Carve one reserved range out of a candidate range. |
//! | [`reserved`] | The set of ranges that must not be overwritten right now. |
//! | [`search`] | Find a 4 KiB aligned spot for `n` bytes below a ceiling. |
//! | [`validate`] | Decide whether the kernel's segments can be loaded as-is. |
//! | [`conflict`] | Find a boot module sitting where the kernel wants to go. |
//! | [`ChainLoader`] | Drives the above until the kernel can be loaded. |
//!
//! ## Flow
//!
//! ```text
//! Collecting ──► ValidatingPlacement ──► RelocatingModules ──► Finalizing ──► HandOff
//!     ▲                  │                   │      ▲
//!     │                  ▼                   └──────┘
//!     └────────── RelocatingDescriptor
//! ```
//!
//! The descriptor is moved when a kernel segment would overwrite it; any
//! other boot module in the way is moved afterwards. Every move goes to the
//! highest suitable spot below a ceiling that starts at
//! `min(phys_max, 4 GiB)` and drops to each new destination, so later moves
//! never land on earlier ones. Both kinds of move are bounded.
//!
//! Physical memory is only reached through [`PhysicalMemory`]; nothing here
//! allocates.

#![cfg_attr(not(any(test, doctest)), no_std)]

pub mod conflict;
mod error;
pub mod exclusion;
mod memory;
mod modules;
mod orchestrator;
pub mod reserved;
pub mod search;
pub mod validate;

pub use error::{ChainLoadError, PlacementError, RegionPurpose};
pub use memory::{MemoryError, PhysicalMemory};
pub use modules::{MAX_MODULES, ModuleHandle, ModuleRecord, ModuleState, ModuleTable};
pub use orchestrator::{
    ChainLoadConfig, ChainLoader, ElfLoader, HandOff, JUMP_CODE_SIZE, MAX_DESCRIPTOR_RELOCATIONS,
    MAX_MODULE_RELOCATIONS,
};
pub use reserved::LocatedDescriptor;
pub use search::Fit;
