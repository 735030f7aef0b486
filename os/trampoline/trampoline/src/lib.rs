//! # Multiboot2 Chain-Load Trampoline
//!
//! A boot plugin that sits between a Multiboot2 loader and the real kernel.
//! The first boot module is taken to be the kernel's ELF image; the remaining
//! modules and the boot descriptor are moved out of the way of the kernel's
//! load segments before the kernel is started with the edited descriptor.
//!
//! ```text
//! loader ──magic, descriptor──▶ trampoline ──HandOff──▶ ElfLoader ──▶ kernel
//! ```
//!
//! [`run`] is the whole program minus the hardware: it takes the boot magic,
//! the descriptor address, physical memory and an [`ElfLoader`], and only
//! returns when something went wrong. The bare-metal binary (32-bit x86,
//! `target_os = "none"`) supplies identity-mapped memory and the platform's
//! ELF loader.

#![cfg_attr(not(any(test, doctest)), no_std)]

mod config;
mod error;
mod protocol;
mod tracing;

pub use config::TrampolineConfig;
pub use error::TrampolineError;
pub use protocol::{BootProtocol, MULTIBOOT1_MAGIC};
pub use tracing::trace_descriptor;

use log::{error, info};
use trampoline_addresses::{PhysicalAddress, PhysicalRange};
use trampoline_chainload::{ChainLoadError, ChainLoader, ElfLoader, PhysicalMemory};
use trampoline_mbi2::{BootDescriptor, DescriptorError, HEADER_SIZE, peek_total_size};

/// Chain-load the kernel and report why that did not work.
///
/// Returns the exit code for the boot stub; success never returns because
/// `loader` starts the kernel.
pub fn run<M, L>(
    magic: u32,
    descriptor: PhysicalAddress,
    memory: &mut M,
    loader: &mut L,
    image: PhysicalRange,
) -> i32
where
    M: PhysicalMemory + ?Sized,
    L: ElfLoader + ?Sized,
{
    let err = chain_load(magic, descriptor, memory, loader, image);
    error!("{err}");
    err.exit_code()
}

/// [`run`] without the final diagnostic.
pub fn chain_load<M, L>(
    magic: u32,
    descriptor: PhysicalAddress,
    memory: &mut M,
    loader: &mut L,
    image: PhysicalRange,
) -> TrampolineError
where
    M: PhysicalMemory + ?Sized,
    L: ElfLoader + ?Sized,
{
    if let Err(e) = BootProtocol::from_magic(magic) {
        return e;
    }

    // The command line tag is invalidated once chain-loading starts. The
    // level has to be set before the tag dump, which logs at debug.
    let config = match read_descriptor(&*memory, descriptor) {
        Ok(incoming) => {
            let config = incoming
                .cmdline()
                .map(TrampolineConfig::from_cmdline)
                .unwrap_or_default();
            log::set_max_level(config.log_level);
            trace_descriptor(descriptor, &incoming);
            config
        }
        Err(e) => return e.into(),
    };
    info!(
        "relocating below {:#x}, trampoline image at {image}",
        config.phys_max
    );

    ChainLoader::new(memory, image, config.chain_load())
        .boot(descriptor, loader)
        .into()
}

/// Parse the descriptor the trampoline was started with.
fn read_descriptor<M: PhysicalMemory + ?Sized>(
    memory: &M,
    at: PhysicalAddress,
) -> Result<BootDescriptor<'_>, ChainLoadError> {
    let header = memory.bytes(PhysicalRange::new(at, HEADER_SIZE as u64))?;
    let total = peek_total_size(header).ok_or(DescriptorError::TooShort)?;
    Ok(BootDescriptor::parse(memory.bytes(PhysicalRange::new(at, u64::from(total)))?)?)
}
