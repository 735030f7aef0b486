use crate::MemoryError;
use core::fmt;
use trampoline_addresses::PhysicalRange;
use trampoline_elf::ElfError;
use trampoline_mbi2::DescriptorError;

/// What a region search was looking for.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RegionPurpose {
    Descriptor,
    Module,
    JumpCode,
}

impl fmt::Display for RegionPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Descriptor => "boot descriptor",
            Self::Module => "boot module",
            Self::JumpCode => "jump code",
        })
    }
}

/// Verdict of the placement check for a single kernel segment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    /// Recoverable by moving the descriptor.
    #[error("segment {segment} overlaps the boot descriptor at {descriptor}")]
    DescriptorOverlap {
        segment: PhysicalRange,
        descriptor: PhysicalRange,
    },
    #[error("segment {segment} does not lie in available RAM")]
    OutOfRam { segment: PhysicalRange },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainLoadError {
    #[error("more than {capacity} boot modules")]
    CapacityExceeded { capacity: usize },
    #[error("no boot module to load")]
    NoModule,
    #[error("kernel segment {segment} is outside usable RAM")]
    OutOfRam { segment: PhysicalRange },
    #[error("no free memory for the {purpose} ({size:#x} bytes)")]
    NoRegionFound { purpose: RegionPurpose, size: u64 },
    #[error("gave up after {limit} {purpose} relocations")]
    RelocationLimit { purpose: RegionPurpose, limit: u32 },
    #[error("the ELF loader returned instead of starting the kernel")]
    LoaderReturned,
    #[error("malformed boot descriptor: {0}")]
    Descriptor(#[from] DescriptorError),
    #[error("malformed kernel image: {0}")]
    Elf(#[from] ElfError),
    #[error("physical memory access failed: {0}")]
    Memory(#[from] MemoryError),
}
