use crate::TrampolineError;
use trampoline_mbi2::BOOTLOADER_MAGIC;

/// `EAX` value left by a Multiboot (version 1) loader.
pub const MULTIBOOT1_MAGIC: u32 = 0x2BAD_B002;

/// Which boot protocol handed control to the trampoline.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BootProtocol {
    Multiboot2,
}

impl BootProtocol {
    /// # Errors
    /// [`TrampolineError::LegacyProtocol`] for Multiboot 1, since only
    /// Multiboot2 descriptors can be chain-loaded, and
    /// [`TrampolineError::UnknownBootProtocol`] for anything else.
    pub const fn from_magic(magic: u32) -> Result<Self, TrampolineError> {
        match magic {
            BOOTLOADER_MAGIC => Ok(Self::Multiboot2),
            MULTIBOOT1_MAGIC => Err(TrampolineError::LegacyProtocol),
            _ => Err(TrampolineError::UnknownBootProtocol { magic }),
        }
    }
}
