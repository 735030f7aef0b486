use trampoline_addresses::{PhysicalAddress, PhysicalRange};

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    #[error("physical range {0} is not accessible")]
    Inaccessible(PhysicalRange),
}

/// Byte-level access to physical memory.
///
/// On bare metal this is an identity mapping; tests back it with plain
/// buffers placed at physical addresses.
pub trait PhysicalMemory {
    /// # Errors
    /// Fails if any part of `range` cannot be accessed.
    fn bytes(&self, range: PhysicalRange) -> Result<&[u8], MemoryError>;

    /// # Errors
    /// Fails if any part of `range` cannot be accessed.
    fn bytes_mut(&mut self, range: PhysicalRange) -> Result<&mut [u8], MemoryError>;

    /// Copy `src` to `dst`. Overlapping ranges are allowed.
    ///
    /// # Errors
    /// Fails if either side cannot be accessed.
    fn copy(&mut self, src: PhysicalRange, dst: PhysicalAddress) -> Result<(), MemoryError>;
}
