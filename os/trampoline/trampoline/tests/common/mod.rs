//! One flat block of simulated RAM.

#![allow(dead_code)]

use trampoline_addresses::{PhysicalAddress, PhysicalRange};
use trampoline_chainload::{MemoryError, PhysicalMemory};

pub struct FlatMemory {
    base: u64,
    data: Vec<u8>,
}

impl FlatMemory {
    /// Zeroed RAM backing `[base, base + len)`.
    pub fn new(base: u64, len: usize) -> Self {
        Self {
            base,
            data: vec![0; len],
        }
    }

    pub fn write(&mut self, addr: u64, bytes: &[u8]) {
        let span = self.span(PhysicalRange::new(PhysicalAddress::new(addr), bytes.len() as u64));
        self.data[span.expect("write inside the simulated block")].copy_from_slice(bytes);
    }

    pub fn read(&self, addr: u64, len: usize) -> &[u8] {
        let span = self.span(PhysicalRange::new(PhysicalAddress::new(addr), len as u64));
        &self.data[span.expect("read inside the simulated block")]
    }

    fn span(&self, range: PhysicalRange) -> Result<std::ops::Range<usize>, MemoryError> {
        let block = PhysicalRange::new(PhysicalAddress::new(self.base), self.data.len() as u64);
        if !block.contains_range(range) {
            return Err(MemoryError::Inaccessible(range));
        }
        let start = (range.start().as_u64() - self.base) as usize;
        Ok(start..start + range.len() as usize)
    }
}

impl PhysicalMemory for FlatMemory {
    fn bytes(&self, range: PhysicalRange) -> Result<&[u8], MemoryError> {
        let span = self.span(range)?;
        Ok(&self.data[span])
    }

    fn bytes_mut(&mut self, range: PhysicalRange) -> Result<&mut [u8], MemoryError> {
        let span = self.span(range)?;
        Ok(&mut self.data[span])
    }

    fn copy(&mut self, src: PhysicalRange, dst: PhysicalAddress) -> Result<(), MemoryError> {
        let from = self.span(src)?;
        let to = self.span(PhysicalRange::new(dst, src.len()))?;
        self.data.copy_within(from, to.start);
        Ok(())
    }
}
