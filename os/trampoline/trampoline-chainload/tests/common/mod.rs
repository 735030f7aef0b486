//! Simulated physical memory and a recording ELF loader.

#![allow(dead_code)]

use trampoline_addresses::{PhysicalAddress, PhysicalRange};
use trampoline_chainload::{ElfLoader, HandOff, MemoryError, PhysicalMemory};

/// A contiguous chunk of simulated RAM at a fixed physical address.
#[derive(Debug, Clone)]
struct Bank {
    base: u64,
    data: Vec<u8>,
}

impl Bank {
    fn range(&self) -> PhysicalRange {
        PhysicalRange::new(PhysicalAddress::new(self.base), self.data.len() as u64)
    }

    fn offset_of(&self, range: PhysicalRange) -> Option<std::ops::Range<usize>> {
        if !self.range().contains_range(range) {
            return None;
        }
        let start = usize::try_from(range.start().as_u64() - self.base).ok()?;
        let len = usize::try_from(range.len()).ok()?;
        Some(start..start + len)
    }
}

/// Sparse physical memory: only the banks that were added are backed.
///
/// Every access must fall entirely inside one bank.
#[derive(Debug, Clone, Default)]
pub struct SimulatedMemory {
    banks: Vec<Bank>,
}

impl SimulatedMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back `[base, base + len)` with zeroed bytes.
    pub fn with_bank(mut self, base: u64, len: usize) -> Self {
        let new = PhysicalRange::new(PhysicalAddress::new(base), len as u64);
        assert!(
            self.banks.iter().all(|b| !b.range().intersects(new)),
            "bank {new} overlaps an existing bank"
        );
        self.banks.push(Bank {
            base,
            data: vec![0; len],
        });
        self
    }

    pub fn write(&mut self, addr: u64, bytes: &[u8]) {
        let range = PhysicalRange::new(PhysicalAddress::new(addr), bytes.len() as u64);
        self.bytes_mut(range)
            .unwrap_or_else(|_| panic!("write to unbacked memory {range}"))
            .copy_from_slice(bytes);
    }

    pub fn read(&self, addr: u64, len: usize) -> Vec<u8> {
        let range = PhysicalRange::new(PhysicalAddress::new(addr), len as u64);
        self.bytes(range)
            .unwrap_or_else(|_| panic!("read from unbacked memory {range}"))
            .to_vec()
    }

    fn locate(&self, range: PhysicalRange) -> Option<(usize, std::ops::Range<usize>)> {
        self.banks
            .iter()
            .enumerate()
            .find_map(|(i, b)| b.offset_of(range).map(|r| (i, r)))
    }
}

impl PhysicalMemory for SimulatedMemory {
    fn bytes(&self, range: PhysicalRange) -> Result<&[u8], MemoryError> {
        let (bank, span) = self.locate(range).ok_or(MemoryError::Inaccessible(range))?;
        Ok(&self.banks[bank].data[span])
    }

    fn bytes_mut(&mut self, range: PhysicalRange) -> Result<&mut [u8], MemoryError> {
        let (bank, span) = self.locate(range).ok_or(MemoryError::Inaccessible(range))?;
        Ok(&mut self.banks[bank].data[span])
    }

    fn copy(&mut self, src: PhysicalRange, dst: PhysicalAddress) -> Result<(), MemoryError> {
        let staged = self.bytes(src)?.to_vec();
        let dst = PhysicalRange::new(dst, src.len());
        self.bytes_mut(dst)?.copy_from_slice(&staged);
        Ok(())
    }
}

/// Remembers every hand-off instead of jumping anywhere.
#[derive(Debug, Default)]
pub struct RecordingLoader {
    pub calls: Vec<HandOff>,
}

impl ElfLoader for RecordingLoader {
    fn load(&mut self, handoff: &HandOff) {
        self.calls.push(*handoff);
    }
}
