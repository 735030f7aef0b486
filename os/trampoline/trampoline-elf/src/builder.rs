//! Minimal ELF images for host-side tests: a file header and a program header
//! table, no section headers and no segment contents.

use crate::{ElfClass, PFlags, PT_LOAD};
use alloc::vec::Vec;

pub struct ElfBuilder {
    class: ElfClass,
    entry: u64,
    segments: Vec<(u32, u64, u64, PFlags)>,
}

impl ElfBuilder {
    #[must_use]
    pub const fn elf32() -> Self {
        Self {
            class: ElfClass::Elf32,
            entry: 0,
            segments: Vec::new(),
        }
    }

    #[must_use]
    pub const fn elf64() -> Self {
        Self {
            class: ElfClass::Elf64,
            entry: 0,
            segments: Vec::new(),
        }
    }

    #[must_use]
    pub const fn entry(mut self, entry: u64) -> Self {
        self.entry = entry;
        self
    }

    /// A `PT_LOAD` segment at physical address `paddr`.
    #[must_use]
    pub fn load(self, paddr: u64, memsz: u64, flags: PFlags) -> Self {
        self.segment(PT_LOAD, paddr, memsz, flags)
    }

    #[must_use]
    pub fn segment(mut self, kind: u32, paddr: u64, memsz: u64, flags: PFlags) -> Self {
        self.segments.push((kind, paddr, memsz, flags));
        self
    }

    /// # Panics
    /// Panics if an ELF32 image is given addresses that do not fit 32 bits.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        let ehsize = self.class.header_size();
        let phentsize = self.class.phdr_size();
        let mut out = alloc::vec![0u8; ehsize + phentsize * self.segments.len()];

        out[0..4].copy_from_slice(&[0x7F, b'E', b'L', b'F']);
        out[4] = match self.class {
            ElfClass::Elf32 => 1,
            ElfClass::Elf64 => 2,
        };
        out[5] = 1; // little-endian
        out[6] = 1; // EV_CURRENT
        out[16..18].copy_from_slice(&2u16.to_le_bytes()); // ET_EXEC

        let phnum = u16::try_from(self.segments.len()).expect("too many segments");
        let phentsize16 = u16::try_from(phentsize).expect("phdr size");
        let ehsize16 = u16::try_from(ehsize).expect("header size");

        match self.class {
            ElfClass::Elf32 => {
                let narrow = |v: u64| u32::try_from(v).expect("ELF32 value out of range");
                out[24..28].copy_from_slice(&narrow(self.entry).to_le_bytes());
                out[28..32].copy_from_slice(&narrow(ehsize as u64).to_le_bytes());
                out[40..42].copy_from_slice(&ehsize16.to_le_bytes());
                out[42..44].copy_from_slice(&phentsize16.to_le_bytes());
                out[44..46].copy_from_slice(&phnum.to_le_bytes());

                for (i, &(kind, paddr, memsz, flags)) in self.segments.iter().enumerate() {
                    let p = ehsize + i * phentsize;
                    out[p..p + 4].copy_from_slice(&kind.to_le_bytes());
                    out[p + 8..p + 12].copy_from_slice(&narrow(paddr).to_le_bytes());
                    out[p + 12..p + 16].copy_from_slice(&narrow(paddr).to_le_bytes());
                    out[p + 20..p + 24].copy_from_slice(&narrow(memsz).to_le_bytes());
                    out[p + 24..p + 28].copy_from_slice(&flags.into_bits().to_le_bytes());
                    out[p + 28..p + 32].copy_from_slice(&0x1000u32.to_le_bytes());
                }
            }
            ElfClass::Elf64 => {
                out[24..32].copy_from_slice(&self.entry.to_le_bytes());
                out[32..40].copy_from_slice(&(ehsize as u64).to_le_bytes());
                out[52..54].copy_from_slice(&ehsize16.to_le_bytes());
                out[54..56].copy_from_slice(&phentsize16.to_le_bytes());
                out[56..58].copy_from_slice(&phnum.to_le_bytes());

                for (i, &(kind, paddr, memsz, flags)) in self.segments.iter().enumerate() {
                    let p = ehsize + i * phentsize;
                    out[p..p + 4].copy_from_slice(&kind.to_le_bytes());
                    out[p + 4..p + 8].copy_from_slice(&flags.into_bits().to_le_bytes());
                    out[p + 16..p + 24].copy_from_slice(&paddr.to_le_bytes());
                    out[p + 24..p + 32].copy_from_slice(&paddr.to_le_bytes());
                    out[p + 40..p + 48].copy_from_slice(&memsz.to_le_bytes());
                    out[p + 48..p + 56].copy_from_slice(&0x1000u64.to_le_bytes());
                }
            }
        }

        out
    }
}
