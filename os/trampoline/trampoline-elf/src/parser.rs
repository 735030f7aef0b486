//! # ELF Header Parsing

use crate::ElfError;
use heapless::Vec;
use log::debug;
use trampoline_addresses::{PhysicalAddress, PhysicalRange};

/// Loadable program segment.
pub const PT_LOAD: u32 = 1;

/// Upper bound on program headers kept per image.
pub const MAX_PROGRAM_HEADERS: usize = 64;

const EI_MAGIC_BYTES: [u8; 4] = [0x7F, b'E', b'L', b'F'];
const EI_CLASS: usize = 4;
const EI_DATA: usize = 5;
const ELFDATA2LSB: u8 = 1;

/// ELF file class.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ElfClass {
    Elf32,
    Elf64,
}

impl ElfClass {
    const fn from_ident(class: u8) -> Result<Self, ElfError> {
        match class {
            1 => Ok(Self::Elf32),
            2 => Ok(Self::Elf64),
            other => Err(ElfError::UnsupportedClass(other)),
        }
    }

    /// Size of the file header.
    #[must_use]
    pub const fn header_size(self) -> usize {
        match self {
            Self::Elf32 => 52,
            Self::Elf64 => 64,
        }
    }

    /// Size of one program header entry.
    #[must_use]
    pub const fn phdr_size(self) -> usize {
        match self {
            Self::Elf32 => 32,
            Self::Elf64 => 56,
        }
    }
}

/// One program header, reduced to what placement needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSegment {
    pub kind: u32,
    pub paddr: PhysicalAddress,
    pub memsz: u64,
    pub flags: PFlags,
}

impl LoadSegment {
    /// `PT_LOAD` with a non-zero memory size.
    #[must_use]
    pub const fn is_loadable(&self) -> bool {
        self.kind == PT_LOAD && self.memsz > 0
    }

    /// Physical span `[paddr, paddr + memsz)`.
    #[must_use]
    pub const fn range(&self) -> PhysicalRange {
        PhysicalRange::new(self.paddr, self.memsz)
    }
}

/// Decoded file header plus all program headers.
#[derive(Debug, Clone)]
pub struct ElfHeader {
    pub class: ElfClass,
    pub entry: u64,
    pub segments: Vec<LoadSegment, MAX_PROGRAM_HEADERS>,
}

impl ElfHeader {
    /// Parse the file header and program header table of a little-endian ELF image.
    ///
    /// # Errors
    /// Fails on a bad magic, class or encoding, a program header size that
    /// does not match the class, or a table that does not fit the image.
    pub fn parse(bytes: &[u8]) -> Result<Self, ElfError> {
        if bytes.len() < 16 {
            return Err(ElfError::TooShort);
        }

        if bytes[0..4] != EI_MAGIC_BYTES {
            return Err(ElfError::BadMagic);
        }

        let class = ElfClass::from_ident(bytes[EI_CLASS])?;
        if bytes[EI_DATA] != ELFDATA2LSB {
            return Err(ElfError::UnsupportedEncoding(bytes[EI_DATA]));
        }

        if bytes.len() < class.header_size() {
            return Err(ElfError::TooShort);
        }

        let (entry, phoff, phentsize, phnum) = match class {
            ElfClass::Elf32 => (
                u64::from(read_u32(bytes, 24)?),
                u64::from(read_u32(bytes, 28)?),
                read_u16(bytes, 42)?,
                read_u16(bytes, 44)?,
            ),
            ElfClass::Elf64 => (
                read_u64(bytes, 24)?,
                read_u64(bytes, 32)?,
                read_u16(bytes, 54)?,
                read_u16(bytes, 56)?,
            ),
        };

        let phentsize = phentsize as usize;
        let phnum = phnum as usize;

        if phnum > MAX_PROGRAM_HEADERS {
            return Err(ElfError::TooManySegments(phnum));
        }

        if phnum > 0 && phentsize != class.phdr_size() {
            return Err(ElfError::BadProgramHeaderSize {
                expected: class.phdr_size(),
                found: phentsize,
            });
        }

        // Program header table bounds
        let phoff = usize::try_from(phoff).map_err(|_| ElfError::OutOfBounds)?;
        let table_size = phentsize.checked_mul(phnum).ok_or(ElfError::OutOfBounds)?;
        let end = phoff.checked_add(table_size).ok_or(ElfError::OutOfBounds)?;
        if end > bytes.len() {
            return Err(ElfError::OutOfBounds);
        }

        let mut segments = Vec::new();
        for i in 0..phnum {
            let off = phoff + i * phentsize;
            let segment = match class {
                ElfClass::Elf32 => LoadSegment {
                    kind: read_u32(bytes, off)?,
                    paddr: PhysicalAddress::from(read_u32(bytes, off + 12)?),
                    memsz: u64::from(read_u32(bytes, off + 20)?),
                    flags: PFlags::from_bits(read_u32(bytes, off + 24)?),
                },
                ElfClass::Elf64 => LoadSegment {
                    kind: read_u32(bytes, off)?,
                    flags: PFlags::from_bits(read_u32(bytes, off + 4)?),
                    paddr: PhysicalAddress::new(read_u64(bytes, off + 24)?),
                    memsz: read_u64(bytes, off + 40)?,
                },
            };

            if segment.is_loadable() {
                debug!(
                    "PT_LOAD {} {}{}{}",
                    segment.range(),
                    if segment.flags.read() { 'R' } else { '-' },
                    if segment.flags.write() { 'W' } else { '-' },
                    if segment.flags.execute() { 'X' } else { '-' },
                );
            }

            segments
                .push(segment)
                .map_err(|_| ElfError::TooManySegments(phnum))?;
        }

        Ok(Self {
            class,
            entry,
            segments,
        })
    }

    /// Segments that occupy memory once loaded.
    pub fn loadable(&self) -> impl Iterator<Item = &LoadSegment> {
        self.segments.iter().filter(|s| s.is_loadable())
    }
}

fn read_u16(buf: &[u8], off: usize) -> Result<u16, ElfError> {
    let s = buf
        .get(off..off.checked_add(2).ok_or(ElfError::OutOfBounds)?)
        .ok_or(ElfError::OutOfBounds)?;
    Ok(u16::from_le_bytes([s[0], s[1]]))
}

fn read_u32(buf: &[u8], off: usize) -> Result<u32, ElfError> {
    let s = buf
        .get(off..off.checked_add(4).ok_or(ElfError::OutOfBounds)?)
        .ok_or(ElfError::OutOfBounds)?;
    Ok(u32::from_le_bytes([s[0], s[1], s[2], s[3]]))
}

fn read_u64(buf: &[u8], off: usize) -> Result<u64, ElfError> {
    let s = buf
        .get(off..off.checked_add(8).ok_or(ElfError::OutOfBounds)?)
        .ok_or(ElfError::OutOfBounds)?;
    Ok(u64::from_le_bytes([
        s[0], s[1], s[2], s[3], s[4], s[5], s[6], s[7],
    ]))
}

/// Bitfield wrapper for `p_flags` (32-bit)
///
/// Layout (LSB→MSB):
/// - bit 0: execute
/// - bit 1: write
/// - bit 2: read
/// - bits 3..31: OS/processor specific
#[bitfield_struct::bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct PFlags {
    #[bits(1)]
    pub execute: bool,
    #[bits(1)]
    pub write: bool,
    #[bits(1)]
    pub read: bool,
    #[bits(29)]
    __: u32,
}
