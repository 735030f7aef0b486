use crate::{DescriptorError, c_str, read_u32_le, read_u64_le, tag_types};
use core::fmt;
use trampoline_addresses::{PhysicalAddress, PhysicalRange};

/// A decoded tag payload.
#[derive(Debug, Copy, Clone)]
pub enum Tag<'a> {
    Cmdline(CmdlineTag<'a>),
    Module(ModuleTag<'a>),
    MemoryMap(MemoryMap<'a>),
    Framebuffer(FramebufferTag),
    AcpiOldRsdp(RsdpTag<'a>),
    AcpiNewRsdp(RsdpTag<'a>),
    /// Soft-deleted tag.
    Invalid,
    /// A tag type the trampoline does not interpret.
    Other { tag_type: u32 },
}

impl<'a> Tag<'a> {
    pub(crate) fn parse(tag_type: u32, offset: usize, payload: &'a [u8]) -> Result<Self, DescriptorError> {
        let truncated = DescriptorError::TruncatedTag { tag_type, offset };
        Ok(match tag_type {
            tag_types::CMDLINE => Self::Cmdline(CmdlineTag { raw: payload }),
            tag_types::MODULE => {
                let start = read_u32_le(payload, 0).ok_or(truncated)?;
                let end = read_u32_le(payload, 4).ok_or(truncated)?;
                Self::Module(ModuleTag {
                    start,
                    end,
                    label: c_str(&payload[8..]),
                })
            }
            tag_types::MEMORY_MAP => {
                let entry_size = read_u32_le(payload, 0).ok_or(truncated)?;
                let entry_version = read_u32_le(payload, 4).ok_or(truncated)?;
                if (entry_size as usize) < MemoryMapEntry::WIRE_SIZE {
                    return Err(DescriptorError::BadEntrySize(entry_size));
                }
                Self::MemoryMap(MemoryMap {
                    entry_size,
                    entry_version,
                    entries: &payload[8..],
                })
            }
            tag_types::FRAMEBUFFER => Self::Framebuffer(FramebufferTag::parse(payload).ok_or(truncated)?),
            tag_types::ACPI_OLD => Self::AcpiOldRsdp(RsdpTag { bytes: payload }),
            tag_types::ACPI_NEW => Self::AcpiNewRsdp(RsdpTag { bytes: payload }),
            tag_types::INVALID => Self::Invalid,
            other => Self::Other { tag_type: other },
        })
    }
}

/// Boot command line (NUL-terminated in the wire format).
#[derive(Copy, Clone)]
pub struct CmdlineTag<'a> {
    raw: &'a [u8],
}

impl<'a> CmdlineTag<'a> {
    /// The command line up to its terminating NUL; empty if not valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> &'a str {
        c_str(self.raw)
    }
}

impl fmt::Debug for CmdlineTag<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CmdlineTag").field(&self.as_str()).finish()
    }
}

/// A boot module: payload bytes at `[start, end]` (inclusive) plus a label.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ModuleTag<'a> {
    pub start: u32,
    /// Inclusive.
    pub end: u32,
    pub label: &'a str,
}

impl ModuleTag<'_> {
    /// The module payload as a half-open range.
    #[must_use]
    pub fn range(&self) -> PhysicalRange {
        PhysicalRange::from_inclusive(PhysicalAddress::from(self.start), PhysicalAddress::from(self.end))
    }
}

/// Memory map tag; entries are `entry_size` bytes apart.
#[derive(Debug, Copy, Clone)]
pub struct MemoryMap<'a> {
    entry_size: u32,
    entry_version: u32,
    entries: &'a [u8],
}

impl<'a> MemoryMap<'a> {
    #[must_use]
    pub const fn entry_size(&self) -> u32 {
        self.entry_size
    }

    #[must_use]
    pub const fn entry_version(&self) -> u32 {
        self.entry_version
    }

    #[must_use]
    pub const fn entries(&self) -> MemoryMapEntries<'a> {
        MemoryMapEntries {
            entries: self.entries,
            stride: self.entry_size as usize,
            offset: 0,
        }
    }
}

/// Iterator over [`MemoryMapEntry`] values; a trailing partial entry is dropped.
#[derive(Clone)]
pub struct MemoryMapEntries<'a> {
    entries: &'a [u8],
    stride: usize,
    offset: usize,
}

impl Iterator for MemoryMapEntries<'_> {
    type Item = MemoryMapEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let end = self.offset.checked_add(MemoryMapEntry::WIRE_SIZE)?;
        if end > self.entries.len() {
            return None;
        }
        let base = read_u64_le(self.entries, self.offset)?;
        let length = read_u64_le(self.entries, self.offset + 8)?;
        let kind = read_u32_le(self.entries, self.offset + 16)?;
        self.offset = self.offset.checked_add(self.stride)?;
        Some(MemoryMapEntry::new(base, length, MemoryKind::from_raw(kind)))
    }
}

/// One physical memory region reported by the firmware.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MemoryMapEntry {
    pub base: u64,
    pub length: u64,
    pub kind: MemoryKind,
}

impl MemoryMapEntry {
    /// `base: u64, length: u64, type: u32, reserved: u32`.
    pub const WIRE_SIZE: usize = 24;

    #[must_use]
    pub const fn new(base: u64, length: u64, kind: MemoryKind) -> Self {
        Self { base, length, kind }
    }

    #[must_use]
    pub const fn range(&self) -> PhysicalRange {
        PhysicalRange::new(PhysicalAddress::new(self.base), self.length)
    }

    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self.kind, MemoryKind::Available)
    }
}

/// Memory map entry type.
///
/// Only [`MemoryKind::Available`] may be used for relocation targets or
/// kernel segments.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MemoryKind {
    Available,
    Reserved,
    AcpiReclaimable,
    AcpiNvs,
    Defective,
    Unknown(u32),
}

impl MemoryKind {
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            1 => Self::Available,
            2 => Self::Reserved,
            3 => Self::AcpiReclaimable,
            4 => Self::AcpiNvs,
            5 => Self::Defective,
            other => Self::Unknown(other),
        }
    }

    #[must_use]
    pub const fn as_raw(self) -> u32 {
        match self {
            Self::Available => 1,
            Self::Reserved => 2,
            Self::AcpiReclaimable => 3,
            Self::AcpiNvs => 4,
            Self::Defective => 5,
            Self::Unknown(raw) => raw,
        }
    }
}

/// Linear framebuffer description.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FramebufferTag {
    pub addr: u64,
    pub pitch: u32,
    pub width: u32,
    pub height: u32,
    pub bpp: u8,
    pub fb_type: u8,
}

impl FramebufferTag {
    /// `addr, pitch, width, height, bpp, type` as laid out on the wire.
    pub const MIN_PAYLOAD: usize = 22;

    fn parse(payload: &[u8]) -> Option<Self> {
        if payload.len() < Self::MIN_PAYLOAD {
            return None;
        }
        Some(Self {
            addr: read_u64_le(payload, 0)?,
            pitch: read_u32_le(payload, 8)?,
            width: read_u32_le(payload, 12)?,
            height: read_u32_le(payload, 16)?,
            bpp: payload[20],
            fb_type: payload[21],
        })
    }

    /// Bytes the framebuffer occupies: `pitch * height` from `addr`.
    #[must_use]
    pub fn extent(&self) -> PhysicalRange {
        PhysicalRange::new(
            PhysicalAddress::new(self.addr),
            u64::from(self.pitch) * u64::from(self.height),
        )
    }
}

/// Copy of a firmware ACPI root pointer.
#[derive(Copy, Clone)]
pub struct RsdpTag<'a> {
    bytes: &'a [u8],
}

impl<'a> RsdpTag<'a> {
    #[must_use]
    pub const fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// The 8-byte `"RSD PTR "` signature check.
    #[must_use]
    pub fn has_signature(&self) -> bool {
        self.bytes.starts_with(b"RSD PTR ")
    }
}

impl fmt::Debug for RsdpTag<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsdpTag")
            .field("len", &self.bytes.len())
            .field("signature", &self.has_signature())
            .finish()
    }
}
