//! # Tag Directory

use crate::tags::{FramebufferTag, MemoryMap, MemoryMapEntry, ModuleTag, Tag};
use crate::{
    DescriptorError, HEADER_SIZE, TAG_ALIGNMENT, TAG_HEADER_SIZE, align_up, read_u32_le, tag_types,
    write_u32_le,
};
use log::warn;

/// Read-only view over a validated boot descriptor.
///
/// The wrapped slice is exactly `total_size` bytes long; every read is checked
/// against it.
#[derive(Copy, Clone)]
pub struct BootDescriptor<'a> {
    bytes: &'a [u8],
}

/// One tag header plus its payload, located at `offset` from the descriptor start.
#[derive(Copy, Clone, Debug)]
pub struct RawTag<'a> {
    offset: usize,
    tag_type: u32,
    size: u32,
    payload: &'a [u8],
}

impl<'a> RawTag<'a> {
    /// Byte offset of the tag header within the descriptor.
    ///
    /// Offsets are only meaningful for the descriptor copy they were read from.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub const fn tag_type(&self) -> u32 {
        self.tag_type
    }

    /// Declared size, including the 8-byte tag header.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    #[must_use]
    pub const fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Decode the payload into a typed [`Tag`].
    ///
    /// # Errors
    /// Returns an error if the payload is too short for the tag type.
    pub fn decode(&self) -> Result<Tag<'a>, DescriptorError> {
        Tag::parse(self.tag_type, self.offset, self.payload)
    }
}

/// Peek the `total_size` field of a descriptor header.
///
/// Used to learn how many bytes to map before calling [`BootDescriptor::parse`].
#[must_use]
pub fn peek_total_size(header: &[u8]) -> Option<u32> {
    read_u32_le(header, 0)
}

fn validate(bytes: &[u8]) -> Result<usize, DescriptorError> {
    let total_size = read_u32_le(bytes, 0).ok_or(DescriptorError::TooShort)?;
    let total = total_size as usize;
    if total < HEADER_SIZE || total > bytes.len() {
        return Err(DescriptorError::BadTotalSize {
            total_size,
            available: bytes.len(),
        });
    }
    Ok(total)
}

impl<'a> BootDescriptor<'a> {
    /// Validate the header and wrap the first `total_size` bytes.
    ///
    /// # Errors
    /// Fails if `bytes` cannot hold the header or the declared total size.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, DescriptorError> {
        let total = validate(bytes)?;
        Ok(Self {
            bytes: &bytes[..total],
        })
    }

    /// Declared size of the descriptor in bytes, header included.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// A descriptor always holds at least its header.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// First tag after the header.
    #[must_use]
    pub fn first(&self) -> Option<RawTag<'a>> {
        self.tag_at(HEADER_SIZE)
    }

    /// Tag following `tag`, skipping the alignment padding.
    #[must_use]
    pub fn next_after(&self, tag: &RawTag<'a>) -> Option<RawTag<'a>> {
        let next = align_up(tag.offset + tag.size as usize, TAG_ALIGNMENT);
        self.tag_at(next)
    }

    /// Forward walk over all tags; a fresh iterator restarts from the beginning.
    #[must_use]
    pub fn tags(&self) -> Tags<'a> {
        Tags {
            descriptor: *self,
            next: self.first(),
        }
    }

    /// Read the tag header at `offset`, bounds-checking the declared size.
    #[must_use]
    pub fn tag_at(&self, offset: usize) -> Option<RawTag<'a>> {
        let header_end = offset.checked_add(TAG_HEADER_SIZE)?;
        if header_end > self.bytes.len() {
            return None;
        }

        let tag_type = read_u32_le(self.bytes, offset)?;
        let size = read_u32_le(self.bytes, offset + 4)?;

        if tag_type == tag_types::END {
            return None;
        }

        if (size as usize) < TAG_HEADER_SIZE {
            warn!("tag type {tag_type} at {offset:#x} declares size {size}; stopping walk");
            return None;
        }

        let end = offset.checked_add(size as usize)?;
        if end > self.bytes.len() {
            warn!(
                "tag type {tag_type} at {offset:#x} overruns descriptor ({end:#x} > {:#x}); stopping walk",
                self.bytes.len()
            );
            return None;
        }

        Some(RawTag {
            offset,
            tag_type,
            size,
            payload: &self.bytes[header_end..end],
        })
    }

    /// Every memory map tag that decodes cleanly, in descriptor order.
    pub fn memory_maps(&self) -> impl Iterator<Item = MemoryMap<'a>> + use<'a> {
        self.tags()
            .filter(|t| t.tag_type() == tag_types::MEMORY_MAP)
            .filter_map(|t| match t.decode() {
                Ok(Tag::MemoryMap(map)) => Some(map),
                _ => None,
            })
    }

    /// The entries of all memory map tags, one tag after the other.
    pub fn memory_entries(&self) -> impl Iterator<Item = MemoryMapEntry> + use<'a> {
        self.memory_maps().flat_map(|map| map.entries())
    }

    /// All framebuffer tags (normally at most one).
    pub fn framebuffers(&self) -> impl Iterator<Item = FramebufferTag> + use<'a> {
        self.tags()
            .filter(|t| t.tag_type() == tag_types::FRAMEBUFFER)
            .filter_map(|t| match t.decode() {
                Ok(Tag::Framebuffer(fb)) => Some(fb),
                _ => None,
            })
    }

    /// All live module tags in descriptor order, with their tag offsets.
    pub fn modules(&self) -> impl Iterator<Item = (usize, ModuleTag<'a>)> + use<'a> {
        self.tags()
            .filter(|t| t.tag_type() == tag_types::MODULE)
            .filter_map(|t| match t.decode() {
                Ok(Tag::Module(m)) => Some((t.offset(), m)),
                _ => None,
            })
    }

    /// The first boot command line, if any.
    #[must_use]
    pub fn cmdline(&self) -> Option<&'a str> {
        self.tags()
            .filter(|t| t.tag_type() == tag_types::CMDLINE)
            .find_map(|t| match t.decode() {
                Ok(Tag::Cmdline(c)) => Some(c.as_str()),
                _ => None,
            })
    }
}

impl core::fmt::Debug for BootDescriptor<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BootDescriptor")
            .field("total_size", &self.bytes.len())
            .field("tags", &self.tags().count())
            .finish()
    }
}

/// Iterator over the tags of a [`BootDescriptor`].
pub struct Tags<'a> {
    descriptor: BootDescriptor<'a>,
    next: Option<RawTag<'a>>,
}

impl<'a> Iterator for Tags<'a> {
    type Item = RawTag<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = self.descriptor.next_after(&current);
        Some(current)
    }
}

/// Mutable view over a validated boot descriptor.
///
/// Edits keep every tag in place; the descriptor never grows or shrinks.
pub struct BootDescriptorMut<'a> {
    bytes: &'a mut [u8],
}

impl<'a> BootDescriptorMut<'a> {
    /// # Errors
    /// Fails if `bytes` cannot hold the header or the declared total size.
    pub fn parse(bytes: &'a mut [u8]) -> Result<Self, DescriptorError> {
        let total = validate(bytes)?;
        Ok(Self {
            bytes: &mut bytes[..total],
        })
    }

    /// Borrow as a read-only descriptor.
    #[must_use]
    pub fn as_descriptor(&self) -> BootDescriptor<'_> {
        BootDescriptor { bytes: self.bytes }
    }

    fn header_at(&self, offset: usize) -> Result<(u32, u32), DescriptorError> {
        let tag = self
            .as_descriptor()
            .tag_at(offset)
            .ok_or(DescriptorError::NoTagAt { offset })?;
        Ok((tag.tag_type(), tag.size()))
    }

    fn module_at(&self, offset: usize) -> Result<u32, DescriptorError> {
        let (tag_type, size) = self.header_at(offset)?;
        if tag_type != tag_types::MODULE {
            return Err(DescriptorError::NotAModule { tag_type, offset });
        }
        if (size as usize) < TAG_HEADER_SIZE + 8 {
            return Err(DescriptorError::TruncatedTag { tag_type, offset });
        }
        Ok(size)
    }

    /// Soft-delete the tag at `offset`.
    ///
    /// # Errors
    /// Fails if no tag header starts at `offset`.
    pub fn invalidate(&mut self, offset: usize) -> Result<(), DescriptorError> {
        self.header_at(offset)?;
        write_u32_le(self.bytes, offset, tag_types::INVALID).ok_or(DescriptorError::NoTagAt { offset })
    }

    /// Rewrite the `mod_start` / `mod_end` fields of the module tag at `offset`.
    ///
    /// # Errors
    /// Fails if the tag at `offset` is not a module tag.
    pub fn set_module_range(&mut self, offset: usize, start: u32, end: u32) -> Result<(), DescriptorError> {
        self.module_at(offset)?;
        let err = DescriptorError::NoTagAt { offset };
        write_u32_le(self.bytes, offset + 8, start).ok_or(err)?;
        write_u32_le(self.bytes, offset + 12, end).ok_or(err)
    }

    /// Turn the module tag at `offset` into the boot command line.
    ///
    /// The module tag becomes an 8-byte invalid tag immediately followed by a
    /// command-line tag that spans the rest of the former module tag, so the
    /// module's label string becomes the command-line payload:
    ///
    /// ```text
    /// before: [MODULE, n] [start] [end] [label\0 ...]
    /// after:  [INVALID, 8] [CMDLINE, n - 8] [label\0 ...]
    /// ```
    ///
    /// # Errors
    /// Fails if the tag at `offset` is not a module tag.
    pub fn repurpose_module_as_cmdline(&mut self, offset: usize) -> Result<(), DescriptorError> {
        let size = self.module_at(offset)?;
        let err = DescriptorError::NoTagAt { offset };
        #[allow(clippy::cast_possible_truncation)]
        let header = TAG_HEADER_SIZE as u32;
        write_u32_le(self.bytes, offset, tag_types::INVALID).ok_or(err)?;
        write_u32_le(self.bytes, offset + 4, header).ok_or(err)?;
        write_u32_le(self.bytes, offset + 8, tag_types::CMDLINE).ok_or(err)?;
        write_u32_le(self.bytes, offset + 12, size - header).ok_or(err)
    }
}
