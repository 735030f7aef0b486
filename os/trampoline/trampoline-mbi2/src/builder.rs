//! Host-side construction of Multiboot2 descriptors for tests.

use crate::tags::{FramebufferTag, MemoryMapEntry};
use crate::{HEADER_SIZE, TAG_ALIGNMENT, TAG_HEADER_SIZE, align_up, tag_types};
use alloc::vec::Vec;

struct PendingTag {
    tag_type: u32,
    /// Overrides the computed size; used to build malformed descriptors.
    declared_size: Option<u32>,
    payload: Vec<u8>,
}

/// Assembles a descriptor tag by tag; [`DescriptorBuilder::build`] appends the
/// end tag and patches `total_size`.
#[derive(Default)]
pub struct DescriptorBuilder {
    tags: Vec<PendingTag>,
    omit_end_tag: bool,
}

impl DescriptorBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn cmdline(self, text: &str) -> Self {
        let mut payload = text.as_bytes().to_vec();
        payload.push(0);
        self.raw_tag(tag_types::CMDLINE, &payload)
    }

    /// Module spanning `[start, end]` (inclusive).
    #[must_use]
    pub fn module(self, start: u32, end: u32, label: &str) -> Self {
        let mut payload = Vec::with_capacity(8 + label.len() + 1);
        payload.extend_from_slice(&start.to_le_bytes());
        payload.extend_from_slice(&end.to_le_bytes());
        payload.extend_from_slice(label.as_bytes());
        payload.push(0);
        self.raw_tag(tag_types::MODULE, &payload)
    }

    #[must_use]
    pub fn memory_map(self, entries: &[MemoryMapEntry]) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let entry_size = MemoryMapEntry::WIRE_SIZE as u32;
        self.memory_map_with_entry_size(entry_size, entries)
    }

    /// Memory map with a custom stride; bytes past the first 24 of each entry are zero.
    #[must_use]
    pub fn memory_map_with_entry_size(self, entry_size: u32, entries: &[MemoryMapEntry]) -> Self {
        let stride = entry_size as usize;
        let mut payload = Vec::with_capacity(8 + entries.len() * stride);
        payload.extend_from_slice(&entry_size.to_le_bytes());
        payload.extend_from_slice(&0u32.to_le_bytes());
        for e in entries {
            let at = payload.len();
            payload.extend_from_slice(&e.base.to_le_bytes());
            payload.extend_from_slice(&e.length.to_le_bytes());
            payload.extend_from_slice(&e.kind.as_raw().to_le_bytes());
            payload.resize(at + stride.max(MemoryMapEntry::WIRE_SIZE), 0);
        }
        self.raw_tag(tag_types::MEMORY_MAP, &payload)
    }

    #[must_use]
    pub fn framebuffer(self, fb: FramebufferTag) -> Self {
        let mut payload = Vec::with_capacity(24);
        payload.extend_from_slice(&fb.addr.to_le_bytes());
        payload.extend_from_slice(&fb.pitch.to_le_bytes());
        payload.extend_from_slice(&fb.width.to_le_bytes());
        payload.extend_from_slice(&fb.height.to_le_bytes());
        payload.push(fb.bpp);
        payload.push(fb.fb_type);
        payload.extend_from_slice(&[0, 0]);
        self.raw_tag(tag_types::FRAMEBUFFER, &payload)
    }

    #[must_use]
    pub fn acpi_old(self, rsdp: &[u8]) -> Self {
        self.raw_tag(tag_types::ACPI_OLD, rsdp)
    }

    #[must_use]
    pub fn acpi_new(self, rsdp: &[u8]) -> Self {
        self.raw_tag(tag_types::ACPI_NEW, rsdp)
    }

    #[must_use]
    pub fn raw_tag(mut self, tag_type: u32, payload: &[u8]) -> Self {
        self.tags.push(PendingTag {
            tag_type,
            declared_size: None,
            payload: payload.to_vec(),
        });
        self
    }

    /// Tag whose header claims `declared_size` regardless of the payload length.
    #[must_use]
    pub fn raw_tag_with_size(mut self, tag_type: u32, declared_size: u32, payload: &[u8]) -> Self {
        self.tags.push(PendingTag {
            tag_type,
            declared_size: Some(declared_size),
            payload: payload.to_vec(),
        });
        self
    }

    /// Leave out the terminating end tag.
    #[must_use]
    pub const fn without_end_tag(mut self) -> Self {
        self.omit_end_tag = true;
        self
    }

    /// # Panics
    /// Panics if the descriptor would exceed `u32::MAX` bytes.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        let mut out = Vec::new();
        out.resize(HEADER_SIZE, 0);

        for tag in &self.tags {
            let size = tag.declared_size.unwrap_or_else(|| {
                u32::try_from(TAG_HEADER_SIZE + tag.payload.len()).expect("tag too large")
            });
            out.extend_from_slice(&tag.tag_type.to_le_bytes());
            out.extend_from_slice(&size.to_le_bytes());
            out.extend_from_slice(&tag.payload);
            out.resize(align_up(out.len(), TAG_ALIGNMENT), 0);
        }

        if !self.omit_end_tag {
            out.extend_from_slice(&tag_types::END.to_le_bytes());
            #[allow(clippy::cast_possible_truncation)]
            out.extend_from_slice(&(TAG_HEADER_SIZE as u32).to_le_bytes());
        }

        let total = u32::try_from(out.len()).expect("descriptor too large");
        out[0..4].copy_from_slice(&total.to_le_bytes());
        out
    }
}
