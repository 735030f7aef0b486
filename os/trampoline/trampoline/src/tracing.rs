//! # Boot Descriptor Tracing

use log::{debug, info, warn};
use trampoline_addresses::PhysicalAddress;
use trampoline_mbi2::{BootDescriptor, Tag};

/// Log every tag of the descriptor the trampoline was started with.
pub fn trace_descriptor(at: PhysicalAddress, descriptor: &BootDescriptor<'_>) {
    info!(
        "boot descriptor at {at}, {} bytes, {} module(s)",
        descriptor.len(),
        descriptor.modules().count()
    );

    for tag in descriptor.tags() {
        let offset = tag.offset();
        match tag.decode() {
            Ok(Tag::Cmdline(cmdline)) => debug!("  {offset:#06x} cmdline {:?}", cmdline.as_str()),
            Ok(Tag::Module(module)) => {
                debug!("  {offset:#06x} module {} {:?}", module.range(), module.label);
            }
            Ok(Tag::MemoryMap(map)) => {
                debug!(
                    "  {offset:#06x} memory map, entry size {}, version {}",
                    map.entry_size(),
                    map.entry_version()
                );
                for entry in map.entries() {
                    debug!("    {} {:?}", entry.range(), entry.kind);
                }
            }
            Ok(Tag::Framebuffer(fb)) => debug!(
                "  {offset:#06x} framebuffer {} {}x{}x{}",
                fb.extent(),
                fb.width,
                fb.height,
                fb.bpp
            ),
            Ok(Tag::AcpiOldRsdp(rsdp) | Tag::AcpiNewRsdp(rsdp)) => {
                debug!("  {offset:#06x} acpi rsdp {rsdp:?}");
            }
            Ok(Tag::Invalid) => debug!("  {offset:#06x} invalidated, {} bytes", tag.size()),
            Ok(Tag::Other { tag_type }) => debug!("  {offset:#06x} type {tag_type}, {} bytes", tag.size()),
            Err(e) => warn!("  {offset:#06x} {e}"),
        }
    }
}
