//! # ELF Placement Validation

use crate::PlacementError;
use crate::reserved::LocatedDescriptor;
use log::debug;
use trampoline_addresses::PhysicalRange;
use trampoline_elf::ElfHeader;

/// Check that every loadable segment can be written without destroying the
/// descriptor, reserved firmware memory or the trampoline itself.
///
/// Segments are checked in order and the first failure is returned. For each
/// segment the descriptor overlap is reported before anything else, since it
/// is the only verdict the caller can fix.
///
/// # Errors
/// - [`PlacementError::DescriptorOverlap`] if a segment overlaps the descriptor.
/// - [`PlacementError::OutOfRam`] if a segment touches a non-available memory
///   map entry or the trampoline image, or is not contained in a single
///   available entry.
pub fn validate(
    elf: &ElfHeader,
    located: &LocatedDescriptor<'_>,
    image: PhysicalRange,
) -> Result<(), PlacementError> {
    let descriptor = located.extent();

    for segment in elf.loadable() {
        let range = segment.range();

        if range.intersects(descriptor) {
            debug!("segment {range} overlaps boot descriptor {descriptor}");
            return Err(PlacementError::DescriptorOverlap {
                segment: range,
                descriptor,
            });
        }

        let entries = || located.descriptor.memory_entries();

        if let Some(entry) = entries().find(|e| !e.is_available() && e.range().intersects(range)) {
            debug!(
                "segment {range} overlaps {:?} memory at {}",
                entry.kind,
                entry.range()
            );
            return Err(PlacementError::OutOfRam { segment: range });
        }

        if range.intersects(image) {
            debug!("segment {range} overlaps the trampoline image {image}");
            return Err(PlacementError::OutOfRam { segment: range });
        }

        if !entries().any(|e| e.is_available() && e.range().contains_range(range)) {
            debug!("segment {range} is not inside available RAM");
            return Err(PlacementError::OutOfRam { segment: range });
        }
    }

    Ok(())
}
