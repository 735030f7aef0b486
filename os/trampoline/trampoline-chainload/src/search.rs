//! # Memory Region Search

use crate::exclusion::exclude;
use crate::reserved::{LocatedDescriptor, reserved_ranges};
use log::debug;
use trampoline_addresses::{PhysicalAddress, PhysicalRange, Size4K};

/// Which end of the usable memory a search prefers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Fit {
    /// First qualifying region in memory map order, at its lowest address.
    Lowest,
    /// Highest 4 KiB aligned address over all regions.
    Highest,
}

/// Find a 4 KiB aligned address for `needed` bytes in available RAM below
/// `ceiling` that overlaps none of the reserved ranges.
///
/// Each available memory map entry is aligned up to 4 KiB, clamped to the
/// ceiling and then reduced by every reserved range in turn (see
/// [`exclude`]). What survives is aligned up again and must still hold
/// `needed` bytes.
#[must_use]
pub fn find_region(
    located: &LocatedDescriptor<'_>,
    image: PhysicalRange,
    needed: u64,
    fit: Fit,
    ceiling: PhysicalAddress,
) -> Option<PhysicalAddress> {
    let mut best: Option<PhysicalAddress> = None;

    for entry in located.descriptor.memory_entries().filter(|e| e.is_available()) {
        let region = entry.range();
        let Some(start) = region.start().align_up::<Size4K>() else {
            continue;
        };
        if start >= ceiling {
            continue;
        }

        let mut candidate = PhysicalRange::from_bounds(start, region.end()).clamp_below(ceiling);
        for reserved in reserved_ranges(located, image) {
            if candidate.is_empty() {
                break;
            }
            candidate = exclude(candidate, reserved.range);
        }

        let Some(start) = candidate.start().align_up::<Size4K>() else {
            continue;
        };
        let candidate = PhysicalRange::from_bounds(start, candidate.end());
        if candidate.is_empty() || candidate.len() < needed {
            continue;
        }

        match fit {
            Fit::Lowest => {
                debug!("lowest fit for {needed:#x} bytes in {region}: {start}");
                return Some(start);
            }
            Fit::Highest => {
                let anchor = PhysicalAddress::new(candidate.end().as_u64() - needed).align_down::<Size4K>();
                if best.is_none_or(|b| anchor > b) {
                    debug!("highest fit for {needed:#x} bytes in {region}: {anchor}");
                    best = Some(anchor);
                }
            }
        }
    }

    best
}
