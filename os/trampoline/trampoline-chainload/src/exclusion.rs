//! # Region Exclusion

use trampoline_addresses::PhysicalRange;

/// Remove `reserved` from `candidate` without ever splitting it.
///
/// | Case | Result |
/// |------|--------|
/// | no intersection | `candidate` |
/// | `reserved` starts at or before `candidate` | the part after `reserved` |
/// | `reserved` runs past the end of `candidate` | the part before `reserved` |
/// | `reserved` strictly inside | the larger side; the front on a tie |
///
/// The interior case drops the smaller side, so a candidate with a hole in
/// the middle loses up to half its space. The result may be empty.
#[must_use]
pub fn exclude(candidate: PhysicalRange, reserved: PhysicalRange) -> PhysicalRange {
    if !candidate.intersects(reserved) {
        return candidate;
    }

    if reserved.start() <= candidate.start() {
        return PhysicalRange::from_bounds(reserved.end(), candidate.end());
    }

    if reserved.end() >= candidate.end() {
        return PhysicalRange::from_bounds(candidate.start(), reserved.start());
    }

    let front = PhysicalRange::from_bounds(candidate.start(), reserved.start());
    let back = PhysicalRange::from_bounds(reserved.end(), candidate.end());
    if back.len() > front.len() { back } else { front }
}
