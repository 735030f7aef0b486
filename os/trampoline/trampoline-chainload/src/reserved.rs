//! # Reserved Ranges
//!
//! Memory that must survive until the kernel is entered. The set is never
//! stored: it is recomputed from the descriptor at its *current* address
//! every time a decision depends on it, so relocations are picked up
//! automatically.

use trampoline_addresses::{PhysicalAddress, PhysicalRange};
use trampoline_mbi2::BootDescriptor;

/// A boot descriptor together with the physical address it was read from.
#[derive(Debug, Copy, Clone)]
pub struct LocatedDescriptor<'a> {
    pub address: PhysicalAddress,
    pub descriptor: BootDescriptor<'a>,
}

impl<'a> LocatedDescriptor<'a> {
    #[must_use]
    pub const fn new(address: PhysicalAddress, descriptor: BootDescriptor<'a>) -> Self {
        Self {
            address,
            descriptor,
        }
    }

    /// `[address, address + total_size)`.
    #[must_use]
    pub const fn extent(&self) -> PhysicalRange {
        PhysicalRange::new(self.address, self.descriptor.len() as u64)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReservedKind {
    /// The trampoline's own image.
    Image,
    Descriptor,
    Framebuffer,
    Module,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Reserved {
    pub kind: ReservedKind,
    pub range: PhysicalRange,
}

/// Own image, descriptor extent, framebuffers, then every live module, in that order.
pub fn reserved_ranges<'a>(
    located: &LocatedDescriptor<'a>,
    image: PhysicalRange,
) -> impl Iterator<Item = Reserved> + use<'a> {
    let fixed = [
        Reserved {
            kind: ReservedKind::Image,
            range: image,
        },
        Reserved {
            kind: ReservedKind::Descriptor,
            range: located.extent(),
        },
    ];

    let descriptor = located.descriptor;
    let framebuffers = descriptor.framebuffers().map(|fb| Reserved {
        kind: ReservedKind::Framebuffer,
        range: fb.extent(),
    });
    let modules = descriptor.modules().map(|(_, m)| Reserved {
        kind: ReservedKind::Module,
        range: m.range(),
    });

    fixed.into_iter().chain(framebuffers).chain(modules)
}
