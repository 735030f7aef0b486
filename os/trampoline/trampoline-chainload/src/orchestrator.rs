//! # Relocation Orchestrator

use crate::conflict::find_conflict;
use crate::reserved::LocatedDescriptor;
use crate::search::{Fit, find_region};
use crate::validate::validate;
use crate::{
    ChainLoadError, ModuleHandle, ModuleState, ModuleTable, PhysicalMemory, PlacementError,
    RegionPurpose,
};
use log::{debug, info, trace, warn};
use trampoline_addresses::{FOUR_GIB, PhysicalAddress, PhysicalRange};
use trampoline_elf::ElfHeader;
use trampoline_mbi2::{
    BOOTLOADER_MAGIC, BootDescriptor, BootDescriptorMut, DescriptorError, HEADER_SIZE,
    peek_total_size, tag_types,
};

/// Descriptor moves before giving up.
pub const MAX_DESCRIPTOR_RELOCATIONS: u32 = 4;

/// Module moves before giving up.
pub const MAX_MODULE_RELOCATIONS: u32 = 64;

/// Space reserved for the ELF loader's jump trampoline.
pub const JUMP_CODE_SIZE: u64 = 0x1000;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ChainLoadConfig {
    /// Nothing is relocated at or above this address.
    pub phys_max: u64,
}

impl ChainLoadConfig {
    pub const DEFAULT_PHYS_MAX: u64 = 1 << 31;
}

impl Default for ChainLoadConfig {
    fn default() -> Self {
        Self {
            phys_max: Self::DEFAULT_PHYS_MAX,
        }
    }
}

/// Everything the ELF loader needs to start the kernel.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HandOff {
    /// Current address of the (edited) boot descriptor.
    pub descriptor: PhysicalAddress,
    /// Start of the kernel's ELF image.
    pub kernel: PhysicalAddress,
    /// Placed in `EAX` when the kernel is entered.
    pub magic: u32,
    /// A free, 4 KiB aligned page for the loader's jump code.
    pub jump_code: PhysicalAddress,
}

/// Copies the kernel's segments into place and jumps to its entry point.
pub trait ElfLoader {
    /// Does not return on success.
    fn load(&mut self, handoff: &HandOff);
}

impl<F: FnMut(&HandOff)> ElfLoader for F {
    fn load(&mut self, handoff: &HandOff) {
        self(handoff);
    }
}

#[derive(Debug)]
enum Phase {
    Collecting,
    ValidatingPlacement,
    RelocatingDescriptor,
    RelocatingModules,
    Finalizing,
    HandOff(HandOff),
}

/// Moves the descriptor and boot modules out of the kernel's way.
///
/// The ceiling and both relocation counters live as long as the loader, so
/// they carry over when the descriptor moves and collection starts over.
pub struct ChainLoader<'m, M: PhysicalMemory + ?Sized> {
    memory: &'m mut M,
    image: PhysicalRange,
    ceiling: PhysicalAddress,
    descriptor: PhysicalAddress,
    modules: ModuleTable,
    descriptor_relocations: u32,
    module_relocations: u32,
}

impl<'m, M: PhysicalMemory + ?Sized> ChainLoader<'m, M> {
    /// `image` is the trampoline's own load range.
    pub fn new(memory: &'m mut M, image: PhysicalRange, config: ChainLoadConfig) -> Self {
        // Module fields are 32 bits wide.
        let ceiling = PhysicalAddress::new(config.phys_max.min(FOUR_GIB));
        Self {
            memory,
            image,
            ceiling,
            descriptor: PhysicalAddress::zero(),
            modules: ModuleTable::new(),
            descriptor_relocations: 0,
            module_relocations: 0,
        }
    }

    #[must_use]
    pub const fn ceiling(&self) -> PhysicalAddress {
        self.ceiling
    }

    /// Where the descriptor currently lives.
    #[must_use]
    pub const fn descriptor(&self) -> PhysicalAddress {
        self.descriptor
    }

    #[must_use]
    pub const fn modules(&self) -> &ModuleTable {
        &self.modules
    }

    #[must_use]
    pub const fn descriptor_relocations(&self) -> u32 {
        self.descriptor_relocations
    }

    #[must_use]
    pub const fn module_relocations(&self) -> u32 {
        self.module_relocations
    }

    /// Run every step up to, but not including, the call into the ELF loader.
    ///
    /// On success the descriptor has no live command line tag except the one
    /// made from the kernel module's label, and the kernel's segments overlap
    /// neither the descriptor nor any other boot module.
    ///
    /// # Errors
    /// Any [`ChainLoadError`] other than [`ChainLoadError::LoaderReturned`].
    pub fn prepare(&mut self, descriptor: PhysicalAddress) -> Result<HandOff, ChainLoadError> {
        self.descriptor = descriptor;

        let mut phase = Phase::Collecting;
        loop {
            trace!("{phase:?}");
            phase = match phase {
                Phase::Collecting => {
                    self.collect()?;
                    Phase::ValidatingPlacement
                }
                Phase::ValidatingPlacement => self.validate_placement()?,
                Phase::RelocatingDescriptor => {
                    self.relocate_descriptor()?;
                    Phase::Collecting
                }
                Phase::RelocatingModules => self.relocate_next_module()?,
                Phase::Finalizing => Phase::HandOff(self.finalize()?),
                Phase::HandOff(handoff) => return Ok(handoff),
            };
        }
    }

    /// [`prepare`](Self::prepare) and call `loader`. Only returns on failure.
    pub fn boot<L: ElfLoader + ?Sized>(&mut self, descriptor: PhysicalAddress, loader: &mut L) -> ChainLoadError {
        match self.prepare(descriptor) {
            Ok(handoff) => {
                info!(
                    "loading kernel from {} (descriptor {}, jump code {})",
                    handoff.kernel, handoff.descriptor, handoff.jump_code
                );
                loader.load(&handoff);
                ChainLoadError::LoaderReturned
            }
            Err(e) => e,
        }
    }

    fn collect(&mut self) -> Result<(), ChainLoadError> {
        self.modules.clear();

        let extent = descriptor_extent(&*self.memory, self.descriptor)?;
        let mut mbi = BootDescriptorMut::parse(self.memory.bytes_mut(extent)?)?;

        loop {
            let cmdline = mbi
                .as_descriptor()
                .tags()
                .find(|t| t.tag_type() == tag_types::CMDLINE)
                .map(|t| t.offset());
            let Some(offset) = cmdline else {
                break;
            };
            mbi.invalidate(offset)?;
            debug!("invalidated boot command line at {offset:#x}");
        }

        for (offset, module) in mbi.as_descriptor().modules() {
            let handle = self.modules.push(offset, &module)?;
            debug!(
                "module {}: {} {:?}",
                handle.index(),
                module.range(),
                module.label
            );
        }

        if self.modules.is_empty() {
            return Err(ChainLoadError::NoModule);
        }

        info!(
            "collected {} module(s) from descriptor at {}",
            self.modules.len(),
            self.descriptor
        );
        Ok(())
    }

    fn kernel_image(&self) -> Result<ElfHeader, ChainLoadError> {
        let kernel = self.modules.kernel().ok_or(ChainLoadError::NoModule)?;
        Ok(ElfHeader::parse(self.memory.bytes(kernel.range())?)?)
    }

    fn validate_placement(&self) -> Result<Phase, ChainLoadError> {
        let elf = self.kernel_image()?;
        let located = located(&*self.memory, self.descriptor)?;

        match validate(&elf, &located, self.image) {
            Ok(()) => Ok(Phase::RelocatingModules),
            Err(PlacementError::DescriptorOverlap {
                segment,
                descriptor,
            }) => {
                warn!("kernel segment {segment} overlaps the boot descriptor at {descriptor}");
                Ok(Phase::RelocatingDescriptor)
            }
            Err(PlacementError::OutOfRam { segment }) => Err(ChainLoadError::OutOfRam { segment }),
        }
    }

    fn relocate_descriptor(&mut self) -> Result<(), ChainLoadError> {
        if self.descriptor_relocations >= MAX_DESCRIPTOR_RELOCATIONS {
            return Err(ChainLoadError::RelocationLimit {
                purpose: RegionPurpose::Descriptor,
                limit: MAX_DESCRIPTOR_RELOCATIONS,
            });
        }

        let (source, target) = {
            let located = located(&*self.memory, self.descriptor)?;
            let source = located.extent();
            let target = find_region(&located, self.image, source.len(), Fit::Highest, self.ceiling)
                .ok_or(ChainLoadError::NoRegionFound {
                    purpose: RegionPurpose::Descriptor,
                    size: source.len(),
                })?;
            (source, target)
        };

        self.memory.copy(source, target)?;
        info!("relocated boot descriptor {source} -> {target}");

        self.descriptor = target;
        self.ceiling = target;
        self.descriptor_relocations += 1;
        Ok(())
    }

    fn relocate_next_module(&mut self) -> Result<Phase, ChainLoadError> {
        let elf = self.kernel_image()?;
        let Some(handle) = find_conflict(&elf, &self.modules) else {
            return Ok(Phase::Finalizing);
        };

        if self.module_relocations >= MAX_MODULE_RELOCATIONS {
            return Err(ChainLoadError::RelocationLimit {
                purpose: RegionPurpose::Module,
                limit: MAX_MODULE_RELOCATIONS,
            });
        }

        let record = *self.modules.get(handle).ok_or(ChainLoadError::NoModule)?;
        let source = record.range();
        let size = record.size();
        let no_region = ChainLoadError::NoRegionFound {
            purpose: RegionPurpose::Module,
            size,
        };

        let target = {
            let located = located(&*self.memory, self.descriptor)?;
            find_region(&located, self.image, size, Fit::Highest, self.ceiling)
        }
        .ok_or(no_region)?;

        let last = target.checked_add(size - 1).ok_or(no_region)?;
        let start = u32::try_from(target.as_u64()).map_err(|_| no_region)?;
        let end = u32::try_from(last.as_u64()).map_err(|_| no_region)?;

        self.memory.copy(source, target)?;
        edit(&mut *self.memory, self.descriptor, |mbi| {
            mbi.set_module_range(record.tag_offset, start, end)
        })?;
        if let Some(r) = self.modules.get_mut(handle) {
            r.start = start;
            r.end = end;
        }

        info!("relocated module {} {source} -> {target}", handle.index());
        self.ceiling = target;
        self.module_relocations += 1;
        Ok(Phase::RelocatingModules)
    }

    fn finalize(&mut self) -> Result<HandOff, ChainLoadError> {
        let kernel = *self.modules.kernel().ok_or(ChainLoadError::NoModule)?;

        // Must happen while the kernel module tag still reserves the image.
        let jump_code = {
            let located = located(&*self.memory, self.descriptor)?;
            find_region(&located, self.image, JUMP_CODE_SIZE, Fit::Highest, self.ceiling)
        }
        .ok_or(ChainLoadError::NoRegionFound {
            purpose: RegionPurpose::JumpCode,
            size: JUMP_CODE_SIZE,
        })?;

        edit(&mut *self.memory, self.descriptor, |mbi| {
            mbi.repurpose_module_as_cmdline(kernel.tag_offset)
        })?;
        if let Some(r) = self.modules.get_mut(ModuleHandle::KERNEL) {
            r.state = ModuleState::Consumed;
        }

        debug!("jump code at {jump_code}");
        Ok(HandOff {
            descriptor: self.descriptor,
            kernel: PhysicalAddress::from(kernel.start),
            magic: BOOTLOADER_MAGIC,
            jump_code,
        })
    }
}

fn descriptor_extent<M: PhysicalMemory + ?Sized>(
    memory: &M,
    at: PhysicalAddress,
) -> Result<PhysicalRange, ChainLoadError> {
    let header = memory.bytes(PhysicalRange::new(at, HEADER_SIZE as u64))?;
    let total = peek_total_size(header).ok_or(DescriptorError::TooShort)?;
    Ok(PhysicalRange::new(at, u64::from(total)))
}

fn located<M: PhysicalMemory + ?Sized>(
    memory: &M,
    at: PhysicalAddress,
) -> Result<LocatedDescriptor<'_>, ChainLoadError> {
    let extent = descriptor_extent(memory, at)?;
    let descriptor = BootDescriptor::parse(memory.bytes(extent)?)?;
    Ok(LocatedDescriptor::new(at, descriptor))
}

fn edit<M: PhysicalMemory + ?Sized>(
    memory: &mut M,
    at: PhysicalAddress,
    f: impl FnOnce(&mut BootDescriptorMut<'_>) -> Result<(), DescriptorError>,
) -> Result<(), ChainLoadError> {
    let extent = descriptor_extent(memory, at)?;
    let mut mbi = BootDescriptorMut::parse(memory.bytes_mut(extent)?)?;
    Ok(f(&mut mbi)?)
}
