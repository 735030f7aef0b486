use crate::ChainLoadError;
use heapless::Vec;
use trampoline_addresses::{PhysicalAddress, PhysicalRange};
use trampoline_mbi2::ModuleTag;

/// Most boot modules collected from one descriptor.
pub const MAX_MODULES: usize = 32;

/// Index of a module in collection order; handle `0` is the kernel.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ModuleHandle(usize);

impl ModuleHandle {
    pub const KERNEL: Self = Self(0);

    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }

    #[must_use]
    pub const fn is_kernel(self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ModuleState {
    Pending,
    /// Turned into the kernel command line; no longer a module tag.
    Consumed,
}

/// A collected module and where its tag sits in the descriptor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ModuleRecord {
    pub handle: ModuleHandle,
    pub tag_offset: usize,
    pub start: u32,
    /// Inclusive.
    pub end: u32,
    pub state: ModuleState,
}

impl ModuleRecord {
    #[must_use]
    pub fn range(&self) -> PhysicalRange {
        PhysicalRange::from_inclusive(PhysicalAddress::from(self.start), PhysicalAddress::from(self.end))
    }

    /// `end - start + 1`.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.range().len()
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.state, ModuleState::Pending)
    }
}

#[derive(Debug, Default)]
pub struct ModuleTable {
    records: Vec<ModuleRecord, MAX_MODULES>,
}

impl ModuleTable {
    #[must_use]
    pub const fn new() -> Self {
        Self { records: Vec::new() }
    }

    /// # Errors
    /// [`ChainLoadError::CapacityExceeded`] once [`MAX_MODULES`] are recorded.
    pub fn push(&mut self, tag_offset: usize, tag: &ModuleTag<'_>) -> Result<ModuleHandle, ChainLoadError> {
        let handle = ModuleHandle(self.records.len());
        self.records
            .push(ModuleRecord {
                handle,
                tag_offset,
                start: tag.start,
                end: tag.end,
                state: ModuleState::Pending,
            })
            .map_err(|_| ChainLoadError::CapacityExceeded {
                capacity: MAX_MODULES,
            })?;
        Ok(handle)
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn get(&self, handle: ModuleHandle) -> Option<&ModuleRecord> {
        self.records.get(handle.0)
    }

    pub fn get_mut(&mut self, handle: ModuleHandle) -> Option<&mut ModuleRecord> {
        self.records.get_mut(handle.0)
    }

    #[must_use]
    pub fn kernel(&self) -> Option<&ModuleRecord> {
        self.get(ModuleHandle::KERNEL)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleRecord> {
        self.records.iter()
    }
}
