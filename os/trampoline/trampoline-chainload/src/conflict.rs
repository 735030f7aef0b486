//! # Module Conflict Detection

use crate::{ModuleHandle, ModuleTable};
use trampoline_elf::ElfHeader;

/// The first pending module, other than the kernel itself, that lies where
/// a loadable kernel segment will be written.
#[must_use]
pub fn find_conflict(elf: &ElfHeader, modules: &ModuleTable) -> Option<ModuleHandle> {
    modules
        .iter()
        .filter(|m| m.is_pending() && !m.handle.is_kernel())
        .find(|m| {
            let range = m.range();
            elf.loadable().any(|s| s.range().intersects(range))
        })
        .map(|m| m.handle)
}
