//! # Bare-Metal Glue
//!
//! The boot loader enters [`_start`] in 32-bit protected mode with paging
//! off, `EAX` holding the boot magic and `EBX` the descriptor address. Every
//! physical address below 4 GiB is therefore directly addressable.
//!
//! Built only for the 32-bit bare-metal target described in the crate docs.

use core::ffi::c_void;
use core::hint::spin_loop;
use log::LevelFilter;
use trampoline_addresses::{PhysicalAddress, PhysicalRange};
use trampoline_chainload::{HandOff, MemoryError, PhysicalMemory};
use trampoline_qemu::{QemuLogger, qemu_trace};

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    qemu_trace!("trampoline panicked: {info}\n");
    loop {
        spin_loop();
    }
}

const HEADER_MAGIC: u32 = 0xE852_50D6;
const ARCHITECTURE_I386: u32 = 0;
#[allow(clippy::cast_possible_truncation)]
const HEADER_LENGTH: u32 = core::mem::size_of::<Multiboot2Header>() as u32;

/// Multiboot2 image header with nothing but the end tag.
#[repr(C, align(8))]
struct Multiboot2Header {
    magic: u32,
    architecture: u32,
    header_length: u32,
    checksum: u32,
    end_tag: [u32; 2],
}

#[unsafe(link_section = ".multiboot2")]
#[used]
static MULTIBOOT2_HEADER: Multiboot2Header = Multiboot2Header {
    magic: HEADER_MAGIC,
    architecture: ARCHITECTURE_I386,
    header_length: HEADER_LENGTH,
    checksum: 0u32
        .wrapping_sub(HEADER_MAGIC)
        .wrapping_sub(ARCHITECTURE_I386)
        .wrapping_sub(HEADER_LENGTH),
    end_tag: [0, 8],
};

/// Stack size.
const BOOT_STACK_SIZE: usize = 16 * 1024;

/// 16-byte aligned stack
#[repr(align(16))]
struct Aligned<const N: usize>([u8; N]);

#[unsafe(link_section = ".bss.boot")]
#[unsafe(no_mangle)]
static mut BOOT_STACK: Aligned<BOOT_STACK_SIZE> = Aligned([0; BOOT_STACK_SIZE]);

/// Loader entry: set up a stack and call [`trampoline_main`] with the
/// loader's `EAX` and `EBX`. Halts if it returns.
#[unsafe(no_mangle)]
#[unsafe(naked)]
pub extern "C" fn _start() -> ! {
    core::arch::naked_asm!(
        "cli",
        "mov esp, offset {stack_sym}",
        "add esp, {stack_size}",
        "and esp, -16",
        // two pushes below keep the call site 16-byte aligned
        "sub esp, 8",
        "push ebx",
        "push eax",
        "call {rust_entry}",
        "2:",
        "cli",
        "hlt",
        "jmp 2b",
        stack_sym = sym BOOT_STACK,
        stack_size = const BOOT_STACK_SIZE,
        rust_entry = sym trampoline_main,
    );
}

unsafe extern "C" {
    /// Trampoline load range, provided by the linker script.
    static _image_start: u8;
    static _image_end: u8;

    /// Copies the kernel's segments into place and jumps to its entry point
    /// through code placed at `jump_code`. Provided by the platform support
    /// library.
    fn load_elf(mbi: *mut c_void, binary: *const c_void, magic: u32, jump_code: *mut c_void);
}

extern "C" fn trampoline_main(magic: u32, descriptor: u32) -> i32 {
    qemu_trace!("trampoline entered (magic {magic:#010x}, descriptor {descriptor:#010x})\n");
    if QemuLogger::init(LevelFilter::Info).is_err() {
        qemu_trace!("logger already installed\n");
    }

    trampoline::run(
        magic,
        PhysicalAddress::from(descriptor),
        &mut IdentityMapped,
        &mut platform_load_elf,
        image(),
    )
}

fn image() -> PhysicalRange {
    let start = (&raw const _image_start).addr() as u64;
    let end = (&raw const _image_end).addr() as u64;
    PhysicalRange::from_bounds(PhysicalAddress::new(start), PhysicalAddress::new(end))
}

fn platform_load_elf(handoff: &HandOff) {
    // SAFETY: the chain loader checked that the kernel's segments avoid the
    // descriptor, every module still needed and the jump code page.
    unsafe {
        load_elf(
            core::ptr::with_exposed_provenance_mut(address(handoff.descriptor)),
            core::ptr::with_exposed_provenance(address(handoff.kernel)),
            handoff.magic,
            core::ptr::with_exposed_provenance_mut(address(handoff.jump_code)),
        );
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn address(addr: PhysicalAddress) -> usize {
    // hand-off addresses are below the 4 GiB ceiling
    addr.as_u64() as usize
}

/// Physical memory with paging disabled.
struct IdentityMapped;

impl IdentityMapped {
    fn span(range: PhysicalRange) -> Result<(usize, usize), MemoryError> {
        let inaccessible = MemoryError::Inaccessible(range);
        let start = usize::try_from(range.start().as_u64()).map_err(|_| inaccessible)?;
        let len = usize::try_from(range.len()).map_err(|_| inaccessible)?;
        if start == 0 || start.checked_add(len).is_none() {
            return Err(inaccessible);
        }
        Ok((start, len))
    }
}

impl PhysicalMemory for IdentityMapped {
    fn bytes(&self, range: PhysicalRange) -> Result<&[u8], MemoryError> {
        let (start, len) = Self::span(range)?;
        // SAFETY: paging is off, so the range is plain RAM or MMIO the loader
        // described; nothing else runs while the trampoline does.
        Ok(unsafe { core::slice::from_raw_parts(core::ptr::with_exposed_provenance(start), len) })
    }

    fn bytes_mut(&mut self, range: PhysicalRange) -> Result<&mut [u8], MemoryError> {
        let (start, len) = Self::span(range)?;
        // SAFETY: as for `bytes`; `&mut self` keeps the slice unique.
        Ok(unsafe { core::slice::from_raw_parts_mut(core::ptr::with_exposed_provenance_mut(start), len) })
    }

    fn copy(&mut self, src: PhysicalRange, dst: PhysicalAddress) -> Result<(), MemoryError> {
        let (from, len) = Self::span(src)?;
        let (to, _) = Self::span(PhysicalRange::new(dst, src.len()))?;
        // SAFETY: both spans were checked above; `ptr::copy` allows overlap.
        unsafe {
            core::ptr::copy(
                core::ptr::with_exposed_provenance::<u8>(from),
                core::ptr::with_exposed_provenance_mut::<u8>(to),
                len,
            );
        }
        Ok(())
    }
}
