//! # QEMU Debug Console Output
//!
//! Early-boot output for the trampoline. There is no console driver at the
//! point the trampoline runs, so everything goes to QEMU's debug console port
//! (`0x402`), which the host captures with `-debugcon`:
//!
//! ```bash
//! qemu-system-x86_64 -kernel trampoline.elf32 -debugcon stdio
//! ```
//!
//! ## Components
//!
//! * [`QemuLogger`]: a `log::Log` backend writing `[LEVEL] target: message`
//!   lines. The maximum level is taken from the boot command line.
//! * [`qemu_trace!`]: raw `format_args!`-style output that bypasses the log
//!   facade.
//!
//! Without the `enabled` feature, and on non-x86 targets, both compile to
//! no-ops; the formatting in [`write_record`] stays available for tests.
//!
//! ```rust,no_run
//! use log::{LevelFilter, info};
//! use trampoline_qemu::QemuLogger;
//!
//! QemuLogger::init(LevelFilter::Debug).expect("logger initialization");
//! info!("trampoline up");
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod logger;

pub use logger::{QemuLogger, write_record};

#[cfg(all(feature = "enabled", any(target_arch = "x86", target_arch = "x86_64")))]
#[doc(hidden)]
pub mod qemu_fmt {
    use core::fmt::{self, Write};

    /// QEMU's debug console I/O port.
    const QEMU_DEBUG_PORT: u16 = 0x402;

    #[allow(clippy::inline_always)]
    #[inline(always)]
    pub fn dbg_putc(c: u8) {
        // SAFETY: port 0x402 is the QEMU debugcon port; the write has no memory effects.
        unsafe { outb(QEMU_DEBUG_PORT, c) }
    }

    #[allow(clippy::inline_always)]
    #[inline(always)]
    unsafe fn outb(port: u16, val: u8) {
        unsafe {
            core::arch::asm!(
            "out dx, al",
            in("dx") port,
            in("al") val,
            options(nomem, nostack, preserves_flags)
            );
        }
    }

    pub struct QemuSink;

    impl Write for QemuSink {
        #[inline]
        fn write_str(&mut self, s: &str) -> fmt::Result {
            for b in s.bytes() {
                dbg_putc(b);
            }
            Ok(())
        }
    }

    #[doc(hidden)]
    #[inline]
    pub fn qemu_write(args: fmt::Arguments) {
        // Best-effort output.
        let _ = fmt::write(&mut QemuSink, args);
    }
}

#[cfg(not(all(feature = "enabled", any(target_arch = "x86", target_arch = "x86_64"))))]
#[doc(hidden)]
pub mod qemu_fmt {
    use core::fmt;

    #[doc(hidden)]
    #[inline(always)]
    #[allow(clippy::inline_always)]
    pub const fn qemu_write(_: fmt::Arguments) {}
}

#[macro_export]
macro_rules! qemu_trace {
    ($($arg:tt)*) => {{
        $crate::qemu_fmt::qemu_write(core::format_args!($($arg)*));
    }};
}
