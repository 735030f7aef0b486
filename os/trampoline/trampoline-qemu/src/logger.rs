use crate::qemu_trace;
use core::fmt;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

/// `log` backend for the debug console. Filtering is done through
/// [`log::max_level`], so there is a single static instance.
pub struct QemuLogger {
    _private: (),
}

static LOGGER: QemuLogger = QemuLogger { _private: () };

impl QemuLogger {
    /// Install the logger; call once, before the first log statement.
    ///
    /// # Errors
    /// Fails if another logger was installed first.
    pub fn init(max_level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_logger(&LOGGER)?;
        log::set_max_level(max_level);
        Ok(())
    }
}

impl Log for QemuLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        qemu_trace!("{}", DisplayRecord(record));
    }

    fn flush(&self) {}
}

struct DisplayRecord<'a, 'r>(&'a Record<'r>);

impl fmt::Display for DisplayRecord<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_record(f, self.0)
    }
}

/// Format a record as `[LEVEL] target: message\n`.
///
/// # Errors
/// Propagates errors from the writer.
pub fn write_record<W: fmt::Write + ?Sized>(w: &mut W, record: &Record) -> fmt::Result {
    writeln!(w, "[{}] {}: {}", record.level(), record.target(), record.args())
}
