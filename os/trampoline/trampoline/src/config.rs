//! # Boot Command Line Options
//!
//! The trampoline shares its command line with sibling boot plugins, so
//! tokens it does not recognise are skipped silently. A recognised key with a
//! malformed value keeps the default and logs a warning.

use log::{LevelFilter, warn};
use trampoline_addresses::{GIB, MIB};
use trampoline_chainload::ChainLoadConfig;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TrampolineConfig {
    /// `phys_max=<size>`: nothing is relocated at or above this address.
    pub phys_max: u64,
    /// `loglevel=<off|error|warn|info|debug|trace>`.
    pub log_level: LevelFilter,
}

impl Default for TrampolineConfig {
    fn default() -> Self {
        Self {
            phys_max: ChainLoadConfig::DEFAULT_PHYS_MAX,
            log_level: LevelFilter::Info,
        }
    }
}

impl TrampolineConfig {
    /// Parse space separated `key=value` tokens.
    #[must_use]
    pub fn from_cmdline(cmdline: &str) -> Self {
        let mut config = Self::default();

        for token in cmdline.split_ascii_whitespace() {
            let Some((key, value)) = token.split_once('=') else {
                continue;
            };
            match key {
                "phys_max" => match parse_size(value) {
                    Some(size) if size > 0 => config.phys_max = size,
                    _ => warn!("ignoring malformed phys_max={value}"),
                },
                "loglevel" => match value.parse::<LevelFilter>() {
                    Ok(level) => config.log_level = level,
                    Err(_) => warn!("ignoring unknown loglevel={value}"),
                },
                _ => {}
            }
        }

        config
    }

    #[must_use]
    pub const fn chain_load(&self) -> ChainLoadConfig {
        ChainLoadConfig {
            phys_max: self.phys_max,
        }
    }
}

/// Decimal or `0x` hexadecimal, with an optional `K`, `M` or `G` suffix.
fn parse_size(value: &str) -> Option<u64> {
    let (digits, scale) = match value.as_bytes().last()? {
        b'K' | b'k' => (&value[..value.len() - 1], 1024),
        b'M' | b'm' => (&value[..value.len() - 1], MIB),
        b'G' | b'g' => (&value[..value.len() - 1], GIB),
        _ => (value, 1),
    };

    let number = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<u64>().ok()?,
    };
    number.checked_mul(scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = TrampolineConfig::from_cmdline("");
        assert_eq!(config.phys_max, 1 << 31);
        assert_eq!(config.log_level, LevelFilter::Info);
    }

    #[test]
    fn recognised_options() {
        let config = TrampolineConfig::from_cmdline("promisc phys_max=256M  loglevel=debug vga");
        assert_eq!(config.phys_max, 256 * MIB);
        assert_eq!(config.log_level, LevelFilter::Debug);
    }

    #[test]
    fn sizes() {
        assert_eq!(parse_size("4096"), Some(4096));
        assert_eq!(parse_size("64K"), Some(64 * 1024));
        assert_eq!(parse_size("3g"), Some(3 * GIB));
        assert_eq!(parse_size("0x10000000"), Some(0x1000_0000));
        assert_eq!(parse_size("0x10M"), Some(16 * MIB));
        assert_eq!(parse_size(""), None);
        assert_eq!(parse_size("M"), None);
        assert_eq!(parse_size("12Q"), None);
        assert_eq!(parse_size("99999999999999999999G"), None);
    }

    #[test]
    fn malformed_values_keep_the_defaults() {
        let config = TrampolineConfig::from_cmdline("phys_max=lots phys_max=0 loglevel=loud");
        assert_eq!(config, TrampolineConfig::default());
    }

    #[test]
    fn last_occurrence_wins() {
        let config = TrampolineConfig::from_cmdline("phys_max=1G phys_max=512M");
        assert_eq!(config.chain_load().phys_max, 512 * MIB);
    }
}
