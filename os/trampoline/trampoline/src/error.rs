use trampoline_chainload::ChainLoadError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrampolineError {
    #[error("not loaded by a Multiboot-compliant loader (magic {magic:#010x})")]
    UnknownBootProtocol { magic: u32 },
    #[error("loaded through Multiboot 1; only Multiboot2 descriptors can be chain-loaded")]
    LegacyProtocol,
    #[error(transparent)]
    ChainLoad(#[from] ChainLoadError),
}

impl TrampolineError {
    /// Value returned to the boot stub. Every failure is fatal.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::UnknownBootProtocol { .. } | Self::LegacyProtocol | Self::ChainLoad(_) => 1,
        }
    }
}
