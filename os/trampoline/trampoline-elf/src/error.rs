#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ElfError {
    #[error("The image is shorter than an ELF header")]
    TooShort,
    #[error("The image does not start with the ELF magic bytes")]
    BadMagic,
    #[error("Unsupported ELF class {0}")]
    UnsupportedClass(u8),
    #[error("Unsupported ELF data encoding {0}; only little-endian images are accepted")]
    UnsupportedEncoding(u8),
    #[error("Program header entry size {found} does not match the expected {expected}")]
    BadProgramHeaderSize { expected: usize, found: usize },
    #[error("The program header table lies outside the image")]
    OutOfBounds,
    #[error("The image declares {0} program headers, more than can be tracked")]
    TooManySegments(usize),
}
