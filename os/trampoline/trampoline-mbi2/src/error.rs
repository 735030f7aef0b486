#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    #[error("boot descriptor is shorter than its header")]
    TooShort,
    #[error("boot descriptor declares {total_size} bytes but only {available} are readable")]
    BadTotalSize { total_size: u32, available: usize },
    #[error("tag of type {tag_type} at offset {offset:#x} is too short for its payload")]
    TruncatedTag { tag_type: u32, offset: usize },
    #[error("memory map entry size {0} is smaller than an entry")]
    BadEntrySize(u32),
    #[error("no tag header at offset {offset:#x}")]
    NoTagAt { offset: usize },
    #[error("tag at offset {offset:#x} is not a module (type {tag_type})")]
    NotAModule { tag_type: u32, offset: usize },
}
