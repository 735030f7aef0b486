use crate::PhysicalAddress;
use core::fmt;

/// A half-open span `[start, start + len)` of physical memory.
///
/// The end is saturated at `u64::MAX`, so a range reported by firmware that
/// would wrap the address space is simply cut short instead of overflowing.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct PhysicalRange {
    start: PhysicalAddress,
    len: u64,
}

impl PhysicalRange {
    #[inline]
    #[must_use]
    pub const fn new(start: PhysicalAddress, len: u64) -> Self {
        let max_len = u64::MAX - start.as_u64();
        let len = if len > max_len { max_len } else { len };
        Self { start, len }
    }

    /// Build from an **inclusive** `[first, last]` pair (Multiboot2 module convention).
    ///
    /// A pair with `last < first` yields an empty range.
    #[inline]
    #[must_use]
    pub const fn from_inclusive(first: PhysicalAddress, last: PhysicalAddress) -> Self {
        if last.as_u64() < first.as_u64() {
            return Self::new(first, 0);
        }
        Self::new(first, (last.as_u64() - first.as_u64()).saturating_add(1))
    }

    /// Build from a half-open `[start, end)` pair.
    #[inline]
    #[must_use]
    pub const fn from_bounds(start: PhysicalAddress, end: PhysicalAddress) -> Self {
        Self::new(start, end.as_u64().saturating_sub(start.as_u64()))
    }

    #[inline]
    #[must_use]
    pub const fn start(&self) -> PhysicalAddress {
        self.start
    }

    /// Exclusive end.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.start.as_u64() + self.len)
    }

    #[inline]
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether both ranges share at least one byte.
    #[inline]
    #[must_use]
    pub const fn intersects(&self, other: Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.start.as_u64() < other.end().as_u64()
            && other.start.as_u64() < self.end().as_u64()
    }

    /// Whether `inner` lies entirely within `self`.
    #[inline]
    #[must_use]
    pub const fn contains_range(&self, inner: Self) -> bool {
        self.start.as_u64() <= inner.start.as_u64() && inner.end().as_u64() <= self.end().as_u64()
    }

    /// The part of this range that lies below `ceiling`.
    #[inline]
    #[must_use]
    pub const fn clamp_below(&self, ceiling: PhysicalAddress) -> Self {
        if self.start.as_u64() >= ceiling.as_u64() {
            return Self::new(self.start, 0);
        }
        if self.end().as_u64() > ceiling.as_u64() {
            return Self::from_bounds(self.start, ceiling);
        }
        *self
    }
}

impl fmt::Debug for PhysicalRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PR({:#x}+{:#x})", self.start.as_u64(), self.len)
    }
}

impl fmt::Display for PhysicalRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}+{:#x}", self.start.as_u64(), self.len)
    }
}
