use crate::PageSize;
use core::fmt;

/// Physical memory address.
///
/// A thin wrapper around a raw `u64` that denotes a **physical** address. The
/// trampoline runs with paging either disabled or identity-mapped, so physical
/// and pointer values coincide; the wrapper still keeps descriptor offsets and
/// sizes from being confused with addresses.
///
/// ### Examples
/// ```rust
/// # use trampoline_addresses::*;
/// let pa = PhysicalAddress::new(0x0000_0000_0010_0042);
/// assert_eq!(pa.align_down::<Size4K>().as_u64(), 0x10_0000);
/// assert_eq!(pa.checked_add(0xFBE), Some(PhysicalAddress::new(0x10_1000)));
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(u64);

impl PhysicalAddress {
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0)
    }

    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Align down to the `S` boundary.
    #[inline]
    #[must_use]
    pub const fn align_down<S: PageSize>(self) -> Self {
        Self(self.0 & !(S::SIZE - 1))
    }

    /// Align up to the `S` boundary, or `None` if that would leave the address space.
    #[inline]
    #[must_use]
    pub const fn align_up<S: PageSize>(self) -> Option<Self> {
        match self.0.checked_add(S::SIZE - 1) {
            Some(v) => Some(Self(v & !(S::SIZE - 1))),
            None => None,
        }
    }

    /// `None` if the sum leaves the address space.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, rhs: u64) -> Option<Self> {
        match self.0.checked_add(rhs) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA(0x{:016X})", self.as_u64())
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.as_u64())
    }
}

impl From<u32> for PhysicalAddress {
    #[inline]
    fn from(v: u32) -> Self {
        Self::new(u64::from(v))
    }
}
