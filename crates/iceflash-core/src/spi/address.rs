//! 24-bit flash address

use core::fmt;

/// Offset into the flash's linear address space
///
/// Always fits in 24 bits; this is the only width the SPI commands in this
/// crate carry on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlashAddress(u32);

impl FlashAddress {
    /// Highest representable address
    pub const MAX: u32 = 0x00FF_FFFF;

    /// Create an address, returning `None` if it does not fit in 24 bits
    pub const fn new(addr: u32) -> Option<Self> {
        if addr > Self::MAX {
            None
        } else {
            Some(Self(addr))
        }
    }

    /// Decode a 3-byte big-endian address
    pub const fn from_be_bytes(bytes: [u8; 3]) -> Self {
        Self(((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | bytes[2] as u32)
    }

    /// Encode as 3 big-endian bytes
    pub const fn to_be_bytes(self) -> [u8; 3] {
        let [_, a2, a1, a0] = self.0.to_be_bytes();
        [a2, a1, a0]
    }

    /// The raw offset
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Whether the address sits on a multiple of `align` (a power of two)
    pub const fn is_aligned(self, align: u32) -> bool {
        self.0 & (align - 1) == 0
    }

    /// Add an offset, returning `None` past 24 bits
    pub const fn checked_add(self, offset: u32) -> Option<Self> {
        match self.0.checked_add(offset) {
            Some(a) => Self::new(a),
            None => None,
        }
    }
}

impl fmt::Display for FlashAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:06X}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_big_endian_bytes() {
        let addr = FlashAddress::from_be_bytes([0x01, 0x00, 0x00]);
        assert_eq!(addr.get(), 0x01_0000);
        assert_eq!(FlashAddress::new(0x12_3456).unwrap().to_be_bytes(), [0x12, 0x34, 0x56]);
    }

    #[test]
    fn test_range() {
        assert!(FlashAddress::new(0xFF_FFFF).is_some());
        assert!(FlashAddress::new(0x100_0000).is_none());
        let top = FlashAddress::new(0xFF_FFF0).unwrap();
        assert!(top.checked_add(0x0F).is_some());
        assert!(top.checked_add(0x10).is_none());
    }

    #[test]
    fn test_alignment() {
        assert!(FlashAddress::new(0x02_0000).unwrap().is_aligned(0x1_0000));
        assert!(!FlashAddress::new(0x02_0100).unwrap().is_aligned(0x1_0000));
        assert!(FlashAddress::default().is_aligned(0x1_0000));
    }
}
