//! JEDEC identification and known chips
//!
//! The programmer itself only needs "raw address + length", but the host
//! wants to know how much flash there is before a full read or erase. This
//! small table covers the serial NOR parts commonly found on iCE40 boards.

use core::fmt;

/// The three bytes returned by the Read JEDEC ID command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JedecId {
    /// JEDEC manufacturer ID
    pub manufacturer: u8,
    /// Memory type
    pub memory_type: u8,
    /// Capacity code (log2 of the size in bytes for most vendors)
    pub capacity: u8,
}

impl JedecId {
    /// Build from the raw response bytes
    pub const fn from_bytes(bytes: [u8; 3]) -> Self {
        Self {
            manufacturer: bytes[0],
            memory_type: bytes[1],
            capacity: bytes[2],
        }
    }

    /// The raw response bytes
    pub const fn to_bytes(self) -> [u8; 3] {
        [self.manufacturer, self.memory_type, self.capacity]
    }

    /// Device ID as a 16-bit value (memory type << 8 | capacity)
    pub const fn device_id(&self) -> u16 {
        ((self.memory_type as u16) << 8) | self.capacity as u16
    }

    /// Whether the bus returned all-ones or all-zeros (no chip, or a chip
    /// still in deep power-down)
    pub const fn is_blank(&self) -> bool {
        let b = self.to_bytes();
        (b[0] == 0xFF && b[1] == 0xFF && b[2] == 0xFF) || (b[0] == 0 && b[1] == 0 && b[2] == 0)
    }

    /// Look up this ID in the table of known chips
    pub fn chip(&self) -> Option<&'static ChipInfo> {
        KNOWN_CHIPS.iter().find(|c| c.jedec == *self)
    }
}

impl fmt::Display for JedecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X} {:02X} {:02X}",
            self.manufacturer, self.memory_type, self.capacity
        )
    }
}

/// A known flash part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipInfo {
    /// Vendor name
    pub vendor: &'static str,
    /// Part name
    pub name: &'static str,
    /// JEDEC ID
    pub jedec: JedecId,
    /// Total size in bytes
    pub total_size: u32,
}

const fn chip(vendor: &'static str, name: &'static str, id: [u8; 3], total_size: u32) -> ChipInfo {
    ChipInfo {
        vendor,
        name,
        jedec: JedecId::from_bytes(id),
        total_size,
    }
}

/// Serial NOR parts found on common iCE40 boards
pub static KNOWN_CHIPS: &[ChipInfo] = &[
    chip("Winbond", "W25Q16", [0xEF, 0x40, 0x15], 2 * 1024 * 1024),
    chip("Winbond", "W25Q32", [0xEF, 0x40, 0x16], 4 * 1024 * 1024),
    chip("Winbond", "W25Q64", [0xEF, 0x40, 0x17], 8 * 1024 * 1024),
    chip("Winbond", "W25Q128", [0xEF, 0x40, 0x18], 16 * 1024 * 1024),
    chip("Micron", "N25Q032", [0x20, 0xBA, 0x16], 4 * 1024 * 1024),
    chip("Spansion", "S25FL116K", [0x01, 0x40, 0x15], 2 * 1024 * 1024),
    chip("Macronix", "MX25L1606E", [0xC2, 0x20, 0x15], 2 * 1024 * 1024),
    chip("ISSI", "IS25LP016", [0x9D, 0x60, 0x15], 2 * 1024 * 1024),
    chip("Adesto", "AT25SF161", [0x1F, 0x86, 0x01], 2 * 1024 * 1024),
];
