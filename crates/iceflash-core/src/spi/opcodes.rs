//! JEDEC SPI NOR opcodes used by the programmer
//!
//! Only the subset the W25Q-class parts behind the iCE40 need. All
//! addressed commands use 3-byte addressing.

// ============================================================================
// Write control
// ============================================================================

/// Write Enable - sets the write enable latch, required before any
/// program/erase command
pub const WREN: u8 = 0x06;

// ============================================================================
// Status register
// ============================================================================

/// Read Status Register 1 (bit 0 = busy)
pub const RDSR: u8 = 0x05;

// ============================================================================
// Identification
// ============================================================================

/// Read JEDEC ID (manufacturer, memory type, capacity)
pub const RDID: u8 = 0x9F;

// ============================================================================
// Power management
// ============================================================================

/// Deep Power Down
pub const DP: u8 = 0xB9;
/// Release from Deep Power Down
pub const RDP: u8 = 0xAB;

// ============================================================================
// Data access
// ============================================================================

/// Read Data (3-byte address, no dummy cycles)
pub const READ: u8 = 0x03;
/// Page Program (3-byte address)
pub const PP: u8 = 0x02;

// ============================================================================
// Erase
// ============================================================================

/// Block Erase 64KB (3-byte address)
pub const BE_D8: u8 = 0xD8;
/// Chip Erase
pub const CE_C7: u8 = 0xC7;

// ============================================================================
// Reset pattern
// ============================================================================

/// Filler byte clocked out to terminate continuous-read / QPI modes
pub const RESET_FILL: u8 = 0xFF;
/// Length of the reset pattern in bytes
pub const RESET_PATTERN_LEN: usize = 8;

// ============================================================================
// Geometry
// ============================================================================

/// Page program wraps at this boundary
pub const PAGE_SIZE: u32 = 256;
/// Block erase granularity
pub const BLOCK_64K: u32 = 64 * 1024;
