//! Flash geometry and timing

/// Immutable geometry and timing parameters for the attached flash
///
/// Created once at startup and handed to the driver by value; the driver
/// only exposes it by shared reference afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashConfig {
    /// Flash size in bytes
    pub capacity: u32,
    /// Delay between status register polls while busy
    pub poll_interval_us: u32,
    /// Busy timeout for a page program
    pub program_timeout_us: u32,
    /// Busy timeout for a 64 KiB block erase
    pub block_erase_timeout_us: u32,
    /// Busy timeout for a chip erase
    pub chip_erase_timeout_us: u32,
    /// Settle time after the reset pattern
    pub reset_settle_us: u32,
    /// Wake-up time after release from deep power-down
    pub release_delay_us: u32,
}

impl FlashConfig {
    /// Winbond W25Q16 (2 MiB), the part on the reference board
    ///
    /// Datasheet maxima: page program 3 ms, 64 KiB erase 2 s, chip erase 25 s.
    pub const W25Q16: Self = Self {
        capacity: 2 * 1024 * 1024,
        poll_interval_us: 1_000,
        program_timeout_us: 20_000,
        block_erase_timeout_us: 4_000_000,
        chip_erase_timeout_us: 60_000_000,
        reset_settle_us: 10_000,
        release_delay_us: 1_000,
    };

    /// Same timings with a different capacity
    pub const fn with_capacity(self, capacity: u32) -> Self {
        Self { capacity, ..self }
    }
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self::W25Q16
    }
}
