//! iceflash-dummy - In-memory SPI NOR emulator for testing
//!
//! [`DummyFlash`] implements [`FlashTransport`] on top of a byte vector and
//! behaves like a W25Q16 on the bus: it needs a write enable before every
//! mutating command, stays busy for a configurable number of status polls,
//! ignores everything but Release Power-Down while in deep power-down, and
//! wraps page programs within a 256-byte page.
//!
//! Every exchange is recorded so tests can assert on exact bus traffic.

use iceflash_core::chip::JedecId;
use iceflash_core::error::TransportError;
use iceflash_core::spi::{opcodes, Status1};
use iceflash_core::transport::{FlashTransport, ResetLine};

#[cfg(test)]
mod tests;

/// Configuration for the dummy flash
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// JEDEC ID returned by 0x9F
    pub jedec: JedecId,
    /// Flash size in bytes
    pub size: usize,
    /// Status polls that report busy after a page program
    pub program_busy_polls: u32,
    /// Status polls that report busy after a 64 KiB block erase
    pub block_erase_busy_polls: u32,
    /// Status polls that report busy after a chip erase
    pub chip_erase_busy_polls: u32,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            jedec: JedecId::from_bytes([0xEF, 0x40, 0x15]), // W25Q16
            size: 2 * 1024 * 1024,
            program_busy_polls: 1,
            block_erase_busy_polls: 3,
            chip_erase_busy_polls: 5,
        }
    }
}

/// Kind of bus exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Opcode, header and payload clocked out
    Write,
    /// Opcode and header clocked out, response clocked in
    Transceive,
}

/// One recorded bus exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Write or transceive
    pub direction: Direction,
    /// First byte on the bus
    pub opcode: u8,
    /// Address or dummy bytes after the opcode
    pub header: Vec<u8>,
    /// Data written after the header
    pub payload: Vec<u8>,
    /// Number of bytes read back
    pub read_len: usize,
}

/// Emulated SPI NOR flash
pub struct DummyFlash {
    config: DummyConfig,
    data: Vec<u8>,
    write_enabled: bool,
    powered_down: bool,
    busy_polls: u32,
    stuck_busy: bool,
    fault_after: Option<usize>,
    busy_violations: usize,
    elapsed_us: u64,
    log: Vec<Transaction>,
}

impl DummyFlash {
    /// Create a blank (all 0xFF) dummy flash
    pub fn new(config: DummyConfig) -> Self {
        let data = vec![0xFF; config.size];
        Self {
            config,
            data,
            write_enabled: false,
            powered_down: false,
            busy_polls: 0,
            stuck_busy: false,
            fault_after: None,
            busy_violations: 0,
            elapsed_us: 0,
            log: Vec::new(),
        }
    }

    /// Create a blank W25Q16
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create a dummy flash with pre-filled data
    pub fn with_data(config: DummyConfig, initial_data: &[u8]) -> Self {
        let mut flash = Self::new(config);
        let len = core::cmp::min(initial_data.len(), flash.data.len());
        flash.data[..len].copy_from_slice(&initial_data[..len]);
        flash
    }

    /// Flash contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable flash contents
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// The configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Every exchange seen so far, oldest first
    pub fn transactions(&self) -> &[Transaction] {
        &self.log
    }

    /// Opcodes of every exchange seen so far
    pub fn opcodes(&self) -> Vec<u8> {
        self.log.iter().map(|t| t.opcode).collect()
    }

    /// Forget recorded exchanges
    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Commands other than status reads that arrived while busy
    pub fn busy_violations(&self) -> usize {
        self.busy_violations
    }

    /// Sum of all requested delays
    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_us
    }

    /// Whether the chip is in deep power-down
    pub fn is_powered_down(&self) -> bool {
        self.powered_down
    }

    /// Whether the write enable latch is set
    pub fn write_enabled(&self) -> bool {
        self.write_enabled
    }

    /// Keep the busy bit set forever (until the next reset pattern)
    pub fn set_stuck_busy(&mut self, stuck: bool) {
        self.stuck_busy = stuck;
    }

    /// Fail every exchange after the next `ok` successful ones
    pub fn inject_fault_after(&mut self, ok: usize) {
        self.fault_after = Some(ok);
    }

    /// Stop failing exchanges
    pub fn clear_fault(&mut self) {
        self.fault_after = None;
    }

    fn is_busy(&self) -> bool {
        self.stuck_busy || self.busy_polls > 0
    }

    fn status(&self) -> Status1 {
        let mut status = Status1::empty();
        status.set(Status1::BUSY, self.is_busy());
        status.set(Status1::WEL, self.write_enabled);
        status
    }

    fn record(
        &mut self,
        direction: Direction,
        opcode: u8,
        header: &[u8],
        payload: &[u8],
        read_len: usize,
    ) -> Result<(), TransportError> {
        self.log.push(Transaction {
            direction,
            opcode,
            header: header.to_vec(),
            payload: payload.to_vec(),
            read_len,
        });

        match self.fault_after {
            Some(0) => Err(TransportError::BusFault),
            Some(ref mut n) => {
                *n -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn address(header: &[u8]) -> usize {
        match header {
            [a, b, c, ..] => ((*a as usize) << 16) | ((*b as usize) << 8) | *c as usize,
            _ => 0,
        }
    }

    fn page_program(&mut self, header: &[u8], payload: &[u8]) {
        let addr = Self::address(header) % self.data.len();
        let page = opcodes::PAGE_SIZE as usize;
        let page_base = addr - addr % page;

        // The chip wraps within the page; only the last 256 bytes count
        let start = payload.len().saturating_sub(page);
        for (i, &byte) in payload[start..].iter().enumerate() {
            let offset = (addr % page + start + i) % page;
            self.data[page_base + offset] &= byte;
        }
        self.busy_polls = self.config.program_busy_polls;
    }

    fn block_erase(&mut self, header: &[u8]) {
        let block = opcodes::BLOCK_64K as usize;
        let addr = Self::address(header) % self.data.len();
        let base = addr - addr % block;
        let end = (base + block).min(self.data.len());
        self.data[base..end].fill(0xFF);
        self.busy_polls = self.config.block_erase_busy_polls;
    }

    fn chip_erase(&mut self) {
        self.data.fill(0xFF);
        self.busy_polls = self.config.chip_erase_busy_polls;
    }
}

impl FlashTransport for DummyFlash {
    fn write(&mut self, opcode: u8, header: &[u8], payload: &[u8]) -> Result<(), TransportError> {
        self.record(Direction::Write, opcode, header, payload, 0)?;

        if self.powered_down {
            if opcode == opcodes::RDP {
                log::trace!("dummy: release from power-down");
                self.powered_down = false;
            }
            return Ok(());
        }

        // The 0xFF pattern terminates whatever the chip was doing
        if opcode == opcodes::RESET_FILL {
            if header.len() + 1 >= opcodes::RESET_PATTERN_LEN
                && header.iter().all(|&b| b == opcodes::RESET_FILL)
            {
                log::trace!("dummy: reset pattern");
                self.write_enabled = false;
                self.busy_polls = 0;
                self.stuck_busy = false;
            }
            return Ok(());
        }

        if self.is_busy() {
            log::warn!("dummy: opcode {:#04x} while busy", opcode);
            self.busy_violations += 1;
            return Ok(());
        }

        match opcode {
            opcodes::WREN => self.write_enabled = true,
            opcodes::DP => self.powered_down = true,
            opcodes::RDP => {}
            opcodes::PP | opcodes::BE_D8 | opcodes::CE_C7 => {
                if !self.write_enabled {
                    log::warn!("dummy: opcode {:#04x} without write enable", opcode);
                    return Ok(());
                }
                self.write_enabled = false;
                match opcode {
                    opcodes::PP => self.page_program(header, payload),
                    opcodes::BE_D8 => self.block_erase(header),
                    _ => self.chip_erase(),
                }
            }
            _ => log::debug!("dummy: ignoring opcode {:#04x}", opcode),
        }
        Ok(())
    }

    fn transceive(
        &mut self,
        opcode: u8,
        header: &[u8],
        response: &mut [u8],
    ) -> Result<(), TransportError> {
        self.record(Direction::Transceive, opcode, header, &[], response.len())?;

        // Nothing drives MISO: pull-ups read as ones
        response.fill(0xFF);
        if self.powered_down {
            return Ok(());
        }

        if opcode == opcodes::RDSR {
            let status = self.status().bits();
            response.fill(status);
            if !self.stuck_busy && self.busy_polls > 0 {
                self.busy_polls -= 1;
            }
            return Ok(());
        }

        if self.is_busy() {
            log::warn!("dummy: opcode {:#04x} while busy", opcode);
            self.busy_violations += 1;
            return Ok(());
        }

        match opcode {
            opcodes::RDID => {
                let id = self.config.jedec.to_bytes();
                for (dst, src) in response.iter_mut().zip(id.iter()) {
                    *dst = *src;
                }
            }
            opcodes::READ => {
                let len = self.data.len();
                let addr = Self::address(header);
                for (i, byte) in response.iter_mut().enumerate() {
                    *byte = self.data[(addr + i) % len];
                }
            }
            _ => log::debug!("dummy: ignoring opcode {:#04x}", opcode),
        }
        Ok(())
    }

    fn delay_us(&mut self, us: u32) {
        self.elapsed_us += u64::from(us);
    }
}

/// Reset line that counts how often it was pulsed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CountingResetLine {
    /// Currently asserted
    pub asserted: bool,
    /// Number of completed assert/release pulses
    pub pulses: usize,
}

impl ResetLine for CountingResetLine {
    fn assert_reset(&mut self) {
        self.asserted = true;
    }

    fn release_reset(&mut self) {
        if self.asserted {
            self.pulses += 1;
        }
        self.asserted = false;
    }
}
