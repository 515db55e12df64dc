//! SPI NOR flash driver
//!
//! [`FlashDriver`] sequences single transport exchanges into flash
//! operations and owns the only software model of the chip's state:
//!
//! ```text
//!            Reset                WREN            cmd            !busy
//! (any) ───────────▶ Idle ───────────▶ Latched ────────▶ Busy ────────▶ Idle
//!                     │  PowerDown
//!                     └───────────▶ PoweredDown ──(Reset only)──▶ Idle
//! ```
//!
//! A transport fault or busy timeout drops the model into
//! [`ChipState::Unknown`]; from there, as from power-on, only `reset()` is
//! accepted.
//!
//! Uses `maybe_async` to support both sync and async modes:
//! - With `is_sync` feature: blocking/synchronous
//! - Without `is_sync` feature: async (embassy)
//!
//! In async mode the busy poll awaits `delay_us` between polls, so a
//! cooperative executor keeps servicing USB while an erase runs; the
//! operation itself still completes before the call returns.

mod config;

pub use config::FlashConfig;

use core::fmt;

use crate::chip::JedecId;
use crate::error::{DriverError, TransportError};
use crate::spi::{opcodes, FlashAddress, Status1};
use crate::transport::{FlashTransport, NoResetLine, ResetLine};
use maybe_async::maybe_async;

/// Size of the driver's program buffer in bytes
pub const PROGRAM_BUFFER_LEN: usize = 64;

/// Driver-side model of the chip state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipState {
    /// Not known (power-on, transport fault, busy timeout); needs `reset()`
    Unknown,
    /// In deep power-down; only `reset()` wakes it
    PoweredDown,
    /// Ready for any command
    Idle,
    /// Write enable latch set, mutating command not yet sent
    WriteLatched,
    /// Mutating command sent, busy bit not yet seen clear
    Busy,
}

impl fmt::Display for ChipState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::PoweredDown => "powered down",
            Self::Idle => "idle",
            Self::WriteLatched => "write latched",
            Self::Busy => "busy",
        };
        f.write_str(s)
    }
}

/// Flash driver over a [`FlashTransport`]
///
/// Not reentrant: every method takes `&mut self` and runs to completion,
/// including busy polling, before returning.
pub struct FlashDriver<T, R = NoResetLine> {
    transport: T,
    reset_line: R,
    config: FlashConfig,
    state: ChipState,
}

impl<T: FlashTransport> FlashDriver<T, NoResetLine> {
    /// Create a driver for a flash with no attached reset target
    pub fn new(transport: T, config: FlashConfig) -> Self {
        Self::with_reset_line(transport, NoResetLine, config)
    }
}

impl<T: FlashTransport, R: ResetLine> FlashDriver<T, R> {
    /// Create a driver that holds `reset_line` asserted during `reset()`
    ///
    /// The initial state is [`ChipState::Unknown`].
    pub fn with_reset_line(transport: T, reset_line: R, config: FlashConfig) -> Self {
        Self {
            transport,
            reset_line,
            config,
            state: ChipState::Unknown,
        }
    }

    /// Current state of the chip model
    pub fn state(&self) -> ChipState {
        self.state
    }

    /// Geometry and timing in use
    pub fn config(&self) -> &FlashConfig {
        &self.config
    }

    /// Borrow the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Tear down the driver, returning the transport and reset line
    pub fn into_parts(self) -> (T, R) {
        (self.transport, self.reset_line)
    }

    // ------------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------------

    /// Reset the chip and bring it out of deep power-down
    ///
    /// Valid from every state, including `Busy` and `Unknown`. On success
    /// the state is `Idle`.
    #[maybe_async]
    pub async fn reset(&mut self) -> Result<(), DriverError> {
        log::debug!("flash reset (from {})", self.state);

        self.reset_line.assert_reset();
        let result = self.reset_sequence().await;
        self.reset_line.release_reset();

        result?;
        self.state = ChipState::Idle;
        Ok(())
    }

    /// Power-on sequence: reset, identify, then park the chip in deep
    /// power-down until the host asks for it
    ///
    /// Returns the JEDEC ID read in between. The reset line stays asserted
    /// through the ID read and is released before the power-down, so the
    /// attached FPGA cannot start its own configuration read while we are
    /// still on the bus. The chip stays powered down even if the ID is
    /// blank; the host decides what to do with that.
    #[maybe_async]
    pub async fn boot(&mut self) -> Result<JedecId, DriverError> {
        log::debug!("flash boot (from {})", self.state);

        self.reset_line.assert_reset();
        let result = self.wake_and_identify().await;
        self.reset_line.release_reset();

        let id = result?;
        if id.is_blank() {
            log::warn!("no flash answered the JEDEC ID read ({})", id);
        }
        self.power_down().await?;
        Ok(id)
    }

    /// Read the JEDEC ID
    #[maybe_async]
    pub async fn identify(&mut self) -> Result<JedecId, DriverError> {
        self.require_idle()?;

        let mut buf = [0u8; 3];
        self.bus_transceive(opcodes::RDID, &[], &mut buf).await?;

        let id = JedecId::from_bytes(buf);
        log::debug!("JEDEC ID: {}", id);
        Ok(id)
    }

    /// Read status register 1
    #[maybe_async]
    pub async fn read_status(&mut self) -> Result<Status1, DriverError> {
        self.require_idle()?;

        let mut buf = [0u8; 1];
        self.bus_transceive(opcodes::RDSR, &[], &mut buf).await?;
        Ok(Status1::from_bits_retain(buf[0]))
    }

    /// Enter deep power-down
    #[maybe_async]
    pub async fn power_down(&mut self) -> Result<(), DriverError> {
        self.require_idle()?;

        self.bus_write(opcodes::DP, &[], &[]).await?;
        self.state = ChipState::PoweredDown;
        log::debug!("flash powered down");
        Ok(())
    }

    /// Erase the entire chip
    #[maybe_async]
    pub async fn chip_erase(&mut self) -> Result<(), DriverError> {
        self.require_idle()?;

        log::debug!("chip erase");
        self.mutate(opcodes::CE_C7, &[], &[], self.config.chip_erase_timeout_us)
            .await
    }

    /// Erase the 64 KiB block starting at `address`
    ///
    /// `address` must be 64 KiB aligned; otherwise `InvalidAddress` is
    /// returned before any bus traffic.
    #[maybe_async]
    pub async fn block_erase_64k(&mut self, address: FlashAddress) -> Result<(), DriverError> {
        if !address.is_aligned(opcodes::BLOCK_64K) {
            log::warn!("block erase at unaligned address {}", address);
            return Err(DriverError::InvalidAddress);
        }
        self.check_range(address, opcodes::BLOCK_64K)?;
        self.require_idle()?;

        log::debug!("block erase 64K at {}", address);
        self.mutate(
            opcodes::BE_D8,
            &address.to_be_bytes(),
            &[],
            self.config.block_erase_timeout_us,
        )
        .await
    }

    /// Program up to [`PROGRAM_BUFFER_LEN`] bytes starting at `address`
    ///
    /// Any payload of 1..=64 bytes is accepted; an empty or longer one is
    /// `InvalidPayloadLength`. A single report carries at most
    /// [`MAX_PROGRAM_PAYLOAD`](crate::protocol::MAX_PROGRAM_PAYLOAD) bytes,
    /// so a full 64-byte chunk from the host arrives as two calls.
    ///
    /// Data that straddles a 256-byte page boundary is sent as two page
    /// programs, each with its own write enable and busy poll, since the
    /// chip wraps within a page.
    #[maybe_async]
    pub async fn page_program(
        &mut self,
        address: FlashAddress,
        data: &[u8],
    ) -> Result<(), DriverError> {
        if data.is_empty() || data.len() > PROGRAM_BUFFER_LEN {
            log::warn!("page program with {} byte payload", data.len());
            return Err(DriverError::InvalidPayloadLength);
        }
        self.check_range(address, data.len() as u32)?;
        self.require_idle()?;

        let to_page_end = (opcodes::PAGE_SIZE - address.get() % opcodes::PAGE_SIZE) as usize;
        let (head, tail) = data.split_at(data.len().min(to_page_end));

        log::debug!("page program {} bytes at {}", data.len(), address);
        self.mutate(
            opcodes::PP,
            &address.to_be_bytes(),
            head,
            self.config.program_timeout_us,
        )
        .await?;

        if !tail.is_empty() {
            let next = address
                .checked_add(head.len() as u32)
                .ok_or(DriverError::InvalidAddress)?;
            self.mutate(
                opcodes::PP,
                &next.to_be_bytes(),
                tail,
                self.config.program_timeout_us,
            )
            .await?;
        }
        Ok(())
    }

    /// Read `buf.len()` bytes starting at `address`
    ///
    /// A zero-length read succeeds without bus traffic.
    #[maybe_async]
    pub async fn read(
        &mut self,
        address: FlashAddress,
        buf: &mut [u8],
    ) -> Result<(), DriverError> {
        self.check_range(address, buf.len() as u32)?;
        self.require_idle()?;

        if buf.is_empty() {
            return Ok(());
        }

        log::trace!("read {} bytes at {}", buf.len(), address);
        self.bus_transceive(opcodes::READ, &address.to_be_bytes(), buf)
            .await
    }

    // ------------------------------------------------------------------------
    // Sequences
    // ------------------------------------------------------------------------

    /// Reset sequence then JEDEC ID, with the reset line left to the caller
    #[maybe_async]
    async fn wake_and_identify(&mut self) -> Result<JedecId, DriverError> {
        self.reset_sequence().await?;
        self.state = ChipState::Idle;
        self.identify().await
    }

    #[maybe_async]
    async fn reset_sequence(&mut self) -> Result<(), DriverError> {
        let fill = [opcodes::RESET_FILL; opcodes::RESET_PATTERN_LEN - 1];
        self.bus_write(opcodes::RESET_FILL, &fill, &[]).await?;
        self.transport.delay_us(self.config.reset_settle_us).await;

        self.bus_write(opcodes::RDP, &[], &[]).await?;
        self.transport.delay_us(self.config.release_delay_us).await;
        Ok(())
    }

    /// Write enable, mutating command, busy poll
    #[maybe_async]
    async fn mutate(
        &mut self,
        opcode: u8,
        header: &[u8],
        payload: &[u8],
        timeout_us: u32,
    ) -> Result<(), DriverError> {
        self.bus_write(opcodes::WREN, &[], &[]).await?;
        self.state = ChipState::WriteLatched;

        self.bus_write(opcode, header, payload).await?;
        self.state = ChipState::Busy;

        self.wait_ready(timeout_us).await
    }

    /// Poll status register 1 until the busy bit clears
    ///
    /// Polls once immediately, then every `poll_interval_us`, for at most
    /// `timeout_us / poll_interval_us` polls.
    #[maybe_async]
    async fn wait_ready(&mut self, timeout_us: u32) -> Result<(), DriverError> {
        let interval = self.config.poll_interval_us;
        let max_polls = if interval > 0 {
            timeout_us / interval
        } else {
            timeout_us
        }
        .max(1);

        for _ in 0..max_polls {
            let mut status = [0u8; 1];
            self.bus_transceive(opcodes::RDSR, &[], &mut status).await?;
            if !Status1::from_bits_retain(status[0]).is_busy() {
                self.state = ChipState::Idle;
                return Ok(());
            }
            if interval > 0 {
                self.transport.delay_us(interval).await;
            }
        }

        log::error!("flash still busy after {} us", timeout_us);
        self.state = ChipState::Unknown;
        Err(DriverError::BusyTimeout)
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn require_idle(&self) -> Result<(), DriverError> {
        if self.state == ChipState::Idle {
            Ok(())
        } else {
            log::warn!("operation rejected: flash is {}", self.state);
            Err(DriverError::WrongState)
        }
    }

    fn check_range(&self, address: FlashAddress, len: u32) -> Result<(), DriverError> {
        match address.get().checked_add(len) {
            Some(end) if end <= self.config.capacity => Ok(()),
            _ => {
                log::warn!("{} + {} is outside the flash", address, len);
                Err(DriverError::InvalidAddress)
            }
        }
    }

    fn fault(&mut self, e: TransportError) -> DriverError {
        log::error!("transport fault: {}", e);
        self.state = ChipState::Unknown;
        DriverError::Transport(e)
    }

    #[maybe_async]
    async fn bus_write(
        &mut self,
        opcode: u8,
        header: &[u8],
        payload: &[u8],
    ) -> Result<(), DriverError> {
        log::trace!(
            "spi write {:#04x} header={:02x?} payload={}B",
            opcode,
            header,
            payload.len()
        );
        match self.transport.write(opcode, header, payload).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fault(e)),
        }
    }

    #[maybe_async]
    async fn bus_transceive(
        &mut self,
        opcode: u8,
        header: &[u8],
        response: &mut [u8],
    ) -> Result<(), DriverError> {
        log::trace!(
            "spi transceive {:#04x} header={:02x?} read={}B",
            opcode,
            header,
            response.len()
        );
        match self.transport.transceive(opcode, header, response).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fault(e)),
        }
    }
}
