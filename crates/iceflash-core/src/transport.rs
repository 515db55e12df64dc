//! Flash transport and reset line traits
//!
//! These traits use `maybe_async` to support both sync and async modes.
//! - By default, traits are async (the embassy firmware)
//! - With the `is_sync` feature, traits become synchronous (host, tests)

use crate::error::TransportError;
use maybe_async::maybe_async;

/// A single SPI exchange with the flash chip (sync or async depending on
/// the `is_sync` feature)
///
/// Each call is one chip-select cycle: CS is asserted before the opcode and
/// released after the last byte. Implementations never retry; a bus error is
/// always returned as [`TransportError::BusFault`].
///
/// ## Example: embassy implementation
///
/// ```ignore
/// impl FlashTransport for SpiFlashBus {
///     async fn write(&mut self, opcode: u8, header: &[u8], payload: &[u8])
///         -> Result<(), TransportError>
///     {
///         self.cs.set_low();
///         let r = self.send(opcode, header, payload).await;
///         self.cs.set_high();
///         r
///     }
///     // ...
/// }
/// ```
#[maybe_async(AFIT)]
pub trait FlashTransport {
    /// Send `opcode`, then `header` (address bytes), then `payload` in one
    /// unbroken transaction
    async fn write(&mut self, opcode: u8, header: &[u8], payload: &[u8])
        -> Result<(), TransportError>;

    /// Send `opcode` and `header`, then clock in `response.len()` bytes
    ///
    /// Bytes shifted in while the opcode and header are being sent are
    /// discarded; `response` only receives the read phase.
    async fn transceive(
        &mut self,
        opcode: u8,
        header: &[u8],
        response: &mut [u8],
    ) -> Result<(), TransportError>;

    /// Delay for the specified number of microseconds
    ///
    /// Only called by the driver where an operation mandates a wait.
    async fn delay_us(&mut self, us: u32);
}

/// The configuration-reset line of the device that shares the flash
///
/// The driver asserts it for the whole `Reset` sequence so the attached
/// FPGA stays off the SPI bus, and releases it afterwards.
pub trait ResetLine {
    /// Drive the line to its active (reset) level
    fn assert_reset(&mut self);

    /// Drive the line to its inactive level
    fn release_reset(&mut self);
}

/// Reset line for boards where the flash has no attached reset target
#[derive(Debug, Default, Clone, Copy)]
pub struct NoResetLine;

impl ResetLine for NoResetLine {
    fn assert_reset(&mut self) {}

    fn release_reset(&mut self) {}
}
