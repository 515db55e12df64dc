//! SPI0 flash transport and the CRESET_B line

use defmt::trace;
use embassy_rp::gpio::Output;
use embassy_rp::peripherals::SPI0;
use embassy_rp::spi::{Async, Spi};
use embassy_time::Timer;
use iceflash_core::transport::{FlashTransport, ResetLine};
use iceflash_core::TransportError;

/// The flash chip on SPI0 with a software-driven chip select
pub struct SpiFlashBus {
    spi: Spi<'static, SPI0, Async>,
    cs: Output<'static>,
}

impl SpiFlashBus {
    /// Take ownership of the bus and its chip select (idle high)
    pub fn new(spi: Spi<'static, SPI0, Async>, mut cs: Output<'static>) -> Self {
        cs.set_high();
        Self { spi, cs }
    }

    async fn spi_write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if !data.is_empty() {
            self.spi
                .write(data)
                .await
                .map_err(|_| TransportError::BusFault)?;
        }
        Ok(())
    }

    async fn spi_read(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        if !buf.is_empty() {
            self.spi
                .read(buf)
                .await
                .map_err(|_| TransportError::BusFault)?;
        }
        Ok(())
    }

    async fn send_command(&mut self, opcode: u8, header: &[u8]) -> Result<(), TransportError> {
        self.spi_write(&[opcode]).await?;
        self.spi_write(header).await
    }
}

impl FlashTransport for SpiFlashBus {
    async fn write(
        &mut self,
        opcode: u8,
        header: &[u8],
        payload: &[u8],
    ) -> Result<(), TransportError> {
        trace!("spi write {=u8:#04x} +{} +{}", opcode, header.len(), payload.len());

        self.cs.set_low();
        let result = match self.send_command(opcode, header).await {
            Ok(()) => self.spi_write(payload).await,
            Err(e) => Err(e),
        };
        self.cs.set_high();
        result
    }

    async fn transceive(
        &mut self,
        opcode: u8,
        header: &[u8],
        response: &mut [u8],
    ) -> Result<(), TransportError> {
        trace!("spi transceive {=u8:#04x} +{} -> {}", opcode, header.len(), response.len());

        self.cs.set_low();
        let result = match self.send_command(opcode, header).await {
            Ok(()) => self.spi_read(response).await,
            Err(e) => Err(e),
        };
        self.cs.set_high();
        result
    }

    async fn delay_us(&mut self, us: u32) {
        Timer::after_micros(us as u64).await;
    }
}

/// CRESET_B of the iCE40, active low
///
/// Holding it low keeps the FPGA from driving the shared SPI lines while
/// the programmer talks to the flash.
pub struct CresetLine {
    pin: Output<'static>,
}

impl CresetLine {
    /// Wrap the pin, leaving the FPGA running
    pub fn new(mut pin: Output<'static>) -> Self {
        pin.set_high();
        Self { pin }
    }
}

impl ResetLine for CresetLine {
    fn assert_reset(&mut self) {
        self.pin.set_low();
    }

    fn release_reset(&mut self) {
        self.pin.set_high();
    }
}
