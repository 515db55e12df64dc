//! In-process channel: the firmware's framer on an emulated flash

use iceflash_core::driver::{FlashConfig, FlashDriver};
use iceflash_core::protocol::{CommandFramer, Report};
use iceflash_dummy::DummyFlash;

use crate::channel::ReportChannel;
use crate::error::Result;

/// Report channel that dispatches straight into a [`CommandFramer`]
///
/// Constructed through [`Loopback::boot`], the emulated chip goes through
/// the same power-on sequence as on the real board, so the first thing a
/// client has to send is a `Reset`.
pub struct Loopback {
    framer: CommandFramer<DummyFlash>,
    exchanges: usize,
}

impl Loopback {
    /// Wrap `flash` and run the power-on sequence
    pub fn boot(flash: DummyFlash) -> Self {
        let config = FlashConfig::W25Q16.with_capacity(flash.config().size as u32);
        let mut driver = FlashDriver::new(flash, config);
        match driver.boot() {
            Ok(id) => log::debug!("loopback flash {} parked in power-down", id),
            Err(e) => log::warn!("loopback boot failed: {}", e),
        }
        Self {
            framer: CommandFramer::new(driver),
            exchanges: 0,
        }
    }

    /// Boot a blank W25Q16
    pub fn new_default() -> Self {
        Self::boot(DummyFlash::new_default())
    }

    /// The emulated flash
    pub fn flash(&self) -> &DummyFlash {
        self.framer.driver().transport()
    }

    /// Mutable access to the emulated flash, e.g. for fault injection
    pub fn flash_mut(&mut self) -> &mut DummyFlash {
        self.framer.driver_mut().transport_mut()
    }

    /// Number of reports exchanged so far
    pub fn exchanges(&self) -> usize {
        self.exchanges
    }
}

impl ReportChannel for Loopback {
    fn exchange(&mut self, request: &Report) -> Result<Report> {
        self.exchanges += 1;
        Ok(self.framer.dispatch(request))
    }
}
