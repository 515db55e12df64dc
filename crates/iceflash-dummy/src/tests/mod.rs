//! Behaviour tests for the driver and framer against the emulator

mod driver;
mod framer;

use iceflash_core::driver::{FlashConfig, FlashDriver};

use crate::DummyFlash;

/// A driver that has been reset and has an empty transaction log
fn ready_driver() -> FlashDriver<DummyFlash> {
    ready_driver_with(DummyFlash::new_default())
}

fn ready_driver_with(flash: DummyFlash) -> FlashDriver<DummyFlash> {
    let mut driver = FlashDriver::new(flash, FlashConfig::W25Q16);
    driver.reset().unwrap();
    driver.transport_mut().clear_log();
    driver
}

fn addr(a: u32) -> iceflash_core::spi::FlashAddress {
    iceflash_core::spi::FlashAddress::new(a).unwrap()
}
