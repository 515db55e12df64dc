//! iCE40 configuration flash programmer for Raspberry Pi Pico
//!
//! The Pico enumerates as a vendor-defined HID device. Every 64-byte OUT
//! report carries one flash operation; the firmware runs it to completion
//! against the SPI NOR chip and answers with one 64-byte IN report. The
//! report layout lives in `iceflash_core::protocol`.
//!
//! ## Pin Assignments
//!
//! | Pin   | Function            |
//! |-------|---------------------|
//! | GP16  | MISO (SPI0 RX)      |
//! | GP17  | CS (flash)          |
//! | GP18  | SCK                 |
//! | GP19  | MOSI (SPI0 TX)      |
//! | GP20  | CRESET_B (iCE40)    |

#![no_std]
#![no_main]

mod bus;

use defmt::{debug, info, warn};
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::USB;
use embassy_rp::spi::{self, Spi};
use embassy_rp::usb::{Driver, InterruptHandler as UsbInterruptHandler};
use embassy_usb::class::hid::{self, HidBootProtocol, HidReaderWriter, HidSubclass};
use embassy_usb::{Builder, UsbDevice};
use iceflash_core::driver::{FlashConfig, FlashDriver};
use iceflash_core::protocol::{
    CommandFramer, Report, HID_REPORT_DESCRIPTOR, REPORT_LEN, USB_PID, USB_VID,
};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use crate::bus::{CresetLine, SpiFlashBus};

bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => UsbInterruptHandler<USB>;
});

type AppDriver = Driver<'static, USB>;
type Framer = CommandFramer<SpiFlashBus, CresetLine>;

/// SPI clock for the flash
const SPI_FREQUENCY_HZ: u32 = 8_000_000;

static CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static MSOS_DESC: StaticCell<[u8; 128]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();
static HID_STATE: StaticCell<hid::State<'static>> = StaticCell::new();

fn usb_config() -> embassy_usb::Config<'static> {
    let mut config = embassy_usb::Config::new(USB_VID, USB_PID);
    config.manufacturer = Some("iceflash");
    config.product = Some("pico-hid-flasher");
    config.serial_number = Some("00000001");
    config.max_power = 100;
    config.max_packet_size_0 = 64;
    config
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("pico-hid-flasher starting...");

    let p = embassy_rp::init(Default::default());

    let mut spi_config = spi::Config::default();
    spi_config.frequency = SPI_FREQUENCY_HZ;
    spi_config.phase = spi::Phase::CaptureOnFirstTransition;
    spi_config.polarity = spi::Polarity::IdleLow;

    let spi = Spi::new(
        p.SPI0,
        p.PIN_18, // SCK
        p.PIN_19, // MOSI
        p.PIN_16, // MISO
        p.DMA_CH0,
        p.DMA_CH1,
        spi_config,
    );
    let bus = SpiFlashBus::new(spi, Output::new(p.PIN_17, Level::High));
    let creset = CresetLine::new(Output::new(p.PIN_20, Level::High));

    // USB comes up before the flash so the host sees the device even if
    // the chip is missing
    let driver = Driver::new(p.USB, Irqs);
    let mut builder = Builder::new(
        driver,
        usb_config(),
        CONFIG_DESC.init([0; 256]),
        BOS_DESC.init([0; 256]),
        MSOS_DESC.init([0; 128]),
        CONTROL_BUF.init([0; 64]),
    );

    let hid_config = hid::Config {
        report_descriptor: HID_REPORT_DESCRIPTOR,
        request_handler: None,
        poll_ms: 1,
        max_packet_size: REPORT_LEN as u16,
        hid_subclass: HidSubclass::No,
        hid_boot_protocol: HidBootProtocol::None,
    };
    let hid = HidReaderWriter::<_, REPORT_LEN, REPORT_LEN>::new(
        &mut builder,
        HID_STATE.init(hid::State::new()),
        hid_config,
    );

    spawner.must_spawn(usb_task(builder.build()));

    let framer = CommandFramer::new(boot_flash(bus, creset).await);
    let (reader, writer) = hid.split();
    spawner.must_spawn(dispatch_task(framer, reader, writer));

    info!("pico-hid-flasher ready");
}

/// Reset the flash, log its ID and leave it in deep power-down
///
/// A chip the table knows gets its real capacity; anything else is
/// treated as a W25Q16.
async fn boot_flash(
    bus: SpiFlashBus,
    creset: CresetLine,
) -> FlashDriver<SpiFlashBus, CresetLine> {
    let mut driver = FlashDriver::with_reset_line(bus, creset, FlashConfig::W25Q16);

    let id = match driver.boot().await {
        Ok(id) => id,
        Err(e) => {
            warn!("flash boot failed: {}", defmt::Display2Format(&e));
            return driver;
        }
    };
    info!("flash JEDEC ID {:02x}", id.to_bytes());

    match id.chip() {
        Some(chip) if chip.total_size != driver.config().capacity => {
            info!("{} {} ({} bytes)", chip.vendor, chip.name, chip.total_size);
            let (bus, creset) = driver.into_parts();
            FlashDriver::with_reset_line(
                bus,
                creset,
                FlashConfig::W25Q16.with_capacity(chip.total_size),
            )
        }
        Some(chip) => {
            info!("{} {}", chip.vendor, chip.name);
            driver
        }
        None => {
            warn!("unknown flash, assuming {} bytes", driver.config().capacity);
            driver
        }
    }
}

/// USB device task
#[embassy_executor::task]
async fn usb_task(mut usb: UsbDevice<'static, AppDriver>) {
    usb.run().await;
}

/// One OUT report in, one operation, one IN report out
#[embassy_executor::task]
async fn dispatch_task(
    mut framer: Framer,
    mut reader: hid::HidReader<'static, AppDriver, REPORT_LEN>,
    mut writer: hid::HidWriter<'static, AppDriver, REPORT_LEN>,
) {
    let mut request: Report = [0; REPORT_LEN];
    loop {
        request.fill(0);
        match reader.read(&mut request).await {
            Ok(n) => debug!("report out ({}): {:02x}", n, request),
            Err(e) => {
                warn!("HID read failed: {}", e);
                reader.ready().await;
                continue;
            }
        }

        let response = framer.dispatch(&request).await;

        if let Err(e) = writer.write(&response).await {
            warn!("HID write failed: {}", e);
        }
    }
}
