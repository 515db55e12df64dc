//! iceflash-core - SPI NOR driver and HID command framing
//!
//! This crate contains everything the iceflash programmer needs to turn
//! fixed-size 64-byte HID reports into SPI NOR flash operations. It is
//! `no_std` so the same code runs inside the RP2040 firmware and inside the
//! host tool's in-process emulator.
//!
//! The layers, leaf first:
//!
//! - [`transport`] - one SPI exchange at a time (`FlashTransport`)
//! - [`driver`] - the flash state machine (`FlashDriver`)
//! - [`protocol`] - report codec and dispatcher (`CommandFramer`)
//!
//! # Features
//!
//! - `std` - `std::error::Error` impls for the error types
//! - `is_sync` - Compile the `maybe_async` code as blocking code
//!
//! # Example
//!
//! ```ignore
//! use iceflash_core::driver::{FlashConfig, FlashDriver};
//! use iceflash_core::protocol::{CommandFramer, Report};
//!
//! fn serve<T: FlashTransport>(transport: T, request: &Report) -> Report {
//!     let driver = FlashDriver::new(transport, FlashConfig::W25Q16);
//!     let mut framer = CommandFramer::new(driver);
//!     framer.dispatch(request)
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
// Allow async fn in traits - we use maybe-async for dual sync/async support
#![allow(async_fn_in_trait)]

#[cfg(feature = "std")]
extern crate std;

pub mod chip;
pub mod driver;
pub mod error;
pub mod protocol;
pub mod spi;
pub mod transport;

pub use error::{DriverError, Error, FramingError, Result, TransportError};
