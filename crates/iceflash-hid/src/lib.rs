//! iceflash-hid - Host side of the iceflash HID programmer
//!
//! The device speaks in fixed 64-byte reports: one request report carries
//! one flash operation and is answered by exactly one response report. This
//! crate provides:
//!
//! - [`ReportChannel`] - send one request, receive its response
//! - [`HidDevice`] - the real programmer, over USB HID interrupt endpoints
//!   (`hid` feature)
//! - [`Loopback`] - the firmware's framer and driver running in-process on
//!   an emulated W25Q16 (`dummy` feature)
//! - [`FlasherClient`] - splits reads, writes and erases of any size into
//!   single-report operations
//!
//! # Example
//!
//! ```no_run
//! use iceflash_hid::{FlasherClient, HidConfig, HidDevice};
//!
//! let device = HidDevice::open(&HidConfig::default())?;
//! let mut client = FlasherClient::new(device);
//!
//! client.reset()?;
//! let id = client.identify()?;
//! println!("JEDEC ID: {}", id);
//!
//! let mut buf = vec![0u8; 4096];
//! client.read(0, &mut buf)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
mod channel;
#[cfg(feature = "std")]
mod client;
#[cfg(feature = "hid")]
mod device;
#[cfg(feature = "std")]
mod error;
#[cfg(all(feature = "std", any(feature = "dummy", test)))]
mod loopback;

#[cfg(feature = "std")]
pub use channel::ReportChannel;
#[cfg(feature = "std")]
pub use client::FlasherClient;
#[cfg(feature = "hid")]
pub use device::{parse_options, HidConfig, HidDevice, HidDeviceInfo};
#[cfg(feature = "std")]
pub use error::{HidError, Result};
#[cfg(all(feature = "std", any(feature = "dummy", test)))]
pub use loopback::Loopback;
