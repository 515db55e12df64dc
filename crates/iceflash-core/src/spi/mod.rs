//! SPI NOR command set
//!
//! Opcodes, the 24-bit flash address type and the status register layout
//! shared by the driver and the emulator.

mod address;
pub mod opcodes;
mod status;

pub use address::FlashAddress;
pub use opcodes::*;
pub use status::Status1;
