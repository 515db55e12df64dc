//! Error types for the host side

use thiserror::Error;

/// Errors talking to the programmer
#[derive(Debug, Error)]
pub enum HidError {
    /// No matching USB device
    #[error("iceflash device not found (VID:{vid:04x} PID:{pid:04x})")]
    DeviceNotFound { vid: u16, pid: u16 },

    /// Failed to open the USB device
    #[error("Failed to open device: {0}")]
    OpenFailed(String),

    /// Failed to claim the HID interface
    #[error("Failed to claim interface: {0}")]
    ClaimFailed(String),

    /// The device has no HID interface with interrupt IN and OUT endpoints
    #[error("No HID interface with interrupt IN/OUT endpoints")]
    NoHidInterface,

    /// USB transfer failed
    #[error("USB transfer failed: {0}")]
    TransferFailed(String),

    /// The device sent fewer bytes than a full report
    #[error("Short response report: {0} bytes")]
    ShortReport(usize),

    /// The device rejected the operation
    #[error("Device reported: {0}")]
    Device(#[from] iceflash_core::Error),

    /// The device sent a status code this host does not know
    #[error("Unknown status code {0:#04x}")]
    UnknownStatus(u8),

    /// Address or length outside the 24-bit address space
    #[error("Address {0:#x} is outside the 24-bit address space")]
    AddressOutOfRange(u64),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Read-back did not match the expected data
    #[error("Verify failed at {address:#08x}: expected {expected:#04x}, found {found:#04x}")]
    VerifyFailed { address: u32, expected: u8, found: u8 },
}

impl HidError {
    /// The device-side error, if the device answered with one
    pub fn device_error(&self) -> Option<iceflash_core::Error> {
        match self {
            HidError::Device(e) => Some(*e),
            _ => None,
        }
    }
}

/// Result type for host operations
pub type Result<T> = std::result::Result<T, HidError>;
