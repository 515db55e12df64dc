//! Error types for iceflash-core
//!
//! Three layers of errors mirror the three layers of the crate. Every
//! variant has a fixed one-byte status code that travels back to the host in
//! byte 0 of the response report; code 0 is reserved for success.

use core::fmt;

/// Bus-level fault reported by the SPI controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The SPI controller reported an error during the exchange
    BusFault,
}

/// Errors raised by the flash driver state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// A transport fault aborted the operation; the chip state is unknown
    Transport(TransportError),
    /// Address is misaligned for the operation or outside the flash
    InvalidAddress,
    /// Program payload is empty or larger than the program buffer
    InvalidPayloadLength,
    /// The busy bit did not clear within the operation's timeout
    BusyTimeout,
    /// Operation is not valid in the current chip state (powered down,
    /// or awaiting a reset after a fault)
    WrongState,
}

/// Errors raised while decoding an inbound report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingError {
    /// Byte 0 of the report is not a known operation tag
    UnknownOperation,
    /// Operation fields are inconsistent (alignment, length field)
    MalformedReport,
}

/// Any error that can be reported in a response status byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Flash driver (or transport) error
    Driver(DriverError),
    /// Report framing error
    Framing(FramingError),
}

impl Error {
    /// Status code carried in byte 0 of a response report
    pub const fn status_code(&self) -> u8 {
        match self {
            Self::Driver(DriverError::Transport(TransportError::BusFault)) => 0x01,
            Self::Driver(DriverError::InvalidAddress) => 0x10,
            Self::Driver(DriverError::InvalidPayloadLength) => 0x11,
            Self::Driver(DriverError::BusyTimeout) => 0x12,
            Self::Driver(DriverError::WrongState) => 0x13,
            Self::Framing(FramingError::UnknownOperation) => 0x20,
            Self::Framing(FramingError::MalformedReport) => 0x21,
        }
    }

    /// Map a nonzero status code back to the error it encodes
    ///
    /// Returns `None` for 0 (success) and for codes this crate never emits.
    pub const fn from_status_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::Driver(DriverError::Transport(TransportError::BusFault))),
            0x10 => Some(Self::Driver(DriverError::InvalidAddress)),
            0x11 => Some(Self::Driver(DriverError::InvalidPayloadLength)),
            0x12 => Some(Self::Driver(DriverError::BusyTimeout)),
            0x13 => Some(Self::Driver(DriverError::WrongState)),
            0x20 => Some(Self::Framing(FramingError::UnknownOperation)),
            0x21 => Some(Self::Framing(FramingError::MalformedReport)),
            _ => None,
        }
    }
}

impl From<TransportError> for DriverError {
    fn from(e: TransportError) -> Self {
        DriverError::Transport(e)
    }
}

impl From<DriverError> for Error {
    fn from(e: DriverError) -> Self {
        Error::Driver(e)
    }
}

impl From<FramingError> for Error {
    fn from(e: FramingError) -> Self {
        Error::Framing(e)
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusFault => write!(f, "SPI bus fault"),
        }
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "{}", e),
            Self::InvalidAddress => write!(f, "invalid flash address"),
            Self::InvalidPayloadLength => write!(f, "invalid program payload length"),
            Self::BusyTimeout => write!(f, "flash stayed busy past the timeout"),
            Self::WrongState => write!(f, "operation not valid in current flash state"),
        }
    }
}

impl fmt::Display for FramingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOperation => write!(f, "unknown operation tag"),
            Self::MalformedReport => write!(f, "malformed report"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Driver(e) => write!(f, "{}", e),
            Self::Framing(e) => write!(f, "{}", e),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for TransportError {}

#[cfg(feature = "std")]
impl std::error::Error for DriverError {}

#[cfg(feature = "std")]
impl std::error::Error for FramingError {}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the top-level Error type
pub type Result<T> = core::result::Result<T, Error>;
