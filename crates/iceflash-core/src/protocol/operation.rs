//! Typed flash operations and their report encoding

use heapless::Vec;

use super::{
    Report, LENGTH_OFFSET, MAX_PROGRAM_PAYLOAD, MAX_READ_PAYLOAD, PROGRAM_DATA_OFFSET, REPORT_LEN,
};
use crate::error::FramingError;
use crate::spi::{opcodes, FlashAddress};

/// Data carried by one `PageProgram` report
pub type ProgramPayload = Vec<u8, MAX_PROGRAM_PAYLOAD>;

/// Operation tag in byte 0 of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OperationTag {
    /// Read JEDEC id
    Identify = 0x01,
    /// Reset and release from power-down
    Reset = 0x02,
    /// Enter deep power-down
    PowerDown = 0x03,
    /// Read status register 1
    ReadStatus = 0x04,
    /// Erase the whole chip
    ChipErase = 0x05,
    /// Erase one 64 KiB block
    BlockErase64K = 0x06,
    /// Program bytes
    PageProgram = 0x07,
    /// Read bytes
    Read = 0x08,
}

impl OperationTag {
    /// Decode a tag byte
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::Identify),
            0x02 => Some(Self::Reset),
            0x03 => Some(Self::PowerDown),
            0x04 => Some(Self::ReadStatus),
            0x05 => Some(Self::ChipErase),
            0x06 => Some(Self::BlockErase64K),
            0x07 => Some(Self::PageProgram),
            0x08 => Some(Self::Read),
            _ => None,
        }
    }
}

/// One flash operation, decoded from exactly one request report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlashOperation {
    /// Read the JEDEC id (3 bytes)
    Identify,
    /// Reset the chip; valid from any state
    Reset,
    /// Enter deep power-down
    PowerDown,
    /// Read status register 1 (1 byte)
    ReadStatus,
    /// Erase the whole chip
    ChipErase,
    /// Erase the 64 KiB block at `address` (must be aligned)
    BlockErase64K {
        /// Block start
        address: FlashAddress,
    },
    /// Program `data` at `address`
    PageProgram {
        /// First byte to program
        address: FlashAddress,
        /// 1..=[`MAX_PROGRAM_PAYLOAD`] bytes
        data: ProgramPayload,
    },
    /// Read `length` bytes at `address`
    Read {
        /// First byte to read
        address: FlashAddress,
        /// 0..=[`MAX_READ_PAYLOAD`]
        length: u8,
    },
}

impl FlashOperation {
    /// The tag this operation is sent with
    pub fn tag(&self) -> OperationTag {
        match self {
            Self::Identify => OperationTag::Identify,
            Self::Reset => OperationTag::Reset,
            Self::PowerDown => OperationTag::PowerDown,
            Self::ReadStatus => OperationTag::ReadStatus,
            Self::ChipErase => OperationTag::ChipErase,
            Self::BlockErase64K { .. } => OperationTag::BlockErase64K,
            Self::PageProgram { .. } => OperationTag::PageProgram,
            Self::Read { .. } => OperationTag::Read,
        }
    }

    /// Whether this operation changes flash contents
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Self::ChipErase | Self::BlockErase64K { .. } | Self::PageProgram { .. }
        )
    }

    /// Build a program operation, failing if `data` does not fit one report
    pub fn page_program(address: FlashAddress, data: &[u8]) -> Option<Self> {
        if data.is_empty() {
            return None;
        }
        let data = ProgramPayload::from_slice(data).ok()?;
        Some(Self::PageProgram { address, data })
    }

    /// Build a read operation, failing if `length` does not fit one report
    pub fn read(address: FlashAddress, length: usize) -> Option<Self> {
        if length > MAX_READ_PAYLOAD {
            return None;
        }
        Some(Self::Read {
            address,
            length: length as u8,
        })
    }

    /// Decode a request report
    ///
    /// Alignment and length checks happen here, so a malformed request never
    /// reaches the driver.
    pub fn decode(report: &Report) -> Result<Self, FramingError> {
        let tag = OperationTag::from_byte(report[0]).ok_or(FramingError::UnknownOperation)?;
        let address = FlashAddress::from_be_bytes([report[1], report[2], report[3]]);
        let length = report[LENGTH_OFFSET] as usize;

        let op = match tag {
            OperationTag::Identify => Self::Identify,
            OperationTag::Reset => Self::Reset,
            OperationTag::PowerDown => Self::PowerDown,
            OperationTag::ReadStatus => Self::ReadStatus,
            OperationTag::ChipErase => Self::ChipErase,
            OperationTag::BlockErase64K => {
                if !address.is_aligned(opcodes::BLOCK_64K) {
                    return Err(FramingError::MalformedReport);
                }
                Self::BlockErase64K { address }
            }
            OperationTag::PageProgram => {
                if length == 0 || length > MAX_PROGRAM_PAYLOAD {
                    return Err(FramingError::MalformedReport);
                }
                let data = &report[PROGRAM_DATA_OFFSET..PROGRAM_DATA_OFFSET + length];
                Self::page_program(address, data).ok_or(FramingError::MalformedReport)?
            }
            OperationTag::Read => {
                Self::read(address, length).ok_or(FramingError::MalformedReport)?
            }
        };
        Ok(op)
    }

    /// Encode as a request report
    pub fn encode(&self) -> Report {
        let mut report = [0u8; REPORT_LEN];
        report[0] = self.tag() as u8;

        match self {
            Self::BlockErase64K { address } => {
                report[1..4].copy_from_slice(&address.to_be_bytes());
            }
            Self::PageProgram { address, data } => {
                report[1..4].copy_from_slice(&address.to_be_bytes());
                report[LENGTH_OFFSET] = data.len() as u8;
                report[PROGRAM_DATA_OFFSET..PROGRAM_DATA_OFFSET + data.len()]
                    .copy_from_slice(data);
            }
            Self::Read { address, length } => {
                report[1..4].copy_from_slice(&address.to_be_bytes());
                report[LENGTH_OFFSET] = *length;
            }
            _ => {}
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(a: u32) -> FlashAddress {
        FlashAddress::new(a).unwrap()
    }

    #[test]
    fn test_decode_block_erase() {
        let mut report = [0u8; REPORT_LEN];
        report[..4].copy_from_slice(&[0x06, 0x01, 0x00, 0x00]);
        assert_eq!(
            FlashOperation::decode(&report),
            Ok(FlashOperation::BlockErase64K {
                address: addr(0x01_0000)
            })
        );
    }

    #[test]
    fn test_decode_rejects_unaligned_erase() {
        let mut report = [0u8; REPORT_LEN];
        report[..4].copy_from_slice(&[0x06, 0x01, 0x00, 0x40]);
        assert_eq!(
            FlashOperation::decode(&report),
            Err(FramingError::MalformedReport)
        );
    }

    #[test]
    fn test_decode_unknown_tag() {
        let mut report = [0u8; REPORT_LEN];
        report[0] = 0xFF;
        assert_eq!(
            FlashOperation::decode(&report),
            Err(FramingError::UnknownOperation)
        );
        report[0] = 0x00;
        assert_eq!(
            FlashOperation::decode(&report),
            Err(FramingError::UnknownOperation)
        );
    }

    #[test]
    fn test_decode_program_lengths() {
        let mut report = [0u8; REPORT_LEN];
        report[0] = OperationTag::PageProgram as u8;

        report[LENGTH_OFFSET] = 0;
        assert_eq!(
            FlashOperation::decode(&report),
            Err(FramingError::MalformedReport)
        );

        report[LENGTH_OFFSET] = (MAX_PROGRAM_PAYLOAD + 1) as u8;
        assert_eq!(
            FlashOperation::decode(&report),
            Err(FramingError::MalformedReport)
        );

        report[LENGTH_OFFSET] = 3;
        report[PROGRAM_DATA_OFFSET..PROGRAM_DATA_OFFSET + 4].copy_from_slice(&[1, 2, 3, 4]);
        match FlashOperation::decode(&report).unwrap() {
            FlashOperation::PageProgram { data, .. } => assert_eq!(&data[..], &[1, 2, 3]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_read_length_limit() {
        let mut report = [0u8; REPORT_LEN];
        report[0] = OperationTag::Read as u8;
        report[LENGTH_OFFSET] = MAX_READ_PAYLOAD as u8;
        assert!(FlashOperation::decode(&report).is_ok());
        report[LENGTH_OFFSET] = (MAX_READ_PAYLOAD + 1) as u8;
        assert_eq!(
            FlashOperation::decode(&report),
            Err(FramingError::MalformedReport)
        );
    }

    #[test]
    fn test_encode_matches_layout() {
        let op = FlashOperation::page_program(addr(0x12_3456), &[0xAA; 4]).unwrap();
        let report = op.encode();
        assert_eq!(&report[..9], &[0x07, 0x12, 0x34, 0x56, 4, 0xAA, 0xAA, 0xAA, 0xAA]);
        assert!(report[9..].iter().all(|&b| b == 0));
        assert_eq!(FlashOperation::decode(&report), Ok(op));

        let read = FlashOperation::read(addr(0x00_0040), 63).unwrap();
        assert_eq!(&read.encode()[..5], &[0x08, 0x00, 0x00, 0x40, 63]);
        assert!(FlashOperation::read(addr(0), 64).is_none());
    }

    #[test]
    fn test_mutating_classification() {
        assert!(FlashOperation::ChipErase.is_mutating());
        assert!(!FlashOperation::Identify.is_mutating());
        assert!(!FlashOperation::read(addr(0), 1).unwrap().is_mutating());
    }
}
