//! HID report protocol
//!
//! This module defines the wire contract shared by the firmware and the
//! host: the 64-byte report, the operation tags, the status byte, and the
//! [`CommandFramer`] that turns one inbound report into one flash operation
//! and one outbound report.
//!
//! ## Request layout
//!
//! | Byte | Content |
//! |------|---------|
//! | 0    | operation tag ([`OperationTag`]) |
//! | 1-3  | address, big-endian (erase/program/read) |
//! | 4    | length (program/read) |
//! | 5..  | program data |
//!
//! ## Response layout
//!
//! | Byte | Content |
//! |------|---------|
//! | 0    | status (0 = success, else [`Error::status_code`](crate::Error::status_code)) |
//! | 1..  | JEDEC id / status register / read data, zero-filled otherwise |

mod framer;
mod operation;

pub use framer::CommandFramer;
pub use operation::{FlashOperation, OperationTag, ProgramPayload};

/// Size of every report in both directions
pub const REPORT_LEN: usize = 64;

/// A HID report, OUT (host to device) or IN (device to host)
pub type Report = [u8; REPORT_LEN];

/// Status byte for a successful operation
pub const STATUS_OK: u8 = 0x00;

/// Offset of the length byte in program and read requests
pub const LENGTH_OFFSET: usize = 4;

/// Offset of the data in a program request
pub const PROGRAM_DATA_OFFSET: usize = 5;

/// Most data bytes one `PageProgram` report can carry
pub const MAX_PROGRAM_PAYLOAD: usize = REPORT_LEN - PROGRAM_DATA_OFFSET;

/// Most data bytes one `Read` response can carry
pub const MAX_READ_PAYLOAD: usize = REPORT_LEN - 1;

/// USB VID (shared V-USB VID from obdev)
pub const USB_VID: u16 = 0x16c0;

/// USB PID (shared V-USB PID for vendor-defined HID devices)
pub const USB_PID: u16 = 0x05df;

/// HID report descriptor: vendor page 0xFF00, one 64-byte OUT report and
/// one 64-byte IN report, no report IDs
pub const HID_REPORT_DESCRIPTOR: &[u8] = &[
    0x06, 0x00, 0xFF, // USAGE_PAGE (Vendor Defined 0xFF00)
    0x09, 0x01, //       USAGE (Vendor Usage 1)
    0xA1, 0x01, //       COLLECTION (Application)
    // OUT report: host -> device
    0x09, 0x02, //       USAGE (Vendor Usage 2)
    0x15, 0x00, //       LOGICAL_MINIMUM (0)
    0x26, 0xFF, 0x00, // LOGICAL_MAXIMUM (255)
    0x75, 0x08, //       REPORT_SIZE (8 bits)
    0x95, REPORT_LEN as u8, // REPORT_COUNT (64 bytes)
    0x91, 0x02, //       OUTPUT (Data,Var,Abs)
    // IN report: device -> host
    0x09, 0x03, //       USAGE (Vendor Usage 3)
    0x15, 0x00, //       LOGICAL_MINIMUM (0)
    0x26, 0xFF, 0x00, // LOGICAL_MAXIMUM (255)
    0x75, 0x08, //       REPORT_SIZE (8 bits)
    0x95, REPORT_LEN as u8, // REPORT_COUNT (64 bytes)
    0x81, 0x02, //       INPUT (Data,Var,Abs)
    0xC0, //             END_COLLECTION
];

/// Split a response report into its status byte and payload
pub fn split_response(report: &Report) -> (u8, &[u8]) {
    (report[0], &report[1..])
}
