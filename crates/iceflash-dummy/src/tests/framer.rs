use iceflash_core::driver::{ChipState, FlashConfig, FlashDriver};
use iceflash_core::protocol::{
    CommandFramer, FlashOperation, OperationTag, Report, MAX_PROGRAM_PAYLOAD, MAX_READ_PAYLOAD,
    REPORT_LEN, STATUS_OK,
};
use iceflash_core::spi::opcodes;
use iceflash_core::Error;

use super::{addr, ready_driver, ready_driver_with};
use crate::{DummyConfig, DummyFlash};

fn request(bytes: &[u8]) -> Report {
    let mut report = [0u8; REPORT_LEN];
    report[..bytes.len()].copy_from_slice(bytes);
    report
}

fn ready_framer() -> CommandFramer<DummyFlash> {
    CommandFramer::new(ready_driver())
}

fn emulator(framer: &CommandFramer<DummyFlash>) -> &DummyFlash {
    framer.driver().transport()
}

#[test]
fn test_reset_then_identify() {
    let mut framer = CommandFramer::new(FlashDriver::new(
        DummyFlash::new_default(),
        FlashConfig::W25Q16,
    ));

    let response = framer.dispatch(&request(&[OperationTag::Identify as u8]));
    assert_eq!(response[0], Error::from(iceflash_core::DriverError::WrongState).status_code());
    assert!(response[1..].iter().all(|&b| b == 0));

    let response = framer.dispatch(&request(&[OperationTag::Reset as u8]));
    assert_eq!(response, [0u8; REPORT_LEN]);

    let response = framer.dispatch(&request(&[OperationTag::Identify as u8]));
    assert_eq!(&response[..4], &[STATUS_OK, 0xEF, 0x40, 0x15]);
    assert!(response[4..].iter().all(|&b| b == 0));
}

#[test]
fn test_block_erase_report() {
    let data = vec![0u8; 0x20000];
    let flash = DummyFlash::with_data(DummyConfig::default(), &data);
    let mut framer = CommandFramer::new(ready_driver_with(flash));

    let response = framer.dispatch(&request(&[0x06, 0x01, 0x00, 0x00]));
    assert_eq!(response, [0u8; REPORT_LEN]);

    let flash = emulator(&framer);
    assert_eq!(flash.transactions()[1].opcode, opcodes::BE_D8);
    assert_eq!(flash.transactions()[1].header, vec![0x01, 0x00, 0x00]);
    assert!(flash.data()[0x10000..0x20000].iter().all(|&b| b == 0xFF));
    assert!(flash.data()[..0x10000].iter().all(|&b| b == 0x00));
}

#[test]
fn test_program_then_read_64_bytes() {
    let mut framer = ready_framer();
    let payload = [0xAAu8; 64];

    // 64 bytes do not fit one report next to the header
    let (first, second) = payload.split_at(MAX_PROGRAM_PAYLOAD);
    for (offset, chunk) in [(0u32, first), (MAX_PROGRAM_PAYLOAD as u32, second)] {
        let op = FlashOperation::page_program(addr(offset), chunk).unwrap();
        let response = framer.dispatch(&op.encode());
        assert_eq!(response[0], STATUS_OK);
    }

    let mut read_back = Vec::new();
    for (offset, len) in [(0u32, MAX_READ_PAYLOAD), (MAX_READ_PAYLOAD as u32, 1)] {
        let op = FlashOperation::read(addr(offset), len).unwrap();
        let response = framer.dispatch(&op.encode());
        assert_eq!(response[0], STATUS_OK);
        read_back.extend_from_slice(&response[1..1 + len]);
    }
    assert_eq!(read_back, payload.to_vec());
    assert_eq!(emulator(&framer).busy_violations(), 0);
}

#[test]
fn test_program_report_layout() {
    let mut framer = ready_framer();
    let mut bytes = vec![0x07, 0x00, 0x00, 0x00, MAX_PROGRAM_PAYLOAD as u8];
    bytes.extend_from_slice(&[0xAA; MAX_PROGRAM_PAYLOAD]);

    let response = framer.dispatch(&request(&bytes));
    assert_eq!(response, [0u8; REPORT_LEN]);
    assert!(emulator(&framer).data()[..MAX_PROGRAM_PAYLOAD]
        .iter()
        .all(|&b| b == 0xAA));
    assert_eq!(emulator(&framer).data()[MAX_PROGRAM_PAYLOAD], 0xFF);
}

#[test]
fn test_unknown_tag_has_no_traffic() {
    let mut framer = ready_framer();
    let response = framer.dispatch(&request(&[0xFF, 0x01, 0x02, 0x03]));

    assert_eq!(response[0], 0x20);
    assert!(response[1..].iter().all(|&b| b == 0));
    assert!(emulator(&framer).transactions().is_empty());
    assert_eq!(framer.driver().state(), ChipState::Idle);
}

#[test]
fn test_malformed_reports_have_no_traffic() {
    let mut framer = ready_framer();

    // Unaligned erase
    let response = framer.dispatch(&request(&[0x06, 0x01, 0x00, 0x01]));
    assert_eq!(response[0], 0x21);
    // Empty program
    let response = framer.dispatch(&request(&[0x07, 0x00, 0x00, 0x00, 0]));
    assert_eq!(response[0], 0x21);
    // Oversized read
    let response = framer.dispatch(&request(&[0x08, 0x00, 0x00, 0x00, 64]));
    assert_eq!(response[0], 0x21);

    assert!(emulator(&framer).transactions().is_empty());
}

#[test]
fn test_read_status_report() {
    let mut framer = ready_framer();
    let response = framer.dispatch(&request(&[OperationTag::ReadStatus as u8]));
    assert_eq!(&response[..2], &[STATUS_OK, 0x00]);
}

#[test]
fn test_out_of_range_read_report() {
    let mut framer = ready_framer();
    let response = framer.dispatch(&request(&[0x08, 0x1F, 0xFF, 0xF0, 32]));
    assert_eq!(response[0], 0x10);
    assert!(emulator(&framer).transactions().is_empty());
}

#[test]
fn test_failed_read_has_zero_payload() {
    let mut framer = ready_framer();
    framer.driver_mut().transport_mut().data_mut()[..8].fill(0x5A);
    framer.driver_mut().transport_mut().inject_fault_after(0);

    let response = framer.dispatch(&request(&[0x08, 0x00, 0x00, 0x00, 8]));
    assert_eq!(response[0], 0x01);
    assert!(response[1..].iter().all(|&b| b == 0));
    assert_eq!(framer.driver().state(), ChipState::Unknown);

    framer.driver_mut().transport_mut().clear_fault();
    let response = framer.dispatch(&request(&[0x08, 0x00, 0x00, 0x00, 8]));
    assert_eq!(response[0], 0x13);

    framer.dispatch(&request(&[OperationTag::Reset as u8]));
    let response = framer.dispatch(&request(&[0x08, 0x00, 0x00, 0x00, 8]));
    assert_eq!(&response[..9], &[0x00, 0x5A, 0x5A, 0x5A, 0x5A, 0x5A, 0x5A, 0x5A, 0x5A]);
}

#[test]
fn test_power_down_report() {
    let mut framer = ready_framer();
    let response = framer.dispatch(&request(&[OperationTag::PowerDown as u8]));
    assert_eq!(response[0], STATUS_OK);
    assert!(emulator(&framer).is_powered_down());

    let response = framer.dispatch(&request(&[OperationTag::Identify as u8]));
    assert_eq!(response[0], 0x13);

    let response = framer.dispatch(&request(&[OperationTag::Reset as u8]));
    assert_eq!(response[0], STATUS_OK);
    assert!(!emulator(&framer).is_powered_down());
}
