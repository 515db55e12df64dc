use std::cell::Cell;
use std::rc::Rc;

use iceflash_core::driver::{ChipState, FlashConfig, FlashDriver};
use iceflash_core::error::{DriverError, TransportError};
use iceflash_core::spi::{opcodes, Status1};
use iceflash_core::transport::{FlashTransport, ResetLine};

use super::{addr, ready_driver, ready_driver_with};
use crate::{CountingResetLine, Direction, DummyConfig, DummyFlash};

/// Assert the log is exactly WREN, `opcode`, then one or more status polls
fn assert_mutation_sequence(flash: &DummyFlash, opcode: u8) {
    let log = flash.transactions();
    assert!(log.len() >= 3, "log too short: {:x?}", flash.opcodes());
    assert_eq!(log[0].opcode, opcodes::WREN);
    assert_eq!(log[0].direction, Direction::Write);
    assert_eq!(log[1].opcode, opcode);
    assert_eq!(log[1].direction, Direction::Write);
    for t in &log[2..] {
        assert_eq!(t.opcode, opcodes::RDSR);
        assert_eq!(t.direction, Direction::Transceive);
        assert_eq!(t.read_len, 1);
    }
    assert_eq!(
        log.iter().filter(|t| t.opcode == opcodes::WREN).count(),
        1,
        "exactly one write enable"
    );
}

#[test]
fn test_initial_state_requires_reset() {
    let mut driver = FlashDriver::new(DummyFlash::new_default(), FlashConfig::W25Q16);
    assert_eq!(driver.state(), ChipState::Unknown);
    assert_eq!(driver.identify(), Err(DriverError::WrongState));
    assert!(driver.transport().transactions().is_empty());
}

#[test]
fn test_reset_sequence() {
    let mut driver = FlashDriver::with_reset_line(
        DummyFlash::new_default(),
        CountingResetLine::default(),
        FlashConfig::W25Q16,
    );
    driver.reset().unwrap();
    assert_eq!(driver.state(), ChipState::Idle);

    let (flash, line) = driver.into_parts();
    let log = flash.transactions();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].opcode, opcodes::RESET_FILL);
    assert_eq!(log[0].header, vec![0xFF; 7]);
    assert_eq!(log[1].opcode, opcodes::RDP);
    assert_eq!(flash.elapsed_us(), 11_000);
    assert_eq!(line.pulses, 1);
    assert!(!line.asserted);
}

#[test]
fn test_identify() {
    let mut driver = ready_driver();
    let id = driver.identify().unwrap();
    assert_eq!(id.to_bytes(), [0xEF, 0x40, 0x15]);
    assert_eq!(id.chip().unwrap().name, "W25Q16");
    assert_eq!(driver.transport().opcodes(), vec![opcodes::RDID]);
}

#[test]
fn test_read_status_idle() {
    let mut driver = ready_driver();
    assert_eq!(driver.read_status().unwrap(), Status1::empty());
}

#[test]
fn test_program_round_trip() {
    for start in [0x000000u32, 0x0000E0, 0x0000C0, 0x012345, 0x1FFFC0] {
        let mut driver = ready_driver();
        let data: Vec<u8> = (0..64u32).map(|i| (i * 7 + start) as u8).collect();

        driver.page_program(addr(start), &data).unwrap();
        let mut buf = [0u8; 64];
        driver.read(addr(start), &mut buf).unwrap();

        assert_eq!(&buf[..], &data[..], "round trip at {:#08x}", start);
        assert_eq!(driver.state(), ChipState::Idle);
        assert_eq!(driver.transport().busy_violations(), 0);
    }
}

#[test]
fn test_program_sequence() {
    let mut driver = ready_driver();
    driver.page_program(addr(0x000100), &[0x55; 64]).unwrap();

    let flash = driver.transport();
    assert_mutation_sequence(flash, opcodes::PP);
    let pp = &flash.transactions()[1];
    assert_eq!(pp.header, vec![0x00, 0x01, 0x00]);
    assert_eq!(pp.payload, vec![0x55; 64]);
}

#[test]
fn test_program_splits_at_page_boundary() {
    let mut driver = ready_driver();
    let data: Vec<u8> = (0..16).collect();
    driver.page_program(addr(0x0000F8), &data).unwrap();

    let flash = driver.transport();
    assert_eq!(
        flash.opcodes(),
        vec![
            opcodes::WREN,
            opcodes::PP,
            opcodes::RDSR,
            opcodes::RDSR,
            opcodes::WREN,
            opcodes::PP,
            opcodes::RDSR,
            opcodes::RDSR,
        ]
    );
    let log = flash.transactions();
    assert_eq!(log[1].header, vec![0x00, 0x00, 0xF8]);
    assert_eq!(log[1].payload, data[..8].to_vec());
    assert_eq!(log[5].header, vec![0x00, 0x01, 0x00]);
    assert_eq!(log[5].payload, data[8..].to_vec());
    assert_eq!(&flash.data()[0xF8..0x108], &data[..]);
}

#[test]
fn test_program_only_clears_bits() {
    let mut driver = ready_driver();
    driver.page_program(addr(0x10), &[0xF0]).unwrap();
    driver.page_program(addr(0x10), &[0x0F]).unwrap();
    assert_eq!(driver.transport().data()[0x10], 0x00);
}

#[test]
fn test_program_payload_length() {
    let mut driver = ready_driver();
    assert_eq!(
        driver.page_program(addr(0), &[]),
        Err(DriverError::InvalidPayloadLength)
    );
    assert_eq!(
        driver.page_program(addr(0), &[0u8; 65]),
        Err(DriverError::InvalidPayloadLength)
    );
    assert!(driver.transport().transactions().is_empty());
    assert_eq!(driver.state(), ChipState::Idle);
}

#[test]
fn test_program_accepts_full_buffer() {
    let mut driver = ready_driver();
    driver.page_program(addr(0x40), &[0x5A; 64]).unwrap();
    driver.page_program(addr(0x100), &[0xA5]).unwrap();

    let data = driver.transport().data();
    assert!(data[0x40..0x80].iter().all(|&b| b == 0x5A));
    assert_eq!(data[0x100], 0xA5);
    assert_eq!(driver.state(), ChipState::Idle);
}

#[test]
fn test_unaligned_block_erase_has_no_traffic() {
    let mut driver = ready_driver();
    for a in [0x000001u32, 0x001000, 0x00FFFF, 0x018000, 0x1F0001] {
        assert_eq!(
            driver.block_erase_64k(addr(a)),
            Err(DriverError::InvalidAddress),
            "address {:#08x}",
            a
        );
    }
    assert!(driver.transport().transactions().is_empty());
    assert_eq!(driver.state(), ChipState::Idle);
}

#[test]
fn test_block_erase() {
    let flash = DummyFlash::with_data(DummyConfig::default(), &vec![0u8; 0x30000]);
    let mut driver = ready_driver_with(flash);

    driver.block_erase_64k(addr(0x010000)).unwrap();

    let flash = driver.transport();
    assert_mutation_sequence(flash, opcodes::BE_D8);
    assert_eq!(flash.transactions()[1].header, vec![0x01, 0x00, 0x00]);
    // Three busy polls, then ready
    assert_eq!(flash.transactions().len(), 2 + 4);

    let data = flash.data();
    assert!(data[..0x10000].iter().all(|&b| b == 0x00));
    assert!(data[0x10000..0x20000].iter().all(|&b| b == 0xFF));
    assert!(data[0x20000..0x30000].iter().all(|&b| b == 0x00));
}

#[test]
fn test_chip_erase_reads_erased() {
    let config = DummyConfig::default();
    let size = config.size;
    let flash = DummyFlash::with_data(config, &vec![0u8; size]);
    let mut driver = ready_driver_with(flash);

    driver.chip_erase().unwrap();
    assert_mutation_sequence(driver.transport(), opcodes::CE_C7);

    for a in [0x000000u32, 0x000100, 0x123456, 0x1FFFC0] {
        let mut buf = [0u8; 64];
        driver.read(addr(a), &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0xFF), "erased at {:#08x}", a);
    }
}

#[test]
fn test_out_of_range() {
    let mut driver = ready_driver();
    let mut buf = [0u8; 2];
    assert_eq!(
        driver.read(addr(0x1FFFFF), &mut buf),
        Err(DriverError::InvalidAddress)
    );
    assert_eq!(
        driver.block_erase_64k(addr(0x200000)),
        Err(DriverError::InvalidAddress)
    );
    assert_eq!(
        driver.page_program(addr(0x1FFFF0), &[0u8; 32]),
        Err(DriverError::InvalidAddress)
    );
    assert!(driver.transport().transactions().is_empty());

    // Last byte is fine
    let mut last = [0u8; 1];
    driver.read(addr(0x1FFFFF), &mut last).unwrap();
}

#[test]
fn test_zero_length_read() {
    let mut driver = ready_driver();
    driver.read(addr(0x1000), &mut []).unwrap();
    assert!(driver.transport().transactions().is_empty());

    driver.power_down().unwrap();
    assert_eq!(
        driver.read(addr(0x1000), &mut []),
        Err(DriverError::WrongState)
    );
}

#[test]
fn test_identify_while_powered_down() {
    let mut driver = ready_driver();
    driver.power_down().unwrap();
    assert_eq!(driver.state(), ChipState::PoweredDown);
    assert!(driver.transport().is_powered_down());
    assert_eq!(driver.transport().opcodes(), vec![opcodes::DP]);

    driver.transport_mut().clear_log();
    assert_eq!(driver.identify(), Err(DriverError::WrongState));
    assert_eq!(driver.chip_erase(), Err(DriverError::WrongState));
    assert_eq!(driver.power_down(), Err(DriverError::WrongState));
    assert!(driver.transport().transactions().is_empty());

    driver.reset().unwrap();
    assert!(!driver.transport().is_powered_down());
    assert_eq!(driver.identify().unwrap().to_bytes(), [0xEF, 0x40, 0x15]);
}

#[test]
fn test_busy_poll_terminates() {
    let config = DummyConfig {
        program_busy_polls: 5,
        ..DummyConfig::default()
    };
    let mut driver = ready_driver_with(DummyFlash::new(config));
    let before = driver.transport().elapsed_us();

    driver.page_program(addr(0), &[0x00]).unwrap();

    let flash = driver.transport();
    let polls = flash
        .transactions()
        .iter()
        .filter(|t| t.opcode == opcodes::RDSR)
        .count();
    assert_eq!(polls, 6);
    assert_eq!(flash.elapsed_us() - before, 5_000);
    assert_eq!(flash.busy_violations(), 0);
    assert_eq!(driver.state(), ChipState::Idle);
}

#[test]
fn test_busy_timeout_requires_reset() {
    let mut driver = ready_driver();
    driver.transport_mut().set_stuck_busy(true);
    let before = driver.transport().elapsed_us();

    assert_eq!(
        driver.page_program(addr(0), &[0x00]),
        Err(DriverError::BusyTimeout)
    );
    assert_eq!(driver.state(), ChipState::Unknown);

    let flash = driver.transport();
    let polls = flash
        .transactions()
        .iter()
        .filter(|t| t.opcode == opcodes::RDSR)
        .count();
    // 20 ms timeout at 1 ms intervals
    assert_eq!(polls, 20);
    assert_eq!(flash.elapsed_us() - before, 20_000);

    driver.transport_mut().clear_log();
    let mut buf = [0u8; 4];
    assert_eq!(
        driver.read(addr(0), &mut buf),
        Err(DriverError::WrongState)
    );
    assert!(driver.transport().transactions().is_empty());

    driver.reset().unwrap();
    assert_eq!(driver.state(), ChipState::Idle);
    driver.read(addr(0), &mut buf).unwrap();
    assert_eq!(buf, [0xFF; 4]);
}

#[test]
fn test_transport_fault_requires_reset() {
    let mut driver = ready_driver();
    driver.transport_mut().inject_fault_after(0);

    let mut buf = [0u8; 4];
    assert_eq!(
        driver.read(addr(0), &mut buf),
        Err(DriverError::Transport(TransportError::BusFault))
    );
    assert_eq!(driver.state(), ChipState::Unknown);

    driver.transport_mut().clear_fault();
    assert_eq!(driver.identify(), Err(DriverError::WrongState));

    driver.reset().unwrap();
    driver.read(addr(0), &mut buf).unwrap();
}

#[test]
fn test_fault_during_program_leaves_data() {
    let mut driver = ready_driver();
    // Write enable goes through, the program itself fails
    driver.transport_mut().inject_fault_after(1);

    assert_eq!(
        driver.page_program(addr(0), &[0x00; 8]),
        Err(DriverError::Transport(TransportError::BusFault))
    );
    assert_eq!(driver.state(), ChipState::Unknown);
    assert_eq!(
        driver.transport().opcodes(),
        vec![opcodes::WREN, opcodes::PP]
    );
    assert!(driver.transport().data()[..8].iter().all(|&b| b == 0xFF));
}

#[test]
fn test_boot_parks_in_power_down() {
    let mut driver = FlashDriver::new(DummyFlash::new_default(), FlashConfig::W25Q16);
    let id = driver.boot().unwrap();

    assert_eq!(id.to_bytes(), [0xEF, 0x40, 0x15]);
    assert_eq!(driver.state(), ChipState::PoweredDown);
    assert_eq!(
        driver.transport().opcodes(),
        vec![opcodes::RESET_FILL, opcodes::RDP, opcodes::RDID, opcodes::DP]
    );
}

/// Reset line whose level the bus can see
#[derive(Clone, Default)]
struct SharedLine(Rc<Cell<bool>>);

impl ResetLine for SharedLine {
    fn assert_reset(&mut self) {
        self.0.set(true);
    }

    fn release_reset(&mut self) {
        self.0.set(false);
    }
}

/// Emulator that notes the reset line level at every exchange
struct LineWatcher {
    flash: DummyFlash,
    line: SharedLine,
    seen: Vec<(u8, bool)>,
}

impl FlashTransport for LineWatcher {
    fn write(&mut self, opcode: u8, header: &[u8], payload: &[u8]) -> Result<(), TransportError> {
        self.seen.push((opcode, self.line.0.get()));
        self.flash.write(opcode, header, payload)
    }

    fn transceive(
        &mut self,
        opcode: u8,
        header: &[u8],
        response: &mut [u8],
    ) -> Result<(), TransportError> {
        self.seen.push((opcode, self.line.0.get()));
        self.flash.transceive(opcode, header, response)
    }

    fn delay_us(&mut self, us: u32) {
        self.flash.delay_us(us)
    }
}

#[test]
fn test_boot_holds_reset_line_through_identify() {
    let line = SharedLine::default();
    let watcher = LineWatcher {
        flash: DummyFlash::new_default(),
        line: line.clone(),
        seen: Vec::new(),
    };
    let mut driver = FlashDriver::with_reset_line(watcher, line.clone(), FlashConfig::W25Q16);
    driver.boot().unwrap();

    assert_eq!(
        driver.transport().seen,
        vec![
            (opcodes::RESET_FILL, true),
            (opcodes::RDP, true),
            (opcodes::RDID, true),
            (opcodes::DP, false),
        ]
    );
    assert!(!line.0.get());
}

#[test]
fn test_boot_releases_reset_line_on_fault() {
    let mut flash = DummyFlash::new_default();
    flash.inject_fault_after(2);
    let mut driver =
        FlashDriver::with_reset_line(flash, CountingResetLine::default(), FlashConfig::W25Q16);

    assert_eq!(
        driver.boot(),
        Err(DriverError::Transport(TransportError::BusFault))
    );
    assert_eq!(driver.state(), ChipState::Unknown);

    let (_, line) = driver.into_parts();
    assert!(!line.asserted);
    assert_eq!(line.pulses, 1);
}
