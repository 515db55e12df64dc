//! Reset, power-down and status commands

use iceflash_core::spi::Status1;

use super::{CmdResult, Session};
use crate::cli::ProgrammerArgs;
use crate::programmers;

/// Reset the flash and leave it awake
pub fn run_reset(args: &ProgrammerArgs) -> CmdResult {
    let mut client = programmers::open_client(&args.programmer)?;
    client.reset()?;
    println!("Flash reset, now awake");
    Ok(())
}

/// Put the flash into deep power-down
pub fn run_power_down(args: &ProgrammerArgs) -> CmdResult {
    let mut client = programmers::open_client(&args.programmer)?;
    // Power-down is only accepted from idle
    client.reset()?;
    client.power_down()?;
    println!("Flash in deep power-down");
    Ok(())
}

/// Print status register 1
pub fn run_status(args: &ProgrammerArgs, stay_awake: bool) -> CmdResult {
    let mut session = Session::open(args, stay_awake)?;
    let status = session.client.read_status()?;

    println!("Status register 1: 0x{:02X}", status.bits());
    for (name, flag) in [
        ("BUSY", Status1::BUSY),
        ("WEL", Status1::WEL),
        ("BP0", Status1::BP0),
        ("BP1", Status1::BP1),
        ("BP2", Status1::BP2),
        ("TB", Status1::TB),
        ("SEC", Status1::SEC),
        ("SRP0", Status1::SRP0),
    ] {
        println!("  {:5} {}", name, u8::from(status.contains(flag)));
    }
    if status.intersects(Status1::BP0 | Status1::BP1 | Status1::BP2) {
        log::warn!("Block protection is enabled; programs and erases of protected areas are ignored by the chip");
    }

    session.finish()
}
