//! Probe command implementation

use super::{format_size, CmdResult, Session};
use crate::cli::ProgrammerArgs;

/// Identify the flash and print what was found
pub fn run_probe(args: &ProgrammerArgs, stay_awake: bool) -> CmdResult {
    let session = Session::open(args, stay_awake)?;

    println!("Flash chip:");
    if let Some(chip) = session.chip {
        println!("  Vendor:   {}", chip.vendor);
        println!("  Name:     {}", chip.name);
    }
    println!("  Size:     {} ({} bytes)", format_size(session.size), session.size);
    println!("  JEDEC ID: {}", session.jedec);
    println!(
        "            manufacturer 0x{:02X}, device 0x{:04X}",
        session.jedec.manufacturer,
        session.jedec.device_id()
    );

    session.finish()
}
