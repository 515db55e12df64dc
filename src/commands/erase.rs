//! Erase command implementation

use iceflash_core::spi::opcodes::BLOCK_64K;

use super::{progress_bar, spinner, CmdResult, Session};
use crate::cli::ProgrammerArgs;

/// Erase the whole chip, or a 64 KiB aligned range
pub fn run_erase(
    args: &ProgrammerArgs,
    stay_awake: bool,
    start: Option<u32>,
    length: Option<u32>,
) -> CmdResult {
    let mut session = Session::open(args, stay_awake)?;

    match (start, length) {
        (None, None) => {
            let sp = spinner("Erasing entire chip (this can take a while)...")?;
            session.client.chip_erase()?;
            sp.finish_with_message("Chip erase complete");
        }
        (start, length) => {
            let start = start.unwrap_or(0);
            let length = length.unwrap_or_else(|| session.size.saturating_sub(start));
            if start % BLOCK_64K != 0 || length % BLOCK_64K != 0 {
                return Err(format!(
                    "Erase range 0x{:06X}+0x{:X} must be 64 KiB aligned",
                    start, length
                )
                .into());
            }
            session.check_range(start, length)?;

            let pb = progress_bar(length as u64, "Erasing")?;
            session
                .client
                .erase_range_with_progress(start, length, |done| pb.set_position(done as u64))?;
            pb.finish_with_message("Erase complete");
        }
    }

    session.finish()
}
