//! Write command implementation

use std::path::Path;

use iceflash_core::spi::opcodes::BLOCK_64K;

use super::verify::verify_with_progress;
use super::{progress_bar, read_file, CmdResult, Session};
use crate::cli::ProgrammerArgs;

/// Write `input` at `start`, erasing the covered 64 KiB blocks first
///
/// Bytes that share an erase block with the image but lie outside it are
/// read first and written back, so only the image range changes.
pub fn run_write(
    args: &ProgrammerArgs,
    stay_awake: bool,
    input: &Path,
    start: u32,
    verify: bool,
    no_erase: bool,
) -> CmdResult {
    let data = read_file(input)?;
    if data.is_empty() {
        return Err("Input file is empty".into());
    }

    let mut session = Session::open(args, stay_awake)?;
    let len = u32::try_from(data.len()).map_err(|_| "Input file too large")?;
    session.check_range(start, len)?;

    if no_erase {
        program(&mut session, start, &data)?;
    } else {
        let end = start + len;
        let erase_start = start - start % BLOCK_64K;
        let erase_end = end.div_ceil(BLOCK_64K) * BLOCK_64K;
        session.check_range(erase_start, erase_end - erase_start)?;

        let mut image = vec![0xFFu8; (erase_end - erase_start) as usize];
        let head = (start - erase_start) as usize;
        let tail = head + data.len();
        if head > 0 {
            log::info!("Preserving 0x{:06X}..0x{:06X}", erase_start, start);
            session.client.read(erase_start, &mut image[..head])?;
        }
        if end < erase_end {
            log::info!("Preserving 0x{:06X}..0x{:06X}", end, erase_end);
            session.client.read(end, &mut image[tail..])?;
        }
        image[head..tail].copy_from_slice(&data);

        let pb = progress_bar(image.len() as u64, "Erasing")?;
        session.client.erase_range_with_progress(
            erase_start,
            erase_end - erase_start,
            |done| pb.set_position(done as u64),
        )?;
        pb.finish_with_message("Erase complete");

        program(&mut session, erase_start, &image)?;
    }

    if verify {
        verify_with_progress(&mut session, start, &data)?;
        println!("Verification passed");
    }

    session.finish()
}

fn program(session: &mut Session, start: u32, data: &[u8]) -> CmdResult {
    let pb = progress_bar(data.len() as u64, "Writing")?;
    session
        .client
        .write_with_progress(start, data, |done| pb.set_position(done as u64))?;
    pb.finish_with_message("Write complete");
    println!("Wrote {} bytes at 0x{:06X}", data.len(), start);
    Ok(())
}
