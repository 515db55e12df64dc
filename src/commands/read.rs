//! Read command implementation

use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::{progress_bar, CmdResult, Session};
use crate::cli::ProgrammerArgs;

/// Read `length` bytes (default: to the end of the flash) into `output`
pub fn run_read(
    args: &ProgrammerArgs,
    stay_awake: bool,
    output: &Path,
    start: u32,
    length: Option<u32>,
) -> CmdResult {
    let mut session = Session::open(args, stay_awake)?;
    let length = length.unwrap_or_else(|| session.size.saturating_sub(start));
    session.check_range(start, length)?;

    let mut data = vec![0u8; length as usize];
    let pb = progress_bar(length as u64, "Reading")?;
    session
        .client
        .read_with_progress(start, &mut data, |done| pb.set_position(done as u64))?;
    pb.finish_with_message("Read complete");

    let mut file = File::create(output)?;
    file.write_all(&data)?;
    println!("Wrote {} bytes to {:?}", data.len(), output);

    session.finish()
}
