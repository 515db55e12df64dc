//! Verify command implementation

use std::path::Path;

use super::{progress_bar, read_file, CmdResult, Session};
use crate::cli::ProgrammerArgs;

/// Compare flash contents at `start` against `input`
pub fn run_verify(args: &ProgrammerArgs, stay_awake: bool, input: &Path, start: u32) -> CmdResult {
    let data = read_file(input)?;
    let mut session = Session::open(args, stay_awake)?;
    session.check_range(start, data.len() as u32)?;

    verify_with_progress(&mut session, start, &data)?;
    println!("Verification passed");

    session.finish()
}

pub(super) fn verify_with_progress(session: &mut Session, start: u32, data: &[u8]) -> CmdResult {
    let pb = progress_bar(data.len() as u64, "Verifying")?;
    let result = session
        .client
        .verify_with_progress(start, data, |done| pb.set_position(done as u64));
    match result {
        Ok(()) => {
            pb.finish_with_message("Verify complete");
            Ok(())
        }
        Err(e) => {
            pb.abandon();
            Err(e.into())
        }
    }
}
