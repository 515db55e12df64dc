//! CLI command implementations
//!
//! Every command runs in a [`Session`]: the flash is reset (it sits in deep
//! power-down after the programmer boots), identified, and put back into
//! deep power-down when the command finishes.

mod control;
mod erase;
mod list;
mod probe;
mod read;
mod verify;
mod write;

pub use control::{run_power_down, run_reset, run_status};
pub use erase::run_erase;
#[cfg(feature = "hid")]
pub use list::list_devices;
pub use list::{list_chips, list_programmers};
pub use probe::run_probe;
pub use read::run_read;
pub use verify::run_verify;
pub use write::run_write;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use iceflash_core::chip::{ChipInfo, JedecId};
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::ProgrammerArgs;
use crate::programmers::{self, Client};

type CmdResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// An identified flash behind an open programmer
pub struct Session {
    pub client: Client,
    pub jedec: JedecId,
    pub chip: Option<&'static ChipInfo>,
    pub size: u32,
    stay_awake: bool,
}

impl Session {
    /// Open the programmer, reset and identify the flash
    pub fn open(args: &ProgrammerArgs, stay_awake: bool) -> CmdResult<Self> {
        let mut client = programmers::open_client(&args.programmer)?;
        client.reset()?;

        let jedec = client.identify()?;
        if jedec.is_blank() {
            return Err(format!("No flash chip found (JEDEC ID {})", jedec).into());
        }

        let chip = jedec.chip();
        let size = match (args.size, chip) {
            (Some(size), _) => size,
            (None, Some(chip)) => chip.total_size,
            (None, None) => {
                return Err(format!(
                    "Unknown flash chip (JEDEC ID {}); pass --size to continue",
                    jedec
                )
                .into())
            }
        };

        match chip {
            Some(chip) => println!(
                "Found: {} {} ({} bytes)",
                chip.vendor, chip.name, chip.total_size
            ),
            None => println!("Found: unknown chip {} ({} bytes)", jedec, size),
        }

        Ok(Self {
            client,
            jedec,
            chip,
            size,
            stay_awake,
        })
    }

    /// Check that `start..start+len` lies inside the flash
    pub fn check_range(&self, start: u32, len: u32) -> CmdResult {
        match start.checked_add(len) {
            Some(end) if end <= self.size => Ok(()),
            _ => Err(format!(
                "Range 0x{:06X}+0x{:X} exceeds flash size ({} bytes)",
                start, len, self.size
            )
            .into()),
        }
    }

    /// Put the flash back into deep power-down unless asked not to
    pub fn finish(mut self) -> CmdResult {
        if self.stay_awake {
            log::debug!("leaving flash awake");
        } else {
            self.client.power_down()?;
            log::debug!("flash back in deep power-down");
        }
        Ok(())
    }
}

/// Read file contents into a Vec
fn read_file(path: &Path) -> CmdResult<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    println!("Read {} bytes from {:?}", data.len(), path);
    Ok(data)
}

/// Create a progress bar with a phase message
fn progress_bar(total: u64, phase: &str) -> CmdResult<ProgressBar> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} ({{bytes_per_sec}}, {{eta}}) {}",
                phase
            ))?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Create a spinner with a message
fn spinner(message: &str) -> CmdResult<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

fn format_size(bytes: u32) -> String {
    if bytes >= 1024 * 1024 {
        format!("{} MiB", bytes / (1024 * 1024))
    } else if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}
