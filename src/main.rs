//! iceflash - Host tool for the iCE40 configuration flash programmer
//!
//! Talks to an RP2040 running the `pico-hid-flasher` firmware over USB HID.
//! Every flash operation travels as one 64-byte report; the client in
//! `iceflash-hid` splits larger reads, writes and erases into single-report
//! operations.
//!
//! The `dummy` programmer runs the same firmware logic in-process on an
//! emulated W25Q16, which is handy for trying out the tool without hardware.

mod cli;
mod commands;
mod programmers;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let stay_awake = cli.stay_awake;
    let result = match cli.command {
        Commands::Probe { programmer } => commands::run_probe(&programmer, stay_awake),
        Commands::Status { programmer } => commands::run_status(&programmer, stay_awake),
        Commands::Read {
            programmer,
            output,
            start,
            length,
        } => commands::run_read(&programmer, stay_awake, &output, start, length),
        Commands::Write {
            programmer,
            input,
            start,
            no_verify,
            no_erase,
        } => commands::run_write(&programmer, stay_awake, &input, start, !no_verify, no_erase),
        Commands::Erase {
            programmer,
            start,
            length,
        } => commands::run_erase(&programmer, stay_awake, start, length),
        Commands::Verify {
            programmer,
            input,
            start,
        } => commands::run_verify(&programmer, stay_awake, &input, start),
        Commands::Reset { programmer } => commands::run_reset(&programmer),
        Commands::PowerDown { programmer } => commands::run_power_down(&programmer),
        Commands::ListProgrammers => {
            commands::list_programmers();
            Ok(())
        }
        #[cfg(feature = "hid")]
        Commands::ListDevices { vid, pid } => commands::list_devices(vid, pid),
        Commands::ListChips { vendor } => {
            commands::list_chips(vendor.as_deref());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
