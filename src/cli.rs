//! CLI argument parsing

use crate::programmers;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a USB vendor/product ID, hex with or without a 0x prefix
#[cfg(feature = "hid")]
fn parse_usb_id(s: &str) -> Result<u16, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u16::from_str_radix(digits, 16).map_err(|e| format!("Invalid USB ID: {}", e))
}

/// Generate dynamic help text for the programmer argument
fn programmer_help() -> String {
    format!(
        "Programmer to use [available: {}]",
        programmers::programmer_names_short()
    )
}

#[derive(Parser)]
#[command(name = "iceflash")]
#[command(author, version, about = "iCE40 configuration flash programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Leave the flash awake when done instead of putting it back into
    /// deep power-down
    #[arg(long, global = true)]
    pub stay_awake: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Programmer selection shared across commands
#[derive(clap::Args, Debug, Clone)]
pub struct ProgrammerArgs {
    /// Programmer to use, optionally with options (e.g. "hid:index=1")
    #[arg(short, long, default_value = "hid", help = programmer_help())]
    pub programmer: String,

    /// Flash size in bytes, for chips the JEDEC table does not know
    #[arg(long, value_parser = parse_hex_u32)]
    pub size: Option<u32>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe for flash chip
    Probe {
        #[command(flatten)]
        programmer: ProgrammerArgs,
    },

    /// Show status register 1
    Status {
        #[command(flatten)]
        programmer: ProgrammerArgs,
    },

    /// Read flash contents to file
    Read {
        #[command(flatten)]
        programmer: ProgrammerArgs,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Start address (hex, e.g., 0x10000)
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        start: u32,

        /// Number of bytes to read (default: to the end of the flash)
        #[arg(long, value_parser = parse_hex_u32)]
        length: Option<u32>,
    },

    /// Write file to flash
    Write {
        #[command(flatten)]
        programmer: ProgrammerArgs,

        /// Input file path (e.g. an iCE40 bitstream)
        #[arg(short, long)]
        input: PathBuf,

        /// Start address (hex, e.g., 0x10000)
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        start: u32,

        /// Skip reading the image back after writing
        #[arg(long)]
        no_verify: bool,

        /// Don't erase before writing
        #[arg(long)]
        no_erase: bool,
    },

    /// Erase flash chip
    Erase {
        #[command(flatten)]
        programmer: ProgrammerArgs,

        /// Start address for partial erase (hex, 64 KiB aligned)
        #[arg(long, value_parser = parse_hex_u32)]
        start: Option<u32>,

        /// Length of region to erase (hex or decimal, 64 KiB aligned)
        #[arg(long, value_parser = parse_hex_u32)]
        length: Option<u32>,
    },

    /// Verify flash contents against file
    Verify {
        #[command(flatten)]
        programmer: ProgrammerArgs,

        /// Input file path to verify against
        #[arg(short, long)]
        input: PathBuf,

        /// Start address (hex, e.g., 0x10000)
        #[arg(long, value_parser = parse_hex_u32, default_value = "0")]
        start: u32,
    },

    /// Reset the flash and wake it from deep power-down
    Reset {
        #[command(flatten)]
        programmer: ProgrammerArgs,
    },

    /// Put the flash into deep power-down
    PowerDown {
        #[command(flatten)]
        programmer: ProgrammerArgs,
    },

    /// List supported programmers
    ListProgrammers,

    /// List connected HID programmers
    #[cfg(feature = "hid")]
    ListDevices {
        /// USB vendor ID (hex)
        #[arg(long, value_parser = parse_usb_id, default_value = "16c0")]
        vid: u16,

        /// USB product ID (hex)
        #[arg(long, value_parser = parse_usb_id, default_value = "05df")]
        pid: u16,
    },

    /// List known flash chips
    ListChips {
        /// Filter by vendor
        #[arg(long)]
        vendor: Option<String>,
    },
}
