//! Programmer registration and dispatch
//!
//! Both programmers speak the same report protocol; they differ only in the
//! [`ReportChannel`] behind the client.

use iceflash_hid::{FlasherClient, ReportChannel};

/// A client over whichever channel the user picked
pub type Client = FlasherClient<Box<dyn ReportChannel>>;

/// Information about a programmer
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available programmers (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "hid")]
    programmers.push(ProgrammerInfo {
        name: "hid",
        aliases: &["usb"],
        description: "iceflash RP2040 over USB HID (vid=<hex>,pid=<hex>,index=<n>,timeout=<s>)",
    });

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        aliases: &[],
        description: "In-process firmware on an emulated W25Q16, for testing",
    });

    programmers
}

/// Generate help text listing all available programmers
pub fn programmer_help() -> String {
    let programmers = available_programmers();

    if programmers.is_empty() {
        return "No programmers available (recompile with programmer features enabled)".to_string();
    }

    let mut help = String::from("Available programmers:\n");
    for p in &programmers {
        help.push_str(&format!("  {:8} - {}\n", p.name, p.description));
    }
    help
}

/// Generate a short list of programmer names for CLI help
pub fn programmer_names_short() -> String {
    let programmers = available_programmers();
    let names: Vec<&str> = programmers.iter().map(|p| p.name).collect();
    names.join(", ")
}

/// Resolve a name or alias to the canonical programmer name
pub fn find_programmer(name: &str) -> Option<&'static str> {
    available_programmers()
        .into_iter()
        .find(|p| p.name == name || p.aliases.contains(&name))
        .map(|p| p.name)
}

/// Open a client on the specified programmer
///
/// The programmer string can be just the name (e.g., "hid") or include
/// options (e.g., "hid:index=1,timeout=120").
pub fn open_client(programmer: &str) -> Result<Client, Box<dyn std::error::Error>> {
    let (name, options) = parse_programmer_string(programmer);

    let canonical_name = find_programmer(name).ok_or_else(|| unknown_programmer_error(name))?;

    let channel: Box<dyn ReportChannel> = match canonical_name {
        #[cfg(feature = "hid")]
        "hid" => {
            let config = iceflash_hid::parse_options(&options)
                .map_err(|e| format!("Invalid hid parameters: {}", e))?;

            log::info!("Opening iceflash HID programmer...");
            let device = iceflash_hid::HidDevice::open(&config).map_err(|e| {
                format!(
                    "Failed to open iceflash device: {}\n\
                     Make sure the device is connected and you have permissions.\n\
                     A udev rule granting access to {:04x}:{:04x} may be needed.",
                    e, config.vid, config.pid
                )
            })?;
            Box::new(device)
        }

        #[cfg(feature = "dummy")]
        "dummy" => {
            if !options.is_empty() {
                log::warn!("dummy programmer takes no options, ignoring them");
            }
            Box::new(iceflash_hid::Loopback::new_default())
        }

        _ => return Err(unknown_programmer_error(name)),
    };

    Ok(FlasherClient::new(channel))
}

/// Parse a programmer string into name and options
///
/// Format: "name" or "name:option1=value1,option2=value2"
pub fn parse_programmer_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    if let Some((name, opts)) = s.split_once(':') {
        let options: Vec<_> = opts
            .split(',')
            .filter_map(|opt| opt.split_once('='))
            .collect();
        (name, options)
    } else {
        (s, Vec::new())
    }
}

fn unknown_programmer_error(name: &str) -> Box<dyn std::error::Error> {
    let mut msg = format!("Unknown programmer: {}\n\n", name);
    msg.push_str(&programmer_help());
    msg.push_str("\nUse 'iceflash list-programmers' for more details");
    msg.into()
}
