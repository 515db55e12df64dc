//! List commands implementation

use iceflash_core::chip::KNOWN_CHIPS;

use super::format_size;
#[cfg(feature = "hid")]
use super::CmdResult;
use crate::programmers;

/// List all supported programmers
pub fn list_programmers() {
    println!("{}", programmers::programmer_help());
}

/// List all known chips
pub fn list_chips(vendor_filter: Option<&str>) {
    println!("Known flash chips:");
    println!();
    println!("{:<12} {:<12} {:>10} {:>10}", "Vendor", "Name", "Size", "JEDEC ID");
    println!("{}", "-".repeat(48));

    for chip in KNOWN_CHIPS {
        if let Some(vendor) = vendor_filter {
            if !chip.vendor.to_lowercase().contains(&vendor.to_lowercase()) {
                continue;
            }
        }

        println!(
            "{:<12} {:<12} {:>10} {:>10}",
            chip.vendor,
            chip.name,
            format_size(chip.total_size),
            chip.jedec.to_string()
        );
    }
}

/// List connected programmers matching `vid:pid`
#[cfg(feature = "hid")]
pub fn list_devices(vid: u16, pid: u16) -> CmdResult {
    let devices = iceflash_hid::HidDevice::list_devices(vid, pid)?;

    if devices.is_empty() {
        println!("No programmers found ({:04x}:{:04x})", vid, pid);
        return Ok(());
    }

    println!("Connected programmers ({:04x}:{:04x}):", vid, pid);
    for (index, info) in devices.iter().enumerate() {
        println!("{}", device_line(index, info));
    }
    Ok(())
}

/// One line per device; `index` is what `-p hid:index=<n>` selects
#[cfg(feature = "hid")]
fn device_line(index: usize, info: &iceflash_hid::HidDeviceInfo) -> String {
    format!(
        "  [{}] bus {:03} address {:03}  {}  serial {}",
        index,
        info.bus,
        info.address,
        info.product.as_deref().unwrap_or("(no product string)"),
        info.serial.as_deref().unwrap_or("-")
    )
}

#[cfg(all(test, feature = "hid"))]
mod tests {
    use super::*;
    use iceflash_hid::HidDeviceInfo;

    #[test]
    fn test_device_line() {
        let info = HidDeviceInfo {
            bus: 1,
            address: 12,
            product: Some("pico-hid-flasher".to_string()),
            serial: Some("00000001".to_string()),
        };
        assert_eq!(
            device_line(0, &info),
            "  [0] bus 001 address 012  pico-hid-flasher  serial 00000001"
        );

        let bare = HidDeviceInfo {
            bus: 3,
            address: 4,
            product: None,
            serial: None,
        };
        assert_eq!(
            device_line(2, &bare),
            "  [2] bus 003 address 004  (no product string)  serial -"
        );
    }
}
