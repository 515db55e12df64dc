//! USB HID device implementation
//!
//! The programmer enumerates as a vendor-defined HID device with one
//! interrupt OUT and one interrupt IN endpoint, each carrying 64-byte
//! reports without report IDs. We talk to the endpoints directly instead of
//! going through a hidraw layer, so the kernel HID driver is detached when
//! the interface is claimed.

use std::time::Duration;

use iceflash_core::protocol::{Report, REPORT_LEN, USB_PID, USB_VID};
use nusb::descriptors::TransferType;
use nusb::transfer::{Buffer, In, Interrupt, Out};
use nusb::{Endpoint, MaybeFuture};

use crate::channel::ReportChannel;
use crate::error::{HidError, Result};

/// USB interface class for HID
const USB_CLASS_HID: u8 = 0x03;

/// Connection parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HidConfig {
    /// USB vendor ID to match
    pub vid: u16,
    /// USB product ID to match
    pub pid: u16,
    /// Which of several matching devices to open (0-indexed)
    pub index: usize,
    /// Per-report timeout
    ///
    /// Must cover the slowest single operation; a chip erase on a W25Q16
    /// can take tens of seconds.
    pub timeout: Duration,
}

impl Default for HidConfig {
    fn default() -> Self {
        Self {
            vid: USB_VID,
            pid: USB_PID,
            index: 0,
            timeout: Duration::from_secs(90),
        }
    }
}

/// A connected programmer
pub struct HidDevice {
    out_ep: Endpoint<Interrupt, Out>,
    in_ep: Endpoint<Interrupt, In>,
    timeout: Duration,
}

/// Information about a connected programmer
#[derive(Debug, Clone)]
pub struct HidDeviceInfo {
    /// USB bus number
    pub bus: u8,
    /// USB device address
    pub address: u8,
    /// Product string, if the device reports one
    pub product: Option<String>,
    /// Serial number, if the device reports one
    pub serial: Option<String>,
}

impl HidDevice {
    /// Open the device described by `config`
    pub fn open(config: &HidConfig) -> Result<Self> {
        let devices: Vec<_> = nusb::list_devices()
            .wait()
            .map_err(|e| HidError::OpenFailed(e.to_string()))?
            .filter(|d| d.vendor_id() == config.vid && d.product_id() == config.pid)
            .collect();

        let device_info = devices.get(config.index).ok_or(HidError::DeviceNotFound {
            vid: config.vid,
            pid: config.pid,
        })?;

        log::info!(
            "Opening iceflash device at bus {} address {}",
            device_info.busnum(),
            device_info.device_address()
        );

        let device = device_info
            .open()
            .wait()
            .map_err(|e| HidError::OpenFailed(e.to_string()))?;

        let config_desc = device
            .active_configuration()
            .map_err(|e| HidError::OpenFailed(format!("Failed to get config: {}", e)))?;

        // First HID interface with an interrupt endpoint in each direction
        let mut found: Option<(u8, u8, u8)> = None;
        for iface in config_desc.interface_alt_settings() {
            if iface.class() != USB_CLASS_HID {
                continue;
            }
            let mut ep_in = None;
            let mut ep_out = None;
            for ep in iface.endpoints() {
                if ep.transfer_type() != TransferType::Interrupt {
                    continue;
                }
                if ep.address() & 0x80 != 0 {
                    ep_in = Some(ep.address());
                } else {
                    ep_out = Some(ep.address());
                }
            }
            if let (Some(ep_in), Some(ep_out)) = (ep_in, ep_out) {
                found = Some((iface.interface_number(), ep_in, ep_out));
                break;
            }
        }

        let (iface_num, in_addr, out_addr) = found.ok_or(HidError::NoHidInterface)?;
        log::debug!(
            "Using interface {} (IN {:#04x}, OUT {:#04x})",
            iface_num,
            in_addr,
            out_addr
        );

        let interface = device
            .detach_and_claim_interface(iface_num)
            .wait()
            .map_err(|e| HidError::ClaimFailed(e.to_string()))?;

        let out_ep = interface
            .endpoint::<Interrupt, Out>(out_addr)
            .map_err(|e| HidError::ClaimFailed(e.to_string()))?;
        let in_ep = interface
            .endpoint::<Interrupt, In>(in_addr)
            .map_err(|e| HidError::ClaimFailed(e.to_string()))?;

        Ok(Self {
            out_ep,
            in_ep,
            timeout: config.timeout,
        })
    }

    /// List all connected programmers with the given VID/PID
    pub fn list_devices(vid: u16, pid: u16) -> Result<Vec<HidDeviceInfo>> {
        let devices = nusb::list_devices()
            .wait()
            .map_err(|e| HidError::OpenFailed(e.to_string()))?
            .filter(|d| d.vendor_id() == vid && d.product_id() == pid)
            .map(|d| HidDeviceInfo {
                bus: d.busnum(),
                address: d.device_address(),
                product: d.product_string().map(str::to_string),
                serial: d.serial_number().map(str::to_string),
            })
            .collect();

        Ok(devices)
    }

    fn send_report(&mut self, report: &Report) -> Result<()> {
        let mut buf = Buffer::new(REPORT_LEN);
        buf.extend_from_slice(report);

        self.out_ep
            .transfer_blocking(buf, self.timeout)
            .into_result()
            .map_err(|e| HidError::TransferFailed(e.to_string()))?;

        log::trace!("report out: {:02x?}", &report[..]);
        Ok(())
    }

    fn receive_report(&mut self) -> Result<Report> {
        let max_packet_size = self.in_ep.max_packet_size();
        let request_len = REPORT_LEN.div_ceil(max_packet_size) * max_packet_size;
        let mut buf = Buffer::new(request_len);
        buf.set_requested_len(request_len);

        let data = self
            .in_ep
            .transfer_blocking(buf, self.timeout)
            .into_result()
            .map_err(|e| HidError::TransferFailed(e.to_string()))?;

        if data.len() < REPORT_LEN {
            return Err(HidError::ShortReport(data.len()));
        }
        let mut report = [0u8; REPORT_LEN];
        report.copy_from_slice(&data[..REPORT_LEN]);

        log::trace!("report in: {:02x?}", &report[..]);
        Ok(report)
    }
}

impl ReportChannel for HidDevice {
    fn exchange(&mut self, request: &Report) -> Result<Report> {
        self.send_report(request)?;
        self.receive_report()
    }
}

/// Parse programmer options into a [`HidConfig`]
///
/// Supported options:
/// - `vid=<hex>` - USB vendor ID (default 16c0)
/// - `pid=<hex>` - USB product ID (default 05df)
/// - `index=<n>` - open the nth matching device
/// - `timeout=<seconds>` - per-report timeout
///
/// # Example
///
/// ```ignore
/// let options = vec![("index", "1"), ("timeout", "120")];
/// let config = parse_options(&options)?;
/// ```
pub fn parse_options(options: &[(&str, &str)]) -> Result<HidConfig> {
    let mut config = HidConfig::default();

    for (key, value) in options {
        match *key {
            "vid" => config.vid = parse_hex_u16(value)?,
            "pid" => config.pid = parse_hex_u16(value)?,
            "index" => {
                config.index = value
                    .parse()
                    .map_err(|_| HidError::InvalidParameter(format!("invalid index: {}", value)))?;
            }
            "timeout" => {
                let secs: u64 = value.parse().map_err(|_| {
                    HidError::InvalidParameter(format!("invalid timeout: {}", value))
                })?;
                config.timeout = Duration::from_secs(secs);
            }
            _ => {
                return Err(HidError::InvalidParameter(format!(
                    "unknown option: {}",
                    key
                )));
            }
        }
    }

    Ok(config)
}

fn parse_hex_u16(value: &str) -> Result<u16> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u16::from_str_radix(digits, 16)
        .map_err(|_| HidError::InvalidParameter(format!("invalid USB id: {}", value)))
}
