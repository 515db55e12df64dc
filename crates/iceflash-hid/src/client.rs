//! High-level flash client
//!
//! [`FlasherClient`] turns byte-range requests into single-report
//! operations: reads in chunks of at most 63 bytes, writes in chunks of at
//! most 59 bytes that never cross a 256-byte page, and erases in whole
//! 64 KiB blocks.

use iceflash_core::chip::JedecId;
use iceflash_core::protocol::{
    split_response, FlashOperation, Report, MAX_PROGRAM_PAYLOAD, MAX_READ_PAYLOAD, STATUS_OK,
};
use iceflash_core::spi::{opcodes, FlashAddress, Status1};
use iceflash_core::Error as CoreError;

use crate::channel::ReportChannel;
use crate::error::{HidError, Result};

/// Flash operations over a [`ReportChannel`]
pub struct FlasherClient<C> {
    channel: C,
}

impl<C: ReportChannel> FlasherClient<C> {
    /// Wrap a channel
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    /// Borrow the channel
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Mutably borrow the channel
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Unwrap the channel
    pub fn into_inner(self) -> C {
        self.channel
    }

    /// Send one operation and check the response status
    fn transact(&mut self, op: &FlashOperation) -> Result<Report> {
        let response = self.channel.exchange(&op.encode())?;
        let (status, _) = split_response(&response);
        if status == STATUS_OK {
            return Ok(response);
        }
        match CoreError::from_status_code(status) {
            Some(e) => {
                log::debug!("{:?} failed: {}", op.tag(), e);
                Err(HidError::Device(e))
            }
            None => Err(HidError::UnknownStatus(status)),
        }
    }

    /// Reset the flash; required after power-on and after any error that
    /// left the device state unknown
    pub fn reset(&mut self) -> Result<()> {
        self.transact(&FlashOperation::Reset)?;
        Ok(())
    }

    /// Read the JEDEC ID
    pub fn identify(&mut self) -> Result<JedecId> {
        let response = self.transact(&FlashOperation::Identify)?;
        Ok(JedecId::from_bytes([response[1], response[2], response[3]]))
    }

    /// Put the flash into deep power-down
    pub fn power_down(&mut self) -> Result<()> {
        self.transact(&FlashOperation::PowerDown)?;
        Ok(())
    }

    /// Read status register 1
    pub fn read_status(&mut self) -> Result<Status1> {
        let response = self.transact(&FlashOperation::ReadStatus)?;
        Ok(Status1::from_bits_retain(response[1]))
    }

    /// Erase the whole chip
    pub fn chip_erase(&mut self) -> Result<()> {
        log::info!("Erasing entire chip...");
        self.transact(&FlashOperation::ChipErase)?;
        Ok(())
    }

    /// Erase the 64 KiB block at `address`
    pub fn erase_block(&mut self, address: u32) -> Result<()> {
        let address = flash_address(address)?;
        self.transact(&FlashOperation::BlockErase64K { address })?;
        Ok(())
    }

    /// Erase `len` bytes starting at `start`; both must be 64 KiB aligned
    pub fn erase_range(&mut self, start: u32, len: u32) -> Result<()> {
        self.erase_range_with_progress(start, len, |_| {})
    }

    /// Like [`erase_range`](Self::erase_range), calling `progress` with the
    /// number of bytes erased so far after every block
    pub fn erase_range_with_progress(
        &mut self,
        start: u32,
        len: u32,
        mut progress: impl FnMut(usize),
    ) -> Result<()> {
        if start % opcodes::BLOCK_64K != 0 || len % opcodes::BLOCK_64K != 0 {
            return Err(HidError::InvalidParameter(format!(
                "erase range {:#08x}+{:#x} is not 64 KiB aligned",
                start, len
            )));
        }
        check_range(start, len as usize)?;

        let mut done = 0u32;
        while done < len {
            self.erase_block(start + done)?;
            done += opcodes::BLOCK_64K;
            progress(done as usize);
        }
        Ok(())
    }

    /// Read `buf.len()` bytes starting at `address`
    pub fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<()> {
        self.read_with_progress(address, buf, |_| {})
    }

    /// Like [`read`](Self::read), calling `progress` with the number of
    /// bytes read so far after every report
    pub fn read_with_progress(
        &mut self,
        address: u32,
        buf: &mut [u8],
        mut progress: impl FnMut(usize),
    ) -> Result<()> {
        check_range(address, buf.len())?;

        let mut offset = 0usize;
        for chunk in buf.chunks_mut(MAX_READ_PAYLOAD) {
            let at = flash_address(address + offset as u32)?;
            let op = FlashOperation::read(at, chunk.len())
                .ok_or_else(|| HidError::InvalidParameter("read chunk too large".into()))?;
            let response = self.transact(&op)?;
            chunk.copy_from_slice(&response[1..1 + chunk.len()]);

            offset += chunk.len();
            progress(offset);
        }
        Ok(())
    }

    /// Program `data` starting at `address`
    ///
    /// The target range must already be erased. Chunks that are entirely
    /// 0xFF are skipped, since programming them cannot change the flash.
    pub fn write(&mut self, address: u32, data: &[u8]) -> Result<()> {
        self.write_with_progress(address, data, |_| {})
    }

    /// Like [`write`](Self::write), calling `progress` with the number of
    /// bytes written so far after every chunk
    pub fn write_with_progress(
        &mut self,
        address: u32,
        data: &[u8],
        mut progress: impl FnMut(usize),
    ) -> Result<()> {
        check_range(address, data.len())?;

        let mut offset = 0usize;
        while offset < data.len() {
            let at = address + offset as u32;
            let to_page_end = (opcodes::PAGE_SIZE - at % opcodes::PAGE_SIZE) as usize;
            let len = (data.len() - offset)
                .min(MAX_PROGRAM_PAYLOAD)
                .min(to_page_end);
            let chunk = &data[offset..offset + len];

            if chunk.iter().any(|&b| b != 0xFF) {
                let op = FlashOperation::page_program(flash_address(at)?, chunk)
                    .ok_or_else(|| HidError::InvalidParameter("write chunk too large".into()))?;
                self.transact(&op)?;
            }

            offset += len;
            progress(offset);
        }
        Ok(())
    }

    /// Read back `expected.len()` bytes at `address` and compare
    pub fn verify(&mut self, address: u32, expected: &[u8]) -> Result<()> {
        self.verify_with_progress(address, expected, |_| {})
    }

    /// Like [`verify`](Self::verify), reporting read progress
    pub fn verify_with_progress(
        &mut self,
        address: u32,
        expected: &[u8],
        progress: impl FnMut(usize),
    ) -> Result<()> {
        let mut actual = vec![0u8; expected.len()];
        self.read_with_progress(address, &mut actual, progress)?;

        match expected.iter().zip(&actual).position(|(e, a)| e != a) {
            Some(i) => Err(HidError::VerifyFailed {
                address: address + i as u32,
                expected: expected[i],
                found: actual[i],
            }),
            None => Ok(()),
        }
    }
}

fn flash_address(address: u32) -> Result<FlashAddress> {
    FlashAddress::new(address).ok_or(HidError::AddressOutOfRange(address as u64))
}

/// Reject ranges that leave the 24-bit address space; the device checks
/// against the real capacity
fn check_range(address: u32, len: usize) -> Result<()> {
    let end = address as u64 + len as u64;
    if end > FlashAddress::MAX as u64 + 1 {
        return Err(HidError::AddressOutOfRange(end - 1));
    }
    Ok(())
}
