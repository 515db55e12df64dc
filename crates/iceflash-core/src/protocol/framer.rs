//! Report-to-operation dispatcher

use maybe_async::maybe_async;

use super::{FlashOperation, Report, REPORT_LEN, STATUS_OK};
use crate::driver::FlashDriver;
use crate::error::Error;
use crate::transport::{FlashTransport, NoResetLine, ResetLine};

/// Turns each request report into one driver operation and one response
///
/// Every request gets exactly one response, including malformed ones. On
/// failure the response carries only the status byte; the payload is
/// zero-filled.
pub struct CommandFramer<T, R = NoResetLine> {
    driver: FlashDriver<T, R>,
}

impl<T: FlashTransport, R: ResetLine> CommandFramer<T, R> {
    /// Wrap a driver
    pub fn new(driver: FlashDriver<T, R>) -> Self {
        Self { driver }
    }

    /// Borrow the driver
    pub fn driver(&self) -> &FlashDriver<T, R> {
        &self.driver
    }

    /// Mutably borrow the driver
    pub fn driver_mut(&mut self) -> &mut FlashDriver<T, R> {
        &mut self.driver
    }

    /// Unwrap the driver
    pub fn into_driver(self) -> FlashDriver<T, R> {
        self.driver
    }

    /// Handle one request report and build its response
    #[maybe_async]
    pub async fn dispatch(&mut self, request: &Report) -> Report {
        log::trace!("report in: {:02x?}", &request[..]);

        let mut response = [0u8; REPORT_LEN];
        let result = match FlashOperation::decode(request) {
            Ok(op) => {
                if op.is_mutating() {
                    log::debug!("dispatch {:?} (modifies flash)", op.tag());
                } else {
                    log::trace!("dispatch {:?}", op.tag());
                }
                self.execute(&op, &mut response[1..]).await
            }
            Err(e) => {
                log::warn!("rejected report with tag {:#04x}: {}", request[0], e);
                Err(Error::Framing(e))
            }
        };

        match result {
            Ok(()) => response[0] = STATUS_OK,
            Err(e) => {
                log::warn!("operation failed: {}", e);
                response = [0u8; REPORT_LEN];
                response[0] = e.status_code();
            }
        }
        response
    }

    #[maybe_async]
    async fn execute(&mut self, op: &FlashOperation, payload: &mut [u8]) -> Result<(), Error> {
        match op {
            FlashOperation::Identify => {
                let id = self.driver.identify().await?;
                payload[..3].copy_from_slice(&id.to_bytes());
            }
            FlashOperation::Reset => self.driver.reset().await?,
            FlashOperation::PowerDown => self.driver.power_down().await?,
            FlashOperation::ReadStatus => {
                let status = self.driver.read_status().await?;
                payload[0] = status.bits();
            }
            FlashOperation::ChipErase => self.driver.chip_erase().await?,
            FlashOperation::BlockErase64K { address } => {
                self.driver.block_erase_64k(*address).await?
            }
            FlashOperation::PageProgram { address, data } => {
                self.driver.page_program(*address, data).await?
            }
            FlashOperation::Read { address, length } => {
                self.driver
                    .read(*address, &mut payload[..*length as usize])
                    .await?
            }
        }
        Ok(())
    }
}
