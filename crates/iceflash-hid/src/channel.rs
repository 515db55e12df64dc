//! Report exchange abstraction

use iceflash_core::protocol::Report;

use crate::error::Result;

/// One request report out, one response report back
///
/// Implementations must not pipeline: the next request is only sent after
/// the previous response arrived.
pub trait ReportChannel {
    /// Send `request` and wait for its response
    fn exchange(&mut self, request: &Report) -> Result<Report>;
}

impl<C: ReportChannel + ?Sized> ReportChannel for &mut C {
    fn exchange(&mut self, request: &Report) -> Result<Report> {
        (**self).exchange(request)
    }
}

impl<C: ReportChannel + ?Sized> ReportChannel for Box<C> {
    fn exchange(&mut self, request: &Report) -> Result<Report> {
        (**self).exchange(request)
    }
}
