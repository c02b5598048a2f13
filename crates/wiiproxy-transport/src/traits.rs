use std::time::Duration;

use crate::error::Result;

/// A blocking, byte-oriented link to a flight controller.
///
/// Opening happens in the implementation's constructor. After that the link
/// worker is the only caller, so implementations need `Send` but not `Sync`.
pub trait Transport: Send {
    /// Write some bytes, returning how many were accepted.
    fn write(&mut self, bytes: &[u8]) -> Result<usize>;

    /// Push any buffered output onto the wire.
    fn flush(&mut self) -> Result<()>;

    /// Read at least one byte into `buf`, waiting at most `timeout`.
    ///
    /// Returns `TransportError::TimedOut` when nothing arrives in time and
    /// `TransportError::Closed` once the stream has ended.
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Discard bytes received but not yet read.
    fn reset_input_buffer(&mut self) -> Result<()>;

    /// Discard bytes written but not yet transmitted.
    fn reset_output_buffer(&mut self) -> Result<()>;

    /// Release the underlying device. Further operations fail with `Closed`.
    fn close(&mut self) -> Result<()>;

    /// Transport name for diagnostics.
    fn name(&self) -> &str {
        "transport"
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        (**self).write(bytes)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        (**self).read(buf, timeout)
    }

    fn reset_input_buffer(&mut self) -> Result<()> {
        (**self).reset_input_buffer()
    }

    fn reset_output_buffer(&mut self) -> Result<()> {
        (**self).reset_output_buffer()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
