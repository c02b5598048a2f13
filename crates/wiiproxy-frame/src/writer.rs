use std::io::ErrorKind;

use wiiproxy_transport::{Transport, TransportError};

use crate::error::StreamError;

/// Writes complete frames to a [`Transport`].
///
/// Short writes and `Interrupted` errors are retried until the whole frame
/// is out, then the transport is flushed.
#[derive(Debug, Default)]
pub struct FrameWriter {
    _private: (),
}

impl FrameWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write pre-encoded frame bytes in full, then flush.
    pub fn write_bytes<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        wire: &[u8],
    ) -> Result<usize, StreamError> {
        let mut offset = 0usize;
        while offset < wire.len() {
            match transport.write(&wire[offset..]) {
                Ok(0) => return Err(TransportError::Closed.into()),
                Ok(n) => offset += n,
                Err(TransportError::Io(err)) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }

        transport.flush()?;
        Ok(offset)
    }
}
