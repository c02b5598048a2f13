use std::time::{Duration, Instant};

use bytes::BytesMut;
use tracing::trace;
use wiiproxy_transport::{Transport, TransportError};

use crate::codec::{decode_frame, Frame, MAX_FRAME_SIZE};
use crate::direction::Direction;
use crate::error::StreamError;

const INITIAL_BUFFER_CAPACITY: usize = 2 * MAX_FRAME_SIZE;

/// Reads complete frames from a [`Transport`].
///
/// Handles partial reads internally; callers always get complete frames.
/// The reader does not own the transport so that the same link can be used
/// for writing and resetting between reads.
#[derive(Debug)]
pub struct FrameReader {
    buf: BytesMut,
    direction: Direction,
}

impl FrameReader {
    /// Create a reader expecting frames travelling in `direction`.
    pub fn new(direction: Direction) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            direction,
        }
    }

    /// Read the next complete frame, waiting at most `timeout` overall.
    ///
    /// Returns `TransportError::TimedOut` if no complete frame arrives in time.
    /// Bytes of an incomplete frame stay buffered; call [`clear`](Self::clear)
    /// to drop them.
    pub fn read_frame<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        timeout: Duration,
    ) -> Result<Frame, StreamError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(frame) = decode_frame(&mut self.buf, self.direction)? {
                return Ok(frame);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TransportError::TimedOut(timeout).into());
            }

            let mut chunk = [0u8; MAX_FRAME_SIZE];
            let read = match transport.read(&mut chunk, remaining) {
                Ok(n) => n,
                Err(TransportError::TimedOut(_)) => {
                    return Err(TransportError::TimedOut(timeout).into())
                }
                Err(err) => return Err(err.into()),
            };

            if read == 0 {
                return Err(TransportError::Closed.into());
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Drop every buffered byte, returning how many were discarded.
    pub fn clear(&mut self) -> usize {
        let dropped = self.buf.len();
        if dropped > 0 {
            trace!(dropped, "discarding buffered bytes");
        }
        self.buf.clear();
        dropped
    }

    /// Number of bytes buffered but not yet decoded.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}
