use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::direction::{Direction, ERROR_MARKER, PREAMBLE_PREFIX};
use crate::error::{FrameError, Result};

/// Preamble (3) + length (1) + code (1) = 5 bytes.
pub const HEADER_SIZE: usize = 5;

/// Trailing checksum byte.
pub const CHECKSUM_SIZE: usize = 1;

/// The length field is one byte.
pub const MAX_PAYLOAD: usize = u8::MAX as usize;

/// Largest possible frame on the wire.
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD + CHECKSUM_SIZE;

const PREAMBLE_SIZE: usize = 3;

/// A framed MSP message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Which way the frame travels.
    pub direction: Direction,
    /// The command code.
    pub code: u8,
    /// The message payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(direction: Direction, code: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            direction,
            code,
            payload: payload.into(),
        }
    }

    /// The checksum this frame carries on the wire.
    ///
    /// Only meaningful for payloads of at most [`MAX_PAYLOAD`] bytes.
    pub fn checksum(&self) -> u8 {
        checksum(self.payload.len() as u8, self.code, &self.payload)
    }

    /// The total wire size of this frame (header + payload + checksum).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len() + CHECKSUM_SIZE
    }

    /// Encode this frame into a fresh buffer.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        encode_frame(self.direction, self.code, &self.payload, &mut buf)?;
        Ok(buf.freeze())
    }
}

/// Running XOR over length, code and every payload byte, seeded at 0.
pub fn checksum(length: u8, code: u8, payload: &[u8]) -> u8 {
    payload.iter().fold(length ^ code, |acc, byte| acc ^ byte)
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌────────────┬────────┬──────┬──────────────────┬──────────┐
/// │ Preamble   │ Length │ Code │ Payload          │ Checksum │
/// │ '$' 'M' d  │ (1B)   │ (1B) │ (Length bytes)   │ (1B XOR) │
/// └────────────┴────────┴──────┴──────────────────┴──────────┘
/// ```
/// `d` is `>` for host-to-controller and `<` for controller-to-host.
pub fn encode_frame(
    direction: Direction,
    code: u8,
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    let length = payload.len() as u8;

    dst.reserve(HEADER_SIZE + payload.len() + CHECKSUM_SIZE);
    dst.put_slice(&direction.preamble());
    dst.put_u8(length);
    dst.put_u8(code);
    dst.put_slice(payload);
    dst.put_u8(checksum(length, code, payload));
    Ok(())
}

/// Decode a frame travelling in `expected` direction from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer. A frame with a bad
/// checksum, or a controller error frame (`$M!`), is consumed as well; a bad
/// preamble is left in place for the caller to discard.
pub fn decode_frame(src: &mut BytesMut, expected: Direction) -> Result<Option<Frame>> {
    let preamble = expected.preamble();
    let seen = src.len().min(PREAMBLE_SIZE);

    let is_error_reply = expected == Direction::ControllerToHost
        && seen == PREAMBLE_SIZE
        && src[..2] == PREAMBLE_PREFIX
        && src[2] == ERROR_MARKER;

    if !is_error_reply && src[..seen] != preamble[..seen] {
        return Err(FrameError::PreambleMismatch {
            expected: preamble,
            found: src[..seen].to_vec(),
        });
    }

    if src.len() < HEADER_SIZE {
        return Ok(None); // Need more data
    }

    let length = src[3];
    let code = src[4];
    let total = HEADER_SIZE + length as usize + CHECKSUM_SIZE;
    if src.len() < total {
        return Ok(None); // Need more data
    }

    let mut raw = src.split_to(total);
    raw.advance(HEADER_SIZE);
    let payload = raw.split_to(length as usize).freeze();
    let received = raw.get_u8();

    let computed = checksum(length, code, &payload);
    if computed != received {
        return Err(FrameError::ChecksumMismatch {
            code,
            computed,
            received,
        });
    }

    if is_error_reply {
        return Err(FrameError::ErrorResponse { code });
    }

    Ok(Some(Frame {
        direction: expected,
        code,
        payload,
    }))
}
