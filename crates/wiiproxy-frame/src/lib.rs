//! MultiWii Serial Protocol (v1) message framing.
//!
//! Every message is framed as:
//! - A 3-byte preamble: `$`, `M` and a direction marker (`>` to the
//!   controller, `<` from it)
//! - A 1-byte payload length
//! - A 1-byte command code
//! - The payload, then a 1-byte XOR checksum over length, code and payload
//!
//! No partial reads, no buffer management in user code.

pub mod codec;
pub mod direction;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    checksum, decode_frame, encode_frame, Frame, CHECKSUM_SIZE, HEADER_SIZE, MAX_FRAME_SIZE,
    MAX_PAYLOAD,
};
pub use direction::{Direction, ERROR_MARKER, PREAMBLE_PREFIX};
pub use error::{FrameError, Result, StreamError};
pub use reader::FrameReader;
pub use writer::FrameWriter;
