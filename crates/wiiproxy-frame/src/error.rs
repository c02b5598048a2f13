use wiiproxy_transport::TransportError;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The leading bytes are not the expected `$M` + direction marker.
    #[error(
        "preamble mismatch (expected \"{}\", found \"{}\")",
        .expected.escape_ascii(),
        .found.escape_ascii()
    )]
    PreambleMismatch { expected: [u8; 3], found: Vec<u8> },

    /// The received checksum does not match the recomputed one.
    #[error("checksum mismatch for code {code} (computed 0x{computed:02x}, received 0x{received:02x})")]
    ChecksumMismatch { code: u8, computed: u8, received: u8 },

    /// The payload does not fit the one-byte length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The buffer ended before the frame did.
    #[error("truncated frame ({available} of {needed} bytes)")]
    Truncated { needed: usize, available: usize },

    /// The controller answered with an error frame (`$M!`).
    #[error("controller rejected command {code}")]
    ErrorResponse { code: u8 },
}

/// Errors from reading or writing frames over a transport.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The bytes on the wire did not form a valid frame.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// The transport failed or timed out.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
