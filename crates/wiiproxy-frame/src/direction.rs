//! Message direction markers.
//!
//! Every preamble starts with `$M`; the third byte says which way the
//! message travels.

/// First two preamble bytes shared by every MSP v1 frame.
pub const PREAMBLE_PREFIX: [u8; 2] = *b"$M";

/// Third preamble byte of a controller error reply.
pub const ERROR_MARKER: u8 = b'!';

/// Which way a frame travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Host to flight controller (`$M>`).
    HostToController,
    /// Flight controller to host (`$M<`).
    ControllerToHost,
}

impl Direction {
    /// The direction marker byte.
    pub const fn marker(self) -> u8 {
        match self {
            Self::HostToController => b'>',
            Self::ControllerToHost => b'<',
        }
    }

    /// The full 3-byte preamble.
    pub const fn preamble(self) -> [u8; 3] {
        [PREAMBLE_PREFIX[0], PREAMBLE_PREFIX[1], self.marker()]
    }
}
