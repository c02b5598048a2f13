//! Byte-stream transport abstraction for MSP links.
//!
//! The link worker only ever talks to a [`Transport`]: a blocking byte stream
//! with a read deadline and the ability to discard buffered bytes in either
//! direction. Two implementations ship here:
//! - [`SerialTransport`] over a serial device (behind the `serial` feature)
//! - [`MemoryTransport`], an in-process stand-in for a flight controller
//!
//! This is the lowest layer of wiiproxy. Everything else builds on top of
//! the [`Transport`] trait provided here.

pub mod error;
pub mod memory;
pub mod traits;

#[cfg(feature = "serial")]
pub mod serial;

pub use error::{Result, TransportError};
pub use memory::{MemoryHandle, MemoryTransport};
pub use traits::Transport;

#[cfg(feature = "serial")]
pub use serial::{SerialConfig, SerialTransport};
