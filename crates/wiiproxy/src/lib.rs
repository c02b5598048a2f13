//! Host-side driver for the MultiWii Serial Protocol.
//!
//! wiiproxy lets many callers share one serial link to a MultiWii flight
//! controller. Requests are prioritized, at most one per command is in
//! flight, and the latest reply for every command is kept as a snapshot.
//!
//! # Crate Structure
//!
//! - [`transport`]: Byte-stream transport (serial port, in-memory)
//! - [`frame`]: MSP v1 framing and checksum
//! - [`command`]: Command descriptors, payload layouts and the MultiWii catalog
//! - [`link`]: Request scheduler, link worker and snapshot store

/// Re-export transport types.
pub mod transport {
    pub use wiiproxy_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use wiiproxy_frame::*;
}

/// Re-export command types.
pub mod command {
    pub use wiiproxy_command::*;
}

/// Re-export link types.
pub mod link {
    pub use wiiproxy_link::*;
}

#[cfg(feature = "serial")]
pub use connect::connect;

#[cfg(feature = "serial")]
mod connect {
    use wiiproxy_command::multiwii;
    use wiiproxy_link::{Link, LinkConfig, LinkError};
    use wiiproxy_transport::{SerialConfig, SerialTransport};

    /// Open `path` and start a link speaking the MultiWii command catalog.
    ///
    /// ```no_run
    /// use wiiproxy::command::records::Attitude;
    /// use wiiproxy::link::LinkConfig;
    /// use wiiproxy::transport::SerialConfig;
    ///
    /// let link = wiiproxy::connect("/dev/ttyUSB0", &SerialConfig::default(), LinkConfig::default())?;
    /// let attitude: Attitude = link.request_record()?;
    /// println!("heading {}", attitude.heading);
    /// # Ok::<(), wiiproxy::link::LinkError>(())
    /// ```
    pub fn connect(
        path: &str,
        serial: &SerialConfig,
        config: LinkConfig,
    ) -> Result<Link<SerialTransport>, LinkError> {
        let transport = SerialTransport::open(path, serial)?;
        let mut link = Link::new(transport, multiwii()?, config)?;
        link.start()?;
        Ok(link)
    }
}
