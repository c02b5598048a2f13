use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Deadlines closer than this to the programmed timeout reuse it, so a
/// caller counting down a deadline does not reprogram the port on every read.
const TIMEOUT_SLACK: Duration = Duration::from_millis(10);

/// Serial line settings. MultiWii boards talk 8N1 without flow control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Line speed in baud. Default: 115200.
    pub baud_rate: u32,
    /// Read timeout applied when the port is opened.
    pub initial_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            initial_timeout: Duration::from_millis(100),
        }
    }
}

/// Serial port transport.
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
    path: String,
    timeout: Duration,
}

impl SerialTransport {
    /// Open the serial device at `path`.
    pub fn open(path: impl Into<String>, config: &SerialConfig) -> Result<Self> {
        let path = path.into();
        let port = serialport::new(path.as_str(), config.baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .timeout(config.initial_timeout)
            .open()
            .map_err(|e| TransportError::Open {
                path: path.clone(),
                source: e.into(),
            })?;

        info!(%path, baud = config.baud_rate, "opened serial port");

        Ok(Self {
            port: Some(port),
            path,
            timeout: config.initial_timeout,
        })
    }

    /// The device path this transport was opened on.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or(TransportError::Closed)
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let port = self.port()?;
        loop {
            match port.write(bytes) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn flush(&mut self) -> Result<()> {
        self.port()?.flush().map_err(Into::into)
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        if needs_retune(self.timeout, timeout) {
            self.port()?
                .set_timeout(timeout)
                .map_err(|e| TransportError::Io(e.into()))?;
            self.timeout = timeout;
        }

        let port = self.port()?;
        loop {
            match port.read(buf) {
                // A tty read that returns nothing before VTIME is a timeout, not EOF.
                Ok(0) => return Err(TransportError::TimedOut(timeout)),
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::TimedOut => {
                    return Err(TransportError::TimedOut(timeout))
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn reset_input_buffer(&mut self) -> Result<()> {
        self.port()?
            .clear(ClearBuffer::Input)
            .map_err(|e| TransportError::Io(e.into()))
    }

    fn reset_output_buffer(&mut self) -> Result<()> {
        self.port()?
            .clear(ClearBuffer::Output)
            .map_err(|e| TransportError::Io(e.into()))
    }

    fn close(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            debug!(path = %self.path, "closed serial port");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "serial"
    }
}

fn needs_retune(current: Duration, requested: Duration) -> bool {
    current.abs_diff(requested) > TIMEOUT_SLACK
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("path", &self.path)
            .field("open", &self.port.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_multiwii_baud() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, 115_200);
    }

    #[test]
    fn shrinking_deadline_keeps_port_timeout() {
        let programmed = Duration::from_millis(250);
        assert!(!needs_retune(programmed, Duration::from_millis(250)));
        assert!(!needs_retune(programmed, Duration::from_millis(243)));
        assert!(!needs_retune(programmed, programmed - TIMEOUT_SLACK));
        assert!(needs_retune(programmed, Duration::from_millis(120)));
        assert!(needs_retune(programmed, Duration::from_secs(1)));
    }

    #[test]
    fn open_missing_device_reports_path() {
        let result = SerialTransport::open("/dev/wiiproxy-does-not-exist", &SerialConfig::default());
        match result {
            Err(TransportError::Open { path, .. }) => {
                assert_eq!(path, "/dev/wiiproxy-does-not-exist")
            }
            other => panic!("expected open error, got {other:?}"),
        }
    }
}
