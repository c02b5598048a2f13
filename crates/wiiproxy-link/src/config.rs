use std::time::Duration;

use crate::error::{LinkError, Result};
use crate::request::Priority;

/// Link worker settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Maximum queued requests. Default: 100.
    pub queue_capacity: usize,
    /// Pause after each write, for the controller's UART turnaround.
    /// Default: 5 ms.
    pub write_delay: Duration,
    /// How long to wait for a reply. Default: 250 ms.
    pub read_timeout: Duration,
    /// How long the worker waits for work before polling a default command.
    /// Default: 50 ms.
    pub idle_interval: Duration,
    /// Get commands polled round-robin while nothing else is queued.
    /// Default: none.
    pub default_commands: Vec<u8>,
    /// Priority used by `get` and `set`. Default: [`Priority::NORMAL`].
    pub default_priority: Priority,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 100,
            write_delay: Duration::from_millis(5),
            read_timeout: Duration::from_millis(250),
            idle_interval: Duration::from_millis(50),
            default_commands: Vec::new(),
            default_priority: Priority::NORMAL,
        }
    }
}

impl LinkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(LinkError::InvalidConfig(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.read_timeout.is_zero() {
            return Err(LinkError::InvalidConfig(
                "read_timeout must be positive".to_string(),
            ));
        }
        if self.idle_interval.is_zero() {
            return Err(LinkError::InvalidConfig(
                "idle_interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = LinkConfig::default();
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.write_delay, Duration::from_millis(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_values() {
        let config = LinkConfig {
            queue_capacity: 0,
            ..LinkConfig::default()
        };
        assert!(matches!(config.validate(), Err(LinkError::InvalidConfig(_))));

        let config = LinkConfig {
            read_timeout: Duration::ZERO,
            ..LinkConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
