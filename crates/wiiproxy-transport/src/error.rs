use std::time::Duration;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the device at the specified path.
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    /// An I/O error occurred on the underlying stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No bytes arrived before the read deadline.
    #[error("read timed out after {0:?}")]
    TimedOut(Duration),

    /// The transport has been closed.
    #[error("transport closed")]
    Closed,
}

impl TransportError {
    /// Whether this error only means "nothing arrived in time".
    ///
    /// Timeouts are recoverable; every other variant means the link is gone.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
