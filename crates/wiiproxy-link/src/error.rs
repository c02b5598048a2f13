use std::sync::Arc;
use std::time::Duration;

use wiiproxy_command::CommandError;
use wiiproxy_frame::{FrameError, StreamError};
use wiiproxy_transport::TransportError;

/// Errors delivered to callers of a link.
///
/// Cloneable so one transport failure can resolve every affected request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LinkError {
    /// The request was malformed, or the reply did not fit the layout.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The reply was corrupt or the controller rejected the command.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// No reply arrived in time.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The request queue is at capacity.
    #[error("request queue full (capacity {capacity})")]
    QueueFull { capacity: usize },

    /// The transport failed; the link has stopped.
    #[error("transport error: {0}")]
    Transport(Arc<TransportError>),

    /// The reply was for a different command.
    #[error("expected a response to command {expected}, got {found}")]
    UnexpectedResponse { expected: u8, found: u8 },

    /// The request was cancelled before it was sent.
    #[error("request cancelled")]
    Cancelled,

    /// The link was stopped before the request was served.
    #[error("link stopped")]
    Stopped,

    /// The link configuration cannot be used.
    #[error("invalid link configuration: {0}")]
    InvalidConfig(String),
}

impl LinkError {
    /// Whether this error stops the worker.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<TransportError> for LinkError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::TimedOut(after) => Self::Timeout(after),
            other => Self::Transport(Arc::new(other)),
        }
    }
}

impl From<StreamError> for LinkError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Frame(err) => err.into(),
            StreamError::Transport(err) => err.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LinkError>;
