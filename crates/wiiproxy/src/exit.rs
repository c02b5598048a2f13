use std::fmt;
use std::io;

use wiiproxy_command::CommandError;
use wiiproxy_frame::FrameError;
use wiiproxy_link::LinkError;
use wiiproxy_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

fn io_code(err: &io::Error) -> i32 {
    match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        _ => TRANSPORT_ERROR,
    }
}

pub fn transport_error(context: &str, err: &TransportError) -> CliError {
    let code = match err {
        TransportError::Open { source, .. } | TransportError::Io(source) => {
            match io_code(source) {
                PERMISSION_DENIED => PERMISSION_DENIED,
                _ => TRANSPORT_ERROR,
            }
        }
        TransportError::TimedOut(_) => TIMEOUT,
        TransportError::Closed => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: &FrameError) -> CliError {
    let code = match err {
        FrameError::ErrorResponse { .. } => FAILURE,
        FrameError::PayloadTooLarge { .. }
        | FrameError::PreambleMismatch { .. }
        | FrameError::ChecksumMismatch { .. }
        | FrameError::Truncated { .. } => DATA_INVALID,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn command_error(context: &str, err: &CommandError) -> CliError {
    match err {
        CommandError::Frame(err) => frame_error(context, err),
        CommandError::InvalidCode { .. }
        | CommandError::NotRegistered { .. }
        | CommandError::MissingValues { .. }
        | CommandError::UnexpectedValues { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        CommandError::DuplicateRegistration { .. } | CommandError::DuplicateName { .. } => {
            CliError::new(INTERNAL, format!("{context}: {err}"))
        }
        _ => CliError::new(DATA_INVALID, format!("{context}: {err}")),
    }
}

pub fn link_error(context: &str, err: &LinkError) -> CliError {
    match err {
        LinkError::Command(err) => command_error(context, err),
        LinkError::Frame(err) => frame_error(context, err),
        LinkError::Transport(err) => transport_error(context, err),
        LinkError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        LinkError::UnexpectedResponse { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        LinkError::InvalidConfig(_) => CliError::new(USAGE, format!("{context}: {err}")),
        LinkError::QueueFull { .. } | LinkError::Cancelled | LinkError::Stopped => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
    }
}
