use wiiproxy_frame::FrameError;

use crate::field::FieldType;

/// Why a payload or value tuple does not fit a layout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Mismatch {
    /// Wrong number of values for a fixed layout.
    #[error("expected {expected} values, got {actual}")]
    Arity { expected: usize, actual: usize },

    /// A value has a different primitive type than its field.
    #[error("value {index} is {actual}, layout expects {expected}")]
    Type {
        index: usize,
        expected: FieldType,
        actual: FieldType,
    },

    /// A fixed-layout payload has the wrong byte length.
    #[error("payload is {actual} bytes, layout needs {expected}")]
    Length { expected: usize, actual: usize },

    /// A variable-layout payload is not a whole number of elements.
    #[error("payload of {len} bytes is not a whole number of {element} elements")]
    Partial { len: usize, element: FieldType },

    /// An integer does not fit the field it is meant for.
    #[error("value {value} at index {index} does not fit {field}")]
    OutOfRange {
        index: usize,
        value: i64,
        field: FieldType,
    },

    /// The encoded payload does not fit the one-byte length field.
    #[error("encoded payload of {size} bytes exceeds 255")]
    TooLarge { size: usize },
}

/// Errors from the descriptor table and the payload codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// Command codes must lie in `100..=250`.
    #[error("command code {code} is outside 100..=250")]
    InvalidCode { code: u8 },

    /// A second descriptor was registered for an existing code.
    #[error("command code {code} is already registered")]
    DuplicateRegistration { code: u8 },

    /// A second descriptor was registered under an existing name.
    #[error("command name {name} is already registered")]
    DuplicateName { name: String },

    /// No descriptor exists for the code.
    #[error("command code {code} is not registered")]
    NotRegistered { code: u8 },

    /// Values or payload bytes do not match the command's layout.
    #[error("layout mismatch for command {code}: {mismatch}")]
    LayoutMismatch { code: u8, mismatch: Mismatch },

    /// A layout format string could not be parsed.
    #[error("invalid layout \"{format}\": {reason}")]
    InvalidLayout { format: String, reason: String },

    /// A set command was sent without values.
    #[error("command {code} requires values")]
    MissingValues { code: u8 },

    /// A get command was given values to send.
    #[error("command {code} does not take values")]
    UnexpectedValues { code: u8 },

    /// A raw integer does not name any variant of an enumeration.
    #[error("{value} is not a valid {kind}")]
    InvalidEnumValue { kind: &'static str, value: i64 },

    /// The bytes did not form a valid frame.
    #[error(transparent)]
    Frame(#[from] FrameError),
}

pub type Result<T> = std::result::Result<T, CommandError>;
