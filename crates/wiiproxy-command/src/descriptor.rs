use serde::Serialize;

use crate::error::{CommandError, Result};
use crate::layout::Layout;

/// Lowest valid command code.
pub const MIN_CODE: u8 = 100;

/// Highest valid command code.
pub const MAX_CODE: u8 = 250;

/// Codes at or above this value are set commands.
pub const SET_THRESHOLD: u8 = 200;

/// Whether a command reads from or writes to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// Query; the request carries no payload.
    Get,
    /// Write; the request carries the caller's values.
    Set,
}

impl Kind {
    pub const fn from_code(code: u8) -> Self {
        if code >= SET_THRESHOLD {
            Self::Set
        } else {
            Self::Get
        }
    }

    pub const fn is_set(self) -> bool {
        matches!(self, Self::Set)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Set => "set",
        }
    }
}

/// Metadata for one command code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    code: u8,
    name: String,
    kind: Kind,
    layout: Layout,
}

impl Descriptor {
    /// Create a descriptor, rejecting codes outside `100..=250`.
    pub fn new(code: u8, name: impl Into<String>, layout: Layout) -> Result<Self> {
        if !(MIN_CODE..=MAX_CODE).contains(&code) {
            return Err(CommandError::InvalidCode { code });
        }
        Ok(Self {
            code,
            name: name.into(),
            kind: Kind::from_code(code),
            layout,
        })
    }

    pub fn code(&self) -> u8 {
        self.code
    }

    /// Upper-case name without the `MSP_` prefix, e.g. `ATTITUDE`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_threshold() {
        assert_eq!(Kind::from_code(150), Kind::Get);
        assert_eq!(Kind::from_code(199), Kind::Get);
        assert_eq!(Kind::from_code(200), Kind::Set);
        assert_eq!(Kind::from_code(250), Kind::Set);
    }

    #[test]
    fn code_range_is_enforced() {
        for code in [0, 99, 251, 255] {
            assert_eq!(
                Descriptor::new(code, "X", Layout::empty()),
                Err(CommandError::InvalidCode { code })
            );
        }
        let low = Descriptor::new(100, "LOW", Layout::empty()).unwrap();
        let high = Descriptor::new(250, "HIGH", Layout::empty()).unwrap();
        assert_eq!(low.kind(), Kind::Get);
        assert_eq!(high.kind(), Kind::Set);
    }
}
