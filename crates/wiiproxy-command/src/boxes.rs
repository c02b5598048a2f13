//! Boxes: flight modes switched by aux channels.
//!
//! The controller reports which boxes it supports ([`BoxIds`]) and, for each
//! one, which aux switch positions enable it ([`BoxConfig`]). Raw integers
//! are validated into [`BoxId`] and [`BoxState`] when decoded; an unknown
//! value is an error, never a silent alias.

use crate::catalog::codes;
use crate::error::{CommandError, Result};
use crate::field::{FieldType, Value, Values};
use crate::layout::Layout;
use crate::record::{variable_elements, MspRecord};
use crate::records::expect_len;

macro_rules! int_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident as $kind:literal {
            $($variant:ident = $value:literal),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum $name {
            $($variant = $value),*
        }

        impl $name {
            /// Every variant in ascending value order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),*];

            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }
        }

        impl TryFrom<u8> for $name {
            type Error = CommandError;

            fn try_from(value: u8) -> Result<Self> {
                match value {
                    $($value => Ok(Self::$variant),)*
                    _ => Err(CommandError::InvalidEnumValue {
                        kind: $kind,
                        value: value.into(),
                    }),
                }
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> u8 {
                value as u8
            }
        }
    };
}

int_enum! {
    /// A box (flight mode) a MultiWii board may support.
    pub enum BoxId as "box id" {
        Arm = 0,
        Angle = 1,
        Horizon = 2,
        Baro = 3,
        Vario = 4,
        Mag = 5,
        HeadFree = 6,
        HeadAdj = 7,
        CamStab = 8,
        CamTrig = 9,
        GpsHome = 10,
        GpsHold = 11,
        Passthru = 12,
        Beeper = 13,
        LedMax = 14,
        LedLow = 15,
        LLights = 16,
        Calib = 17,
        Governor = 18,
        OsdSwitch = 19,
        Mission = 20,
        Land = 21,
    }
}

int_enum! {
    /// Position of an aux switch.
    pub enum BoxState as "box state" {
        Empty = 0,
        Low = 1,
        Mid = 2,
        High = 3,
    }
}

/// Number of aux channels one activation word can describe.
pub const AUX_CHANNELS: u8 = 4;

/// Which aux switch positions enable one box.
///
/// Bit `aux * 3 + (state - 1)` is set when the box is on while aux channel
/// `aux` (counting from 0) is in `state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BoxActivation(pub u16);

impl BoxActivation {
    fn bit(aux: u8, state: BoxState) -> Option<u16> {
        if aux >= AUX_CHANNELS || state == BoxState::Empty {
            return None;
        }
        Some(1 << (aux * 3 + (state as u8 - 1)))
    }

    pub fn is_enabled(self, aux: u8, state: BoxState) -> bool {
        Self::bit(aux, state).is_some_and(|bit| self.0 & bit != 0)
    }

    /// A copy with `state` on `aux` enabling the box. Out-of-range channels
    /// and [`BoxState::Empty`] leave the word unchanged.
    #[must_use]
    pub fn with(self, aux: u8, state: BoxState) -> Self {
        match Self::bit(aux, state) {
            Some(bit) => Self(self.0 | bit),
            None => self,
        }
    }

    /// Every `(aux, state)` pair that enables the box.
    pub fn enabled(self) -> Vec<(u8, BoxState)> {
        (0..AUX_CHANNELS)
            .flat_map(|aux| {
                [BoxState::Low, BoxState::Mid, BoxState::High].map(|state| (aux, state))
            })
            .filter(|&(aux, state)| self.is_enabled(aux, state))
            .collect()
    }
}

/// Boxes the firmware supports, in the order [`BoxConfig`] reports them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BoxIds {
    pub ids: Vec<BoxId>,
}

impl MspRecord for BoxIds {
    const CODE: u8 = codes::BOXIDS;
    const NAME: &'static str = "BOXIDS";

    fn layout() -> Layout {
        Layout::Variable(FieldType::U8)
    }

    fn from_values(values: &Values) -> Result<Self> {
        let ids = variable_elements::<u8>(Self::CODE, values)?
            .into_iter()
            .map(BoxId::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { ids })
    }

    fn to_values(&self) -> Values {
        self.ids.iter().map(|&id| Value::U8(id.into())).collect()
    }
}

/// Aux activation word for every supported box.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BoxConfig {
    pub activations: Vec<BoxActivation>,
}

impl BoxConfig {
    /// Pair each activation with the box it belongs to.
    pub fn with_ids(&self, ids: &BoxIds) -> Result<Vec<(BoxId, BoxActivation)>> {
        expect_len(Self::CODE, ids.ids.len(), self.activations.len())?;
        Ok(ids
            .ids
            .iter()
            .copied()
            .zip(self.activations.iter().copied())
            .collect())
    }
}

impl MspRecord for BoxConfig {
    const CODE: u8 = codes::BOX;
    const NAME: &'static str = "BOX";

    fn layout() -> Layout {
        Layout::Variable(FieldType::U16)
    }

    fn from_values(values: &Values) -> Result<Self> {
        Ok(Self {
            activations: variable_elements::<u16>(Self::CODE, values)?
                .into_iter()
                .map(BoxActivation)
                .collect(),
        })
    }

    fn to_values(&self) -> Values {
        self.activations.iter().map(|a| Value::U16(a.0)).collect()
    }
}
