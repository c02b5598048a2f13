//! Typed records for the common MultiWii commands.

use crate::catalog::codes;
use crate::error::{CommandError, Mismatch, Result};
use crate::field::{FieldType, Value, Values};
use crate::layout::Layout;
use crate::msp_record;
use crate::record::{variable_elements, MspRecord};

msp_record! {
    /// Firmware identification.
    pub struct Ident(codes::IDENT, "IDENT") {
        pub version: u8,
        pub multitype: u8,
        pub msp_version: u8,
        pub capability: u32,
    }
}

msp_record! {
    /// Loop timing, sensor presence and active boxes.
    pub struct Status(codes::STATUS, "STATUS") {
        pub cycle_time: u16,
        pub i2c_errors: u16,
        pub sensors: u16,
        /// Bit `n` set when the box with index `n` is active.
        pub flags: u32,
        pub current_setting: u8,
    }
}

msp_record! {
    pub struct RawImu(codes::RAW_IMU, "RAW_IMU") {
        pub acc_x: i16,
        pub acc_y: i16,
        pub acc_z: i16,
        pub gyro_x: i16,
        pub gyro_y: i16,
        pub gyro_z: i16,
        pub mag_x: i16,
        pub mag_y: i16,
        pub mag_z: i16,
    }
}

msp_record! {
    /// GPS fix. Coordinates are degrees × 10⁷.
    pub struct RawGps(codes::RAW_GPS, "RAW_GPS") {
        pub fix: u8,
        pub satellites: u8,
        pub latitude: i32,
        pub longitude: i32,
        /// Metres.
        pub altitude: u16,
        /// cm/s.
        pub speed: u16,
        /// Degrees × 10.
        pub ground_course: u16,
    }
}

msp_record! {
    pub struct CompGps(codes::COMP_GPS, "COMP_GPS") {
        /// Metres.
        pub distance_to_home: u16,
        /// Degrees.
        pub direction_to_home: u16,
        pub update: u8,
    }
}

msp_record! {
    /// Craft attitude. Roll and pitch in tenths of a degree, heading in degrees.
    pub struct Attitude(codes::ATTITUDE, "ATTITUDE") {
        pub roll: i16,
        pub pitch: i16,
        pub heading: i16,
    }
}

msp_record! {
    pub struct Altitude(codes::ALTITUDE, "ALTITUDE") {
        /// Estimated altitude in centimetres.
        pub estimated: i32,
        /// cm/s.
        pub vario: i16,
    }
}

msp_record! {
    pub struct Analog(codes::ANALOG, "ANALOG") {
        /// Battery voltage in tenths of a volt.
        pub vbat: u8,
        pub power_meter_sum: u16,
        pub rssi: u16,
        pub amperage: u16,
    }
}

msp_record! {
    pub struct RcTuning(codes::RC_TUNING, "RC_TUNING") {
        pub rc_rate: u8,
        pub rc_expo: u8,
        pub roll_pitch_rate: u8,
        pub yaw_rate: u8,
        pub dynamic_throttle_pid: u8,
        pub throttle_mid: u8,
        pub throttle_expo: u8,
    }
}

msp_record! {
    /// Override RC channels. Values in microseconds, 1000..=2000.
    pub struct SetRawRc(codes::SET_RAW_RC, "SET_RAW_RC") {
        pub roll: u16,
        pub pitch: u16,
        pub yaw: u16,
        pub throttle: u16,
        pub aux1: u16,
        pub aux2: u16,
        pub aux3: u16,
        pub aux4: u16,
    }
}

msp_record! {
    pub struct SetRawGps(codes::SET_RAW_GPS, "SET_RAW_GPS") {
        pub fix: u8,
        pub satellites: u8,
        pub latitude: i32,
        pub longitude: i32,
        pub altitude: u16,
        pub speed: u16,
    }
}

msp_record! {
    /// Heading-hold target in degrees.
    pub struct SetHead(codes::SET_HEAD, "SET_HEAD") {
        pub heading: i16,
    }
}

/// Number of PID controllers a MultiWii board reports.
pub const PID_ITEMS: usize = 10;

/// One PID controller's gains as raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PidTerm {
    pub p: u8,
    pub i: u8,
    pub d: u8,
}

/// Index of each controller in [`Pid::terms`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PidItem {
    Roll = 0,
    Pitch = 1,
    Yaw = 2,
    Alt = 3,
    Pos = 4,
    PosR = 5,
    NavR = 6,
    Level = 7,
    Mag = 8,
    Vel = 9,
}

/// PID gains for all ten controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pid {
    pub terms: [PidTerm; PID_ITEMS],
}

impl Pid {
    pub fn term(&self, item: PidItem) -> PidTerm {
        self.terms[item as usize]
    }
}

impl MspRecord for Pid {
    const CODE: u8 = codes::PID;
    const NAME: &'static str = "PID";

    fn layout() -> Layout {
        Layout::Fixed(vec![FieldType::U8; PID_ITEMS * 3])
    }

    fn from_values(values: &Values) -> Result<Self> {
        Self::layout()
            .check(values)
            .map_err(|mismatch| CommandError::LayoutMismatch {
                code: Self::CODE,
                mismatch,
            })?;
        let bytes = variable_elements::<u8>(Self::CODE, values)?;

        let mut pid = Pid::default();
        for (term, gains) in pid.terms.iter_mut().zip(bytes.chunks_exact(3)) {
            *term = PidTerm {
                p: gains[0],
                i: gains[1],
                d: gains[2],
            };
        }
        Ok(pid)
    }

    fn to_values(&self) -> Values {
        self.terms
            .iter()
            .flat_map(|t| [t.p, t.i, t.d])
            .map(Value::U8)
            .collect()
    }
}

/// RC channel values in microseconds; the count depends on the board.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rc {
    pub channels: Vec<u16>,
}

impl Rc {
    pub fn roll(&self) -> Option<u16> {
        self.channels.first().copied()
    }

    pub fn pitch(&self) -> Option<u16> {
        self.channels.get(1).copied()
    }

    pub fn yaw(&self) -> Option<u16> {
        self.channels.get(2).copied()
    }

    pub fn throttle(&self) -> Option<u16> {
        self.channels.get(3).copied()
    }

    /// Auxiliary channel `n`, counting from 1.
    pub fn aux(&self, n: usize) -> Option<u16> {
        n.checked_sub(1)
            .and_then(|i| self.channels.get(4 + i))
            .copied()
    }
}

impl MspRecord for Rc {
    const CODE: u8 = codes::RC;
    const NAME: &'static str = "RC";

    fn layout() -> Layout {
        Layout::Variable(FieldType::U16)
    }

    fn from_values(values: &Values) -> Result<Self> {
        Ok(Self {
            channels: variable_elements(Self::CODE, values)?,
        })
    }

    fn to_values(&self) -> Values {
        self.channels.iter().copied().map(Value::U16).collect()
    }
}

/// Decode a `;`-separated name list carried as raw bytes.
fn names_from_values(code: u8, values: &Values) -> Result<Vec<String>> {
    let bytes = variable_elements::<u8>(code, values)?;
    Ok(String::from_utf8_lossy(&bytes)
        .split(';')
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect())
}

fn names_to_values(names: &[String]) -> Values {
    names
        .iter()
        .flat_map(|name| name.bytes().chain(std::iter::once(b';')))
        .map(Value::U8)
        .collect()
}

macro_rules! name_list {
    ($(#[$meta:meta])* $name:ident, $code:expr, $wire:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Default)]
        pub struct $name {
            pub names: Vec<String>,
        }

        impl MspRecord for $name {
            const CODE: u8 = $code;
            const NAME: &'static str = $wire;

            fn layout() -> Layout {
                Layout::Variable(FieldType::U8)
            }

            fn from_values(values: &Values) -> Result<Self> {
                Ok(Self {
                    names: names_from_values(Self::CODE, values)?,
                })
            }

            fn to_values(&self) -> Values {
                names_to_values(&self.names)
            }
        }
    };
}

name_list!(
    /// Names of the boxes the firmware supports, in box index order.
    BoxNames,
    codes::BOXNAMES,
    "BOXNAMES"
);

name_list!(
    /// Names of the PID controllers, in [`PidItem`] order.
    PidNames,
    codes::PIDNAMES,
    "PIDNAMES"
);

/// Check an element count against a fixed expectation.
pub(crate) fn expect_len(code: u8, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(CommandError::LayoutMismatch {
            code,
            mismatch: Mismatch::Arity { expected, actual },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attitude_from_values() {
        let values = Values::new(vec![Value::I16(10), Value::I16(-20), Value::I16(180)]);
        let attitude = Attitude::from_values(&values).unwrap();
        assert_eq!(
            attitude,
            Attitude {
                roll: 10,
                pitch: -20,
                heading: 180
            }
        );
        assert_eq!(attitude.to_values(), values);
        assert_eq!(Attitude::layout().format_string(), "3h");
    }

    #[test]
    fn raw_gps_layout_and_values() {
        assert_eq!(RawGps::layout().format_string(), "2B2i3H");
        let gps = RawGps {
            fix: 1,
            satellites: 9,
            latitude: 473_977_420,
            longitude: -85_455_940,
            altitude: 488,
            speed: 12,
            ground_course: 900,
        };
        assert_eq!(RawGps::from_values(&gps.to_values()).unwrap(), gps);
    }

    #[test]
    fn rc_tuning_rejects_wrong_types() {
        let values: Values = (0..7).map(|_| Value::U16(1)).collect();
        assert!(matches!(
            RcTuning::from_values(&values),
            Err(CommandError::LayoutMismatch {
                code: codes::RC_TUNING,
                mismatch: Mismatch::Type { index: 0, .. }
            })
        ));
    }

    #[test]
    fn pid_groups_bytes_into_terms() {
        let values: Values = (0..30u8).map(Value::U8).collect();
        let pid = Pid::from_values(&values).unwrap();

        assert_eq!(pid.term(PidItem::Roll), PidTerm { p: 0, i: 1, d: 2 });
        assert_eq!(pid.term(PidItem::Vel), PidTerm { p: 27, i: 28, d: 29 });
        assert_eq!(pid.to_values(), values);
    }

    #[test]
    fn pid_needs_thirty_bytes() {
        let values: Values = (0..29u8).map(Value::U8).collect();
        assert!(Pid::from_values(&values).is_err());
    }

    #[test]
    fn rc_channels() {
        let values: Values = [1500u16, 1501, 1502, 1000, 2000]
            .into_iter()
            .map(Value::U16)
            .collect();
        let rc = Rc::from_values(&values).unwrap();
        assert_eq!(rc.roll(), Some(1500));
        assert_eq!(rc.throttle(), Some(1000));
        assert_eq!(rc.aux(1), Some(2000));
        assert_eq!(rc.aux(2), None);
        assert_eq!(rc.aux(0), None);
    }

    #[test]
    fn box_names_split_on_semicolons() {
        let values: Values = b"ARM;ANGLE;HORIZON;".iter().copied().map(Value::U8).collect();
        let names = BoxNames::from_values(&values).unwrap();
        assert_eq!(names.names, vec!["ARM", "ANGLE", "HORIZON"]);
        assert_eq!(names.to_values(), values);
    }

    #[test]
    fn pid_names_empty_payload() {
        let names = PidNames::from_values(&Values::empty()).unwrap();
        assert!(names.names.is_empty());
    }

    #[test]
    fn expect_len_reports_arity() {
        assert!(expect_len(112, 3, 3).is_ok());
        assert_eq!(
            expect_len(112, 3, 2),
            Err(CommandError::LayoutMismatch {
                code: 112,
                mismatch: Mismatch::Arity {
                    expected: 3,
                    actual: 2
                }
            })
        );
    }
}
