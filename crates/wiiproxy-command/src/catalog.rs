//! The MultiWii 2.x command set.

use tracing::debug;

use crate::boxes::{BoxConfig, BoxIds};
use crate::error::Result;
use crate::records::{
    Altitude, Analog, Attitude, BoxNames, CompGps, Ident, Pid, PidNames, RawGps, RawImu, Rc,
    RcTuning, SetHead, SetRawGps, SetRawRc, Status,
};
use crate::table::{CommandTable, CommandTableBuilder};

/// MultiWii command codes.
pub mod codes {
    pub const IDENT: u8 = 100;
    pub const STATUS: u8 = 101;
    pub const RAW_IMU: u8 = 102;
    pub const SERVO: u8 = 103;
    pub const MOTOR: u8 = 104;
    pub const RC: u8 = 105;
    pub const RAW_GPS: u8 = 106;
    pub const COMP_GPS: u8 = 107;
    pub const ATTITUDE: u8 = 108;
    pub const ALTITUDE: u8 = 109;
    pub const ANALOG: u8 = 110;
    pub const RC_TUNING: u8 = 111;
    pub const PID: u8 = 112;
    pub const BOX: u8 = 113;
    pub const MISC: u8 = 114;
    pub const MOTOR_PINS: u8 = 115;
    pub const BOXNAMES: u8 = 116;
    pub const PIDNAMES: u8 = 117;
    pub const WP: u8 = 118;
    pub const BOXIDS: u8 = 119;

    pub const SET_RAW_RC: u8 = 200;
    pub const SET_RAW_GPS: u8 = 201;
    pub const SET_PID: u8 = 202;
    pub const SET_BOX: u8 = 203;
    pub const SET_RC_TUNING: u8 = 204;
    pub const ACC_CALIBRATION: u8 = 205;
    pub const MAG_CALIBRATION: u8 = 206;
    pub const SET_MISC: u8 = 207;
    pub const RESET_CONF: u8 = 208;
    pub const SET_WP: u8 = 209;
    pub const SELECT_SETTING: u8 = 210;
    pub const SET_HEAD: u8 = 211;
    pub const SET_MOTOR: u8 = 214;
    pub const BIND: u8 = 240;
    pub const EEPROM_WRITE: u8 = 250;
}

/// Telemetry polled when no caller has anything queued.
pub const DEFAULT_POLL: &[u8] = &[
    codes::STATUS,
    codes::RAW_IMU,
    codes::ATTITUDE,
    codes::ALTITUDE,
    codes::ANALOG,
    codes::RC,
    codes::RAW_GPS,
    codes::COMP_GPS,
];

/// Commands without a typed record: (name, code, layout).
const FORMATS: &[(&str, u8, &str)] = &[
    ("SERVO", codes::SERVO, "8H"),
    ("MOTOR", codes::MOTOR, "8H"),
    ("MISC", codes::MISC, "6HIH4B"),
    ("MOTOR_PINS", codes::MOTOR_PINS, "8B"),
    ("WP", codes::WP, "B2iI2HB"),
    ("SET_PID", codes::SET_PID, "30B"),
    ("SET_BOX", codes::SET_BOX, "*H"),
    ("SET_RC_TUNING", codes::SET_RC_TUNING, "7B"),
    ("ACC_CALIBRATION", codes::ACC_CALIBRATION, ""),
    ("MAG_CALIBRATION", codes::MAG_CALIBRATION, ""),
    ("SET_MISC", codes::SET_MISC, "6HIH4B"),
    ("RESET_CONF", codes::RESET_CONF, ""),
    ("SET_WP", codes::SET_WP, "B2iI2HB"),
    ("SELECT_SETTING", codes::SELECT_SETTING, "B"),
    ("SET_MOTOR", codes::SET_MOTOR, "8H"),
    ("BIND", codes::BIND, ""),
    ("EEPROM_WRITE", codes::EEPROM_WRITE, ""),
];

/// Build the full MultiWii command table.
pub fn multiwii() -> Result<CommandTable> {
    let mut builder = CommandTableBuilder::new();
    register_records(&mut builder)?;
    for (name, code, format) in FORMATS {
        builder.register_format(name, *code, format)?;
    }
    let table = builder.build();
    debug!(commands = table.len(), "built MultiWii command table");
    Ok(table)
}

fn register_records(builder: &mut CommandTableBuilder) -> Result<()> {
    builder.register_record::<Ident>()?;
    builder.register_record::<Status>()?;
    builder.register_record::<RawImu>()?;
    builder.register_record::<Rc>()?;
    builder.register_record::<RawGps>()?;
    builder.register_record::<CompGps>()?;
    builder.register_record::<Attitude>()?;
    builder.register_record::<Altitude>()?;
    builder.register_record::<Analog>()?;
    builder.register_record::<RcTuning>()?;
    builder.register_record::<Pid>()?;
    builder.register_record::<BoxConfig>()?;
    builder.register_record::<BoxNames>()?;
    builder.register_record::<PidNames>()?;
    builder.register_record::<BoxIds>()?;
    builder.register_record::<SetRawRc>()?;
    builder.register_record::<SetRawGps>()?;
    builder.register_record::<SetHead>()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Kind;
    use crate::error::CommandError;

    #[test]
    fn catalog_builds() {
        let table = multiwii().unwrap();
        assert_eq!(table.len(), 35);
        for &code in DEFAULT_POLL {
            assert_eq!(table.lookup(code).unwrap().kind(), Kind::Get);
        }
    }

    #[test]
    fn known_sizes() {
        let table = multiwii().unwrap();
        let size = |code| table.lookup(code).unwrap().layout().fixed_size();
        assert_eq!(size(codes::IDENT), Some(7));
        assert_eq!(size(codes::STATUS), Some(11));
        assert_eq!(size(codes::RAW_IMU), Some(18));
        assert_eq!(size(codes::RAW_GPS), Some(16));
        assert_eq!(size(codes::ATTITUDE), Some(6));
        assert_eq!(size(codes::ALTITUDE), Some(6));
        assert_eq!(size(codes::PID), Some(30));
        assert_eq!(size(codes::MISC), Some(22));
        assert_eq!(size(codes::WP), Some(18));
        assert_eq!(size(codes::RC), None);
        assert_eq!(size(codes::EEPROM_WRITE), Some(0));
    }

    #[test]
    fn set_commands_are_set_kind() {
        let table = multiwii().unwrap();
        for descriptor in table.iter() {
            assert_eq!(
                descriptor.kind() == Kind::Set,
                descriptor.code() >= 200,
                "{}",
                descriptor.name()
            );
        }
    }

    #[test]
    fn second_pid_definition_is_surfaced() {
        let mut builder = CommandTableBuilder::new();
        builder.register_record::<Pid>().unwrap();
        assert_eq!(
            builder.register_format("MSP_PID", codes::PID, "30B"),
            Err(CommandError::DuplicateRegistration { code: codes::PID })
        );
    }

    #[test]
    fn find_catalog_names() {
        let table = multiwii().unwrap();
        assert_eq!(table.find("msp_raw_gps").unwrap().code(), codes::RAW_GPS);
        assert_eq!(table.find("eeprom_write").unwrap().code(), codes::EEPROM_WRITE);
    }
}
