//! Translation between a descriptor plus values and wire bytes.

use bytes::{Bytes, BytesMut};
use wiiproxy_frame::{
    decode_frame, encode_frame, Direction, Frame, FrameError, CHECKSUM_SIZE, HEADER_SIZE,
};

use crate::descriptor::{Descriptor, Kind};
use crate::error::{CommandError, Result};
use crate::field::Values;
use crate::table::CommandTable;

/// Check the values a caller wants to send with a request.
///
/// Get commands take no values (an empty tuple is accepted). Set commands
/// need values matching their layout unless the layout is empty.
pub fn check_outgoing(descriptor: &Descriptor, values: Option<&Values>) -> Result<()> {
    let code = descriptor.code();
    match (descriptor.kind(), values) {
        (Kind::Get, Some(values)) if !values.is_empty() => {
            Err(CommandError::UnexpectedValues { code })
        }
        (Kind::Get, _) => Ok(()),
        (Kind::Set, None) if descriptor.layout().is_empty() => Ok(()),
        (Kind::Set, None) => Err(CommandError::MissingValues { code }),
        (Kind::Set, Some(values)) => descriptor
            .layout()
            .check(values)
            .map_err(|mismatch| CommandError::LayoutMismatch { code, mismatch }),
    }
}

/// Pack values into a payload. `None` packs the empty payload.
pub fn encode_payload(descriptor: &Descriptor, values: Option<&Values>) -> Result<Bytes> {
    match values {
        None => Ok(Bytes::new()),
        Some(values) => descriptor
            .layout()
            .encode(values)
            .map_err(|mismatch| CommandError::LayoutMismatch {
                code: descriptor.code(),
                mismatch,
            }),
    }
}

/// Build a complete host-to-controller frame.
///
/// Values are packed per the descriptor's layout. Without values the payload
/// is empty, which is what every get request sends; a set command with a
/// non-empty layout fails with `MissingValues` instead.
pub fn assemble(descriptor: &Descriptor, values: Option<&Values>) -> Result<Bytes> {
    encode_message(Direction::HostToController, descriptor, values)
}

/// Build a complete frame travelling in `direction`.
pub fn encode_message(
    direction: Direction,
    descriptor: &Descriptor,
    values: Option<&Values>,
) -> Result<Bytes> {
    if direction == Direction::HostToController
        && values.is_none()
        && descriptor.kind() == Kind::Set
        && !descriptor.layout().is_empty()
    {
        return Err(CommandError::MissingValues {
            code: descriptor.code(),
        });
    }

    let payload = encode_payload(descriptor, values)?;
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len() + CHECKSUM_SIZE);
    encode_frame(direction, descriptor.code(), &payload, &mut buf)?;
    Ok(buf.freeze())
}

/// Decode a controller-to-host frame into `(code, values)`.
pub fn disassemble(table: &CommandTable, bytes: &[u8]) -> Result<(u8, Values)> {
    decode_message(Direction::ControllerToHost, table, bytes)
}

/// Decode the first frame in `bytes`, travelling in `direction`.
///
/// Bytes after the first frame are ignored.
pub fn decode_message(
    direction: Direction,
    table: &CommandTable,
    bytes: &[u8],
) -> Result<(u8, Values)> {
    let mut buf = BytesMut::from(bytes);
    let frame = decode_frame(&mut buf, direction)?.ok_or_else(|| truncated(bytes))?;
    let descriptor = table.lookup(frame.code)?;
    let values = if direction == Direction::HostToController && frame.payload.is_empty() {
        // A get request.
        Values::empty()
    } else {
        decode_values(&descriptor, &frame)?
    };
    Ok((frame.code, values))
}

/// Decode a frame's payload with the descriptor's layout.
///
/// An empty payload for a set command is the controller's acknowledgement
/// and decodes to the empty tuple.
pub fn decode_values(descriptor: &Descriptor, frame: &Frame) -> Result<Values> {
    if frame.payload.is_empty() && descriptor.kind() == Kind::Set {
        return Ok(Values::empty());
    }
    descriptor
        .layout()
        .decode(&frame.payload)
        .map_err(|mismatch| CommandError::LayoutMismatch {
            code: descriptor.code(),
            mismatch,
        })
}

fn truncated(bytes: &[u8]) -> CommandError {
    let needed = match bytes.get(3) {
        Some(&length) => HEADER_SIZE + length as usize + CHECKSUM_SIZE,
        None => HEADER_SIZE + CHECKSUM_SIZE,
    };
    FrameError::Truncated {
        needed,
        available: bytes.len(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Mismatch;
    use crate::field::Value;
    use crate::layout::Layout;

    fn table() -> CommandTable {
        let mut builder = CommandTable::builder();
        builder.register_format("ATTITUDE", 108, "3h").unwrap();
        builder.register_format("RC", 105, "*H").unwrap();
        builder.register_format("SET_HEAD", 211, "h").unwrap();
        builder.register_format("ACC_CALIBRATION", 205, "").unwrap();
        builder.build()
    }

    fn attitude(roll: i16, pitch: i16, heading: i16) -> Values {
        Values::new(vec![
            Value::I16(roll),
            Value::I16(pitch),
            Value::I16(heading),
        ])
    }

    #[test]
    fn get_request_has_empty_payload() {
        let table = table();
        let bytes = assemble(&table.lookup(108).unwrap(), None).unwrap();
        assert_eq!(bytes.as_ref(), b"$M>\x00\x6c\x6c");
    }

    #[test]
    fn set_request_carries_values() {
        let table = table();
        let values = Values::new(vec![Value::I16(90)]);
        let bytes = assemble(&table.lookup(211).unwrap(), Some(&values)).unwrap();

        // 2 ^ 211 ^ 90 ^ 0 = 0x8b
        assert_eq!(bytes.as_ref(), &[b'$', b'M', b'>', 2, 211, 90, 0, 0x8b]);
    }

    #[test]
    fn set_without_values_is_missing() {
        let table = table();
        assert_eq!(
            assemble(&table.lookup(211).unwrap(), None),
            Err(CommandError::MissingValues { code: 211 })
        );
        // Calibration triggers carry no payload.
        let calibration = assemble(&table.lookup(205).unwrap(), None).unwrap();
        assert_eq!(calibration.len(), 6);
    }

    #[test]
    fn assemble_rejects_layout_mismatch() {
        let table = table();
        let wrong = Values::new(vec![Value::U8(1)]);
        assert_eq!(
            assemble(&table.lookup(211).unwrap(), Some(&wrong)),
            Err(CommandError::LayoutMismatch {
                code: 211,
                mismatch: Mismatch::Type {
                    index: 0,
                    expected: crate::FieldType::I16,
                    actual: crate::FieldType::U8,
                }
            })
        );
    }

    #[test]
    fn disassemble_incoming_frame() {
        let table = table();
        let wire = [
            0x24, 0x4d, 0x3c, 0x06, 0x6c, 0x0a, 0x00, 0xec, 0xff, 0xb4, 0x00, 0xc7,
        ];
        let (code, values) = disassemble(&table, &wire).unwrap();
        assert_eq!(code, 108);
        assert_eq!(values, attitude(10, -20, 180));
    }

    #[test]
    fn incoming_roundtrip() {
        let table = table();
        let descriptor = table.lookup(108).unwrap();
        let values = attitude(-1, 2, 359);
        let wire = encode_message(Direction::ControllerToHost, &descriptor, Some(&values)).unwrap();
        assert_eq!(disassemble(&table, &wire).unwrap(), (108, values));
    }

    #[test]
    fn outgoing_bytes_are_not_incoming() {
        let table = table();
        let wire = assemble(&table.lookup(108).unwrap(), None).unwrap();
        assert!(matches!(
            disassemble(&table, &wire),
            Err(CommandError::Frame(FrameError::PreambleMismatch { .. }))
        ));
        assert_eq!(
            decode_message(Direction::HostToController, &table, &wire).unwrap(),
            (108, Values::empty())
        );
    }

    #[test]
    fn variable_layout_uses_length_byte() {
        let table = table();
        let descriptor = table.lookup(105).unwrap();
        let channels: Values = [1500u16, 1500, 1000, 1500, 2000]
            .into_iter()
            .map(Value::U16)
            .collect();
        let wire = encode_message(Direction::ControllerToHost, &descriptor, Some(&channels)).unwrap();
        assert_eq!(wire[3], 10);
        assert_eq!(disassemble(&table, &wire).unwrap().1, channels);
    }

    #[test]
    fn set_acknowledgement_decodes_to_empty() {
        let table = table();
        let ack = encode_message(
            Direction::ControllerToHost,
            &table.lookup(211).unwrap(),
            None,
        )
        .unwrap();
        assert_eq!(disassemble(&table, &ack).unwrap(), (211, Values::empty()));
    }

    #[test]
    fn short_payload_for_fixed_layout() {
        let table = table();
        let mut buf = BytesMut::new();
        encode_frame(Direction::ControllerToHost, 108, &[1, 0, 2, 0], &mut buf).unwrap();
        assert_eq!(
            disassemble(&table, &buf),
            Err(CommandError::LayoutMismatch {
                code: 108,
                mismatch: Mismatch::Length {
                    expected: 6,
                    actual: 4
                }
            })
        );
    }

    #[test]
    fn unknown_code_not_registered() {
        let table = table();
        let mut buf = BytesMut::new();
        encode_frame(Direction::ControllerToHost, 150, &[], &mut buf).unwrap();
        assert_eq!(
            disassemble(&table, &buf),
            Err(CommandError::NotRegistered { code: 150 })
        );
    }

    #[test]
    fn truncated_input_reports_sizes() {
        let table = table();
        let wire = encode_message(
            Direction::ControllerToHost,
            &table.lookup(108).unwrap(),
            Some(&attitude(1, 2, 3)),
        )
        .unwrap();
        assert_eq!(
            disassemble(&table, &wire[..7]),
            Err(CommandError::Frame(FrameError::Truncated {
                needed: 12,
                available: 7
            }))
        );
    }

    #[test]
    fn outgoing_checks() {
        let table = table();
        let get = table.lookup(108).unwrap();
        let set = table.lookup(211).unwrap();

        assert!(check_outgoing(&get, None).is_ok());
        assert!(check_outgoing(&get, Some(&Values::empty())).is_ok());
        assert_eq!(
            check_outgoing(&get, Some(&attitude(1, 2, 3))),
            Err(CommandError::UnexpectedValues { code: 108 })
        );
        assert_eq!(
            check_outgoing(&set, None),
            Err(CommandError::MissingValues { code: 211 })
        );
        assert!(check_outgoing(&set, Some(&Values::new(vec![Value::I16(5)]))).is_ok());
        assert!(check_outgoing(&table.lookup(205).unwrap(), None).is_ok());
    }

    #[test]
    fn descriptor_layout_accessors() {
        let table = table();
        assert_eq!(table.lookup(205).unwrap().layout(), &Layout::empty());
    }
}
