use wiiproxy_command::{
    assemble, codes, disassemble, encode_message, multiwii, CommandError, CommandTable, FieldType,
    Kind, Layout, Value, Values,
};
use wiiproxy_frame::{Direction, FrameError, HEADER_SIZE};

/// Distinct, in-range values for every field of a layout.
fn sample_values(layout: &Layout) -> Values {
    let fields = match layout {
        Layout::Fixed(fields) => fields.clone(),
        Layout::Variable(element) => vec![*element; 4],
    };
    fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let i = i as i64 + 1;
            let raw = match field {
                FieldType::U8 => i * 7,
                FieldType::I8 => -i * 3,
                FieldType::U16 => i * 1_013,
                FieldType::I16 => -i * 977,
                FieldType::U32 => i * 100_003,
                FieldType::I32 => -i * 99_991,
            };
            field.value_from_i64(raw).unwrap()
        })
        .collect()
}

#[test]
fn every_catalog_command_roundtrips() {
    let table = multiwii().unwrap();
    for descriptor in table.iter() {
        let values = sample_values(descriptor.layout());
        let wire =
            encode_message(Direction::ControllerToHost, descriptor, Some(&values)).unwrap();
        let decoded = disassemble(&table, &wire).unwrap();
        assert_eq!(decoded, (descriptor.code(), values), "{}", descriptor.name());
    }
}

#[test]
fn single_bit_flips_fail_the_checksum() {
    let table = multiwii().unwrap();
    let descriptor = table.lookup(codes::RAW_GPS).unwrap();
    let wire = encode_message(
        Direction::ControllerToHost,
        &descriptor,
        Some(&sample_values(descriptor.layout())),
    )
    .unwrap();

    // Code byte and every payload byte.
    for index in 4..wire.len() - 1 {
        for bit in 0..8 {
            let mut corrupt = wire.to_vec();
            corrupt[index] ^= 1 << bit;
            assert!(
                matches!(
                    disassemble(&table, &corrupt),
                    Err(CommandError::Frame(FrameError::ChecksumMismatch { .. }))
                ),
                "byte {index} bit {bit}"
            );
        }
    }
}

#[test]
fn length_bit_flip_with_trailing_bytes_fails_the_checksum() {
    let table = multiwii().unwrap();
    let descriptor = table.lookup(codes::ATTITUDE).unwrap();
    let values = Values::new(vec![Value::I16(10), Value::I16(20), Value::I16(30)]);
    let mut wire = encode_message(Direction::ControllerToHost, &descriptor, Some(&values))
        .unwrap()
        .to_vec();
    // Shrinking the length makes a payload byte stand in for the checksum.
    wire[3] ^= 0b100;

    assert!(matches!(
        disassemble(&table, &wire),
        Err(CommandError::Frame(FrameError::ChecksumMismatch { .. }))
    ));
}

#[test]
fn attitude_like_scenario() {
    let mut builder = CommandTable::builder();
    let layout: Layout = "2B7H".parse().unwrap();
    let descriptor = builder.register(121, layout).unwrap();
    let table = builder.build();
    assert_eq!(descriptor.kind(), Kind::Get);

    let values = descriptor
        .layout()
        .values_from_integers(&[0, 0, 10, 20, 0, 0, 0, 0, 0])
        .unwrap();
    let wire = assemble(&descriptor, Some(&values)).unwrap();

    assert_eq!(&wire[..3], b"$M>");
    assert_eq!(wire[3], 16);
    assert_eq!(wire.len(), HEADER_SIZE + 16 + 1);

    let (code, decoded) =
        wiiproxy_command::decode_message(Direction::HostToController, &table, &wire).unwrap();
    assert_eq!(code, 121);
    assert_eq!(decoded, values);
}

#[test]
fn registration_range() {
    let mut builder = CommandTable::builder();
    assert_eq!(
        builder.register(99, Layout::empty()),
        Err(CommandError::InvalidCode { code: 99 })
    );
    assert_eq!(
        builder.register(251, Layout::empty()),
        Err(CommandError::InvalidCode { code: 251 })
    );
    assert_eq!(builder.register(150, Layout::empty()).unwrap().kind(), Kind::Get);
    assert_eq!(builder.register(200, Layout::empty()).unwrap().kind(), Kind::Set);
}
