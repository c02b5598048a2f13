//! Primitive field types and the values that fill them.

use std::fmt;
use std::ops::Deref;

use bytes::{Buf, BufMut, BytesMut};
use serde::Serialize;

/// A little-endian integer field in a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
}

impl FieldType {
    /// Encoded size in bytes.
    pub const fn size(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 => 4,
        }
    }

    /// The character used for this type in layout format strings.
    pub const fn format_char(self) -> char {
        match self {
            Self::U8 => 'B',
            Self::I8 => 'b',
            Self::U16 => 'H',
            Self::I16 => 'h',
            Self::U32 => 'I',
            Self::I32 => 'i',
        }
    }

    /// Parse a layout format character.
    pub fn from_format_char(c: char) -> Option<Self> {
        match c {
            'B' => Some(Self::U8),
            'b' => Some(Self::I8),
            'H' => Some(Self::U16),
            'h' => Some(Self::I16),
            'I' => Some(Self::U32),
            'i' => Some(Self::I32),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::I8 => "i8",
            Self::U16 => "u16",
            Self::I16 => "i16",
            Self::U32 => "u32",
            Self::I32 => "i32",
        }
    }

    /// Build a value of this type from an integer, if it fits.
    pub fn value_from_i64(self, raw: i64) -> Option<Value> {
        match self {
            Self::U8 => u8::try_from(raw).ok().map(Value::U8),
            Self::I8 => i8::try_from(raw).ok().map(Value::I8),
            Self::U16 => u16::try_from(raw).ok().map(Value::U16),
            Self::I16 => i16::try_from(raw).ok().map(Value::I16),
            Self::U32 => u32::try_from(raw).ok().map(Value::U32),
            Self::I32 => i32::try_from(raw).ok().map(Value::I32),
        }
    }

    /// Read one value of this type. The caller guarantees `src` holds
    /// at least [`size`](Self::size) bytes.
    pub(crate) fn read(self, src: &mut impl Buf) -> Value {
        match self {
            Self::U8 => Value::U8(src.get_u8()),
            Self::I8 => Value::I8(src.get_i8()),
            Self::U16 => Value::U16(src.get_u16_le()),
            Self::I16 => Value::I16(src.get_i16_le()),
            Self::U32 => Value::U32(src.get_u32_le()),
            Self::I32 => Value::I32(src.get_i32_le()),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single typed payload value.
///
/// Serializes as a bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Value {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
}

impl Value {
    pub const fn field_type(self) -> FieldType {
        match self {
            Self::U8(_) => FieldType::U8,
            Self::I8(_) => FieldType::I8,
            Self::U16(_) => FieldType::U16,
            Self::I16(_) => FieldType::I16,
            Self::U32(_) => FieldType::U32,
            Self::I32(_) => FieldType::I32,
        }
    }

    /// Widen to `i64` (lossless for every field type).
    pub fn as_i64(self) -> i64 {
        match self {
            Self::U8(v) => v.into(),
            Self::I8(v) => v.into(),
            Self::U16(v) => v.into(),
            Self::I16(v) => v.into(),
            Self::U32(v) => v.into(),
            Self::I32(v) => v.into(),
        }
    }

    pub(crate) fn write(self, dst: &mut BytesMut) {
        match self {
            Self::U8(v) => dst.put_u8(v),
            Self::I8(v) => dst.put_i8(v),
            Self::U16(v) => dst.put_u16_le(v),
            Self::I16(v) => dst.put_i16_le(v),
            Self::U32(v) => dst.put_u32_le(v),
            Self::I32(v) => dst.put_i32_le(v),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i64())
    }
}

/// A Rust integer type that maps onto one [`FieldType`].
pub trait Primitive: Copy + Into<Value> {
    const FIELD: FieldType;

    /// Extract `Self` from a value of the matching type.
    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }

            impl Primitive for $ty {
                const FIELD: FieldType = FieldType::$variant;

                fn from_value(value: Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

primitive! {
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
}

/// An ordered tuple of payload values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Values(Vec<Value>);

impl Values {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// The empty tuple (get requests, set acknowledgements).
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Every value widened to `i64`.
    pub fn to_i64_vec(&self) -> Vec<i64> {
        self.0.iter().map(|v| v.as_i64()).collect()
    }

    pub fn into_inner(self) -> Vec<Value> {
        self.0
    }
}

impl Deref for Values {
    type Target = [Value];

    fn deref(&self) -> &[Value] {
        &self.0
    }
}

impl From<Vec<Value>> for Values {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl FromIterator<Value> for Values {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Values {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_chars_roundtrip() {
        for field in [
            FieldType::U8,
            FieldType::I8,
            FieldType::U16,
            FieldType::I16,
            FieldType::U32,
            FieldType::I32,
        ] {
            assert_eq!(FieldType::from_format_char(field.format_char()), Some(field));
        }
        assert_eq!(FieldType::from_format_char('s'), None);
    }

    #[test]
    fn value_from_i64_checks_range() {
        assert_eq!(FieldType::U8.value_from_i64(255), Some(Value::U8(255)));
        assert_eq!(FieldType::U8.value_from_i64(256), None);
        assert_eq!(FieldType::I16.value_from_i64(-20), Some(Value::I16(-20)));
        assert_eq!(FieldType::U32.value_from_i64(-1), None);
    }

    #[test]
    fn little_endian_on_the_wire() {
        let mut buf = BytesMut::new();
        Value::I16(-20).write(&mut buf);
        Value::U32(0x0102_0304).write(&mut buf);
        assert_eq!(buf.as_ref(), &[0xec, 0xff, 0x04, 0x03, 0x02, 0x01]);

        let mut src = buf.freeze();
        assert_eq!(FieldType::I16.read(&mut src), Value::I16(-20));
        assert_eq!(FieldType::U32.read(&mut src), Value::U32(0x0102_0304));
    }

    #[test]
    fn values_serialize_as_plain_numbers() {
        let values = Values::new(vec![Value::I16(10), Value::I16(-20), Value::U8(180)]);
        assert_eq!(serde_json::to_string(&values).unwrap(), "[10,-20,180]");
        assert_eq!(values.to_string(), "(10, -20, 180)");
    }

    #[test]
    fn primitive_extraction_is_type_strict() {
        assert_eq!(u16::from_value(Value::U16(7)), Some(7));
        assert_eq!(u16::from_value(Value::I16(7)), None);
        assert_eq!(<i32 as Primitive>::FIELD, FieldType::I32);
    }
}
