//! Payload layouts and their compact format strings.
//!
//! A format string lists field characters (`B b H h I i` for
//! `u8 i8 u16 i16 u32 i32`), each optionally preceded by a repeat count:
//! `"2B2i3H"` is two `u8`, two `i32` and three `u16`. A leading `*` marks a
//! variable layout whose single element type repeats for the whole payload,
//! e.g. `"*H"`. The empty string is the empty fixed layout.

use std::fmt;
use std::str::FromStr;

use bytes::{Bytes, BytesMut};
use wiiproxy_frame::MAX_PAYLOAD;

use crate::error::{CommandError, Mismatch};
use crate::field::{FieldType, Value, Values};

/// How a command's payload is laid out.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Layout {
    /// A fixed sequence of fields; the payload size is known statically.
    Fixed(Vec<FieldType>),
    /// Any number of elements of one type; the count comes from the
    /// message length byte.
    Variable(FieldType),
}

impl Layout {
    /// The layout of commands without a payload.
    pub fn empty() -> Self {
        Self::Fixed(Vec::new())
    }

    /// Payload size in bytes, if statically known.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            Self::Fixed(fields) => Some(fields.iter().map(|f| f.size()).sum()),
            Self::Variable(_) => None,
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Self::Variable(_))
    }

    /// True for the empty fixed layout.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Fixed(fields) if fields.is_empty())
    }

    /// Check that `values` have the arity and types this layout expects.
    pub fn check(&self, values: &Values) -> Result<(), Mismatch> {
        match self {
            Self::Fixed(fields) => {
                if fields.len() != values.len() {
                    return Err(Mismatch::Arity {
                        expected: fields.len(),
                        actual: values.len(),
                    });
                }
                for (index, (field, value)) in fields.iter().zip(values.iter()).enumerate() {
                    if value.field_type() != *field {
                        return Err(Mismatch::Type {
                            index,
                            expected: *field,
                            actual: value.field_type(),
                        });
                    }
                }
            }
            Self::Variable(element) => {
                if let Some((index, value)) = values
                    .iter()
                    .enumerate()
                    .find(|(_, v)| v.field_type() != *element)
                {
                    return Err(Mismatch::Type {
                        index,
                        expected: *element,
                        actual: value.field_type(),
                    });
                }
                let size = values.len() * element.size();
                if size > MAX_PAYLOAD {
                    return Err(Mismatch::TooLarge { size });
                }
            }
        }
        Ok(())
    }

    /// Pack `values` into payload bytes.
    pub fn encode(&self, values: &Values) -> Result<Bytes, Mismatch> {
        self.check(values)?;
        let size: usize = values.iter().map(|v| v.field_type().size()).sum();
        let mut buf = BytesMut::with_capacity(size);
        for value in values.iter() {
            value.write(&mut buf);
        }
        Ok(buf.freeze())
    }

    /// Unpack payload bytes into values.
    ///
    /// Fixed layouts need an exact length match; variable layouts need a
    /// whole number of elements.
    pub fn decode(&self, payload: &[u8]) -> Result<Values, Mismatch> {
        let mut src = payload;
        match self {
            Self::Fixed(fields) => {
                let expected: usize = fields.iter().map(|f| f.size()).sum();
                if payload.len() != expected {
                    return Err(Mismatch::Length {
                        expected,
                        actual: payload.len(),
                    });
                }
                Ok(fields.iter().map(|field| field.read(&mut src)).collect())
            }
            Self::Variable(element) => {
                if payload.len() % element.size() != 0 {
                    return Err(Mismatch::Partial {
                        len: payload.len(),
                        element: *element,
                    });
                }
                let count = payload.len() / element.size();
                Ok((0..count).map(|_| element.read(&mut src)).collect())
            }
        }
    }

    /// Convert plain integers to typed values, checking each one fits.
    pub fn values_from_integers(&self, raw: &[i64]) -> Result<Values, Mismatch> {
        let field_at = |index: usize| match self {
            Self::Fixed(fields) => fields[index],
            Self::Variable(element) => *element,
        };
        if let Self::Fixed(fields) = self {
            if fields.len() != raw.len() {
                return Err(Mismatch::Arity {
                    expected: fields.len(),
                    actual: raw.len(),
                });
            }
        }

        let values = raw
            .iter()
            .enumerate()
            .map(|(index, &value)| {
                let field = field_at(index);
                field
                    .value_from_i64(value)
                    .ok_or(Mismatch::OutOfRange {
                        index,
                        value,
                        field,
                    })
            })
            .collect::<Result<Vec<Value>, Mismatch>>()?;
        let values = Values::new(values);
        self.check(&values)?;
        Ok(values)
    }

    /// The compact format string for this layout.
    pub fn format_string(&self) -> String {
        match self {
            Self::Variable(element) => format!("*{}", element.format_char()),
            Self::Fixed(fields) => {
                let mut out = String::new();
                let mut iter = fields.iter().peekable();
                while let Some(field) = iter.next() {
                    let mut run = 1;
                    while iter.peek() == Some(&field) {
                        iter.next();
                        run += 1;
                    }
                    if run > 1 {
                        out.push_str(&run.to_string());
                    }
                    out.push(field.format_char());
                }
                out
            }
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_string())
    }
}

impl FromStr for Layout {
    type Err = CommandError;

    fn from_str(format: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| CommandError::InvalidLayout {
            format: format.to_string(),
            reason,
        };

        if let Some(element) = format.strip_prefix('*') {
            let mut chars = element.chars();
            return match (chars.next(), chars.next()) {
                (Some(c), None) => FieldType::from_format_char(c)
                    .map(Layout::Variable)
                    .ok_or_else(|| invalid(format!("unknown field type '{c}'"))),
                _ => Err(invalid(
                    "a variable layout takes exactly one element type".to_string(),
                )),
            };
        }

        let mut fields = Vec::new();
        let mut count: Option<usize> = None;
        for c in format.chars() {
            if let Some(digit) = c.to_digit(10) {
                let next = count
                    .unwrap_or(0)
                    .checked_mul(10)
                    .and_then(|n| n.checked_add(digit as usize))
                    .filter(|n| *n <= MAX_PAYLOAD)
                    .ok_or_else(|| invalid("repeat count too large".to_string()))?;
                count = Some(next);
                continue;
            }

            let field = FieldType::from_format_char(c)
                .ok_or_else(|| invalid(format!("unknown field type '{c}'")))?;
            let repeat = count.take().unwrap_or(1);
            if repeat == 0 {
                return Err(invalid("repeat count must be positive".to_string()));
            }
            fields.extend(std::iter::repeat(field).take(repeat));
        }

        if count.is_some() {
            return Err(invalid("repeat count without a field type".to_string()));
        }

        let layout = Layout::Fixed(fields);
        if let Some(size) = layout.fixed_size().filter(|size| *size > MAX_PAYLOAD) {
            return Err(invalid(format!("{size} bytes exceeds the 255 byte payload")));
        }
        Ok(layout)
    }
}
