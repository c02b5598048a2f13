//! Typed views over a command's values.

use crate::error::{CommandError, Mismatch, Result};
use crate::field::{Primitive, Value, Values};
use crate::layout::Layout;

/// A struct that mirrors one command's payload.
pub trait MspRecord: Sized {
    /// The command code.
    const CODE: u8;
    /// The command name, without the `MSP_` prefix.
    const NAME: &'static str;

    /// The payload layout.
    fn layout() -> Layout;

    /// Build the record from decoded values.
    fn from_values(values: &Values) -> Result<Self>;

    /// Flatten the record into values in layout order.
    fn to_values(&self) -> Values;
}

/// Declare a fixed-layout record.
///
/// The struct fields and the wire layout come from one list, so they cannot
/// drift apart:
///
/// ```
/// wiiproxy_command::msp_record! {
///     /// Heading hold target.
///     pub struct Heading(211, "SET_HEAD") {
///         pub degrees: i16,
///     }
/// }
///
/// use wiiproxy_command::MspRecord;
/// assert_eq!(Heading::layout().format_string(), "h");
/// ```
#[macro_export]
macro_rules! msp_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident ($code:expr, $wire:literal) {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::MspRecord for $name {
            const CODE: u8 = $code;
            const NAME: &'static str = $wire;

            fn layout() -> $crate::Layout {
                $crate::Layout::Fixed(vec![$(<$ty as $crate::Primitive>::FIELD),*])
            }

            fn from_values(values: &$crate::Values) -> $crate::Result<Self> {
                <Self as $crate::MspRecord>::layout()
                    .check(values)
                    .map_err(|mismatch| $crate::CommandError::LayoutMismatch {
                        code: $code,
                        mismatch,
                    })?;
                #[allow(unused_mut, unused_variables)]
                let mut fields = values.iter().copied().enumerate();
                Ok(Self {
                    $($field: $crate::record::take(&mut fields, $code)?,)*
                })
            }

            fn to_values(&self) -> $crate::Values {
                $crate::Values::new(vec![$($crate::Value::from(self.$field)),*])
            }
        }
    };
}

#[doc(hidden)]
pub fn take<P: Primitive>(
    fields: &mut impl Iterator<Item = (usize, Value)>,
    code: u8,
) -> Result<P> {
    let (index, value) = fields
        .next()
        .ok_or(CommandError::MissingValues { code })?;
    P::from_value(value).ok_or(CommandError::LayoutMismatch {
        code,
        mismatch: Mismatch::Type {
            index,
            expected: P::FIELD,
            actual: value.field_type(),
        },
    })
}

/// Extract every element of a variable-layout payload as `P`.
pub(crate) fn variable_elements<P: Primitive>(code: u8, values: &Values) -> Result<Vec<P>> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            P::from_value(*value).ok_or(CommandError::LayoutMismatch {
                code,
                mismatch: Mismatch::Type {
                    index,
                    expected: P::FIELD,
                    actual: value.field_type(),
                },
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;

    crate::msp_record! {
        /// Test record.
        struct Sample(150, "SAMPLE") {
            a: u8,
            b: i16,
            c: u32,
        }
    }

    #[test]
    fn layout_follows_fields() {
        assert_eq!(
            Sample::layout(),
            Layout::Fixed(vec![FieldType::U8, FieldType::I16, FieldType::U32])
        );
        assert_eq!(Sample::CODE, 150);
        assert_eq!(Sample::NAME, "SAMPLE");
    }

    #[test]
    fn values_roundtrip() {
        let sample = Sample { a: 1, b: -2, c: 3 };
        let values = sample.to_values();
        assert_eq!(
            values.into_inner(),
            vec![Value::U8(1), Value::I16(-2), Value::U32(3)]
        );
        assert_eq!(Sample::from_values(&sample.to_values()).unwrap(), sample);
    }

    #[test]
    fn wrong_values_rejected() {
        let short = Values::new(vec![Value::U8(1)]);
        assert!(matches!(
            Sample::from_values(&short),
            Err(CommandError::LayoutMismatch {
                code: 150,
                mismatch: Mismatch::Arity { .. }
            })
        ));
    }

    #[test]
    fn variable_elements_are_type_checked() {
        let values = Values::new(vec![Value::U16(1), Value::U8(2)]);
        assert!(matches!(
            variable_elements::<u16>(105, &values),
            Err(CommandError::LayoutMismatch {
                mismatch: Mismatch::Type { index: 1, .. },
                ..
            })
        ));
    }
}
