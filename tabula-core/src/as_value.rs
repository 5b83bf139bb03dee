use crate::{Value, truncate_long};
use anyhow::{Context, Error, Result};
use rust_decimal::{Decimal, prelude::FromPrimitive};
use std::{any, str::FromStr};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, format_description::parse_borrowed};
use uuid::Uuid;

/// Conversion between native Rust types and the dynamically typed [`Value`].
///
/// Record fields are read and written through this trait: `as_value` when a field is
/// bound as a statement parameter or snapshotted by the holder, `try_from_value` when
/// a row column is assigned back into a field.
///
/// Implementations accept the canonical variant for the type, alternate integer
/// widths after a range check, and text for the types SQLite stores as `TEXT`.
///
/// # Examples
/// ```rust
/// use tabula_core::{AsValue, Value};
/// let v = 42i32.as_value();
/// assert!(matches!(v, Value::Int32(Some(42))));
/// let n: i64 = AsValue::try_from_value(v).unwrap();
/// assert_eq!(n, 42);
/// ```
pub trait AsValue {
    /// The typed NULL for this type.
    fn as_empty_value() -> Value;
    fn as_value(self) -> Value;
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
    /// Parse a textual representation, used when a driver hands back text.
    fn parse(input: impl AsRef<str>) -> Result<Self>
    where
        Self: Sized,
    {
        Err(Error::msg(format!(
            "Cannot parse `{}` as {}",
            truncate_long!(input.as_ref()),
            any::type_name::<Self>()
        )))
    }
}

impl<T: AsValue> From<T> for Value {
    fn from(value: T) -> Self {
        value.as_value()
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Varchar(Some(value.into()))
    }
}

fn unquote(input: &str) -> &str {
    let input = input.trim();
    for quote in ['\'', '"'] {
        if input.len() >= 2 && input.starts_with(quote) && input.ends_with(quote) {
            return &input[1..input.len() - 1];
        }
    }
    input
}

macro_rules! out_of_range {
    ($v:expr, $from:literal) => {
        Err(Error::msg(format!(
            "Value {}: {} is out of range for {}",
            $v,
            $from,
            any::type_name::<Self>(),
        )))
    };
}

macro_rules! impl_as_value {
    ($source:ty, $destination:path $(, $pat_rest:pat => $expr_rest:expr)* $(,)?) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self))
            }
            #[allow(unreachable_patterns)]
            fn try_from_value(value: Value) -> Result<Self> {
                match value {
                    $destination(Some(v)) => Ok(v),
                    $($pat_rest => $expr_rest,)*
                    _ => Err(Error::msg(format!(
                        "Cannot convert {value:?} to {}",
                        any::type_name::<Self>(),
                    ))),
                }
            }
            fn parse(input: impl AsRef<str>) -> Result<Self> {
                let input = input.as_ref();
                <$source as FromStr>::from_str(unquote(input)).map_err(|e| {
                    Error::msg(format!(
                        "Cannot parse `{}` as {}: {e}",
                        truncate_long!(input),
                        any::type_name::<Self>()
                    ))
                })
            }
        }
    };
}

/// Integers accept every other integer width when the number fits.
macro_rules! impl_as_value_integer {
    ($source:ty, $destination:path) => {
        impl_as_value!(
            $source,
            $destination,
            Value::Boolean(Some(v)) => Ok(v as _),
            Value::Int8(Some(v)) => <$source>::try_from(v).or_else(|_| out_of_range!(v, "i8")),
            Value::Int16(Some(v)) => <$source>::try_from(v).or_else(|_| out_of_range!(v, "i16")),
            Value::Int32(Some(v)) => <$source>::try_from(v).or_else(|_| out_of_range!(v, "i32")),
            Value::Int64(Some(v)) => <$source>::try_from(v).or_else(|_| out_of_range!(v, "i64")),
            Value::UInt8(Some(v)) => <$source>::try_from(v).or_else(|_| out_of_range!(v, "u8")),
            Value::UInt16(Some(v)) => <$source>::try_from(v).or_else(|_| out_of_range!(v, "u16")),
            Value::UInt32(Some(v)) => <$source>::try_from(v).or_else(|_| out_of_range!(v, "u32")),
            Value::UInt64(Some(v)) => <$source>::try_from(v).or_else(|_| out_of_range!(v, "u64")),
            Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
        );
    };
}

impl_as_value_integer!(i8, Value::Int8);
impl_as_value_integer!(i16, Value::Int16);
impl_as_value_integer!(i32, Value::Int32);
impl_as_value_integer!(i64, Value::Int64);
impl_as_value_integer!(u8, Value::UInt8);
impl_as_value_integer!(u16, Value::UInt16);
impl_as_value_integer!(u32, Value::UInt32);
impl_as_value_integer!(u64, Value::UInt64);

impl_as_value!(
    bool,
    Value::Boolean,
    Value::Int8(Some(v)) => Ok(v != 0),
    Value::Int16(Some(v)) => Ok(v != 0),
    Value::Int32(Some(v)) => Ok(v != 0),
    Value::Int64(Some(v)) => Ok(v != 0),
    Value::UInt8(Some(v)) => Ok(v != 0),
    Value::UInt16(Some(v)) => Ok(v != 0),
    Value::UInt32(Some(v)) => Ok(v != 0),
    Value::UInt64(Some(v)) => Ok(v != 0),
    Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
);

impl_as_value!(
    f32,
    Value::Float32,
    Value::Float64(Some(v)) => {
        if v.is_finite() && (v < f32::MIN as f64 || v > f32::MAX as f64) {
            return out_of_range!(v, "f64");
        }
        Ok(v as f32)
    },
    Value::Int32(Some(v)) => Ok(v as f32),
    Value::Int64(Some(v)) => Ok(v as f32),
    Value::Decimal(Some(v)) => Ok(f32::try_from(v)?),
    Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
);

impl_as_value!(
    f64,
    Value::Float64,
    Value::Float32(Some(v)) => Ok(v as f64),
    Value::Int32(Some(v)) => Ok(v as f64),
    Value::Int64(Some(v)) => Ok(v as f64),
    Value::Decimal(Some(v)) => Ok(f64::try_from(v)?),
    Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
);

impl_as_value!(
    Decimal,
    Value::Decimal,
    Value::Int8(Some(v)) => Ok(Decimal::from(v)),
    Value::Int16(Some(v)) => Ok(Decimal::from(v)),
    Value::Int32(Some(v)) => Ok(Decimal::from(v)),
    Value::Int64(Some(v)) => Ok(Decimal::from(v)),
    Value::UInt8(Some(v)) => Ok(Decimal::from(v)),
    Value::UInt16(Some(v)) => Ok(Decimal::from(v)),
    Value::UInt32(Some(v)) => Ok(Decimal::from(v)),
    Value::UInt64(Some(v)) => Ok(Decimal::from(v)),
    Value::Float32(Some(v)) => Decimal::from_f32(v)
        .ok_or_else(|| Error::msg(format!("Cannot convert {v} to Decimal"))),
    Value::Float64(Some(v)) => Decimal::from_f64(v)
        .ok_or_else(|| Error::msg(format!("Cannot convert {v} to Decimal"))),
    Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
);

impl_as_value!(
    Uuid,
    Value::Uuid,
    Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
    Value::Blob(Some(ref v)) => Uuid::from_slice(v)
        .with_context(|| format!("Cannot convert a blob of {} bytes to Uuid", v.len())),
);

impl AsValue for String {
    fn as_empty_value() -> Value {
        Value::Varchar(None)
    }
    fn as_value(self) -> Value {
        Value::Varchar(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Varchar(Some(v)) => Ok(v),
            Value::Blob(Some(v)) => String::from_utf8(v.into_vec())
                .context("Cannot convert a blob that is not valid UTF-8 to String"),
            _ => Err(Error::msg(format!("Cannot convert {value:?} to String"))),
        }
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        Ok(input.as_ref().to_string())
    }
}

impl AsValue for Box<[u8]> {
    fn as_empty_value() -> Value {
        Value::Blob(None)
    }
    fn as_value(self) -> Value {
        Value::Blob(Some(self))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Blob(Some(v)) => Ok(v),
            Value::Varchar(Some(v)) => Ok(v.into_bytes().into_boxed_slice()),
            _ => Err(Error::msg(format!("Cannot convert {value:?} to a blob"))),
        }
    }
}

impl AsValue for Vec<u8> {
    fn as_empty_value() -> Value {
        Value::Blob(None)
    }
    fn as_value(self) -> Value {
        Value::Blob(Some(self.into_boxed_slice()))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        <Box<[u8]> as AsValue>::try_from_value(value).map(Into::into)
    }
}

macro_rules! parse_time {
    ($value: ident, $($formats:literal),+ $(,)?) => {
        'value: {
            let input = unquote($value);
            for format in [$($formats,)+] {
                let format = parse_borrowed::<2>(format)?;
                let mut parsed = time::parsing::Parsed::new();
                if let Ok(remaining) = parsed.parse_items(input.as_bytes(), &format) {
                    if remaining.is_empty() {
                        break 'value Ok(parsed.try_into()?);
                    }
                }
            }
            Err(Error::msg(format!(
                "Cannot parse `{}` as {}",
                truncate_long!(input),
                any::type_name::<Self>()
            )))
        }
    };
}

macro_rules! impl_as_value_temporal {
    ($source:ty, $destination:path, |$input:ident| $parse:expr $(, $pat_rest:pat => $expr_rest:expr)* $(,)?) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match value {
                    $destination(Some(v)) => Ok(v),
                    Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
                    $($pat_rest => $expr_rest,)*
                    _ => Err(Error::msg(format!(
                        "Cannot convert {value:?} to {}",
                        any::type_name::<Self>(),
                    ))),
                }
            }
            fn parse(input: impl AsRef<str>) -> Result<Self> {
                let $input = input.as_ref();
                $parse
            }
        }
    };
}

impl_as_value_temporal!(Date, Value::Date, |v| parse_time!(v, "[year]-[month]-[day]"));

impl_as_value_temporal!(Time, Value::Time, |v| parse_time!(
    v,
    "[hour]:[minute]:[second].[subsecond]",
    "[hour]:[minute]:[second]",
    "[hour]:[minute]",
));

impl_as_value_temporal!(PrimitiveDateTime, Value::Timestamp, |v| parse_time!(
    v,
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]",
    "[year]-[month]-[day]T[hour]:[minute]:[second]",
    "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]",
    "[year]-[month]-[day] [hour]:[minute]:[second]",
    "[year]-[month]-[day] [hour]:[minute]",
));

impl_as_value_temporal!(
    OffsetDateTime,
    Value::TimestampWithTimezone,
    |v| parse_time!(
        v,
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory]:[offset_minute]",
        "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]",
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory]:[offset_minute]",
        "[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]",
    )
    .or_else(|_: Error| <PrimitiveDateTime as AsValue>::parse(v).map(|v| v.assume_utc())),
    Value::Timestamp(Some(timestamp)) => Ok(timestamp.assume_utc()),
);

impl<T: AsValue> AsValue for Option<T> {
    fn as_empty_value() -> Value {
        T::as_empty_value()
    }
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => T::as_empty_value(),
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            return Ok(None);
        }
        T::try_from_value(value).map(Some)
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        T::parse(input).map(Some)
    }
}
