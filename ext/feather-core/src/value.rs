use crate::schema::TimeUnit;
use bytes::Bytes;
use indexmap::IndexMap;
use num::BigInt;
use ordered_float::OrderedFloat;
use std::sync::Arc;

/// A single slot of any supported column type
///
/// Temporal values carry their resolution instead of having one variant per
/// unit, so a value can always be rebuilt into the column it came from.
/// Floats are wrapped in [`OrderedFloat`] so `NaN` compares equal to itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatherValue {
    Null,
    Boolean(bool),

    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(OrderedFloat<f32>),
    Float64(OrderedFloat<f64>),

    /// Unscaled value and scale
    Decimal128(i128, i8),
    Decimal256(BigInt, i8),

    String(Arc<str>),
    Bytes(Bytes),

    /// Days since the epoch
    Date32(i32),
    /// Milliseconds since the epoch
    Date64(i64),
    /// Ticks since midnight
    Time(i64, TimeUnit),
    /// Ticks since the epoch, with the column's timezone if it has one
    Timestamp(i64, TimeUnit, Option<Arc<str>>),
    Duration(i64, TimeUnit),

    List(Vec<FeatherValue>),
    /// Struct fields in schema order
    Record(IndexMap<Arc<str>, FeatherValue>),
}

impl FeatherValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FeatherValue::Null)
    }

    /// Short name of the value's kind, used in conversion errors
    pub fn type_name(&self) -> &'static str {
        use FeatherValue::*;

        match self {
            Null => "Null",
            Boolean(_) => "Boolean",
            Int8(_) | Int16(_) | Int32(_) | Int64(_) => "Int",
            UInt8(_) | UInt16(_) | UInt32(_) | UInt64(_) => "UInt",
            Float32(_) | Float64(_) => "Float",
            Decimal128(..) | Decimal256(..) => "Decimal",
            String(_) => "String",
            Bytes(_) => "Bytes",
            Date32(_) | Date64(_) => "Date",
            Time(..) => "Time",
            Timestamp(..) => "Timestamp",
            Duration(..) => "Duration",
            List(_) => "List",
            Record(_) => "Record",
        }
    }

    /// The resolution of a time, timestamp or duration value
    pub fn time_unit(&self) -> Option<TimeUnit> {
        match self {
            FeatherValue::Time(_, unit)
            | FeatherValue::Timestamp(_, unit, _)
            | FeatherValue::Duration(_, unit) => Some(*unit),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(FeatherValue::Int32(42).type_name(), "Int");
        assert_eq!(FeatherValue::UInt64(1).type_name(), "UInt");
        assert!(FeatherValue::Null.is_null());
        assert!(!FeatherValue::Boolean(false).is_null());
        assert_eq!(
            FeatherValue::Timestamp(0, TimeUnit::Second, None).type_name(),
            "Timestamp"
        );
    }

    #[test]
    fn test_nan_equals_itself() {
        assert_eq!(
            FeatherValue::Float64(OrderedFloat(f64::NAN)),
            FeatherValue::Float64(OrderedFloat(f64::NAN))
        );
    }

    #[test]
    fn test_unit_is_part_of_the_value() {
        let millis = FeatherValue::Time(1_000, TimeUnit::Millisecond);
        let seconds = FeatherValue::Time(1_000, TimeUnit::Second);
        assert_ne!(millis, seconds);
        assert_eq!(millis.time_unit(), Some(TimeUnit::Millisecond));
        assert_eq!(FeatherValue::Date32(3).time_unit(), None);

        let utc = FeatherValue::Timestamp(5, TimeUnit::Nanosecond, Some(Arc::from("UTC")));
        let naive = FeatherValue::Timestamp(5, TimeUnit::Nanosecond, None);
        assert_ne!(utc, naive);
    }
}
