//! Boxed-nullable representation: every slot is an `Option`

use super::dictionary_codes;
use crate::{arrow_conversion::arrow_to_value, schema::TimeUnit, FeatherError, FeatherValue, Result};
use arrow_array::{
    cast::AsArray,
    types::{
        Date32Type, Date64Type, Decimal128Type, Float32Type, Float64Type, Int16Type, Int32Type,
        Int64Type, Int8Type, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
    },
    Array, ArrowPrimitiveType,
};
use arrow_schema::DataType;
use bytes::Bytes;
use ordered_float::OrderedFloat;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum NullableColumn {
    Boolean(Vec<Option<bool>>),
    Int8(Vec<Option<i8>>),
    Int16(Vec<Option<i16>>),
    Int32(Vec<Option<i32>>),
    Int64(Vec<Option<i64>>),
    UInt8(Vec<Option<u8>>),
    UInt16(Vec<Option<u16>>),
    UInt32(Vec<Option<u32>>),
    UInt64(Vec<Option<u64>>),
    Float32(Vec<Option<f32>>),
    Float64(Vec<Option<f64>>),
    String(Vec<Option<Arc<str>>>),
    Binary(Vec<Option<Bytes>>),
    Date32(Vec<Option<i32>>),
    Date64(Vec<Option<i64>>),
    Time {
        unit: TimeUnit,
        values: Vec<Option<i64>>,
    },
    Timestamp {
        unit: TimeUnit,
        tz: Option<Arc<str>>,
        values: Vec<Option<i64>>,
    },
    Duration {
        unit: TimeUnit,
        values: Vec<Option<i64>>,
    },
    Decimal128 {
        precision: u8,
        scale: i8,
        values: Vec<Option<i128>>,
    },
    Categorical {
        codes: Vec<Option<u32>>,
        categories: Box<NullableColumn>,
    },
    /// Decimal256, list and struct columns
    Object(Vec<Option<FeatherValue>>),
}

impl NullableColumn {
    pub fn len(&self) -> usize {
        match self {
            NullableColumn::Boolean(v) => v.len(),
            NullableColumn::Int8(v) => v.len(),
            NullableColumn::Int16(v) => v.len(),
            NullableColumn::Int32(v) => v.len(),
            NullableColumn::Int64(v) => v.len(),
            NullableColumn::UInt8(v) => v.len(),
            NullableColumn::UInt16(v) => v.len(),
            NullableColumn::UInt32(v) => v.len(),
            NullableColumn::UInt64(v) => v.len(),
            NullableColumn::Float32(v) => v.len(),
            NullableColumn::Float64(v) => v.len(),
            NullableColumn::String(v) => v.len(),
            NullableColumn::Binary(v) => v.len(),
            NullableColumn::Date32(v) => v.len(),
            NullableColumn::Date64(v) => v.len(),
            NullableColumn::Time { values, .. }
            | NullableColumn::Timestamp { values, .. }
            | NullableColumn::Duration { values, .. } => values.len(),
            NullableColumn::Decimal128 { values, .. } => values.len(),
            NullableColumn::Categorical { codes, .. } => codes.len(),
            NullableColumn::Object(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_null(&self, row: usize) -> Result<bool> {
        Ok(self.value(row)?.is_null())
    }

    pub fn value(&self, row: usize) -> Result<FeatherValue> {
        fn slot<T: Clone>(values: &[Option<T>], row: usize) -> Result<Option<T>> {
            values
                .get(row)
                .cloned()
                .ok_or_else(|| FeatherError::invalid_argument(format!("row {} out of bounds", row)))
        }
        fn boxed<T: Clone>(
            values: &[Option<T>],
            row: usize,
            wrap: impl FnOnce(T) -> FeatherValue,
        ) -> Result<FeatherValue> {
            Ok(slot(values, row)?.map(wrap).unwrap_or(FeatherValue::Null))
        }

        match self {
            NullableColumn::Boolean(v) => boxed(v, row, FeatherValue::Boolean),
            NullableColumn::Int8(v) => boxed(v, row, FeatherValue::Int8),
            NullableColumn::Int16(v) => boxed(v, row, FeatherValue::Int16),
            NullableColumn::Int32(v) => boxed(v, row, FeatherValue::Int32),
            NullableColumn::Int64(v) => boxed(v, row, FeatherValue::Int64),
            NullableColumn::UInt8(v) => boxed(v, row, FeatherValue::UInt8),
            NullableColumn::UInt16(v) => boxed(v, row, FeatherValue::UInt16),
            NullableColumn::UInt32(v) => boxed(v, row, FeatherValue::UInt32),
            NullableColumn::UInt64(v) => boxed(v, row, FeatherValue::UInt64),
            NullableColumn::Float32(v) => boxed(v, row, |f| FeatherValue::Float32(OrderedFloat(f))),
            NullableColumn::Float64(v) => boxed(v, row, |f| FeatherValue::Float64(OrderedFloat(f))),
            NullableColumn::String(v) => boxed(v, row, FeatherValue::String),
            NullableColumn::Binary(v) => boxed(v, row, FeatherValue::Bytes),
            NullableColumn::Date32(v) => boxed(v, row, FeatherValue::Date32),
            NullableColumn::Date64(v) => boxed(v, row, FeatherValue::Date64),
            NullableColumn::Time { unit, values } => {
                boxed(values, row, |t| FeatherValue::Time(t, *unit))
            }
            NullableColumn::Timestamp { unit, tz, values } => {
                boxed(values, row, |t| FeatherValue::Timestamp(t, *unit, tz.clone()))
            }
            NullableColumn::Duration { unit, values } => {
                boxed(values, row, |d| FeatherValue::Duration(d, *unit))
            }
            NullableColumn::Decimal128 { scale, values, .. } => {
                boxed(values, row, |d| FeatherValue::Decimal128(d, *scale))
            }
            NullableColumn::Categorical { codes, categories } => match slot(codes, row)? {
                Some(code) => categories.value(code as usize),
                None => Ok(FeatherValue::Null),
            },
            NullableColumn::Object(v) => Ok(slot(v, row)?.unwrap_or(FeatherValue::Null)),
        }
    }
}

/// Convert one array to its boxed-nullable representation
pub fn to_nullable(array: &dyn Array) -> Result<NullableColumn> {
    Ok(match array.data_type() {
        DataType::Boolean => NullableColumn::Boolean(array.as_boolean().iter().collect()),
        DataType::Int8 => NullableColumn::Int8(options::<Int8Type>(array)),
        DataType::Int16 => NullableColumn::Int16(options::<Int16Type>(array)),
        DataType::Int32 => NullableColumn::Int32(options::<Int32Type>(array)),
        DataType::Int64 => NullableColumn::Int64(options::<Int64Type>(array)),
        DataType::UInt8 => NullableColumn::UInt8(options::<UInt8Type>(array)),
        DataType::UInt16 => NullableColumn::UInt16(options::<UInt16Type>(array)),
        DataType::UInt32 => NullableColumn::UInt32(options::<UInt32Type>(array)),
        DataType::UInt64 => NullableColumn::UInt64(options::<UInt64Type>(array)),
        DataType::Float32 => NullableColumn::Float32(options::<Float32Type>(array)),
        DataType::Float64 => NullableColumn::Float64(options::<Float64Type>(array)),
        DataType::Utf8 => NullableColumn::String(
            array.as_string::<i32>().iter().map(|s| s.map(Arc::from)).collect(),
        ),
        DataType::LargeUtf8 => NullableColumn::String(
            array.as_string::<i64>().iter().map(|s| s.map(Arc::from)).collect(),
        ),
        DataType::Binary => NullableColumn::Binary(
            array
                .as_binary::<i32>()
                .iter()
                .map(|b| b.map(Bytes::copy_from_slice))
                .collect(),
        ),
        DataType::LargeBinary => NullableColumn::Binary(
            array
                .as_binary::<i64>()
                .iter()
                .map(|b| b.map(Bytes::copy_from_slice))
                .collect(),
        ),
        DataType::FixedSizeBinary(_) => NullableColumn::Binary(
            array
                .as_fixed_size_binary()
                .iter()
                .map(|b| b.map(Bytes::copy_from_slice))
                .collect(),
        ),
        DataType::Date32 => NullableColumn::Date32(options::<Date32Type>(array)),
        DataType::Date64 => NullableColumn::Date64(options::<Date64Type>(array)),
        DataType::Time32(unit) | DataType::Time64(unit) => NullableColumn::Time {
            unit: (*unit).into(),
            values: ticks(array)?,
        },
        DataType::Timestamp(unit, tz) => NullableColumn::Timestamp {
            unit: (*unit).into(),
            tz: tz.as_ref().map(|tz| Arc::from(tz.as_ref())),
            values: ticks(array)?,
        },
        DataType::Duration(unit) => NullableColumn::Duration {
            unit: (*unit).into(),
            values: ticks(array)?,
        },
        DataType::Decimal128(precision, scale) => NullableColumn::Decimal128 {
            precision: *precision,
            scale: *scale,
            values: options::<Decimal128Type>(array),
        },
        DataType::Dictionary(_, _) => {
            let dictionary = array
                .as_any_dictionary_opt()
                .ok_or_else(|| FeatherError::conversion("expected a dictionary array"))?;
            let codes = dictionary_codes(dictionary.keys())?
                .into_iter()
                .map(|code| {
                    code.map(|code| {
                        u32::try_from(code).map_err(|_| {
                            FeatherError::conversion(format!("category code {} exceeds u32", code))
                        })
                    })
                    .transpose()
                })
                .collect::<Result<Vec<_>>>()?;
            NullableColumn::Categorical {
                codes,
                categories: Box::new(to_nullable(dictionary.values().as_ref())?),
            }
        }
        _ => NullableColumn::Object(
            (0..array.len())
                .map(|i| {
                    arrow_to_value(array, i).map(|v| if v.is_null() { None } else { Some(v) })
                })
                .collect::<Result<Vec<_>>>()?,
        ),
    })
}

fn options<T: ArrowPrimitiveType>(array: &dyn Array) -> Vec<Option<T::Native>> {
    array.as_primitive::<T>().iter().collect()
}

/// Raw ticks of a time, timestamp or duration array
fn ticks(array: &dyn Array) -> Result<Vec<Option<i64>>> {
    if let DataType::Time32(_) = array.data_type() {
        let raw = arrow::compute::cast(array, &DataType::Int32)?;
        return Ok(raw
            .as_primitive::<Int32Type>()
            .iter()
            .map(|v| v.map(i64::from))
            .collect());
    }
    let raw = arrow::compute::cast(array, &DataType::Int64)?;
    Ok(raw.as_primitive::<Int64Type>().iter().collect())
}
