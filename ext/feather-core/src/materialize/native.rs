//! Sentinel-based native representation

use super::dictionary_codes;
use crate::{arrow_conversion::arrow_to_value, schema::TimeUnit, FeatherError, FeatherValue, Result};
use arrow_array::{
    cast::AsArray,
    types::{
        Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type, UInt16Type,
        UInt32Type, UInt64Type, UInt8Type,
    },
    Array, ArrowPrimitiveType,
};
use arrow_schema::DataType;
use ordered_float::OrderedFloat;
use std::sync::Arc;

/// Missing marker for datetime and timedelta values
pub const NAT: i64 = i64::MIN;

/// Largest magnitude an f64 holds without losing integer precision
const MAX_EXACT_F64_INT: u64 = 1 << 53;

/// A column as plain typed vectors
#[derive(Debug, Clone, PartialEq)]
pub enum NativeColumn {
    Bool(Vec<bool>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    /// Missing values are `NaN`
    Float32(Vec<f32>),
    /// Missing values are `NaN`; integer columns with nulls land here too
    Float64(Vec<f64>),
    /// Missing values are [`NAT`]
    ///
    /// A stored tick equal to `i64::MIN` is indistinguishable from a missing
    /// value and reads back as null here, unlike the nullable backend.
    DateTime {
        unit: TimeUnit,
        tz: Option<Arc<str>>,
        values: Vec<i64>,
    },
    /// Missing values are [`NAT`]; a stored `i64::MIN` reads back as null
    Timedelta { unit: TimeUnit, values: Vec<i64> },
    /// Missing values have code `-1`
    Categorical {
        codes: Vec<i32>,
        categories: Box<NativeColumn>,
    },
    Object(Vec<FeatherValue>),
}

impl NativeColumn {
    pub fn len(&self) -> usize {
        match self {
            NativeColumn::Bool(v) => v.len(),
            NativeColumn::Int8(v) => v.len(),
            NativeColumn::Int16(v) => v.len(),
            NativeColumn::Int32(v) => v.len(),
            NativeColumn::Int64(v) => v.len(),
            NativeColumn::UInt8(v) => v.len(),
            NativeColumn::UInt16(v) => v.len(),
            NativeColumn::UInt32(v) => v.len(),
            NativeColumn::UInt64(v) => v.len(),
            NativeColumn::Float32(v) => v.len(),
            NativeColumn::Float64(v) => v.len(),
            NativeColumn::DateTime { values, .. } => values.len(),
            NativeColumn::Timedelta { values, .. } => values.len(),
            NativeColumn::Categorical { codes, .. } => codes.len(),
            NativeColumn::Object(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The slot at `row`; sentinels that mean "missing" read back as `Null`
    ///
    /// `NaN` in a float column is returned as `NaN`: once stored it cannot be
    /// told apart from a missing value.
    pub fn value(&self, row: usize) -> Result<FeatherValue> {
        let out_of_bounds =
            || FeatherError::invalid_argument(format!("row {} out of bounds", row));
        Ok(match self {
            NativeColumn::Bool(v) => FeatherValue::Boolean(*v.get(row).ok_or_else(out_of_bounds)?),
            NativeColumn::Int8(v) => FeatherValue::Int8(*v.get(row).ok_or_else(out_of_bounds)?),
            NativeColumn::Int16(v) => FeatherValue::Int16(*v.get(row).ok_or_else(out_of_bounds)?),
            NativeColumn::Int32(v) => FeatherValue::Int32(*v.get(row).ok_or_else(out_of_bounds)?),
            NativeColumn::Int64(v) => FeatherValue::Int64(*v.get(row).ok_or_else(out_of_bounds)?),
            NativeColumn::UInt8(v) => FeatherValue::UInt8(*v.get(row).ok_or_else(out_of_bounds)?),
            NativeColumn::UInt16(v) => {
                FeatherValue::UInt16(*v.get(row).ok_or_else(out_of_bounds)?)
            }
            NativeColumn::UInt32(v) => {
                FeatherValue::UInt32(*v.get(row).ok_or_else(out_of_bounds)?)
            }
            NativeColumn::UInt64(v) => {
                FeatherValue::UInt64(*v.get(row).ok_or_else(out_of_bounds)?)
            }
            NativeColumn::Float32(v) => {
                FeatherValue::Float32(OrderedFloat(*v.get(row).ok_or_else(out_of_bounds)?))
            }
            NativeColumn::Float64(v) => {
                FeatherValue::Float64(OrderedFloat(*v.get(row).ok_or_else(out_of_bounds)?))
            }
            NativeColumn::DateTime { unit, tz, values } => {
                match *values.get(row).ok_or_else(out_of_bounds)? {
                    NAT => FeatherValue::Null,
                    v => FeatherValue::Timestamp(v, *unit, tz.clone()),
                }
            }
            NativeColumn::Timedelta { unit, values } => {
                match *values.get(row).ok_or_else(out_of_bounds)? {
                    NAT => FeatherValue::Null,
                    v => FeatherValue::Duration(v, *unit),
                }
            }
            NativeColumn::Categorical { codes, categories } => {
                match *codes.get(row).ok_or_else(out_of_bounds)? {
                    -1 => FeatherValue::Null,
                    code => categories.value(code as usize)?,
                }
            }
            NativeColumn::Object(v) => v.get(row).ok_or_else(out_of_bounds)?.clone(),
        })
    }
}

/// Convert one array to its native representation
pub fn to_native(array: &dyn Array) -> Result<NativeColumn> {
    let has_nulls = array.null_count() > 0;
    Ok(match array.data_type() {
        DataType::Boolean if !has_nulls => {
            NativeColumn::Bool(array.as_boolean().values().iter().collect())
        }
        DataType::Int8 => integers::<Int8Type>(array, NativeColumn::Int8)?,
        DataType::Int16 => integers::<Int16Type>(array, NativeColumn::Int16)?,
        DataType::Int32 => integers::<Int32Type>(array, NativeColumn::Int32)?,
        DataType::Int64 => integers::<Int64Type>(array, NativeColumn::Int64)?,
        DataType::UInt8 => integers::<UInt8Type>(array, NativeColumn::UInt8)?,
        DataType::UInt16 => integers::<UInt16Type>(array, NativeColumn::UInt16)?,
        DataType::UInt32 => integers::<UInt32Type>(array, NativeColumn::UInt32)?,
        DataType::UInt64 => integers::<UInt64Type>(array, NativeColumn::UInt64)?,
        DataType::Float32 => NativeColumn::Float32(
            array
                .as_primitive::<Float32Type>()
                .iter()
                .map(|v| v.unwrap_or(f32::NAN))
                .collect(),
        ),
        DataType::Float64 => NativeColumn::Float64(
            array
                .as_primitive::<Float64Type>()
                .iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect(),
        ),
        DataType::Timestamp(unit, tz) => NativeColumn::DateTime {
            unit: (*unit).into(),
            tz: tz.as_ref().map(|tz| Arc::from(tz.as_ref())),
            values: ticks(array)?,
        },
        DataType::Duration(unit) => NativeColumn::Timedelta {
            unit: (*unit).into(),
            values: ticks(array)?,
        },
        DataType::Dictionary(_, _) => {
            let dictionary = array
                .as_any_dictionary_opt()
                .ok_or_else(|| FeatherError::conversion("expected a dictionary array"))?;
            let codes = dictionary_codes(dictionary.keys())?
                .into_iter()
                .map(|code| match code {
                    Some(code) => i32::try_from(code).map_err(|_| {
                        FeatherError::conversion(format!("category code {} exceeds i32", code))
                    }),
                    None => Ok(-1),
                })
                .collect::<Result<Vec<_>>>()?;
            NativeColumn::Categorical {
                codes,
                categories: Box::new(to_native(dictionary.values().as_ref())?),
            }
        }
        // Booleans with nulls and everything without a native vector type
        _ => NativeColumn::Object(
            (0..array.len())
                .map(|i| arrow_to_value(array, i))
                .collect::<Result<Vec<_>>>()?,
        ),
    })
}

/// Integers keep their width without nulls and widen to f64 with `NaN` otherwise
fn integers<T>(array: &dyn Array, exact: fn(Vec<T::Native>) -> NativeColumn) -> Result<NativeColumn>
where
    T: ArrowPrimitiveType,
    T::Native: num::ToPrimitive,
{
    let array = array
        .as_primitive_opt::<T>()
        .ok_or_else(|| FeatherError::conversion("integer column has unexpected layout"))?;
    if array.null_count() == 0 {
        return Ok(exact(array.values().to_vec()));
    }

    let mut lossy = 0usize;
    let values = array
        .iter()
        .map(|v| match v {
            Some(v) => {
                let as_float = num::ToPrimitive::to_f64(&v).unwrap_or(f64::NAN);
                if as_float.abs() > MAX_EXACT_F64_INT as f64 {
                    lossy += 1;
                }
                as_float
            }
            None => f64::NAN,
        })
        .collect();
    if lossy > 0 {
        log::warn!(
            "{} integer values above 2^53 lost precision when nulls forced a float column",
            lossy
        );
    }
    Ok(NativeColumn::Float64(values))
}

/// Raw i64 ticks of a temporal array, [`NAT`] for nulls
fn ticks(array: &dyn Array) -> Result<Vec<i64>> {
    let raw = arrow::compute::cast(array, &DataType::Int64)?;
    Ok(raw
        .as_primitive::<Int64Type>()
        .iter()
        .map(|v| v.unwrap_or(NAT))
        .collect())
}
