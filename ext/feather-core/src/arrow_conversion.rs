//! Bidirectional conversion between Arrow arrays and FeatherValue
//!
//! Reading a single slot back out of an Arrow array is what the object
//! representation of the native backend and row access are built on;
//! the reverse direction lets callers assemble columns from scalars.

use crate::{schema::TimeUnit, FeatherError, FeatherValue, Result};
use arrow_array::builder::*;
use arrow_array::cast::AsArray;
use arrow_array::types::*;
use arrow_array::{Array, ArrayRef, ArrowPrimitiveType, ListArray, StructArray};
use arrow_buffer::{i256, BooleanBufferBuilder, OffsetBuffer};
use arrow_schema::{DataType, Field, Fields};
use bytes::Bytes;
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use std::sync::Arc;

/// Convert a single value from an Arrow array at the given index to a FeatherValue
pub fn arrow_to_value(array: &dyn Array, index: usize) -> Result<FeatherValue> {
    use arrow_array::*;

    if array.is_null(index) {
        return Ok(FeatherValue::Null);
    }

    match array.data_type() {
        DataType::Boolean => {
            let array = downcast_array::<BooleanArray>(array)?;
            Ok(FeatherValue::Boolean(array.value(index)))
        }
        DataType::Int8 => Ok(FeatherValue::Int8(
            downcast_array::<Int8Array>(array)?.value(index),
        )),
        DataType::Int16 => Ok(FeatherValue::Int16(
            downcast_array::<Int16Array>(array)?.value(index),
        )),
        DataType::Int32 => Ok(FeatherValue::Int32(
            downcast_array::<Int32Array>(array)?.value(index),
        )),
        DataType::Int64 => Ok(FeatherValue::Int64(
            downcast_array::<Int64Array>(array)?.value(index),
        )),
        DataType::UInt8 => Ok(FeatherValue::UInt8(
            downcast_array::<UInt8Array>(array)?.value(index),
        )),
        DataType::UInt16 => Ok(FeatherValue::UInt16(
            downcast_array::<UInt16Array>(array)?.value(index),
        )),
        DataType::UInt32 => Ok(FeatherValue::UInt32(
            downcast_array::<UInt32Array>(array)?.value(index),
        )),
        DataType::UInt64 => Ok(FeatherValue::UInt64(
            downcast_array::<UInt64Array>(array)?.value(index),
        )),
        DataType::Float32 => {
            let array = downcast_array::<Float32Array>(array)?;
            Ok(FeatherValue::Float32(OrderedFloat(array.value(index))))
        }
        DataType::Float64 => {
            let array = downcast_array::<Float64Array>(array)?;
            Ok(FeatherValue::Float64(OrderedFloat(array.value(index))))
        }

        // String and binary types
        DataType::Utf8 => {
            let array = downcast_array::<StringArray>(array)?;
            Ok(FeatherValue::String(Arc::from(array.value(index))))
        }
        DataType::LargeUtf8 => {
            let array = downcast_array::<LargeStringArray>(array)?;
            Ok(FeatherValue::String(Arc::from(array.value(index))))
        }
        DataType::Binary => {
            let array = downcast_array::<BinaryArray>(array)?;
            Ok(FeatherValue::Bytes(Bytes::copy_from_slice(array.value(index))))
        }
        DataType::LargeBinary => {
            let array = downcast_array::<LargeBinaryArray>(array)?;
            Ok(FeatherValue::Bytes(Bytes::copy_from_slice(array.value(index))))
        }
        DataType::FixedSizeBinary(_) => {
            let array = downcast_array::<FixedSizeBinaryArray>(array)?;
            Ok(FeatherValue::Bytes(Bytes::copy_from_slice(array.value(index))))
        }

        // Date and time types
        DataType::Date32 => Ok(FeatherValue::Date32(
            downcast_array::<Date32Array>(array)?.value(index),
        )),
        DataType::Date64 => Ok(FeatherValue::Date64(
            downcast_array::<Date64Array>(array)?.value(index),
        )),
        DataType::Time32(unit) => {
            let value = match unit {
                arrow_schema::TimeUnit::Second => {
                    downcast_array::<Time32SecondArray>(array)?.value(index)
                }
                arrow_schema::TimeUnit::Millisecond => {
                    downcast_array::<Time32MillisecondArray>(array)?.value(index)
                }
                _ => {
                    return Err(FeatherError::conversion(format!(
                        "Unsupported time32 unit: {:?}",
                        unit
                    )))
                }
            };
            Ok(FeatherValue::Time(value.into(), (*unit).into()))
        }
        DataType::Time64(unit) => {
            let value = match unit {
                arrow_schema::TimeUnit::Microsecond => {
                    downcast_array::<Time64MicrosecondArray>(array)?.value(index)
                }
                arrow_schema::TimeUnit::Nanosecond => {
                    downcast_array::<Time64NanosecondArray>(array)?.value(index)
                }
                _ => {
                    return Err(FeatherError::conversion(format!(
                        "Unsupported time64 unit: {:?}",
                        unit
                    )))
                }
            };
            Ok(FeatherValue::Time(value, (*unit).into()))
        }
        DataType::Timestamp(unit, timezone) => {
            let timezone = timezone.as_ref().map(|s| Arc::from(s.as_ref()));
            let value = match unit {
                arrow_schema::TimeUnit::Second => {
                    downcast_array::<TimestampSecondArray>(array)?.value(index)
                }
                arrow_schema::TimeUnit::Millisecond => {
                    downcast_array::<TimestampMillisecondArray>(array)?.value(index)
                }
                arrow_schema::TimeUnit::Microsecond => {
                    downcast_array::<TimestampMicrosecondArray>(array)?.value(index)
                }
                arrow_schema::TimeUnit::Nanosecond => {
                    downcast_array::<TimestampNanosecondArray>(array)?.value(index)
                }
            };
            Ok(FeatherValue::Timestamp(value, (*unit).into(), timezone))
        }
        DataType::Duration(unit) => {
            let value = match unit {
                arrow_schema::TimeUnit::Second => {
                    downcast_array::<DurationSecondArray>(array)?.value(index)
                }
                arrow_schema::TimeUnit::Millisecond => {
                    downcast_array::<DurationMillisecondArray>(array)?.value(index)
                }
                arrow_schema::TimeUnit::Microsecond => {
                    downcast_array::<DurationMicrosecondArray>(array)?.value(index)
                }
                arrow_schema::TimeUnit::Nanosecond => {
                    downcast_array::<DurationNanosecondArray>(array)?.value(index)
                }
            };
            Ok(FeatherValue::Duration(value, (*unit).into()))
        }

        // Decimal types
        DataType::Decimal128(_precision, scale) => {
            let array = downcast_array::<Decimal128Array>(array)?;
            Ok(FeatherValue::Decimal128(array.value(index), *scale))
        }
        DataType::Decimal256(_precision, scale) => {
            let array = downcast_array::<Decimal256Array>(array)?;
            let bytes = array.value(index).to_le_bytes();
            Ok(FeatherValue::Decimal256(
                num::BigInt::from_signed_bytes_le(&bytes),
                *scale,
            ))
        }

        // Dictionary slots resolve to the referenced dictionary value
        DataType::Dictionary(_, _) => {
            let dictionary = array.as_any_dictionary_opt().ok_or_else(|| {
                FeatherError::conversion("Failed to cast to a dictionary array")
            })?;
            let key = dictionary_key(dictionary.keys(), index)?;
            arrow_to_value(dictionary.values().as_ref(), key)
        }

        // Complex types
        DataType::List(_) => {
            let array = downcast_array::<ListArray>(array)?;
            let list_values = array.value(index);

            let mut values = Vec::with_capacity(list_values.len());
            for i in 0..list_values.len() {
                values.push(arrow_to_value(&list_values, i)?);
            }

            Ok(FeatherValue::List(values))
        }
        DataType::Struct(_) => {
            let array = downcast_array::<StructArray>(array)?;

            let mut map = IndexMap::new();
            for (col_idx, field) in array.fields().iter().enumerate() {
                let column = array.column(col_idx);
                let value = arrow_to_value(column, index)?;
                map.insert(Arc::from(field.name().as_str()), value);
            }

            Ok(FeatherValue::Record(map))
        }

        dt => Err(FeatherError::conversion(format!(
            "Unsupported data type for conversion: {:?}",
            dt
        ))),
    }
}

/// Read a dictionary key as a position into the dictionary values
pub(crate) fn dictionary_key(keys: &dyn Array, index: usize) -> Result<usize> {
    let key = match arrow_to_value(keys, index)? {
        FeatherValue::Int8(k) => k as i64,
        FeatherValue::Int16(k) => k as i64,
        FeatherValue::Int32(k) => k as i64,
        FeatherValue::Int64(k) => k,
        FeatherValue::UInt8(k) => k as i64,
        FeatherValue::UInt16(k) => k as i64,
        FeatherValue::UInt32(k) => k as i64,
        FeatherValue::UInt64(k) => {
            i64::try_from(k).map_err(|_| FeatherError::conversion("dictionary key overflow"))?
        }
        other => {
            return Err(FeatherError::conversion(format!(
                "Dictionary keys must be integers, got {}",
                other.type_name()
            )))
        }
    };
    usize::try_from(key)
        .map_err(|_| FeatherError::conversion(format!("Negative dictionary key {}", key)))
}

/// Convert a vector of FeatherValues to an Arrow array
pub fn values_to_arrow_array(values: Vec<FeatherValue>, field: &Field) -> Result<ArrayRef> {
    let data_type = field.data_type();
    match data_type {
        DataType::Boolean => {
            let mut builder = BooleanBuilder::with_capacity(values.len());
            for value in values {
                match value {
                    FeatherValue::Boolean(b) => builder.append_value(b),
                    FeatherValue::Null => builder.append_null(),
                    _ => return Err(mismatch("Boolean", &value)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }

        // Integer types with automatic upcasting
        DataType::Int8 => build_primitive::<Int8Type>(values, data_type, |v| match v {
            FeatherValue::Int8(i) => Some(i),
            _ => None,
        }),
        DataType::Int16 => build_primitive::<Int16Type>(values, data_type, |v| match v {
            FeatherValue::Int16(i) => Some(i),
            FeatherValue::Int8(i) => Some(i as i16),
            FeatherValue::UInt8(i) => Some(i as i16),
            _ => None,
        }),
        DataType::Int32 => build_primitive::<Int32Type>(values, data_type, |v| match v {
            FeatherValue::Int32(i) => Some(i),
            FeatherValue::Int16(i) => Some(i as i32),
            FeatherValue::Int8(i) => Some(i as i32),
            FeatherValue::UInt16(i) => Some(i as i32),
            FeatherValue::UInt8(i) => Some(i as i32),
            _ => None,
        }),
        DataType::Int64 => build_primitive::<Int64Type>(values, data_type, |v| match v {
            FeatherValue::Int64(i) => Some(i),
            FeatherValue::Int32(i) => Some(i as i64),
            FeatherValue::Int16(i) => Some(i as i64),
            FeatherValue::Int8(i) => Some(i as i64),
            FeatherValue::UInt32(i) => Some(i as i64),
            FeatherValue::UInt16(i) => Some(i as i64),
            FeatherValue::UInt8(i) => Some(i as i64),
            _ => None,
        }),
        DataType::UInt8 => build_primitive::<UInt8Type>(values, data_type, |v| match v {
            FeatherValue::UInt8(i) => Some(i),
            _ => None,
        }),
        DataType::UInt16 => build_primitive::<UInt16Type>(values, data_type, |v| match v {
            FeatherValue::UInt16(i) => Some(i),
            FeatherValue::UInt8(i) => Some(i as u16),
            _ => None,
        }),
        DataType::UInt32 => build_primitive::<UInt32Type>(values, data_type, |v| match v {
            FeatherValue::UInt32(i) => Some(i),
            FeatherValue::UInt16(i) => Some(i as u32),
            FeatherValue::UInt8(i) => Some(i as u32),
            _ => None,
        }),
        DataType::UInt64 => build_primitive::<UInt64Type>(values, data_type, |v| match v {
            FeatherValue::UInt64(i) => Some(i),
            FeatherValue::UInt32(i) => Some(i as u64),
            FeatherValue::UInt16(i) => Some(i as u64),
            FeatherValue::UInt8(i) => Some(i as u64),
            _ => None,
        }),

        // Float types
        DataType::Float32 => build_primitive::<Float32Type>(values, data_type, |v| match v {
            FeatherValue::Float32(f) => Some(f.0),
            _ => None,
        }),
        DataType::Float64 => build_primitive::<Float64Type>(values, data_type, |v| match v {
            FeatherValue::Float64(f) => Some(f.0),
            FeatherValue::Float32(f) => Some(f.0 as f64),
            _ => None,
        }),

        // String and binary
        DataType::Utf8 => {
            let mut builder = StringBuilder::with_capacity(values.len(), 0);
            for value in values {
                match value {
                    FeatherValue::String(s) => builder.append_value(s.as_ref()),
                    FeatherValue::Null => builder.append_null(),
                    _ => return Err(mismatch("String", &value)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::LargeUtf8 => {
            let mut builder = LargeStringBuilder::with_capacity(values.len(), 0);
            for value in values {
                match value {
                    FeatherValue::String(s) => builder.append_value(s.as_ref()),
                    FeatherValue::Null => builder.append_null(),
                    _ => return Err(mismatch("String", &value)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::Binary => {
            let mut builder = BinaryBuilder::with_capacity(values.len(), 0);
            for value in values {
                match value {
                    FeatherValue::Bytes(b) => builder.append_value(&b),
                    FeatherValue::Null => builder.append_null(),
                    _ => return Err(mismatch("Bytes", &value)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::LargeBinary => {
            let mut builder = LargeBinaryBuilder::with_capacity(values.len(), 0);
            for value in values {
                match value {
                    FeatherValue::Bytes(b) => builder.append_value(&b),
                    FeatherValue::Null => builder.append_null(),
                    _ => return Err(mismatch("Bytes", &value)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }
        DataType::FixedSizeBinary(size) => {
            let mut builder = FixedSizeBinaryBuilder::with_capacity(values.len(), *size);
            for value in values {
                match value {
                    FeatherValue::Bytes(b) => {
                        if b.len() != *size as usize {
                            return Err(FeatherError::conversion(format!(
                                "Fixed size binary length mismatch: expected {}, got {}",
                                size,
                                b.len()
                            )));
                        }
                        builder.append_value(&b)?;
                    }
                    FeatherValue::Null => builder.append_null(),
                    _ => return Err(mismatch("Bytes", &value)),
                }
            }
            Ok(Arc::new(builder.finish()))
        }

        // Date and time
        DataType::Date32 => build_primitive::<Date32Type>(values, data_type, |v| match v {
            FeatherValue::Date32(d) => Some(d),
            _ => None,
        }),
        DataType::Date64 => build_primitive::<Date64Type>(values, data_type, |v| match v {
            FeatherValue::Date64(d) => Some(d),
            _ => None,
        }),
        // Times must match the column's unit exactly
        DataType::Time32(arrow_schema::TimeUnit::Second) => {
            build_primitive::<Time32SecondType>(values, data_type, |v| match v {
                FeatherValue::Time(t, TimeUnit::Second) => i32::try_from(t).ok(),
                _ => None,
            })
        }
        DataType::Time32(arrow_schema::TimeUnit::Millisecond) => {
            build_primitive::<Time32MillisecondType>(values, data_type, |v| match v {
                FeatherValue::Time(t, TimeUnit::Millisecond) => i32::try_from(t).ok(),
                _ => None,
            })
        }
        DataType::Time64(arrow_schema::TimeUnit::Microsecond) => {
            build_primitive::<Time64MicrosecondType>(values, data_type, |v| match v {
                FeatherValue::Time(t, TimeUnit::Microsecond) => Some(t),
                _ => None,
            })
        }
        DataType::Time64(arrow_schema::TimeUnit::Nanosecond) => {
            build_primitive::<Time64NanosecondType>(values, data_type, |v| match v {
                FeatherValue::Time(t, TimeUnit::Nanosecond) => Some(t),
                _ => None,
            })
        }
        DataType::Timestamp(unit, _) => {
            // Any timestamp resolution is accepted; the column's unit wins
            let extract = |v: FeatherValue| match v {
                FeatherValue::Timestamp(ts, _, _) => Some(ts),
                _ => None,
            };
            match unit {
                arrow_schema::TimeUnit::Second => {
                    build_primitive::<TimestampSecondType>(values, data_type, extract)
                }
                arrow_schema::TimeUnit::Millisecond => {
                    build_primitive::<TimestampMillisecondType>(values, data_type, extract)
                }
                arrow_schema::TimeUnit::Microsecond => {
                    build_primitive::<TimestampMicrosecondType>(values, data_type, extract)
                }
                arrow_schema::TimeUnit::Nanosecond => {
                    build_primitive::<TimestampNanosecondType>(values, data_type, extract)
                }
            }
        }
        DataType::Duration(unit) => {
            let expected: TimeUnit = (*unit).into();
            let extract = move |v: FeatherValue| match v {
                FeatherValue::Duration(d, u) if u == expected => Some(d),
                _ => None,
            };
            match unit {
                arrow_schema::TimeUnit::Second => {
                    build_primitive::<DurationSecondType>(values, data_type, extract)
                }
                arrow_schema::TimeUnit::Millisecond => {
                    build_primitive::<DurationMillisecondType>(values, data_type, extract)
                }
                arrow_schema::TimeUnit::Microsecond => {
                    build_primitive::<DurationMicrosecondType>(values, data_type, extract)
                }
                arrow_schema::TimeUnit::Nanosecond => {
                    build_primitive::<DurationNanosecondType>(values, data_type, extract)
                }
            }
        }

        // Decimal
        DataType::Decimal128(_, scale) => {
            let scale = *scale;
            build_primitive::<Decimal128Type>(values, data_type, move |v| match v {
                FeatherValue::Decimal128(d, s) if s == scale => Some(d),
                _ => None,
            })
        }
        DataType::Decimal256(_, scale) => {
            let scale = *scale;
            let converted = values
                .into_iter()
                .map(|v| match v {
                    FeatherValue::Decimal256(d, s) if s == scale => {
                        decimal256_from_bigint(&d).map(Some)
                    }
                    FeatherValue::Decimal128(d, s) if s == scale => Ok(Some(i256::from_i128(d))),
                    FeatherValue::Null => Ok(None),
                    other => Err(mismatch("Decimal256", &other)),
                })
                .collect::<Result<Vec<_>>>()?;
            let mut builder =
                Decimal256Builder::with_capacity(converted.len()).with_data_type(data_type.clone());
            builder.extend(converted);
            Ok(Arc::new(builder.finish()))
        }

        // Dictionary columns are built plain, then dictionary-encoded
        DataType::Dictionary(_, value_type) => {
            let value_field = Field::new("values", value_type.as_ref().clone(), true);
            let plain = values_to_arrow_array(values, &value_field)?;
            Ok(arrow::compute::cast(&plain, data_type)?)
        }

        // Complex types
        DataType::List(item_field) => build_list_array(values, item_field),
        DataType::Struct(fields) => build_struct_array(values, fields),

        dt => Err(FeatherError::conversion(format!(
            "Unsupported data type for conversion: {:?}",
            dt
        ))),
    }
}

/// Helper function to downcast an array with better error messages
fn downcast_array<T: 'static>(array: &dyn Array) -> Result<&T> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        FeatherError::conversion(format!("Failed to cast to {}", std::any::type_name::<T>()))
    })
}

fn mismatch(expected: &str, value: &FeatherValue) -> FeatherError {
    FeatherError::conversion(format!(
        "Expected {}, got {:?}",
        expected,
        value.type_name()
    ))
}

/// Build any primitive array; `extract` returns `None` for values of the wrong kind
fn build_primitive<T>(
    values: Vec<FeatherValue>,
    data_type: &DataType,
    extract: impl Fn(FeatherValue) -> Option<T::Native>,
) -> Result<ArrayRef>
where
    T: ArrowPrimitiveType,
{
    let mut builder =
        PrimitiveBuilder::<T>::with_capacity(values.len()).with_data_type(data_type.clone());
    for value in values {
        if value.is_null() {
            builder.append_null();
            continue;
        }
        let type_name = value.type_name();
        match extract(value) {
            Some(native) => builder.append_value(native),
            None => {
                return Err(FeatherError::conversion(format!(
                    "Expected {:?}, got {:?}",
                    data_type, type_name
                )))
            }
        }
    }
    Ok(Arc::new(builder.finish()))
}

/// Convert BigInt to i256, sign-extending to 32 bytes
fn decimal256_from_bigint(bigint: &num::BigInt) -> Result<i256> {
    let mut bytes = bigint.to_signed_bytes_le();
    if bytes.len() > 32 {
        return Err(FeatherError::conversion("Decimal256 value too large"));
    }
    let fill = if bigint.sign() == num::bigint::Sign::Minus {
        0xFF
    } else {
        0x00
    };
    bytes.resize(32, fill);

    let byte_array: [u8; 32] = bytes
        .try_into()
        .map_err(|_| FeatherError::conversion("Failed to convert bytes to i256"))?;
    Ok(i256::from_le_bytes(byte_array))
}

/// Build list array
fn build_list_array(values: Vec<FeatherValue>, item_field: &Arc<Field>) -> Result<ArrayRef> {
    let mut all_items = Vec::new();
    let mut offsets = Vec::with_capacity(values.len() + 1);
    let mut null_buffer_builder = BooleanBufferBuilder::new(values.len());
    offsets.push(0i32);

    for value in values {
        match value {
            FeatherValue::List(items) => {
                all_items.extend(items);
                offsets.push(i32::try_from(all_items.len()).map_err(|_| {
                    FeatherError::conversion("List column exceeds i32 offsets")
                })?);
                null_buffer_builder.append(true);
            }
            FeatherValue::Null => {
                offsets.push(*offsets.last().unwrap_or(&0));
                null_buffer_builder.append(false);
            }
            _ => return Err(mismatch("List", &value)),
        }
    }

    let item_array = values_to_arrow_array(all_items, item_field)?;
    let offset_buffer = OffsetBuffer::new(offsets.into());
    let null_buffer = null_buffer_builder.finish();

    Ok(Arc::new(ListArray::try_new(
        item_field.clone(),
        offset_buffer,
        item_array,
        Some(null_buffer.into()),
    )?))
}

/// Build struct array
fn build_struct_array(values: Vec<FeatherValue>, fields: &Fields) -> Result<ArrayRef> {
    let num_rows = values.len();
    let mut null_buffer_builder = BooleanBufferBuilder::new(num_rows);

    let mut field_columns: Vec<Vec<FeatherValue>> =
        vec![Vec::with_capacity(num_rows); fields.len()];

    for value in values {
        match value {
            FeatherValue::Record(map) => {
                null_buffer_builder.append(true);
                for (idx, field) in fields.iter().enumerate() {
                    let field_value = map
                        .get(field.name().as_str())
                        .cloned()
                        .unwrap_or(FeatherValue::Null);
                    field_columns[idx].push(field_value);
                }
            }
            FeatherValue::Null => {
                null_buffer_builder.append(false);
                for field_column in field_columns.iter_mut() {
                    field_column.push(FeatherValue::Null);
                }
            }
            _ => return Err(mismatch("Record", &value)),
        }
    }

    let field_arrays = field_columns
        .into_iter()
        .zip(fields.iter())
        .map(|(column, field)| values_to_arrow_array(column, field))
        .collect::<Result<Vec<_>>>()?;

    let null_buffer = null_buffer_builder.finish();
    Ok(Arc::new(StructArray::try_new(
        fields.clone(),
        field_arrays,
        Some(null_buffer.into()),
    )?))
}
