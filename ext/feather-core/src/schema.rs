//! Logical schema persisted in the file footer
//!
//! The footer describes every column with a [`LogicalType`] rather than an
//! Arrow `DataType` directly, so the set of types that have a binary
//! encoding is closed and checked up front.

use crate::{FeatherError, Result};
use arrow_schema::DataType;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Resolution of temporal types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    Second,
    Millisecond,
    Microsecond,
    Nanosecond,
}

impl From<arrow_schema::TimeUnit> for TimeUnit {
    fn from(unit: arrow_schema::TimeUnit) -> Self {
        match unit {
            arrow_schema::TimeUnit::Second => TimeUnit::Second,
            arrow_schema::TimeUnit::Millisecond => TimeUnit::Millisecond,
            arrow_schema::TimeUnit::Microsecond => TimeUnit::Microsecond,
            arrow_schema::TimeUnit::Nanosecond => TimeUnit::Nanosecond,
        }
    }
}

impl From<TimeUnit> for arrow_schema::TimeUnit {
    fn from(unit: TimeUnit) -> Self {
        match unit {
            TimeUnit::Second => arrow_schema::TimeUnit::Second,
            TimeUnit::Millisecond => arrow_schema::TimeUnit::Millisecond,
            TimeUnit::Microsecond => arrow_schema::TimeUnit::Microsecond,
            TimeUnit::Nanosecond => arrow_schema::TimeUnit::Nanosecond,
        }
    }
}

/// Column types that have a defined binary representation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalType {
    Boolean,

    // Integer types
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,

    // Floating point types
    Float32,
    Float64,

    // String and binary types
    Utf8,
    LargeUtf8,
    Binary,
    LargeBinary,
    FixedSizeBinary(i32),

    // Date/Time types
    Date32,
    Date64,
    Time32(TimeUnit),
    Time64(TimeUnit),
    Timestamp(TimeUnit, Option<String>),
    Duration(TimeUnit),

    // Decimal types (precision, scale)
    Decimal128(u8, i8),
    Decimal256(u8, i8),

    /// Dictionary-encoded (categorical) column; `key` is always an integer type
    Dictionary {
        key: Box<LogicalType>,
        value: Box<LogicalType>,
    },

    // Nested types
    List(Box<Field>),
    Struct(Vec<Field>),
}

/// A named, typed column description
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub logical_type: LogicalType,
    pub nullable: bool,
}

/// Ordered column descriptions plus file-level metadata
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<Field>,
    #[serde(default)]
    pub metadata: IndexMap<String, String>,
}

impl LogicalType {
    /// Get the logical type name for display
    pub fn type_name(&self) -> &'static str {
        match self {
            LogicalType::Boolean => "Boolean",
            LogicalType::Int8 => "Int8",
            LogicalType::Int16 => "Int16",
            LogicalType::Int32 => "Int32",
            LogicalType::Int64 => "Int64",
            LogicalType::UInt8 => "UInt8",
            LogicalType::UInt16 => "UInt16",
            LogicalType::UInt32 => "UInt32",
            LogicalType::UInt64 => "UInt64",
            LogicalType::Float32 => "Float32",
            LogicalType::Float64 => "Float64",
            LogicalType::Utf8 => "Utf8",
            LogicalType::LargeUtf8 => "LargeUtf8",
            LogicalType::Binary => "Binary",
            LogicalType::LargeBinary => "LargeBinary",
            LogicalType::FixedSizeBinary(_) => "FixedSizeBinary",
            LogicalType::Date32 => "Date32",
            LogicalType::Date64 => "Date64",
            LogicalType::Time32(_) => "Time32",
            LogicalType::Time64(_) => "Time64",
            LogicalType::Timestamp(_, _) => "Timestamp",
            LogicalType::Duration(_) => "Duration",
            LogicalType::Decimal128(_, _) => "Decimal128",
            LogicalType::Decimal256(_, _) => "Decimal256",
            LogicalType::Dictionary { .. } => "Dictionary",
            LogicalType::List(_) => "List",
            LogicalType::Struct(_) => "Struct",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            LogicalType::Int8
                | LogicalType::Int16
                | LogicalType::Int32
                | LogicalType::Int64
                | LogicalType::UInt8
                | LogicalType::UInt16
                | LogicalType::UInt32
                | LogicalType::UInt64
        )
    }

    pub fn is_nested(&self) -> bool {
        matches!(self, LogicalType::List(_) | LogicalType::Struct(_))
    }

    /// Map an Arrow type onto a logical type, failing for types without an encoding
    pub fn try_from_arrow(data_type: &DataType) -> Result<Self> {
        Ok(match data_type {
            DataType::Boolean => LogicalType::Boolean,
            DataType::Int8 => LogicalType::Int8,
            DataType::Int16 => LogicalType::Int16,
            DataType::Int32 => LogicalType::Int32,
            DataType::Int64 => LogicalType::Int64,
            DataType::UInt8 => LogicalType::UInt8,
            DataType::UInt16 => LogicalType::UInt16,
            DataType::UInt32 => LogicalType::UInt32,
            DataType::UInt64 => LogicalType::UInt64,
            DataType::Float32 => LogicalType::Float32,
            DataType::Float64 => LogicalType::Float64,
            DataType::Utf8 => LogicalType::Utf8,
            DataType::LargeUtf8 => LogicalType::LargeUtf8,
            DataType::Binary => LogicalType::Binary,
            DataType::LargeBinary => LogicalType::LargeBinary,
            DataType::FixedSizeBinary(size) => LogicalType::FixedSizeBinary(*size),
            DataType::Date32 => LogicalType::Date32,
            DataType::Date64 => LogicalType::Date64,
            DataType::Time32(unit) => LogicalType::Time32((*unit).into()),
            DataType::Time64(unit) => LogicalType::Time64((*unit).into()),
            DataType::Timestamp(unit, tz) => {
                LogicalType::Timestamp((*unit).into(), tz.as_ref().map(|tz| tz.to_string()))
            }
            DataType::Duration(unit) => LogicalType::Duration((*unit).into()),
            DataType::Decimal128(precision, scale) => LogicalType::Decimal128(*precision, *scale),
            DataType::Decimal256(precision, scale) => LogicalType::Decimal256(*precision, *scale),
            DataType::Dictionary(key, value) => {
                let key = LogicalType::try_from_arrow(key)?;
                if !key.is_integer() {
                    return Err(FeatherError::unsupported_type(format!(
                        "dictionary keys must be integers, got {}",
                        key.type_name()
                    )));
                }
                LogicalType::Dictionary {
                    key: Box::new(key),
                    value: Box::new(LogicalType::try_from_arrow(value)?),
                }
            }
            DataType::List(item) => LogicalType::List(Box::new(Field::try_from_arrow(item)?)),
            DataType::Struct(fields) => LogicalType::Struct(
                fields
                    .iter()
                    .map(|f| Field::try_from_arrow(f))
                    .collect::<Result<Vec<_>>>()?,
            ),
            other => {
                return Err(FeatherError::unsupported_type(format!(
                    "no binary encoding defined for {:?}",
                    other
                )))
            }
        })
    }

    /// Convert to the Arrow type used for the in-memory buffers
    pub fn to_arrow(&self) -> Result<DataType> {
        use arrow_schema::TimeUnit as ArrowUnit;

        Ok(match self {
            LogicalType::Boolean => DataType::Boolean,
            LogicalType::Int8 => DataType::Int8,
            LogicalType::Int16 => DataType::Int16,
            LogicalType::Int32 => DataType::Int32,
            LogicalType::Int64 => DataType::Int64,
            LogicalType::UInt8 => DataType::UInt8,
            LogicalType::UInt16 => DataType::UInt16,
            LogicalType::UInt32 => DataType::UInt32,
            LogicalType::UInt64 => DataType::UInt64,
            LogicalType::Float32 => DataType::Float32,
            LogicalType::Float64 => DataType::Float64,
            LogicalType::Utf8 => DataType::Utf8,
            LogicalType::LargeUtf8 => DataType::LargeUtf8,
            LogicalType::Binary => DataType::Binary,
            LogicalType::LargeBinary => DataType::LargeBinary,
            LogicalType::FixedSizeBinary(size) => {
                if *size < 0 {
                    return Err(FeatherError::schema_mismatch(format!(
                        "negative fixed size binary width {}",
                        size
                    )));
                }
                DataType::FixedSizeBinary(*size)
            }
            LogicalType::Date32 => DataType::Date32,
            LogicalType::Date64 => DataType::Date64,
            LogicalType::Time32(unit) => match unit {
                TimeUnit::Second | TimeUnit::Millisecond => DataType::Time32((*unit).into()),
                _ => {
                    return Err(FeatherError::schema_mismatch(format!(
                        "Time32 does not support {:?}",
                        unit
                    )))
                }
            },
            LogicalType::Time64(unit) => match unit {
                TimeUnit::Microsecond | TimeUnit::Nanosecond => DataType::Time64((*unit).into()),
                _ => {
                    return Err(FeatherError::schema_mismatch(format!(
                        "Time64 does not support {:?}",
                        unit
                    )))
                }
            },
            LogicalType::Timestamp(unit, tz) => DataType::Timestamp(
                ArrowUnit::from(*unit),
                tz.as_ref().map(|tz| Arc::from(tz.as_str())),
            ),
            LogicalType::Duration(unit) => DataType::Duration((*unit).into()),
            LogicalType::Decimal128(precision, scale) => DataType::Decimal128(*precision, *scale),
            LogicalType::Decimal256(precision, scale) => DataType::Decimal256(*precision, *scale),
            LogicalType::Dictionary { key, value } => {
                if !key.is_integer() {
                    return Err(FeatherError::schema_mismatch(format!(
                        "dictionary keys must be integers, got {}",
                        key.type_name()
                    )));
                }
                DataType::Dictionary(Box::new(key.to_arrow()?), Box::new(value.to_arrow()?))
            }
            LogicalType::List(item) => DataType::List(Arc::new(item.to_arrow()?)),
            LogicalType::Struct(fields) => DataType::Struct(
                fields
                    .iter()
                    .map(Field::to_arrow)
                    .collect::<Result<Vec<_>>>()?
                    .into(),
            ),
        })
    }
}

impl Field {
    pub fn new<S: Into<String>>(name: S, logical_type: LogicalType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            logical_type,
            nullable,
        }
    }

    pub fn try_from_arrow(field: &arrow_schema::Field) -> Result<Self> {
        let logical_type = LogicalType::try_from_arrow(field.data_type()).map_err(|e| match e {
            FeatherError::UnsupportedType(msg) => {
                FeatherError::unsupported_type(format!("column '{}': {}", field.name(), msg))
            }
            other => other,
        })?;
        Ok(Self::new(field.name(), logical_type, field.is_nullable()))
    }

    pub fn to_arrow(&self) -> Result<arrow_schema::Field> {
        Ok(arrow_schema::Field::new(
            &self.name,
            self.logical_type.to_arrow()?,
            self.nullable,
        ))
    }
}

impl Schema {
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Position of a top-level column
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Convert to an Arrow schema, carrying the key/value metadata along
    pub fn to_arrow(&self) -> Result<arrow_schema::SchemaRef> {
        let fields = self
            .fields
            .iter()
            .map(Field::to_arrow)
            .collect::<Result<Vec<_>>>()?;
        let metadata = self
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(Arc::new(arrow_schema::Schema::new_with_metadata(
            fields, metadata,
        )))
    }
}

/// Builder for creating schemas
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<Field>,
    metadata: IndexMap<String, String>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_column<S: Into<String>>(
        self,
        name: S,
        logical_type: LogicalType,
        nullable: bool,
    ) -> Self {
        self.with_field(Field::new(name, logical_type, nullable))
    }

    pub fn with_metadata<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Build the schema, rejecting duplicate column names
    pub fn build(self) -> Result<Schema> {
        let mut seen = HashSet::with_capacity(self.fields.len());
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(FeatherError::invalid_argument(format!(
                    "duplicate column name '{}'",
                    field.name
                )));
            }
        }
        Ok(Schema {
            fields: self.fields,
            metadata: self.metadata,
        })
    }
}
