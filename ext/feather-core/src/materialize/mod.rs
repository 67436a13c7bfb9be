//! Turning decoded Arrow columns into caller-facing value representations
//!
//! Three backends are available:
//!
//! - [`DtypeBackend::Native`]: plain typed vectors with sentinel values for
//!   missing data. This is the legacy default and it is lossy: integer
//!   columns with nulls become `f64` with `NaN`, so values above 2^53 lose
//!   precision and a `NaN` that was stored cannot be told apart from a null.
//! - [`DtypeBackend::NullableBoxed`]: every slot is an `Option`, no sentinels.
//! - [`DtypeBackend::Arrow`]: the decoded arrays themselves, shared not copied.

mod native;
mod nullable;

pub use native::{NativeColumn, NAT};
pub use nullable::NullableColumn;

use crate::{arrow_conversion::arrow_to_value, FeatherError, FeatherValue, Result, Table};
use arrow_array::{cast::AsArray, types::Int64Type, Array, ArrayRef};
use arrow_schema::DataType;
use indexmap::IndexMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Selects how decoded columns are represented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DtypeBackend {
    Native,
    NullableBoxed,
    Arrow,
}

impl FromStr for DtypeBackend {
    type Err = FeatherError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "numpy" | "native" => Ok(DtypeBackend::Native),
            "numpy_nullable" | "nullable" => Ok(DtypeBackend::NullableBoxed),
            "pyarrow" | "arrow" => Ok(DtypeBackend::Arrow),
            other => Err(FeatherError::invalid_backend(format!(
                "dtype_backend '{}' is invalid; only 'numpy_nullable' and 'pyarrow' are allowed",
                other
            ))),
        }
    }
}

impl fmt::Display for DtypeBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DtypeBackend::Native => "numpy",
            DtypeBackend::NullableBoxed => "numpy_nullable",
            DtypeBackend::Arrow => "pyarrow",
        };
        f.write_str(name)
    }
}

/// One column in the representation chosen by a backend
#[derive(Debug, Clone)]
pub enum MaterializedColumn {
    Native(NativeColumn),
    Nullable(NullableColumn),
    Arrow(ArrayRef),
}

impl MaterializedColumn {
    pub fn len(&self) -> usize {
        match self {
            MaterializedColumn::Native(column) => column.len(),
            MaterializedColumn::Nullable(column) => column.len(),
            MaterializedColumn::Arrow(array) => array.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The slot at `row` as a scalar, for comparing representations
    pub fn value(&self, row: usize) -> Result<FeatherValue> {
        if row >= self.len() {
            return Err(FeatherError::invalid_argument(format!(
                "row {} out of bounds for column of length {}",
                row,
                self.len()
            )));
        }
        match self {
            MaterializedColumn::Native(column) => column.value(row),
            MaterializedColumn::Nullable(column) => column.value(row),
            MaterializedColumn::Arrow(array) => arrow_to_value(array.as_ref(), row),
        }
    }

    pub fn as_native(&self) -> Option<&NativeColumn> {
        match self {
            MaterializedColumn::Native(column) => Some(column),
            _ => None,
        }
    }

    pub fn as_nullable(&self) -> Option<&NullableColumn> {
        match self {
            MaterializedColumn::Nullable(column) => Some(column),
            _ => None,
        }
    }

    pub fn as_arrow(&self) -> Option<&ArrayRef> {
        match self {
            MaterializedColumn::Arrow(array) => Some(array),
            _ => None,
        }
    }
}

/// A table after materialization; owned by the caller
#[derive(Debug, Clone)]
pub struct MaterializedTable {
    backend: DtypeBackend,
    names: Vec<String>,
    columns: Vec<MaterializedColumn>,
    num_rows: usize,
    metadata: IndexMap<String, String>,
}

impl MaterializedTable {
    pub fn backend(&self) -> DtypeBackend {
        self.backend
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.names.iter().map(String::as_str).collect()
    }

    pub fn column(&self, name: &str) -> Option<&MaterializedColumn> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
    }

    pub fn columns(&self) -> &[MaterializedColumn] {
        &self.columns
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MaterializedColumn)> {
        self.names.iter().map(String::as_str).zip(&self.columns)
    }

    pub fn metadata(&self) -> &IndexMap<String, String> {
        &self.metadata
    }

    /// All values of one row, in column order
    pub fn row(&self, index: usize) -> Result<Vec<FeatherValue>> {
        self.columns.iter().map(|c| c.value(index)).collect()
    }
}

/// Convert every column of `table` with the selected backend
pub fn materialize(table: &Table, backend: DtypeBackend) -> Result<MaterializedTable> {
    let convert: fn(&ArrayRef) -> Result<MaterializedColumn> = match backend {
        DtypeBackend::Native => {
            |array| native::to_native(array.as_ref()).map(MaterializedColumn::Native)
        }
        DtypeBackend::NullableBoxed => {
            |array| nullable::to_nullable(array.as_ref()).map(MaterializedColumn::Nullable)
        }
        DtypeBackend::Arrow => |array| Ok(MaterializedColumn::Arrow(Arc::clone(array))),
    };

    let mut names = Vec::with_capacity(table.num_columns());
    let mut columns = Vec::with_capacity(table.num_columns());
    for column in table.columns() {
        let converted = convert(column.array()).map_err(|e| match e {
            FeatherError::Conversion(msg) => {
                FeatherError::conversion(format!("column '{}': {}", column.name(), msg))
            }
            other => other,
        })?;
        names.push(column.name().to_string());
        columns.push(converted);
    }

    log::debug!(
        "materialized {} columns with the {} backend",
        columns.len(),
        backend
    );
    Ok(MaterializedTable {
        backend,
        names,
        columns,
        num_rows: table.num_rows(),
        metadata: table.metadata().clone(),
    })
}

/// Dictionary keys as positions into the values; `None` for null slots
pub(crate) fn dictionary_codes(keys: &dyn Array) -> Result<Vec<Option<usize>>> {
    let widened = arrow::compute::cast(keys, &DataType::Int64)?;
    widened
        .as_primitive::<Int64Type>()
        .iter()
        .zip(0..keys.len())
        .map(|(code, row)| match (code, keys.is_valid(row)) {
            (Some(code), true) => usize::try_from(code)
                .map(Some)
                .map_err(|_| FeatherError::conversion(format!("negative dictionary key {}", code))),
            (None, true) => Err(FeatherError::conversion("dictionary key overflows i64")),
            (_, false) => Ok(None),
        })
        .collect()
}
