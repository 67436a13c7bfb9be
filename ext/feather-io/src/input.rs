//! What callers may hand to the write path
//!
//! Only a [`Table`] is persisted. The other shapes are accepted by the type
//! system so that misuse surfaces as `InvalidInput` at runtime, before any
//! stream is opened, rather than being silently coerced.

use arrow_array::{ArrayRef, RecordBatch};
use feather_core::{Column, FeatherError, Result, Table};
use indexmap::IndexMap;

pub const NOT_A_TABLE: &str = "feather only supports IO with tables";

#[derive(Debug, Clone)]
pub enum WriteInput {
    Table(Table),
    /// Loose named arrays
    Arrays(IndexMap<String, ArrayRef>),
    /// A single column
    Column(Column),
    RecordBatch(RecordBatch),
}

impl WriteInput {
    pub fn kind(&self) -> &'static str {
        match self {
            WriteInput::Table(_) => "table",
            WriteInput::Arrays(_) => "mapping of arrays",
            WriteInput::Column(_) => "column",
            WriteInput::RecordBatch(_) => "record batch",
        }
    }

    /// The table to write, or `InvalidInput` for anything else
    pub fn into_table(self) -> Result<Table> {
        match self {
            WriteInput::Table(table) => Ok(table),
            other => {
                log::debug!("rejecting write input of kind {}", other.kind());
                Err(FeatherError::invalid_input(NOT_A_TABLE))
            }
        }
    }
}

impl From<Table> for WriteInput {
    fn from(table: Table) -> Self {
        WriteInput::Table(table)
    }
}

impl From<IndexMap<String, ArrayRef>> for WriteInput {
    fn from(arrays: IndexMap<String, ArrayRef>) -> Self {
        WriteInput::Arrays(arrays)
    }
}

impl From<Column> for WriteInput {
    fn from(column: Column) -> Self {
        WriteInput::Column(column)
    }
}

impl From<RecordBatch> for WriteInput {
    fn from(batch: RecordBatch) -> Self {
        WriteInput::RecordBatch(batch)
    }
}
