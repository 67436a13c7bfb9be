//! In-memory columnar table backed by Arrow arrays

use crate::{
    arrow_conversion::{arrow_to_value, values_to_arrow_array},
    schema::{Field, LogicalType, Schema},
    FeatherError, FeatherValue, Result,
};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use arrow_array::ArrayRef;
use arrow_schema::FieldRef;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;

/// A named Arrow array
#[derive(Debug, Clone)]
pub struct Column {
    field: FieldRef,
    array: ArrayRef,
}

impl Column {
    /// Create a nullable column from an array
    pub fn new<S: Into<String>>(name: S, array: ArrayRef) -> Self {
        let field = arrow_schema::Field::new(name.into(), array.data_type().clone(), true);
        Self {
            field: Arc::new(field),
            array,
        }
    }

    /// Create a column with an explicit field, which must describe the array
    pub fn try_from_field(field: FieldRef, array: ArrayRef) -> Result<Self> {
        if field.data_type() != array.data_type() {
            return Err(FeatherError::invalid_argument(format!(
                "column '{}' declares {:?} but holds {:?}",
                field.name(),
                field.data_type(),
                array.data_type()
            )));
        }
        if !field.is_nullable() && array.null_count() > 0 {
            return Err(FeatherError::invalid_argument(format!(
                "column '{}' is not nullable but contains {} nulls",
                field.name(),
                array.null_count()
            )));
        }
        Ok(Self { field, array })
    }

    /// Build a column out of scalar values
    pub fn from_values<S: Into<String>>(
        name: S,
        logical_type: LogicalType,
        nullable: bool,
        values: Vec<FeatherValue>,
    ) -> Result<Self> {
        let field = Field::new(name, logical_type, nullable).to_arrow()?;
        let array = values_to_arrow_array(values, &field)?;
        Self::try_from_field(Arc::new(field), array)
    }

    pub fn name(&self) -> &str {
        self.field.name()
    }

    pub fn field(&self) -> &FieldRef {
        &self.field
    }

    pub fn array(&self) -> &ArrayRef {
        &self.array
    }

    pub fn len(&self) -> usize {
        self.array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    /// The footer description of this column
    pub fn logical_field(&self) -> Result<Field> {
        Field::try_from_arrow(&self.field)
    }

    pub fn value(&self, row: usize) -> Result<FeatherValue> {
        if row >= self.array.len() {
            return Err(FeatherError::invalid_argument(format!(
                "row {} out of bounds for column '{}' of length {}",
                row,
                self.name(),
                self.array.len()
            )));
        }
        arrow_to_value(self.array.as_ref(), row)
    }
}

/// Ordered, uniquely named columns of equal length
#[derive(Debug, Clone)]
pub struct Table {
    columns: Vec<Column>,
    num_rows: usize,
    metadata: IndexMap<String, String>,
}

impl Table {
    /// Build a table, taking the row count from the first column
    ///
    /// A table without columns has zero rows; use [`Table::with_num_rows`]
    /// to keep a row count without any columns.
    pub fn try_new(columns: Vec<Column>) -> Result<Self> {
        let num_rows = columns.first().map(Column::len).unwrap_or(0);
        Self::with_num_rows(columns, num_rows)
    }

    /// Build a table with an explicit row count
    pub fn with_num_rows(columns: Vec<Column>, num_rows: usize) -> Result<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name()) {
                return Err(FeatherError::invalid_argument(format!(
                    "duplicate column name '{}'",
                    column.name()
                )));
            }
            if column.len() != num_rows {
                return Err(FeatherError::invalid_argument(format!(
                    "column '{}' has {} rows, expected {}",
                    column.name(),
                    column.len(),
                    num_rows
                )));
            }
        }

        Ok(Self {
            columns,
            num_rows,
            metadata: IndexMap::new(),
        })
    }

    /// Attach file-level key/value metadata
    pub fn with_metadata(mut self, metadata: IndexMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn from_record_batch(batch: &RecordBatch) -> Result<Self> {
        let columns = batch
            .schema()
            .fields()
            .iter()
            .zip(batch.columns())
            .map(|(field, array)| Column::try_from_field(field.clone(), array.clone()))
            .collect::<Result<Vec<_>>>()?;
        let metadata = batch
            .schema()
            .metadata()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(Self::with_num_rows(columns, batch.num_rows())?.with_metadata(metadata))
    }

    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let schema = arrow_schema::Schema::new_with_metadata(
            self.columns
                .iter()
                .map(|c| c.field.clone())
                .collect::<Vec<_>>(),
            self.metadata
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        );
        let options = RecordBatchOptions::new().with_row_count(Some(self.num_rows));
        Ok(RecordBatch::try_new_with_options(
            Arc::new(schema),
            self.columns.iter().map(|c| c.array.clone()).collect(),
            &options,
        )?)
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn column_at(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn metadata(&self) -> &IndexMap<String, String> {
        &self.metadata
    }

    /// Describe the table with logical types
    ///
    /// Fails with `UnsupportedType` for the first column whose Arrow type has
    /// no binary encoding.
    pub fn schema(&self) -> Result<Schema> {
        let fields = self
            .columns
            .iter()
            .map(Column::logical_field)
            .collect::<Result<Vec<_>>>()?;
        Ok(Schema {
            fields,
            metadata: self.metadata.clone(),
        })
    }

    /// All values of one row, in column order
    pub fn row(&self, index: usize) -> Result<Vec<FeatherValue>> {
        if index >= self.num_rows {
            return Err(FeatherError::invalid_argument(format!(
                "row {} out of bounds for table of {} rows",
                index, self.num_rows
            )));
        }
        self.columns.iter().map(|c| c.value(index)).collect()
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.num_rows == other.num_rows
            && self.columns.len() == other.columns.len()
            && self.columns.iter().zip(&other.columns).all(|(a, b)| {
                a.field.name() == b.field.name()
                    && a.field.data_type() == b.field.data_type()
                    && a.field.is_nullable() == b.field.is_nullable()
                    && a.array.to_data() == b.array.to_data()
            })
    }
}
