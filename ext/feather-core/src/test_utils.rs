//! Test utilities for feather-core

#[cfg(test)]
pub mod test {
    use crate::{Column, FeatherValue, LogicalType, Table};
    use arrow_array::{BooleanArray, Float64Array, Int64Array, StringArray};
    use ordered_float::OrderedFloat;
    use std::sync::Arc;

    /// A small table with common column types and a few nulls
    pub fn sample_table() -> Table {
        Table::try_new(vec![
            Column::new("id", Arc::new(Int64Array::from(vec![1, 2, 3, 4]))),
            Column::new(
                "name",
                Arc::new(StringArray::from(vec![Some("Alice"), None, Some("Carol"), Some("Dan")])),
            ),
            Column::new(
                "salary",
                Arc::new(Float64Array::from(vec![Some(75000.0), Some(50000.5), None, Some(0.0)])),
            ),
            Column::new(
                "active",
                Arc::new(BooleanArray::from(vec![true, false, true, true])),
            ),
        ])
        .unwrap()
    }

    /// A wide table of `columns` int64 columns with `rows` rows each
    pub fn wide_table(columns: usize, rows: usize) -> Table {
        Table::try_new(
            (0..columns)
                .map(|c| {
                    let values: Vec<Option<i64>> = (0..rows)
                        .map(|r| if (r + c) % 7 == 0 { None } else { Some((r * c) as i64) })
                        .collect();
                    Column::new(format!("col_{}", c), Arc::new(Int64Array::from(values)))
                })
                .collect(),
        )
        .unwrap()
    }

    /// A float column built from scalar values
    pub fn float_column(name: &str, values: &[Option<f64>]) -> Column {
        Column::from_values(
            name,
            LogicalType::Float64,
            true,
            values
                .iter()
                .map(|v| match v {
                    Some(v) => FeatherValue::Float64(OrderedFloat(*v)),
                    None => FeatherValue::Null,
                })
                .collect(),
        )
        .unwrap()
    }
}
