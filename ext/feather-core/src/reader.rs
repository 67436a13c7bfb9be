//! Core feather reading functionality

use crate::{
    format::{
        self, column_codec::decode_array, compression::decompress_block, Footer, Trailer,
        HEADER_LEN, TRAILER_LEN,
    },
    parallel::map_columns,
    source::ChunkReader,
    Column, FeatherError, Result, Schema, Table,
};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Which columns a read should decode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSelection {
    Names(Vec<String>),
    Indices(Vec<usize>),
}

impl From<Vec<String>> for ColumnSelection {
    fn from(names: Vec<String>) -> Self {
        ColumnSelection::Names(names)
    }
}

impl From<Vec<&str>> for ColumnSelection {
    fn from(names: Vec<&str>) -> Self {
        ColumnSelection::Names(names.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<usize>> for ColumnSelection {
    fn from(indices: Vec<usize>) -> Self {
        ColumnSelection::Indices(indices)
    }
}

/// Options for decoding a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    /// `None` reads every column
    pub columns: Option<ColumnSelection>,
    pub use_threads: bool,
    pub num_threads: Option<usize>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            columns: None,
            use_threads: true,
            num_threads: None,
        }
    }
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project onto the named columns
    pub fn with_columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(ColumnSelection::Names(
            names.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Project onto columns by footer position
    pub fn with_column_indices<I: IntoIterator<Item = usize>>(mut self, indices: I) -> Self {
        self.columns = Some(ColumnSelection::Indices(indices.into_iter().collect()));
        self
    }

    pub fn with_use_threads(mut self, use_threads: bool) -> Self {
        self.use_threads = use_threads;
        self
    }

    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }
}

/// Core feather reader over any random-access byte source
///
/// Opening a reader touches only the header, the trailer and the footer;
/// column blocks are fetched on demand by [`Reader::read_table`].
pub struct Reader<R> {
    source: R,
    footer: Footer,
}

impl<R: ChunkReader> Reader<R> {
    /// Open a file, validating its framing and footer
    pub fn try_new(source: R) -> Result<Self> {
        let file_len = source.len();
        if file_len < HEADER_LEN + TRAILER_LEN {
            return Err(FeatherError::corrupt(format!(
                "file of {} bytes is too small to be a feather file",
                file_len
            )));
        }

        format::check_header(&source.get_bytes(0, HEADER_LEN as usize)?)?;

        let trailer = Trailer::parse(
            &source.get_bytes(file_len - TRAILER_LEN, TRAILER_LEN as usize)?,
        )?;
        let footer_offset = trailer.footer_offset(file_len)?;
        let footer_bytes = source.get_bytes(footer_offset, trailer.footer_length as usize)?;
        if crc32fast::hash(&footer_bytes) != trailer.footer_checksum {
            return Err(FeatherError::corrupt("footer checksum mismatch"));
        }

        let footer = Footer::from_bytes(&footer_bytes)?;
        footer.validate(footer_offset)?;

        log::debug!(
            "opened feather file: {} columns, {} rows, created by {}",
            footer.columns.len(),
            footer.num_rows,
            footer.created_by
        );
        Ok(Self { source, footer })
    }

    /// Footer contents: schema, row count and per-column block locations
    pub fn metadata(&self) -> &Footer {
        &self.footer
    }

    pub fn schema(&self) -> &Schema {
        &self.footer.schema
    }

    pub fn num_rows(&self) -> u64 {
        self.footer.num_rows
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    /// Resolve a selection to footer positions, deduplicated and in footer order
    pub fn resolve_projection(&self, selection: Option<&ColumnSelection>) -> Result<Vec<usize>> {
        let schema = &self.footer.schema;
        let indices: BTreeSet<usize> = match selection {
            None => (0..schema.len()).collect(),
            Some(ColumnSelection::Names(names)) => names
                .iter()
                .map(|name| {
                    schema.index_of(name).ok_or_else(|| {
                        FeatherError::schema_mismatch(format!(
                            "column '{}' not found; file has {:?}",
                            name,
                            schema.field_names()
                        ))
                    })
                })
                .collect::<Result<_>>()?,
            Some(ColumnSelection::Indices(indices)) => indices
                .iter()
                .map(|&index| {
                    if index < schema.len() {
                        Ok(index)
                    } else {
                        Err(FeatherError::schema_mismatch(format!(
                            "column index {} out of range for {} columns",
                            index,
                            schema.len()
                        )))
                    }
                })
                .collect::<Result<_>>()?,
        };
        Ok(indices.into_iter().collect())
    }

    /// Decode the selected columns into a table
    ///
    /// Only the blocks of the projected columns are fetched from the source.
    pub fn read_table(&self, options: &ReadOptions) -> Result<Table> {
        let indices = self.resolve_projection(options.columns.as_ref())?;
        let num_rows = usize::try_from(self.footer.num_rows)
            .map_err(|_| FeatherError::corrupt("row count exceeds address space"))?;

        let columns = map_columns(&indices, options.use_threads, options.num_threads, |&index| {
            self.read_column(index, num_rows)
        })?;

        log::info!(
            "read {} of {} columns, {} rows",
            columns.len(),
            self.footer.columns.len(),
            num_rows
        );
        let table = Table::with_num_rows(columns, num_rows)?;
        Ok(table.with_metadata(self.footer.schema.metadata.clone()))
    }

    /// Fetch, verify, decompress and decode one column block
    pub fn read_column(&self, index: usize, num_rows: usize) -> Result<Column> {
        let (chunk, field) = self
            .footer
            .columns
            .get(index)
            .zip(self.footer.schema.fields.get(index))
            .ok_or_else(|| {
                FeatherError::schema_mismatch(format!("no column at index {}", index))
            })?;
        let in_column = |e: FeatherError| match e {
            FeatherError::CorruptFile(msg) => {
                FeatherError::corrupt(format!("column '{}': {}", field.name, msg))
            }
            other => other,
        };

        let length = usize::try_from(chunk.length)
            .map_err(|_| FeatherError::corrupt("block length exceeds address space"))
            .map_err(in_column)?;
        let uncompressed_length = usize::try_from(chunk.uncompressed_length)
            .map_err(|_| FeatherError::corrupt("block length exceeds address space"))
            .map_err(in_column)?;

        let block = self.source.get_bytes(chunk.offset, length)?;
        if crc32fast::hash(&block) != chunk.checksum {
            return Err(in_column(FeatherError::corrupt("block checksum mismatch")));
        }

        let body = decompress_block(chunk.compression, &block, uncompressed_length)
            .map_err(in_column)?;
        let arrow_field = field.to_arrow().map_err(in_column)?;
        let array = decode_array(&body, arrow_field.data_type()).map_err(in_column)?;

        if array.len() != num_rows {
            return Err(in_column(FeatherError::corrupt(format!(
                "decoded {} rows, footer records {}",
                array.len(),
                num_rows
            ))));
        }

        log::debug!(
            "decoded column '{}' ({} -> {} bytes)",
            field.name,
            chunk.length,
            chunk.uncompressed_length
        );
        Column::try_from_field(Arc::new(arrow_field), array)
            .map_err(|e| in_column(FeatherError::corrupt(e.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Writer;
    use arrow_array::{Int32Array, StringArray};
    use bytes::Bytes;

    fn encoded() -> Bytes {
        let table = Table::try_new(vec![
            Column::new("a", Arc::new(Int32Array::from(vec![1, 2, 3]))),
            Column::new("b", Arc::new(StringArray::from(vec!["x", "y", "z"]))),
            Column::new("c", Arc::new(Int32Array::from(vec![7, 8, 9]))),
        ])
        .unwrap();
        let mut writer = Writer::new(Vec::new()).unwrap();
        writer.write_table(&table).unwrap();
        Bytes::from(writer.into_inner())
    }

    #[test]
    fn test_reader_metadata() {
        let reader = Reader::try_new(encoded()).unwrap();
        assert_eq!(reader.num_rows(), 3);
        assert_eq!(reader.schema().field_names(), vec!["a", "b", "c"]);
        assert_eq!(reader.metadata().columns.len(), 3);
    }

    #[test]
    fn test_projection_is_deduplicated_in_footer_order() {
        let reader = Reader::try_new(encoded()).unwrap();
        let selection = ColumnSelection::Names(vec!["c".into(), "a".into(), "c".into()]);
        assert_eq!(reader.resolve_projection(Some(&selection)).unwrap(), vec![0, 2]);

        let selection = ColumnSelection::Indices(vec![2, 1]);
        assert_eq!(reader.resolve_projection(Some(&selection)).unwrap(), vec![1, 2]);

        let missing = ColumnSelection::Names(vec!["nope".into()]);
        assert!(matches!(
            reader.resolve_projection(Some(&missing)),
            Err(FeatherError::SchemaMismatch(_))
        ));
        let out_of_range = ColumnSelection::from(vec![3usize]);
        assert!(matches!(
            reader.resolve_projection(Some(&out_of_range)),
            Err(FeatherError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_threaded_read_matches_serial() {
        let table = crate::test_utils::test::wide_table(12, 100);
        let mut writer = Writer::new(Vec::new()).unwrap();
        writer.write_table(&table).unwrap();
        let reader = Reader::try_new(Bytes::from(writer.into_inner())).unwrap();

        let threaded = reader
            .read_table(&ReadOptions::new().with_num_threads(4))
            .unwrap();
        let serial = reader
            .read_table(&ReadOptions::new().with_use_threads(false))
            .unwrap();
        assert_eq!(threaded, serial);
        assert_eq!(threaded, table);
    }

    #[test]
    fn test_too_small_is_corrupt() {
        let err = Reader::try_new(Bytes::from_static(b"FEA1")).err().unwrap();
        assert!(matches!(err, FeatherError::CorruptFile(_)));
    }
}
