//! Core feather writing functionality

use crate::{
    format::{
        self, column_codec::encode_array, compression::compress_block, ColumnChunk, Compression,
        Footer, FORMAT_VERSION,
    },
    parallel::map_columns,
    FeatherError, Result, Table,
};
use indexmap::IndexMap;
use std::io::Write;

// Default configuration constants
pub const DEFAULT_COMPRESSION: Compression = Compression::Lz4;
pub const DEFAULT_USE_THREADS: bool = true;
pub const CREATED_BY: &str = concat!("feather-core ", env!("CARGO_PKG_VERSION"));

/// Options for encoding a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    pub compression: Compression,
    pub use_threads: bool,
    /// Worker cap; falls back to `FEATHER_NUM_THREADS`, then available parallelism
    pub num_threads: Option<usize>,
    /// Merged over the table's own metadata
    pub metadata: IndexMap<String, String>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            compression: DEFAULT_COMPRESSION,
            use_threads: DEFAULT_USE_THREADS,
            num_threads: None,
            metadata: IndexMap::new(),
        }
    }
}

/// Builder for creating a configured Writer
#[derive(Debug, Clone, Default)]
pub struct WriterBuilder {
    options: WriteOptions,
}

impl WriterBuilder {
    /// Create a new WriterBuilder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_options(options: WriteOptions) -> Self {
        Self { options }
    }

    /// Set the compression algorithm
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.options.compression = compression;
        self
    }

    /// Compress column blocks on a worker pool
    pub fn with_use_threads(mut self, use_threads: bool) -> Self {
        self.options.use_threads = use_threads;
        self
    }

    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.options.num_threads = Some(num_threads);
        self
    }

    /// Add a file-level key/value pair
    pub fn with_metadata<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.options.metadata.insert(key.into(), value.into());
        self
    }

    /// Build a Writer with the configured settings
    pub fn build<W: Write>(self, writer: W) -> Result<Writer<W>> {
        self.options.compression.validate()?;
        Ok(Writer {
            inner: writer,
            options: self.options,
            finished: false,
        })
    }
}

/// One column block, ready to be placed in the file
struct EncodedBlock {
    bytes: Vec<u8>,
    uncompressed_length: u64,
    compression: format::BlockCompression,
    checksum: u32,
}

/// Writes a single table as a complete feather file to any `Write`
pub struct Writer<W: Write> {
    inner: W,
    options: WriteOptions,
    finished: bool,
}

impl<W: Write> Writer<W> {
    /// Create a new writer with default settings
    pub fn new(writer: W) -> Result<Self> {
        WriterBuilder::new().build(writer)
    }

    /// Encode `table` and write header, column blocks, footer and trailer
    ///
    /// Every column type is checked before the first byte is written, so an
    /// unsupported column leaves the sink untouched. Returns the number of
    /// bytes written.
    pub fn write_table(&mut self, table: &Table) -> Result<u64> {
        if self.finished {
            return Err(FeatherError::invalid_argument(
                "writer already holds a complete file",
            ));
        }

        let mut schema = table.schema()?;
        for (key, value) in &self.options.metadata {
            schema.metadata.insert(key.clone(), value.clone());
        }

        let compression = self.options.compression;
        let blocks = map_columns(
            table.columns(),
            self.options.use_threads,
            self.options.num_threads,
            |column| {
                let body = encode_array(column.array().as_ref())?;
                let uncompressed_length = body.len() as u64;
                let (kind, bytes) = compress_block(body, compression);
                log::debug!(
                    "encoded column '{}': {} -> {} bytes ({:?})",
                    column.name(),
                    uncompressed_length,
                    bytes.len(),
                    kind
                );
                Ok(EncodedBlock {
                    checksum: crc32fast::hash(&bytes),
                    bytes,
                    uncompressed_length,
                    compression: kind,
                })
            },
        )?;

        // Blocks are placed sequentially in table order
        let mut position = 0u64;
        self.write_all(&format::header(), &mut position)?;

        let mut chunks = Vec::with_capacity(blocks.len());
        for block in blocks {
            let padding = format::padding_for(position);
            self.write_all(&[0u8; format::BLOCK_ALIGNMENT as usize][..padding], &mut position)?;
            chunks.push(ColumnChunk {
                offset: position,
                length: block.bytes.len() as u64,
                uncompressed_length: block.uncompressed_length,
                compression: block.compression,
                checksum: block.checksum,
            });
            self.write_all(&block.bytes, &mut position)?;
        }

        let footer = Footer {
            version: FORMAT_VERSION,
            created_by: CREATED_BY.to_string(),
            num_rows: table.num_rows() as u64,
            schema,
            columns: chunks,
        };
        let footer_bytes = footer.to_bytes()?;
        let trailer = format::trailer(&footer_bytes)?;
        self.write_all(&footer_bytes, &mut position)?;
        self.write_all(&trailer, &mut position)?;
        self.inner.flush()?;
        self.finished = true;

        log::info!(
            "wrote feather file: {} columns, {} rows, {} bytes",
            table.num_columns(),
            table.num_rows(),
            position
        );
        Ok(position)
    }

    /// Get back the underlying sink
    pub fn into_inner(self) -> W {
        self.inner
    }

    fn write_all(&mut self, bytes: &[u8], position: &mut u64) -> Result<()> {
        self.inner.write_all(bytes)?;
        *position += bytes.len() as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{format::MAGIC, Column};
    use arrow_array::{Int32Array, NullArray};
    use std::sync::Arc;

    #[test]
    fn test_writer_layout() {
        let table = Table::try_new(vec![Column::new(
            "a",
            Arc::new(Int32Array::from(vec![1, 2, 3])),
        )])
        .unwrap();

        let mut writer = Writer::new(Vec::new()).unwrap();
        let written = writer.write_table(&table).unwrap();
        let bytes = writer.into_inner();

        assert_eq!(written, bytes.len() as u64);
        assert_eq!(&bytes[..4], MAGIC);
        assert_eq!(&bytes[bytes.len() - 8..bytes.len() - 4], MAGIC);
    }

    #[test]
    fn test_writer_refuses_second_table() {
        let table = Table::with_num_rows(vec![], 0).unwrap();
        let mut writer = Writer::new(Vec::new()).unwrap();
        writer.write_table(&table).unwrap();
        assert!(writer.write_table(&table).is_err());
    }

    #[test]
    fn test_unsupported_column_writes_nothing() {
        let table = Table::try_new(vec![
            Column::new("ok", Arc::new(Int32Array::from(vec![1]))),
            Column::new("nothing", Arc::new(NullArray::new(1))),
        ])
        .unwrap();

        let mut writer = Writer::new(Vec::new()).unwrap();
        let err = writer.write_table(&table).unwrap_err();
        assert!(matches!(err, FeatherError::UnsupportedType(_)));
        assert!(writer.into_inner().is_empty());
    }

    #[test]
    fn test_invalid_zstd_level_rejected() {
        let result = WriterBuilder::new()
            .with_compression(Compression::Zstd(10_000))
            .build(Vec::new());
        assert!(matches!(result, Err(FeatherError::InvalidArgument(_))));
    }
}
