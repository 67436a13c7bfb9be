//! The columnar codec capability
//!
//! Callers that persist tables depend on [`ColumnarCodec`] rather than on the
//! concrete writer and reader, so the capability can be injected or left out.

use crate::{
    reader::{ReadOptions, Reader},
    source::ChunkReader,
    writer::{WriteOptions, WriterBuilder},
    Result, Table,
};
use bytes::Bytes;
use std::io::Write;

/// Encodes tables to bytes and decodes them back
pub trait ColumnarCodec: Send + Sync {
    /// Short identifier for logs
    fn name(&self) -> &str;

    /// Write `table` as a complete file into `sink`, returning bytes written
    fn write_table(&self, table: &Table, sink: &mut dyn Write, options: &WriteOptions)
        -> Result<u64>;

    /// Decode the columns selected by `options` from `source`
    fn read_table(&self, source: &dyn ChunkReader, options: &ReadOptions) -> Result<Table>;
}

/// The built-in feather codec
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatherCodec;

impl FeatherCodec {
    pub fn new() -> Self {
        Self
    }

    /// Encode a table into an in-memory file
    pub fn encode(&self, table: &Table, options: &WriteOptions) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_table(table, &mut out, options)?;
        Ok(out)
    }

    /// Decode an in-memory file
    pub fn decode(&self, bytes: Bytes, options: &ReadOptions) -> Result<Table> {
        self.read_table(&bytes, options)
    }
}

impl ColumnarCodec for FeatherCodec {
    fn name(&self) -> &str {
        "feather"
    }

    fn write_table(
        &self,
        table: &Table,
        sink: &mut dyn Write,
        options: &WriteOptions,
    ) -> Result<u64> {
        let mut writer = WriterBuilder::from_options(options.clone()).build(sink)?;
        writer.write_table(table)
    }

    fn read_table(&self, source: &dyn ChunkReader, options: &ReadOptions) -> Result<Table> {
        Reader::try_new(source)?.read_table(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Column, Compression};
    use arrow_array::Float64Array;
    use std::sync::Arc;

    #[test]
    fn test_codec_roundtrip() {
        let table = Table::try_new(vec![Column::new(
            "x",
            Arc::new(Float64Array::from(vec![Some(0.5), None, Some(f64::NAN)])),
        )])
        .unwrap();

        let codec = FeatherCodec::new();
        let bytes = codec.encode(&table, &WriteOptions::default()).unwrap();
        let decoded = codec
            .decode(Bytes::from(bytes), &ReadOptions::default())
            .unwrap();
        assert_eq!(decoded, table);
    }

    #[test]
    fn test_sample_table_roundtrip_all_compressions() {
        let table = crate::test_utils::test::sample_table();
        let codec = FeatherCodec::new();
        for compression in [Compression::Uncompressed, Compression::Lz4, Compression::Zstd(3)] {
            let options = WriteOptions {
                compression,
                ..WriteOptions::default()
            };
            let bytes = codec.encode(&table, &options).unwrap();
            let decoded = codec
                .decode(Bytes::from(bytes), &ReadOptions::default())
                .unwrap();
            assert_eq!(decoded, table);
        }
    }

    #[test]
    fn test_codec_is_object_safe() {
        let codec: Arc<dyn ColumnarCodec> = Arc::new(FeatherCodec);
        assert_eq!(codec.name(), "feather");
    }
}
