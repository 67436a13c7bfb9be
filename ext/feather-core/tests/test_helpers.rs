#![allow(dead_code)]

use arrow_array::types::{Int32Type, Int8Type};
use arrow_array::*;
use arrow_buffer::{i256, NullBuffer};
use arrow_schema::{DataType, Field, Fields};
use bytes::Bytes;
use feather_core::*;
use std::sync::{Arc, Mutex};

/// One column per supported logical type, five rows, mixed null patterns
pub fn all_types_table() -> Table {
    let struct_fields = Fields::from(vec![
        Field::new("x", DataType::Int64, true),
        Field::new("y", DataType::Utf8, true),
    ]);
    let struct_array = StructArray::try_new(
        struct_fields,
        vec![
            Arc::new(Int64Array::from(vec![Some(1), Some(2), None, Some(4), Some(5)])),
            Arc::new(StringArray::from(vec![Some("a"), None, Some("c"), Some("d"), Some("e")])),
        ],
        Some(NullBuffer::from(vec![true, true, false, true, true])),
    )
    .unwrap();

    let dictionary: DictionaryArray<Int32Type> =
        vec![Some("lo"), Some("hi"), None, Some("lo"), Some("mid")]
            .into_iter()
            .collect();
    let small_dictionary: DictionaryArray<Int8Type> =
        vec!["x", "y", "x", "x", "y"].into_iter().collect();

    let columns = vec![
        col("bool", BooleanArray::from(vec![Some(true), None, Some(false), Some(true), None])),
        col("int8", Int8Array::from(vec![-128, -1, 0, 1, 127])),
        col("int16", Int16Array::from(vec![Some(-300), None, Some(0), Some(300), None])),
        col("int32_all_null", Int32Array::from(vec![None, None, None, None, None])),
        col("int64", Int64Array::from(vec![i64::MIN, -1, 0, 1, i64::MAX])),
        col("uint8", UInt8Array::from(vec![Some(0), Some(255), None, Some(1), Some(2)])),
        col("uint16", UInt16Array::from(vec![0, 1, 2, 3, u16::MAX])),
        col("uint32", UInt32Array::from(vec![Some(u32::MAX), None, Some(0), Some(7), Some(8)])),
        col("uint64", UInt64Array::from(vec![u64::MAX, 0, 1, 2, 3])),
        col(
            "float32",
            Float32Array::from(vec![Some(1.5), None, Some(-0.0), Some(f32::INFINITY), Some(2.25)]),
        ),
        col(
            "float64",
            Float64Array::from(vec![Some(f64::NAN), None, Some(1e300), Some(-2.5), Some(0.0)]),
        ),
        col(
            "utf8",
            StringArray::from(vec![Some("hello"), Some(""), None, Some("ünïcödé"), Some("z")]),
        ),
        col(
            "utf8_sliced",
            StringArray::from(vec!["skipped", "v", "w", "x", "y", "z"]).slice(1, 5),
        ),
        col(
            "large_utf8",
            LargeStringArray::from(vec![Some("a"), None, Some("bb"), Some("ccc"), Some("")]),
        ),
        col(
            "binary",
            BinaryArray::from_opt_vec(vec![
                Some(&b"\x00\x01"[..]),
                None,
                Some(&b""[..]),
                Some(&b"abc"[..]),
                Some(&b"\xff"[..]),
            ]),
        ),
        col(
            "large_binary",
            LargeBinaryArray::from_opt_vec(vec![
                Some(&b"x"[..]),
                Some(&b"yy"[..]),
                None,
                None,
                Some(&b"z"[..]),
            ]),
        ),
        col(
            "fixed_binary",
            FixedSizeBinaryArray::try_from_sparse_iter_with_size(
                vec![Some(b"abc"), None, Some(b"def"), Some(b"ghi"), None].into_iter(),
                3,
            )
            .unwrap(),
        ),
        col("date32", Date32Array::from(vec![Some(0), Some(19000), None, Some(-1), Some(1)])),
        col("date64", Date64Array::from(vec![0, 86_400_000, 2, 3, 4])),
        col(
            "time32_s",
            Time32SecondArray::from(vec![Some(0), Some(59), None, Some(3600), Some(86399)]),
        ),
        col("time32_ms", Time32MillisecondArray::from(vec![1, 2, 3, 4, 5])),
        col(
            "time64_us",
            Time64MicrosecondArray::from(vec![Some(1), None, Some(3), Some(4), Some(5)]),
        ),
        col("time64_ns", Time64NanosecondArray::from(vec![10, 20, 30, 40, 50])),
        col(
            "timestamp_ns_utc",
            TimestampNanosecondArray::from(vec![
                Some(1_700_000_000_000_000_000),
                None,
                Some(0),
                Some(-1),
                Some(1),
            ])
            .with_timezone("UTC"),
        ),
        col("timestamp_s", TimestampSecondArray::from(vec![0, 1, 2, 3, 4])),
        col(
            "duration_ms",
            DurationMillisecondArray::from(vec![Some(1000), None, Some(-5), Some(0), Some(7)]),
        ),
        col(
            "decimal128",
            Decimal128Array::from(vec![Some(12345), None, Some(-1), Some(0), Some(99_999_999)])
                .with_precision_and_scale(10, 2)
                .unwrap(),
        ),
        col(
            "decimal256",
            Decimal256Array::from(vec![
                Some(i256::from_i128(-123_456_789)),
                None,
                Some(i256::from_i128(i128::MAX)),
                Some(i256::from_i128(0)),
                Some(i256::from_i128(42)),
            ])
            .with_precision_and_scale(76, 5)
            .unwrap(),
        ),
        col("category", dictionary),
        col("category_small", small_dictionary),
        col(
            "list",
            ListArray::from_iter_primitive::<Int32Type, _, _>(vec![
                Some(vec![Some(1), Some(2)]),
                None,
                Some(vec![]),
                Some(vec![None, Some(4)]),
                Some(vec![Some(5)]),
            ]),
        ),
        col("struct", struct_array),
    ];

    Table::try_new(columns).unwrap()
}

/// Wrap any array as a nullable column
pub fn col(name: &str, array: impl Array + 'static) -> Column {
    Column::new(name, Arc::new(array))
}

/// Encode a table with the given compression
pub fn encode(table: &Table, compression: Compression) -> Bytes {
    let options = WriteOptions {
        compression,
        ..WriteOptions::default()
    };
    Bytes::from(FeatherCodec::new().encode(table, &options).unwrap())
}

pub fn decode(bytes: Bytes, options: &ReadOptions) -> Result<Table> {
    FeatherCodec::new().decode(bytes, options)
}

/// Write to a temporary file, read it back through the file, and compare
pub fn test_roundtrip(
    table: &Table,
    compression: Compression,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    use tempfile::NamedTempFile;

    let temp_file = NamedTempFile::new()?;
    {
        let file = std::fs::File::create(temp_file.path())?;
        let mut writer = WriterBuilder::new()
            .with_compression(compression)
            .build(std::io::BufWriter::new(file))?;
        writer.write_table(table)?;
    }

    let bytes = Bytes::from(std::fs::read(temp_file.path())?);
    let read = Reader::try_new(bytes)?.read_table(&ReadOptions::default())?;
    assert_eq!(&read, table, "table mismatch after roundtrip");
    Ok(())
}

/// A byte source that remembers every range asked of it
pub struct RecordingReader {
    inner: Bytes,
    reads: Mutex<Vec<(u64, usize)>>,
}

impl RecordingReader {
    pub fn new(inner: Bytes) -> Self {
        Self {
            inner,
            reads: Mutex::new(Vec::new()),
        }
    }

    pub fn reads(&self) -> Vec<(u64, usize)> {
        self.reads.lock().unwrap().clone()
    }

    /// Whether any recorded read overlaps `offset..offset + length`
    pub fn touched(&self, offset: u64, length: u64) -> bool {
        self.reads().iter().any(|&(start, len)| {
            let end = start + len as u64;
            start < offset + length && offset < end
        })
    }
}

impl ChunkReader for RecordingReader {
    fn len(&self) -> u64 {
        ChunkReader::len(&self.inner)
    }

    fn get_bytes(&self, start: u64, length: usize) -> Result<Bytes> {
        self.reads.lock().unwrap().push((start, length));
        self.inner.get_bytes(start, length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers_work() {
        let table = all_types_table();
        assert_eq!(table.num_rows(), 5);
        test_roundtrip(&table, Compression::Lz4).unwrap();
    }
}
