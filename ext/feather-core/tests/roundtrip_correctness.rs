use arrow_array::*;
use feather_core::*;
use indexmap::IndexMap;
use std::sync::Arc;

mod test_helpers;
use test_helpers::*;

#[test]
fn test_all_types_roundtrip_every_compression() {
    let table = all_types_table();

    for compression in [
        Compression::Uncompressed,
        Compression::Lz4,
        Compression::Zstd(1),
        Compression::Zstd(19),
    ] {
        let bytes = encode(&table, compression);
        let decoded = decode(bytes, &ReadOptions::default()).unwrap();
        assert_eq!(decoded, table, "mismatch with {:?}", compression);

        // Arrow backend hands back the decoded arrays unchanged
        let materialized = materialize(&decoded, DtypeBackend::Arrow).unwrap();
        for (name, column) in materialized.iter() {
            let original = table.column(name).unwrap().array();
            let array = column.as_arrow().unwrap();
            assert_eq!(array.data_type(), original.data_type(), "{}", name);
            assert_eq!(array.to_data(), original.to_data(), "{}", name);
        }
    }
}

#[test]
fn test_roundtrip_through_file() {
    let table = all_types_table();
    test_roundtrip(&table, Compression::Lz4).unwrap();
    test_roundtrip(&table, Compression::Zstd(3)).unwrap();
    test_roundtrip(&table, Compression::Uncompressed).unwrap();
}

#[test]
fn test_sliced_input_is_compacted() {
    let table = all_types_table();
    let decoded = decode(encode(&table, Compression::Lz4), &ReadOptions::default()).unwrap();

    let column = decoded.column("utf8_sliced").unwrap();
    assert_eq!(column.array().offset(), 0);
    assert_eq!(column.value(0).unwrap(), FeatherValue::String("v".into()));
    assert_eq!(column.value(4).unwrap(), FeatherValue::String("z".into()));
}

#[test]
fn test_empty_table_roundtrip() {
    let table = Table::try_new(vec![
        col("id", Int64Array::from(Vec::<i64>::new())),
        col("name", StringArray::from(Vec::<Option<&str>>::new())),
        col("flag", BooleanArray::from(Vec::<bool>::new())),
    ])
    .unwrap();
    assert_eq!(table.num_rows(), 0);

    let decoded = decode(encode(&table, Compression::Lz4), &ReadOptions::default()).unwrap();
    assert_eq!(decoded.num_rows(), 0);
    assert_eq!(decoded.column_names(), vec!["id", "name", "flag"]);
    assert_eq!(decoded, table);
}

#[test]
fn test_zero_columns_keep_row_count() {
    let table = Table::with_num_rows(Vec::new(), 7).unwrap();

    let decoded = decode(encode(&table, Compression::Lz4), &ReadOptions::default()).unwrap();
    assert_eq!(decoded.num_columns(), 0);
    assert_eq!(decoded.num_rows(), 7);
}

#[test]
fn test_metadata_roundtrip() {
    let mut metadata = IndexMap::new();
    metadata.insert("origin".to_string(), "sensor-7".to_string());
    metadata.insert("pandas".to_string(), "{\"index_columns\": []}".to_string());

    let table = Table::try_new(vec![col("x", Int32Array::from(vec![1, 2, 3]))])
        .unwrap()
        .with_metadata(metadata.clone());

    let decoded = decode(encode(&table, Compression::Lz4), &ReadOptions::default()).unwrap();
    assert_eq!(decoded.metadata(), &metadata);

    let reader = Reader::try_new(encode(&table, Compression::Lz4)).unwrap();
    assert_eq!(reader.schema().metadata, metadata);
    assert!(reader.metadata().created_by.starts_with("feather-core"));
}

#[test]
fn test_null_patterns_survive() {
    let table = Table::try_new(vec![
        col("all_null", Float64Array::from(vec![None, None, None])),
        col("no_null", Float64Array::from(vec![1.0, 2.0, 3.0])),
        col("some_null", StringArray::from(vec![None, Some("b"), None])),
    ])
    .unwrap();

    let decoded = decode(encode(&table, Compression::Zstd(1)), &ReadOptions::default()).unwrap();
    assert_eq!(decoded.column("all_null").unwrap().array().null_count(), 3);
    assert_eq!(decoded.column("no_null").unwrap().array().null_count(), 0);
    assert_eq!(decoded.column("some_null").unwrap().array().null_count(), 2);
    assert_eq!(decoded.row(1).unwrap()[2], FeatherValue::String("b".into()));
}

#[test]
fn test_large_column_roundtrip() {
    let values: Vec<i64> = (0..100_000).map(|i| i * 3 - 7).collect();
    let strings: Vec<String> = (0..100_000).map(|i| format!("row-{}", i % 97)).collect();
    let table = Table::try_new(vec![
        Column::new("n", Arc::new(Int64Array::from(values))),
        Column::new("s", Arc::new(StringArray::from(strings))),
    ])
    .unwrap();

    for compression in [Compression::Lz4, Compression::Zstd(1)] {
        let bytes = encode(&table, compression);
        let raw = encode(&table, Compression::Uncompressed);
        assert!(bytes.len() < raw.len(), "{:?} did not shrink", compression);
        assert_eq!(decode(bytes, &ReadOptions::default()).unwrap(), table);
    }
}

#[test]
fn test_record_batch_roundtrip() {
    let table = all_types_table();
    let batch = table.to_record_batch().unwrap();
    let back = Table::from_record_batch(&batch).unwrap();
    assert_eq!(back, table);

    let decoded = decode(encode(&back, Compression::Lz4), &ReadOptions::default()).unwrap();
    assert_eq!(decoded.to_record_batch().unwrap().num_rows(), batch.num_rows());
}
