use arrow_array::*;
use bytes::Bytes;
use feather_core::format::{self, Footer, Trailer, TRAILER_LEN};
use feather_core::*;

mod test_helpers;
use test_helpers::*;

fn sample() -> Table {
    let strings: Vec<String> = (0..200).map(|i| format!("value {}", i % 13)).collect();
    Table::try_new(vec![
        col("id", Int64Array::from((0..200).collect::<Vec<i64>>())),
        col("label", StringArray::from(strings)),
    ])
    .unwrap()
}

fn expect_corrupt(result: Result<Table>) -> String {
    match result {
        Err(FeatherError::CorruptFile(msg)) => msg,
        Err(other) => panic!("expected CorruptFile, got {:?}", other),
        Ok(_) => panic!("expected CorruptFile, read succeeded"),
    }
}

fn open_corrupt(bytes: Vec<u8>) -> String {
    match Reader::try_new(Bytes::from(bytes)) {
        Err(FeatherError::CorruptFile(msg)) => msg,
        Err(other) => panic!("expected CorruptFile, got {:?}", other),
        Ok(_) => panic!("expected CorruptFile, open succeeded"),
    }
}

/// Split a file into its data region and parsed footer
fn split(bytes: &[u8]) -> (Vec<u8>, Footer) {
    let len = bytes.len() as u64;
    let trailer = Trailer::parse(&bytes[(len - TRAILER_LEN) as usize..]).unwrap();
    let offset = trailer.footer_offset(len).unwrap() as usize;
    let footer = Footer::from_bytes(&bytes[offset..(len - TRAILER_LEN) as usize]).unwrap();
    (bytes[..offset].to_vec(), footer)
}

/// Reassemble a file around raw footer bytes with a matching checksum
fn assemble(mut data: Vec<u8>, footer: &[u8]) -> Vec<u8> {
    data.extend_from_slice(footer);
    data.extend_from_slice(&format::trailer(footer).unwrap());
    data
}

fn with_footer(bytes: &[u8], edit: impl FnOnce(&mut Footer)) -> Vec<u8> {
    let (data, mut footer) = split(bytes);
    edit(&mut footer);
    assemble(data, &footer.to_bytes().unwrap())
}

#[test]
fn test_file_too_small() {
    let msg = open_corrupt(b"FEA1\0\0\0\0FEA1".to_vec());
    assert!(msg.contains("too small"), "{}", msg);
    open_corrupt(Vec::new());
}

#[test]
fn test_leading_magic() {
    let mut bytes = encode(&sample(), Compression::Lz4).to_vec();
    bytes[0] = b'X';
    let msg = open_corrupt(bytes);
    assert!(msg.contains("leading magic"), "{}", msg);
}

#[test]
fn test_trailing_magic() {
    let mut bytes = encode(&sample(), Compression::Lz4).to_vec();
    let at = bytes.len() - 8;
    bytes[at] ^= 0xff;
    let msg = open_corrupt(bytes);
    assert!(msg.contains("trailing magic"), "{}", msg);
}

#[test]
fn test_footer_length_in_last_four_bytes() {
    let original = encode(&sample(), Compression::Lz4).to_vec();
    let at = original.len() - 4;

    let mut huge = original.clone();
    huge[at..].copy_from_slice(&u32::MAX.to_le_bytes());
    let msg = open_corrupt(huge);
    assert!(msg.contains("does not fit"), "{}", msg);

    let mut zero = original.clone();
    zero[at..].copy_from_slice(&0u32.to_le_bytes());
    open_corrupt(zero);

    // Still in range but pointing at the wrong bytes
    let mut shifted = original;
    let len = u32::from_le_bytes([shifted[at], shifted[at + 1], shifted[at + 2], shifted[at + 3]]);
    shifted[at..].copy_from_slice(&(len - 1).to_le_bytes());
    open_corrupt(shifted);
}

#[test]
fn test_footer_checksum() {
    let bytes = encode(&sample(), Compression::Lz4).to_vec();
    let (data, _) = split(&bytes);
    let mut tampered = bytes.clone();
    // flip one byte inside the footer, leave the recorded checksum alone
    tampered[data.len() + 2] ^= 0x01;
    let msg = open_corrupt(tampered);
    assert!(msg.contains("footer checksum"), "{}", msg);
}

#[test]
fn test_footer_is_not_json() {
    let bytes = encode(&sample(), Compression::Lz4).to_vec();
    let (data, _) = split(&bytes);
    let msg = open_corrupt(assemble(data, b"{\"version\": 1, \"columns\": ["));
    assert!(msg.contains("footer does not parse"), "{}", msg);
}

#[test]
fn test_footer_version() {
    let bytes = encode(&sample(), Compression::Lz4).to_vec();
    let msg = open_corrupt(with_footer(&bytes, |f| f.version = 99));
    assert!(msg.contains("version"), "{}", msg);
}

#[test]
fn test_column_count_disagrees_with_schema() {
    let bytes = encode(&sample(), Compression::Lz4).to_vec();
    let msg = open_corrupt(with_footer(&bytes, |f| {
        f.columns.pop();
    }));
    assert!(msg.contains("column blocks"), "{}", msg);
}

#[test]
fn test_block_outside_data_region() {
    let bytes = encode(&sample(), Compression::Lz4).to_vec();

    let past_end = with_footer(&bytes, |f| f.columns[1].offset = 1 << 40);
    open_corrupt(past_end);

    let overlapping = with_footer(&bytes, |f| f.columns[1].offset = f.columns[0].offset);
    open_corrupt(overlapping);

    let into_header = with_footer(&bytes, |f| f.columns[0].offset = 0);
    open_corrupt(into_header);
}

#[test]
fn test_block_checksum() {
    let bytes = encode(&sample(), Compression::Lz4).to_vec();
    let (_, footer) = split(&bytes);
    let mut tampered = bytes;
    let at = footer.columns[1].offset as usize + 3;
    tampered[at] ^= 0x10;

    // opening only touches the footer
    let reader = Reader::try_new(Bytes::from(tampered)).unwrap();
    let msg = expect_corrupt(reader.read_table(&ReadOptions::default()));
    assert!(msg.contains("label") && msg.contains("checksum"), "{}", msg);

    // the intact column is still readable on its own
    let table = reader
        .read_table(&ReadOptions::new().with_columns(["id"]))
        .unwrap();
    assert_eq!(table.num_rows(), 200);
}

#[test]
fn test_block_fails_to_decompress() {
    let bytes = encode(&sample(), Compression::Zstd(1)).to_vec();
    let (_, footer) = split(&bytes);
    assert_eq!(footer.columns[0].compression, BlockCompression::Zstd);

    let chunk = footer.columns[0].clone();
    let mut tampered = bytes.clone();
    let start = chunk.offset as usize;
    let end = start + chunk.length as usize;
    for byte in &mut tampered[start..end] {
        *byte = 0xAB;
    }
    let checksum = crc32fast::hash(&tampered[start..end]);
    let tampered = with_footer(&tampered, |f| f.columns[0].checksum = checksum);

    let msg = expect_corrupt(decode(Bytes::from(tampered), &ReadOptions::default()));
    assert!(msg.contains("'id'"), "{}", msg);
}

#[test]
fn test_lz4_size_prefix_disagrees() {
    let bytes = encode(&sample(), Compression::Lz4).to_vec();
    let (_, footer) = split(&bytes);
    assert_eq!(footer.columns[1].compression, BlockCompression::Lz4);

    let tampered = with_footer(&bytes, |f| f.columns[1].uncompressed_length += 8);
    let msg = expect_corrupt(decode(Bytes::from(tampered), &ReadOptions::default()));
    assert!(msg.contains("prefix"), "{}", msg);
}

#[test]
fn test_block_fails_validation() {
    let bytes = encode(&sample(), Compression::Uncompressed).to_vec();
    let (_, footer) = split(&bytes);
    let chunk = footer.columns[1].clone();
    let start = chunk.offset as usize;
    let end = start + chunk.length as usize;

    assert_eq!(chunk.compression, BlockCompression::Uncompressed);

    // The block ends with the string payload followed by a u32 child count;
    // overwrite the last characters with bytes that are not UTF-8
    let mut tampered = bytes.clone();
    for byte in &mut tampered[end - 16..end - 4] {
        *byte = 0xff;
    }
    let checksum = crc32fast::hash(&tampered[start..end]);
    let tampered = with_footer(&tampered, |f| f.columns[1].checksum = checksum);

    let msg = expect_corrupt(decode(Bytes::from(tampered), &ReadOptions::default()));
    assert!(msg.contains("'label'") && msg.contains("validation"), "{}", msg);
}

#[test]
fn test_row_count_disagrees_with_blocks() {
    let bytes = encode(&sample(), Compression::Lz4).to_vec();
    let tampered = with_footer(&bytes, |f| f.num_rows = 150);

    let msg = expect_corrupt(decode(Bytes::from(tampered), &ReadOptions::default()));
    assert!(msg.contains("150"), "{}", msg);
}

#[test]
fn test_schema_type_disagrees_with_block() {
    let bytes = encode(&sample(), Compression::Lz4).to_vec();
    let tampered = with_footer(&bytes, |f| {
        f.schema.fields[0] = Field::new("id", LogicalType::Utf8, true);
    });

    expect_corrupt(decode(Bytes::from(tampered), &ReadOptions::default()));
}

#[test]
fn test_truncated_file() {
    let bytes = encode(&sample(), Compression::Lz4).to_vec();
    for keep in [bytes.len() - 1, bytes.len() / 2, 20] {
        assert!(
            Reader::try_new(Bytes::from(bytes[..keep].to_vec())).is_err(),
            "truncated to {} bytes",
            keep
        );
    }
}
