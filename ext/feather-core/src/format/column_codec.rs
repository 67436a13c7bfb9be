//! Serialization of a single column's Arrow buffers
//!
//! A column block is one node per array level:
//!
//! ```text
//! node := len:u64 null_count:u64 has_validity:u8 [validity: ceil(len/8) bytes]
//!         n_buffers:u32 (byte_len:u64 bytes)* n_children:u32 node*
//! ```
//!
//! All integers are little-endian. Buffers are written exactly as Arrow
//! lays them out, after the array has been compacted to offset zero.

use crate::{FeatherError, Result};
use arrow::array::{make_array, Array, ArrayData, ArrayRef, MutableArrayData};
use arrow_buffer::Buffer;
use arrow_schema::DataType;

/// Serialize an array into an uncompressed block body
pub fn encode_array(array: &dyn Array) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write_node(&array.to_data(), &mut out)?;
    Ok(out)
}

/// Rebuild an array of `data_type` from a block body
///
/// Every structural problem is reported as `CorruptFile`, including buffers
/// that fail Arrow validation.
pub fn decode_array(body: &[u8], data_type: &DataType) -> Result<ArrayRef> {
    let mut cursor = Cursor { body, pos: 0 };
    let data = read_node(&mut cursor, data_type)?;
    if cursor.pos != body.len() {
        return Err(FeatherError::corrupt(format!(
            "{} trailing bytes after column data",
            body.len() - cursor.pos
        )));
    }
    Ok(make_array(data))
}

fn write_node(data: &ArrayData, out: &mut Vec<u8>) -> Result<()> {
    let compacted = compact(data);
    let data = compacted.as_ref().unwrap_or(data);

    out.extend_from_slice(&(data.len() as u64).to_le_bytes());
    out.extend_from_slice(&(data.null_count() as u64).to_le_bytes());

    match data.nulls() {
        Some(nulls) => {
            out.push(1);
            let bitmap = nulls.inner().sliced();
            let byte_len = validity_len(data.len());
            let mut validity = bitmap
                .as_slice()
                .get(..byte_len)
                .ok_or_else(|| FeatherError::internal("validity bitmap shorter than array"))?
                .to_vec();
            // bits past the end are unspecified in memory; zero them
            let tail = data.len() % 8;
            if let (Some(last), true) = (validity.last_mut(), tail != 0) {
                *last &= (1u8 << tail) - 1;
            }
            out.extend_from_slice(&validity);
        }
        None => out.push(0),
    }

    out.extend_from_slice(&(data.buffers().len() as u32).to_le_bytes());
    for buffer in data.buffers() {
        out.extend_from_slice(&(buffer.len() as u64).to_le_bytes());
        out.extend_from_slice(buffer.as_slice());
    }

    out.extend_from_slice(&(data.child_data().len() as u32).to_le_bytes());
    for child in data.child_data() {
        write_node(child, out)?;
    }
    Ok(())
}

/// Copy a sliced array into fresh buffers starting at offset zero
fn compact(data: &ArrayData) -> Option<ArrayData> {
    if data.offset() == 0 && !has_shifted_offsets(data) {
        return None;
    }
    let mut mutable = MutableArrayData::new(vec![data], false, data.len());
    mutable.extend(0, 0, data.len());
    Some(mutable.freeze())
}

/// Variable-width arrays sliced without an ArrayData offset start mid-buffer
fn has_shifted_offsets(data: &ArrayData) -> bool {
    if data.is_empty() {
        return false;
    }
    match data.data_type() {
        DataType::Utf8 | DataType::Binary | DataType::List(_) => {
            data.buffer::<i32>(0).first().is_some_and(|o| *o != 0)
        }
        DataType::LargeUtf8 | DataType::LargeBinary | DataType::LargeList(_) => {
            data.buffer::<i64>(0).first().is_some_and(|o| *o != 0)
        }
        _ => false,
    }
}

fn validity_len(len: usize) -> usize {
    len.div_ceil(8)
}

/// Types of the child nodes a type is laid out with
fn child_types(data_type: &DataType) -> Vec<DataType> {
    match data_type {
        DataType::List(field) | DataType::LargeList(field) => vec![field.data_type().clone()],
        DataType::Struct(fields) => fields.iter().map(|f| f.data_type().clone()).collect(),
        DataType::Dictionary(_, value) => vec![value.as_ref().clone()],
        _ => Vec::new(),
    }
}

fn read_node(cursor: &mut Cursor<'_>, data_type: &DataType) -> Result<ArrayData> {
    let len = cursor.read_usize()?;
    let null_count = cursor.read_usize()?;

    let validity = match cursor.read_u8()? {
        0 => None,
        1 => Some(Buffer::from_slice_ref(cursor.take(validity_len(len))?)),
        flag => {
            return Err(FeatherError::corrupt(format!(
                "invalid validity flag {}",
                flag
            )))
        }
    };

    let n_buffers = cursor.read_u32()? as usize;
    let mut buffers = Vec::with_capacity(n_buffers.min(4));
    for _ in 0..n_buffers {
        let byte_len = cursor.read_usize()?;
        buffers.push(Buffer::from_slice_ref(cursor.take(byte_len)?));
    }

    let expected_children = child_types(data_type);
    let n_children = cursor.read_u32()? as usize;
    if n_children != expected_children.len() {
        return Err(FeatherError::corrupt(format!(
            "{:?} expects {} child nodes, block has {}",
            data_type,
            expected_children.len(),
            n_children
        )));
    }
    let children = expected_children
        .iter()
        .map(|child_type| read_node(cursor, child_type))
        .collect::<Result<Vec<_>>>()?;

    let data = ArrayData::builder(data_type.clone())
        .len(len)
        .null_bit_buffer(validity)
        .buffers(buffers)
        .child_data(children)
        .build()
        .map_err(|e| FeatherError::corrupt(format!("column data failed validation: {}", e)))?;

    if data.null_count() != null_count {
        return Err(FeatherError::corrupt(format!(
            "block records {} nulls, validity bitmap has {}",
            null_count,
            data.null_count()
        )));
    }
    Ok(data)
}

struct Cursor<'a> {
    body: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.body.len())
            .ok_or_else(|| {
                FeatherError::corrupt(format!(
                    "column block truncated: need {} bytes at {}, have {}",
                    n,
                    self.pos,
                    self.body.len()
                ))
            })?;
        let slice = &self.body[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_usize(&mut self) -> Result<usize> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        usize::try_from(u64::from_le_bytes(raw))
            .map_err(|_| FeatherError::corrupt("length exceeds address space"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::*;
    use std::sync::Arc;

    fn roundtrip(array: ArrayRef) -> ArrayRef {
        let body = encode_array(array.as_ref()).unwrap();
        decode_array(&body, array.data_type()).unwrap()
    }

    #[test]
    fn test_primitive_with_nulls() {
        let array: ArrayRef = Arc::new(Int64Array::from(vec![Some(1), None, Some(3)]));
        let decoded = roundtrip(array.clone());
        assert_eq!(decoded.to_data(), array.to_data());
        assert_eq!(decoded.null_count(), 1);
    }

    #[test]
    fn test_sliced_arrays_are_compacted() {
        let strings = StringArray::from(vec!["skip", "keep", "this"]).slice(1, 2);
        let body = encode_array(&strings).unwrap();
        assert!(!body.windows(4).any(|w| w == b"skip"));
        let decoded = decode_array(&body, &DataType::Utf8).unwrap();
        assert_eq!(decoded.to_data(), strings.to_data());

        let bools = BooleanArray::from(vec![Some(true), None, Some(false), Some(true)]).slice(1, 3);
        let decoded = roundtrip(Arc::new(bools.clone()));
        assert_eq!(decoded.to_data(), bools.to_data());
    }

    #[test]
    fn test_dictionary_and_nested() {
        let dict: DictionaryArray<arrow_array::types::Int32Type> =
            vec![Some("x"), None, Some("y"), Some("x")].into_iter().collect();
        let dict: ArrayRef = Arc::new(dict);
        assert_eq!(roundtrip(dict.clone()).to_data(), dict.to_data());

        let list: ArrayRef = Arc::new(ListArray::from_iter_primitive::<
            arrow_array::types::Int32Type,
            _,
            _,
        >(vec![Some(vec![Some(1), None]), None, Some(vec![])]));
        assert_eq!(roundtrip(list.clone()).to_data(), list.to_data());
    }

    #[test]
    fn test_truncated_block_is_corrupt() {
        let array = Int32Array::from(vec![1, 2, 3]);
        let body = encode_array(&array).unwrap();
        let err = decode_array(&body[..body.len() - 1], &DataType::Int32).unwrap_err();
        assert!(matches!(err, FeatherError::CorruptFile(_)));
    }

    #[test]
    fn test_invalid_utf8_is_corrupt() {
        let array = BinaryArray::from(vec![&[0xffu8, 0xfe][..]]);
        let body = encode_array(&array).unwrap();
        let err = decode_array(&body, &DataType::Utf8).unwrap_err();
        assert!(matches!(err, FeatherError::CorruptFile(_)));
    }
}
