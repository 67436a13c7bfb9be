//! On-disk layout of a feather file
//!
//! ```text
//! "FEA1" 0 0 0 0                 header
//! column block 0..n              8-byte aligned, zero padded
//! footer                         JSON
//! crc32(footer) "FEA1" len(footer)   trailer, little-endian u32s
//! ```

pub mod column_codec;
pub mod compression;

use crate::{FeatherError, Result, Schema};
use serde::{Deserialize, Serialize};

pub use compression::{BlockCompression, Compression};

pub const MAGIC: &[u8; 4] = b"FEA1";
pub const HEADER_LEN: u64 = 8;
pub const TRAILER_LEN: u64 = 12;
pub const BLOCK_ALIGNMENT: u64 = 8;
pub const FORMAT_VERSION: u32 = 1;

/// Location and encoding of one column block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnChunk {
    pub offset: u64,
    pub length: u64,
    pub uncompressed_length: u64,
    pub compression: BlockCompression,
    pub checksum: u32,
}

/// Self-describing trailing metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footer {
    pub version: u32,
    pub created_by: String,
    pub num_rows: u64,
    pub schema: Schema,
    pub columns: Vec<ColumnChunk>,
}

impl Footer {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| FeatherError::corrupt(format!("footer does not parse: {}", e)))
    }

    /// Check the footer describes a consistent file whose data region ends at `data_end`
    pub fn validate(&self, data_end: u64) -> Result<()> {
        if self.version != FORMAT_VERSION {
            return Err(FeatherError::corrupt(format!(
                "unsupported format version {}",
                self.version
            )));
        }
        if self.columns.len() != self.schema.len() {
            return Err(FeatherError::corrupt(format!(
                "footer lists {} column blocks for {} schema fields",
                self.columns.len(),
                self.schema.len()
            )));
        }
        self.schema
            .to_arrow()
            .map_err(|e| FeatherError::corrupt(format!("footer schema is invalid: {}", e)))?;

        let mut previous_end = HEADER_LEN;
        for (chunk, field) in self.columns.iter().zip(&self.schema.fields) {
            let end = chunk.offset.checked_add(chunk.length);
            match end {
                Some(end) if chunk.offset >= previous_end && end <= data_end => {
                    previous_end = end;
                }
                _ => {
                    return Err(FeatherError::corrupt(format!(
                        "block of column '{}' ({}+{}) lies outside the data region {}..{}",
                        field.name, chunk.offset, chunk.length, previous_end, data_end
                    )))
                }
            }
            if chunk.compression == BlockCompression::Uncompressed
                && chunk.length != chunk.uncompressed_length
            {
                return Err(FeatherError::corrupt(format!(
                    "uncompressed block of column '{}' has length {} but records {}",
                    field.name, chunk.length, chunk.uncompressed_length
                )));
            }
        }
        Ok(())
    }
}

pub fn header() -> [u8; HEADER_LEN as usize] {
    let mut header = [0u8; HEADER_LEN as usize];
    header[..4].copy_from_slice(MAGIC);
    header
}

pub fn check_header(bytes: &[u8]) -> Result<()> {
    if bytes.len() < HEADER_LEN as usize || &bytes[..4] != MAGIC {
        return Err(FeatherError::corrupt("leading magic bytes are missing"));
    }
    Ok(())
}

/// Zero bytes needed after `position` to reach the next block boundary
pub fn padding_for(position: u64) -> usize {
    let rem = position % BLOCK_ALIGNMENT;
    if rem == 0 {
        0
    } else {
        (BLOCK_ALIGNMENT - rem) as usize
    }
}

pub fn trailer(footer: &[u8]) -> Result<[u8; TRAILER_LEN as usize]> {
    let footer_len = u32::try_from(footer.len())
        .map_err(|_| FeatherError::internal("footer larger than 4 GiB"))?;
    let mut trailer = [0u8; TRAILER_LEN as usize];
    trailer[..4].copy_from_slice(&crc32fast::hash(footer).to_le_bytes());
    trailer[4..8].copy_from_slice(MAGIC);
    trailer[8..].copy_from_slice(&footer_len.to_le_bytes());
    Ok(trailer)
}

/// Decoded trailer: footer checksum and footer length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    pub footer_checksum: u32,
    pub footer_length: u64,
}

impl Trailer {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != TRAILER_LEN as usize {
            return Err(FeatherError::corrupt("trailer truncated"));
        }
        if &bytes[4..8] != MAGIC {
            return Err(FeatherError::corrupt("trailing magic bytes are missing"));
        }
        let read_u32 = |at: usize| {
            u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };
        Ok(Self {
            footer_checksum: read_u32(0),
            footer_length: read_u32(8) as u64,
        })
    }

    /// Byte offset of the footer in a file of `file_len` bytes
    pub fn footer_offset(&self, file_len: u64) -> Result<u64> {
        let min_len = HEADER_LEN + TRAILER_LEN;
        file_len
            .checked_sub(TRAILER_LEN + self.footer_length)
            .filter(|offset| *offset >= HEADER_LEN && file_len >= min_len && self.footer_length > 0)
            .ok_or_else(|| {
                FeatherError::corrupt(format!(
                    "footer length {} does not fit in a file of {} bytes",
                    self.footer_length, file_len
                ))
            })
    }
}
