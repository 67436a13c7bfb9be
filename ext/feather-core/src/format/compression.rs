//! Per-column block compression

use crate::{FeatherError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Zstd level used when none is given
pub const DEFAULT_ZSTD_LEVEL: i32 = 1;

/// Compression requested for a write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    Uncompressed,
    #[default]
    Lz4,
    Zstd(i32),
}

/// Codec a block was actually stored with, as recorded in the footer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockCompression {
    Uncompressed,
    Lz4,
    Zstd,
}

impl Compression {
    /// Apply a level; only zstd takes one
    pub fn with_level(self, level: Option<i32>) -> Result<Self> {
        match (self, level) {
            (compression, None) => Ok(compression),
            (Compression::Zstd(_), Some(level)) => Ok(Compression::Zstd(level)),
            (other, Some(_)) => Err(FeatherError::invalid_argument(format!(
                "compression {:?} does not take a level",
                other
            ))),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Compression::Zstd(level) = self {
            let range = zstd::compression_level_range();
            if !range.contains(level) {
                return Err(FeatherError::invalid_argument(format!(
                    "zstd level {} outside {}..={}",
                    level,
                    range.start(),
                    range.end()
                )));
            }
        }
        Ok(())
    }
}

impl FromStr for Compression {
    type Err = FeatherError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "uncompressed" | "none" => Ok(Compression::Uncompressed),
            "lz4" => Ok(Compression::Lz4),
            "zstd" => Ok(Compression::Zstd(DEFAULT_ZSTD_LEVEL)),
            other => Err(FeatherError::invalid_argument(format!(
                "Invalid compression: '{}'. Valid options are: uncompressed, lz4, zstd",
                other
            ))),
        }
    }
}

/// Compress a block, keeping it raw when compression does not shrink it
pub fn compress_block(body: Vec<u8>, compression: Compression) -> (BlockCompression, Vec<u8>) {
    match compression {
        Compression::Uncompressed => (BlockCompression::Uncompressed, body),
        Compression::Lz4 => {
            let compressed = lz4_flex::compress_prepend_size(&body);
            if compressed.len() < body.len() {
                return (BlockCompression::Lz4, compressed);
            }
            (BlockCompression::Uncompressed, body)
        }
        Compression::Zstd(level) => {
            if let Ok(compressed) = zstd::bulk::compress(&body, level) {
                if compressed.len() < body.len() {
                    return (BlockCompression::Zstd, compressed);
                }
            }
            (BlockCompression::Uncompressed, body)
        }
    }
}

/// Inverse of [`compress_block`]; the result must be exactly `uncompressed_length` bytes
pub fn decompress_block(
    compression: BlockCompression,
    block: &[u8],
    uncompressed_length: usize,
) -> Result<Vec<u8>> {
    let body = match compression {
        BlockCompression::Uncompressed => block.to_vec(),
        BlockCompression::Lz4 => {
            // the prepended size drives the allocation, so check it first
            let prefix = block
                .get(..4)
                .and_then(|p| <[u8; 4]>::try_from(p).ok())
                .map(u32::from_le_bytes);
            if prefix.map(|n| n as usize) != Some(uncompressed_length) {
                return Err(FeatherError::corrupt(
                    "LZ4 block size prefix disagrees with footer",
                ));
            }
            lz4_flex::decompress_size_prepended(block)
                .map_err(|e| FeatherError::corrupt(format!("LZ4 decompress failed: {}", e)))?
        }
        BlockCompression::Zstd => zstd::bulk::decompress(block, uncompressed_length)
            .map_err(|e| FeatherError::corrupt(format!("Zstd decompress failed: {}", e)))?,
    };

    if body.len() != uncompressed_length {
        return Err(FeatherError::corrupt(format!(
            "block decompressed to {} bytes, footer records {}",
            body.len(),
            uncompressed_length
        )));
    }
    Ok(body)
}
