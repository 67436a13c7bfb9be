//! Language-agnostic core of the feather columnar format
//!
//! `feather-core` serializes Arrow-backed tables into a self-describing
//! columnar file and reads them back, then hands the decoded columns to
//! callers in one of several value representations.
//!
//! # Key Components
//!
//! - **Writer**: encodes a [`Table`] into any `std::io::Write`
//!   - One independently compressed block per column (LZ4, Zstd or none)
//!   - Blocks compressed on a rayon pool, written in table order
//!   - JSON footer with per-column offsets and CRC32 checksums
//!
//! - **Reader**: decodes a file from any [`source::ChunkReader`]
//!   - Column projection by name or index; unrequested blocks are never read
//!   - Parallel per-column decode with an ordered join
//!   - Every framing, checksum and layout problem reported as `CorruptFile`
//!
//! - **Schema**: the closed set of [`LogicalType`]s with a binary encoding
//!   - Builder API and dotted-path inspection through [`traits::SchemaInspector`]
//!
//! - **Values**: [`FeatherValue`], a scalar view of any slot
//!
//! - **Materializer**: [`materialize::materialize`] converts a decoded table
//!   into native sentinel vectors, boxed nullable vectors or raw Arrow arrays
//!
//! - **Codec capability**: [`ColumnarCodec`], implemented by [`FeatherCodec`],
//!   is what outer layers depend on so the codec can be injected
//!
//! # Example Usage
//!
//! This crate is designed to be used through `feather-io`, which adds
//! stream providers and the `to_feather` / `read_feather` entry points.

pub mod arrow_conversion;
pub mod codec;
pub mod error;
pub mod format;
pub mod materialize;
pub mod parallel;
pub mod reader;
pub mod schema;
pub mod source;
pub mod table;
pub mod traits;
pub mod value;
pub mod writer;

#[cfg(test)]
pub mod test_utils;

pub use codec::{ColumnarCodec, FeatherCodec};
pub use error::{ErrorContext, FeatherError, Result};
pub use format::{BlockCompression, Compression, Footer};
pub use materialize::{
    materialize, DtypeBackend, MaterializedColumn, MaterializedTable, NativeColumn, NullableColumn,
    NAT,
};
pub use reader::{ColumnSelection, ReadOptions, Reader};
pub use schema::{Field, LogicalType, Schema, SchemaBuilder, TimeUnit};
pub use source::ChunkReader;
pub use table::{Column, Table};
pub use value::FeatherValue;
pub use writer::{WriteOptions, Writer, WriterBuilder};
