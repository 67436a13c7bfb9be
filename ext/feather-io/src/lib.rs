//! Storage-facing layer over feather-core
//!
//! This crate connects the feather codec to places bytes can live and
//! exposes the two public entry points.
//!
//! # Overview
//!
//! ## Byte Stream Providers
//!
//! [`StreamProvider`] opens a location for reading or writing:
//!
//! - [`LocalFileProvider`] for plain paths
//! - [`MemoryProvider`] for named in-memory files shared across threads
//!
//! Readers get a [`CloneableChunkReader`] so column blocks can be fetched
//! independently by decode workers. Forward-only streams are spooled to a
//! temporary file first.
//!
//! ## Entry Points
//!
//! - [`to_feather`] writes a table; non-table input is rejected before any
//!   stream is opened
//! - [`read_feather`] reads, projects and materializes with the selected
//!   dtype backend
//!
//! [`FeatherIo`] is the same pair over an injected provider and codec.

pub mod api;
pub use api::{read_feather, to_feather, FeatherIo};

pub mod chunk_reader;
pub use chunk_reader::CloneableChunkReader;

pub mod input;
pub use input::WriteInput;

pub mod storage;
pub use storage::{
    LocalFileProvider, MemoryProvider, ReadHandle, StorageOptions, StreamProvider, WriteHandle,
    WriteSink,
};

pub mod types;
pub use types::{FeatherReadArgs, FeatherWriteArgs};
