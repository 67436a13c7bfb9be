//! `to_feather` / `read_feather`
//!
//! Both entry points follow the same order: validate arguments, check the
//! codec capability, then acquire the stream. Nothing is opened for a call
//! that is going to be rejected.

use crate::input::WriteInput;
use crate::storage::{LocalFileProvider, StorageOptions, StreamProvider};
use crate::types::{FeatherReadArgs, FeatherWriteArgs};
use feather_core::{
    materialize, ColumnSelection, ColumnarCodec, FeatherCodec, FeatherError, MaterializedTable,
    Result, Table,
};
use std::sync::Arc;

/// A stream provider paired with the codec capability
#[derive(Clone)]
pub struct FeatherIo {
    provider: Arc<dyn StreamProvider>,
    codec: Option<Arc<dyn ColumnarCodec>>,
}

impl Default for FeatherIo {
    fn default() -> Self {
        Self::new(Arc::new(LocalFileProvider))
    }
}

impl FeatherIo {
    /// Use `provider` with the built-in codec
    pub fn new(provider: Arc<dyn StreamProvider>) -> Self {
        Self {
            provider,
            codec: Some(Arc::new(FeatherCodec)),
        }
    }

    pub fn with_codec(mut self, codec: Arc<dyn ColumnarCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Drop the codec; every read and write then fails with `MissingDependency`
    pub fn without_codec(mut self) -> Self {
        self.codec = None;
        self
    }

    pub fn provider(&self) -> &Arc<dyn StreamProvider> {
        &self.provider
    }

    fn codec(&self) -> Result<&Arc<dyn ColumnarCodec>> {
        self.codec.as_ref().ok_or_else(|| {
            FeatherError::missing_dependency(
                "no columnar codec is available to handle feather files",
            )
        })
    }

    /// Write a table to `location`, returning the file size
    pub fn write<I: Into<WriteInput>>(
        &self,
        input: I,
        location: &str,
        storage_options: &StorageOptions,
        args: &FeatherWriteArgs,
    ) -> Result<u64> {
        let table = input.into().into_table()?;
        let codec = self.codec()?;
        let options = args.to_write_options()?;
        // an unencodable column fails here, before the location is touched
        table.schema()?;

        let mut handle = self.provider.open_write(location, storage_options)?;
        // on error the handle is dropped unfinished and discards its output
        let written = codec.write_table(&table, &mut handle, &options)?;
        handle.finish()?;

        log::info!(
            "wrote {} columns to '{}' with {} ({} bytes)",
            table.num_columns(),
            location,
            codec.name(),
            written
        );
        Ok(written)
    }

    /// Decode the selected columns of `location` without materializing
    pub fn read_table(
        &self,
        location: &str,
        storage_options: &StorageOptions,
        args: &FeatherReadArgs,
    ) -> Result<Table> {
        let codec = self.codec()?;
        let options = args.to_read_options();
        let handle = self.provider.open_read(location, storage_options)?;
        codec.read_table(&handle, &options)
    }

    /// Decode and materialize with the backend named in `args`
    pub fn read(
        &self,
        location: &str,
        storage_options: &StorageOptions,
        args: &FeatherReadArgs,
    ) -> Result<MaterializedTable> {
        let backend = args.backend()?;
        let table = self.read_table(location, storage_options, args)?;
        materialize(&table, backend)
    }
}

/// Write `input` to a local path
///
/// Only tables are accepted; anything else is rejected with `InvalidInput`
/// before the file is created.
pub fn to_feather<I: Into<WriteInput>>(
    input: I,
    location: &str,
    storage_options: Option<&StorageOptions>,
    write_args: &FeatherWriteArgs,
) -> Result<u64> {
    let empty = StorageOptions::new();
    FeatherIo::default().write(input, location, storage_options.unwrap_or(&empty), write_args)
}

/// Read a local feather file
///
/// `columns` restricts decoding to those names or footer positions. Leaving `dtype_backend`
/// unset selects the legacy native conversion, which is lossy: integer
/// columns containing nulls come back as `f64` with `NaN`.
pub fn read_feather(
    location: &str,
    columns: Option<ColumnSelection>,
    use_threads: bool,
    storage_options: Option<&StorageOptions>,
    dtype_backend: Option<&str>,
) -> Result<MaterializedTable> {
    let args = FeatherReadArgs {
        columns,
        use_threads,
        num_threads: None,
        dtype_backend: dtype_backend.map(str::to_string),
    };
    let empty = StorageOptions::new();
    FeatherIo::default().read(location, storage_options.unwrap_or(&empty), &args)
}
