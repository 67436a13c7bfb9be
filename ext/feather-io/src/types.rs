use feather_core::{ColumnSelection, Compression, DtypeBackend, ReadOptions, Result, WriteOptions};
use indexmap::IndexMap;
use std::str::FromStr;

/// Arguments for writing feather files
///
/// Compression is given by name (`"lz4"`, `"zstd"`, `"uncompressed"`) the way
/// callers at the outer edge usually hold it; `None` keeps the LZ4 default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatherWriteArgs {
    pub compression: Option<String>,
    /// Only meaningful for zstd
    pub compression_level: Option<i32>,
    pub use_threads: Option<bool>,
    pub num_threads: Option<usize>,
    pub metadata: IndexMap<String, String>,
}

impl FeatherWriteArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compression<S: Into<String>>(mut self, name: S) -> Self {
        self.compression = Some(name.into());
        self
    }

    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = Some(level);
        self
    }

    pub fn with_use_threads(mut self, use_threads: bool) -> Self {
        self.use_threads = Some(use_threads);
        self
    }

    pub fn with_metadata<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Resolve names and defaults into codec options
    pub fn to_write_options(&self) -> Result<WriteOptions> {
        let defaults = WriteOptions::default();
        let compression = match &self.compression {
            Some(name) => Compression::from_str(name)?,
            None => defaults.compression,
        }
        .with_level(self.compression_level)?;
        compression.validate()?;

        Ok(WriteOptions {
            compression,
            use_threads: self.use_threads.unwrap_or(defaults.use_threads),
            num_threads: self.num_threads,
            metadata: self.metadata.clone(),
        })
    }
}

/// Arguments for reading feather files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatherReadArgs {
    /// `None` reads every column
    pub columns: Option<ColumnSelection>,
    pub use_threads: bool,
    pub num_threads: Option<usize>,
    /// `None` selects the legacy native conversion
    pub dtype_backend: Option<String>,
}

impl Default for FeatherReadArgs {
    fn default() -> Self {
        Self {
            columns: None,
            use_threads: true,
            num_threads: None,
            dtype_backend: None,
        }
    }
}

impl FeatherReadArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(ColumnSelection::Names(
            names.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Project onto columns by their position in the file
    pub fn with_column_indices<I: IntoIterator<Item = usize>>(mut self, indices: I) -> Self {
        self.columns = Some(ColumnSelection::Indices(indices.into_iter().collect()));
        self
    }

    pub fn with_use_threads(mut self, use_threads: bool) -> Self {
        self.use_threads = use_threads;
        self
    }

    pub fn with_dtype_backend<S: Into<String>>(mut self, backend: S) -> Self {
        self.dtype_backend = Some(backend.into());
        self
    }

    /// The selected backend; unset falls back to [`DtypeBackend::Native`]
    pub fn backend(&self) -> Result<DtypeBackend> {
        match &self.dtype_backend {
            Some(name) => DtypeBackend::from_str(name),
            None => {
                log::debug!("no dtype_backend given, using the legacy native conversion");
                Ok(DtypeBackend::Native)
            }
        }
    }

    pub fn to_read_options(&self) -> ReadOptions {
        ReadOptions {
            columns: self.columns.clone(),
            use_threads: self.use_threads,
            num_threads: self.num_threads,
        }
    }
}
