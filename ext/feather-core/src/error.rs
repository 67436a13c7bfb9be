use thiserror::Error;

/// Core error type for Feather operations
#[derive(Error, Debug)]
pub enum FeatherError {
    /// IO errors from the underlying byte stream
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow errors from array construction or validation
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    /// The value handed to the write path is not a table
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No columnar codec capability is available
    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    /// Footer JSON that does not parse
    #[error("Footer error: {0}")]
    Json(#[from] serde_json::Error),

    /// Magic mismatch, truncated footer, bad offsets or checksums
    #[error("Corrupt file: {0}")]
    CorruptFile(String),

    /// Requested columns are absent from the file schema
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A column's type has no binary encoding
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// Unrecognized dtype backend selection
    #[error("Invalid dtype backend: {0}")]
    InvalidBackend(String),

    /// Invalid argument errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Type conversion errors
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Internal errors that shouldn't happen
    #[error("Internal error: {0}")]
    Internal(String),

    /// An error annotated with where it happened
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<FeatherError>,
    },
}

/// Result type alias for Feather operations
pub type Result<T> = std::result::Result<T, FeatherError>;

impl FeatherError {
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        FeatherError::InvalidInput(msg.into())
    }

    pub fn missing_dependency<S: Into<String>>(msg: S) -> Self {
        FeatherError::MissingDependency(msg.into())
    }

    pub fn corrupt<S: Into<String>>(msg: S) -> Self {
        FeatherError::CorruptFile(msg.into())
    }

    pub fn schema_mismatch<S: Into<String>>(msg: S) -> Self {
        FeatherError::SchemaMismatch(msg.into())
    }

    pub fn unsupported_type<S: Into<String>>(msg: S) -> Self {
        FeatherError::UnsupportedType(msg.into())
    }

    pub fn invalid_backend<S: Into<String>>(msg: S) -> Self {
        FeatherError::InvalidBackend(msg.into())
    }

    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        FeatherError::InvalidArgument(msg.into())
    }

    pub fn conversion<S: Into<String>>(msg: S) -> Self {
        FeatherError::Conversion(msg.into())
    }

    pub fn internal<S: Into<String>>(msg: S) -> Self {
        FeatherError::Internal(msg.into())
    }

    /// The innermost error, skipping any context layers
    pub fn root_cause(&self) -> &FeatherError {
        match self {
            FeatherError::Context { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Extension trait to add context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn context<S: Into<String>>(self, ctx: S) -> Result<T>;

    /// Add context with a closure that's only called on error
    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, f: F) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<FeatherError>,
{
    fn context<S: Into<String>>(self, ctx: S) -> Result<T> {
        self.map_err(|e| FeatherError::Context {
            context: ctx.into(),
            source: Box::new(e.into()),
        })
    }

    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, f: F) -> Result<T> {
        self.map_err(|e| FeatherError::Context {
            context: f().into(),
            source: Box::new(e.into()),
        })
    }
}
