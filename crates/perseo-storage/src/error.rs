//! Error types for the result-writing layer.

use thiserror::Error;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors raised while opening or writing simulation output files.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Could not open or write a result file.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path of the file being accessed.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A sink was written to before being opened, or written to twice
    /// without an intervening open.
    #[error("sink {name} is not open")]
    NotOpen {
        /// Name of the offending sink, e.g. `"spikes"` or `"rates"`.
        name: &'static str,
    },
}

impl StorageError {
    /// Wraps an I/O error with the path that triggered it.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        StorageError::Io { path: path.into(), source }
    }
}
