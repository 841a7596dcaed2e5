//! The CLI's top-level error type: every failure mode the binary can hit,
//! collapsed into one enum so `main` has a single place to map errors to
//! process exit codes.

use thiserror::Error;

/// Result type used throughout the CLI crate.
pub type Result<T> = std::result::Result<T, CliError>;

/// Everything that can go wrong running the simulator from the command line.
#[derive(Error, Debug)]
pub enum CliError {
    /// A configuration, semantic, or definition-file error from the core crate.
    #[error(transparent)]
    Core(#[from] perseo_core::PerseoError),

    /// An error raised while the simulation was running.
    #[error(transparent)]
    Runtime(#[from] perseo_runtime::RuntimeError),

    /// An error opening or writing a result sink.
    #[error(transparent)]
    Storage(#[from] perseo_storage::StorageError),

    /// A required command-line argument was missing or malformed.
    #[error("usage error: {0}")]
    Usage(String),

    /// Wraps a bare I/O failure without an associated path (path-carrying
    /// failures go through [`perseo_core::PerseoError::Io`] instead).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A miscellaneous failure surfaced via `anyhow`, e.g. installing the
    /// interrupt handler.
    #[error(transparent)]
    Generic(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_error_displays_its_message() {
        let err = CliError::Usage("missing init file path".to_string());
        assert_eq!(format!("{err}"), "usage error: missing init file path");
    }
}
