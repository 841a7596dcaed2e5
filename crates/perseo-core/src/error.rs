//! Error types shared across the Perseo crates.

use thiserror::Error;

/// Result type for Perseo core operations.
pub type Result<T> = std::result::Result<T, PerseoError>;

/// Errors that can occur while configuring or running a simulation.
#[derive(Error, Debug)]
pub enum PerseoError {
    /// A configuration key was missing, malformed, or carried an unknown tag.
    #[error("configuration error at {location}: {reason}")]
    Config {
        /// Where the offending value came from, e.g. `"init.ini:12"` or `"command line"`.
        location: String,
        /// Human-readable description of the problem.
        reason: String,
    },

    /// A population or connectivity descriptor failed semantic validation.
    #[error("invalid {what}: {reason}")]
    Semantic {
        /// What was being validated, e.g. `"population 2"` or `"connectivity (1, 0)"`.
        what: String,
        /// Human-readable description of the problem.
        reason: String,
    },

    /// A resource could not be allocated or a requested size is unreasonable.
    #[error("resource error: {reason}")]
    Resource {
        /// Human-readable description of the problem.
        reason: String,
    },

    /// An index was out of the range the caller expected.
    #[error("index {index} out of range (max {max})")]
    IndexOutOfRange {
        /// The offending index.
        index: u32,
        /// The largest valid index.
        max: u32,
    },

    /// A population or connectivity parameter index has no defined meaning
    /// for the requested kind.
    #[error("unknown parameter index {index} for {kind}")]
    UnknownParamIndex {
        /// The requested parameter index.
        index: usize,
        /// The neuron or synapse kind the index was requested against.
        kind: String,
    },

    /// Wraps an I/O failure, attaching the path that was being accessed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path that was being read or written.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl PerseoError {
    /// Builds a configuration error.
    pub fn config(location: impl Into<String>, reason: impl Into<String>) -> Self {
        PerseoError::Config { location: location.into(), reason: reason.into() }
    }

    /// Builds a semantic-validation error.
    pub fn semantic(what: impl Into<String>, reason: impl Into<String>) -> Self {
        PerseoError::Semantic { what: what.into(), reason: reason.into() }
    }

    /// Builds a resource error.
    pub fn resource(reason: impl Into<String>) -> Self {
        PerseoError::Resource { reason: reason.into() }
    }

    /// Builds an index-out-of-range error.
    pub fn index_out_of_range(index: u32, max: u32) -> Self {
        PerseoError::IndexOutOfRange { index, max }
    }

    /// Builds an unknown-parameter-index error.
    pub fn unknown_param_index(index: usize, kind: impl Into<String>) -> Self {
        PerseoError::UnknownParamIndex { index, kind: kind.into() }
    }

    /// Wraps an I/O error with the path that triggered it.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        PerseoError::Io { path: path.into(), source }
    }
}
