//! Error types for the simulation engine.

use thiserror::Error;

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors raised while assembling or running a simulation.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A value produced or consumed by `perseo-core` was rejected.
    #[error(transparent)]
    Core(#[from] perseo_core::PerseoError),

    /// A result sink failed.
    #[error("output error: {0}")]
    Output(#[from] perseo_storage::StorageError),

    /// The event heap or an external-spike source ran dry before the
    /// simulation reached its requested end time.
    #[error("no more events to process at {at}ms, short of the requested end time {end}ms")]
    EventsExhausted {
        /// Time the run stalled at, in milliseconds.
        at: f64,
        /// Requested simulation end time, in milliseconds.
        end: f64,
    },

    /// A command referenced a population, connectivity entry or neuron
    /// index outside the configured network.
    #[error("command referenced unknown {what} {index}")]
    UnknownReference {
        /// What kind of entity was referenced (`"population"`, `"neuron"`, ...).
        what: &'static str,
        /// The offending index.
        index: u32,
    },
}
