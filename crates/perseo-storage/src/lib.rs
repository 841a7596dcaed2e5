//! Plain-text result writers for the Perseo spiking-network simulator.
//!
//! Every writer here pairs a data file with a `.log` header file describing
//! its columns, and every writer is opened lazily on first use so a run that
//! never triggers a given `PRINT_*` command never creates the corresponding
//! file.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod recorder;
pub mod sinks;

pub use error::{Result, StorageError};
pub use recorder::{ensure_output_dir, Recorder, RecorderConfig};
pub use sinks::TextSink;
