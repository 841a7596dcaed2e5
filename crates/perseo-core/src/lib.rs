//! Time, spike, population and connectivity primitives shared by the Perseo
//! spiking-network simulator.
//!
//! This crate carries no simulation loop of its own: it defines the value
//! types (`Timex`, `Spike`, `Population`, `ConnectivityEntry`), the closed
//! kind enums that replace function-pointer dispatch, the error taxonomy,
//! the two-stream RNG, and the efficacy lookup tables that the runtime
//! crate assembles into a running simulation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod connectivity;
pub mod error;
pub mod ids;
pub mod kinds;
pub mod lut;
pub mod population;
pub mod rng;
pub mod spike;
pub mod time;

pub use connectivity::ConnectivityEntry;
pub use error::{PerseoError, Result};
pub use ids::{ConnectivityId, DelayLayerId, NeuronId, PopulationId};
pub use kinds::{DelayDistKind, ExtractionKind, InitType, NeuronKind, SynapseKind};
pub use lut::{EfficacyLut, LUT_SIZE};
pub use population::{Neuron, Population, MAX_STATE_VARS};
pub use rng::{RandomStream, Streams};
pub use spike::Spike;
pub use time::Timex;
