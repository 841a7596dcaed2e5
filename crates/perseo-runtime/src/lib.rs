//! The discrete-event simulation engine for the Perseo spiking-network
//! simulator: FIFO delivery queues, the delay-layer model, the neuron and
//! synapse kernels, the axon-segment connectivity builder, external
//! Poisson drive, the timed command timeline, and the driver that ties
//! them together into a running simulation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod commands;
pub mod connectivity;
pub mod delay;
pub mod driver;
pub mod error;
pub mod event_heap;
pub mod external;
pub mod fifo;
pub mod neuron;
pub mod synapse;

pub use commands::{Command, CommandTimeline, SinusoidalStimulation};
pub use delay::{Delivery, DelayLine};
pub use driver::{NetworkTopology, SamplingConfig, SimulationContext};
pub use error::{Result, RuntimeError};
pub use event_heap::EventHeap;
pub use fifo::Fifo;
