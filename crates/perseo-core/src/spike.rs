//! The spike record passed between the driver, neuron kernels and synapse kernels.

use crate::ids::NeuronId;
use crate::time::Timex;

/// A single spike event.
///
/// `isi` is the interval (in milliseconds) since the previous spike of the
/// same neuron; plastic synapse kernels use it directly rather than
/// recomputing a delta from timestamps.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Spike {
    /// Time the spike was emitted (or, for an in-flight spike, the time it is
    /// scheduled to arrive at its target delay layer).
    pub emission: Timex,
    /// The neuron this spike originated from (for internal spikes) or is
    /// delivered to (for external spikes, where there is no presynaptic
    /// neuron).
    pub neuron: NeuronId,
    /// Interval since the previous spike of `neuron`, in milliseconds.
    pub isi: f64,
}

impl Spike {
    /// Builds a new spike record.
    pub fn new(emission: Timex, neuron: NeuronId, isi: f64) -> Self {
        Spike { emission, neuron, isi }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_keeps_fields() {
        let sp = Spike::new(Timex::from_millis(12.0), NeuronId::new(7), 3.5);
        assert_eq!(sp.neuron, NeuronId::new(7));
        assert!((sp.isi - 3.5).abs() < 1e-12);
    }
}
