//! Populations of neurons: the unit of random-graph construction and the
//! owner of each neuron's state.

use crate::ids::PopulationId;
use crate::lut::EfficacyLut;
use crate::time::Timex;

/// Maximum number of per-neuron state variables across all supported kinds
/// (LIFCA/VIFCA carry membrane potential plus calcium concentration).
pub const MAX_STATE_VARS: usize = 2;

/// A single neuron's mutable state and spike-timing bookkeeping.
///
/// Neurons are owned by exactly one population, which holds them in a
/// contiguous `Vec`, acting as a flat state arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neuron {
    /// Population this neuron belongs to.
    pub population: PopulationId,
    /// State variables; only the first `NeuronKind::num_state_vars()` are
    /// meaningful, the rest are unused padding for kinds with fewer vars.
    pub state_vars: [f64; MAX_STATE_VARS],
    /// Time of the last presynaptic spike this neuron integrated.
    pub t_last_pre: Timex,
    /// Time this neuron last emitted a spike.
    pub t_last_emit: Timex,
    /// Time this neuron's state was last brought up to date.
    ///
    /// For the LIF/VIF family this is advanced straight to the end of the
    /// refractory period at emission time, so the next integration step
    /// simply sees zero elapsed refractory time. The LIFCA/VIFCA family
    /// instead leaves this at the spike time itself and relies on
    /// `refractory_until` to gate the next update.
    pub t_last_update: Timex,
    /// Time the absolute refractory period following the last emitted spike
    /// ends.
    pub refractory_until: Timex,
}

impl Neuron {
    /// Builds a neuron with its membrane potential (and calcium, if any)
    /// initialized to `reset_value`, with no spike history.
    pub fn at_rest(population: PopulationId, reset_value: f64) -> Self {
        Neuron {
            population,
            state_vars: [reset_value, 0.0],
            t_last_pre: Timex::ZERO,
            t_last_emit: Timex::ZERO,
            t_last_update: Timex::ZERO,
            refractory_until: Timex::ZERO,
        }
    }

    /// Membrane potential (first state variable).
    pub fn v(&self) -> f64 {
        self.state_vars[0]
    }

    /// Sets the membrane potential.
    pub fn set_v(&mut self, value: f64) {
        self.state_vars[0] = value;
    }

    /// Calcium concentration (second state variable); meaningless for
    /// non-adapting kinds.
    pub fn calcium(&self) -> f64 {
        self.state_vars[1]
    }

    /// Sets the calcium concentration.
    pub fn set_calcium(&mut self, value: f64) {
        self.state_vars[1] = value;
    }
}

/// A population of neurons sharing intrinsic parameters, external-drive
/// statistics and connectivity rules.
#[derive(Debug, Clone)]
pub struct Population {
    /// Identity of this population.
    pub id: PopulationId,
    /// Mean external synaptic weight.
    pub j_ext: f64,
    /// Relative standard deviation of the external synaptic weight.
    pub dj_ext: f64,
    /// External connectivity factor.
    pub c_ext: f64,
    /// External Poisson drive rate, in Hz.
    pub nu_ext: f64,
    /// Cached `1000 / (nu_ext * c_ext * n_neurons)`, the mean inter-arrival
    /// time in milliseconds of the *pooled* external spike train for this
    /// population. Infinite when `nu_ext == 0`.
    pub inv_nu_ext: f64,
    /// Next scheduled external spike arrival for this population.
    pub next_external_spike: Timex,
    /// Number of external (or, depending on bookkeeping, emitted) spikes
    /// observed so far; used for rate reporting.
    pub spike_counter: u64,
    /// Neuron-kind-specific parameters, shared by every neuron in the population.
    pub params: Vec<f64>,
    /// 256-entry table of Gaussian-sampled external synaptic weights.
    pub ext_weight_lut: EfficacyLut,
    /// The neurons owned by this population.
    pub neurons: Vec<Neuron>,
}

impl Population {
    /// Recomputes [`Population::inv_nu_ext`] from `nu_ext`, `c_ext` and the
    /// neuron count, setting it to infinity when the external drive is off.
    pub fn recompute_inv_nu_ext(&mut self) {
        let denom = self.nu_ext * self.c_ext * self.neurons.len() as f64;
        self.inv_nu_ext = if denom > 0.0 { 1000.0 / denom } else { f64::INFINITY };
    }

    /// Number of neurons in this population.
    pub fn n_neurons(&self) -> usize {
        self.neurons.len()
    }
}
