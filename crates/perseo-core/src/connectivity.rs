//! Static connectivity descriptors: the parameters governing how synapses
//! between one source population and one target population are drawn and
//! how their efficacy is represented. The axon-segment builder that turns a
//! descriptor into concrete per-neuron synapse lists lives in the runtime
//! crate; this type only carries the declarative parameters and the
//! per-kind efficacy tables shared by every synapse it produces.

use crate::ids::{ConnectivityId, PopulationId};
use crate::kinds::{DelayDistKind, ExtractionKind, SynapseKind};
use crate::lut::EfficacyLut;

/// Parameters describing all synapses projecting from one population onto
/// another.
#[derive(Debug, Clone)]
pub struct ConnectivityEntry {
    /// Identity of this connectivity block.
    pub id: ConnectivityId,
    /// Source (presynaptic) population.
    pub source: PopulationId,
    /// Target (postsynaptic) population.
    pub target: PopulationId,
    /// Connection probability, or mean fraction of presynaptic neurons
    /// contacted when `extraction == FixedNum`.
    pub conn_prob: f64,
    /// Minimum transmission delay, in milliseconds.
    pub d_min: f64,
    /// Maximum transmission delay, in milliseconds.
    pub d_max: f64,
    /// How synapses are drawn.
    pub extraction: ExtractionKind,
    /// How each synapse's delay layer is chosen within `[d_min, d_max]`.
    pub delay_dist: DelayDistKind,
    /// Synaptic variant carried by every synapse in this block.
    pub synapse_kind: SynapseKind,
    /// Synapse-kind-specific parameters (length `synapse_kind.num_params()`).
    pub params: Vec<f64>,
    /// One efficacy LUT per long-term state (length `synapse_kind.num_ltp_states()`).
    pub efficacy_luts: Vec<EfficacyLut>,
}

impl ConnectivityEntry {
    /// Whether a presynaptic neuron is allowed to also appear among its own
    /// postsynaptic targets (self-coupling is permitted by this model; the
    /// extraction routine does not special-case it).
    pub fn allows_self_coupling(&self) -> bool {
        self.source == self.target
    }
}
