//! Tagged-variant replacements for the reference simulator's function-pointer
//! families: neuron kind, synapse kind, delay-distribution kind and
//! synaptic-extraction kind are each a closed enum dispatched through a
//! `match`, resolved once at configuration-validation time.

use std::fmt;
use std::str::FromStr;

use crate::error::PerseoError;

/// The integrate-and-fire neuron variant of a population.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NeuronKind {
    /// Leaky integrate-and-fire, exponential decay.
    Lif,
    /// LIF plus calcium-mediated spike-frequency adaptation.
    LifCa,
    /// "VLSI" integrate-and-fire, linear decay with a reflecting barrier at 0.
    Vif,
    /// VIF plus calcium-mediated spike-frequency adaptation.
    VifCa,
}

impl NeuronKind {
    /// Number of real-valued parameters the kind's population row carries
    /// after the five fixed columns (`N J_ext DJ_ext C_ext nu_ext`).
    pub fn num_params(self) -> usize {
        match self {
            NeuronKind::Lif | NeuronKind::Vif => 5,
            NeuronKind::LifCa | NeuronKind::VifCa => 8,
        }
    }

    /// Number of per-neuron state variables (membrane potential, and calcium
    /// concentration for the adapting variants).
    pub fn num_state_vars(self) -> usize {
        match self {
            NeuronKind::Lif | NeuronKind::Vif => 1,
            NeuronKind::LifCa | NeuronKind::VifCa => 2,
        }
    }

    /// Whether this variant carries a calcium-adaptation state variable.
    pub fn has_calcium(self) -> bool {
        matches!(self, NeuronKind::LifCa | NeuronKind::VifCa)
    }

    /// Whether the subthreshold leak is linear (VIF family) rather than
    /// exponential (LIF family); linear variants reflect at V = 0.
    pub fn is_linear_leak(self) -> bool {
        matches!(self, NeuronKind::Vif | NeuronKind::VifCa)
    }
}

impl fmt::Display for NeuronKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NeuronKind::Lif => "LIF",
            NeuronKind::LifCa => "LIFCA",
            NeuronKind::Vif => "VIF",
            NeuronKind::VifCa => "VIFCA",
        };
        write!(f, "{s}")
    }
}

impl FromStr for NeuronKind {
    type Err = PerseoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LIF" => Ok(NeuronKind::Lif),
            "LIFCA" => Ok(NeuronKind::LifCa),
            "VIF" => Ok(NeuronKind::Vif),
            "VIFCA" => Ok(NeuronKind::VifCa),
            other => Err(PerseoError::config("NEURONTYPE", format!("unknown neuron kind '{other}'"))),
        }
    }
}

/// Initial-condition selector shared by all neuron kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitType {
    /// All membrane potentials start at the reset potential `H`.
    Reset,
    /// All membrane potentials start at 0 (the "resting" convention).
    Resting,
}

impl InitType {
    /// Decodes the numeric `init_type` parameter column.
    pub fn from_param(value: f64, kind: NeuronKind) -> Result<Self, PerseoError> {
        match value.round() as i64 {
            0 => Ok(InitType::Reset),
            1 => Ok(InitType::Resting),
            _ => Err(PerseoError::unknown_param_index(0, format!("{kind} init_type"))),
        }
    }
}

/// The synaptic variant carried by a connectivity entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SynapseKind {
    /// Fixed (immutable) synaptic efficacy drawn once per-synapse from a LUT.
    Fixed,
    /// Annunziato-Fusi bistable plastic synapse.
    Af,
    /// Time-Window Anti-Markram plastic synapse (an AF variant gated on
    /// post-synaptic spike timing instead of membrane potential).
    Twam,
}

impl SynapseKind {
    /// Number of real-valued synapse parameters following the fixed
    /// `conn_prob d_min d_max 'kind'` columns.
    pub fn num_params(self) -> usize {
        match self {
            SynapseKind::Fixed => 2,
            SynapseKind::Af | SynapseKind::Twam => 13,
        }
    }

    /// Number of discrete long-term (LTP) states, each selecting its own
    /// 256-entry efficacy LUT.
    pub fn num_ltp_states(self) -> usize {
        match self {
            SynapseKind::Fixed => 1,
            SynapseKind::Af | SynapseKind::Twam => 2,
        }
    }

    /// Size in bytes of one synapse's packed hidden state (excluding the LUT
    /// index bytes, which are counted separately by the caller).
    pub fn state_byte_size(self) -> usize {
        match self {
            // One LUT index byte, no extra hidden state.
            SynapseKind::Fixed => 1,
            // Two LUT index bytes (depressed/potentiated) plus a 4-byte VJ float.
            SynapseKind::Af | SynapseKind::Twam => 2 + 4,
        }
    }
}

impl fmt::Display for SynapseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SynapseKind::Fixed => "FIXED",
            SynapseKind::Af => "AF",
            SynapseKind::Twam => "TWAM",
        };
        write!(f, "{s}")
    }
}

impl FromStr for SynapseKind {
    type Err = PerseoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FIXED" => Ok(SynapseKind::Fixed),
            "AF" => Ok(SynapseKind::Af),
            "TWAM" => Ok(SynapseKind::Twam),
            other => Err(PerseoError::config("synapse kind", format!("unknown synapse kind '{other}'"))),
        }
    }
}

/// Distribution used to assign a delay layer to each newly constructed synapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DelayDistKind {
    /// Uniform over `[d_min, d_max]`.
    Uniform,
    /// Exponential, truncated to `[d_min, d_max]`.
    Exponential,
}

impl fmt::Display for DelayDistKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DelayDistKind::Uniform => "UNIFORM",
            DelayDistKind::Exponential => "EXPONENTIAL",
        };
        write!(f, "{s}")
    }
}

impl FromStr for DelayDistKind {
    type Err = PerseoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "UNIFORM" => Ok(DelayDistKind::Uniform),
            "EXPONENTIAL" => Ok(DelayDistKind::Exponential),
            other => Err(PerseoError::config("DELAYDISTRIBTYPE", format!("unknown delay distribution '{other}'"))),
        }
    }
}

/// Strategy used to draw the synapses of a connectivity entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExtractionKind {
    /// Bernoulli sampling via geometric-skip draws.
    Random,
    /// Exactly `round(n_pre * conn_prob)` synapses per post-neuron.
    FixedNum,
}

impl fmt::Display for ExtractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExtractionKind::Random => "RANDOM",
            ExtractionKind::FixedNum => "FIXEDNUM",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ExtractionKind {
    type Err = PerseoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "RANDOM" => Ok(ExtractionKind::Random),
            "FIXEDNUM" => Ok(ExtractionKind::FixedNum),
            other => Err(PerseoError::config("SYNAPTICEXTRACTIONTYPE", format!("unknown extraction kind '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neuron_kind_param_counts_match_reference() {
        assert_eq!(NeuronKind::Lif.num_params(), 5);
        assert_eq!(NeuronKind::Vif.num_params(), 5);
        assert_eq!(NeuronKind::LifCa.num_params(), 8);
        assert_eq!(NeuronKind::VifCa.num_params(), 8);
    }

    #[test]
    fn synapse_kind_param_counts_match_reference() {
        assert_eq!(SynapseKind::Fixed.num_params(), 2);
        assert_eq!(SynapseKind::Af.num_params(), 13);
        assert_eq!(SynapseKind::Twam.num_params(), 13);
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("lifca".parse::<NeuronKind>().unwrap(), NeuronKind::LifCa);
        assert_eq!("Twam".parse::<SynapseKind>().unwrap(), SynapseKind::Twam);
    }

    #[test]
    fn rejects_unknown_tags() {
        assert!("BOGUS".parse::<NeuronKind>().is_err());
        assert!("BOGUS".parse::<DelayDistKind>().is_err());
        assert!("BOGUS".parse::<ExtractionKind>().is_err());
    }
}
