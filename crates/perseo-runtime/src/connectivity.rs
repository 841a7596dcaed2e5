//! Turns a [`perseo_core::ConnectivityEntry`] descriptor into concrete,
//! compressed per-neuron axon segments: the postsynaptic targets of every
//! presynaptic neuron, each target's assigned delay layer, and each
//! synapse's kernel state.
//!
//! Targets are stored delta-encoded: an axon segment is a run of `u8` gaps
//! between consecutive (sorted) postsynaptic indices. A gap of 0 is the
//! `EXCEPTION` sentinel, meaning "the real gap did not fit in a byte, look
//! it up in the overflow table" — this keeps the common case (sparse
//! projections onto tens of thousands of neurons) at one byte per synapse
//! while still supporting arbitrarily large gaps.

use perseo_core::{ConnectivityEntry, ExtractionKind, NeuronId, RandomStream};

use crate::synapse::SynapseState;

/// Sentinel gap byte meaning "the real gap is in the overflow table".
pub const EXCEPTION: u8 = 0;

/// The compressed outgoing connectivity of one presynaptic neuron within a
/// single connectivity entry.
#[derive(Debug, Clone, Default)]
pub struct AxonSegment {
    /// Delta-encoded gaps between consecutive postsynaptic indices, plus 1
    /// (so a gap of 0, meaning "next index", is never confused with 0 used
    /// as a real delta). A value of [`EXCEPTION`] means the true gap is
    /// stored in `overflow`.
    gaps: Vec<u8>,
    /// Overflow gaps too large to fit in a `u8`, consumed in order whenever
    /// an [`EXCEPTION`] byte is encountered.
    overflow: Vec<u32>,
    /// Per-synapse kernel state, parallel to `gaps`.
    pub synapses: Vec<SynapseState>,
    /// Per-synapse assigned delay layer, parallel to `gaps`.
    pub delay_layers: Vec<perseo_core::DelayLayerId>,
}

impl AxonSegment {
    /// Decodes the postsynaptic neuron indices this segment targets, in
    /// ascending order.
    pub fn targets(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity(self.gaps.len());
        let mut cursor: i64 = -1;
        let mut overflow_iter = self.overflow.iter();
        for &g in &self.gaps {
            let gap = if g == EXCEPTION {
                *overflow_iter.next().expect("overflow table shorter than exception count") as i64
            } else {
                g as i64 - 1
            };
            cursor += 1 + gap;
            out.push(cursor as u32);
        }
        out
    }

    /// Number of synapses in this segment.
    pub fn len(&self) -> usize {
        self.gaps.len()
    }

    /// Whether this presynaptic neuron has no postsynaptic targets in this entry.
    pub fn is_empty(&self) -> bool {
        self.gaps.is_empty()
    }
}

fn encode_gaps(sorted_targets: &[u32]) -> (Vec<u8>, Vec<u32>) {
    let mut gaps = Vec::with_capacity(sorted_targets.len());
    let mut overflow = Vec::new();
    let mut cursor: i64 = -1;
    for &t in sorted_targets {
        let gap = t as i64 - 1 - cursor;
        cursor = t as i64;
        if (0..=254).contains(&gap) {
            gaps.push((gap + 1) as u8);
        } else {
            gaps.push(EXCEPTION);
            overflow.push(gap as u32);
        }
    }
    (gaps, overflow)
}

/// Draws the geometric skip (number of non-connected candidates) before the
/// next Bernoulli success with probability `conn_prob`.
fn geometric_skip(conn_prob: f64, rng: &mut RandomStream) -> usize {
    if conn_prob <= 0.0 {
        return usize::MAX;
    }
    if conn_prob >= 1.0 {
        return 0;
    }
    let r = rng.uniform();
    let skip = ((1.0 - r).ln() / (1.0 - conn_prob).ln()).floor();
    if skip.is_finite() && skip >= 0.0 {
        skip as usize
    } else {
        0
    }
}

/// Draws the set of postsynaptic indices (out of `n_post` candidates) one
/// presynaptic neuron connects onto under Bernoulli sampling, via
/// geometric-skip draws rather than one coin flip per candidate.
pub fn extract_bernoulli(n_post: usize, conn_prob: f64, rng: &mut RandomStream) -> Vec<u32> {
    let mut targets = Vec::new();
    let mut cursor: i64 = -1;
    loop {
        let skip = geometric_skip(conn_prob, rng);
        if skip == usize::MAX {
            break;
        }
        cursor += 1 + skip as i64;
        if cursor as usize >= n_post {
            break;
        }
        targets.push(cursor as u32);
    }
    targets
}

/// Draws exactly `round(n_post * conn_prob)` distinct postsynaptic indices
/// without replacement.
pub fn extract_fixed_num(n_post: usize, conn_prob: f64, rng: &mut RandomStream) -> Vec<u32> {
    let k = (n_post as f64 * conn_prob).round() as usize;
    let mut targets = rng.sample_without_replacement(n_post, k);
    targets.sort_unstable();
    targets
}

/// Builds the outgoing axon segment for one presynaptic neuron of
/// `entry`, given the number of postsynaptic candidates and independent
/// random streams for extraction, synapse construction and delay
/// assignment.
pub fn build_axon_segment(
    entry: &ConnectivityEntry,
    n_post: usize,
    neuron_rng: &mut RandomStream,
    synapse_rng: &mut RandomStream,
    delay_line: &crate::delay::DelayLine,
) -> AxonSegment {
    let targets = match entry.extraction {
        ExtractionKind::Random => extract_bernoulli(n_post, entry.conn_prob, neuron_rng),
        ExtractionKind::FixedNum => extract_fixed_num(n_post, entry.conn_prob, neuron_rng),
    };

    let (gaps, overflow) = encode_gaps(&targets);

    let synapses: Vec<SynapseState> = targets
        .iter()
        .map(|_| {
            if entry.synapse_kind == perseo_core::SynapseKind::Fixed {
                SynapseState::new_fixed(synapse_rng)
            } else {
                SynapseState::new_plastic(&entry.params, synapse_rng)
            }
        })
        .collect();

    let delay_layers = targets
        .iter()
        .map(|_| delay_line.sample_layer(entry.delay_dist, synapse_rng, entry.d_min, entry.d_max))
        .collect();

    AxonSegment { gaps, overflow, synapses, delay_layers }
}

/// Looks up the postsynaptic [`NeuronId`] a segment's `k`-th synapse
/// targets, given the target population's first neuron index.
pub fn target_neuron_id(targets: &[u32], k: usize, target_population_offset: u32) -> NeuronId {
    NeuronId::new(targets[k] + target_population_offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gap_round_trip_preserves_sorted_targets() {
        let targets = vec![0u32, 3, 4, 400, 1000];
        let (gaps, overflow) = encode_gaps(&targets);
        // 0->3 is a real overflow-worthy gap, but 3->4 is the single most
        // common case (immediately adjacent indices, D=1) and must stay
        // inline rather than spilling into the overflow table.
        assert_eq!(gaps[2], 2, "D=1 must encode inline, not via the EXCEPTION sentinel");
        assert_eq!(overflow.len(), 2);
        let segment = AxonSegment { gaps, overflow, synapses: vec![], delay_layers: vec![] };
        assert_eq!(segment.targets(), targets);
    }

    #[test]
    fn adjacent_targets_never_use_the_exception_sentinel() {
        let targets: Vec<u32> = (0..300).collect();
        let (gaps, overflow) = encode_gaps(&targets);
        assert!(overflow.is_empty(), "a fully connected run of adjacent indices needs no overflow entries");
        assert!(gaps.iter().all(|&g| g != EXCEPTION));
    }

    #[test]
    fn large_gaps_use_the_exception_sentinel() {
        let targets = vec![0u32, 10_000];
        let (gaps, overflow) = encode_gaps(&targets);
        assert_eq!(gaps[1], EXCEPTION);
        assert_eq!(overflow.len(), 1);
        let segment = AxonSegment { gaps, overflow, synapses: vec![], delay_layers: vec![] };
        assert_eq!(segment.targets(), targets);
    }

    #[test]
    fn bernoulli_extraction_stays_within_bounds() {
        let mut rng = RandomStream::new(42);
        let targets = extract_bernoulli(1000, 0.1, &mut rng);
        assert!(targets.iter().all(|&t| t < 1000));
        assert!(targets.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn fixed_num_extraction_draws_the_exact_count() {
        let mut rng = RandomStream::new(7);
        let targets = extract_fixed_num(500, 0.2, &mut rng);
        assert_eq!(targets.len(), 100);
        assert!(targets.windows(2).all(|w| w[0] < w[1]));
    }

    proptest::proptest! {
        #[test]
        fn gap_encoding_round_trips_any_sorted_target_list(
            raw in proptest::collection::vec(0u32..5000, 0..64)
        ) {
            let mut targets = raw;
            targets.sort_unstable();
            targets.dedup();
            let (gaps, overflow) = encode_gaps(&targets);
            let segment = AxonSegment { gaps, overflow, synapses: vec![], delay_layers: vec![] };
            prop_assert_eq!(segment.targets(), targets);
        }
    }
}
