//! The network-wide discretized transmission-delay grid.
//!
//! Every connectivity entry shares one `L`-layer grid spanning the global
//! `[d_min, d_max]` (the widest span across every entry's own bounds): each
//! synapse's own delay is drawn within its entry's narrower range and then
//! rounded onto whichever of the `L` shared layers its value lands closest
//! to. Each layer is its own FIFO, since within a single layer deliveries are
//! enqueued and come due in non-decreasing time order. The layer whose head
//! is earliest across the whole grid is therefore always the network's next
//! delivery, without having to merge the layers into one timeline.

use perseo_core::{ConnectivityId, DelayDistKind, DelayLayerId, RandomStream, Spike};

use crate::fifo::Fifo;

/// One pending synaptic delivery: the presynaptic spike that triggered it,
/// which connectivity entry it belongs to, and which of the presynaptic
/// neuron's synapses (its index within that entry's axon segment) it is
/// bound for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delivery {
    /// The presynaptic spike, already timestamped with its scheduled
    /// arrival (see [`DelayLine::nominal_delay_ms`]).
    pub spike: Spike,
    /// Connectivity entry this delivery travels through.
    pub connectivity: ConnectivityId,
    /// Index into the presynaptic neuron's axon segment.
    pub synapse_index: u32,
}

/// The `L` delay layers shared by the whole network.
#[derive(Debug, Clone)]
pub struct DelayLine {
    d_min: f64,
    layer_width: f64,
    layers: Vec<Fifo<Delivery>>,
}

impl DelayLine {
    /// Builds `layer_count` empty layers spanning the network-wide
    /// `[d_min, d_max]`. Matches the reference simulator's single global
    /// `DelayStep = (DelayMax - DelayMin) / DelayNumber`: the span is
    /// divided by the layer count, not `layer_count - 1`.
    pub fn new(d_min: f64, d_max: f64, layer_count: usize) -> Self {
        debug_assert!(layer_count > 0);
        let layer_width = ((d_max - d_min) / layer_count as f64).max(0.0);
        DelayLine { d_min, layer_width, layers: (0..layer_count).map(|_| Fifo::new()).collect() }
    }

    /// Draws a delay layer for a freshly constructed synapse: samples a
    /// concrete delay within the synapse's own `[entry_d_min, entry_d_max]`
    /// per `dist`, then rounds it onto the shared grid.
    pub fn sample_layer(&self, dist: DelayDistKind, rng: &mut RandomStream, entry_d_min: f64, entry_d_max: f64) -> DelayLayerId {
        let delay = match dist {
            DelayDistKind::Uniform => entry_d_min + rng.uniform() * (entry_d_max - entry_d_min),
            DelayDistKind::Exponential => {
                let span = entry_d_max - entry_d_min;
                let mut d = entry_d_min + rng.exponential() * span.max(1e-9);
                if d > entry_d_max {
                    d = entry_d_max;
                }
                d
            }
        };
        self.layer_of(delay)
    }

    /// Maps a delay value to its discrete layer index on the shared grid.
    pub fn layer_of(&self, delay_ms: f64) -> DelayLayerId {
        if self.layer_width <= 0.0 {
            return DelayLayerId::new(0);
        }
        let idx = ((delay_ms - self.d_min) / self.layer_width).round();
        let idx = idx.clamp(0.0, (self.layers.len() - 1) as f64);
        DelayLayerId::new(idx as u32)
    }

    /// The nominal (layer-center) transmission delay of `layer`, in
    /// milliseconds: `d_min + (layer + 0.5) * layer_width`. This is the
    /// delay every delivery scheduled onto `layer` is actually credited
    /// with, regardless of the exact value originally sampled.
    pub fn nominal_delay_ms(&self, layer: DelayLayerId) -> f64 {
        self.d_min + (layer.index() as f64 + 0.5) * self.layer_width
    }

    /// Enqueues a delivery on `layer`.
    pub fn schedule(&mut self, layer: DelayLayerId, delivery: Delivery) {
        self.layers[layer.index()].push(delivery);
    }

    /// The earliest pending delivery across every layer, and the layer it
    /// is queued on.
    pub fn earliest(&self) -> Option<(DelayLayerId, &Delivery)> {
        self.layers
            .iter()
            .enumerate()
            .filter_map(|(i, fifo)| fifo.peek().map(|d| (DelayLayerId::new(i as u32), d)))
            .min_by_key(|(_, d)| d.spike.emission)
    }

    /// Removes and returns the head delivery of `layer`.
    pub fn pop(&mut self, layer: DelayLayerId) -> Option<Delivery> {
        self.layers[layer.index()].pop()
    }

    /// Number of layers this delay line was built with.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}
