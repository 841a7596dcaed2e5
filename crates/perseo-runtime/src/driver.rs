//! The simulation driver: owns the whole network plus its pending event
//! sources, and advances simulated time one event at a time.
//!
//! At every step the driver picks the earliest of three candidate events —
//! the next external (Poisson) spike, the next internally queued delivery
//! due through some connectivity entry's delay lines, or the next
//! scheduled timed command — dispatches it, and never goes backwards in
//! time. This mirrors the reference simulator's single-threaded,
//! non-real-time event loop; there is no fixed timestep anywhere in it.

use std::collections::HashMap;

use log::{debug, trace, warn};

use perseo_core::{
    ConnectivityEntry, ConnectivityId, DelayLayerId, NeuronId, NeuronKind, Population, PopulationId, Spike, Streams,
    Timex,
};
use perseo_storage::Recorder;

use crate::commands::{Command, CommandTimeline, SinusoidalStimulation};
use crate::connectivity::AxonSegment;
use crate::delay::{Delivery, DelayLine};
use crate::error::{Result, RuntimeError};
use crate::{external, neuron, synapse};

/// The static (post-construction) network topology a [`SimulationContext`] runs.
pub struct NetworkTopology {
    /// Global neuron kind shared by every population.
    pub neuron_kind: NeuronKind,
    /// Every population, indexed by [`PopulationId`].
    pub populations: Vec<Population>,
    /// Global neuron-index offset of each population's first neuron.
    pub population_offsets: Vec<u32>,
    /// Every connectivity entry, indexed by [`ConnectivityId`].
    pub connectivity: Vec<ConnectivityEntry>,
    /// Outgoing axon segments, indexed `[connectivity][local presynaptic index]`.
    pub axons: Vec<Vec<AxonSegment>>,
    /// The single delay grid shared by every connectivity entry.
    pub delay_line: DelayLine,
}

impl NetworkTopology {
    /// Builds population-index offsets from each population's neuron count.
    pub fn compute_offsets(populations: &[Population]) -> Vec<u32> {
        let mut offsets = Vec::with_capacity(populations.len());
        let mut next = 0u32;
        for p in populations {
            offsets.push(next);
            next += p.n_neurons() as u32;
        }
        offsets
    }

    /// Total number of neurons across every population.
    pub fn total_neurons(&self) -> usize {
        self.populations.iter().map(|p| p.n_neurons()).sum()
    }

    /// Resolves a global [`NeuronId`] to its owning population and
    /// population-local index.
    pub fn locate(&self, neuron: NeuronId) -> (PopulationId, usize) {
        let global = neuron.raw();
        let pop_idx = match self.population_offsets.binary_search(&global) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        (PopulationId::new(pop_idx as u32), (global - self.population_offsets[pop_idx]) as usize)
    }

    /// Every connectivity entry whose source is `population`.
    pub fn outgoing_from(
        &self,
        population: PopulationId,
    ) -> impl Iterator<Item = ConnectivityId> + '_ {
        self.connectivity
            .iter()
            .enumerate()
            .filter(move |(_, c)| c.source == population)
            .map(|(i, _)| ConnectivityId::new(i as u32))
    }
}

/// Which periodic output channels a run samples, and the neuron-index
/// ranges (inclusive) the per-neuron channels are restricted to.
#[derive(Debug, Clone, Default)]
pub struct SamplingConfig {
    /// Whether per-population firing rates are sampled.
    pub rates: bool,
    /// Neuron range sampled for membrane potential (and calcium, if any).
    pub neuron_state: Option<(u32, u32)>,
    /// Whether plastic synapses' `VJ` are sampled.
    pub synaptic_state: bool,
    /// Neuron range sampled for summed incoming synaptic drive.
    pub current: Option<(u32, u32)>,
}

impl SamplingConfig {
    /// Whether any channel is enabled at all.
    pub fn is_active(&self) -> bool {
        self.rates || self.neuron_state.is_some() || self.synaptic_state || self.current.is_some()
    }
}

/// Owns a running simulation: the network, its two random streams, the
/// pending command timeline, active sinusoidal stimulations and the result
/// recorder.
pub struct SimulationContext {
    /// The network being simulated.
    pub topology: NetworkTopology,
    /// The two independent random streams.
    pub streams: Streams,
    /// Pending timed commands.
    pub commands: CommandTimeline,
    /// Sinusoidal drive modulations currently active, keyed by population.
    pub sinusoids: HashMap<PopulationId, SinusoidalStimulation>,
    /// Result sink.
    pub recorder: Recorder,
    /// Enabled periodic output channels.
    pub sampling: SamplingConfig,
    /// Spikes emitted per population since the last rate sample.
    pub emitted_since_sample: Vec<u64>,
    /// Summed incoming synaptic drive per neuron since the last current sample.
    pub current_since_sample: Vec<f64>,
    /// Cumulative (depressed, potentiated) state-transition counts per
    /// connectivity entry, indexed by [`ConnectivityId`].
    pub synaptic_transitions: Vec<(u64, u64)>,
    /// Current simulated time.
    pub now: Timex,
    /// Time the run should stop at.
    pub end_time: Timex,
}

enum NextEvent {
    External { population: usize },
    Delivery { layer: DelayLayerId },
    Command,
}

impl SimulationContext {
    /// Runs the simulation to completion, processing events until `now`
    /// reaches `end_time` or every event source is exhausted.
    ///
    /// Running past the last event before `end_time` (the ordinary way a
    /// run ends once its external drive's next arrival, or any other
    /// pending event, would land beyond `end_time`) is success, not
    /// exhaustion: [`RuntimeError::EventsExhausted`] is reserved for a
    /// network with genuinely nothing left scheduled — no external drive,
    /// no pending deliveries, no commands — while simulated time still has
    /// ground to cover.
    pub fn run(&mut self) -> Result<()> {
        while self.now < self.end_time {
            if self.pick_next_event().is_none() {
                return Err(RuntimeError::EventsExhausted {
                    at: self.now.as_millis(),
                    end: self.end_time.as_millis(),
                });
            }
            if !self.step()? {
                break;
            }
        }
        self.recorder.flush_all()?;
        Ok(())
    }

    /// Processes exactly one event, advancing `now` to it. Returns `false`
    /// if no event source had anything pending before `end_time`.
    pub fn step(&mut self) -> Result<bool> {
        let Some((at, event)) = self.pick_next_event() else { return Ok(false) };
        if at > self.end_time {
            return Ok(false);
        }
        self.now = at;

        match event {
            NextEvent::External { population } => self.dispatch_external(population)?,
            NextEvent::Delivery { layer } => self.dispatch_delivery(layer)?,
            NextEvent::Command => self.dispatch_command()?,
        }
        Ok(true)
    }

    fn pick_next_event(&self) -> Option<(Timex, NextEvent)> {
        let external =
            external::earliest_external(&self.topology.populations).map(|(pop, t)| (t, NextEvent::External { population: pop }));

        let delivery = self.topology.delay_line.earliest().map(|(layer, d)| (d.spike.emission, NextEvent::Delivery { layer }));

        let command = self.commands.next_due().map(|t| (t, NextEvent::Command));

        [external, delivery, command].into_iter().flatten().min_by_key(|(t, _)| *t)
    }

    fn dispatch_external(&mut self, population_index: usize) -> Result<()> {
        let population = &mut self.topology.populations[population_index];
        let Some(local_neuron) = external::advance_external_spike(population, &mut self.streams.neurons) else {
            return Ok(());
        };
        let offset = self.topology.population_offsets[population_index];
        let neuron_id = NeuronId::new(local_neuron.raw() + offset);
        let weight = external::external_weight(population, self.streams.neurons.uniform_index(256) as u8) as f64;

        self.apply_weight_and_maybe_emit(neuron_id, weight, self.now)
    }

    fn dispatch_delivery(&mut self, layer: DelayLayerId) -> Result<()> {
        let Delivery { spike, connectivity, synapse_index } =
            self.topology.delay_line.pop(layer).expect("delivery event popped an empty layer");
        let connectivity = connectivity.index();

        let entry = self.topology.connectivity[connectivity].clone();
        let offset = self.topology.population_offsets[entry.target.index()];
        let now = self.now;

        let local_target = self.topology.axons[connectivity][spike.neuron.index()].targets()[synapse_index as usize];
        let target_id = NeuronId::new(local_target + offset);

        // Bring the postsynaptic neuron's state up to date *before* reading
        // its gating state: AF's gate test looks at V, which must already
        // reflect the leak/decay up to `now`, not a stale pre-decay value.
        {
            let kind = self.topology.neuron_kind;
            let population = &mut self.topology.populations[entry.target.index()];
            let params = population.params.clone();
            let n = &mut population.neurons[local_target as usize];
            neuron::integrate_to(kind, &params, n, now);
        }

        let post_v;
        let post_t_last_emit;
        {
            let post_population = &self.topology.populations[entry.target.index()];
            let post_neuron = &post_population.neurons[local_target as usize];
            post_v = post_neuron.v();
            post_t_last_emit = post_neuron.t_last_emit;
        }

        let axon = &mut self.topology.axons[connectivity][spike.neuron.index()];
        let (ltp_state, lut_index, transition) = match &mut axon.synapses[synapse_index as usize] {
            s @ synapse::SynapseState::Fixed { .. } => {
                let (ltp, lut) = s.active_index();
                (ltp, lut, None)
            }
            s => {
                let potentiate = if entry.synapse_kind == perseo_core::SynapseKind::Af {
                    post_v > entry.params[synapse::IDX_GATE]
                } else {
                    now.diff_ms(post_t_last_emit) < entry.params[synapse::IDX_GATE]
                };
                synapse::update_plastic(s, &entry.params, spike.isi, potentiate)
            }
        };

        if let Some(potentiated) = transition {
            let counts = &mut self.synaptic_transitions[entry.id.index()];
            if potentiated {
                counts.1 += 1;
            } else {
                counts.0 += 1;
            }
            self.recorder.record_synaptic_transition(now, entry.id, counts.0, counts.1)?;
        }

        let weight = entry.efficacy_luts[ltp_state].get(lut_index) as f64;
        self.apply_weight_and_maybe_emit(target_id, weight, now)
    }

    fn apply_weight_and_maybe_emit(&mut self, neuron_id: NeuronId, weight: f64, t: Timex) -> Result<()> {
        let (pop_id, local_idx) = self.topology.locate(neuron_id);
        let kind = self.topology.neuron_kind;
        let population = &mut self.topology.populations[pop_id.index()];
        let params = population.params.clone();
        let n = &mut population.neurons[local_idx];

        neuron::integrate_to(kind, &params, n, t);
        neuron::apply_input(kind, n, weight);
        n.t_last_pre = t;

        if let Some(slot) = self.current_since_sample.get_mut(neuron_id.index()) {
            *slot += weight;
        }

        if neuron::try_emit(kind, &params, n, t) {
            if let Some(slot) = self.emitted_since_sample.get_mut(pop_id.index()) {
                *slot += 1;
            }
            self.recorder.record_spike(t, neuron_id)?;
            self.schedule_outgoing_spikes(pop_id, local_idx, t)?;
        }
        Ok(())
    }

    /// Samples every currently enabled periodic output channel.
    fn sample_outputs(&mut self, period_ms: f64) -> Result<()> {
        if self.sampling.rates {
            for population in &mut self.topology.populations {
                let idx = population.id.index();
                let emitted = self.emitted_since_sample.get(idx).copied().unwrap_or(0);
                let n = population.n_neurons().max(1) as f64;
                let rate_hz = emitted as f64 / (n * (period_ms / 1000.0));
                self.recorder.record_rate(self.now, population.id, rate_hz)?;
                if let Some(slot) = self.emitted_since_sample.get_mut(idx) {
                    *slot = 0;
                }
            }
        }

        if let Some((from, to)) = self.sampling.neuron_state {
            let kind = self.topology.neuron_kind;
            for raw in from..=to {
                let neuron_id = NeuronId::new(raw);
                let (pop_id, local_idx) = self.topology.locate(neuron_id);
                let n = &self.topology.populations[pop_id.index()].neurons[local_idx];
                let calcium = kind.has_calcium().then(|| n.calcium());
                self.recorder.record_neuronal_state(self.now, neuron_id, n.v(), calcium)?;
            }
        }

        if self.sampling.synaptic_state {
            for (c, entry) in self.topology.connectivity.iter().enumerate() {
                if entry.synapse_kind == perseo_core::SynapseKind::Fixed {
                    continue;
                }
                let source_offset = self.topology.population_offsets[entry.source.index()];
                let target_offset = self.topology.population_offsets[entry.target.index()];
                for (pre_local, axon) in self.topology.axons[c].iter().enumerate() {
                    let targets = axon.targets();
                    let pre_id = NeuronId::new(pre_local as u32 + source_offset);
                    for (k, synapse) in axon.synapses.iter().enumerate() {
                        if let synapse::SynapseState::Plastic { vj, .. } = synapse {
                            let post_id = NeuronId::new(targets[k] + target_offset);
                            self.recorder.record_synaptic_state(self.now, pre_id, post_id, *vj as f64)?;
                        }
                    }
                }
            }
        }

        if let Some((from, to)) = self.sampling.current {
            for raw in from..=to {
                let current = self.current_since_sample.get(raw as usize).copied().unwrap_or(0.0);
                self.recorder.record_current(self.now, NeuronId::new(raw), current)?;
                if let Some(slot) = self.current_since_sample.get_mut(raw as usize) {
                    *slot = 0.0;
                }
            }
        }

        Ok(())
    }

    fn schedule_outgoing_spikes(&mut self, source_population: PopulationId, local_idx: usize, t: Timex) -> Result<()> {
        let isi = {
            let population = &self.topology.populations[source_population.index()];
            let n = &population.neurons[local_idx];
            t.diff_ms(n.t_last_pre).max(0.0)
        };

        let entries: Vec<ConnectivityId> = self.topology.outgoing_from(source_population).collect();
        for conn_id in entries {
            let axon = &self.topology.axons[conn_id.index()][local_idx];
            for (k, layer) in axon.delay_layers.iter().enumerate() {
                let delay = self.topology.delay_line.nominal_delay_ms(*layer);
                let spike = Spike::new(t.advance_ms(delay), NeuronId::new(local_idx as u32), isi);
                self.topology.delay_line.schedule(*layer, Delivery { spike, connectivity: conn_id, synapse_index: k as u32 });
            }
        }
        Ok(())
    }

    fn dispatch_command(&mut self) -> Result<()> {
        let (_, command) = self.commands.pop().expect("dispatch_command called without a pending command");
        debug!("dispatching command at {}", self.now);
        match command {
            Command::StartSpikeRecording => self.recorder.start_spike_recording()?,
            Command::StopSpikeRecording => self.recorder.stop_spike_recording()?,
            Command::SetPopulationParam { population, param_index, value } => {
                self.topology.populations[population.index()].params[param_index] = value;
            }
            Command::SetConnectivityParam { connectivity, param_index, value } => {
                self.topology.connectivity[connectivity.index()].params[param_index] = value;
            }
            Command::SetParamFromFile { path } => {
                trace!("SET_PARAM_FROM {path} is handled by the CLI front-end's definition loader");
            }
            Command::StartSinusoidalStimulation(stim) => {
                let population = stim.population;
                let resample_at = self.now.advance_ms(stim.resample_period_ms);
                self.sinusoids.insert(population, stim);
                self.commands.schedule(resample_at, Command::RefreshSinusoidalStimulation { population });
            }
            Command::StopSinusoidalStimulation { population } => {
                if let Some(stim) = self.sinusoids.remove(&population) {
                    self.topology.populations[population.index()].nu_ext = stim.base_nu_ext;
                    self.topology.populations[population.index()].recompute_inv_nu_ext();
                }
            }
            Command::RefreshSinusoidalStimulation { population } => {
                if let Some(&stim) = self.sinusoids.get(&population) {
                    let nu_ext = stim.nu_ext_at(self.now);
                    self.topology.populations[population.index()].nu_ext = nu_ext;
                    self.topology.populations[population.index()].recompute_inv_nu_ext();
                    let resample_at = self.now.advance_ms(stim.resample_period_ms);
                    self.commands.schedule(resample_at, Command::RefreshSinusoidalStimulation { population });
                }
            }
            Command::SampleOutputs { period_ms } => {
                self.sample_outputs(period_ms)?;
                let resample_at = self.now.advance_ms(period_ms);
                self.commands.schedule(resample_at, Command::SampleOutputs { period_ms });
            }
            Command::ExternalCommand { program, args } => {
                self.recorder.flush_all()?;
                match std::process::Command::new(&program).args(&args).status() {
                    Ok(status) => trace!("external command {program} exited with {status}"),
                    Err(e) => warn!("failed to launch external command {program}: {e}"),
                }
            }
            Command::PrintDendriticStructure { neuron } => {
                let summary = self.dendritic_structure_summary(neuron);
                self.recorder.write_dendritic_structure(neuron, &summary)?;
            }
            Command::PrintSynapticStructure { neuron } => {
                let summary = self.synaptic_structure_summary(neuron);
                self.recorder.write_synaptic_structure(neuron, &summary)?;
            }
        }
        Ok(())
    }

    fn synaptic_structure_summary(&self, neuron: NeuronId) -> Vec<(PopulationId, usize)> {
        let (_, local_idx) = self.topology.locate(neuron);
        self.topology
            .connectivity
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.target, self.topology.axons[i][local_idx].len()))
            .collect()
    }

    fn dendritic_structure_summary(&self, neuron: NeuronId) -> Vec<(PopulationId, usize)> {
        let (target_pop, local_idx) = self.topology.locate(neuron);
        self.topology
            .connectivity
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.target == target_pop)
            .map(|(i, entry)| {
                let count = self.topology.axons[i]
                    .iter()
                    .filter(|axon| axon.targets().contains(&(local_idx as u32)))
                    .count();
                (entry.source, count)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perseo_core::{EfficacyLut, Neuron, Population, RandomStream};

    fn context_with_drive(nu_ext: f64, end_ms: f64) -> SimulationContext {
        let mut rng = RandomStream::new(1);
        let params = vec![20.0, 20.0, 0.0, 2.0, 0.0];
        let mut population = Population {
            id: PopulationId::new(0),
            j_ext: 20.0,
            dj_ext: 0.0,
            c_ext: 1.0,
            nu_ext,
            inv_nu_ext: 0.0,
            next_external_spike: Timex::ZERO,
            spike_counter: 0,
            params,
            ext_weight_lut: EfficacyLut::build_gaussian(&mut rng, 20.0, 0.0),
            neurons: vec![Neuron::at_rest(PopulationId::new(0), 0.0)],
        };
        population.recompute_inv_nu_ext();

        SimulationContext {
            topology: NetworkTopology {
                neuron_kind: NeuronKind::Lif,
                populations: vec![population],
                population_offsets: vec![0],
                connectivity: vec![],
                axons: vec![],
                delay_line: DelayLine::new(1.0, 1.0, 1),
            },
            streams: Streams::new(1, 2),
            commands: CommandTimeline::new(),
            sinusoids: HashMap::new(),
            recorder: Recorder::disabled(),
            sampling: SamplingConfig::default(),
            emitted_since_sample: vec![0],
            current_since_sample: vec![0.0],
            synaptic_transitions: vec![],
            now: Timex::ZERO,
            end_time: Timex::from_millis(end_ms),
        }
    }

    #[test]
    fn run_completes_without_error_when_drive_outlives_end_time() {
        let mut ctx = context_with_drive(1000.0, 50.0);
        ctx.run().unwrap();
        assert!(ctx.now <= ctx.end_time);
        assert!(ctx.topology.populations[0].spike_counter > 0);
    }

    #[test]
    fn run_reports_exhaustion_only_when_nothing_is_left_scheduled() {
        let mut ctx = context_with_drive(0.0, 50.0);
        let err = ctx.run().unwrap_err();
        assert!(matches!(err, RuntimeError::EventsExhausted { at, .. } if at == 0.0));
    }

    #[test]
    fn step_stops_advancing_once_the_next_event_is_past_end_time() {
        let mut ctx = context_with_drive(1000.0, 0.01);
        while ctx.step().unwrap() {}
        assert!(ctx.now <= ctx.end_time);
    }
}
