//! Turns validated configuration and parsed definition files into a
//! runnable [`perseo_runtime::SimulationContext`]: draws every population's
//! neurons and external-weight table, extracts every connectivity entry's
//! synapses into compressed axon segments, and wires the timed command
//! timeline and output sinks around them.

use std::path::PathBuf;

use perseo_core::{
    ConnectivityEntry, ConnectivityId, EfficacyLut, Neuron, PerseoError as PerseoErr, Population, PopulationId, Streams, SynapseKind, Timex,
};
use perseo_runtime::connectivity::build_axon_segment;
use perseo_runtime::delay::DelayLine;
use perseo_runtime::driver::{NetworkTopology, SamplingConfig, SimulationContext};
use perseo_runtime::{neuron, Command, CommandTimeline};
use perseo_storage::{ensure_output_dir, Recorder, RecorderConfig};

use crate::config::{OutputSpec, OutputsConfig, SimulationConfig};
use crate::definitions::{parse_command_file, parse_connectivity_file, parse_population_file, ConnectivityDef, PopulationDef};

/// Builds the single delay grid shared by every connectivity entry: one
/// `DELAYNUMBER`-layer line spanning the globally widest `[d_min, d_max]`
/// across every entry. Each entry's own, possibly narrower, span is sampled
/// against this same shared grid in [`build_axon_segment`].
fn build_delay_line(connectivity: &[ConnectivityDef], delay_number: usize) -> DelayLine {
    let d_min_global = connectivity.iter().map(|c| c.d_min).fold(f64::INFINITY, f64::min);
    let d_max_global = connectivity.iter().map(|c| c.d_max).fold(f64::NEG_INFINITY, f64::max);
    if !d_min_global.is_finite() {
        return DelayLine::new(0.0, 0.0, delay_number.max(1));
    }
    DelayLine::new(d_min_global, d_max_global, delay_number.max(1))
}

/// Draws every population's neurons (initialized per their `init_type`
/// parameter) and external-weight LUT.
fn build_populations(defs: &[PopulationDef], kind: perseo_core::NeuronKind, neuron_rng: &mut perseo_core::RandomStream) -> perseo_core::Result<Vec<Population>> {
    defs.iter()
        .enumerate()
        .map(|(i, def)| {
            let id = PopulationId::new(i as u32);
            let h = *def.params.get(2).ok_or_else(|| PerseoErr::semantic("population", format!("population {i} has no H parameter")))?;
            let initial_v = neuron::initial_state(kind, &def.params, h)?;
            let ext_weight_lut = EfficacyLut::build_gaussian(neuron_rng, def.j_ext, def.dj_ext);
            let neurons = vec![Neuron::at_rest(id, initial_v); def.n];
            let mut population = Population {
                id,
                j_ext: def.j_ext,
                dj_ext: def.dj_ext,
                c_ext: def.c_ext,
                nu_ext: def.nu_ext,
                inv_nu_ext: 0.0,
                next_external_spike: Timex::ZERO,
                spike_counter: 0,
                params: def.params.clone(),
                ext_weight_lut,
                neurons,
            };
            population.recompute_inv_nu_ext();
            Ok(population)
        })
        .collect()
}

/// Builds each connectivity entry's efficacy LUTs from its own parameter
/// row: `[J, DJ]` for the fixed kernel (one LUT), `[J0, J1, DJ0, DJ1, ...]`
/// for the plastic kernels (depressed-state LUT from `(J0, DJ0)`,
/// potentiated-state LUT from `(J1, DJ1)`).
fn build_connectivity(
    defs: &[ConnectivityDef],
    config: &SimulationConfig,
    synapse_rng: &mut perseo_core::RandomStream,
) -> Vec<ConnectivityEntry> {
    defs.iter()
        .enumerate()
        .map(|(i, def)| {
            let efficacy_luts = match def.synapse_kind {
                SynapseKind::Fixed => vec![EfficacyLut::build_gaussian(synapse_rng, def.params[0], def.params[1])],
                SynapseKind::Af | SynapseKind::Twam => vec![
                    EfficacyLut::build_gaussian(synapse_rng, def.params[0], def.params[2]),
                    EfficacyLut::build_gaussian(synapse_rng, def.params[1], def.params[3]),
                ],
            };
            ConnectivityEntry {
                id: ConnectivityId::new(i as u32),
                source: PopulationId::new(def.pre_pop as u32),
                target: PopulationId::new(def.post_pop as u32),
                conn_prob: def.conn_prob,
                d_min: def.d_min,
                d_max: def.d_max,
                extraction: config.extraction_type,
                delay_dist: config.delay_dist_type,
                synapse_kind: def.synapse_kind,
                params: def.params.clone(),
                efficacy_luts,
            }
        })
        .collect()
}

/// Builds the full network (populations, connectivity, axon segments and
/// delay lines) from parsed definitions and an already-validated configuration.
pub fn build_simulation(config: &SimulationConfig) -> perseo_core::Result<SimulationContext> {
    let population_defs = parse_population_file(&config.module_file, config.neuron_type)?;
    if population_defs.is_empty() {
        return Err(PerseoErr::semantic("populations file", "no populations defined"));
    }
    let connectivity_defs = parse_connectivity_file(&config.connectivity_file, population_defs.len())?;

    let mut streams = Streams::new(config.neurons_seed, config.synapses_seed);

    let populations = build_populations(&population_defs, config.neuron_type, &mut streams.neurons)?;
    let connectivity = build_connectivity(&connectivity_defs, config, &mut streams.synapses);

    let delay_line = build_delay_line(&connectivity_defs, config.delay_number);
    let population_offsets = NetworkTopology::compute_offsets(&populations);
    let total_neurons: usize = populations.iter().map(|p| p.n_neurons()).sum();

    let axons: Vec<Vec<_>> = connectivity
        .iter()
        .map(|entry| {
            let n_post = populations[entry.target.index()].n_neurons();
            let n_pre = populations[entry.source.index()].n_neurons();
            (0..n_pre).map(|_| build_axon_segment(entry, n_post, &mut streams.neurons, &mut streams.synapses, &delay_line)).collect()
        })
        .collect();

    let connectivity_count = connectivity.len();

    let topology = NetworkTopology {
        neuron_kind: config.neuron_type,
        populations,
        population_offsets,
        connectivity,
        axons,
        delay_line,
    };

    let commands = build_command_timeline(config, &population_defs, &connectivity_defs)?;
    let sampling = sampling_config(&config.outputs);
    let recorder = build_recorder(config)?;

    Ok(SimulationContext {
        topology,
        streams,
        commands,
        sinusoids: std::collections::HashMap::new(),
        recorder,
        sampling,
        emitted_since_sample: vec![0; population_defs.len()],
        current_since_sample: vec![0.0; total_neurons],
        synaptic_transitions: vec![(0, 0); connectivity_count],
        now: Timex::ZERO,
        end_time: Timex::from_millis(config.life_ms),
    })
}

fn build_command_timeline(
    config: &SimulationConfig,
    population_defs: &[PopulationDef],
    connectivity_defs: &[ConnectivityDef],
) -> perseo_core::Result<CommandTimeline> {
    let mut timeline = CommandTimeline::new();

    if let Some(path) = &config.command_file {
        for scheduled in parse_command_file(path, population_defs, connectivity_defs)? {
            timeline.schedule(scheduled.at, scheduled.command);
        }
    }

    let fastest_period = [
        config.outputs.rate.as_ref().map(|s| s.period_ms),
        config.outputs.neuron_state.as_ref().map(|s| s.period_ms),
        config.outputs.syn_state.as_ref().map(|s| s.period_ms),
        config.outputs.current.as_ref().map(|s| s.period_ms),
    ]
    .into_iter()
    .flatten()
    .fold(f64::INFINITY, f64::min);

    if fastest_period.is_finite() {
        timeline.schedule(Timex::from_millis(fastest_period), Command::SampleOutputs { period_ms: fastest_period });
    }

    Ok(timeline)
}

fn sampling_config(outputs: &OutputsConfig) -> SamplingConfig {
    let range_of = |spec: &Option<OutputSpec>| {
        spec.as_ref().map(|s| {
            let (from, to) = s.range.unwrap_or((0, u32::MAX as usize));
            (from as u32, to as u32)
        })
    };
    SamplingConfig {
        rates: outputs.rate.is_some(),
        neuron_state: range_of(&outputs.neuron_state),
        synaptic_state: outputs.syn_state.is_some(),
        current: range_of(&outputs.current),
    }
}

/// Picks the output directory every fixed-name sink is created under: the
/// parent of the first configured output file. `Recorder` writes every
/// channel under one shared directory with its own fixed file name, so
/// distinct per-channel paths in the init file collapse onto whichever
/// directory the first one names.
fn build_recorder(config: &SimulationConfig) -> perseo_core::Result<Recorder> {
    let outputs = &config.outputs;
    let output_dir: Option<PathBuf> = [
        outputs.rate.as_ref(),
        outputs.spike.as_ref(),
        outputs.synapse.as_ref(),
        outputs.syn_state.as_ref(),
        outputs.neuron_state.as_ref(),
        outputs.syn_trans.as_ref(),
        outputs.detail_syn_trans.as_ref(),
        outputs.syn_struct.as_ref(),
        outputs.den_struct.as_ref(),
        outputs.current.as_ref(),
    ]
    .into_iter()
    .flatten()
    .find_map(|spec| spec.file.parent())
    .map(|p| p.to_path_buf());

    match output_dir {
        Some(dir) => {
            ensure_output_dir(&dir).map_err(|e| PerseoErr::io(dir.display().to_string(), e))?;
            Ok(Recorder::new(RecorderConfig::new(dir)))
        }
        None => Ok(Recorder::disabled()),
    }
}
