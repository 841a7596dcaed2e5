//! The timed command timeline: scheduled, one-shot or state-toggling
//! actions that fire at a specific simulation time, independent of network
//! activity (recording toggles, live parameter changes, periodic external
//! drive modulation, and handing control to an external program).

use std::f64::consts::PI;

use perseo_core::{ConnectivityId, NeuronId, PopulationId, Timex};

use crate::event_heap::EventHeap;

/// One timed command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Dumps the incoming (dendritic) connectivity structure of one neuron.
    PrintDendriticStructure {
        /// Neuron to summarize.
        neuron: NeuronId,
    },
    /// Dumps the outgoing (synaptic) connectivity structure of one neuron.
    PrintSynapticStructure {
        /// Neuron to summarize.
        neuron: NeuronId,
    },
    /// Starts routing individual spikes to the spike-recording sink.
    StartSpikeRecording,
    /// Stops routing individual spikes to the spike-recording sink.
    StopSpikeRecording,
    /// Overwrites one population parameter at runtime.
    SetPopulationParam {
        /// Population to modify.
        population: PopulationId,
        /// Index into the population's parameter vector.
        param_index: usize,
        /// New value.
        value: f64,
    },
    /// Overwrites one connectivity-entry parameter at runtime.
    SetConnectivityParam {
        /// Connectivity entry to modify.
        connectivity: ConnectivityId,
        /// Index into the entry's parameter vector.
        param_index: usize,
        /// New value.
        value: f64,
    },
    /// Re-reads a named definitions file and applies whichever population
    /// or connectivity parameters it overrides.
    SetParamFromFile {
        /// Path of the file to read.
        path: String,
    },
    /// Begins sinusoidally modulating a population's external drive rate.
    StartSinusoidalStimulation(SinusoidalStimulation),
    /// Stops modulating a population's external drive rate, restoring its
    /// configured `nu_ext`.
    StopSinusoidalStimulation {
        /// Population to restore.
        population: PopulationId,
    },
    /// Self-rescheduling tick that resamples one population's modulated
    /// drive rate; reschedules itself every [`SinusoidalStimulation::resample_period_ms`]
    /// for as long as the stimulation stays active. A no-op once the
    /// stimulation has been stopped.
    RefreshSinusoidalStimulation {
        /// Population being resampled.
        population: PopulationId,
    },
    /// Self-rescheduling tick that samples every enabled periodic output
    /// channel (rates, neuronal state, synaptic state, afferent current)
    /// and reschedules itself every `period_ms` for the rest of the run.
    SampleOutputs {
        /// Sampling period, in milliseconds.
        period_ms: f64,
    },
    /// Hands control to an external program, passing the current
    /// simulation time on its command line.
    ExternalCommand {
        /// Program to invoke.
        program: String,
        /// Arguments to pass, in order.
        args: Vec<String>,
    },
}

/// A sinusoidal modulation of a population's external Poisson drive rate:
/// `nu_ext(t) = max(0, base * (1 + amplitude * sin(2*pi*(t - t0)/period + phase)))`,
/// resampled every `resample_period_ms` rather than evaluated continuously.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SinusoidalStimulation {
    /// Population whose drive is modulated.
    pub population: PopulationId,
    /// Unmodulated drive rate, in Hz.
    pub base_nu_ext: f64,
    /// Relative modulation depth.
    pub amplitude: f64,
    /// Modulation period, in milliseconds.
    pub period_ms: f64,
    /// Phase offset, in radians.
    pub phase_rad: f64,
    /// Time origin the modulation's phase is measured from.
    pub t0: Timex,
    /// How often the driver resamples `nu_ext` from this modulation.
    pub resample_period_ms: f64,
}

impl SinusoidalStimulation {
    /// Evaluates the modulated drive rate at `t`, floored at zero.
    pub fn nu_ext_at(&self, t: Timex) -> f64 {
        let elapsed_ms = t.diff_ms(self.t0);
        let modulation = 1.0 + self.amplitude * (2.0 * PI * elapsed_ms / self.period_ms + self.phase_rad).sin();
        (self.base_nu_ext * modulation).max(0.0)
    }
}

/// The set of commands still pending, ordered by their activation time.
#[derive(Debug, Default)]
pub struct CommandTimeline {
    heap: EventHeap<Command>,
}

impl CommandTimeline {
    /// Builds an empty timeline.
    pub fn new() -> Self {
        CommandTimeline { heap: EventHeap::new() }
    }

    /// Schedules `command` to fire at `at`.
    pub fn schedule(&mut self, at: Timex, command: Command) {
        self.heap.push(at, command);
    }

    /// Time of the next pending command, if any.
    pub fn next_due(&self) -> Option<Timex> {
        self.heap.peek_time()
    }

    /// Removes and returns the next pending command.
    pub fn pop(&mut self) -> Option<(Timex, Command)> {
        self.heap.pop()
    }

    /// Whether any commands remain scheduled.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
