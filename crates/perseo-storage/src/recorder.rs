//! Owns every result sink a run may write to and exposes one method per
//! kind of record the simulator emits.
//!
//! Most sinks are optional: a simulation that never issues a `PRINT_*` or
//! `START_SPIKE_RECORDING` command for a given channel simply never opens
//! the corresponding file.

use std::path::{Path, PathBuf};

use perseo_core::{ConnectivityId, NeuronId, PopulationId, Timex};

use crate::error::Result;
use crate::sinks::TextSink;

/// Where a [`Recorder`] writes its output files.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Directory all result files are created under.
    pub output_dir: PathBuf,
}

impl RecorderConfig {
    /// Builds a configuration rooted at `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        RecorderConfig { output_dir: output_dir.into() }
    }

    fn path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }
}

/// Owns the set of result sinks opened so far during a run.
#[derive(Debug, Default)]
pub struct Recorder {
    config: Option<RecorderConfig>,
    rates: Option<TextSink>,
    spikes: Option<TextSink>,
    synaptic_transitions: Option<TextSink>,
    synaptic_state: Option<TextSink>,
    neuronal_state: Option<TextSink>,
    current: Option<TextSink>,
}

impl Recorder {
    /// Builds a recorder that will create files under `config.output_dir`.
    pub fn new(config: RecorderConfig) -> Self {
        Recorder { config: Some(config), ..Default::default() }
    }

    /// A recorder that discards every call, used when no output directory
    /// was configured (e.g. dry validation runs).
    pub fn disabled() -> Self {
        Recorder::default()
    }

    fn path(&self, file_name: &str) -> Option<PathBuf> {
        self.config.as_ref().map(|c| c.path(file_name))
    }

    /// Appends one population's firing rate sample. Opens `rates.dat` on
    /// first use.
    pub fn record_rate(&mut self, time: Timex, population: PopulationId, rate_hz: f64) -> Result<()> {
        if self.rates.is_none() {
            if let Some(path) = self.path("rates.dat") {
                self.rates = Some(TextSink::create(path, "# time(ms) population rate(Hz)\n")?);
            } else {
                return Ok(());
            }
        }
        self.rates.as_mut().unwrap().write_line(&format!("{:.3} {} {:.6}", time.as_millis(), population, rate_hz))
    }

    /// Begins routing individual spikes to `spikes.dat`; a no-op if
    /// recording is already active.
    pub fn start_spike_recording(&mut self) -> Result<()> {
        if self.spikes.is_none() {
            if let Some(path) = self.path("spikes.dat") {
                self.spikes = Some(TextSink::create(path, "# time(ms) neuron\n")?);
            }
        }
        Ok(())
    }

    /// Stops routing spikes to disk; [`Recorder::record_spike`] becomes a
    /// no-op again until [`Recorder::start_spike_recording`] is called.
    pub fn stop_spike_recording(&mut self) -> Result<()> {
        if let Some(mut sink) = self.spikes.take() {
            sink.flush()?;
        }
        Ok(())
    }

    /// Whether spikes are currently being routed to disk.
    pub fn is_spike_recording(&self) -> bool {
        self.spikes.is_some()
    }

    /// Records one spike, if spike recording is currently active.
    pub fn record_spike(&mut self, time: Timex, neuron: NeuronId) -> Result<()> {
        if let Some(sink) = self.spikes.as_mut() {
            sink.write_line(&format!("{:.3} {}", time.as_millis(), neuron))?;
        }
        Ok(())
    }

    /// Appends a synaptic-transition count sample for one connectivity entry.
    pub fn record_synaptic_transition(
        &mut self,
        time: Timex,
        connectivity: ConnectivityId,
        depressed: u64,
        potentiated: u64,
    ) -> Result<()> {
        if self.synaptic_transitions.is_none() {
            if let Some(path) = self.path("syntrans.dat") {
                self.synaptic_transitions =
                    Some(TextSink::create(path, "# time(ms) connectivity depressed potentiated\n")?);
            } else {
                return Ok(());
            }
        }
        self.synaptic_transitions.as_mut().unwrap().write_line(&format!(
            "{:.3} {} {} {}",
            time.as_millis(),
            connectivity,
            depressed,
            potentiated
        ))
    }

    /// Appends one sampled synapse's analogue hidden state (`VJ`, for
    /// plastic kernels).
    pub fn record_synaptic_state(
        &mut self,
        time: Timex,
        pre: NeuronId,
        post: NeuronId,
        vj: f64,
    ) -> Result<()> {
        if self.synaptic_state.is_none() {
            if let Some(path) = self.path("synstate.dat") {
                self.synaptic_state = Some(TextSink::create(path, "# time(ms) pre post VJ\n")?);
            } else {
                return Ok(());
            }
        }
        self.synaptic_state.as_mut().unwrap().write_line(&format!(
            "{:.3} {} {} {:.6}",
            time.as_millis(),
            pre,
            post,
            vj
        ))
    }

    /// Appends one neuron's membrane potential (and calcium, if present).
    pub fn record_neuronal_state(
        &mut self,
        time: Timex,
        neuron: NeuronId,
        v: f64,
        calcium: Option<f64>,
    ) -> Result<()> {
        if self.neuronal_state.is_none() {
            if let Some(path) = self.path("neustate.dat") {
                self.neuronal_state = Some(TextSink::create(path, "# time(ms) neuron V [calcium]\n")?);
            } else {
                return Ok(());
            }
        }
        let line = match calcium {
            Some(c) => format!("{:.3} {} {:.6} {:.6}", time.as_millis(), neuron, v, c),
            None => format!("{:.3} {} {:.6}", time.as_millis(), neuron, v),
        };
        self.neuronal_state.as_mut().unwrap().write_line(&line)
    }

    /// Appends one afferent-current sample.
    pub fn record_current(&mut self, time: Timex, neuron: NeuronId, current: f64) -> Result<()> {
        if self.current.is_none() {
            if let Some(path) = self.path("current.dat") {
                self.current = Some(TextSink::create(path, "# time(ms) neuron current\n")?);
            } else {
                return Ok(());
            }
        }
        self.current.as_mut().unwrap().write_line(&format!("{:.3} {} {:.6}", time.as_millis(), neuron, current))
    }

    /// Writes a one-shot summary of the dendritic (incoming) structure of
    /// `neuron`'s connectivity, one source population per line.
    pub fn write_dendritic_structure(
        &self,
        neuron: NeuronId,
        entries: &[(PopulationId, usize)],
    ) -> Result<()> {
        self.write_structure_snapshot("denstruct", neuron, entries)
    }

    /// Writes a one-shot summary of the synaptic (outgoing) structure of
    /// `neuron`'s connectivity, one target population per line.
    pub fn write_synaptic_structure(
        &self,
        neuron: NeuronId,
        entries: &[(PopulationId, usize)],
    ) -> Result<()> {
        self.write_structure_snapshot("synstruct", neuron, entries)
    }

    fn write_structure_snapshot(
        &self,
        stem: &str,
        neuron: NeuronId,
        entries: &[(PopulationId, usize)],
    ) -> Result<()> {
        let Some(path) = self.path(&format!("{stem}_{neuron}.dat")) else { return Ok(()) };
        let mut sink = TextSink::create(path, "# population synapse_count\n")?;
        for (population, count) in entries {
            sink.write_line(&format!("{population} {count}"))?;
        }
        sink.flush()
    }

    /// Flushes every currently open sink.
    pub fn flush_all(&mut self) -> Result<()> {
        for sink in [
            &mut self.rates,
            &mut self.spikes,
            &mut self.synaptic_transitions,
            &mut self.synaptic_state,
            &mut self.neuronal_state,
            &mut self.current,
        ] {
            if let Some(sink) = sink.as_mut() {
                sink.flush()?;
            }
        }
        Ok(())
    }
}

/// Returns the directory a [`RecorderConfig`] would write under, or `None`
/// if `dir` does not yet exist and could not be created.
pub fn ensure_output_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spike_recording_toggles_on_and_off() {
        let dir = tempfile::tempdir().unwrap();
        let mut rec = Recorder::new(RecorderConfig::new(dir.path()));
        assert!(!rec.is_spike_recording());

        // Spikes emitted before recording starts are silently dropped.
        rec.record_spike(Timex::from_millis(1.0), NeuronId::new(0)).unwrap();
        assert!(!dir.path().join("spikes.dat").exists());

        rec.start_spike_recording().unwrap();
        assert!(rec.is_spike_recording());
        rec.record_spike(Timex::from_millis(2.0), NeuronId::new(0)).unwrap();
        rec.stop_spike_recording().unwrap();
        assert!(!rec.is_spike_recording());

        let contents = std::fs::read_to_string(dir.path().join("spikes.dat")).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }

    #[test]
    fn disabled_recorder_accepts_every_call_without_writing_files() {
        let mut rec = Recorder::disabled();
        rec.start_spike_recording().unwrap();
        rec.record_spike(Timex::ZERO, NeuronId::new(0)).unwrap();
        rec.record_rate(Timex::ZERO, PopulationId::new(0), 10.0).unwrap();
        rec.flush_all().unwrap();
    }
}
