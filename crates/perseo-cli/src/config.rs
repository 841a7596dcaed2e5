//! The `KEY=VALUE` initialization file: reading it, overlaying command-line
//! overrides on top, and validating the result into a [`SimulationConfig`].

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use perseo_core::{DelayDistKind, ExtractionKind, NeuronKind};

/// Where one raw `KEY=VALUE` assignment came from, for error messages.
#[derive(Debug, Clone, PartialEq)]
pub enum Origin {
    /// Line `line` (1-based) of `path`.
    File {
        /// Path of the init file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
    },
    /// A trailing `KEY=VALUE` argument on the command line.
    CommandLine,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::File { path, line } => write!(f, "{}:{line}", path.display()),
            Origin::CommandLine => write!(f, "command line"),
        }
    }
}

/// One raw assignment, before type validation.
#[derive(Debug, Clone)]
struct RawEntry {
    value: String,
    origin: Origin,
}

/// An ordered map of uppercased keys to their last-seen raw value, tracking
/// where each came from. Later insertions (command-line overrides, applied
/// after the file pass) replace earlier ones.
#[derive(Debug, Default)]
pub struct RawConfig {
    entries: HashMap<String, RawEntry>,
}

impl RawConfig {
    fn set(&mut self, key: &str, value: String, origin: Origin) {
        self.entries.insert(key.to_ascii_uppercase(), RawEntry { value, origin });
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|e| e.value.as_str())
    }

    fn origin_of(&self, key: &str) -> Origin {
        self.entries.get(key).map(|e| e.origin.clone()).unwrap_or(Origin::CommandLine)
    }

    /// Parses one `KEY=VALUE` line's worth of text (no surrounding `#`
    /// comment, no leading/trailing whitespace) into the map.
    fn apply_line(&mut self, line: &str, origin: Origin) -> perseo_core::Result<()> {
        let Some((key, raw_value)) = line.split_once('=') else {
            return Err(perseo_core::PerseoError::config(origin.to_string(), format!("malformed assignment '{line}'")));
        };
        let key = key.trim();
        let value = unquote(raw_value.trim());
        self.set(key, value, origin);
        Ok(())
    }

    /// Reads `path`, stripping `#` comments and blank lines, into a fresh map.
    pub fn from_file(path: &Path) -> perseo_core::Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| perseo_core::PerseoError::io(path.display().to_string(), e))?;
        let mut cfg = RawConfig::default();
        for (i, raw_line) in text.lines().enumerate() {
            let line = strip_comment(raw_line).trim();
            if line.is_empty() {
                continue;
            }
            cfg.apply_line(line, Origin::File { path: path.to_path_buf(), line: i + 1 })?;
        }
        Ok(cfg)
    }

    /// Overlays `KEY=VALUE` command-line arguments on top of this map,
    /// command-line entries winning on conflict.
    pub fn apply_overrides(&mut self, overrides: &[String]) -> perseo_core::Result<()> {
        for raw in overrides {
            self.apply_line(raw, Origin::CommandLine)?;
        }
        Ok(())
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(i) => &line[..i],
        None => line,
    }
}

fn unquote(value: &str) -> String {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 && bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\'' {
        value[1..value.len() - 1].to_string()
    } else {
        value.to_string()
    }
}

/// One `OUTxxx=ON file period [from to]` output-channel directive.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSpec {
    /// Output file path.
    pub file: PathBuf,
    /// Sampling period, in milliseconds.
    pub period_ms: f64,
    /// Optional inclusive neuron-index range this channel is restricted to.
    pub range: Option<(usize, usize)>,
}

/// Every `OUT*` channel the init file may enable.
#[derive(Debug, Clone, Default)]
pub struct OutputsConfig {
    /// Per-population firing-rate sampling.
    pub rate: Option<OutputSpec>,
    /// Individual-spike recording.
    pub spike: Option<OutputSpec>,
    /// Synaptic-structure snapshot.
    pub synapse: Option<OutputSpec>,
    /// Synaptic analogue-state (`VJ`) trace.
    pub syn_state: Option<OutputSpec>,
    /// Neuronal-state (`V`, calcium) trace.
    pub neuron_state: Option<OutputSpec>,
    /// Cumulative synaptic-transition counters.
    pub syn_trans: Option<OutputSpec>,
    /// Per-event detailed synaptic transitions.
    pub detail_syn_trans: Option<OutputSpec>,
    /// Synaptic-structure summary dumps.
    pub syn_struct: Option<OutputSpec>,
    /// Dendritic-structure summary dumps.
    pub den_struct: Option<OutputSpec>,
    /// Afferent-current trace.
    pub current: Option<OutputSpec>,
}

/// A fully validated simulation configuration.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Neuron kernel shared by every population.
    pub neuron_type: NeuronKind,
    /// Path to the populations-definition file.
    pub module_file: PathBuf,
    /// Delay-layer assignment distribution.
    pub delay_dist_type: DelayDistKind,
    /// Number of discrete delay layers, `L`.
    pub delay_number: usize,
    /// Synaptic-extraction strategy.
    pub extraction_type: ExtractionKind,
    /// Path to the connectivity-definition file.
    pub connectivity_file: PathBuf,
    /// Total simulated duration, in milliseconds.
    pub life_ms: f64,
    /// Neuron-stream seed.
    pub neurons_seed: u64,
    /// Synapse-stream seed.
    pub synapses_seed: u64,
    /// Optional path for the human-readable run log.
    pub log_file: Option<PathBuf>,
    /// Optional path to the timed-command file.
    pub command_file: Option<PathBuf>,
    /// Enabled output channels.
    pub outputs: OutputsConfig,
}

const REQUIRED_KEYS: &[&str] = &["NEURONTYPE", "MODULEFILE", "DELAYDISTRIBTYPE", "DELAYNUMBER", "CONNECTIVITYFILE", "LIFE"];

const OUTPUT_KEYS: &[&str] = &[
    "OUTRATE",
    "OUTSPIKE",
    "OUTSYNAPSE",
    "OUTSYNSTATE",
    "OUTNEURONSTATE",
    "OUTSYNTRANS",
    "OUTDETAILSYNTRANS",
    "OUTSYNSTRUCT",
    "OUTDENSTRUCT",
    "OUTCURRENT",
];

impl SimulationConfig {
    /// Validates `raw` into a [`SimulationConfig`], checking required keys
    /// and parsing every typed value.
    pub fn from_raw(raw: &RawConfig) -> perseo_core::Result<Self> {
        for key in REQUIRED_KEYS {
            if raw.get(key).is_none() {
                return Err(perseo_core::PerseoError::config("init file", format!("missing required key {key}")));
            }
        }

        let neuron_type = parse_field::<NeuronKind>(raw, "NEURONTYPE")?;
        let module_file = PathBuf::from(raw.get("MODULEFILE").unwrap());
        let delay_dist_type = parse_field::<DelayDistKind>(raw, "DELAYDISTRIBTYPE")?;
        let delay_number = parse_numeric_field(raw, "DELAYNUMBER")? as usize;
        if delay_number == 0 {
            return Err(perseo_core::PerseoError::config(raw.origin_of("DELAYNUMBER").to_string(), "DELAYNUMBER must be >= 1"));
        }
        let connectivity_file = PathBuf::from(raw.get("CONNECTIVITYFILE").unwrap());
        let life_ms = parse_numeric_field(raw, "LIFE")?;

        let extraction_type = match raw.get("SYNAPTICEXTRACTIONTYPE") {
            Some(v) => v.parse().map_err(|_| {
                perseo_core::PerseoError::config(raw.origin_of("SYNAPTICEXTRACTIONTYPE").to_string(), format!("unknown extraction kind '{v}'"))
            })?,
            None => ExtractionKind::Random,
        };

        let neurons_seed = match raw.get("NEURONSSEED") {
            Some(v) => parse_numeric(v, &raw.origin_of("NEURONSSEED"), "NEURONSSEED")? as u64,
            None => 1,
        };
        let synapses_seed = match raw.get("SYNAPSESSEED") {
            Some(v) => parse_numeric(v, &raw.origin_of("SYNAPSESSEED"), "SYNAPSESSEED")? as u64,
            None => 2,
        };

        let log_file = raw.get("LOGFILE").map(PathBuf::from);
        let command_file = raw.get("COMMANDFILE").map(PathBuf::from);

        let mut outputs = OutputsConfig::default();
        for key in OUTPUT_KEYS {
            let Some(spec) = parse_output_spec(raw, key)? else { continue };
            match *key {
                "OUTRATE" => outputs.rate = Some(spec),
                "OUTSPIKE" => outputs.spike = Some(spec),
                "OUTSYNAPSE" => outputs.synapse = Some(spec),
                "OUTSYNSTATE" => outputs.syn_state = Some(spec),
                "OUTNEURONSTATE" => outputs.neuron_state = Some(spec),
                "OUTSYNTRANS" => outputs.syn_trans = Some(spec),
                "OUTDETAILSYNTRANS" => outputs.detail_syn_trans = Some(spec),
                "OUTSYNSTRUCT" => outputs.syn_struct = Some(spec),
                "OUTDENSTRUCT" => outputs.den_struct = Some(spec),
                "OUTCURRENT" => outputs.current = Some(spec),
                _ => unreachable!(),
            }
        }

        Ok(SimulationConfig {
            neuron_type,
            module_file,
            delay_dist_type,
            delay_number,
            extraction_type,
            connectivity_file,
            life_ms,
            neurons_seed,
            synapses_seed,
            log_file,
            command_file,
            outputs,
        })
    }
}

fn parse_field<T: std::str::FromStr>(raw: &RawConfig, key: &str) -> perseo_core::Result<T> {
    let v = raw.get(key).unwrap();
    v.parse::<T>().map_err(|_| perseo_core::PerseoError::config(raw.origin_of(key).to_string(), format!("unknown value '{v}' for {key}")))
}

fn parse_numeric_field(raw: &RawConfig, key: &str) -> perseo_core::Result<f64> {
    let v = raw.get(key).unwrap();
    parse_numeric(v, &raw.origin_of(key), key)
}

fn parse_numeric(v: &str, origin: &Origin, key: &str) -> perseo_core::Result<f64> {
    v.parse::<f64>().map_err(|_| perseo_core::PerseoError::config(origin.to_string(), format!("'{v}' is not a number for {key}")))
}

/// Parses `OUTxxx=ON file period [from to]` / `OUTxxx=OFF` for one key.
/// Returns `Ok(None)` if the key is absent or explicitly `OFF`.
fn parse_output_spec(raw: &RawConfig, key: &str) -> perseo_core::Result<Option<OutputSpec>> {
    let Some(value) = raw.get(key) else { return Ok(None) };
    let origin = raw.origin_of(key);
    let tokens: Vec<&str> = value.split_whitespace().collect();
    match tokens.first().copied() {
        None | Some("OFF") => Ok(None),
        Some("ON") => {
            if tokens.len() < 3 {
                return Err(perseo_core::PerseoError::config(origin.to_string(), format!("{key}=ON requires a file and a period")));
            }
            let file = PathBuf::from(tokens[1]);
            let period_ms = parse_numeric(tokens[2], &origin, key)?;
            let range = match tokens.len() {
                3 => None,
                5 => {
                    let from = parse_numeric(tokens[3], &origin, key)? as usize;
                    let to = parse_numeric(tokens[4], &origin, key)? as usize;
                    Some((from, to))
                }
                _ => return Err(perseo_core::PerseoError::config(origin.to_string(), format!("{key}=ON takes either 2 or 4 trailing tokens"))),
            };
            Ok(Some(OutputSpec { file, period_ms, range }))
        }
        Some(other) => Err(perseo_core::PerseoError::config(origin.to_string(), format!("{key} must be ON or OFF, got '{other}'"))),
    }
}
