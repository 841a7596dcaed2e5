//! Parsers for the three whitespace-delimited definition files the init
//! file points at: the population array, the connectivity array, and the
//! timed command stream.

use std::fs;
use std::path::Path;

use perseo_core::{NeuronId, NeuronKind, PopulationId, PerseoError, SynapseKind, Timex};
use perseo_runtime::Command;

/// One row of the populations-definition file.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationDef {
    /// Number of neurons in the population.
    pub n: usize,
    /// Mean external synaptic weight.
    pub j_ext: f64,
    /// Relative stddev of the external synaptic weight.
    pub dj_ext: f64,
    /// External connectivity factor.
    pub c_ext: f64,
    /// External Poisson drive rate, in Hz.
    pub nu_ext: f64,
    /// Neuron-kind-specific parameters.
    pub params: Vec<f64>,
}

/// One row of the connectivity-definition file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectivityDef {
    /// Postsynaptic (target) population index.
    pub post_pop: usize,
    /// Presynaptic (source) population index.
    pub pre_pop: usize,
    /// Connection probability (or mean fraction, under fixed-number extraction).
    pub conn_prob: f64,
    /// Minimum transmission delay, in milliseconds.
    pub d_min: f64,
    /// Maximum transmission delay, in milliseconds.
    pub d_max: f64,
    /// Synaptic kernel carried by this block.
    pub synapse_kind: SynapseKind,
    /// Synapse-kind-specific parameters.
    pub params: Vec<f64>,
}

/// One command parsed out of the command file, with its absolute firing time.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledCommand {
    /// Absolute simulation time the command fires at.
    pub at: Timex,
    /// The command itself.
    pub command: Command,
}

/// Splits a line on whitespace, treating a `'...'`-delimited span as one
/// token with the quotes stripped.
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '\'' {
            chars.next();
            let mut tok = String::new();
            for c in chars.by_ref() {
                if c == '\'' {
                    break;
                }
                tok.push(c);
            }
            tokens.push(tok);
        } else {
            let mut tok = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                tok.push(c);
                chars.next();
            }
            tokens.push(tok);
        }
    }
    tokens
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(i) => &line[..i],
        None => line,
    }
}

fn parse_f64(location: &str, token: &str) -> perseo_core::Result<f64> {
    token.parse::<f64>().map_err(|_| PerseoError::config(location.to_string(), format!("'{token}' is not a number")))
}

fn parse_usize(location: &str, token: &str) -> perseo_core::Result<usize> {
    token.parse::<f64>().map(|v| v.round() as usize).map_err(|_| {
        PerseoError::config(location.to_string(), format!("'{token}' is not an index"))
    })
}

fn read_lines(path: &Path) -> perseo_core::Result<Vec<String>> {
    let text = fs::read_to_string(path).map_err(|e| PerseoError::io(path.display().to_string(), e))?;
    Ok(text
        .lines()
        .map(strip_comment)
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// Parses a populations-definition file: `N J_ext DJ_ext C_ext nu_ext <neuron params...>` per line.
pub fn parse_population_file(path: &Path, kind: NeuronKind) -> perseo_core::Result<Vec<PopulationDef>> {
    let location = path.display().to_string();
    let expected_params = kind.num_params();
    let mut out = Vec::new();
    for (i, line) in read_lines(path)?.iter().enumerate() {
        let where_ = format!("{location}:{}", i + 1);
        let tokens = tokenize(line);
        if tokens.len() != 5 + expected_params {
            return Err(PerseoError::semantic(
                "population row",
                format!("{where_}: expected 5 + {expected_params} columns, found {}", tokens.len()),
            ));
        }
        let n = parse_usize(&where_, &tokens[0])?;
        if n == 0 {
            return Err(PerseoError::semantic("population row", format!("{where_}: N must be >= 1")));
        }
        let j_ext = parse_f64(&where_, &tokens[1])?;
        let dj_ext = parse_f64(&where_, &tokens[2])?;
        let c_ext = parse_f64(&where_, &tokens[3])?;
        let nu_ext = parse_f64(&where_, &tokens[4])?;
        let params = tokens[5..].iter().map(|t| parse_f64(&where_, t)).collect::<perseo_core::Result<Vec<f64>>>()?;
        out.push(PopulationDef { n, j_ext, dj_ext, c_ext, nu_ext, params });
    }
    Ok(out)
}

/// Parses a connectivity-definition file:
/// `post_pop pre_pop conn_prob d_min d_max 'synapse_kind' <synapse params...>` per line.
pub fn parse_connectivity_file(path: &Path, num_populations: usize) -> perseo_core::Result<Vec<ConnectivityDef>> {
    let location = path.display().to_string();
    let mut out = Vec::new();
    for (i, line) in read_lines(path)?.iter().enumerate() {
        let where_ = format!("{location}:{}", i + 1);
        let tokens = tokenize(line);
        if tokens.len() < 6 {
            return Err(PerseoError::semantic("connectivity row", format!("{where_}: too few columns")));
        }
        let post_pop = parse_usize(&where_, &tokens[0])?;
        let pre_pop = parse_usize(&where_, &tokens[1])?;
        if post_pop >= num_populations || pre_pop >= num_populations {
            return Err(PerseoError::index_out_of_range(post_pop.max(pre_pop) as u32, num_populations.saturating_sub(1) as u32));
        }
        let conn_prob = parse_f64(&where_, &tokens[2])?;
        if !(0.0..=1.0).contains(&conn_prob) {
            return Err(PerseoError::semantic("connectivity row", format!("{where_}: conn_prob must be in [0, 1]")));
        }
        let d_min = parse_f64(&where_, &tokens[3])?;
        let d_max = parse_f64(&where_, &tokens[4])?;
        if d_min > d_max {
            return Err(PerseoError::semantic("connectivity row", format!("{where_}: d_min must be <= d_max")));
        }
        let synapse_kind: SynapseKind = tokens[5]
            .parse()
            .map_err(|_| PerseoError::config(where_.clone(), format!("unknown synapse kind '{}'", tokens[5])))?;
        let expected_params = synapse_kind.num_params();
        let rest = &tokens[6..];
        if rest.len() != expected_params {
            return Err(PerseoError::semantic(
                "connectivity row",
                format!("{where_}: expected {expected_params} synapse params, found {}", rest.len()),
            ));
        }
        let params = rest.iter().map(|t| parse_f64(&where_, t)).collect::<perseo_core::Result<Vec<f64>>>()?;
        out.push(ConnectivityDef { post_pop, pre_pop, conn_prob, d_min, d_max, synapse_kind, params });
    }
    Ok(out)
}

/// Nu_ext's parameter index (position 4 of a population's row, 0-based as
/// `[decay-ish columns..., nu_ext]`); the only population parameter the
/// sinusoidal-stimulation command is wired to modulate.
const NU_EXT_PARAM_INDEX: usize = 4;

fn find_connectivity_index(connectivity: &[ConnectivityDef], post_pop: usize, pre_pop: usize, where_: &str) -> perseo_core::Result<u32> {
    connectivity
        .iter()
        .position(|c| c.post_pop == post_pop && c.pre_pop == pre_pop)
        .map(|i| i as u32)
        .ok_or_else(|| PerseoError::semantic("command", format!("{where_}: no connectivity entry ({post_pop}, {pre_pop})")))
}

/// Parses the timed command stream: one command per line, `#` comments,
/// relative time offsets accumulated against a running cursor.
pub fn parse_command_file(
    path: &Path,
    populations: &[PopulationDef],
    connectivity: &[ConnectivityDef],
) -> perseo_core::Result<Vec<ScheduledCommand>> {
    let location = path.display().to_string();
    let mut cursor_ms = 0.0f64;
    let mut out = Vec::new();

    for (i, line) in read_lines(path)?.iter().enumerate() {
        let where_ = format!("{location}:{}", i + 1);
        let tokens = tokenize(line);
        let Some(name) = tokens.first() else { continue };

        match name.to_ascii_uppercase().as_str() {
            "PRINT_DENDRITIC_STRUCTURE" | "PRINT_SYNAPTIC_STRUCTURE" => {
                if tokens.len() < 2 || tokens.len() > 3 {
                    return Err(PerseoError::config(where_, format!("'{name}' takes a time offset and an optional neuron index")));
                }
                let dt = parse_f64(&where_, &tokens[1])?;
                let neuron = match tokens.get(2) {
                    Some(t) => parse_usize(&where_, t)?,
                    None => 0,
                };
                cursor_ms += dt;
                let command = if name.eq_ignore_ascii_case("PRINT_DENDRITIC_STRUCTURE") {
                    Command::PrintDendriticStructure { neuron: NeuronId::new(neuron as u32) }
                } else {
                    Command::PrintSynapticStructure { neuron: NeuronId::new(neuron as u32) }
                };
                out.push(ScheduledCommand { at: Timex::from_millis(cursor_ms), command });
            }
            "START_SPIKE_RECORDING" | "STOP_SPIKE_RECORDING" => {
                if tokens.len() != 2 {
                    return Err(PerseoError::config(where_, format!("'{name}' takes exactly a time offset")));
                }
                let dt = parse_f64(&where_, &tokens[1])?;
                cursor_ms += dt;
                let command =
                    if name.eq_ignore_ascii_case("START_SPIKE_RECORDING") { Command::StartSpikeRecording } else { Command::StopSpikeRecording };
                out.push(ScheduledCommand { at: Timex::from_millis(cursor_ms), command });
            }
            "SET_PARAM" => match tokens.len() {
                5 => {
                    let dt = parse_f64(&where_, &tokens[1])?;
                    let population = parse_usize(&where_, &tokens[2])?;
                    let param_index = parse_usize(&where_, &tokens[3])?;
                    let value = parse_f64(&where_, &tokens[4])?;
                    cursor_ms += dt;
                    out.push(ScheduledCommand {
                        at: Timex::from_millis(cursor_ms),
                        command: Command::SetPopulationParam { population: PopulationId::new(population as u32), param_index, value },
                    });
                }
                6 => {
                    let dt = parse_f64(&where_, &tokens[1])?;
                    let post_pop = parse_usize(&where_, &tokens[2])?;
                    let pre_pop = parse_usize(&where_, &tokens[3])?;
                    let param_index = parse_usize(&where_, &tokens[4])?;
                    let value = parse_f64(&where_, &tokens[5])?;
                    let connectivity_id = find_connectivity_index(connectivity, post_pop, pre_pop, &where_)?;
                    cursor_ms += dt;
                    out.push(ScheduledCommand {
                        at: Timex::from_millis(cursor_ms),
                        command: Command::SetConnectivityParam {
                            connectivity: perseo_core::ConnectivityId::new(connectivity_id),
                            param_index,
                            value,
                        },
                    });
                }
                _ => return Err(PerseoError::config(where_, "'SET_PARAM' takes 4 or 5 arguments")),
            },
            "SET_PARAM_FROM" => {
                if tokens.len() != 4 {
                    return Err(PerseoError::config(where_, "'SET_PARAM_FROM' takes a file, a population and a parameter index"));
                }
                let side_path = Path::new(&tokens[1]);
                let population = parse_usize(&where_, &tokens[2])?;
                let param_index = parse_usize(&where_, &tokens[3])?;
                for (j, row) in read_lines(side_path)?.iter().enumerate() {
                    let row_where = format!("{}:{}", side_path.display(), j + 1);
                    let row_tokens = tokenize(row);
                    if row_tokens.len() != 2 {
                        return Err(PerseoError::config(row_where, "expected 'dT value' per row"));
                    }
                    let dt = parse_f64(&row_where, &row_tokens[0])?;
                    let value = parse_f64(&row_where, &row_tokens[1])?;
                    cursor_ms += dt;
                    out.push(ScheduledCommand {
                        at: Timex::from_millis(cursor_ms),
                        command: Command::SetPopulationParam { population: PopulationId::new(population as u32), param_index, value },
                    });
                }
            }
            "SINUSOIDAL_STIMULATION" => {
                if tokens.len() != 8 {
                    return Err(PerseoError::config(where_, "'SINUSOIDAL_STIMULATION' takes 7 arguments"));
                }
                let population = parse_usize(&where_, &tokens[1])?;
                let param_index = parse_usize(&where_, &tokens[2])?;
                if param_index != NU_EXT_PARAM_INDEX {
                    return Err(PerseoError::semantic(
                        "command",
                        format!("{where_}: sinusoidal stimulation only modulates nu_ext (parameter {NU_EXT_PARAM_INDEX})"),
                    ));
                }
                let t0_offset = parse_f64(&where_, &tokens[3])?;
                let resample_period_ms = parse_f64(&where_, &tokens[4])?;
                let period_ms = parse_f64(&where_, &tokens[5])?;
                let phase_rad = parse_f64(&where_, &tokens[6])?;
                let amplitude = parse_f64(&where_, &tokens[7])?;
                let Some(pop_def) = populations.get(population) else {
                    return Err(PerseoError::index_out_of_range(population as u32, populations.len().saturating_sub(1) as u32));
                };

                cursor_ms += t0_offset;
                let t0 = Timex::from_millis(cursor_ms);
                out.push(ScheduledCommand {
                    at: t0,
                    command: Command::StartSinusoidalStimulation(perseo_runtime::SinusoidalStimulation {
                        population: PopulationId::new(population as u32),
                        base_nu_ext: pop_def.nu_ext,
                        amplitude,
                        period_ms,
                        phase_rad,
                        t0,
                        resample_period_ms,
                    }),
                });
            }
            "EXTERNAL_COMMAND" => {
                if tokens.len() < 3 {
                    return Err(PerseoError::config(where_, "'EXTERNAL_COMMAND' takes a time offset and a command"));
                }
                let dt = parse_f64(&where_, &tokens[1])?;
                let program = tokens[2].clone();
                let args = tokens[3..].to_vec();
                cursor_ms += dt;
                out.push(ScheduledCommand { at: Timex::from_millis(cursor_ms), command: Command::ExternalCommand { program, args } });
            }
            other => return Err(PerseoError::config(where_, format!("unknown command '{other}'"))),
        }
    }

    Ok(out)
}
