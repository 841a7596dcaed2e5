//! `perseo`: the command-line front-end that loads an init file, builds the
//! network it describes, and runs the discrete-event simulation to
//! completion or until interrupted.

mod config;
mod definitions;
mod error;
mod network;

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::{info, warn};

use config::{RawConfig, SimulationConfig};
use error::Result;

/// Discrete-event simulator for large spiking neural networks.
#[derive(Parser, Debug)]
#[command(name = "perseo", version, about)]
struct Cli {
    /// Path to the `KEY=VALUE` init file.
    init_file: PathBuf,

    /// Additional `KEY=VALUE` overrides, applied after the init file.
    overrides: Vec<String>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        eprintln!("perseo: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut raw = RawConfig::from_file(&cli.init_file)?;
    raw.apply_overrides(&cli.overrides)?;
    let config = SimulationConfig::from_raw(&raw)?;

    if let Some(log_file) = &config.log_file {
        if let Err(e) = fs::write(log_file, "") {
            warn!("could not prepare log file {}: {e}", log_file.display());
        }
    }

    info!("building network from {}", config.module_file.display());
    let mut ctx = network::build_simulation(&config)?;

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)).context("installing SIGINT handler")?;

    info!("running until {} ms or interrupt", config.life_ms);
    while ctx.now < ctx.end_time {
        if interrupted.load(Ordering::SeqCst) {
            warn!("interrupted at {}, flushing pending output", ctx.now);
            break;
        }
        if !ctx.step()? {
            break;
        }
    }
    ctx.recorder.flush_all()?;

    info!("finished at {}", ctx.now);
    Ok(())
}
