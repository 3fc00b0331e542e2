//! DRAM controller simulator CLI.
//!
//! This binary drives the simulator from the command line. It provides:
//! 1. **Run:** Push a synthetic workload through a multi-channel memory system and report statistics.
//! 2. **Config:** Print the effective configuration (defaults merged with a JSON file).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use memsim_core::config::Config;
use memsim_core::sim::{MemorySystem, Pattern, Workload};

#[derive(Parser, Debug)]
#[command(
    name = "memsim",
    author,
    version,
    about = "Cycle-accurate DRAM controller simulator",
    long_about = "Run synthetic traffic through DDR3/DDR4/SALP channels and report controller statistics.\n\nConfiguration is JSON; omitted fields take their defaults (see `memsim config`).\n\nExamples:\n  memsim run --cycles 200000 --pattern stream\n  memsim run -c salp.json --pattern hammer --json\n  memsim config -c salp.json"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a synthetic workload.
    Run {
        /// JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Controller cycles to simulate.
        #[arg(long, default_value_t = 100_000)]
        cycles: u64,

        /// Access pattern.
        #[arg(long, value_enum, default_value_t = PatternArg::Random)]
        pattern: PatternArg,

        /// Fraction of generated requests that are writes.
        #[arg(long, default_value_t = 0.3)]
        write_ratio: f64,

        /// RNG seed (overrides the configuration file).
        #[arg(long)]
        seed: Option<u64>,

        /// Print statistics as JSON instead of a text report.
        #[arg(long)]
        json: bool,

        /// Report sections to print (summary, rows, defense, cores).
        #[arg(long, value_delimiter = ',')]
        sections: Vec<String>,
    },

    /// Print the effective configuration as JSON.
    Config {
        /// JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PatternArg {
    Random,
    Stream,
    Hammer,
}

impl From<PatternArg> for Pattern {
    fn from(arg: PatternArg) -> Self {
        match arg {
            PatternArg::Random => Self::Random,
            PatternArg::Stream => Self::Stream,
            PatternArg::Hammer => Self::Hammer,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    match Cli::parse().command {
        Commands::Run {
            config,
            cycles,
            pattern,
            write_ratio,
            seed,
            json,
            sections,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(seed) = seed {
                config.sim.seed = seed;
            }
            cmd_run(&config, cycles, pattern.into(), write_ratio, json, &sections)
        }
        Commands::Config { config } => {
            let config = load_config(config.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

/// Reads `path` as JSON, or returns the default configuration.
fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("unable to read config file {}", path.display()))?;
    Config::from_json(&text).with_context(|| format!("invalid config file {}", path.display()))
}

fn cmd_run(
    config: &Config,
    cycles: u64,
    pattern: Pattern,
    write_ratio: f64,
    json: bool,
    sections: &[String],
) -> anyhow::Result<()> {
    let mut system = MemorySystem::new(config).context("unable to build memory system")?;
    let mut workload = Workload::new(
        pattern,
        system.table(),
        write_ratio,
        config.controller.cores,
    );

    tracing::info!(
        standard = system.table().name(),
        channels = system.controllers().len(),
        scheduler = ?config.controller.scheduler,
        ?pattern,
        cycles,
        "starting run"
    );
    system.run(&mut workload, cycles);
    let stats = system.finish();
    tracing::info!(
        reads = stats.issued_reads,
        writes = stats.issued_writes,
        hit_rate = stats.row_hit_rate(),
        "run finished"
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        stats.print_sections(sections);
    }
    Ok(())
}
