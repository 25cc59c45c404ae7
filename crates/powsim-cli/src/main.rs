use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use powsim_core::{AdmissionMode, RaceMode, Simulation, SimulationConfig, Target};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

mod report;
mod scenario;

#[derive(Parser, Debug)]
#[command(name = "powsim")]
#[command(about = "Simulate competing proof-of-work miners over a shared ledger")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a scenario and print every miner's chain
    Run {
        /// JSON scenario file; the built-in demo is used when omitted
        #[arg(long)]
        scenario: Option<PathBuf>,
        /// Seed for the mining schedule permutation
        #[arg(long)]
        seed: Option<u64>,
        /// Difficulty as a number of leading zero bits
        #[arg(long, conflicts_with = "target")]
        difficulty_bits: Option<u32>,
        /// Difficulty as a hex threshold (up to 64 digits)
        #[arg(long)]
        target: Option<String>,
        /// Race miners on rayon worker threads
        #[arg(long)]
        parallel: bool,
        /// Check every ledger before admitting anywhere
        #[arg(long)]
        two_phase: bool,
        /// Pin every block timestamp (unix seconds)
        #[arg(long)]
        timestamp: Option<u64>,
        /// Print the report and chains as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the built-in demo scenario as JSON
    DemoConfig,
}

struct Overrides {
    seed: Option<u64>,
    difficulty_bits: Option<u32>,
    target: Option<String>,
    parallel: bool,
    two_phase: bool,
    timestamp: Option<u64>,
}

fn apply(mut config: SimulationConfig, o: Overrides) -> Result<SimulationConfig> {
    if let Some(seed) = o.seed {
        config.seed = Some(seed);
    }
    if let Some(bits) = o.difficulty_bits {
        config.target = Target::from_leading_zero_bits(bits);
    }
    if let Some(hex) = o.target {
        config.target = Target::from_hex(&hex)?;
    }
    if o.parallel {
        config.race = RaceMode::Parallel;
    }
    if o.two_phase {
        config.admission = AdmissionMode::TwoPhase;
    }
    if let Some(ts) = o.timestamp {
        config.timestamp = Some(ts);
    }
    Ok(config)
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Run {
            scenario: scenario_path,
            seed,
            difficulty_bits,
            target,
            parallel,
            two_phase,
            timestamp,
            json,
        } => {
            let config = match scenario_path {
                Some(path) => SimulationConfig::from_json_file(&path)
                    .with_context(|| format!("loading scenario {}", path.display()))?,
                None => scenario::demo(),
            };
            let config = apply(
                config,
                Overrides {
                    seed,
                    difficulty_bits,
                    target,
                    parallel,
                    two_phase,
                    timestamp,
                },
            )?;

            let mut sim = Simulation::new(config)?;
            let run = sim.run();
            info!(
                seed = run.seed,
                mined = run.mined(),
                discarded = run.discarded(),
                "run finished"
            );

            if json {
                println!("{}", report::to_json(&sim, &run)?);
            } else {
                print!("{}", report::outcomes(&run));
                print!("{}", report::chains(&sim));
            }
        }
        Command::DemoConfig => {
            println!("{}", scenario::demo().to_json_pretty()?);
        }
    }
    Ok(())
}
