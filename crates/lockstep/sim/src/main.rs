//! lockstep-sim - convergence simulation
//!
//! Drives a master and a set of optimistic clients through a seeded random
//! workload over the in-process loopback, then checks that every client ends
//! on the master's public checksum. Exits non-zero on divergence.

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod simulation;

use config::SimConfig;

/// lockstep-sim CLI
#[derive(Parser)]
#[command(name = "lockstep-sim")]
#[command(about = "Lockstep convergence simulation", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "LOCKSTEP_CONFIG")]
    config: Option<String>,

    /// Number of clients
    #[arg(long)]
    clients: Option<usize>,

    /// Total number of actions
    #[arg(long)]
    actions: Option<usize>,

    /// Actions dispatched between deliveries
    #[arg(long)]
    batch_size: Option<usize>,

    /// RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Log level
    #[arg(long)]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = SimConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    // Override with CLI args
    if let Some(clients) = cli.clients {
        config.simulation.clients = clients;
    }
    if let Some(actions) = cli.actions {
        config.simulation.actions = actions;
    }
    if let Some(batch_size) = cli.batch_size {
        config.simulation.batch_size = batch_size;
    }
    if let Some(seed) = cli.seed {
        config.simulation.seed = seed;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let report = simulation::run(&config).await?;

    println!(
        "actions: {}  forwards: {}  mismatches: {}  resyncs: {}  corrections: {}",
        report.actions, report.forwards, report.mismatches, report.resyncs, report.corrections
    );
    println!(
        "public:  {} (count = {})",
        report.public.checksum(),
        report.public.state().count
    );

    if !report.converged() {
        let diverged: Vec<String> = report.diverged.iter().map(ToString::to_string).collect();
        anyhow::bail!("clients diverged from the master: {}", diverged.join(", "));
    }

    Ok(())
}
