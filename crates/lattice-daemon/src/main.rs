// crates/lattice-daemon/src/main.rs
//
// Binary entrypoint for the Lattice daemon.
//
// Initializes tracing, parses CLI arguments, loads configuration, wires the
// EigenTrust calculator and controller, and runs the epoch scheduler.

mod config;
mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use config::DaemonConfig;
use scheduler::EpochScheduler;

use lattice_core::StaticNetmap;
use lattice_reputation::{
    Calculator, CalculatorPrm, Controller, LocalTrustCollector, MemoryFinalTarget,
    MemoryIntermediateTarget, NetmapInitialTrust, WorkerPool,
};

/// Lattice daemon: computes EigenTrust global reputation once per epoch.
#[derive(Parser, Debug)]
#[command(name = "lattice-daemon", version = "0.1.0", about = "Lattice reputation daemon")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "lattice.toml")]
    config: String,

    /// Stop after this many epochs instead of running until ctrl-c.
    #[arg(long)]
    epochs: Option<u64>,

    /// Override the epoch interval from the config file, in seconds.
    #[arg(long)]
    epoch_interval_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Tracing needs the configured level, so report load errors after init.
    let loaded = DaemonConfig::load(&args.config);
    let log_level = loaded
        .as_ref()
        .map(|c| c.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    let mut daemon_config = match loaded {
        Ok(cfg) => {
            tracing::info!("Loaded configuration from {}", args.config);
            cfg
        }
        Err(e) => {
            tracing::warn!(
                "Could not load config from {}: {}. Using defaults.",
                args.config,
                e
            );
            DaemonConfig::default()
        }
    };

    if let Some(secs) = args.epoch_interval_secs {
        daemon_config.epoch_interval_secs = secs;
    }
    daemon_config.validate()?;

    let et = &daemon_config.eigentrust;
    tracing::info!("Lattice Daemon v0.1.0");
    tracing::info!("Epoch interval: {}s", daemon_config.epoch_interval_secs);
    tracing::info!(
        "EigenTrust: alpha={} iterations={} workers={}",
        et.alpha,
        et.iterations,
        et.worker_pool_size
    );

    let netmap = daemon_config.netmap()?;
    if netmap.is_empty() {
        tracing::warn!("Network map is empty; every epoch will fail until nodes are configured");
    } else {
        tracing::info!("Network map: {} nodes", netmap.len());
    }
    let seeds = daemon_config.seeds()?;

    let collector = Arc::new(LocalTrustCollector::new());
    let final_target = MemoryFinalTarget::new();
    let calculator = Calculator::new(CalculatorPrm {
        alpha: et.alpha,
        initial_trust_source: Some(Arc::new(NetmapInitialTrust::new(
            Arc::new(StaticNetmap::new(netmap)),
            et.netmap_diff,
        ))),
        daughter_trust_source: Some(collector.clone()),
        intermediate_value_target: Some(Arc::new(MemoryIntermediateTarget::new())),
        final_result_target: Some(Arc::new(final_target.clone())),
        worker_pool: Some(Arc::new(WorkerPool::new(et.worker_pool_size)?)),
    })?;
    let controller = Arc::new(Controller::new(
        Arc::new(calculator),
        et.termination_policy()?,
    ));

    let mut scheduler = EpochScheduler::new(
        Duration::from_secs(daemon_config.epoch_interval_secs),
        controller,
        collector,
        final_target,
        seeds,
    );
    scheduler.run(args.epochs).await?;

    tracing::info!("Lattice daemon shut down after {} epochs", scheduler.current_epoch());
    Ok(())
}
