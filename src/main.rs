//! In-memory cache server core.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                      CACHE CORE                       │
//!                     │                                                       │
//!   Start ───────────▶│  ┌─────────┐    ┌───────────┐    ┌────────────────┐  │
//!                     │  │ control │───▶│ activator │───▶│    bring-up    │  │
//!   Report ◀──────────┼──│ channel │◀───│  worker   │    │ state machine  │  │
//!                     │  └─────────┘    └───────────┘    └───────┬────────┘  │
//!                     │                                           │           │
//!                     │          settings → pools → stats → allocator → hash  │
//!                     │          → workers → maintainers → clock → dispatcher │
//!                     │          → oom                                        │
//!                     │                                                       │
//!   SIGTERM ─────────▶│  shutdown orchestrator (keyed on module status)      │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process;

use clap::Parser;

use memcore::config::{load_config, validation::validate_config, CoreConfig};
use memcore::lifecycle::signals;
use memcore::observability::{logging, metrics};
use memcore::CacheCore;

#[derive(Parser, Debug)]
#[command(name = "memcore")]
#[command(about = "Bring-up orchestrator of an in-memory cache server core", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds to wait for the bring-up report.
    #[arg(long)]
    timeout: Option<u64>,

    /// Percent of total memory the slab allocator may use.
    #[arg(long)]
    slab_percent: Option<u64>,
}

fn resolve_config(cli: &Cli) -> Result<CoreConfig, String> {
    let mut config = match &cli.config {
        Some(path) => load_config(path).map_err(|e| format!("{}: {}", path.display(), e))?,
        None => CoreConfig::default(),
    };

    if let Some(timeout) = cli.timeout {
        config.control.timeout_secs = timeout;
    }
    if let Some(percent) = cli.slab_percent {
        config.memory.slab_percent = percent;
    }

    validate_config(&config).map_err(|errors| {
        errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    })?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!("memcore v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        timeout_secs = config.control.timeout_secs,
        slab_percent = config.memory.slab_percent,
        hashpower_init = config.cache.hashpower_init,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let (core, mut peer) = CacheCore::builder(config).load()?;

    match peer.request_start().await {
        Ok(true) => tracing::info!("Cache core started"),
        Ok(false) => tracing::error!("Cache core failed to start"),
        Err(e) => tracing::error!(error = %e, "No bring-up outcome received"),
    }

    signals::wait_for_termination().await;

    let path = tokio::task::spawn_blocking(move || core.unload()).await?;
    tracing::info!(?path, "Shutdown complete");
    Ok(())
}
