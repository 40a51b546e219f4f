//! HTTP front end for the hostgraph time-series store.
//!
//! Collectors post field values to `/api/update/{host}/{graph}/`; dashboards
//! poll `/api/data/{host}/{graph}/{since}/data.json`. A background sweeper
//! expires samples per graph TTL.

mod api;
mod error;

use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use hostgraph::{Store, StoreConfig, Sweeper};
use tracing_subscriber::EnvFilter;

use crate::error::ServerError;

/// hostgraph-server: In-memory time-series store over HTTP.
#[derive(Parser)]
#[command(name = "hostgraph-server", version, about)]
struct Cli {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8000")]
    listen: String,

    /// JSON file with a store config (`default_ttl_secs`, `sweep_interval`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// TTL in seconds for newly created graphs (overrides the config file).
    #[arg(long)]
    default_ttl: Option<i64>,

    /// Milliseconds between expiry sweeps (overrides the config file).
    #[arg(long)]
    sweep_interval_ms: Option<u64>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        tracing::error!("server failed: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), ServerError> {
    let config = load_config(&cli)?;
    let store = Arc::new(Store::new(config)?);

    let listener = TcpListener::bind(&cli.listen).map_err(|source| ServerError::Bind {
        addr: cli.listen.clone(),
        source,
    })?;

    let sweeper = Sweeper::spawn(Arc::clone(&store))?;

    tracing::info!(
        addr = %cli.listen,
        default_ttl_secs = store.config().default_ttl_secs,
        "listening"
    );
    api::serve(&listener, &store);

    sweeper.shutdown();
    Ok(())
}

/// Builds the store config: defaults, then the config file, then flags.
fn load_config(cli: &Cli) -> Result<StoreConfig, ServerError> {
    let mut config = match &cli.config {
        Some(path) => read_config_file(path)?,
        None => StoreConfig::default(),
    };

    if let Some(ttl) = cli.default_ttl {
        config.default_ttl_secs = ttl;
    }
    if let Some(ms) = cli.sweep_interval_ms {
        config.sweep_interval = Duration::from_millis(ms);
    }

    Ok(config)
}

fn read_config_file(path: &Path) -> Result<StoreConfig, ServerError> {
    let data = std::fs::read_to_string(path).map_err(|source| ServerError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&data).map_err(|source| ServerError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}
