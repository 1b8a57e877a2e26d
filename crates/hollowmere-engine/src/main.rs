//! # Hollowmere
//!
//! Headless entry point: `hollowmere [config.toml]`.
//!
//! Runs the demo dungeon for the configured number of seconds and writes an
//! autosave. `RUST_LOG` overrides the configured log filter.

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hollowmere_engine::app;
use hollowmere_engine::config::{SimConfig, CONFIG_FILE};

/// Main entry point.
fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);

    let mut config = SimConfig::load_from(&config_path);
    config.validate();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))?;
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    info!("Hollowmere starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let summary = app::run(&config)?;

    info!(
        "Hollowmere shutdown complete ({:.1}s simulated)",
        summary.seconds
    );
    Ok(())
}
