//! Runner configuration.
//!
//! Seed, tick rate, pathfinding budget and the rest of the knobs a headless
//! session needs. Loaded from and saved to a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use hollowmere_gameplay::WorldTuning;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "hollowmere.toml";

/// Simulation runner parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // === Simulation ===
    /// Seed for the world RNG
    pub seed: u64,
    /// Fixed ticks per simulated second
    pub tick_rate: u32,
    /// Longest step the world simulates at once, in seconds
    pub max_delta: f32,
    /// Simulated seconds before the runner stops
    pub run_seconds: f32,
    /// Pace ticks against the wall clock instead of running flat out
    pub realtime: bool,

    // === AI ===
    /// Path searches allowed per tick
    pub pathfind_budget: u32,
    /// Flank distance around the player for alerted groups
    pub flank_spread: f32,

    // === Persistence ===
    /// Directory holding save slots
    pub save_dir: PathBuf,
    /// Write a save when the run ends
    pub autosave: bool,
    /// Slot used by the end-of-run save
    pub autosave_slot: u32,
    /// Continue from the autosave slot when it holds a save
    pub resume: bool,

    // === Logging ===
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            tick_rate: 60,
            max_delta: 0.05,
            run_seconds: 90.0,
            realtime: false,

            pathfind_budget: 4,
            flank_spread: 24.0,

            save_dir: PathBuf::from("saves"),
            autosave: true,
            autosave_slot: 1,
            resume: false,

            log_filter: "hollowmere=info".to_string(),
        }
    }
}

impl SimConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }

        match fs::File::open(path) {
            Ok(mut file) => {
                let mut contents = String::new();
                if let Err(e) = file.read_to_string(&mut contents) {
                    warn!("Failed to read config file: {e}");
                    return Self::default();
                }

                match toml::from_str(&contents) {
                    Ok(config) => {
                        info!("Loaded config from {}", path.display());
                        config
                    },
                    Err(e) => {
                        warn!("Failed to parse config file: {e}");
                        Self::default()
                    },
                }
            },
            Err(e) => {
                warn!("Failed to open config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.tick_rate = self.tick_rate.clamp(10, 240);
        self.max_delta = self.max_delta.clamp(0.001, 0.25);
        if !self.run_seconds.is_finite() {
            self.run_seconds = Self::default().run_seconds;
        }
        self.run_seconds = self.run_seconds.clamp(0.0, 3600.0);

        self.pathfind_budget = self.pathfind_budget.min(64);
        self.flank_spread = self.flank_spread.clamp(0.0, 128.0);

        if self.log_filter.trim().is_empty() {
            self.log_filter = Self::default().log_filter;
        }
    }

    /// Length of one fixed tick in seconds.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    /// Number of ticks in a full run.
    #[must_use]
    pub fn total_ticks(&self) -> u64 {
        (f64::from(self.run_seconds) * f64::from(self.tick_rate)).round() as u64
    }

    /// World tuning derived from this configuration.
    #[must_use]
    pub fn tuning(&self) -> WorldTuning {
        WorldTuning {
            max_delta: self.max_delta,
            pathfind_budget: self.pathfind_budget,
            flank_spread: self.flank_spread,
            ..WorldTuning::default()
        }
    }
}
