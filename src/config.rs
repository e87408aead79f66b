// ⚙️ Configuration - explicit run parameters
//
// Nothing in the core reads globals or the environment. A run is fully
// described by a SimulationConfig + PanelConfig; the pipeline bundles them
// with an output directory and can read the bundle from JSON.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{SimError, SimResult};
use crate::switching::DEFAULT_BASE_ANNUAL_RATE;
use crate::temporal::Horizon;

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_N_SITES: usize = 100;

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 1, 1).unwrap_or_default()
}

fn default_end_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default()
}

fn default_base_annual_rate() -> f64 {
    DEFAULT_BASE_ANNUAL_RATE
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_n_sites() -> usize {
    DEFAULT_N_SITES
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

// ============================================================================
// SIMULATION CONFIG
// ============================================================================

/// Parameters consumed by the switch simulation and KPI synthesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,

    /// Inclusive; only the month matters
    #[serde(default = "default_end_date")]
    pub end_date: NaiveDate,

    #[serde(default = "default_base_annual_rate")]
    pub base_annual_rate: f64,

    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            start_date: default_start_date(),
            end_date: default_end_date(),
            base_annual_rate: default_base_annual_rate(),
            seed: default_seed(),
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> SimResult<()> {
        if self.start_date > self.end_date {
            return Err(SimError::InvalidConfig(format!(
                "start_date {} is after end_date {}",
                self.start_date, self.end_date
            )));
        }
        if !(0.0..1.0).contains(&self.base_annual_rate) {
            return Err(SimError::InvalidConfig(format!(
                "base_annual_rate {} outside [0, 1)",
                self.base_annual_rate
            )));
        }
        Ok(())
    }

    /// Monthly grid covering start through end month
    pub fn horizon(&self) -> SimResult<Horizon> {
        self.validate()?;
        Horizon::from_dates(self.start_date, self.end_date)
    }
}

// ============================================================================
// PANEL CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelConfig {
    #[serde(default = "default_n_sites")]
    pub n_sites: usize,

    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for PanelConfig {
    fn default() -> Self {
        PanelConfig {
            n_sites: default_n_sites(),
            seed: default_seed(),
        }
    }
}

impl PanelConfig {
    pub fn validate(&self) -> SimResult<()> {
        if self.n_sites == 0 {
            return Err(SimError::InvalidConfig("n_sites must be positive".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// PIPELINE CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,

    #[serde(default)]
    pub panel: PanelConfig,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl PipelineConfig {
    /// Read a JSON config; missing fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: PipelineConfig = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// One seed drives both the panel and the simulation
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.simulation.seed = seed;
        self.panel.seed = seed;
        self
    }

    pub fn validate(&self) -> SimResult<()> {
        self.simulation.validate()?;
        self.panel.validate()
    }
}

// ============================================================================
// TESTS
// ============================================================================
