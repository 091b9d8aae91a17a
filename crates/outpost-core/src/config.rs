//! Configuration loading and typed config structures.
//!
//! The canonical configuration lives in `outpost-config.yaml` at the
//! project root. This module defines strongly-typed structs mirroring the
//! YAML structure and a loader that reads and validates the file. Every
//! field has a default, so a missing file or a sparse one still yields a
//! runnable simulation.

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use outpost_types::SimTime;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// World-level settings (name, seed, clock parameters).
    #[serde(default)]
    pub world: WorldConfig,

    /// Crew composition.
    #[serde(default)]
    pub population: PopulationConfig,

    /// Settlement facility counts and gate timings.
    #[serde(default)]
    pub facilities: FacilityConfig,

    /// Mission parameters.
    #[serde(default)]
    pub missions: MissionConfig,

    /// Simulation boundary parameters.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Save file configuration.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yml::from_str(&contents)?)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable simulation name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Random seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Unscaled millisols per clock tick.
    #[serde(default = "default_base_step_millisols")]
    pub base_step_millisols: u64,

    /// Time ratio as a percentage (100 = 1.0 simulated per wall unit).
    #[serde(default = "default_time_ratio_percent")]
    pub time_ratio_percent: u32,

    /// Wall-clock milliseconds between pulses.
    #[serde(default = "default_pulse_interval_ms")]
    pub pulse_interval_ms: u64,
}

impl WorldConfig {
    /// The configured base step as a [`SimTime`].
    pub fn base_step(&self) -> SimTime {
        SimTime::from_whole(self.base_step_millisols)
    }

    /// The configured time ratio as a [`Decimal`] multiplier.
    pub fn time_ratio(&self) -> Decimal {
        Decimal::from(self.time_ratio_percent)
            .checked_div(Decimal::new(100, 0))
            .unwrap_or(Decimal::ONE)
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
            base_step_millisols: default_base_step_millisols(),
            time_ratio_percent: default_time_ratio_percent(),
            pulse_interval_ms: default_pulse_interval_ms(),
        }
    }
}

/// Crew composition.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PopulationConfig {
    /// Number of people to enroll at simulation start.
    #[serde(default = "default_people")]
    pub people: u32,

    /// Number of robots to enroll at simulation start.
    #[serde(default = "default_robots")]
    pub robots: u32,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            people: default_people(),
            robots: default_robots(),
        }
    }
}

/// Settlement facility counts and gate timings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FacilityConfig {
    /// Number of airlocks.
    #[serde(default = "default_airlocks")]
    pub airlocks: u32,

    /// Number of workshop stations.
    #[serde(default = "default_workshops")]
    pub workshops: u32,

    /// Number of vehicles (each gets a bay).
    #[serde(default = "default_vehicles")]
    pub vehicles: u32,

    /// Airlock pressure-cycle time in millisols.
    #[serde(default = "default_airlock_cycle_millisols")]
    pub airlock_cycle_millisols: u64,

    /// Workshop station setup time in millisols.
    #[serde(default = "default_workshop_setup_millisols")]
    pub workshop_setup_millisols: u64,

    /// Vehicle pre-drive inspection time in millisols.
    #[serde(default = "default_inspection_millisols")]
    pub inspection_millisols: u64,
}

impl Default for FacilityConfig {
    fn default() -> Self {
        Self {
            airlocks: default_airlocks(),
            workshops: default_workshops(),
            vehicles: default_vehicles(),
            airlock_cycle_millisols: default_airlock_cycle_millisols(),
            workshop_setup_millisols: default_workshop_setup_millisols(),
            inspection_millisols: default_inspection_millisols(),
        }
    }
}

/// Mission parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MissionConfig {
    /// Membership floor for launched missions.
    #[serde(default = "default_min_members")]
    pub min_members: usize,

    /// Membership capacity for launched missions.
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Whether to launch a surface survey at simulation start.
    #[serde(default = "default_true")]
    pub survey_on_start: bool,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            min_members: default_min_members(),
            capacity: default_capacity(),
            survey_on_start: true,
        }
    }
}

/// Simulation boundary parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationBoundsConfig {
    /// Maximum number of pulses (0 = unlimited).
    #[serde(default)]
    pub max_pulses: u64,

    /// Maximum wall-clock seconds (0 = unlimited).
    #[serde(default)]
    pub max_real_time_seconds: u64,
}

impl Default for SimulationBoundsConfig {
    fn default() -> Self {
        Self {
            max_pulses: 0,
            max_real_time_seconds: 0,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Save file configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PersistenceConfig {
    /// Path the engine saves to on shutdown.
    #[serde(default = "default_autosave_path")]
    pub autosave_path: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            autosave_path: default_autosave_path(),
        }
    }
}

fn default_world_name() -> String {
    String::from("Outpost One")
}

const fn default_seed() -> u64 {
    20_260_805
}

const fn default_base_step_millisols() -> u64 {
    3
}

const fn default_time_ratio_percent() -> u32 {
    100
}

const fn default_pulse_interval_ms() -> u64 {
    250
}

const fn default_people() -> u32 {
    6
}

const fn default_robots() -> u32 {
    2
}

const fn default_airlocks() -> u32 {
    2
}

const fn default_workshops() -> u32 {
    1
}

const fn default_vehicles() -> u32 {
    1
}

const fn default_airlock_cycle_millisols() -> u64 {
    50
}

const fn default_workshop_setup_millisols() -> u64 {
    10
}

const fn default_inspection_millisols() -> u64 {
    20
}

const fn default_min_members() -> usize {
    2
}

const fn default_capacity() -> usize {
    3
}

const fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    String::from("info")
}

fn default_autosave_path() -> String {
    String::from("outpost.sav")
}
