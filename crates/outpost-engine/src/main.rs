//! Simulation engine binary for the Outpost colony simulation.
//!
//! Wires together the pulse clock, seed world, standard listener roster,
//! and operator controls, then runs the pulse loop until a termination
//! condition is met and saves the world on the way out.
//!
//! # Startup Sequence
//!
//! 1. Parse command-line options (`--config`, `--load`, `--pulses`)
//! 2. Load configuration from `outpost-config.yaml`
//! 3. Initialize structured logging (tracing)
//! 4. Create a new simulation, or load and rebind a saved one
//! 5. Launch the starting survey mission (fresh worlds only)
//! 6. Create operator state and hook Ctrl-C to a clean stop
//! 7. Run the pulse loop
//! 8. Save to the autosave path and log the result

mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use outpost_agents::RosterTaskFactory;
use outpost_core::config::SimulationConfig;
use outpost_core::dispatcher::{SaveKind, Simulation};
use outpost_core::operator::OperatorState;
use outpost_core::runner::{self, NoOpCallback};
use outpost_missions::{Mission, MissionKind};

use crate::error::EngineError;

/// Parsed command-line options.
#[derive(Debug, Default)]
struct Options {
    /// Path to the configuration file, if not the default.
    config: Option<PathBuf>,
    /// Save stream to resume from instead of creating a new world.
    load: Option<PathBuf>,
    /// Override for the configured pulse limit.
    pulses: Option<u64>,
}

/// Application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = parse_args()?;

    // Configuration first: the logging filter falls back to its level.
    let config_path = options
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("outpost-config.yaml"));
    let mut config = load_config(&config_path)?;
    if let Some(pulses) = options.pulses {
        config.simulation.max_pulses = pulses;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .with_target(true)
        .init();

    info!("outpost-engine starting");
    info!(
        world = config.world.name,
        seed = config.world.seed,
        base_step_millisols = config.world.base_step_millisols,
        time_ratio_percent = config.world.time_ratio_percent,
        "configuration loaded"
    );

    // Create or load the simulation.
    let mut sim = match &options.load {
        Some(path) => {
            info!(path = %path.display(), "loading saved simulation");
            Simulation::load(path, Box::new(RosterTaskFactory::default()))?
        }
        None => {
            let mut sim = Simulation::create_new(
                &config,
                Box::new(RosterTaskFactory::default()),
            )?;
            if config.missions.survey_on_start {
                let now = sim.clock().now();
                let id = sim.shared_mut().missions.launch(Mission::new(
                    "initial site survey",
                    MissionKind::SurfaceSurvey,
                    config.missions.min_members,
                    config.missions.capacity,
                    now,
                ));
                info!(mission = %id, "starting survey launched");
            }
            sim
        }
    };

    // Operator controls; Ctrl-C requests a clean stop between pulses.
    let operator = Arc::new(OperatorState::new(
        config.world.pulse_interval_ms,
        &config.simulation,
    ));
    {
        let operator = Arc::clone(&operator);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, stopping after the current pulse");
                operator.request_stop();
            }
        });
    }

    // Run.
    let mut callback = NoOpCallback;
    let summary = runner::run_simulation(&mut sim, &operator, &mut callback).await?;
    runner::log_run_end(&summary);

    // Save on the way out.
    let autosave = PathBuf::from(&config.persistence.autosave_path);
    let target = sim.save(SaveKind::Default, &autosave)?;
    info!(path = %target.display(), "world saved");

    info!(
        end_reason = ?summary.end_reason,
        total_pulses = summary.total_pulses,
        "outpost-engine shutdown complete"
    );
    Ok(())
}

/// Load configuration, falling back to defaults when the file is absent.
fn load_config(path: &Path) -> Result<SimulationConfig, EngineError> {
    if path.exists() {
        Ok(SimulationConfig::from_file(path)?)
    } else {
        Ok(SimulationConfig::default())
    }
}

/// Parse command-line options.
///
/// Supported: `--config <path>`, `--load <path>`, `--pulses <n>`.
fn parse_args() -> Result<Options, EngineError> {
    let mut options = Options::default();
    let mut args = std::env::args().skip(1);
    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--config" => {
                let value = args.next().ok_or_else(|| EngineError::Args {
                    message: String::from("--config requires a path"),
                })?;
                options.config = Some(PathBuf::from(value));
            }
            "--load" => {
                let value = args.next().ok_or_else(|| EngineError::Args {
                    message: String::from("--load requires a path"),
                })?;
                options.load = Some(PathBuf::from(value));
            }
            "--pulses" => {
                let value = args.next().ok_or_else(|| EngineError::Args {
                    message: String::from("--pulses requires a count"),
                })?;
                let count = value.parse::<u64>().map_err(|_| EngineError::Args {
                    message: format!("--pulses expects an integer, got '{value}'"),
                })?;
                options.pulses = Some(count);
            }
            other => {
                return Err(EngineError::Args {
                    message: format!("unknown flag '{other}'"),
                });
            }
        }
    }
    Ok(options)
}
