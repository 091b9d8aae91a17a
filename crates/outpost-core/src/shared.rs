//! The shared world state every pulse listener operates on.
//!
//! Bundling the subsystem state in one struct (instead of process-wide
//! singletons) makes the post-load rebind a single wiring pass and keeps
//! borrow scopes explicit: listeners receive `&mut SharedState` for the
//! duration of one pulse and nothing else.

use outpost_agents::Crew;
use outpost_missions::MissionRoster;
use outpost_types::EventLog;
use outpost_world::{EnvironmentModel, MalfunctionRegistry, Settlement};

/// All persistent simulation state outside the clock.
#[derive(Debug)]
pub struct SharedState {
    /// Facilities and vehicles.
    pub settlement: Settlement,
    /// Active malfunctions and wear dynamics.
    pub malfunctions: MalfunctionRegistry,
    /// Exterior sky model.
    pub environment: EnvironmentModel,
    /// The crew roster with task managers.
    pub crew: Crew,
    /// All missions.
    pub missions: MissionRoster,
    /// The historical event log.
    pub events: EventLog,
}

impl SharedState {
    /// The world seed stochastic subsystems derive their rolls from.
    pub const fn world_seed(&self) -> u64 {
        self.environment.seed()
    }
}
