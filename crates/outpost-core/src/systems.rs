//! The standard pulse listeners: environment, population, missions.
//!
//! Dispatch order is fixed at registration: the environment wakes first
//! (sky, facility wear), then the population spends its pulse time, then
//! mission coordination reacts. Each system writes notable transitions to
//! the shared event log as it goes.

use tracing::info;

use outpost_agents::task_manager::TaskOutcome;
use outpost_agents::{advance_crew, TaskFactory};
use outpost_missions::manager::MissionContext;
use outpost_missions::advance_missions;
use outpost_types::EventCategory;

use crate::clock::Pulse;
use crate::listener::{ListenerError, PulseListener};
use crate::shared::SharedState;

/// Environment system: sky conditions and facility wear.
#[derive(Debug, Default)]
pub struct EnvironmentSystem;

impl PulseListener for EnvironmentSystem {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn on_pulse(
        &mut self,
        shared: &mut SharedState,
        pulse: &Pulse,
    ) -> Result<(), ListenerError> {
        let before = shared.environment.current();
        let after = shared.environment.advance(pulse.number);
        if before != after {
            info!(?before, ?after, "sky conditions changed");
            shared.events.record(
                pulse.now,
                pulse.number,
                EventCategory::Environment,
                format!("sky changed to {after:?}"),
            );
        }

        let filed = shared
            .malfunctions
            .accrue_wear(&mut shared.settlement, pulse.now, pulse.delta);
        for facility in filed {
            let name = shared
                .settlement
                .facility(facility)
                .map(|f| f.name().to_owned())
                .unwrap_or_else(|_| facility.to_string());
            shared.events.record(
                pulse.now,
                pulse.number,
                EventCategory::Facility,
                format!("malfunction filed on {name}"),
            );
        }
        Ok(())
    }
}

/// Population system: feeds pulse time through every task manager.
pub struct PopulationSystem {
    /// The pluggable task-selection policy.
    factory: Box<dyn TaskFactory>,
}

impl PopulationSystem {
    /// Create the population system with the given selection policy.
    pub fn new(factory: Box<dyn TaskFactory>) -> Self {
        Self { factory }
    }
}

impl core::fmt::Debug for PopulationSystem {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PopulationSystem").finish_non_exhaustive()
    }
}

impl PulseListener for PopulationSystem {
    fn name(&self) -> &'static str {
        "population"
    }

    fn on_pulse(
        &mut self,
        shared: &mut SharedState,
        pulse: &Pulse,
    ) -> Result<(), ListenerError> {
        let SharedState {
            settlement,
            malfunctions,
            crew,
            events,
            ..
        } = shared;

        let report = advance_crew(
            crew,
            settlement,
            malfunctions,
            self.factory.as_mut(),
            pulse.now,
            pulse.delta,
        );

        for (agent, outcome) in &report.outcomes {
            if let TaskOutcome::Failed { name, reason } = outcome {
                let who = crew
                    .member(*agent)
                    .map(|m| m.profile.name.clone())
                    .unwrap_or_else(|_| agent.to_string());
                events.record(
                    pulse.now,
                    pulse.number,
                    EventCategory::Task,
                    format!("{who}: {name} ended ({reason})"),
                );
            }
        }
        Ok(())
    }
}

/// Mission system: phase stepping, recruitment, and teardown.
#[derive(Debug, Default)]
pub struct MissionSystem;

impl PulseListener for MissionSystem {
    fn name(&self) -> &'static str {
        "missions"
    }

    fn on_pulse(
        &mut self,
        shared: &mut SharedState,
        pulse: &Pulse,
    ) -> Result<(), ListenerError> {
        let seed = shared.world_seed();
        let surface_hazard = shared.environment.current().is_hazardous();
        let SharedState {
            settlement,
            malfunctions,
            crew,
            missions,
            events,
            ..
        } = shared;

        let mut ctx = MissionContext {
            crew,
            settlement,
            malfunctions,
            surface_hazard,
            seed,
            pulse: pulse.number,
            now: pulse.now,
        };
        let report = advance_missions(missions, &mut ctx, pulse.delta);

        for (mission, phase) in &report.phase_changes {
            events.record(
                pulse.now,
                pulse.number,
                EventCategory::Mission,
                format!("mission {mission} entered {phase:?}"),
            );
        }
        for (mission, reason) in &report.ended {
            let why = reason.as_deref().unwrap_or("completed");
            events.record(
                pulse.now,
                pulse.number,
                EventCategory::Mission,
                format!("mission {mission} ended: {why}"),
            );
        }
        Ok(())
    }
}
