//! The simulation dispatcher.
//!
//! [`Simulation`] owns the clock, the shared world state, and the ordered
//! listener roster. Each clock pulse is forwarded to every listener
//! synchronously, in registration order; a listener error is logged and
//! that listener skipped for the current pulse only.
//!
//! The dispatcher also owns the save/load lifecycle. Saving halts the
//! clock first (no pulse in flight while the world serializes) and
//! restarts it afterwards. Loading reconstructs the subsystem snapshots
//! in stream order, then runs the rebind pass: the standard listener
//! roster is re-attached and validated against the roster that existed
//! pre-save -- a mismatch is a fatal initialization error.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use outpost_agents::TaskFactory;
use outpost_persist::{ClockSnapshot, PersistError, SaveData};

use crate::bootstrap::build_shared_state;
use crate::clock::{ClockError, Pulse, PulseClock};
use crate::config::SimulationConfig;
use crate::listener::PulseListener;
use crate::shared::SharedState;
use crate::systems::{EnvironmentSystem, MissionSystem, PopulationSystem};

/// Errors that can occur while assembling or driving the simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// A clock operation failed.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// A persistence operation failed.
    #[error("persistence error: {source}")]
    Persist {
        /// The underlying persistence error.
        #[from]
        source: PersistError,
    },

    /// The rebind pass found a listener roster that differs from the one
    /// that existed pre-save. Resuming pulses would drive a different
    /// world than the one that was saved.
    #[error("listener roster mismatch: saved {saved:?}, rebuilt {rebuilt:?}")]
    ListenerRosterMismatch {
        /// The roster recorded in the save stream.
        saved: Vec<String>,
        /// The roster this build re-attached.
        rebuilt: Vec<String>,
    },
}

/// Which save slot a save targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveKind {
    /// The primary slot: the given path as-is.
    Default,
    /// A backup slot: the given path with `.bak` appended.
    Backup,
}

impl SaveKind {
    /// Resolve the target path for this kind.
    fn resolve(self, path: &Path) -> PathBuf {
        match self {
            Self::Default => path.to_path_buf(),
            Self::Backup => {
                let mut target = path.as_os_str().to_owned();
                target.push(".bak");
                PathBuf::from(target)
            }
        }
    }
}

/// The top-level simulation object.
pub struct Simulation {
    /// The pulse clock.
    clock: PulseClock,
    /// All subsystem state.
    shared: SharedState,
    /// Registered listeners, in dispatch order.
    listeners: Vec<Box<dyn PulseListener>>,
}

impl core::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Simulation")
            .field("clock", &self.clock)
            .field("listeners", &self.roster_names())
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Create a fresh simulation from configuration.
    pub fn create_new(
        config: &SimulationConfig,
        factory: Box<dyn TaskFactory>,
    ) -> Result<Self, SimulationError> {
        let clock = PulseClock::new(config.world.base_step(), config.world.time_ratio())?;
        let shared = build_shared_state(config);
        Ok(Self {
            clock,
            shared,
            listeners: standard_listeners(factory),
        })
    }

    /// Load a simulation from a save stream and run the rebind pass.
    pub fn load(path: &Path, factory: Box<dyn TaskFactory>) -> Result<Self, SimulationError> {
        let data = outpost_persist::load_from_path(path)?;
        let clock = PulseClock::from_parts(
            data.clock.now,
            data.clock.base_step,
            data.clock.time_ratio,
            data.clock.pulse_count,
        )?;
        let shared = SharedState {
            settlement: data.settlement,
            malfunctions: data.malfunctions,
            environment: data.environment,
            crew: data.crew,
            missions: data.missions,
            events: data.events,
        };
        let sim = Self {
            clock,
            shared,
            listeners: standard_listeners(factory),
        };
        sim.validate_roster(&data.listener_roster)?;
        info!(
            pulse = sim.clock.pulse_count(),
            now = %sim.clock.now(),
            "simulation rebound after load"
        );
        Ok(sim)
    }

    /// The clock.
    pub const fn clock(&self) -> &PulseClock {
        &self.clock
    }

    /// Mutable clock access (operator surface: ratio changes).
    pub const fn clock_mut(&mut self) -> &mut PulseClock {
        &mut self.clock
    }

    /// The shared world state.
    pub const fn shared(&self) -> &SharedState {
        &self.shared
    }

    /// Mutable shared state (mission launches, tests).
    pub const fn shared_mut(&mut self) -> &mut SharedState {
        &mut self.shared
    }

    /// The registered listener names, in dispatch order.
    pub fn roster_names(&self) -> Vec<String> {
        self.listeners
            .iter()
            .map(|listener| listener.name().to_owned())
            .collect()
    }

    /// Advance the clock one tick and fan the pulse out to every
    /// listener in registration order.
    ///
    /// Returns `Ok(None)` while the clock is paused. A listener that
    /// fails is logged and skipped for this pulse only.
    pub fn dispatch_pulse(&mut self) -> Result<Option<Pulse>, SimulationError> {
        let Some(pulse) = self.clock.tick()? else {
            return Ok(None);
        };
        for listener in &mut self.listeners {
            if let Err(err) = listener.on_pulse(&mut self.shared, &pulse) {
                warn!(
                    listener = listener.name(),
                    %err,
                    pulse = pulse.number,
                    "listener failed; skipped for this pulse"
                );
            }
        }
        Ok(Some(pulse))
    }

    /// Pause the clock and notify every listener.
    pub fn pause(&mut self) {
        self.clock.pause();
        for listener in &mut self.listeners {
            listener.on_pause(true);
        }
    }

    /// Resume the clock and notify every listener.
    pub fn resume(&mut self) {
        self.clock.resume();
        for listener in &mut self.listeners {
            listener.on_pause(false);
        }
    }

    /// Serialize the world to a save stream.
    ///
    /// The clock is halted for the duration of the write -- a save never
    /// races a pulse -- and restarted afterwards regardless of outcome.
    pub fn save(&mut self, kind: SaveKind, path: &Path) -> Result<PathBuf, SimulationError> {
        self.clock.halt();
        let target = kind.resolve(path);
        let data = SaveData {
            listener_roster: self.roster_names(),
            malfunctions: self.shared.malfunctions.clone(),
            environment: self.shared.environment.clone(),
            missions: self.shared.missions.clone(),
            events: self.shared.events.clone(),
            crew: self.shared.crew.clone(),
            settlement: self.shared.settlement.clone(),
            clock: ClockSnapshot {
                now: self.clock.now(),
                base_step: self.clock.base_step(),
                time_ratio: self.clock.time_ratio(),
                pulse_count: self.clock.pulse_count(),
            },
        };
        let result = outpost_persist::save_to_path(&target, &data);
        self.clock.proceed();
        result?;
        Ok(target)
    }

    /// Validate the rebuilt roster against the persisted one.
    fn validate_roster(&self, saved: &[String]) -> Result<(), SimulationError> {
        let rebuilt = self.roster_names();
        if rebuilt != saved {
            return Err(SimulationError::ListenerRosterMismatch {
                saved: saved.to_vec(),
                rebuilt,
            });
        }
        Ok(())
    }
}

/// The standard listener roster, in dispatch order: environment first,
/// then the population, then mission coordination.
fn standard_listeners(factory: Box<dyn TaskFactory>) -> Vec<Box<dyn PulseListener>> {
    vec![
        Box::new(EnvironmentSystem),
        Box::new(PopulationSystem::new(factory)),
        Box::new(MissionSystem),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::listener::ListenerError;
    use outpost_agents::{RosterTaskFactory, StubTaskFactory};
    use outpost_missions::{Mission, MissionKind};
    use outpost_types::{EventId, SimTime};

    fn test_config() -> SimulationConfig {
        SimulationConfig::default()
    }

    fn scratch_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("outpost-{tag}-{}.sav", EventId::new()))
    }

    #[test]
    fn pulses_reach_every_listener_in_order() {
        /// Listener that records the pulses it saw.
        struct Recorder {
            name: &'static str,
            seen: std::sync::Arc<std::sync::Mutex<Vec<(&'static str, u64)>>>,
        }
        impl PulseListener for Recorder {
            fn name(&self) -> &'static str {
                self.name
            }
            fn on_pulse(
                &mut self,
                _shared: &mut SharedState,
                pulse: &Pulse,
            ) -> Result<(), ListenerError> {
                if let Ok(mut seen) = self.seen.lock() {
                    seen.push((self.name, pulse.number));
                }
                Ok(())
            }
        }

        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut sim =
            Simulation::create_new(&test_config(), Box::new(StubTaskFactory::new())).unwrap();
        sim.listeners = vec![
            Box::new(Recorder {
                name: "first",
                seen: std::sync::Arc::clone(&seen),
            }),
            Box::new(Recorder {
                name: "second",
                seen: std::sync::Arc::clone(&seen),
            }),
        ];

        let pulse = sim.dispatch_pulse().unwrap().unwrap();
        assert_eq!(pulse.number, 1);
        let order = seen.lock().unwrap().clone();
        assert_eq!(order, vec![("first", 1), ("second", 1)]);
    }

    #[test]
    fn failing_listener_is_skipped_without_halting_the_clock() {
        /// Listener that always fails.
        struct Faulty;
        impl PulseListener for Faulty {
            fn name(&self) -> &'static str {
                "faulty"
            }
            fn on_pulse(
                &mut self,
                _shared: &mut SharedState,
                _pulse: &Pulse,
            ) -> Result<(), ListenerError> {
                Err(ListenerError::Failed {
                    listener: "faulty",
                    message: String::from("synthetic fault"),
                })
            }
        }

        let mut sim =
            Simulation::create_new(&test_config(), Box::new(StubTaskFactory::new())).unwrap();
        sim.listeners.insert(0, Box::new(Faulty));

        // Two pulses despite the fault; time keeps flowing.
        let first = sim.dispatch_pulse().unwrap().unwrap();
        let second = sim.dispatch_pulse().unwrap().unwrap();
        assert_eq!(first.number, 1);
        assert_eq!(second.number, 2);
    }

    #[test]
    fn paused_simulation_dispatches_nothing() {
        let mut sim =
            Simulation::create_new(&test_config(), Box::new(StubTaskFactory::new())).unwrap();
        sim.pause();
        assert!(sim.dispatch_pulse().unwrap().is_none());
        sim.resume();
        assert!(sim.dispatch_pulse().unwrap().is_some());
    }

    #[test]
    fn save_load_roundtrip_resumes_from_the_same_state() {
        let path = scratch_path("roundtrip");
        let mut sim =
            Simulation::create_new(&test_config(), Box::new(RosterTaskFactory::default()))
                .unwrap();
        let _ = sim.shared_mut().missions.launch(Mission::new(
            "site survey",
            MissionKind::SurfaceSurvey,
            2,
            3,
            SimTime::ZERO,
        ));
        for _ in 0..25 {
            let _ = sim.dispatch_pulse().unwrap();
        }
        let saved_now = sim.clock().now();
        let saved_pulses = sim.clock().pulse_count();
        let saved_crew = sim.shared().crew.len();

        let target = sim.save(SaveKind::Default, &path).unwrap();
        assert_eq!(target, path);
        // The clock restarted after the save.
        assert!(!sim.clock().is_halted());

        let loaded =
            Simulation::load(&path, Box::new(RosterTaskFactory::default())).unwrap();
        assert_eq!(loaded.clock().now(), saved_now);
        assert_eq!(loaded.clock().pulse_count(), saved_pulses);
        assert_eq!(loaded.shared().crew.len(), saved_crew);
        assert_eq!(loaded.shared().missions.len(), 1);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn loaded_simulation_keeps_pulsing() {
        let path = scratch_path("resume");
        let mut sim =
            Simulation::create_new(&test_config(), Box::new(RosterTaskFactory::default()))
                .unwrap();
        for _ in 0..5 {
            let _ = sim.dispatch_pulse().unwrap();
        }
        let _ = sim.save(SaveKind::Default, &path).unwrap();

        let mut loaded =
            Simulation::load(&path, Box::new(RosterTaskFactory::default())).unwrap();
        let pulse = loaded.dispatch_pulse().unwrap().unwrap();
        assert_eq!(pulse.number, 6);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn backup_kind_appends_suffix() {
        let path = scratch_path("backup");
        let mut sim =
            Simulation::create_new(&test_config(), Box::new(StubTaskFactory::new())).unwrap();
        let target = sim.save(SaveKind::Backup, &path).unwrap();
        assert!(target.to_string_lossy().ends_with(".sav.bak"));
        let _ = std::fs::remove_file(&target);
    }

    #[test]
    fn roster_mismatch_is_fatal_on_load() {
        let path = scratch_path("roster");
        let mut sim =
            Simulation::create_new(&test_config(), Box::new(StubTaskFactory::new())).unwrap();
        // Drop a listener before saving, so the persisted roster is
        // shorter than the standard one rebuilt on load.
        let _ = sim.listeners.pop();
        let _ = sim.save(SaveKind::Default, &path).unwrap();

        let err = Simulation::load(&path, Box::new(StubTaskFactory::new())).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::ListenerRosterMismatch { .. }
        ));

        let _ = std::fs::remove_file(&path);
    }
}
