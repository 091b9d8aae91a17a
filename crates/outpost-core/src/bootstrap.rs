//! Seed settlement and crew construction from configuration.

use tracing::info;

use outpost_agents::Crew;
use outpost_missions::MissionRoster;
use outpost_types::{AgentKind, Colonist, EventLog, JobKind, SimTime};
use outpost_world::{EnvironmentModel, Facility, FacilityKind, MalfunctionRegistry, Settlement};

use crate::config::SimulationConfig;
use crate::shared::SharedState;

/// Name pool for seed people, cycled as needed.
const PERSON_NAMES: &[&str] = &[
    "Adler", "Boone", "Chen", "Devi", "Egan", "Farah", "Goto", "Hale", "Iqbal", "Joy",
];

/// Job rotation for seed people.
const JOB_ROTATION: &[JobKind] = &[
    JobKind::Engineer,
    JobKind::Technician,
    JobKind::Botanist,
    JobKind::Physician,
    JobKind::Pilot,
    JobKind::Geologist,
];

/// Build the initial shared state from configuration.
pub fn build_shared_state(config: &SimulationConfig) -> SharedState {
    let settlement = build_settlement(config);
    let crew = build_crew(config);
    info!(
        settlement = %settlement.name,
        facilities = settlement.facility_count(),
        crew = crew.len(),
        "seed world built"
    );
    SharedState {
        settlement,
        malfunctions: MalfunctionRegistry::default(),
        environment: EnvironmentModel::new(config.world.seed),
        crew,
        missions: MissionRoster::new(),
        events: EventLog::default(),
    }
}

/// Build the settlement's facilities and vehicles.
fn build_settlement(config: &SimulationConfig) -> Settlement {
    let mut settlement = Settlement::new(config.world.name.clone());
    let facilities = &config.facilities;

    for index in 0..facilities.airlocks {
        let _ = settlement.add_facility(Facility::new(
            format!("airlock {}", letter(index)),
            FacilityKind::Airlock,
            SimTime::from_whole(facilities.airlock_cycle_millisols),
        ));
    }
    for index in 0..facilities.workshops {
        let _ = settlement.add_facility(Facility::new(
            format!("workshop {}", letter(index)),
            FacilityKind::WorkshopStation,
            SimTime::from_whole(facilities.workshop_setup_millisols),
        ));
    }
    for index in 0..facilities.vehicles {
        let _ = settlement.add_vehicle(
            format!("rover {}", index.saturating_add(1)),
            SimTime::from_whole(facilities.inspection_millisols),
        );
    }
    settlement
}

/// Build the seed crew: people on the job rotation, then robots.
fn build_crew(config: &SimulationConfig) -> Crew {
    let mut crew = Crew::new();
    for index in 0..config.population.people {
        let position = usize::try_from(index).unwrap_or(0);
        let name = PERSON_NAMES
            .get(position % PERSON_NAMES.len().max(1))
            .copied()
            .unwrap_or("Colonist");
        let job = JOB_ROTATION
            .get(position % JOB_ROTATION.len().max(1))
            .copied()
            .unwrap_or(JobKind::Technician);
        let _ = crew.enroll(Colonist::new(name, AgentKind::Person, job));
    }
    for index in 0..config.population.robots {
        let _ = crew.enroll(Colonist::new(
            format!("R-{}", index.saturating_add(1)),
            AgentKind::Robot { battery_pct: 100 },
            JobKind::Technician,
        ));
    }
    crew
}

/// Letter suffix for facility names: A, B, C, ...
fn letter(index: u32) -> char {
    let offset = index.checked_rem(26).unwrap_or(0);
    char::from_u32(u32::from('A').saturating_add(offset)).unwrap_or('A')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds_a_full_world() {
        let config = SimulationConfig::default();
        let shared = build_shared_state(&config);

        assert_eq!(shared.crew.len(), 8);
        // 2 airlocks + 1 workshop + 1 vehicle bay.
        assert_eq!(shared.settlement.facility_count(), 4);
        assert!(shared.settlement.first_airlock().is_some());
        assert!(shared.settlement.first_workshop().is_some());
        assert!(shared.settlement.first_vehicle_bay().is_some());
        assert_eq!(shared.world_seed(), config.world.seed);
    }

    #[test]
    fn robots_are_enrolled_with_full_batteries() {
        let config = SimulationConfig::default();
        let shared = build_shared_state(&config);
        let robots: Vec<_> = shared
            .crew
            .iter()
            .filter(|(_, mate)| mate.profile.is_robot())
            .collect();
        assert_eq!(robots.len(), 2);
        for (_, mate) in robots {
            assert_eq!(mate.profile.battery_pct(), Some(100));
        }
    }
}
