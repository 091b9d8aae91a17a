//! The mission roster and per-pulse mission stepping.
//!
//! One pulse of mission coordination, per mission in deterministic order:
//! start the phase machine if needed, answer the emergency query, drop
//! incapacitated members (the membership floor may end the mission here),
//! run the current phase's work, and react to `phase_ended` by asking the
//! kind's pure succession function for the next phase. Mission teardown
//! clears every member's mission task synchronously -- before the next
//! pulse, as the cancellation contract requires.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use outpost_agents::task::TaskContext;
use outpost_agents::{Crew, Task};
use outpost_types::{AgentId, MissionId, SimTime};
use outpost_world::{MalfunctionRegistry, Settlement};

use crate::error::MissionError;
use crate::mission::{Mission, MissionKind, MissionPhase, PhaseDecision};
use crate::recruit::recruit_members;

/// Reason handed to members' task managers when their mission ends.
const MISSION_TEARDOWN: &str = "mission ended";

/// Reason handed to a member's previous task when the mission assigns one.
const MISSION_TASKING: &str = "mission tasking";

/// Everything mission stepping may touch during one pulse.
pub struct MissionContext<'a> {
    /// The crew roster (membership, rapport, task managers).
    pub crew: &'a mut Crew,
    /// The settlement (airlocks and vehicle bays for mission tasks).
    pub settlement: &'a mut Settlement,
    /// The malfunction registry (task cancellation plumbing).
    pub malfunctions: &'a mut MalfunctionRegistry,
    /// Whether the exterior sky currently makes surface work hazardous.
    pub surface_hazard: bool,
    /// World seed for recruitment rolls.
    pub seed: u64,
    /// Current pulse number.
    pub pulse: u64,
    /// Simulated time at the start of this pulse.
    pub now: SimTime,
}

/// What happened across the roster during one pulse.
#[derive(Debug, Clone, Default)]
pub struct MissionPulseReport {
    /// Phase transitions, in the order they occurred.
    pub phase_changes: Vec<(MissionId, MissionPhase)>,
    /// Missions that ended; `None` reason means normal completion.
    pub ended: Vec<(MissionId, Option<String>)>,
    /// Agents recruited this pulse.
    pub recruited: Vec<(MissionId, AgentId)>,
}

/// The set of missions, keyed by ID for deterministic iteration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MissionRoster {
    /// All missions, running and finished.
    missions: BTreeMap<MissionId, Mission>,
}

impl MissionRoster {
    /// Create an empty roster.
    pub const fn new() -> Self {
        Self {
            missions: BTreeMap::new(),
        }
    }

    /// Add a mission to the roster. Returns its ID.
    pub fn launch(&mut self, mission: Mission) -> MissionId {
        let id = mission.id();
        info!(mission = mission.name(), %id, "mission launched");
        self.missions.insert(id, mission);
        id
    }

    /// Look up a mission.
    pub fn mission(&self, id: MissionId) -> Result<&Mission, MissionError> {
        self.missions
            .get(&id)
            .ok_or(MissionError::UnknownMission { id })
    }

    /// Look up a mission mutably.
    pub fn mission_mut(&mut self, id: MissionId) -> Result<&mut Mission, MissionError> {
        self.missions
            .get_mut(&id)
            .ok_or(MissionError::UnknownMission { id })
    }

    /// Iterate missions in ID order.
    pub fn iter(&self) -> impl Iterator<Item = &Mission> {
        self.missions.values()
    }

    /// Number of missions, running and finished.
    pub fn len(&self) -> usize {
        self.missions.len()
    }

    /// Whether the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.missions.is_empty()
    }

    /// Number of missions still running.
    pub fn active_count(&self) -> usize {
        self.missions.values().filter(|m| !m.is_done()).count()
    }
}

/// Step every mission through one pulse.
pub fn advance_missions(
    roster: &mut MissionRoster,
    ctx: &mut MissionContext<'_>,
    delta: SimTime,
) -> MissionPulseReport {
    let mut report = MissionPulseReport::default();
    for mission in roster.missions.values_mut() {
        step_mission(mission, ctx, delta, &mut report);
    }
    report
}

/// Step a single mission through one pulse.
fn step_mission(
    mission: &mut Mission,
    ctx: &mut MissionContext<'_>,
    delta: SimTime,
    report: &mut MissionPulseReport,
) {
    if mission.is_done() {
        return;
    }

    // Start the phase machine on the first pulse.
    if mission.current_phase().is_none() {
        mission.begin();
        if let Some(phase) = mission.current_phase() {
            report.phase_changes.push((mission.id(), phase));
        }
        if mission.is_done() {
            finish_mission(mission, ctx, report);
            return;
        }
    }

    // Emergency escalation: the query is answered every pulse; this
    // coordinator's policy is to call for rescue and fold the mission.
    if mission.all_members_incapacitated(ctx.crew) {
        mission.end(Some(String::from("emergency rescue requested")));
        finish_mission(mission, ctx, report);
        return;
    }

    // Individually incapacitated members drop out; the membership floor
    // may end the mission right here.
    let ailing: Vec<AgentId> = mission
        .members()
        .iter()
        .copied()
        .filter(|id| {
            ctx.crew
                .member(*id)
                .map(|mate| mate.profile.serious_ailment)
                .unwrap_or(true)
        })
        .collect();
    for agent in ailing {
        clear_member_task(ctx, agent, "removed from mission");
        mission.remove_member(agent);
    }
    if mission.is_done() {
        finish_mission(mission, ctx, report);
        return;
    }

    // Run the current phase's pulse work.
    match mission.current_phase() {
        Some(MissionPhase::Preparing) => {
            if mission.member_count() < mission.capacity() {
                for agent in recruit_members(mission, ctx.crew, ctx.seed, ctx.pulse) {
                    report.recruited.push((mission.id(), agent));
                }
            }
            if mission.member_count() >= mission.min_members() && mission.min_members() > 0 {
                mission.signal_phase_ended();
            } else {
                mission.consume_phase_time(delta);
                if mission.phase_ended() && mission.member_count() < mission.min_members() {
                    mission.end(Some(String::from(crate::mission::INSUFFICIENT_MEMBERS)));
                    finish_mission(mission, ctx, report);
                    return;
                }
            }
        }
        Some(MissionPhase::FieldWork) if ctx.surface_hazard => {
            // A storm on site cuts field work short; the succession
            // function routes the team home.
            info!(mission = mission.name(), "surface hazard, cutting field work short");
            mission.signal_phase_ended();
        }
        Some(_) => mission.consume_phase_time(delta),
        None => {}
    }

    // React to a finished phase.
    if mission.phase_ended() && !mission.is_done() {
        let Some(current) = mission.current_phase() else {
            return;
        };
        match mission.kind().determine_new_phase(current) {
            PhaseDecision::Advance(next) => {
                mission.enter_phase(next);
                if mission.is_done() {
                    finish_mission(mission, ctx, report);
                    return;
                }
                report.phase_changes.push((mission.id(), next));
                assign_phase_tasks(mission, next, ctx);
            }
            PhaseDecision::End(reason) => {
                mission.end(reason);
                finish_mission(mission, ctx, report);
            }
        }
    }
}

/// Hand out the member tasks a phase calls for.
fn assign_phase_tasks(mission: &Mission, phase: MissionPhase, ctx: &mut MissionContext<'_>) {
    match (mission.kind(), phase) {
        (MissionKind::SurfaceSurvey, MissionPhase::FieldWork) => {
            let Some(airlock) = ctx.settlement.first_airlock() else {
                return;
            };
            for agent in mission.members().iter().copied() {
                assign_member_task(ctx, agent, Task::egress(airlock));
            }
        }
        (MissionKind::SupplyRun, MissionPhase::Transit) => {
            let Some(bay) = ctx.settlement.first_vehicle_bay() else {
                return;
            };
            // The first member (by ID order) drives; the rest ride.
            for (index, agent) in mission.members().iter().copied().enumerate() {
                let task = if index == 0 {
                    Task::vehicle_checkout(bay, SimTime::from_whole(150))
                } else {
                    Task::rest(SimTime::from_whole(150))
                };
                assign_member_task(ctx, agent, task);
            }
        }
        (_, MissionPhase::Returning) => {
            for agent in mission.members().iter().copied() {
                assign_member_task(ctx, agent, Task::walk(SimTime::from_whole(60)));
            }
        }
        _ => {}
    }
}

/// Install `task` on one member's task manager.
fn assign_member_task(ctx: &mut MissionContext<'_>, agent: AgentId, task: Task) {
    let MissionContext {
        crew,
        settlement,
        malfunctions,
        now,
        ..
    } = ctx;
    let Ok(mate) = crew.member_mut(agent) else {
        return;
    };
    let mut task_ctx = TaskContext {
        colonist: &mut mate.profile,
        settlement: &mut **settlement,
        malfunctions: &mut **malfunctions,
        now: *now,
    };
    mate.tasks.assign(&mut task_ctx, task, MISSION_TASKING);
}

/// Clear one member's active task.
fn clear_member_task(ctx: &mut MissionContext<'_>, agent: AgentId, reason: &str) {
    let MissionContext {
        crew,
        settlement,
        malfunctions,
        now,
        ..
    } = ctx;
    let Ok(mate) = crew.member_mut(agent) else {
        return;
    };
    let mut task_ctx = TaskContext {
        colonist: &mut mate.profile,
        settlement: &mut **settlement,
        malfunctions: &mut **malfunctions,
        now: *now,
    };
    let _ = mate.tasks.clear(&mut task_ctx, reason);
}

/// Record an ended mission and clear every member's mission task.
fn finish_mission(
    mission: &Mission,
    ctx: &mut MissionContext<'_>,
    report: &mut MissionPulseReport,
) {
    for agent in mission.members().iter().copied() {
        clear_member_task(ctx, agent, MISSION_TEARDOWN);
    }
    report
        .ended
        .push((mission.id(), mission.end_reason().map(str::to_owned)));
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use outpost_types::{AgentKind, Colonist, JobKind};
    use outpost_world::{Facility, FacilityKind};

    fn make_world() -> (Crew, Settlement, MalfunctionRegistry) {
        let mut crew = Crew::new();
        for (name, job) in [
            ("Ada", JobKind::Geologist),
            ("Brin", JobKind::Pilot),
            ("Cole", JobKind::Engineer),
            ("Dara", JobKind::Geologist),
        ] {
            let _ = crew.enroll(Colonist::new(name, AgentKind::Person, job));
        }
        let mut settlement = Settlement::new("Base Alpha");
        let _ = settlement.add_facility(Facility::new(
            "airlock A",
            FacilityKind::Airlock,
            SimTime::from_whole(20),
        ));
        let _ = settlement.add_vehicle("rover 1", SimTime::from_whole(10));
        (crew, settlement, MalfunctionRegistry::default())
    }

    fn run_pulses(
        roster: &mut MissionRoster,
        crew: &mut Crew,
        settlement: &mut Settlement,
        malfunctions: &mut MalfunctionRegistry,
        pulses: u64,
        hazard: bool,
    ) -> Vec<MissionPulseReport> {
        let mut reports = Vec::new();
        for pulse in 0..pulses {
            let mut ctx = MissionContext {
                crew: &mut *crew,
                settlement: &mut *settlement,
                malfunctions: &mut *malfunctions,
                surface_hazard: hazard,
                seed: 42,
                pulse,
                now: SimTime::from_whole(pulse.saturating_mul(10)),
            };
            reports.push(advance_missions(roster, &mut ctx, SimTime::from_whole(10)));
        }
        reports
    }

    #[test]
    fn survey_mission_runs_to_completion() {
        let (mut crew, mut settlement, mut malfunctions) = make_world();
        let mut roster = MissionRoster::new();
        let id = roster.launch(Mission::new(
            "site survey",
            MissionKind::SurfaceSurvey,
            2,
            3,
            SimTime::ZERO,
        ));

        let reports = run_pulses(
            &mut roster,
            &mut crew,
            &mut settlement,
            &mut malfunctions,
            200,
            false,
        );

        let mission = roster.mission(id).unwrap();
        assert!(mission.is_done());
        assert_eq!(mission.end_reason(), None);
        assert!(reports.iter().any(|r| !r.recruited.is_empty()));
        assert!(reports
            .iter()
            .flat_map(|r| r.phase_changes.iter())
            .any(|(_, p)| *p == MissionPhase::FieldWork));
    }

    #[test]
    fn unfillable_mission_ends_for_insufficient_members() {
        let (_, mut settlement, mut malfunctions) = make_world();
        // A crew where everyone is seriously ailing cannot be recruited.
        let mut crew = Crew::new();
        for name in ["Ada", "Brin"] {
            let id = crew.enroll(Colonist::new(name, AgentKind::Person, JobKind::Geologist));
            crew.member_mut(id).unwrap().profile.serious_ailment = true;
        }

        let mut roster = MissionRoster::new();
        let id = roster.launch(Mission::new(
            "site survey",
            MissionKind::SurfaceSurvey,
            2,
            3,
            SimTime::ZERO,
        ));

        let _ = run_pulses(
            &mut roster,
            &mut crew,
            &mut settlement,
            &mut malfunctions,
            20,
            false,
        );

        let mission = roster.mission(id).unwrap();
        assert!(mission.is_done());
        assert_eq!(mission.end_reason(), Some("insufficient members"));
    }

    #[test]
    fn all_members_ailing_triggers_rescue_request() {
        let (mut crew, mut settlement, mut malfunctions) = make_world();
        let mut roster = MissionRoster::new();
        let id = roster.launch(Mission::new(
            "site survey",
            MissionKind::SurfaceSurvey,
            2,
            3,
            SimTime::ZERO,
        ));

        // Recruit, then strike the whole team down.
        let _ = run_pulses(
            &mut roster,
            &mut crew,
            &mut settlement,
            &mut malfunctions,
            30,
            false,
        );
        let members: Vec<AgentId> = roster
            .mission(id)
            .unwrap()
            .members()
            .iter()
            .copied()
            .collect();
        assert!(!members.is_empty());
        for agent in &members {
            crew.member_mut(*agent).unwrap().profile.serious_ailment = true;
        }

        let _ = run_pulses(
            &mut roster,
            &mut crew,
            &mut settlement,
            &mut malfunctions,
            1,
            false,
        );
        let mission = roster.mission(id).unwrap();
        assert!(mission.is_done());
        assert_eq!(mission.end_reason(), Some("emergency rescue requested"));
    }

    #[test]
    fn storm_cuts_field_work_short() {
        let (mut crew, mut settlement, mut malfunctions) = make_world();
        let mut roster = MissionRoster::new();
        let id = roster.launch(Mission::new(
            "site survey",
            MissionKind::SurfaceSurvey,
            2,
            3,
            SimTime::ZERO,
        ));

        // Run in clear weather until field work starts.
        let mut in_field = false;
        for pulse in 0..100 {
            let mut ctx = MissionContext {
                crew: &mut crew,
                settlement: &mut settlement,
                malfunctions: &mut malfunctions,
                surface_hazard: false,
                seed: 42,
                pulse,
                now: SimTime::from_whole(pulse.saturating_mul(10)),
            };
            let _ = advance_missions(&mut roster, &mut ctx, SimTime::from_whole(10));
            if roster.mission(id).unwrap().current_phase() == Some(MissionPhase::FieldWork) {
                in_field = true;
                break;
            }
        }
        assert!(in_field);

        // One stormy pulse sends the team home.
        let mut ctx = MissionContext {
            crew: &mut crew,
            settlement: &mut settlement,
            malfunctions: &mut malfunctions,
            surface_hazard: true,
            seed: 42,
            pulse: 999,
            now: SimTime::from_whole(9990),
        };
        let _ = advance_missions(&mut roster, &mut ctx, SimTime::from_whole(10));
        assert_eq!(
            roster.mission(id).unwrap().current_phase(),
            Some(MissionPhase::Returning)
        );
    }

    #[test]
    fn teardown_clears_member_tasks() {
        let (mut crew, mut settlement, mut malfunctions) = make_world();
        let mut roster = MissionRoster::new();
        let id = roster.launch(Mission::new(
            "site survey",
            MissionKind::SurfaceSurvey,
            2,
            3,
            SimTime::ZERO,
        ));

        // Recruit and reach field work so members hold egress tasks.
        for pulse in 0..100 {
            let mut ctx = MissionContext {
                crew: &mut crew,
                settlement: &mut settlement,
                malfunctions: &mut malfunctions,
                surface_hazard: false,
                seed: 42,
                pulse,
                now: SimTime::from_whole(pulse.saturating_mul(10)),
            };
            let _ = advance_missions(&mut roster, &mut ctx, SimTime::from_whole(10));
            if roster.mission(id).unwrap().current_phase() == Some(MissionPhase::FieldWork) {
                break;
            }
        }
        let members: Vec<AgentId> = roster
            .mission(id)
            .unwrap()
            .members()
            .iter()
            .copied()
            .collect();
        assert!(members
            .iter()
            .any(|m| crew.member(*m).unwrap().tasks.active().is_some()));

        // Strike down all but one member; the coordinator removes them,
        // the membership floor ends the mission, and teardown clears the
        // survivor's task too.
        for agent in members.iter().skip(1) {
            crew.member_mut(*agent).unwrap().profile.serious_ailment = true;
        }
        let _ = run_pulses(
            &mut roster,
            &mut crew,
            &mut settlement,
            &mut malfunctions,
            1,
            false,
        );

        let mission = roster.mission(id).unwrap();
        assert!(mission.is_done());
        assert_eq!(mission.end_reason(), Some("insufficient members"));
        for member in &members {
            assert!(crew.member(*member).unwrap().tasks.active().is_none());
        }
    }
}
