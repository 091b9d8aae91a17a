//! The crew roster and per-pulse upkeep.
//!
//! [`Crew`] owns every colonist's profile, task manager, and rapport map.
//! [`advance_crew`] is the population subsystem's pulse entry point: it
//! applies upkeep (robot battery drain and low-battery pre-emption), then
//! feeds the pulse span through each member's task manager in
//! deterministic ID order.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use outpost_types::{AgentId, Colonist, SimTime, LOW_BATTERY_PCT};
use outpost_world::{MalfunctionRegistry, Settlement};

use crate::error::AgentError;
use crate::factory::TaskFactory;
use crate::task::{TaskContext, TaskKind};
use crate::task_manager::{TaskManager, TaskOutcome};

/// Battery percentage points a robot spends per pulse while working.
const BATTERY_DRAIN_PER_PULSE: u32 = 1;

/// One enrolled agent: profile, task manager, and social rapport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crewmate {
    /// Identity and capability profile.
    pub profile: Colonist,
    /// The agent's task manager.
    pub tasks: TaskManager,
    /// Rapport toward other agents in [0, 1]; absent means neutral.
    pub rapport: BTreeMap<AgentId, Decimal>,
}

/// The crew roster, keyed by agent ID for deterministic iteration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Crew {
    /// All enrolled members.
    members: BTreeMap<AgentId, Crewmate>,
}

/// What happened across the crew during one pulse.
#[derive(Debug, Clone, Default)]
pub struct CrewPulseReport {
    /// Task outcomes per agent, in the order they occurred.
    pub outcomes: Vec<(AgentId, TaskOutcome)>,
    /// Agents whose task was pre-empted for low battery this pulse.
    pub preempted: Vec<AgentId>,
}

impl Crew {
    /// Create an empty roster.
    pub const fn new() -> Self {
        Self {
            members: BTreeMap::new(),
        }
    }

    /// Enroll a colonist with a fresh task manager. Returns the agent ID.
    pub fn enroll(&mut self, profile: Colonist) -> AgentId {
        let id = profile.id;
        self.members.insert(
            id,
            Crewmate {
                profile,
                tasks: TaskManager::new(),
                rapport: BTreeMap::new(),
            },
        );
        id
    }

    /// Look up a member.
    pub fn member(&self, id: AgentId) -> Result<&Crewmate, AgentError> {
        self.members.get(&id).ok_or(AgentError::AgentNotFound(id))
    }

    /// Look up a member mutably.
    pub fn member_mut(&mut self, id: AgentId) -> Result<&mut Crewmate, AgentError> {
        self.members
            .get_mut(&id)
            .ok_or(AgentError::AgentNotFound(id))
    }

    /// Whether the agent is enrolled.
    pub fn contains(&self, id: AgentId) -> bool {
        self.members.contains_key(&id)
    }

    /// All member IDs in deterministic order.
    pub fn ids(&self) -> Vec<AgentId> {
        self.members.keys().copied().collect()
    }

    /// Iterate members in ID order.
    pub fn iter(&self) -> impl Iterator<Item = (&AgentId, &Crewmate)> {
        self.members.iter()
    }

    /// Iterate members mutably in ID order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&AgentId, &mut Crewmate)> {
        self.members.iter_mut()
    }

    /// Number of enrolled members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Rapport of `who` toward `toward`, defaulting to neutral 0.5.
    pub fn rapport_between(&self, who: AgentId, toward: AgentId) -> Decimal {
        self.members
            .get(&who)
            .and_then(|m| m.rapport.get(&toward).copied())
            .unwrap_or_else(|| Decimal::new(5, 1))
    }
}

/// Feed one pulse through every member's task manager, with upkeep.
///
/// Upkeep runs before task dispatch: a robot under the low-battery
/// threshold has its non-recharge task pre-empted so the factory can
/// route it to a charger; robots on working tasks drain battery.
pub fn advance_crew(
    crew: &mut Crew,
    settlement: &mut Settlement,
    malfunctions: &mut MalfunctionRegistry,
    factory: &mut dyn TaskFactory,
    now: SimTime,
    delta: SimTime,
) -> CrewPulseReport {
    let mut report = CrewPulseReport::default();

    for (&id, mate) in crew.members.iter_mut() {
        let mut ctx = TaskContext {
            colonist: &mut mate.profile,
            settlement: &mut *settlement,
            malfunctions: &mut *malfunctions,
            now,
        };

        // Low-battery pre-emption, unless already heading to the charger.
        let on_recharge = matches!(
            mate.tasks.active().map(crate::task::Task::kind),
            Some(TaskKind::Recharge)
        );
        if let Some(charge) = ctx.colonist.battery_pct()
            && charge < LOW_BATTERY_PCT
            && !on_recharge
            && let Some(outcome) = mate.tasks.clear(&mut ctx, "low battery")
        {
            info!(agent = %ctx.colonist.name, charge, "low battery pre-emption");
            report.outcomes.push((id, outcome));
            report.preempted.push(id);
        }

        let had_task_before = mate.tasks.active().is_some();
        for outcome in mate.tasks.advance(&mut ctx, factory, delta) {
            report.outcomes.push((id, outcome));
        }

        // Working robots drain battery; recharging is handled by the task.
        let working_now = mate
            .tasks
            .active()
            .is_some_and(|t| t.kind() != TaskKind::Recharge);
        if (had_task_before || working_now) && !on_recharge {
            mate.profile.drain_battery(BATTERY_DRAIN_PER_PULSE);
        }
    }

    report
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::factory::{RosterTaskFactory, StubTaskFactory};
    use outpost_types::{AgentKind, JobKind};

    #[test]
    fn enroll_and_lookup() {
        let mut crew = Crew::new();
        let id = crew.enroll(Colonist::new("Ada", AgentKind::Person, JobKind::Engineer));
        assert!(crew.contains(id));
        assert_eq!(crew.member(id).unwrap().profile.name, "Ada");
        assert!(crew.member(AgentId::new()).is_err());
    }

    #[test]
    fn default_rapport_is_neutral() {
        let mut crew = Crew::new();
        let a = crew.enroll(Colonist::new("Ada", AgentKind::Person, JobKind::Engineer));
        let b = crew.enroll(Colonist::new("Brin", AgentKind::Person, JobKind::Pilot));
        assert_eq!(crew.rapport_between(a, b), Decimal::new(5, 1));

        crew.member_mut(a)
            .unwrap()
            .rapport
            .insert(b, Decimal::new(9, 1));
        assert_eq!(crew.rapport_between(a, b), Decimal::new(9, 1));
    }

    #[test]
    fn idle_crew_accumulates_idle_time() {
        let mut crew = Crew::new();
        let id = crew.enroll(Colonist::new("Ada", AgentKind::Person, JobKind::Engineer));
        let mut settlement = Settlement::new("Base Alpha");
        let mut malfunctions = MalfunctionRegistry::default();
        let mut factory = StubTaskFactory::new();

        let report = advance_crew(
            &mut crew,
            &mut settlement,
            &mut malfunctions,
            &mut factory,
            SimTime::ZERO,
            SimTime::from_whole(10),
        );
        assert!(report.outcomes.is_empty());
        assert_eq!(
            crew.member(id).unwrap().tasks.idle_time(),
            SimTime::from_whole(10)
        );
    }

    #[test]
    fn low_battery_robot_is_preempted_and_recharges() {
        let mut crew = Crew::new();
        let id = crew.enroll(Colonist::new(
            "R-7",
            AgentKind::Robot { battery_pct: 10 },
            JobKind::Technician,
        ));
        let mut settlement = Settlement::new("Base Alpha");
        let mut malfunctions = MalfunctionRegistry::default();
        let mut factory = RosterTaskFactory::default();

        // First pulse: the roster policy routes straight to recharge.
        let report = advance_crew(
            &mut crew,
            &mut settlement,
            &mut malfunctions,
            &mut factory,
            SimTime::ZERO,
            SimTime::from_whole(10),
        );
        assert!(report.preempted.is_empty());
        let mate = crew.member(id).unwrap();
        assert!(matches!(
            mate.tasks.active().map(crate::task::Task::kind),
            Some(TaskKind::Recharge)
        ));
        // 10 millisols at 2 points each.
        assert_eq!(mate.profile.battery_pct(), Some(30));
    }

    #[test]
    fn working_robot_preempted_when_battery_runs_down() {
        let mut crew = Crew::new();
        let id = crew.enroll(Colonist::new(
            "R-7",
            AgentKind::Robot {
                battery_pct: LOW_BATTERY_PCT,
            },
            JobKind::Technician,
        ));
        let mut settlement = Settlement::new("Base Alpha");
        let mut malfunctions = MalfunctionRegistry::default();
        let mut factory = RosterTaskFactory::default();

        // Pulse 1: battery is exactly at the threshold, so the robot
        // picks up a rest task and drains by one.
        let report = advance_crew(
            &mut crew,
            &mut settlement,
            &mut malfunctions,
            &mut factory,
            SimTime::ZERO,
            SimTime::from_whole(5),
        );
        assert!(report.preempted.is_empty());
        assert_eq!(
            crew.member(id).unwrap().profile.battery_pct(),
            Some(LOW_BATTERY_PCT.saturating_sub(1))
        );

        // Pulse 2: now under the threshold -- the task is pre-empted.
        let report = advance_crew(
            &mut crew,
            &mut settlement,
            &mut malfunctions,
            &mut factory,
            SimTime::from_whole(5),
            SimTime::from_whole(5),
        );
        assert_eq!(report.preempted, vec![id]);
        assert!(report
            .outcomes
            .iter()
            .any(|(_, o)| matches!(o, TaskOutcome::Failed { reason, .. } if reason == "low battery")));
    }
}
