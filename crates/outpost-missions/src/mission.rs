//! The mission state machine.
//!
//! Mission kinds are a closed, serializable set. Each kind declares its
//! phase list and supplies [`determine_new_phase`], the pure function the
//! coordinator calls whenever a phase ends: advance to a declared phase,
//! or end the mission. Emergency escalation is a boolean *query* -- the
//! phase logic decides what to do with it; nothing here forces a
//! transition.
//!
//! [`determine_new_phase`]: MissionKind::determine_new_phase

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use outpost_agents::Crew;
use outpost_types::{AgentId, MissionId, SimTime};

use crate::error::MissionError;

/// Reason string used when membership drops below the floor.
pub(crate) const INSUFFICIENT_MEMBERS: &str = "insufficient members";

/// Phase identifiers shared across mission kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissionPhase {
    /// Recruiting and staging.
    Preparing,
    /// Suiting up and passing through the airlock.
    Embarking,
    /// Working the survey site.
    FieldWork,
    /// Heading home.
    Returning,
    /// Stowing gear and reporting.
    Debrief,
    /// Loading cargo.
    Loading,
    /// Driving the route.
    Transit,
    /// Unloading at the destination pad.
    Unloading,
}

/// What kind of mission this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissionKind {
    /// A geological survey on foot outside the settlement.
    SurfaceSurvey,
    /// A vehicle supply run to a remote pad.
    SupplyRun,
}

/// The coordinator's verdict after a phase ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseDecision {
    /// Move to the given declared phase.
    Advance(MissionPhase),
    /// End the mission; `None` means normal completion.
    End(Option<String>),
}

impl MissionKind {
    /// The phases this kind declares, in canonical order.
    pub const fn phases(self) -> &'static [MissionPhase] {
        match self {
            Self::SurfaceSurvey => &[
                MissionPhase::Preparing,
                MissionPhase::Embarking,
                MissionPhase::FieldWork,
                MissionPhase::Returning,
                MissionPhase::Debrief,
            ],
            Self::SupplyRun => &[
                MissionPhase::Preparing,
                MissionPhase::Loading,
                MissionPhase::Transit,
                MissionPhase::Unloading,
                MissionPhase::Returning,
            ],
        }
    }

    /// The time-box for one phase of this kind.
    pub fn phase_duration(self, phase: MissionPhase) -> SimTime {
        let millisols = match (self, phase) {
            (_, MissionPhase::Preparing) => 100,
            (Self::SurfaceSurvey, MissionPhase::Embarking) => 50,
            (Self::SurfaceSurvey, MissionPhase::FieldWork) => 300,
            (_, MissionPhase::Returning) => 100,
            (Self::SurfaceSurvey, MissionPhase::Debrief) => 50,
            (Self::SupplyRun, MissionPhase::Loading | MissionPhase::Unloading) => 80,
            (Self::SupplyRun, MissionPhase::Transit) => 200,
            // Foreign phases never run; give them no time-box.
            _ => 0,
        };
        SimTime::from_whole(millisols)
    }

    /// Pure phase-succession function: given the phase that just ended,
    /// pick the next phase or end the mission.
    pub fn determine_new_phase(self, ended: MissionPhase) -> PhaseDecision {
        let phases = self.phases();
        let position = phases.iter().position(|p| *p == ended);
        match position {
            Some(index) => match phases.get(index.saturating_add(1)) {
                Some(next) => PhaseDecision::Advance(*next),
                None => PhaseDecision::End(None),
            },
            None => PhaseDecision::End(Some(format!(
                "phase {ended:?} is not declared by {self:?}"
            ))),
        }
    }
}

/// A running (or finished) mission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mission {
    /// Unique mission identifier.
    id: MissionId,
    /// Display name.
    name: String,
    /// The mission's kind.
    kind: MissionKind,
    /// Current members.
    members: BTreeSet<AgentId>,
    /// Maximum membership.
    capacity: usize,
    /// Membership floor; dropping below it ends the mission.
    min_members: usize,
    /// Current phase; `None` before the mission starts.
    current: Option<MissionPhase>,
    /// Set when the current phase has finished its work or time-box.
    phase_ended: bool,
    /// Time left in the current phase's time-box.
    phase_remaining: SimTime,
    /// Terminal flag.
    done: bool,
    /// Failure reason, if the mission ended abnormally.
    end_reason: Option<String>,
    /// Simulated time at which the mission was created.
    started_at: SimTime,
}

impl Mission {
    /// Create a mission. `capacity` is clamped up to at least
    /// `min_members` so a mission is never born unfillable.
    pub fn new(
        name: impl Into<String>,
        kind: MissionKind,
        min_members: usize,
        capacity: usize,
        now: SimTime,
    ) -> Self {
        Self {
            id: MissionId::new(),
            name: name.into(),
            kind,
            members: BTreeSet::new(),
            capacity: capacity.max(min_members),
            min_members,
            current: None,
            phase_ended: false,
            phase_remaining: SimTime::ZERO,
            done: false,
            end_reason: None,
            started_at: now,
        }
    }

    /// The mission's identifier.
    pub const fn id(&self) -> MissionId {
        self.id
    }

    /// The mission's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The mission's kind.
    pub const fn kind(&self) -> MissionKind {
        self.kind
    }

    /// Current members in deterministic order.
    pub const fn members(&self) -> &BTreeSet<AgentId> {
        &self.members
    }

    /// Current member count.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Maximum membership.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Membership floor.
    pub const fn min_members(&self) -> usize {
        self.min_members
    }

    /// Current phase, `None` before start.
    pub const fn current_phase(&self) -> Option<MissionPhase> {
        self.current
    }

    /// Whether the current phase has signalled completion.
    pub const fn phase_ended(&self) -> bool {
        self.phase_ended
    }

    /// Time left in the current phase's time-box.
    pub const fn phase_remaining(&self) -> SimTime {
        self.phase_remaining
    }

    /// Whether the mission has reached its terminal state.
    pub const fn is_done(&self) -> bool {
        self.done
    }

    /// The failure reason, if the mission ended abnormally.
    pub fn end_reason(&self) -> Option<&str> {
        self.end_reason.as_deref()
    }

    /// Simulated time at which the mission was created.
    pub const fn started_at(&self) -> SimTime {
        self.started_at
    }

    /// Add a member.
    pub fn add_member(&mut self, agent: AgentId) -> Result<(), MissionError> {
        if self.done {
            return Err(MissionError::MissionOver { id: self.id });
        }
        if self.members.len() >= self.capacity {
            return Err(MissionError::AtCapacity {
                id: self.id,
                capacity: self.capacity,
            });
        }
        self.members.insert(agent);
        Ok(())
    }

    /// Remove a member, enforcing the membership floor.
    ///
    /// If membership drops below `min_members` the mission ends with
    /// "insufficient members"; if it drops to zero it ends regardless of
    /// the floor. Either way `end` fires exactly once.
    pub fn remove_member(&mut self, agent: AgentId) {
        if !self.members.remove(&agent) {
            return;
        }
        if self.done {
            return;
        }
        if self.members.is_empty() {
            self.end(Some(String::from("all members lost")));
        } else if self.members.len() < self.min_members {
            self.end(Some(String::from(INSUFFICIENT_MEMBERS)));
        }
    }

    /// Enter the mission's first declared phase.
    pub fn begin(&mut self) {
        if self.done || self.current.is_some() {
            return;
        }
        if let Some(first) = self.kind.phases().first().copied() {
            self.enter_phase(first);
        } else {
            self.end(Some(String::from("mission declares no phases")));
        }
    }

    /// Transition to a declared phase and arm its time-box.
    pub fn enter_phase(&mut self, phase: MissionPhase) {
        if self.kind.phases().contains(&phase) {
            info!(mission = %self.name, ?phase, "mission phase");
            self.current = Some(phase);
            self.phase_ended = false;
            self.phase_remaining = self.kind.phase_duration(phase);
        } else {
            warn!(mission = %self.name, ?phase, "undeclared mission phase requested");
            self.end(Some(format!("undeclared phase {phase:?}")));
        }
    }

    /// Consume phase time-box; marks the phase ended when it expires.
    pub fn consume_phase_time(&mut self, delta: SimTime) {
        if self.done || self.phase_ended {
            return;
        }
        self.phase_remaining = self.phase_remaining.saturating_sub(delta);
        if self.phase_remaining.is_zero() {
            self.phase_ended = true;
        }
    }

    /// Signal that the current phase finished ahead of its time-box.
    pub const fn signal_phase_ended(&mut self) {
        self.phase_ended = true;
    }

    /// End the mission. Idempotent; the first reason wins.
    pub fn end(&mut self, reason: Option<String>) {
        if self.done {
            return;
        }
        match &reason {
            Some(why) => info!(mission = %self.name, %why, "mission ended"),
            None => info!(mission = %self.name, "mission completed"),
        }
        self.done = true;
        self.end_reason = reason;
        self.current = None;
        self.phase_ended = false;
    }

    /// Emergency escalation query: do *all* current members have a
    /// serious medical problem? Exposed as a question, not a forced
    /// transition -- phase logic decides whether to call for rescue.
    pub fn all_members_incapacitated(&self, crew: &Crew) -> bool {
        !self.members.is_empty()
            && self.members.iter().all(|id| {
                crew.member(*id)
                    .map(|mate| mate.profile.serious_ailment)
                    .unwrap_or(true)
            })
    }
}
