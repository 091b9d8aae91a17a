//! The task-selection seam.
//!
//! Which task an idle agent picks up next is policy, not scheduler
//! mechanics. The [`TaskFactory`] trait abstracts that policy so the
//! engine, missions, and tests can supply their own: a scripted queue, a
//! needs-driven planner, or the roster policy shipped here.

use tracing::debug;

use outpost_types::{Colonist, JobKind, SimTime, LOW_BATTERY_PCT};
use outpost_world::{MalfunctionRegistry, Settlement};

use crate::task::Task;

/// A source of next tasks for idle agents.
///
/// The manager calls [`select_next_task`] once per pulse for an agent with
/// nothing to do (and once more after a mid-pulse task end). Returning
/// `None` means the agent idles for the rest of the pulse.
///
/// [`select_next_task`]: TaskFactory::select_next_task
pub trait TaskFactory: Send {
    /// Pick the next task for `colonist`, or `None` to idle.
    fn select_next_task(
        &mut self,
        colonist: &Colonist,
        settlement: &Settlement,
        malfunctions: &MalfunctionRegistry,
    ) -> Option<Task>;
}

/// A factory that never has work. Agents idle every pulse.
#[derive(Debug, Clone, Default)]
pub struct StubTaskFactory;

impl StubTaskFactory {
    /// Create a new stub factory.
    pub const fn new() -> Self {
        Self
    }
}

impl TaskFactory for StubTaskFactory {
    fn select_next_task(
        &mut self,
        _colonist: &Colonist,
        _settlement: &Settlement,
        _malfunctions: &MalfunctionRegistry,
    ) -> Option<Task> {
        None
    }
}

/// The default roster policy.
///
/// Priorities, highest first:
/// 1. A robot below the low-battery threshold recharges.
/// 2. A rated engineer or technician repairs the oldest malfunction from
///    a serviceable workshop.
/// 3. Everyone else rests.
#[derive(Debug, Clone)]
pub struct RosterTaskFactory {
    /// Length of the fallback rest task.
    rest_span: SimTime,
}

impl RosterTaskFactory {
    /// Create the roster policy with the given fallback rest length.
    pub const fn new(rest_span: SimTime) -> Self {
        Self { rest_span }
    }
}

impl Default for RosterTaskFactory {
    fn default() -> Self {
        Self::new(SimTime::from_whole(50))
    }
}

impl TaskFactory for RosterTaskFactory {
    fn select_next_task(
        &mut self,
        colonist: &Colonist,
        settlement: &Settlement,
        malfunctions: &MalfunctionRegistry,
    ) -> Option<Task> {
        // 1. Battery first: a drained robot is useless for anything else.
        if let Some(charge) = colonist.battery_pct()
            && charge < LOW_BATTERY_PCT
        {
            return Some(Task::recharge());
        }

        // 2. Repairs, if this colonist is qualified and a bench is free.
        if matches!(colonist.job, JobKind::Engineer | JobKind::Technician)
            && colonist.can_take_effort_tasks()
            && let Some(workshop) = settlement.first_workshop()
            && let Some(broken) = malfunctions.iter().find(|m| m.facility != workshop)
        {
            debug!(
                agent = %colonist.name,
                target = %broken.facility,
                "roster policy dispatching repair"
            );
            return Some(Task::maintenance(workshop, broken.facility));
        }

        // 3. Rest.
        Some(Task::rest(self.rest_span))
    }
}
