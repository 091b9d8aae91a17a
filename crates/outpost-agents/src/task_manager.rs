//! Per-agent ownership and selection of the active task.
//!
//! A [`TaskManager`] holds zero or one active [`Task`]. Each pulse it
//! either delegates the span to the task or, with nothing to do, consults
//! the pluggable [`TaskFactory`] for a replacement. A task that blocks
//! mid-pulse keeps its leftover as idle time -- the manager never
//! re-dispatches a blocked task within the same pulse, which caps the
//! per-pulse work at one phase-dispatch per task. A task that *ends*
//! mid-pulse is different: its replacement is selected immediately and
//! receives the remainder, once.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use outpost_types::SimTime;

use crate::factory::TaskFactory;
use crate::task::{Task, TaskContext};

/// How a finished task left the stage, for event logging upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskOutcome {
    /// The task ran to normal completion.
    Completed {
        /// The task's display name.
        name: String,
    },
    /// The task ended itself (or was cleared) with a reason.
    Failed {
        /// The task's display name.
        name: String,
        /// Why the task ended.
        reason: String,
    },
}

/// Owner of an agent's active task.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TaskManager {
    /// The active task, if any.
    active: Option<Task>,
    /// Pulse time spent with nothing to do (or blocked on a gate).
    idle_time: SimTime,
}

impl TaskManager {
    /// Create an idle manager.
    pub const fn new() -> Self {
        Self {
            active: None,
            idle_time: SimTime::ZERO,
        }
    }

    /// The active task, if any.
    pub const fn active(&self) -> Option<&Task> {
        self.active.as_ref()
    }

    /// Accumulated idle time.
    pub const fn idle_time(&self) -> SimTime {
        self.idle_time
    }

    /// Feed one pulse of time through the agent's task stack.
    ///
    /// Returns the outcomes of any tasks that finished during this pulse.
    pub fn advance(
        &mut self,
        ctx: &mut TaskContext<'_>,
        factory: &mut dyn TaskFactory,
        delta: SimTime,
    ) -> Vec<TaskOutcome> {
        let mut outcomes = Vec::new();

        if self.active.is_none() {
            self.active = self.select(ctx, factory);
        }
        let Some(task) = self.active.as_mut() else {
            self.consume_idle(delta);
            return outcomes;
        };

        let left = task.step(ctx, delta);

        if task.is_done() {
            let outcome = outcome_of(task);
            log_outcome(ctx, &outcome);
            outcomes.push(outcome);
            self.active = None;

            // A task that ended mid-pulse is replaced immediately; the
            // replacement gets the remainder exactly once.
            if !left.is_zero() {
                if let Some(mut next) = self.select(ctx, factory) {
                    let left_after = next.step(ctx, left);
                    if next.is_done() {
                        let outcome = outcome_of(&next);
                        log_outcome(ctx, &outcome);
                        outcomes.push(outcome);
                    } else {
                        self.active = Some(next);
                    }
                    self.consume_idle(left_after);
                } else {
                    self.consume_idle(left);
                }
            }
        } else {
            // Blocked (or the span ran out): the leftover is idle, not
            // re-dispatched, trading a little time-attribution slack for
            // bounded work per pulse.
            self.consume_idle(left);
        }

        outcomes
    }

    /// Install a task directly (mission assignment). Any current task is
    /// cancelled first with the given reason.
    pub fn assign(&mut self, ctx: &mut TaskContext<'_>, task: Task, displace_reason: &str) {
        if let Some(current) = self.active.as_mut() {
            current.cancel(ctx, displace_reason);
        }
        debug!(agent = %ctx.colonist.name, task = task.name(), "task assigned");
        self.active = Some(task);
    }

    /// Forcibly end the active task (pre-emption). Returns the cleared
    /// task's outcome, if there was one.
    pub fn clear(&mut self, ctx: &mut TaskContext<'_>, reason: &str) -> Option<TaskOutcome> {
        let mut task = self.active.take()?;
        task.cancel(ctx, reason);
        let outcome = outcome_of(&task);
        log_outcome(ctx, &outcome);
        Some(outcome)
    }

    /// Consult the factory, honouring the effort-driven gate.
    fn select(
        &mut self,
        ctx: &mut TaskContext<'_>,
        factory: &mut dyn TaskFactory,
    ) -> Option<Task> {
        let candidate =
            factory.select_next_task(ctx.colonist, ctx.settlement, ctx.malfunctions)?;
        if candidate.is_effort_driven() && !ctx.colonist.can_take_effort_tasks() {
            debug!(
                agent = %ctx.colonist.name,
                task = candidate.name(),
                "effort-driven task withheld from zero-rated agent"
            );
            return None;
        }
        debug!(agent = %ctx.colonist.name, task = candidate.name(), "task selected");
        Some(candidate)
    }

    /// Record idle time.
    fn consume_idle(&mut self, span: SimTime) {
        self.idle_time = self.idle_time.checked_add(span).unwrap_or(self.idle_time);
    }
}

/// Build the outcome record for a finished task.
fn outcome_of(task: &Task) -> TaskOutcome {
    match task.end_reason() {
        None => TaskOutcome::Completed {
            name: task.name().to_owned(),
        },
        Some(reason) => TaskOutcome::Failed {
            name: task.name().to_owned(),
            reason: reason.to_owned(),
        },
    }
}

/// Log a finished task at the appropriate level.
fn log_outcome(ctx: &TaskContext<'_>, outcome: &TaskOutcome) {
    match outcome {
        TaskOutcome::Completed { name } => {
            debug!(agent = %ctx.colonist.name, task = %name, "task completed");
        }
        TaskOutcome::Failed { name, reason } => {
            info!(agent = %ctx.colonist.name, task = %name, %reason, "task ended");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::factory::{StubTaskFactory, TaskFactory};
    use outpost_types::{AgentKind, Colonist, JobKind};
    use outpost_world::{MalfunctionRegistry, Settlement};
    use rust_decimal::Decimal;

    /// Factory that hands out a fixed queue of tasks.
    struct QueueFactory {
        queue: Vec<Task>,
    }

    impl TaskFactory for QueueFactory {
        fn select_next_task(
            &mut self,
            _colonist: &Colonist,
            _settlement: &Settlement,
            _malfunctions: &MalfunctionRegistry,
        ) -> Option<Task> {
            if self.queue.is_empty() {
                None
            } else {
                Some(self.queue.remove(0))
            }
        }
    }

    fn parts() -> (Colonist, Settlement, MalfunctionRegistry) {
        (
            Colonist::new("Ada", AgentKind::Person, JobKind::Engineer),
            Settlement::new("Base Alpha"),
            MalfunctionRegistry::default(),
        )
    }

    #[test]
    fn idle_when_factory_has_nothing() {
        let (mut colonist, mut settlement, mut malfunctions) = parts();
        let mut ctx = TaskContext {
            colonist: &mut colonist,
            settlement: &mut settlement,
            malfunctions: &mut malfunctions,
            now: SimTime::ZERO,
        };
        let mut manager = TaskManager::new();
        let mut factory = StubTaskFactory::new();

        let outcomes = manager.advance(&mut ctx, &mut factory, SimTime::from_whole(10));
        assert!(outcomes.is_empty());
        assert_eq!(manager.idle_time(), SimTime::from_whole(10));
        assert!(manager.active().is_none());
    }

    #[test]
    fn finished_task_is_replaced_within_the_same_pulse() {
        let (mut colonist, mut settlement, mut malfunctions) = parts();
        let mut ctx = TaskContext {
            colonist: &mut colonist,
            settlement: &mut settlement,
            malfunctions: &mut malfunctions,
            now: SimTime::ZERO,
        };
        let mut manager = TaskManager::new();
        let mut factory = QueueFactory {
            queue: vec![
                Task::rest(SimTime::from_whole(4)),
                Task::rest(SimTime::from_whole(20)),
            ],
        };

        let outcomes = manager.advance(&mut ctx, &mut factory, SimTime::from_whole(10));
        // First rest completed; replacement consumed the remaining 6.
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(
            outcomes.first().unwrap(),
            TaskOutcome::Completed { name } if name == "rest"
        ));
        let active = manager.active().unwrap();
        assert_eq!(active.elapsed(), SimTime::from_whole(6));
        assert_eq!(manager.idle_time(), SimTime::ZERO);
    }

    #[test]
    fn replacement_happens_at_most_once_per_pulse() {
        let (mut colonist, mut settlement, mut malfunctions) = parts();
        let mut ctx = TaskContext {
            colonist: &mut colonist,
            settlement: &mut settlement,
            malfunctions: &mut malfunctions,
            now: SimTime::ZERO,
        };
        let mut manager = TaskManager::new();
        let mut factory = QueueFactory {
            queue: vec![
                Task::rest(SimTime::from_whole(2)),
                Task::rest(SimTime::from_whole(3)),
                Task::rest(SimTime::from_whole(50)),
            ],
        };

        let outcomes = manager.advance(&mut ctx, &mut factory, SimTime::from_whole(10));
        // Both short rests finish, but the third task is NOT pulled this
        // pulse: the remainder after the one replacement goes idle.
        assert_eq!(outcomes.len(), 2);
        assert!(manager.active().is_none());
        assert_eq!(manager.idle_time(), SimTime::from_whole(5));
    }

    #[test]
    fn effort_driven_task_withheld_from_zero_rated_agent() {
        let (mut colonist, mut settlement, mut malfunctions) = parts();
        colonist.set_performance(Decimal::ZERO);
        let workshop = settlement.add_facility(outpost_world::Facility::new(
            "machine shop",
            outpost_world::FacilityKind::WorkshopStation,
            SimTime::from_whole(5),
        ));
        let airlock = settlement.add_facility(outpost_world::Facility::new(
            "airlock A",
            outpost_world::FacilityKind::Airlock,
            SimTime::from_whole(50),
        ));
        let mut ctx = TaskContext {
            colonist: &mut colonist,
            settlement: &mut settlement,
            malfunctions: &mut malfunctions,
            now: SimTime::ZERO,
        };
        let mut manager = TaskManager::new();
        let mut factory = QueueFactory {
            queue: vec![Task::maintenance(workshop, airlock)],
        };

        let outcomes = manager.advance(&mut ctx, &mut factory, SimTime::from_whole(10));
        assert!(outcomes.is_empty());
        assert!(manager.active().is_none());
        assert_eq!(manager.idle_time(), SimTime::from_whole(10));
    }

    #[test]
    fn clear_preempts_with_reason() {
        let (mut colonist, mut settlement, mut malfunctions) = parts();
        let mut ctx = TaskContext {
            colonist: &mut colonist,
            settlement: &mut settlement,
            malfunctions: &mut malfunctions,
            now: SimTime::ZERO,
        };
        let mut manager = TaskManager::new();
        let mut factory = QueueFactory {
            queue: vec![Task::rest(SimTime::from_whole(50))],
        };
        let _ = manager.advance(&mut ctx, &mut factory, SimTime::from_whole(10));
        assert!(manager.active().is_some());

        let outcome = manager.clear(&mut ctx, "low battery").unwrap();
        assert!(matches!(
            outcome,
            TaskOutcome::Failed { reason, .. } if reason == "low battery"
        ));
        assert!(manager.active().is_none());
        assert!(manager.clear(&mut ctx, "again").is_none());
    }
}
