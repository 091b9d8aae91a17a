//! The resumable task state machine.
//!
//! A [`Task`] is a stack of phases with an optional nested sub-task. Its
//! single behavioural contract is [`Task::step`]: feed in a span of pulse
//! time, get back whatever the task could not use. A phase may consume all
//! of the span, none of it (blocked on a resource gate -- the caller
//! retries next pulse), or part of it with a free transition to another
//! phase that is re-dispatched immediately within the same call.
//!
//! Time accounting is exact: the time consumed across the whole phase
//! chain of one `step` call plus the returned remainder always equals the
//! input span. Unconsumed time is returned, never silently dropped.
//!
//! Failure is data, not panic. A phase that hits an unrecoverable
//! precondition ends the task with a reason string; the task manager logs
//! it and selects a replacement. Nothing here returns `Result` across the
//! step boundary.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use outpost_types::{Colonist, FacilityId, SimTime};
use outpost_world::{MalfunctionRegistry, Settlement};

/// Mutable world access handed to a task for the duration of one step.
///
/// The context borrows exactly what phase logic may touch: the acting
/// colonist, the settlement's facilities and gates, and the malfunction
/// registry. Phases never reach outside it.
pub struct TaskContext<'a> {
    /// The colonist executing the task.
    pub colonist: &'a mut Colonist,
    /// The settlement (facilities and their gates).
    pub settlement: &'a mut Settlement,
    /// The malfunction registry (repair targets).
    pub malfunctions: &'a mut MalfunctionRegistry,
    /// Simulated time at the start of the current pulse.
    pub now: SimTime,
}

/// Phase identifiers shared across all task kinds.
///
/// A task declares the subset it uses; setting an undeclared phase is an
/// invariant violation that defensively ends the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskPhase {
    /// Moving to the facility (delegates to a walk sub-task).
    Approach,
    /// Requesting the facility's resource gate.
    Request,
    /// Refilling suit consumable reserves.
    Procure,
    /// Feeding activation time into a held gate.
    Cycle,
    /// Using the granted facility (repairing, driving).
    Operate,
    /// A walk task's single phase.
    Walking,
    /// A rest task's single phase.
    Resting,
    /// A recharge task's single phase.
    Recharging,
}

/// What a task is, with the per-kind state its phases read and write.
///
/// Kinds are a closed, serializable set -- the phase table is a `match`,
/// so adding a kind without handling its phases fails to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    /// Walk for a fixed span of time.
    Walk {
        /// Walking time still required.
        duration_remaining: SimTime,
    },
    /// Pass through an airlock to the surface.
    Egress {
        /// The airlock to pass through.
        airlock: FacilityId,
        /// Time left in the reserve-procurement phase, when entered.
        procure_remaining: SimTime,
    },
    /// Repair a malfunctioning facility from a workshop station.
    Maintenance {
        /// The workshop station to work from.
        workshop: FacilityId,
        /// The facility whose malfunction is being repaired.
        target: FacilityId,
    },
    /// Check a vehicle out of its bay and drive it.
    VehicleCheckout {
        /// The vehicle bay (its gate is the operator seat).
        bay: FacilityId,
        /// Driving time still required.
        drive_remaining: SimTime,
    },
    /// Rest for a fixed span of time.
    Rest {
        /// Resting time still required.
        duration_remaining: SimTime,
    },
    /// Recharge a robot's battery to full.
    Recharge,
}

impl TaskKind {
    /// The phases this kind declares, in canonical order.
    pub const fn phases(self) -> &'static [TaskPhase] {
        match self {
            Self::Walk { .. } => &[TaskPhase::Walking],
            Self::Egress { .. } => &[
                TaskPhase::Approach,
                TaskPhase::Request,
                TaskPhase::Procure,
                TaskPhase::Cycle,
            ],
            Self::Maintenance { .. } | Self::VehicleCheckout { .. } => &[
                TaskPhase::Approach,
                TaskPhase::Request,
                TaskPhase::Cycle,
                TaskPhase::Operate,
            ],
            Self::Rest { .. } => &[TaskPhase::Resting],
            Self::Recharge => &[TaskPhase::Recharging],
        }
    }
}

/// The single-slot nested sub-task state machine.
///
/// A task owns at most one sub-task. The slot makes the three states
/// explicit instead of scattering `Option` checks through phase bodies:
/// empty, delegating to a live sub-task, or holding the completion signal
/// the parent phase consumes to transition.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub enum SubTaskSlot {
    /// No sub-task.
    #[default]
    Idle,
    /// A sub-task is running; pulse time is delegated to it first.
    Delegating(Box<Task>),
    /// The sub-task finished; the parent phase has not yet acknowledged.
    Done,
}

impl SubTaskSlot {
    /// Whether a live sub-task holds the slot.
    pub const fn is_delegating(&self) -> bool {
        matches!(self, Self::Delegating(_))
    }

    /// Whether a sub-task finished and awaits acknowledgement.
    pub const fn completed(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Acknowledge a completed sub-task, returning the slot to idle.
    pub fn acknowledge(&mut self) {
        if matches!(self, Self::Done) {
            *self = Self::Idle;
        }
    }
}

/// A resumable, per-agent activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Display name for logs and duration metrics.
    pub(crate) name: String,
    /// The kind and its per-kind state.
    pub(crate) kind: TaskKind,
    /// Current phase; `None` before the first dispatch.
    pub(crate) current: Option<TaskPhase>,
    /// Terminal flag; a done task is never stepped again.
    pub(crate) done: bool,
    /// Failure reason, if the task ended abnormally.
    pub(crate) end_reason: Option<String>,
    /// The nested sub-task slot.
    pub(crate) subtask: SubTaskSlot,
    /// Total time this task (and its sub-tasks) has consumed.
    pub(crate) elapsed: SimTime,
    /// Whether assignment requires a non-zero performance rating.
    pub(crate) effort_driven: bool,
}

impl Task {
    /// Create a task of the given kind.
    pub fn new(name: impl Into<String>, kind: TaskKind, effort_driven: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            current: None,
            done: false,
            end_reason: None,
            subtask: SubTaskSlot::Idle,
            elapsed: SimTime::ZERO,
            effort_driven,
        }
    }

    /// The task's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The task's kind and per-kind state.
    pub const fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Whether the task has reached its terminal state.
    pub const fn is_done(&self) -> bool {
        self.done
    }

    /// The failure reason, if the task ended abnormally.
    pub fn end_reason(&self) -> Option<&str> {
        self.end_reason.as_deref()
    }

    /// The current phase, `None` before the first dispatch.
    pub const fn current_phase(&self) -> Option<TaskPhase> {
        self.current
    }

    /// Whether assignment requires a non-zero performance rating.
    pub const fn is_effort_driven(&self) -> bool {
        self.effort_driven
    }

    /// Total time this task and its sub-tasks have consumed.
    pub const fn elapsed(&self) -> SimTime {
        self.elapsed
    }

    /// The sub-task slot (for tests and diagnostics).
    pub const fn subtask(&self) -> &SubTaskSlot {
        &self.subtask
    }

    /// Feed `delta` of pulse time into the task. Returns the unconsumed
    /// remainder.
    ///
    /// Stepping a done task is a no-op that returns `delta` unchanged.
    pub fn step(&mut self, ctx: &mut TaskContext<'_>, delta: SimTime) -> SimTime {
        if self.done {
            return delta;
        }
        let mut remaining = delta;

        // A live sub-task is served first; whatever it consumes counts
        // against this task, and only the leftover reaches our own phase.
        let before = remaining;
        remaining = self.run_subtask(ctx, remaining);
        let consumed = before.saturating_sub(remaining);
        self.record_consumed(consumed);

        // Enter the first declared phase on the first dispatch.
        if self.current.is_none() {
            match self.kind.phases().first().copied() {
                Some(first) => self.current = Some(first),
                None => {
                    self.end_with(Some(String::from("task declares no phases")));
                    return remaining;
                }
            }
        }

        // Dispatch phases until the span is exhausted, the task ends, or
        // the current phase blocks. Transitions are free: a phase that
        // consumes part of the span and moves on hands the rest to the
        // next phase within this same call.
        loop {
            if self.done || remaining.is_zero() {
                break;
            }
            let Some(phase) = self.current else {
                break;
            };
            let before_phase = self.current;
            let before_remaining = remaining;

            remaining = self.dispatch(ctx, phase, remaining);

            let consumed = before_remaining.saturating_sub(remaining);
            self.record_consumed(consumed);

            let transitioned = self.current != before_phase;
            if !transitioned && !self.done {
                // Same phase, not done: either the span is exhausted or
                // the phase is blocked (gate queue, waiting sub-task).
                // Either way there is nothing more to do this pulse.
                break;
            }
        }

        remaining
    }

    /// Forcibly end the task, releasing any gate involvement.
    ///
    /// Used by the task manager for pre-emption ("low battery") and by
    /// mission teardown. Safe to call on a done task.
    pub fn cancel(&mut self, ctx: &mut TaskContext<'_>, reason: &str) {
        if self.done {
            return;
        }
        if let SubTaskSlot::Delegating(sub) = &mut self.subtask {
            sub.cancel(ctx, reason);
        }
        self.release_gate_involvement(ctx);
        self.end_with(Some(reason.to_owned()));
    }

    /// Walk away from any gate this task's kind is engaged with.
    fn release_gate_involvement(&mut self, ctx: &mut TaskContext<'_>) {
        let facility = match self.kind {
            TaskKind::Egress { airlock, .. } => Some(airlock),
            TaskKind::Maintenance { workshop, .. } => Some(workshop),
            TaskKind::VehicleCheckout { bay, .. } => Some(bay),
            TaskKind::Walk { .. } | TaskKind::Rest { .. } | TaskKind::Recharge => None,
        };
        let Some(facility) = facility else { return };
        let agent = ctx.colonist.id;
        if let Ok(f) = ctx.settlement.facility_mut(facility) {
            let gate = f.gate_mut();
            if gate.operator() == Some(agent) {
                let _ = gate.release(agent);
            } else {
                let _ = gate.withdraw(agent);
            }
        }
    }

    /// Transition to another declared phase. Transitions are free -- they
    /// consume no time. Setting an undeclared phase is an invariant
    /// violation that defensively ends the task.
    pub(crate) fn set_phase(&mut self, phase: TaskPhase) {
        if self.kind.phases().contains(&phase) {
            debug!(task = %self.name, ?phase, "phase transition");
            self.current = Some(phase);
        } else {
            warn!(task = %self.name, ?phase, "undeclared phase requested");
            self.end_with(Some(format!("undeclared phase {phase:?}")));
        }
    }

    /// Mark the task done. `reason` is `None` for normal completion.
    pub(crate) fn end_with(&mut self, reason: Option<String>) {
        self.done = true;
        self.end_reason = reason;
        self.current = None;
    }

    /// Install a sub-task. The slot must be idle; a second concurrent
    /// sub-task is an invariant violation and is dropped.
    pub(crate) fn push_subtask(&mut self, sub: Self) {
        if matches!(self.subtask, SubTaskSlot::Idle) {
            self.subtask = SubTaskSlot::Delegating(Box::new(sub));
        } else {
            warn!(task = %self.name, "sub-task slot already occupied; dropping");
        }
    }

    /// Add consumed time to the task's running total.
    fn record_consumed(&mut self, consumed: SimTime) {
        self.elapsed = self.elapsed.checked_add(consumed).unwrap_or(self.elapsed);
    }

    /// Delegate `span` to the live sub-task, if any, and mark the slot
    /// completed when the sub-task finishes. Returns the leftover.
    pub(crate) fn run_subtask(&mut self, ctx: &mut TaskContext<'_>, span: SimTime) -> SimTime {
        let SubTaskSlot::Delegating(sub) = &mut self.subtask else {
            return span;
        };
        let left = sub.step(ctx, span);
        if sub.is_done() {
            self.subtask = SubTaskSlot::Done;
        }
        left
    }

    /// Route a phase dispatch to the kind's handler.
    fn dispatch(&mut self, ctx: &mut TaskContext<'_>, phase: TaskPhase, span: SimTime) -> SimTime {
        match self.kind {
            TaskKind::Walk { .. } => self.step_walk(phase, span),
            TaskKind::Egress { .. } => self.step_egress(ctx, phase, span),
            TaskKind::Maintenance { .. } => self.step_maintenance(ctx, phase, span),
            TaskKind::VehicleCheckout { .. } => self.step_vehicle(ctx, phase, span),
            TaskKind::Rest { .. } => self.step_rest(phase, span),
            TaskKind::Recharge => self.step_recharge(ctx, phase, span),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use outpost_types::{AgentKind, JobKind};

    fn context_parts() -> (Colonist, Settlement, MalfunctionRegistry) {
        (
            Colonist::new("Ada", AgentKind::Person, JobKind::Engineer),
            Settlement::new("Base Alpha"),
            MalfunctionRegistry::default(),
        )
    }

    #[test]
    fn stepping_a_done_task_is_identity() {
        let (mut colonist, mut settlement, mut malfunctions) = context_parts();
        let mut ctx = TaskContext {
            colonist: &mut colonist,
            settlement: &mut settlement,
            malfunctions: &mut malfunctions,
            now: SimTime::ZERO,
        };

        let mut task = Task::new(
            "rest",
            TaskKind::Rest {
                duration_remaining: SimTime::from_whole(5),
            },
            false,
        );
        let left = task.step(&mut ctx, SimTime::from_whole(10));
        assert!(task.is_done());
        assert_eq!(left, SimTime::from_whole(5));

        // Any further step returns the span unchanged and mutates nothing.
        let elapsed = task.elapsed();
        let left = task.step(&mut ctx, SimTime::from_whole(42));
        assert_eq!(left, SimTime::from_whole(42));
        assert_eq!(task.elapsed(), elapsed);
        assert!(task.is_done());
    }

    #[test]
    fn first_step_enters_first_declared_phase() {
        let (mut colonist, mut settlement, mut malfunctions) = context_parts();
        let mut ctx = TaskContext {
            colonist: &mut colonist,
            settlement: &mut settlement,
            malfunctions: &mut malfunctions,
            now: SimTime::ZERO,
        };

        let mut task = Task::new(
            "walk",
            TaskKind::Walk {
                duration_remaining: SimTime::from_whole(10),
            },
            false,
        );
        assert_eq!(task.current_phase(), None);
        let _ = task.step(&mut ctx, SimTime::from_whole(3));
        assert_eq!(task.current_phase(), Some(TaskPhase::Walking));
        assert!(!task.is_done());
    }

    #[test]
    fn time_conservation_for_partial_consumption() {
        let (mut colonist, mut settlement, mut malfunctions) = context_parts();
        let mut ctx = TaskContext {
            colonist: &mut colonist,
            settlement: &mut settlement,
            malfunctions: &mut malfunctions,
            now: SimTime::ZERO,
        };

        let mut task = Task::new(
            "rest",
            TaskKind::Rest {
                duration_remaining: SimTime::from_whole(7),
            },
            false,
        );
        let delta = SimTime::from_whole(10);
        let left = task.step(&mut ctx, delta);
        assert_eq!(task.elapsed().checked_add(left).unwrap(), delta);
    }

    #[test]
    fn undeclared_phase_defensively_ends_task() {
        let mut task = Task::new(
            "rest",
            TaskKind::Rest {
                duration_remaining: SimTime::from_whole(5),
            },
            false,
        );
        task.set_phase(TaskPhase::Cycle);
        assert!(task.is_done());
        assert!(task.end_reason().is_some());
    }

    #[test]
    fn second_subtask_is_dropped() {
        let mut parent = Task::new(
            "rest",
            TaskKind::Rest {
                duration_remaining: SimTime::from_whole(5),
            },
            false,
        );
        let walk = |t: u64| {
            Task::new(
                "walk",
                TaskKind::Walk {
                    duration_remaining: SimTime::from_whole(t),
                },
                false,
            )
        };
        parent.push_subtask(walk(1));
        parent.push_subtask(walk(2));
        assert!(parent.subtask().is_delegating());
    }

    #[test]
    fn cancel_marks_done_with_reason() {
        let (mut colonist, mut settlement, mut malfunctions) = context_parts();
        let mut ctx = TaskContext {
            colonist: &mut colonist,
            settlement: &mut settlement,
            malfunctions: &mut malfunctions,
            now: SimTime::ZERO,
        };

        let mut task = Task::new(
            "rest",
            TaskKind::Rest {
                duration_remaining: SimTime::from_whole(5),
            },
            false,
        );
        task.cancel(&mut ctx, "low battery");
        assert!(task.is_done());
        assert_eq!(task.end_reason(), Some("low battery"));
    }
}
