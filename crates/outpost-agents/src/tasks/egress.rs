//! Airlock egress: walk to the airlock, secure the chamber, run the
//! pressure cycle, and step onto the surface.
//!
//! This task exercises every contention path the airlock gate offers:
//! queueing behind another operator, denial for thin suit reserves with
//! re-entry through a procurement phase, and the activation countdown.

use outpost_types::{FacilityId, SimTime};
use tracing::warn;

use crate::task::{Task, TaskContext, TaskKind, TaskPhase};
use crate::tasks::approach_walk_time;
use outpost_world::{CycleOutcome, DenialReason, RequestOutcome};

/// Suit reserve percentage consumed by one pass through the airlock.
const EGRESS_RESERVE_COST_PCT: u32 = 15;

/// Time to draw and fit fresh suit consumables.
fn procure_time() -> SimTime {
    SimTime::from_whole(30)
}

impl Task {
    /// Create an egress task through the given airlock.
    pub fn egress(airlock: FacilityId) -> Self {
        Self::new(
            "airlock egress",
            TaskKind::Egress {
                airlock,
                procure_remaining: procure_time(),
            },
            false,
        )
    }

    /// Phase handler for [`TaskKind::Egress`].
    pub(crate) fn step_egress(
        &mut self,
        ctx: &mut TaskContext<'_>,
        phase: TaskPhase,
        span: SimTime,
    ) -> SimTime {
        match phase {
            TaskPhase::Approach => self.egress_approach(ctx, span),
            TaskPhase::Request => self.egress_request(ctx, span),
            TaskPhase::Procure => self.egress_procure(ctx, span),
            TaskPhase::Cycle => self.egress_cycle(ctx, span),
            other => {
                warn!(task = %self.name, ?other, "egress dispatched to foreign phase");
                self.end_with(Some(format!("egress cannot run phase {other:?}")));
                span
            }
        }
    }

    /// Walk to the airlock via a nested walk sub-task.
    fn egress_approach(&mut self, ctx: &mut TaskContext<'_>, span: SimTime) -> SimTime {
        if self.subtask.completed() {
            self.subtask.acknowledge();
            self.set_phase(TaskPhase::Request);
            return span;
        }
        if !self.subtask.is_delegating() {
            self.push_subtask(Self::walk(approach_walk_time()));
        }
        let left = self.run_subtask(ctx, span);
        if self.subtask.completed() {
            self.subtask.acknowledge();
            self.set_phase(TaskPhase::Request);
        }
        left
    }

    /// Ask the airlock for the chamber.
    fn egress_request(&mut self, ctx: &mut TaskContext<'_>, span: SimTime) -> SimTime {
        let TaskKind::Egress { airlock, .. } = self.kind else {
            self.end_with(Some(String::from("egress phase on non-egress task")));
            return span;
        };
        let facility = match ctx.settlement.facility_mut(airlock) {
            Ok(facility) => facility,
            Err(err) => {
                self.end_with(Some(format!("airlock unavailable: {err}")));
                return span;
            }
        };
        match facility.request_access(ctx.colonist) {
            RequestOutcome::Operator => {
                self.set_phase(TaskPhase::Cycle);
                span
            }
            // Queued: hold position and retry next pulse.
            RequestOutcome::Queued => span,
            RequestOutcome::Denied(DenialReason::InsufficientReserves { .. }) => {
                self.set_phase(TaskPhase::Procure);
                span
            }
            RequestOutcome::Denied(DenialReason::OutOfService) => {
                self.end_with(Some(String::from("airlock out of service")));
                span
            }
        }
    }

    /// Draw fresh suit consumables, then retry the request.
    fn egress_procure(&mut self, ctx: &mut TaskContext<'_>, span: SimTime) -> SimTime {
        let TaskKind::Egress {
            procure_remaining, ..
        } = &mut self.kind
        else {
            self.end_with(Some(String::from("egress phase on non-egress task")));
            return span;
        };

        let consumed = span.min(*procure_remaining);
        *procure_remaining = procure_remaining.saturating_sub(consumed);
        let stocked = procure_remaining.is_zero();
        if stocked {
            *procure_remaining = procure_time();
        }
        let left = span.saturating_sub(consumed);

        if stocked {
            ctx.colonist.refill_suit_reserve();
            self.set_phase(TaskPhase::Request);
        }
        left
    }

    /// Feed pulse time into the pressure cycle; step out when granted.
    fn egress_cycle(&mut self, ctx: &mut TaskContext<'_>, span: SimTime) -> SimTime {
        let TaskKind::Egress { airlock, .. } = self.kind else {
            self.end_with(Some(String::from("egress phase on non-egress task")));
            return span;
        };
        let agent = ctx.colonist.id;
        let facility = match ctx.settlement.facility_mut(airlock) {
            Ok(facility) => facility,
            Err(err) => {
                self.end_with(Some(format!("airlock unavailable: {err}")));
                return span;
            }
        };
        match facility.gate_mut().add_cycle_time(agent, span) {
            CycleOutcome::NotOperator => {
                self.end_with(Some(String::from("lost the airlock operator slot")));
                span
            }
            CycleOutcome::InProgress { .. } => SimTime::ZERO,
            CycleOutcome::Granted { unused } => {
                let _ = facility.gate_mut().release(agent);
                ctx.colonist.spend_suit_reserve(EGRESS_RESERVE_COST_PCT);
                self.end_with(None);
                unused
            }
        }
    }
}
