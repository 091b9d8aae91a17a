//! Vehicle checkout: take the operator seat, run the pre-drive
//! inspection, drive, and return the vehicle to its bay.

use outpost_types::{FacilityId, SimTime};
use tracing::warn;

use outpost_world::{CycleOutcome, DenialReason, RequestOutcome};

use crate::task::{Task, TaskContext, TaskKind, TaskPhase};
use crate::tasks::approach_walk_time;

impl Task {
    /// Create a checkout task for the vehicle in `bay`, driving for
    /// `drive_time`.
    pub fn vehicle_checkout(bay: FacilityId, drive_time: SimTime) -> Self {
        Self::new(
            "vehicle checkout",
            TaskKind::VehicleCheckout {
                bay,
                drive_remaining: drive_time,
            },
            false,
        )
    }

    /// Phase handler for [`TaskKind::VehicleCheckout`].
    pub(crate) fn step_vehicle(
        &mut self,
        ctx: &mut TaskContext<'_>,
        phase: TaskPhase,
        span: SimTime,
    ) -> SimTime {
        match phase {
            TaskPhase::Approach => self.vehicle_approach(ctx, span),
            TaskPhase::Request => self.vehicle_request(ctx, span),
            TaskPhase::Cycle => self.vehicle_cycle(ctx, span),
            TaskPhase::Operate => self.vehicle_operate(ctx, span),
            other => {
                warn!(task = %self.name, ?other, "checkout dispatched to foreign phase");
                self.end_with(Some(format!("checkout cannot run phase {other:?}")));
                span
            }
        }
    }

    /// Walk to the bay via a nested walk sub-task.
    fn vehicle_approach(&mut self, ctx: &mut TaskContext<'_>, span: SimTime) -> SimTime {
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

    /// Ask for the operator seat.
    fn vehicle_request(&mut self, ctx: &mut TaskContext<'_>, span: SimTime) -> SimTime {
        let TaskKind::VehicleCheckout { bay, .. } = self.kind else {
            self.end_with(Some(String::from("checkout phase on foreign task")));
            return span;
        };
        let facility = match ctx.settlement.facility_mut(bay) {
            Ok(facility) => facility,
            Err(err) => {
                self.end_with(Some(format!("vehicle bay unavailable: {err}")));
                return span;
            }
        };
        match facility.request_access(ctx.colonist) {
            RequestOutcome::Operator => {
                self.set_phase(TaskPhase::Cycle);
                span
            }
            RequestOutcome::Queued => span,
            RequestOutcome::Denied(DenialReason::OutOfService) => {
                self.end_with(Some(String::from("vehicle bay out of service")));
                span
            }
            RequestOutcome::Denied(DenialReason::InsufficientReserves { .. }) => {
                self.end_with(Some(String::from("vehicle bay denied access")));
                span
            }
        }
    }

    /// Run the pre-drive inspection (the seat's activation countdown).
    fn vehicle_cycle(&mut self, ctx: &mut TaskContext<'_>, span: SimTime) -> SimTime {
        let TaskKind::VehicleCheckout { bay, .. } = self.kind else {
            self.end_with(Some(String::from("checkout phase on foreign task")));
            return span;
        };
        let agent = ctx.colonist.id;
        let facility = match ctx.settlement.facility_mut(bay) {
            Ok(facility) => facility,
            Err(err) => {
                self.end_with(Some(format!("vehicle bay unavailable: {err}")));
                return span;
            }
        };
        match facility.gate_mut().add_cycle_time(agent, span) {
            CycleOutcome::NotOperator => {
                self.end_with(Some(String::from("lost the operator seat")));
                span
            }
            CycleOutcome::InProgress { .. } => SimTime::ZERO,
            CycleOutcome::Granted { unused } => {
                self.set_phase(TaskPhase::Operate);
                unused
            }
        }
    }

    /// Drive, then park and release the seat.
    fn vehicle_operate(&mut self, ctx: &mut TaskContext<'_>, span: SimTime) -> SimTime {
        let TaskKind::VehicleCheckout {
            bay,
            drive_remaining,
        } = &mut self.kind
        else {
            self.end_with(Some(String::from("checkout phase on foreign task")));
            return span;
        };
        let bay = *bay;

        let consumed = span.min(*drive_remaining);
        *drive_remaining = drive_remaining.saturating_sub(consumed);
        let parked = drive_remaining.is_zero();
        let left = span.saturating_sub(consumed);

        if parked {
            let agent = ctx.colonist.id;
            if let Ok(facility) = ctx.settlement.facility_mut(bay) {
                let _ = facility.gate_mut().release(agent);
            }
            self.end_with(None);
        }
        left
    }
}
