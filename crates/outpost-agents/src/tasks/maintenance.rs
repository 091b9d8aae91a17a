//! Workshop maintenance: secure a workshop station and work a filed
//! malfunction down to zero.
//!
//! Maintenance is effort-driven: the work a pulse contributes is the time
//! spent scaled by the repairer's performance rating. The task manager
//! never assigns it to an agent rated at zero, and the operate phase
//! re-checks defensively.

use rust_decimal::Decimal;
use tracing::warn;

use outpost_types::{FacilityId, SimTime};
use outpost_world::{CycleOutcome, DenialReason, RepairOutcome, RequestOutcome};

use crate::task::{Task, TaskContext, TaskKind, TaskPhase};
use crate::tasks::approach_walk_time;

impl Task {
    /// Create a maintenance task repairing `target` from `workshop`.
    pub fn maintenance(workshop: FacilityId, target: FacilityId) -> Self {
        Self::new(
            "workshop maintenance",
            TaskKind::Maintenance { workshop, target },
            true,
        )
    }

    /// Phase handler for [`TaskKind::Maintenance`].
    pub(crate) fn step_maintenance(
        &mut self,
        ctx: &mut TaskContext<'_>,
        phase: TaskPhase,
        span: SimTime,
    ) -> SimTime {
        match phase {
            TaskPhase::Approach => self.maintenance_approach(ctx, span),
            TaskPhase::Request => self.maintenance_request(ctx, span),
            TaskPhase::Cycle => self.maintenance_cycle(ctx, span),
            TaskPhase::Operate => self.maintenance_operate(ctx, span),
            other => {
                warn!(task = %self.name, ?other, "maintenance dispatched to foreign phase");
                self.end_with(Some(format!("maintenance cannot run phase {other:?}")));
                span
            }
        }
    }

    /// Walk to the workshop via a nested walk sub-task.
    fn maintenance_approach(&mut self, ctx: &mut TaskContext<'_>, span: SimTime) -> SimTime {
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

    /// Ask for the workshop station slot.
    fn maintenance_request(&mut self, ctx: &mut TaskContext<'_>, span: SimTime) -> SimTime {
        let TaskKind::Maintenance { workshop, .. } = self.kind else {
            self.end_with(Some(String::from("maintenance phase on foreign task")));
            return span;
        };
        let facility = match ctx.settlement.facility_mut(workshop) {
            Ok(facility) => facility,
            Err(err) => {
                self.end_with(Some(format!("workshop unavailable: {err}")));
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
                self.end_with(Some(String::from("workshop out of service")));
                span
            }
            RequestOutcome::Denied(DenialReason::InsufficientReserves { .. }) => {
                // Workshops carry no reserve precondition; treat a denial
                // here as unrecoverable misconfiguration.
                self.end_with(Some(String::from("workshop denied access")));
                span
            }
        }
    }

    /// Set up the station (the gate's activation countdown).
    fn maintenance_cycle(&mut self, ctx: &mut TaskContext<'_>, span: SimTime) -> SimTime {
        let TaskKind::Maintenance { workshop, .. } = self.kind else {
            self.end_with(Some(String::from("maintenance phase on foreign task")));
            return span;
        };
        let agent = ctx.colonist.id;
        let facility = match ctx.settlement.facility_mut(workshop) {
            Ok(facility) => facility,
            Err(err) => {
                self.end_with(Some(format!("workshop unavailable: {err}")));
                return span;
            }
        };
        match facility.gate_mut().add_cycle_time(agent, span) {
            CycleOutcome::NotOperator => {
                self.end_with(Some(String::from("lost the workshop station slot")));
                span
            }
            CycleOutcome::InProgress { .. } => SimTime::ZERO,
            CycleOutcome::Granted { unused } => {
                self.set_phase(TaskPhase::Operate);
                unused
            }
        }
    }

    /// Contribute repair work scaled by performance.
    fn maintenance_operate(&mut self, ctx: &mut TaskContext<'_>, span: SimTime) -> SimTime {
        let TaskKind::Maintenance { workshop, target } = self.kind else {
            self.end_with(Some(String::from("maintenance phase on foreign task")));
            return span;
        };
        let rating = ctx.colonist.performance;
        if rating <= Decimal::ZERO {
            self.release_station(ctx, workshop);
            self.end_with(Some(String::from("no effective performance for repairs")));
            return span;
        }

        let Some(active) = ctx.malfunctions.active_on(target) else {
            // The malfunction cleared before we reached the bench.
            self.release_station(ctx, workshop);
            self.end_with(Some(String::from("no active malfunction to repair")));
            return span;
        };
        let work_needed = active.work_remaining;

        // Time this repairer needs to finish the remaining work.
        let time_to_finish = work_needed
            .millisols()
            .checked_div(rating)
            .and_then(SimTime::from_millisols);
        let Some(time_to_finish) = time_to_finish else {
            self.release_station(ctx, workshop);
            self.end_with(Some(String::from("repair time computation failed")));
            return span;
        };

        if span >= time_to_finish {
            // Finish the job and hand back what the repair did not need.
            let result =
                ctx.malfunctions
                    .contribute_repair(ctx.settlement, target, work_needed);
            if let Err(err) = result {
                warn!(task = %self.name, %err, "repair contribution rejected");
            }
            self.release_station(ctx, workshop);
            self.end_with(None);
            span.saturating_sub(time_to_finish)
        } else {
            // Partial shift: all offered time becomes scaled work.
            let work = span.checked_scale(rating).unwrap_or(SimTime::ZERO);
            let result = ctx
                .malfunctions
                .contribute_repair(ctx.settlement, target, work);
            match result {
                Ok(RepairOutcome::InProgress { .. }) => SimTime::ZERO,
                Ok(RepairOutcome::Cleared { .. }) => {
                    // Rounding in the division can land the finish inside
                    // this span; wrap up cleanly.
                    self.release_station(ctx, workshop);
                    self.end_with(None);
                    SimTime::ZERO
                }
                Err(err) => {
                    warn!(task = %self.name, %err, "repair contribution rejected");
                    self.release_station(ctx, workshop);
                    self.end_with(Some(String::from("repair target vanished")));
                    SimTime::ZERO
                }
            }
        }
    }

    /// Release the workshop station gate if we hold it.
    fn release_station(&mut self, ctx: &mut TaskContext<'_>, workshop: FacilityId) {
        let agent = ctx.colonist.id;
        if let Ok(facility) = ctx.settlement.facility_mut(workshop) {
            let _ = facility.gate_mut().release(agent);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use outpost_types::{AgentKind, Colonist, JobKind};
    use outpost_world::{Facility, FacilityKind, MalfunctionRegistry, Settlement};

    /// Settlement with a workshop (setup 5), a broken airlock, and a
    /// registry whose malfunction needs 40 work.
    fn setup() -> (Settlement, MalfunctionRegistry, FacilityId, FacilityId) {
        let mut settlement = Settlement::new("Base Alpha");
        let workshop = settlement.add_facility(Facility::new(
            "machine shop",
            FacilityKind::WorkshopStation,
            SimTime::from_whole(5),
        ));
        let airlock = settlement.add_facility(Facility::new(
            "airlock A",
            FacilityKind::Airlock,
            SimTime::from_whole(50),
        ));
        let mut registry = MalfunctionRegistry::new(
            Decimal::ONE,
            Decimal::new(10, 0),
            SimTime::from_whole(40),
        );
        // Push the airlock over the filing threshold.
        let filed = registry.accrue_wear(
            &mut settlement,
            SimTime::from_whole(1),
            SimTime::from_whole(10),
        );
        assert!(filed.contains(&airlock));
        // The workshop also accrued wear; keep only the airlock broken.
        let _ = registry.contribute_repair(&mut settlement, workshop, SimTime::from_whole(40));
        (settlement, registry, workshop, airlock)
    }

    #[test]
    fn full_repair_restores_service() {
        let (mut settlement, mut registry, workshop, airlock) = setup();
        let mut colonist = Colonist::new("Ada", AgentKind::Person, JobKind::Technician);
        let mut ctx = TaskContext {
            colonist: &mut colonist,
            settlement: &mut settlement,
            malfunctions: &mut registry,
            now: SimTime::ZERO,
        };
        let mut task = Task::maintenance(workshop, airlock);

        // Walk 10 + setup 5 + 40 work at rating 1.0 = 55.
        let left = task.step(&mut ctx, SimTime::from_whole(70));
        assert!(task.is_done());
        assert_eq!(task.end_reason(), None);
        assert_eq!(left, SimTime::from_whole(15));
        assert!(!ctx.settlement.facility(airlock).unwrap().is_out_of_service());
        assert_eq!(ctx.malfunctions.active_count(), 0);
        // The station slot was released.
        assert_eq!(
            ctx.settlement
                .facility(workshop)
                .unwrap()
                .gate()
                .operator(),
            None
        );
    }

    #[test]
    fn half_rated_repairer_takes_twice_the_time() {
        let (mut settlement, mut registry, workshop, airlock) = setup();
        let mut colonist = Colonist::new("Ada", AgentKind::Person, JobKind::Technician);
        colonist.set_performance(Decimal::new(5, 1));
        let mut ctx = TaskContext {
            colonist: &mut colonist,
            settlement: &mut settlement,
            malfunctions: &mut registry,
            now: SimTime::ZERO,
        };
        let mut task = Task::maintenance(workshop, airlock);

        // Walk 10 + setup 5 + 40 work at rating 0.5 = 80 time = 95 total.
        let left = task.step(&mut ctx, SimTime::from_whole(100));
        assert!(task.is_done());
        assert_eq!(task.end_reason(), None);
        assert_eq!(left, SimTime::from_whole(5));
    }

    #[test]
    fn partial_shifts_accumulate_scaled_work() {
        let (mut settlement, mut registry, workshop, airlock) = setup();
        let mut colonist = Colonist::new("Ada", AgentKind::Person, JobKind::Technician);
        let mut ctx = TaskContext {
            colonist: &mut colonist,
            settlement: &mut settlement,
            malfunctions: &mut registry,
            now: SimTime::ZERO,
        };
        let mut task = Task::maintenance(workshop, airlock);

        // First pulse: walk 10 + setup 5 + 10 of repair.
        let left = task.step(&mut ctx, SimTime::from_whole(25));
        assert_eq!(left, SimTime::ZERO);
        assert!(!task.is_done());
        assert_eq!(
            ctx.malfunctions.active_on(airlock).unwrap().work_remaining,
            SimTime::from_whole(30)
        );

        // Second pulse finishes the remaining 30 work.
        let left = task.step(&mut ctx, SimTime::from_whole(35));
        assert!(task.is_done());
        assert_eq!(left, SimTime::from_whole(5));
    }

    #[test]
    fn vanished_malfunction_ends_with_reason() {
        let (mut settlement, mut registry, workshop, airlock) = setup();
        // Someone else fixes the airlock first.
        let _ = registry.contribute_repair(&mut settlement, airlock, SimTime::from_whole(40));

        let mut colonist = Colonist::new("Ada", AgentKind::Person, JobKind::Technician);
        let mut ctx = TaskContext {
            colonist: &mut colonist,
            settlement: &mut settlement,
            malfunctions: &mut registry,
            now: SimTime::ZERO,
        };
        let mut task = Task::maintenance(workshop, airlock);

        let _ = task.step(&mut ctx, SimTime::from_whole(30));
        assert!(task.is_done());
        assert_eq!(
            task.end_reason(),
            Some("no active malfunction to repair")
        );
    }
}
