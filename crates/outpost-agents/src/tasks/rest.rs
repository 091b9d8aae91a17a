//! Rest and recharge: the simple timed leaf tasks.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::warn;

use outpost_types::SimTime;

use crate::task::{Task, TaskContext, TaskKind, TaskPhase};

/// Battery percentage points restored per millisol on the charger.
fn recharge_rate() -> Decimal {
    Decimal::new(2, 0)
}

impl Task {
    /// Create a rest task for the given duration.
    pub fn rest(duration: SimTime) -> Self {
        Self::new(
            "rest",
            TaskKind::Rest {
                duration_remaining: duration,
            },
            false,
        )
    }

    /// Create a recharge task (robots only) that runs until full charge.
    pub fn recharge() -> Self {
        Self::new("recharge", TaskKind::Recharge, false)
    }

    /// Phase handler for [`TaskKind::Rest`].
    pub(crate) fn step_rest(&mut self, phase: TaskPhase, span: SimTime) -> SimTime {
        if phase != TaskPhase::Resting {
            warn!(task = %self.name, ?phase, "rest dispatched to foreign phase");
            self.end_with(Some(format!("rest cannot run phase {phase:?}")));
            return span;
        }
        let TaskKind::Rest { duration_remaining } = &mut self.kind else {
            self.end_with(Some(String::from("rest phase on non-rest task")));
            return span;
        };

        let consumed = span.min(*duration_remaining);
        *duration_remaining = duration_remaining.saturating_sub(consumed);
        let rested = duration_remaining.is_zero();
        let left = span.saturating_sub(consumed);

        if rested {
            self.end_with(None);
        }
        left
    }

    /// Phase handler for [`TaskKind::Recharge`].
    pub(crate) fn step_recharge(
        &mut self,
        ctx: &mut TaskContext<'_>,
        phase: TaskPhase,
        span: SimTime,
    ) -> SimTime {
        if phase != TaskPhase::Recharging {
            warn!(task = %self.name, ?phase, "recharge dispatched to foreign phase");
            self.end_with(Some(format!("recharge cannot run phase {phase:?}")));
            return span;
        }
        let Some(charge) = ctx.colonist.battery_pct() else {
            self.end_with(Some(String::from("recharge assigned to a non-robot")));
            return span;
        };
        if charge >= 100 {
            self.end_with(None);
            return span;
        }

        let missing = Decimal::from(100_u32.saturating_sub(charge));
        let Some(time_to_full) = missing
            .checked_div(recharge_rate())
            .and_then(SimTime::from_millisols)
        else {
            self.end_with(Some(String::from("recharge time computation failed")));
            return span;
        };

        if span >= time_to_full {
            ctx.colonist.recharge_battery(100);
            self.end_with(None);
            span.saturating_sub(time_to_full)
        } else {
            let gained = span
                .millisols()
                .checked_mul(recharge_rate())
                .map(|points| points.floor())
                .and_then(|points| points.to_u32())
                .unwrap_or(0);
            ctx.colonist.recharge_battery(gained);
            SimTime::ZERO
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use outpost_types::{AgentKind, Colonist, JobKind};
    use outpost_world::{MalfunctionRegistry, Settlement};

    fn ctx_parts(kind: AgentKind) -> (Colonist, Settlement, MalfunctionRegistry) {
        (
            Colonist::new("R-7", kind, JobKind::Technician),
            Settlement::new("Base Alpha"),
            MalfunctionRegistry::default(),
        )
    }

    #[test]
    fn rest_finishes_with_leftover() {
        let (mut colonist, mut settlement, mut malfunctions) =
            ctx_parts(AgentKind::Person);
        let mut ctx = TaskContext {
            colonist: &mut colonist,
            settlement: &mut settlement,
            malfunctions: &mut malfunctions,
            now: SimTime::ZERO,
        };
        let mut task = Task::rest(SimTime::from_whole(8));
        let left = task.step(&mut ctx, SimTime::from_whole(10));
        assert!(task.is_done());
        assert_eq!(left, SimTime::from_whole(2));
    }

    #[test]
    fn recharge_fills_battery_and_returns_leftover() {
        let (mut colonist, mut settlement, mut malfunctions) =
            ctx_parts(AgentKind::Robot { battery_pct: 60 });
        let mut ctx = TaskContext {
            colonist: &mut colonist,
            settlement: &mut settlement,
            malfunctions: &mut malfunctions,
            now: SimTime::ZERO,
        };
        let mut task = Task::recharge();

        // 40 points missing at 2 per millisol = 20 millisols.
        let left = task.step(&mut ctx, SimTime::from_whole(25));
        assert!(task.is_done());
        assert_eq!(task.end_reason(), None);
        assert_eq!(left, SimTime::from_whole(5));
        assert_eq!(ctx.colonist.battery_pct(), Some(100));
    }

    #[test]
    fn partial_recharge_accumulates_charge() {
        let (mut colonist, mut settlement, mut malfunctions) =
            ctx_parts(AgentKind::Robot { battery_pct: 10 });
        let mut ctx = TaskContext {
            colonist: &mut colonist,
            settlement: &mut settlement,
            malfunctions: &mut malfunctions,
            now: SimTime::ZERO,
        };
        let mut task = Task::recharge();

        let left = task.step(&mut ctx, SimTime::from_whole(10));
        assert_eq!(left, SimTime::ZERO);
        assert!(!task.is_done());
        assert_eq!(ctx.colonist.battery_pct(), Some(30));
    }

    #[test]
    fn recharge_rejects_people() {
        let (mut colonist, mut settlement, mut malfunctions) =
            ctx_parts(AgentKind::Person);
        let mut ctx = TaskContext {
            colonist: &mut colonist,
            settlement: &mut settlement,
            malfunctions: &mut malfunctions,
            now: SimTime::ZERO,
        };
        let mut task = Task::recharge();
        let left = task.step(&mut ctx, SimTime::from_whole(10));
        assert!(task.is_done());
        assert!(task.end_reason().is_some());
        assert_eq!(left, SimTime::from_whole(10));
    }
}
