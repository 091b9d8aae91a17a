//! Walking: the canonical leaf task, often nested as a sub-task.

use outpost_types::SimTime;
use tracing::warn;

use crate::task::{Task, TaskKind, TaskPhase};

impl Task {
    /// Create a walk task covering `duration` of travel time.
    pub fn walk(duration: SimTime) -> Self {
        Self::new(
            "walk",
            TaskKind::Walk {
                duration_remaining: duration,
            },
            false,
        )
    }

    /// Phase handler for [`TaskKind::Walk`].
    pub(crate) fn step_walk(&mut self, phase: TaskPhase, span: SimTime) -> SimTime {
        if phase != TaskPhase::Walking {
            warn!(task = %self.name, ?phase, "walk dispatched to foreign phase");
            self.end_with(Some(format!("walk cannot run phase {phase:?}")));
            return span;
        }
        let TaskKind::Walk { duration_remaining } = &mut self.kind else {
            self.end_with(Some(String::from("walk phase on non-walk task")));
            return span;
        };

        let consumed = span.min(*duration_remaining);
        *duration_remaining = duration_remaining.saturating_sub(consumed);
        let arrived = duration_remaining.is_zero();
        let left = span.saturating_sub(consumed);

        if arrived {
            self.end_with(None);
        }
        left
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::task::TaskContext;
    use outpost_types::{AgentKind, Colonist, JobKind};
    use outpost_world::{MalfunctionRegistry, Settlement};

    #[test]
    fn walk_consumes_exactly_its_duration() {
        let mut colonist = Colonist::new("Ada", AgentKind::Person, JobKind::Engineer);
        let mut settlement = Settlement::new("Base Alpha");
        let mut malfunctions = MalfunctionRegistry::default();
        let mut ctx = TaskContext {
            colonist: &mut colonist,
            settlement: &mut settlement,
            malfunctions: &mut malfunctions,
            now: SimTime::ZERO,
        };

        let mut task = Task::walk(SimTime::from_whole(10));

        let left = task.step(&mut ctx, SimTime::from_whole(4));
        assert_eq!(left, SimTime::ZERO);
        assert!(!task.is_done());

        let left = task.step(&mut ctx, SimTime::from_whole(9));
        assert_eq!(left, SimTime::from_whole(3));
        assert!(task.is_done());
        assert_eq!(task.end_reason(), None);
        assert_eq!(task.elapsed(), SimTime::from_whole(10));
    }
}
