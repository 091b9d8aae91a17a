//! The bounded async pulse loop.
//!
//! [`run_simulation`] drives the dispatcher on its own executor task so
//! the hosting process stays responsive, while every listener invocation
//! within a pulse remains sequential and run-to-completion -- ordering is
//! deterministic, there is no parallel agent stepping. The loop supports:
//!
//! - **Bounded runs**: stop after `max_pulses` or `max_real_time_seconds`
//! - **Pause/resume**: operator pause suspends the clock and notifies
//!   listeners, without losing registrations
//! - **Variable speed**: the wall interval between pulses is adjustable
//!   at runtime
//! - **Clean shutdown**: a stop request ends the loop between pulses

use std::sync::Arc;

use tracing::{info, warn};

use crate::clock::Pulse;
use crate::dispatcher::{Simulation, SimulationError};
use crate::operator::{EndReason, OperatorState};

/// Result of a bounded run.
#[derive(Debug)]
pub struct RunSummary {
    /// Why the loop ended.
    pub end_reason: EndReason,
    /// The last pulse dispatched, if any.
    pub final_pulse: Option<Pulse>,
    /// Total pulses dispatched by this run.
    pub total_pulses: u64,
}

/// Callback invoked after each dispatched pulse.
pub trait PulseCallback: Send {
    /// Called after a pulse has been fanned out to every listener.
    fn on_pulse(&mut self, pulse: &Pulse, sim: &Simulation);
}

/// A no-op pulse callback for testing.
pub struct NoOpCallback;

impl PulseCallback for NoOpCallback {
    fn on_pulse(&mut self, _pulse: &Pulse, _sim: &Simulation) {}
}

/// Run the pulse loop until a termination condition is met.
///
/// # Errors
///
/// Returns [`SimulationError`] if a pulse dispatch fails unrecoverably
/// (clock fault); listener faults are contained per pulse and do not end
/// the run.
pub async fn run_simulation(
    sim: &mut Simulation,
    operator: &Arc<OperatorState>,
    callback: &mut dyn PulseCallback,
) -> Result<RunSummary, SimulationError> {
    let mut last_pulse: Option<Pulse> = None;
    let mut total_pulses: u64 = 0;

    info!(
        max_pulses = operator.max_pulses(),
        max_real_time_seconds = operator.max_real_time_seconds(),
        pulse_interval_ms = operator.pulse_interval_ms(),
        "pulse loop starting"
    );

    loop {
        // --- Pause gate ---
        if operator.is_paused() {
            info!("simulation paused, waiting for resume...");
            sim.pause();
            operator.wait_if_paused().await;
            sim.resume();
            info!("simulation resumed");
        }

        // --- Stop request (between pulses) ---
        if operator.is_stop_requested() {
            info!("operator stop requested");
            let reason = EndReason::OperatorStop;
            operator.set_end_reason(reason.clone()).await;
            return Ok(RunSummary {
                end_reason: reason,
                final_pulse: last_pulse,
                total_pulses,
            });
        }

        // --- Wall-clock limit (between pulses) ---
        if operator.time_limit_reached() {
            info!(
                max_seconds = operator.max_real_time_seconds(),
                elapsed = operator.elapsed_seconds(),
                "real-time limit reached"
            );
            let reason = EndReason::MaxRealTimeReached;
            operator.set_end_reason(reason.clone()).await;
            return Ok(RunSummary {
                end_reason: reason,
                final_pulse: last_pulse,
                total_pulses,
            });
        }

        // --- Dispatch one pulse ---
        match sim.dispatch_pulse()? {
            Some(pulse) => {
                total_pulses = total_pulses.saturating_add(1);
                callback.on_pulse(&pulse, sim);

                // --- Pulse limit (after the pulse) ---
                if operator.pulse_limit_reached(pulse.number) {
                    info!(
                        pulse = pulse.number,
                        max_pulses = operator.max_pulses(),
                        "pulse limit reached"
                    );
                    let reason = EndReason::MaxPulsesReached;
                    operator.set_end_reason(reason.clone()).await;
                    return Ok(RunSummary {
                        end_reason: reason,
                        final_pulse: Some(pulse),
                        total_pulses,
                    });
                }
                last_pulse = Some(pulse);
            }
            None => {
                // The clock was paused out from under the loop; the next
                // iteration's pause gate will handle it.
            }
        }

        // --- Wall interval between pulses ---
        let interval_ms = operator.pulse_interval_ms();
        if interval_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(interval_ms)).await;
        }
    }
}

/// Log the end of a run.
pub fn log_run_end(summary: &RunSummary) {
    info!(
        reason = ?summary.end_reason,
        total_pulses = summary.total_pulses,
        final_pulse = summary.final_pulse.as_ref().map(|p| p.number),
        "pulse loop ended"
    );
    if summary.final_pulse.is_none() {
        warn!("pulse loop ended with no pulses dispatched");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{SimulationBoundsConfig, SimulationConfig};
    use outpost_agents::StubTaskFactory;

    fn bounded(max_pulses: u64) -> Arc<OperatorState> {
        Arc::new(OperatorState::new(
            0,
            &SimulationBoundsConfig {
                max_pulses,
                max_real_time_seconds: 0,
            },
        ))
    }

    fn make_sim() -> Simulation {
        Simulation::create_new(
            &SimulationConfig::default(),
            Box::new(StubTaskFactory::new()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn bounded_by_max_pulses() {
        let mut sim = make_sim();
        let operator = bounded(5);
        let mut callback = NoOpCallback;

        let summary = run_simulation(&mut sim, &operator, &mut callback)
            .await
            .unwrap();

        assert_eq!(summary.end_reason, EndReason::MaxPulsesReached);
        assert_eq!(summary.total_pulses, 5);
        assert_eq!(sim.clock().pulse_count(), 5);
    }

    #[tokio::test]
    async fn operator_stop_ends_before_any_pulse() {
        let mut sim = make_sim();
        let operator = bounded(0);
        operator.request_stop();
        let mut callback = NoOpCallback;

        let summary = run_simulation(&mut sim, &operator, &mut callback)
            .await
            .unwrap();

        assert_eq!(summary.end_reason, EndReason::OperatorStop);
        assert_eq!(summary.total_pulses, 0);
    }

    #[tokio::test]
    async fn callback_sees_every_pulse() {
        struct CountCallback {
            count: u64,
        }
        impl PulseCallback for CountCallback {
            fn on_pulse(&mut self, _pulse: &Pulse, _sim: &Simulation) {
                self.count = self.count.saturating_add(1);
            }
        }

        let mut sim = make_sim();
        let operator = bounded(3);
        let mut callback = CountCallback { count: 0 };

        let _ = run_simulation(&mut sim, &operator, &mut callback)
            .await
            .unwrap();
        assert_eq!(callback.count, 3);
    }

    #[tokio::test]
    async fn same_delta_reaches_all_pulses_with_ratio() {
        let mut config = SimulationConfig::default();
        config.world.base_step_millisols = 1;
        config.world.time_ratio_percent = 200;
        let mut sim = Simulation::create_new(&config, Box::new(StubTaskFactory::new())).unwrap();
        let operator = bounded(4);
        let mut callback = NoOpCallback;

        let summary = run_simulation(&mut sim, &operator, &mut callback)
            .await
            .unwrap();
        let final_pulse = summary.final_pulse.unwrap();
        assert_eq!(final_pulse.delta, outpost_types::SimTime::from_whole(2));
        assert_eq!(sim.clock().now(), outpost_types::SimTime::from_whole(8));
    }
}
