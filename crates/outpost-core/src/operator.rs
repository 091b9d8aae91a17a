//! Operator control state for runtime simulation management.
//!
//! Shared atomic state used by the pulse loop and the operational surface
//! (engine signals, future control APIs). The operator can pause/resume,
//! change the pulse interval, and request a clean stop without stopping
//! the process.
//!
//! All mutable control fields use [`std::sync::atomic`] types wrapped in
//! [`std::sync::Arc`] by callers, so the pulse loop reads them without
//! locks on the hot path.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};

use crate::config::SimulationBoundsConfig;

/// Reason why the pulse loop ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    /// Reached the configured `max_pulses` limit.
    MaxPulsesReached,
    /// Reached the configured `max_real_time_seconds` limit.
    MaxRealTimeReached,
    /// An operator issued a stop command.
    OperatorStop,
}

/// Shared operator control state.
#[derive(Debug)]
pub struct OperatorState {
    /// Whether the simulation is currently paused.
    paused: AtomicBool,

    /// Notification used to wake the pulse loop when resumed.
    resume_notify: Notify,

    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Current pulse interval in milliseconds (runtime-adjustable).
    pulse_interval_ms: AtomicU64,

    /// Wall-clock time when the run started.
    started_at: DateTime<Utc>,

    /// Maximum number of pulses (0 = unlimited).
    max_pulses: u64,

    /// Maximum wall-clock seconds (0 = unlimited).
    max_real_time_seconds: u64,

    /// Reason the run ended, if it has.
    end_reason: Mutex<Option<EndReason>>,
}

impl OperatorState {
    /// Create a new operator state from configuration.
    pub fn new(pulse_interval_ms: u64, bounds: &SimulationBoundsConfig) -> Self {
        Self {
            paused: AtomicBool::new(false),
            resume_notify: Notify::new(),
            stop_requested: AtomicBool::new(false),
            pulse_interval_ms: AtomicU64::new(pulse_interval_ms),
            started_at: Utc::now(),
            max_pulses: bounds.max_pulses,
            max_real_time_seconds: bounds.max_real_time_seconds,
            end_reason: Mutex::new(None),
        }
    }

    /// Check whether the simulation is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause the simulation. The pulse loop will sleep until resumed.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Resume the simulation and wake the pulse loop.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.resume_notify.notify_one();
    }

    /// Wait until the simulation is no longer paused.
    ///
    /// Returns immediately if not paused. Otherwise blocks until
    /// [`resume`](Self::resume) is called.
    pub async fn wait_if_paused(&self) {
        while self.paused.load(Ordering::Acquire) {
            self.resume_notify.notified().await;
        }
    }

    /// Request a clean stop.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Current pulse interval in milliseconds.
    pub fn pulse_interval_ms(&self) -> u64 {
        self.pulse_interval_ms.load(Ordering::Acquire)
    }

    /// Change the pulse interval at runtime.
    pub fn set_pulse_interval_ms(&self, interval: u64) {
        self.pulse_interval_ms.store(interval, Ordering::Release);
    }

    /// The configured pulse limit (0 = unlimited).
    pub const fn max_pulses(&self) -> u64 {
        self.max_pulses
    }

    /// The configured wall-clock limit (0 = unlimited).
    pub const fn max_real_time_seconds(&self) -> u64 {
        self.max_real_time_seconds
    }

    /// Wall-clock seconds since the run started.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now().signed_duration_since(self.started_at);
        u64::try_from(elapsed.num_seconds().max(0)).unwrap_or(0)
    }

    /// Whether the configured pulse limit has been reached.
    pub const fn pulse_limit_reached(&self, pulse: u64) -> bool {
        self.max_pulses > 0 && pulse >= self.max_pulses
    }

    /// Whether the configured wall-clock limit has been reached.
    pub fn time_limit_reached(&self) -> bool {
        self.max_real_time_seconds > 0 && self.elapsed_seconds() >= self.max_real_time_seconds
    }

    /// Record the reason the run ended.
    pub async fn set_end_reason(&self, reason: EndReason) {
        let mut guard = self.end_reason.lock().await;
        *guard = Some(reason);
    }

    /// Get the reason the run ended, if it has.
    pub async fn end_reason(&self) -> Option<EndReason> {
        self.end_reason.lock().await.clone()
    }
}
