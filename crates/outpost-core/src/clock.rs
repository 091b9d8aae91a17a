//! The pulse clock: the single source of simulated time.
//!
//! Each `tick()` advances the clock by `base_step * time_ratio` millisols
//! and hands back a [`Pulse`] for the dispatcher to fan out. Pausing
//! suspends advancement without touching listener registrations; halting
//! is the stronger stop used to bracket the save lifecycle -- no pulse
//! may be in flight while the world serializes.
//!
//! # Design Principles
//!
//! - The millisol counter is the source of truth; pulse numbers and wall
//!   mappings derive from it.
//! - All arithmetic is checked. A ratio or step that cannot produce a
//!   valid span is a constructor-time error, never a runtime surprise.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use outpost_types::SimTime;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// The time ratio must be strictly positive.
    #[error("time ratio must be > 0, got {ratio}")]
    NonPositiveRatio {
        /// The rejected ratio.
        ratio: Decimal,
    },

    /// The base step must be strictly positive.
    #[error("base step must be > 0, got {step}")]
    NonPositiveStep {
        /// The rejected step.
        step: SimTime,
    },

    /// Advancing the clock would overflow the time scalar.
    #[error("simulated time overflow")]
    TimeOverflow,

    /// `tick()` was called while the clock was halted for a save.
    #[error("clock is halted")]
    Halted,
}

/// One discrete simulated-time advance, as handed to every listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pulse {
    /// Monotonic pulse number, starting at 1.
    pub number: u64,
    /// Simulated time after this advance.
    pub now: SimTime,
    /// The span of simulated time this pulse covers.
    pub delta: SimTime,
}

/// The simulation's clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PulseClock {
    /// Simulated time elapsed since the simulation began.
    now: SimTime,
    /// Unscaled span per tick.
    base_step: SimTime,
    /// Simulated-time-per-wall-time multiplier.
    time_ratio: Decimal,
    /// Whether ticking is suspended (listeners stay registered).
    paused: bool,
    /// Whether the clock is stopped for the save lifecycle.
    halted: bool,
    /// Pulses emitted so far.
    pulse_count: u64,
}

impl PulseClock {
    /// Create a clock at time zero.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::NonPositiveStep`] or
    /// [`ClockError::NonPositiveRatio`] for invalid parameters.
    pub fn new(base_step: SimTime, time_ratio: Decimal) -> Result<Self, ClockError> {
        Self::from_parts(SimTime::ZERO, base_step, time_ratio, 0)
    }

    /// Create a clock from explicit parts (state restoration, tests).
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::NonPositiveStep`] or
    /// [`ClockError::NonPositiveRatio`] for invalid parameters.
    pub fn from_parts(
        now: SimTime,
        base_step: SimTime,
        time_ratio: Decimal,
        pulse_count: u64,
    ) -> Result<Self, ClockError> {
        if base_step.is_zero() {
            return Err(ClockError::NonPositiveStep { step: base_step });
        }
        if time_ratio <= Decimal::ZERO {
            return Err(ClockError::NonPositiveRatio { ratio: time_ratio });
        }
        Ok(Self {
            now,
            base_step,
            time_ratio,
            paused: false,
            halted: false,
            pulse_count,
        })
    }

    /// Current simulated time.
    pub const fn now(&self) -> SimTime {
        self.now
    }

    /// The unscaled span per tick.
    pub const fn base_step(&self) -> SimTime {
        self.base_step
    }

    /// The simulated-time-per-wall-time multiplier.
    pub const fn time_ratio(&self) -> Decimal {
        self.time_ratio
    }

    /// Pulses emitted so far.
    pub const fn pulse_count(&self) -> u64 {
        self.pulse_count
    }

    /// Whether ticking is suspended.
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether the clock is stopped for the save lifecycle.
    pub const fn is_halted(&self) -> bool {
        self.halted
    }

    /// Suspend ticking. Listener registrations are untouched.
    pub fn pause(&mut self) {
        debug!("clock paused");
        self.paused = true;
    }

    /// Resume ticking.
    pub fn resume(&mut self) {
        debug!("clock resumed");
        self.paused = false;
    }

    /// Stop the clock for the save lifecycle. No pulse may be produced
    /// until [`proceed`](Self::proceed) is called.
    pub fn halt(&mut self) {
        debug!("clock halted");
        self.halted = true;
    }

    /// Restart the clock after a completed save or load.
    pub fn proceed(&mut self) {
        debug!("clock proceeding");
        self.halted = false;
    }

    /// Replace the time ratio.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::NonPositiveRatio`] if `ratio <= 0`.
    pub fn set_time_ratio(&mut self, ratio: Decimal) -> Result<(), ClockError> {
        if ratio <= Decimal::ZERO {
            return Err(ClockError::NonPositiveRatio { ratio });
        }
        self.time_ratio = ratio;
        Ok(())
    }

    /// Advance simulated time by one pulse.
    ///
    /// Returns `Ok(None)` while paused. Ticking a halted clock is a
    /// contract violation (saves must never race pulses) and errors.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::Halted`] if the clock is halted, or
    /// [`ClockError::TimeOverflow`] if the advance cannot be represented.
    pub fn tick(&mut self) -> Result<Option<Pulse>, ClockError> {
        if self.halted {
            return Err(ClockError::Halted);
        }
        if self.paused {
            return Ok(None);
        }

        let delta = self
            .base_step
            .checked_scale(self.time_ratio)
            .ok_or(ClockError::TimeOverflow)?;
        self.now = self
            .now
            .checked_add(delta)
            .ok_or(ClockError::TimeOverflow)?;
        self.pulse_count = self
            .pulse_count
            .checked_add(1)
            .ok_or(ClockError::TimeOverflow)?;

        Ok(Some(Pulse {
            number: self.pulse_count,
            now: self.now,
            delta,
        }))
    }
}
