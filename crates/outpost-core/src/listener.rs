//! The pulse-listener seam.
//!
//! Subsystems subscribe to the dispatcher as [`PulseListener`]s and are
//! invoked synchronously, in registration order, with the same pulse. A
//! listener that returns an error is logged and skipped for that pulse
//! only -- one faulty subsystem must not halt the clock.

use crate::clock::Pulse;
use crate::shared::SharedState;

/// Errors a pulse listener may surface to the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// The listener could not process this pulse.
    #[error("listener '{listener}' failed: {message}")]
    Failed {
        /// The listener's registered name.
        listener: &'static str,
        /// What went wrong.
        message: String,
    },
}

/// A subsystem driven by clock pulses.
pub trait PulseListener: Send {
    /// Stable name used for logging and for the persisted roster the
    /// rebind pass validates.
    fn name(&self) -> &'static str;

    /// Process one pulse. Errors are contained to this pulse.
    fn on_pulse(
        &mut self,
        shared: &mut SharedState,
        pulse: &Pulse,
    ) -> Result<(), ListenerError>;

    /// Pause-state notification. Default: ignore.
    fn on_pause(&mut self, _paused: bool) {}
}
