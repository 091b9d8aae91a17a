//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup and the run itself, so `main` can
//! propagate everything with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: outpost_core::config::ConfigError,
    },

    /// Simulation assembly, persistence, or dispatch failed.
    #[error("simulation error: {source}")]
    Simulation {
        /// The underlying simulation error.
        #[from]
        source: outpost_core::dispatcher::SimulationError,
    },

    /// The command line could not be understood.
    #[error("argument error: {message}")]
    Args {
        /// What was wrong with the arguments.
        message: String,
    },
}
