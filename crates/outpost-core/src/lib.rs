//! Pulse clock, dispatcher, and orchestration for the Outpost colony
//! simulation.
//!
//! This crate owns the scheduling core: the clock that turns wall time
//! into simulated-time pulses, the dispatcher that fans each pulse out to
//! the registered subsystems in a fixed order, the operator control plane,
//! and the save/load lifecycle with its rebind pass.
//!
//! # Modules
//!
//! - [`bootstrap`] -- Seed settlement and crew construction from config.
//! - [`clock`] -- [`PulseClock`]: base step, time ratio, pause, halt.
//! - [`config`] -- Configuration loading from `outpost-config.yaml`.
//! - [`dispatcher`] -- [`Simulation`]: shared state, listener roster,
//!   per-pulse fan-out, save/load.
//! - [`listener`] -- The [`PulseListener`] seam.
//! - [`operator`] -- Shared atomic control state (pause, stop, speed).
//! - [`runner`] -- The bounded async pulse loop.
//! - [`shared`] -- [`SharedState`], the world every listener operates on.
//! - [`systems`] -- The standard listeners: environment, population,
//!   missions.
//!
//! [`PulseClock`]: clock::PulseClock
//! [`PulseListener`]: listener::PulseListener
//! [`SharedState`]: shared::SharedState
//! [`Simulation`]: dispatcher::Simulation

pub mod bootstrap;
pub mod clock;
pub mod config;
pub mod dispatcher;
pub mod listener;
pub mod operator;
pub mod runner;
pub mod shared;
pub mod systems;
