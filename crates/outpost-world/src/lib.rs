//! Facilities, resource gates, malfunctions, and exterior environment for
//! the Outpost colony simulation.
//!
//! This crate models the shared physical plant of the settlement: the
//! single-operator [`ResourceGate`] primitive, the facilities built on top
//! of it (airlocks, workshop stations, vehicle bays), the wear-and-repair
//! malfunction registry, and the deterministic exterior sky model.
//!
//! # Modules
//!
//! - [`environment`] -- Exterior sky conditions generated from a seeded
//!   xorshift64 stream for reproducible runs.
//! - [`error`] -- Error types for settlement operations.
//! - [`facility`] -- Facility wrappers owning gates, plus the
//!   [`Settlement`] registry and vehicles.
//! - [`gate`] -- The [`ResourceGate`] mutual-exclusion primitive with FIFO
//!   queueing and an activation countdown.
//! - [`malfunction`] -- Wear accrual and the malfunction registry.
//!
//! [`ResourceGate`]: gate::ResourceGate
//! [`Settlement`]: facility::Settlement

pub mod environment;
pub mod error;
pub mod facility;
pub mod gate;
pub mod malfunction;

pub use environment::{EnvironmentModel, SkyCondition};
pub use error::WorldError;
pub use facility::{Facility, FacilityKind, Settlement, Vehicle, MIN_EGRESS_RESERVE_PCT};
pub use gate::{CycleOutcome, DenialReason, GateState, ReleaseOutcome, RequestOutcome, ResourceGate};
pub use malfunction::{Malfunction, MalfunctionRegistry, RepairOutcome};
