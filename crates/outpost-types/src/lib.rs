//! Shared type definitions for the Outpost colony simulation.
//!
//! This crate holds the data vocabulary every other crate speaks:
//! strongly-typed identifiers, the [`SimTime`] scalar, and the colonist
//! profile types. It contains no behaviour beyond value-type arithmetic
//! and validation — logic lives in the downstream crates.
//!
//! # Modules
//!
//! - [`agent`] -- Colonist profiles, agent kinds, and job assignments.
//! - [`events`] -- The bounded historical event log.
//! - [`ids`] -- Type-safe UUID v7 identifier newtypes.
//! - [`time`] -- [`SimTime`], the exact millisol-valued simulation clock
//!   scalar with a derived wall-clock mapping.
//!
//! [`SimTime`]: time::SimTime

pub mod agent;
pub mod events;
pub mod ids;
pub mod time;

pub use agent::{AgentKind, Colonist, JobKind, LOW_BATTERY_PCT};
pub use events::{EventCategory, EventLog, HistoricalEvent};
pub use ids::{AgentId, EventId, FacilityId, GateId, MissionId, VehicleId};
pub use time::SimTime;
