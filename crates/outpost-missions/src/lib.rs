//! Multi-agent mission coordination for the Outpost colony simulation.
//!
//! A mission is a phase machine spanning several agents: it recruits
//! members from the crew by qualification, time-boxes its phases, assigns
//! mission tasks to members' task managers, and tears everything down when
//! it ends -- whether by completing its final phase, dropping below its
//! membership floor, or requesting emergency rescue.
//!
//! # Modules
//!
//! - [`error`] -- Error types for mission operations.
//! - [`manager`] -- The roster and the per-pulse mission stepping logic.
//! - [`mission`] -- The [`Mission`] state machine and [`MissionKind`]
//!   phase tables.
//! - [`recruit`] -- Qualification scoring and weighted-random acceptance.
//!
//! [`Mission`]: mission::Mission
//! [`MissionKind`]: mission::MissionKind

pub mod error;
pub mod manager;
pub mod mission;
pub mod recruit;

pub use error::MissionError;
pub use manager::{advance_missions, MissionContext, MissionPulseReport, MissionRoster};
pub use mission::{Mission, MissionKind, MissionPhase, PhaseDecision};
pub use recruit::{job_affinity, qualification_weight, recruit_members};
