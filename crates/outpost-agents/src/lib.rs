//! Task state machines, task managers, and crew upkeep for the Outpost
//! colony simulation.
//!
//! This crate is the behaviour half of an agent. Each colonist owns a
//! [`TaskManager`] holding zero or one resumable [`Task`]; pulse time flows
//! from the dispatcher into the manager, through the task's current phase,
//! and any unconsumed remainder bubbles back up. Blocking on a shared
//! facility is expressed by returning the remainder untouched -- never by
//! suspending a thread.
//!
//! # Modules
//!
//! - [`crew`] -- The crew roster, per-pulse upkeep (robot batteries), and
//!   the crew advance entry point.
//! - [`error`] -- Error types for agent operations.
//! - [`factory`] -- The [`TaskFactory`] selection seam with stub and
//!   roster-policy implementations.
//! - [`task`] -- The [`Task`] state machine: phases, sub-task slot, the
//!   consume-and-return-leftover contract.
//! - [`task_manager`] -- Per-agent owner of the active task.
//! - [`tasks`] -- Concrete task kinds (walk, egress, maintenance, vehicle
//!   checkout, rest, recharge).
//!
//! [`Task`]: task::Task
//! [`TaskManager`]: task_manager::TaskManager
//! [`TaskFactory`]: factory::TaskFactory

pub mod crew;
pub mod error;
pub mod factory;
pub mod task;
pub mod task_manager;
pub mod tasks;

pub use crew::{advance_crew, Crew, CrewPulseReport, Crewmate};
pub use error::AgentError;
pub use factory::{RosterTaskFactory, StubTaskFactory, TaskFactory};
pub use task::{SubTaskSlot, Task, TaskContext, TaskKind, TaskPhase};
pub use task_manager::TaskManager;
