//! Error types for agent operations.
//!
//! Task flow itself never returns `Result` across the step boundary --
//! failures end the task with a reason string. These errors cover roster
//! misuse: referencing agents that are not in the crew.

use outpost_types::AgentId;

/// Errors that can occur during crew roster operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Agent with the given ID was not found in the crew.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    /// An agent with this ID is already enrolled.
    #[error("agent already enrolled: {0}")]
    AlreadyEnrolled(AgentId),
}
