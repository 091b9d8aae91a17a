//! Error types for mission operations.

use outpost_types::MissionId;

/// Errors that can occur during mission membership operations.
#[derive(Debug, thiserror::Error)]
pub enum MissionError {
    /// The mission is already at its membership capacity.
    #[error("mission {id} is at capacity ({capacity})")]
    AtCapacity {
        /// The full mission's ID.
        id: MissionId,
        /// The capacity that was hit.
        capacity: usize,
    },

    /// The mission has already ended.
    #[error("mission {id} is over")]
    MissionOver {
        /// The ended mission's ID.
        id: MissionId,
    },

    /// Mission with the given ID was not found in the roster.
    #[error("unknown mission: {id}")]
    UnknownMission {
        /// The missing mission's ID.
        id: MissionId,
    },
}
