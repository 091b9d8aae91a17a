//! Error types for settlement operations.
//!
//! Contention (queueing, denial) is expressed through status enums on the
//! gate API, not through these errors. `WorldError` covers genuine
//! misuse: referencing facilities or vehicles that do not exist.

use outpost_types::{FacilityId, VehicleId};

/// Errors that can occur during settlement operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// Facility with the given ID was not found in the settlement.
    #[error("unknown facility: {id}")]
    UnknownFacility {
        /// The missing facility's ID.
        id: FacilityId,
    },

    /// Vehicle with the given ID was not found in the settlement.
    #[error("unknown vehicle: {id}")]
    UnknownVehicle {
        /// The missing vehicle's ID.
        id: VehicleId,
    },

    /// Repair work was offered to a facility with no active malfunction.
    #[error("no active malfunction on facility {id}")]
    NoActiveMalfunction {
        /// The facility that is not malfunctioning.
        id: FacilityId,
    },
}
