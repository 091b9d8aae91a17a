//! Facilities built on resource gates, and the settlement registry.
//!
//! A [`Facility`] pairs a domain role (airlock, workshop station, vehicle
//! bay) with the [`ResourceGate`] that arbitrates access to it. Facility
//! wrappers are where preconditions live: an airlock refuses egress to a
//! colonist with thin suit reserves *before* the gate request is made, so
//! a deficient agent never occupies the operator slot.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use outpost_types::{Colonist, FacilityId, GateId, SimTime, VehicleId};

use crate::error::WorldError;
use crate::gate::{DenialReason, RequestOutcome, ResourceGate};

/// Minimum suit reserve percentage required to start an airlock egress.
pub const MIN_EGRESS_RESERVE_PCT: u32 = 25;

/// The domain role a facility plays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FacilityKind {
    /// Pressurized passage between the habitat interior and the surface.
    Airlock,
    /// A workshop process slot for fabrication and repairs.
    WorkshopStation,
    /// A bay holding one vehicle; the gate is the operator seat.
    VehicleBay {
        /// The vehicle parked in this bay.
        vehicle: VehicleId,
    },
}

/// A vehicle owned by the settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Unique vehicle identifier.
    pub id: VehicleId,
    /// Display name.
    pub name: String,
}

/// A shared facility guarded by a resource gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facility {
    /// Unique facility identifier.
    id: FacilityId,
    /// Display name.
    name: String,
    /// The facility's domain role.
    kind: FacilityKind,
    /// The gate arbitrating access.
    gate: ResourceGate,
    /// Accumulated wear since the last malfunction was filed.
    wear: Decimal,
    /// Set while an unrepaired malfunction keeps the facility offline.
    out_of_service: bool,
}

impl Facility {
    /// Create a facility whose gate requires `activation` cycle time.
    pub fn new(name: impl Into<String>, kind: FacilityKind, activation: SimTime) -> Self {
        let name = name.into();
        let gate = ResourceGate::new(name.clone(), activation);
        Self {
            id: FacilityId::new(),
            name,
            kind,
            gate,
            wear: Decimal::ZERO,
            out_of_service: false,
        }
    }

    /// The facility's identifier.
    pub const fn id(&self) -> FacilityId {
        self.id
    }

    /// The facility's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The facility's domain role.
    pub const fn kind(&self) -> &FacilityKind {
        &self.kind
    }

    /// The gate's identifier.
    pub const fn gate_id(&self) -> GateId {
        self.gate.id()
    }

    /// Immutable access to the gate.
    pub const fn gate(&self) -> &ResourceGate {
        &self.gate
    }

    /// Mutable access to the gate.
    pub const fn gate_mut(&mut self) -> &mut ResourceGate {
        &mut self.gate
    }

    /// Accumulated wear.
    pub const fn wear(&self) -> Decimal {
        self.wear
    }

    /// Replace the accumulated wear value (registry bookkeeping).
    pub const fn set_wear(&mut self, wear: Decimal) {
        self.wear = wear;
    }

    /// Whether the facility is offline pending repair.
    pub const fn is_out_of_service(&self) -> bool {
        self.out_of_service
    }

    /// Take the facility offline / bring it back.
    pub const fn set_out_of_service(&mut self, offline: bool) {
        self.out_of_service = offline;
    }

    /// Request access for a colonist, enforcing facility preconditions.
    ///
    /// Airlocks refuse colonists below [`MIN_EGRESS_RESERVE_PCT`] suit
    /// reserves -- the agent must re-enter a procurement phase rather than
    /// occupy the operator slot it cannot use. A facility that is out of
    /// service denies everyone.
    pub fn request_access(&mut self, colonist: &Colonist) -> RequestOutcome {
        if self.out_of_service {
            return RequestOutcome::Denied(DenialReason::OutOfService);
        }
        if matches!(self.kind, FacilityKind::Airlock)
            && colonist.suit_reserve_pct < MIN_EGRESS_RESERVE_PCT
        {
            return RequestOutcome::Denied(DenialReason::InsufficientReserves {
                required_pct: MIN_EGRESS_RESERVE_PCT,
                available_pct: colonist.suit_reserve_pct,
            });
        }
        self.gate.request(colonist.id)
    }
}

/// The settlement: the registry of facilities and vehicles.
///
/// Iteration order is deterministic (`BTreeMap` keyed by time-ordered
/// IDs), which keeps wear accrual and lookups reproducible across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Settlement {
    /// Settlement display name.
    pub name: String,
    /// All facilities keyed by ID.
    facilities: BTreeMap<FacilityId, Facility>,
    /// All vehicles keyed by ID.
    vehicles: BTreeMap<VehicleId, Vehicle>,
}

impl Settlement {
    /// Create an empty settlement.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            facilities: BTreeMap::new(),
            vehicles: BTreeMap::new(),
        }
    }

    /// Add a facility and return its ID.
    pub fn add_facility(&mut self, facility: Facility) -> FacilityId {
        let id = facility.id();
        self.facilities.insert(id, facility);
        id
    }

    /// Add a vehicle with a bay facility; returns `(vehicle, bay)` IDs.
    pub fn add_vehicle(
        &mut self,
        name: impl Into<String>,
        seat_activation: SimTime,
    ) -> (VehicleId, FacilityId) {
        let name = name.into();
        let vehicle = Vehicle {
            id: VehicleId::new(),
            name: name.clone(),
        };
        let vehicle_id = vehicle.id;
        self.vehicles.insert(vehicle_id, vehicle);
        let bay = Facility::new(
            format!("{name} bay"),
            FacilityKind::VehicleBay {
                vehicle: vehicle_id,
            },
            seat_activation,
        );
        let bay_id = self.add_facility(bay);
        (vehicle_id, bay_id)
    }

    /// Look up a facility.
    pub fn facility(&self, id: FacilityId) -> Result<&Facility, WorldError> {
        self.facilities
            .get(&id)
            .ok_or(WorldError::UnknownFacility { id })
    }

    /// Look up a facility mutably.
    pub fn facility_mut(&mut self, id: FacilityId) -> Result<&mut Facility, WorldError> {
        self.facilities
            .get_mut(&id)
            .ok_or(WorldError::UnknownFacility { id })
    }

    /// Look up a vehicle.
    pub fn vehicle(&self, id: VehicleId) -> Result<&Vehicle, WorldError> {
        self.vehicles
            .get(&id)
            .ok_or(WorldError::UnknownVehicle { id })
    }

    /// Iterate all facilities in ID order.
    pub fn facilities(&self) -> impl Iterator<Item = &Facility> {
        self.facilities.values()
    }

    /// Iterate all facilities mutably in ID order.
    pub fn facilities_mut(&mut self) -> impl Iterator<Item = &mut Facility> {
        self.facilities.values_mut()
    }

    /// Number of facilities.
    pub fn facility_count(&self) -> usize {
        self.facilities.len()
    }

    /// The first airlock, if the settlement has one.
    pub fn first_airlock(&self) -> Option<FacilityId> {
        self.facilities
            .values()
            .find(|f| matches!(f.kind(), FacilityKind::Airlock))
            .map(Facility::id)
    }

    /// The first workshop station, if the settlement has one.
    pub fn first_workshop(&self) -> Option<FacilityId> {
        self.facilities
            .values()
            .find(|f| matches!(f.kind(), FacilityKind::WorkshopStation))
            .map(Facility::id)
    }

    /// The first vehicle bay, if the settlement has one.
    pub fn first_vehicle_bay(&self) -> Option<FacilityId> {
        self.facilities
            .values()
            .find(|f| matches!(f.kind(), FacilityKind::VehicleBay { .. }))
            .map(Facility::id)
    }
}
