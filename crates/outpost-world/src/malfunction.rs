//! Wear accrual and the malfunction registry.
//!
//! Facilities wear with simulated time. When accumulated wear crosses the
//! filing threshold a [`Malfunction`] is recorded, the facility goes out
//! of service, and a maintenance task must work the malfunction down at a
//! workshop-qualified rate before the facility returns to service.
//!
//! Repair work follows the same leftover-time contract as the rest of the
//! scheduler: a contribution reports how much of the offered work was not
//! needed, so callers account for every millisol.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use outpost_types::{FacilityId, SimTime};

use crate::error::WorldError;
use crate::facility::Settlement;

/// An active malfunction on one facility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Malfunction {
    /// The facility affected.
    pub facility: FacilityId,
    /// Short description ("pressure seal drift", "spindle misalignment").
    pub name: String,
    /// Simulated time at which the malfunction was filed.
    pub filed_at: SimTime,
    /// Repair work still required.
    pub work_remaining: SimTime,
}

/// Result of contributing repair work to a malfunction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairOutcome {
    /// All offered work was absorbed; the malfunction persists.
    InProgress {
        /// Work still required.
        remaining: SimTime,
    },
    /// The malfunction was cleared during this contribution.
    Cleared {
        /// Offered work that was not needed.
        unused: SimTime,
    },
}

/// Registry of active malfunctions, at most one per facility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MalfunctionRegistry {
    /// Active malfunctions keyed by facility.
    active: BTreeMap<FacilityId, Malfunction>,
    /// Wear accrued per millisol of simulated time.
    wear_per_millisol: Decimal,
    /// Wear level at which a malfunction is filed.
    filing_threshold: Decimal,
    /// Repair work a fresh malfunction requires.
    base_repair_work: SimTime,
}

impl MalfunctionRegistry {
    /// Create a registry with the given wear dynamics.
    pub const fn new(
        wear_per_millisol: Decimal,
        filing_threshold: Decimal,
        base_repair_work: SimTime,
    ) -> Self {
        Self {
            active: BTreeMap::new(),
            wear_per_millisol,
            filing_threshold,
            base_repair_work,
        }
    }

    /// Number of active malfunctions.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// The active malfunction on a facility, if any.
    pub fn active_on(&self, facility: FacilityId) -> Option<&Malfunction> {
        self.active.get(&facility)
    }

    /// Iterate active malfunctions in facility-ID order.
    pub fn iter(&self) -> impl Iterator<Item = &Malfunction> {
        self.active.values()
    }

    /// Accrue wear on every facility for a pulse of `delta` time.
    ///
    /// Facilities whose wear crosses the filing threshold get a
    /// malfunction filed, go out of service, and have their wear reset.
    /// Returns the facilities that malfunctioned this pulse.
    pub fn accrue_wear(
        &mut self,
        settlement: &mut Settlement,
        now: SimTime,
        delta: SimTime,
    ) -> Vec<FacilityId> {
        let Some(pulse_wear) = delta.millisols().checked_mul(self.wear_per_millisol) else {
            return Vec::new();
        };

        let mut filed = Vec::new();
        for facility in settlement.facilities_mut() {
            let worn = facility
                .wear()
                .checked_add(pulse_wear)
                .unwrap_or(self.filing_threshold);

            if worn >= self.filing_threshold && !self.active.contains_key(&facility.id()) {
                facility.set_wear(Decimal::ZERO);
                facility.set_out_of_service(true);
                let malfunction = Malfunction {
                    facility: facility.id(),
                    name: format!("{} degradation", facility.name()),
                    filed_at: now,
                    work_remaining: self.base_repair_work,
                };
                info!(
                    facility = facility.name(),
                    at = %now,
                    "malfunction filed"
                );
                self.active.insert(facility.id(), malfunction);
                filed.push(facility.id());
            } else {
                facility.set_wear(worn);
            }
        }
        filed
    }

    /// Contribute repair work to the malfunction on `facility`.
    ///
    /// `work` is already adjusted for the repairer's effectiveness. When
    /// the malfunction clears the facility returns to service.
    pub fn contribute_repair(
        &mut self,
        settlement: &mut Settlement,
        facility: FacilityId,
        work: SimTime,
    ) -> Result<RepairOutcome, WorldError> {
        let Some(malfunction) = self.active.get_mut(&facility) else {
            return Err(WorldError::NoActiveMalfunction { id: facility });
        };

        let absorbed = work.min(malfunction.work_remaining);
        malfunction.work_remaining = malfunction.work_remaining.saturating_sub(absorbed);
        let remaining = malfunction.work_remaining;

        if remaining.is_zero() {
            self.active.remove(&facility);
            settlement.facility_mut(facility)?.set_out_of_service(false);
            info!(%facility, "malfunction cleared");
            Ok(RepairOutcome::Cleared {
                unused: work.saturating_sub(absorbed),
            })
        } else {
            Ok(RepairOutcome::InProgress { remaining })
        }
    }
}

impl Default for MalfunctionRegistry {
    fn default() -> Self {
        Self::new(
            Decimal::new(1, 2),
            Decimal::new(100, 0),
            SimTime::from_whole(120),
        )
    }
}
