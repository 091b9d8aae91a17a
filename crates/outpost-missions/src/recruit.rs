//! Qualification scoring and weighted-random recruitment.
//!
//! A candidate's qualification is `job-affinity * relationship-affinity`
//! scaled to [0, 100]. Acceptance is probabilistic and proportional to
//! that weight -- a deterministic roll per `(seed, pulse, candidate)`
//! keeps runs reproducible while still favouring well-qualified
//! candidates over a hard threshold. The exact blending constants are
//! deliberately unremarkable; the shape (product of clamped affinities,
//! weighted roll) is the contract.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

use outpost_agents::Crew;
use outpost_types::{AgentId, JobKind};

use crate::mission::{Mission, MissionKind};

/// How well a job lines up with a mission kind, in [0, 1].
pub fn job_affinity(kind: MissionKind, job: JobKind) -> Decimal {
    let tenths = match (kind, job) {
        (MissionKind::SurfaceSurvey, JobKind::Geologist) => 10,
        (MissionKind::SurfaceSurvey, JobKind::Pilot) => 8,
        (MissionKind::SurfaceSurvey, JobKind::Engineer) => 6,
        (MissionKind::SurfaceSurvey, JobKind::Technician) => 5,
        (MissionKind::SurfaceSurvey, JobKind::Physician) => 4,
        (MissionKind::SurfaceSurvey, JobKind::Botanist) => 3,
        (MissionKind::SupplyRun, JobKind::Pilot) => 10,
        (MissionKind::SupplyRun, JobKind::Technician) => 8,
        (MissionKind::SupplyRun, JobKind::Engineer) => 7,
        (MissionKind::SupplyRun, _) => 4,
    };
    Decimal::new(tenths, 1)
}

/// Mean rapport of `candidate` toward the mission's current members, in
/// [0, 1]. A mission with no members yet reads as neutral.
fn relationship_affinity(candidate: AgentId, mission: &Mission, crew: &Crew) -> Decimal {
    let members = mission.members();
    if members.is_empty() {
        return Decimal::new(5, 1);
    }
    let mut sum = Decimal::ZERO;
    let mut count = Decimal::ZERO;
    for member in members {
        let score = crew.rapport_between(candidate, *member);
        sum = sum.checked_add(score).unwrap_or(sum);
        count = count.checked_add(Decimal::ONE).unwrap_or(count);
    }
    sum.checked_div(count).unwrap_or_else(|| Decimal::new(5, 1))
}

/// A candidate's qualification weight in [0, 100].
///
/// Any strictly positive product maps to at least 1, so weakly-qualified
/// candidates remain reachable by the roll.
pub fn qualification_weight(candidate: AgentId, mission: &Mission, crew: &Crew) -> u32 {
    let Ok(mate) = crew.member(candidate) else {
        return 0;
    };
    let job = job_affinity(mission.kind(), mate.profile.job);
    let relationship = relationship_affinity(candidate, mission, crew);
    let product = job.checked_mul(relationship).unwrap_or(Decimal::ZERO);
    let scaled = product
        .checked_mul(Decimal::new(100, 0))
        .unwrap_or(Decimal::ZERO)
        .floor();
    let weight = scaled.to_u32().unwrap_or(0).min(100);
    if weight == 0 && product > Decimal::ZERO {
        1
    } else {
        weight
    }
}

/// `xorshift64` PRNG step.
fn xorshift64(mut state: u64) -> u64 {
    state ^= state << 13;
    state ^= state >> 7;
    state ^= state << 17;
    state
}

/// Deterministic acceptance roll in [0, 100) for one candidate.
fn acceptance_roll(seed: u64, pulse: u64, candidate: AgentId) -> u32 {
    let salt = candidate.into_inner().as_u64_pair().0;
    let mixed = seed
        .wrapping_mul(0x9E37_79B9_7F4A_7C15)
        .wrapping_add(pulse)
        .wrapping_add(salt);
    let roll = xorshift64(mixed.max(1));
    u32::try_from(roll.checked_rem(100).unwrap_or(0)).unwrap_or(0)
}

/// Run one recruitment sweep over the crew.
///
/// Candidates are visited in deterministic ID order; seriously ailing
/// colonists and existing members are skipped. Each candidate is accepted
/// with probability proportional to their qualification weight until the
/// mission reaches capacity. Returns the agents recruited this sweep.
pub fn recruit_members(
    mission: &mut Mission,
    crew: &Crew,
    seed: u64,
    pulse: u64,
) -> Vec<AgentId> {
    let mut recruited = Vec::new();
    for candidate in crew.ids() {
        if mission.member_count() >= mission.capacity() {
            break;
        }
        if mission.members().contains(&candidate) {
            continue;
        }
        let Ok(mate) = crew.member(candidate) else {
            continue;
        };
        if mate.profile.serious_ailment {
            continue;
        }

        let weight = qualification_weight(candidate, mission, crew);
        if weight == 0 {
            continue;
        }
        let roll = acceptance_roll(seed, pulse, candidate);
        if roll < weight && mission.add_member(candidate).is_ok() {
            debug!(
                mission = mission.name(),
                agent = %mate.profile.name,
                weight,
                roll,
                "candidate recruited"
            );
            recruited.push(candidate);
        }
    }
    recruited
}
