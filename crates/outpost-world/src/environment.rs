//! Exterior environment for the colony site.
//!
//! Sky conditions are generated once per pulse from a weighted
//! distribution. A "repeat" weight keeps the previous pulse's condition,
//! so storms arrive and clear in streaks rather than flickering.
//!
//! # Determinism
//!
//! The RNG is a simple `xorshift64` seeded from `(world_seed, pulse)`.
//! The same seed and pulse number always produce the same sky, enabling
//! reproducible runs and replayable saves.

use serde::{Deserialize, Serialize};

/// Exterior sky condition at the colony site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkyCondition {
    /// Clear sky; surface operations unaffected.
    Clear,
    /// Scattered dust devils; cosmetic.
    DustDevils,
    /// A local dust storm; surface work is hazardous.
    LocalStorm,
    /// A planet-circling storm; surface work is hazardous for sols.
    GlobalStorm,
}

impl SkyCondition {
    /// Whether surface operations are hazardous under this sky.
    pub const fn is_hazardous(self) -> bool {
        matches!(self, Self::LocalStorm | Self::GlobalStorm)
    }
}

/// Weighted entries: `(Some(condition), weight)` or `(None, weight)` for
/// "repeat the previous condition".
fn condition_weights() -> Vec<(Option<SkyCondition>, u32)> {
    vec![
        (Some(SkyCondition::Clear), 55),
        (Some(SkyCondition::DustDevils), 20),
        (Some(SkyCondition::LocalStorm), 10),
        (Some(SkyCondition::GlobalStorm), 3),
        (None, 12), // repeat
    ]
}

/// Select a condition (or repeat signal) given a random value in
/// `[0, total_weight)`.
fn select(weights: &[(Option<SkyCondition>, u32)], random_value: u32) -> Option<SkyCondition> {
    let mut cumulative: u32 = 0;
    for &(condition, weight) in weights {
        cumulative = cumulative.saturating_add(weight);
        if random_value < cumulative {
            return condition;
        }
    }
    // Fallback: if we somehow exceed all weights, default to Clear.
    Some(SkyCondition::Clear)
}

/// Total weight of all entries.
fn total_weight(weights: &[(Option<SkyCondition>, u32)]) -> u32 {
    let mut total: u32 = 0;
    for &(_, weight) in weights {
        total = total.saturating_add(weight);
    }
    total
}

/// `xorshift64` PRNG step.
fn xorshift64(mut state: u64) -> u64 {
    state ^= state << 13;
    state ^= state >> 7;
    state ^= state << 17;
    state
}

/// Deterministic exterior sky generator.
///
/// The same `(world_seed, pulse)` pair always yields the same condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentModel {
    /// The world seed used to derive per-pulse randomness.
    world_seed: u64,
    /// The condition from the previous pulse (for "repeat" rolls).
    previous: SkyCondition,
}

impl EnvironmentModel {
    /// Create an environment model with the given world seed.
    pub const fn new(world_seed: u64) -> Self {
        Self {
            world_seed,
            previous: SkyCondition::Clear,
        }
    }

    /// The most recently generated condition.
    pub const fn current(&self) -> SkyCondition {
        self.previous
    }

    /// The world seed this model derives its randomness from.
    pub const fn seed(&self) -> u64 {
        self.world_seed
    }

    /// Generate the sky condition for `pulse`, updating the repeat state.
    pub fn advance(&mut self, pulse: u64) -> SkyCondition {
        let weights = condition_weights();
        let total = total_weight(&weights);
        if total == 0 {
            return self.previous;
        }

        // Mix seed and pulse so consecutive pulses draw unrelated values.
        let mixed = self
            .world_seed
            .wrapping_mul(0x9E37_79B9_7F4A_7C15)
            .wrapping_add(pulse);
        let roll = xorshift64(mixed.max(1));
        let bounded = roll.checked_rem(u64::from(total)).unwrap_or(0);
        let random_value = u32::try_from(bounded).unwrap_or(0);

        let condition = select(&weights, random_value).unwrap_or(self.previous);
        self.previous = condition;
        condition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_and_pulse_is_deterministic() {
        let mut a = EnvironmentModel::new(42);
        let mut b = EnvironmentModel::new(42);
        for pulse in 0..200 {
            assert_eq!(a.advance(pulse), b.advance(pulse));
        }
    }

    #[test]
    fn different_seeds_diverge_somewhere() {
        let mut a = EnvironmentModel::new(1);
        let mut b = EnvironmentModel::new(2);
        let mut diverged = false;
        for pulse in 0..200 {
            if a.advance(pulse) != b.advance(pulse) {
                diverged = true;
                break;
            }
        }
        assert!(diverged, "distinct seeds should produce distinct skies");
    }

    #[test]
    fn hazard_classification() {
        assert!(!SkyCondition::Clear.is_hazardous());
        assert!(!SkyCondition::DustDevils.is_hazardous());
        assert!(SkyCondition::LocalStorm.is_hazardous());
        assert!(SkyCondition::GlobalStorm.is_hazardous());
    }

    #[test]
    fn all_conditions_eventually_appear() {
        let mut env = EnvironmentModel::new(7);
        let mut seen_clear = false;
        let mut seen_other = false;
        for pulse in 0..2000 {
            match env.advance(pulse) {
                SkyCondition::Clear => seen_clear = true,
                _ => seen_other = true,
            }
        }
        assert!(seen_clear);
        assert!(seen_other);
    }
}
