//! Colonist profiles: the identity and capability data for agents.
//!
//! A [`Colonist`] is the data half of an agent -- people and robots share
//! one profile shape. The behaviour half (the task manager that spends the
//! colonist's pulse time) lives in the agents crate; missions read profile
//! fields (job, performance, ailment status) when scoring candidates.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::AgentId;

/// Battery level at which a robot should be pulled off its task.
pub const LOW_BATTERY_PCT: u32 = 20;

/// What kind of agent a colonist is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentKind {
    /// A human colonist.
    Person,
    /// An autonomous robot with a battery charge percentage (0-100).
    Robot {
        /// Remaining battery charge, 0-100.
        battery_pct: u32,
    },
}

/// Job assignment for a colonist, used for mission qualification scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JobKind {
    /// Maintains structures and pressure systems.
    Engineer,
    /// Services equipment and vehicles.
    Technician,
    /// Runs the greenhouse.
    Botanist,
    /// Provides medical care.
    Physician,
    /// Drives and flies vehicles.
    Pilot,
    /// Surveys terrain and minerals.
    Geologist,
}

/// Identity and capability profile for one agent.
///
/// Mutated only by the population manager (battery, reserves, ailments) --
/// tasks and missions treat the profile as read-mostly input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Colonist {
    /// Unique agent identifier.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Person or robot.
    pub kind: AgentKind,
    /// Job assignment.
    pub job: JobKind,
    /// Performance rating in [0, 1]. Effort-driven tasks are withheld from
    /// agents rated at zero.
    pub performance: Decimal,
    /// Suit consumable reserves, 0-100. Airlock egress requires a minimum.
    pub suit_reserve_pct: u32,
    /// Whether the colonist currently has a serious medical problem.
    pub serious_ailment: bool,
}

impl Colonist {
    /// Create a colonist with full performance, full reserves, and no
    /// ailments.
    pub fn new(name: impl Into<String>, kind: AgentKind, job: JobKind) -> Self {
        Self {
            id: AgentId::new(),
            name: name.into(),
            kind,
            job,
            performance: Decimal::ONE,
            suit_reserve_pct: 100,
            serious_ailment: false,
        }
    }

    /// Set the performance rating, clamped to [0, 1].
    pub fn set_performance(&mut self, rating: Decimal) {
        self.performance = clamp_unit(rating);
    }

    /// Whether effort-driven tasks may be assigned to this agent.
    pub fn can_take_effort_tasks(&self) -> bool {
        self.performance > Decimal::ZERO
    }

    /// Whether this agent is a robot.
    pub const fn is_robot(&self) -> bool {
        matches!(self.kind, AgentKind::Robot { .. })
    }

    /// Remaining battery charge for robots, `None` for people.
    pub const fn battery_pct(&self) -> Option<u32> {
        match self.kind {
            AgentKind::Robot { battery_pct } => Some(battery_pct),
            AgentKind::Person => None,
        }
    }

    /// Drain a robot's battery by `amount` percentage points (floored at 0).
    /// No-op for people.
    pub const fn drain_battery(&mut self, amount: u32) {
        if let AgentKind::Robot { battery_pct } = &mut self.kind {
            *battery_pct = battery_pct.saturating_sub(amount);
        }
    }

    /// Restore a robot's battery by `amount` percentage points (capped at
    /// 100). No-op for people.
    pub fn recharge_battery(&mut self, amount: u32) {
        if let AgentKind::Robot { battery_pct } = &mut self.kind {
            *battery_pct = battery_pct.saturating_add(amount).min(100);
        }
    }

    /// Spend suit reserves, floored at zero.
    pub const fn spend_suit_reserve(&mut self, amount: u32) {
        self.suit_reserve_pct = self.suit_reserve_pct.saturating_sub(amount);
    }

    /// Refill suit reserves to full.
    pub const fn refill_suit_reserve(&mut self) {
        self.suit_reserve_pct = 100;
    }
}

/// Clamp a rating to the [0, 1] range.
fn clamp_unit(value: Decimal) -> Decimal {
    if value < Decimal::ZERO {
        Decimal::ZERO
    } else if value > Decimal::ONE {
        Decimal::ONE
    } else {
        value
    }
}
