//! Single-operator mutual exclusion with FIFO queueing and an activation
//! countdown.
//!
//! A [`ResourceGate`] guards a shared facility that only one agent may
//! drive at a time: an airlock chamber, a vehicle's operator seat, a
//! workshop process slot. Contention is ordinary data, not an error --
//! every operation returns a status enum and the caller decides whether to
//! wait, retry, or abandon.
//!
//! # Lifecycle
//!
//! ```text
//! Free --request--> Activating --add_cycle_time--> Cycling --> Granted
//!                      ^                                          |
//!                      +------------- release (next in queue) ----+
//! ```
//!
//! The operator feeds pulse time into the gate until the activation
//! requirement is met (an airlock pressure cycle, a pre-drive inspection).
//! Agents that request while the gate is held join a FIFO queue; the head
//! of the queue is promoted when the operator releases. No tie-break
//! beyond queue order.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use outpost_types::{AgentId, GateId, SimTime};

/// Where a gate is in its operating cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateState {
    /// No operator; the gate is available.
    Free,
    /// An operator holds the gate but has not yet fed it cycle time.
    Activating,
    /// The activation countdown is partially elapsed.
    Cycling,
    /// The activation completed; the operator may use the facility.
    Granted,
}

/// Why a request was refused outright (as opposed to queued).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenialReason {
    /// The requester lacks required consumable reserves and must procure
    /// them before operating the facility.
    InsufficientReserves {
        /// Minimum reserve percentage the facility demands.
        required_pct: u32,
        /// The requester's current reserve percentage.
        available_pct: u32,
    },
    /// The facility is out of service due to an unrepaired malfunction.
    OutOfService,
}

/// Result of a [`ResourceGate::request`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestOutcome {
    /// The agent is now (or already was) the operator.
    Operator,
    /// The agent is waiting in the FIFO queue.
    Queued,
    /// The request was refused; see the reason.
    Denied(DenialReason),
}

/// Result of feeding cycle time into a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The caller is not the operator; nothing was consumed. The caller
    /// should retry after acquiring the gate, or abandon.
    NotOperator,
    /// All offered time was consumed; the countdown continues.
    InProgress {
        /// Activation time still required.
        remaining: SimTime,
    },
    /// The activation completed during this call.
    Granted {
        /// Offered time that was not needed to finish the countdown.
        unused: SimTime,
    },
}

/// Result of releasing a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The operator slot was cleared.
    Released {
        /// The queued agent promoted to operator, if any.
        next_operator: Option<AgentId>,
    },
    /// The caller was not the operator; state is unchanged.
    NotOperator,
}

/// A single-operator gate with a FIFO wait queue and activation timer.
///
/// Invariants:
/// - `operator` is absent or exactly one agent.
/// - An agent in the wait queue is never simultaneously the operator.
/// - `state` is [`GateState::Free`] iff `operator` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGate {
    /// Unique gate identifier.
    id: GateId,
    /// Human-readable label for logs ("airlock A", "bay 2 operator seat").
    label: String,
    /// Activation time a fresh operator must feed in before being granted.
    activation_required: SimTime,
    /// Countdown remaining for the current operator.
    activation_remaining: SimTime,
    /// The current operator, if any.
    operator: Option<AgentId>,
    /// Agents waiting for the gate, oldest first.
    queue: VecDeque<AgentId>,
    /// Where the gate is in its cycle.
    state: GateState,
    /// Set when the current operator's activation has completed.
    activated: bool,
}

impl ResourceGate {
    /// Create a free gate requiring `activation` time per operator.
    pub fn new(label: impl Into<String>, activation: SimTime) -> Self {
        Self {
            id: GateId::new(),
            label: label.into(),
            activation_required: activation,
            activation_remaining: SimTime::ZERO,
            operator: None,
            queue: VecDeque::new(),
            state: GateState::Free,
            activated: false,
        }
    }

    /// The gate's identifier.
    pub const fn id(&self) -> GateId {
        self.id
    }

    /// The gate's display label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> GateState {
        self.state
    }

    /// The current operator, if any.
    pub const fn operator(&self) -> Option<AgentId> {
        self.operator
    }

    /// Whether the current operator's activation has completed.
    pub const fn is_activated(&self) -> bool {
        self.activated
    }

    /// Number of agents waiting in the queue.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the given agent is waiting in the queue.
    pub fn is_queued(&self, agent: AgentId) -> bool {
        self.queue.contains(&agent)
    }

    /// Request the gate for `agent`.
    ///
    /// If the gate is free the agent becomes operator and the activation
    /// countdown is armed. Otherwise the agent joins the FIFO queue (at
    /// most once -- repeat requests while queued are idempotent). An agent
    /// that already holds the gate gets [`RequestOutcome::Operator`] back.
    pub fn request(&mut self, agent: AgentId) -> RequestOutcome {
        if self.operator == Some(agent) {
            return RequestOutcome::Operator;
        }
        if self.operator.is_none() {
            self.operator = Some(agent);
            self.activation_remaining = self.activation_required;
            self.activated = false;
            self.state = GateState::Activating;
            debug!(gate = %self.label, %agent, "gate operator assigned");
            return RequestOutcome::Operator;
        }
        if !self.queue.contains(&agent) {
            self.queue.push_back(agent);
            debug!(gate = %self.label, %agent, depth = self.queue.len(), "gate request queued");
        }
        RequestOutcome::Queued
    }

    /// Feed activation time into the gate.
    ///
    /// Only the operator may cycle the gate; any other caller gets
    /// [`CycleOutcome::NotOperator`] and no time is consumed. When the
    /// countdown reaches zero the gate transitions to
    /// [`GateState::Granted`] and reports how much of `delta` was not
    /// needed, so the caller can account for it.
    pub fn add_cycle_time(&mut self, agent: AgentId, delta: SimTime) -> CycleOutcome {
        if self.operator != Some(agent) {
            return CycleOutcome::NotOperator;
        }
        if self.activated {
            return CycleOutcome::Granted { unused: delta };
        }

        let consumed = delta.min(self.activation_remaining);
        self.activation_remaining = self.activation_remaining.saturating_sub(consumed);

        if self.activation_remaining.is_zero() {
            self.activated = true;
            self.state = GateState::Granted;
            debug!(gate = %self.label, %agent, "gate activation complete");
            CycleOutcome::Granted {
                unused: delta.saturating_sub(consumed),
            }
        } else {
            self.state = GateState::Cycling;
            CycleOutcome::InProgress {
                remaining: self.activation_remaining,
            }
        }
    }

    /// Release the gate.
    ///
    /// Clears the operator slot. If the queue is non-empty the head is
    /// promoted to operator and the gate re-arms to
    /// [`GateState::Activating`]; otherwise the gate returns to
    /// [`GateState::Free`].
    pub fn release(&mut self, agent: AgentId) -> ReleaseOutcome {
        if self.operator != Some(agent) {
            return ReleaseOutcome::NotOperator;
        }
        self.operator = None;
        self.activated = false;
        self.activation_remaining = SimTime::ZERO;

        let next = self.queue.pop_front();
        match next {
            Some(promoted) => {
                self.operator = Some(promoted);
                self.activation_remaining = self.activation_required;
                self.state = GateState::Activating;
                debug!(gate = %self.label, %promoted, "queue head promoted to operator");
            }
            None => {
                self.state = GateState::Free;
            }
        }
        ReleaseOutcome::Released {
            next_operator: next,
        }
    }

    /// Remove `agent` from the wait queue (used when a waiting task is
    /// cancelled). Returns whether the agent was queued.
    pub fn withdraw(&mut self, agent: AgentId) -> bool {
        let before = self.queue.len();
        self.queue.retain(|queued| *queued != agent);
        self.queue.len() != before
    }
}
