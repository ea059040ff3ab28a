//! Control loop state machine.
//!
//! # States
//!
//! - `Idle`: between inputs
//! - `Polling`: waiting for a line from the device channel (live mode)
//! - `AwaitingInput`: waiting for a line from the operator console (simulation)
//! - `Evaluating`: deciding access for a received UID
//! - `Dispatching`: sending the resulting command
//! - `ShuttingDown`: terminal, the channel is being released
//!
//! # Valid Transitions
//!
//! - Idle → Polling | AwaitingInput
//! - Polling | AwaitingInput → Evaluating | Idle
//! - Evaluating → Dispatching → Idle
//! - any non-terminal state → ShuttingDown
//!
//! # Examples
//!
//! ```
//! use gatekeeper_controller::{LoopState, StateMachine};
//!
//! let mut machine = StateMachine::new();
//! machine.transition_to(LoopState::Polling).unwrap();
//! machine.transition_to(LoopState::Evaluating).unwrap();
//! assert!(machine.transition_to(LoopState::Polling).is_err());
//! ```

use std::collections::VecDeque;
use std::fmt;

use gatekeeper_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Maximum number of state transitions to keep in history.
const MAX_HISTORY_SIZE: usize = 64;

/// Phase of the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Idle,
    Polling,
    AwaitingInput,
    Evaluating,
    Dispatching,
    ShuttingDown,
}

impl LoopState {
    /// Check whether moving from `self` to `next` is allowed.
    ///
    /// # Examples
    ///
    /// ```
    /// use gatekeeper_controller::LoopState;
    ///
    /// assert!(LoopState::Idle.can_transition_to(&LoopState::Polling));
    /// assert!(LoopState::Dispatching.can_transition_to(&LoopState::ShuttingDown));
    /// assert!(!LoopState::Idle.can_transition_to(&LoopState::Dispatching));
    /// ```
    pub fn can_transition_to(&self, next: &LoopState) -> bool {
        use LoopState::*;

        matches!(
            (self, next),
            (Idle, Polling)
                | (Idle, AwaitingInput)
                | (Polling, Evaluating)
                | (Polling, Idle)
                | (AwaitingInput, Evaluating)
                | (AwaitingInput, Idle)
                | (Evaluating, Dispatching)
                | (Dispatching, Idle)
        ) || (*next == ShuttingDown && !self.is_terminal())
    }

    /// `ShuttingDown` is the only terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoopState::ShuttingDown)
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoopState::Idle => "idle",
            LoopState::Polling => "polling",
            LoopState::AwaitingInput => "awaiting_input",
            LoopState::Evaluating => "evaluating",
            LoopState::Dispatching => "dispatching",
            LoopState::ShuttingDown => "shutting_down",
        };
        f.write_str(name)
    }
}

/// A single recorded state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: LoopState,
    pub to: LoopState,
}

impl StateTransition {
    pub fn new(from: LoopState, to: LoopState) -> Self {
        Self { from, to }
    }
}

/// Tracks the loop's current phase and rejects illegal moves.
///
/// Not thread-safe; owned by the control loop.
#[derive(Debug)]
pub struct StateMachine {
    current_state: LoopState,
    history: VecDeque<StateTransition>,
    transitions: u64,
}

impl StateMachine {
    /// Create a state machine in the `Idle` state.
    pub fn new() -> Self {
        Self {
            current_state: LoopState::Idle,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
            transitions: 0,
        }
    }

    pub fn current_state(&self) -> LoopState {
        self.current_state
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// Total number of transitions since creation, including ones evicted
    /// from the history.
    pub fn transition_count(&self) -> u64 {
        self.transitions
    }

    /// Move to `new_state`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStateTransition`] if the move is not allowed;
    /// the machine is left unchanged.
    pub fn transition_to(&mut self, new_state: LoopState) -> Result<StateTransition> {
        if !self.current_state.can_transition_to(&new_state) {
            return Err(Error::InvalidStateTransition {
                from: self.current_state.to_string(),
                to: new_state.to_string(),
            });
        }

        let transition = StateTransition::new(self.current_state, new_state);
        trace!(from = %transition.from, to = %transition.to, "Loop state changed");

        self.current_state = new_state;
        self.transitions += 1;
        self.history.push_back(transition);
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }

        Ok(transition)
    }

    /// Enter `ShuttingDown` unless already there.
    ///
    /// Returns `None` if the machine was already shutting down.
    pub fn shut_down(&mut self) -> Option<StateTransition> {
        if self.current_state.is_terminal() {
            return None;
        }
        self.transition_to(LoopState::ShuttingDown).ok()
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
