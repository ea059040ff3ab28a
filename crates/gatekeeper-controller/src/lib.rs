//! Access decision and control loop for the gatekeeper.
//!
//! This crate ties the roster and the device channel together:
//!
//! - [`evaluate`] turns a UID, a reference time and the roster into a
//!   [`Verdict`](gatekeeper_core::Verdict);
//! - [`dispatch`] logs that verdict and sends the matching command;
//! - [`Gatekeeper`] runs the live or simulated loop around them, tracked by
//!   a [`StateMachine`].

pub mod control_loop;
pub mod dispatcher;
pub mod error;
pub mod evaluator;
pub mod state_machine;
pub mod stats;

pub use control_loop::{ExitReason, Gatekeeper, READ_ERROR_BACKOFF, RunReport};
pub use dispatcher::dispatch;
pub use error::{ControlError, Result};
pub use evaluator::evaluate;
pub use state_machine::{LoopState, StateMachine, StateTransition};
pub use stats::RunStats;
