//! Shared domain types for the gatekeeper access controller.
//!
//! Every other crate in the workspace speaks in terms of the types defined
//! here: the normalized card [`Uid`], the roster's [`CardholderRecord`], the
//! access [`Verdict`] and the wire [`Command`] sent back to the actuator.

pub mod clock;
pub mod constants;
pub mod error;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
