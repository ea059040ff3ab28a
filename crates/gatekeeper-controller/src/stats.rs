use std::fmt;

use gatekeeper_core::Verdict;
use serde::{Deserialize, Serialize};

/// Counters accumulated over one run of the control loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub granted: u64,
    /// Unknown cards (`DENY`).
    pub denied: u64,
    /// Expired cards (`FAULT`).
    pub faulted: u64,
    /// Blank input lines.
    pub ignored: u64,
    pub read_errors: u64,
    pub write_errors: u64,
}

impl RunStats {
    /// Count a decision.
    pub fn record(&mut self, verdict: &Verdict) {
        match verdict {
            Verdict::Granted { .. } => self.granted += 1,
            Verdict::DeniedUnknown => self.denied += 1,
            Verdict::DeniedExpired { .. } => self.faulted += 1,
        }
    }

    /// Number of UIDs that reached a decision.
    pub fn evaluated(&self) -> u64 {
        self.granted + self.denied + self.faulted
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "granted={} denied={} faulted={} ignored={} read_errors={} write_errors={}",
            self.granted,
            self.denied,
            self.faulted,
            self.ignored,
            self.read_errors,
            self.write_errors
        )
    }
}
