use crate::{
    Result,
    constants::{LINE_TERMINATOR, TOKEN_DENY, TOKEN_FAULT, TOKEN_GRANT},
    error::Error,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Card UID as read from the reader or stored in the roster.
///
/// A `Uid` is always trimmed and never empty. Comparison is case-sensitive:
/// `A1B2` and `a1b2` are different cards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Uid(String);

impl Uid {
    /// Parse a raw UID, trimming surrounding whitespace.
    ///
    /// # Errors
    /// Returns `Error::InvalidUid` if nothing is left after trimming.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidUid("UID is empty".to_string()));
        }
        Ok(Uid(trimmed.to_string()))
    }

    /// Get the UID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Uid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uid::parse(s)
    }
}

impl TryFrom<String> for Uid {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Uid::parse(&value)
    }
}

impl From<Uid> for String {
    fn from(uid: Uid) -> Self {
        uid.0
    }
}

impl AsRef<str> for Uid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lets hash-based rosters be queried with a plain `&str`.
impl std::borrow::Borrow<str> for Uid {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// One authorized cardholder.
///
/// `expiry` is local wall-clock time. The card is usable strictly before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardholderRecord {
    pub uid: Uid,
    pub name: String,
    pub expiry: NaiveDateTime,
}

impl CardholderRecord {
    pub fn new(uid: Uid, name: impl Into<String>, expiry: NaiveDateTime) -> Self {
        Self {
            uid,
            name: name.into(),
            expiry,
        }
    }

    /// Returns `true` if the card is still valid at `now`.
    ///
    /// The comparison is strict: a card expiring exactly at `now` is expired.
    #[inline]
    #[must_use]
    pub fn is_valid_at(&self, now: NaiveDateTime) -> bool {
        now < self.expiry
    }
}

/// Outcome of evaluating a UID against the roster at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// Card is on the roster and has not expired.
    Granted { name: String },

    /// Card is on the roster but its expiry has passed.
    DeniedExpired { name: String },

    /// Card is not on the roster.
    DeniedUnknown,
}

impl Verdict {
    /// Returns `true` for [`Verdict::Granted`].
    #[inline]
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Verdict::Granted { .. })
    }

    /// Name of the cardholder, when the card was found.
    #[must_use]
    pub fn holder_name(&self) -> Option<&str> {
        match self {
            Verdict::Granted { name } | Verdict::DeniedExpired { name } => Some(name),
            Verdict::DeniedUnknown => None,
        }
    }

    /// Command the actuator must receive for this verdict.
    #[inline]
    #[must_use]
    pub fn command(&self) -> Command {
        Command::from(self)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Verdict::Granted { name } => write!(f, "Access granted for: {name}"),
            Verdict::DeniedExpired { name } => {
                write!(f, "Access denied! Card of {name} has expired")
            }
            Verdict::DeniedUnknown => write!(f, "Card not found in roster"),
        }
    }
}

/// Command token sent to the lock/indicator actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Command {
    Grant,
    Deny,
    Fault,
}

impl Command {
    /// Wire token without terminator.
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Grant => TOKEN_GRANT,
            Command::Deny => TOKEN_DENY,
            Command::Fault => TOKEN_FAULT,
        }
    }

    /// Newline-terminated bytes ready to be written to the transport.
    #[must_use]
    pub fn to_wire(self) -> Vec<u8> {
        let token = self.as_str().as_bytes();
        let mut bytes = Vec::with_capacity(token.len() + 1);
        bytes.extend_from_slice(token);
        bytes.push(LINE_TERMINATOR);
        bytes
    }
}

impl From<&Verdict> for Command {
    fn from(verdict: &Verdict) -> Self {
        match verdict {
            Verdict::Granted { .. } => Command::Grant,
            Verdict::DeniedExpired { .. } => Command::Fault,
            Verdict::DeniedUnknown => Command::Deny,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
