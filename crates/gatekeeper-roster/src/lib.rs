//! Cardholder roster for the gatekeeper.
//!
//! The roster is loaded once at startup from a tabular source (a spreadsheet
//! or a CSV export) and never changes afterwards. Loading is a two-step
//! affair:
//!
//! 1. A [`RosterProvider`] reads the source into loosely typed
//!    [`RawRecord`]s, keeping whatever cell types the source had.
//! 2. [`Roster::load`] validates every row against the cardholder schema and
//!    either produces a [`Roster`] of typed [`CardholderRecord`]s or a
//!    [`RosterLoadError::InvalidRows`] listing every offending row.
//!
//! # Examples
//!
//! ```
//! use gatekeeper_roster::{InMemoryRosterProvider, RawCell, RawRecord, Roster};
//!
//! let provider = InMemoryRosterProvider::new(vec![RawRecord::new(
//!     2,
//!     RawCell::text(" A1B2 "),
//!     RawCell::text("Ivanov"),
//!     RawCell::text("2099-01-01"),
//! )]);
//!
//! let roster = Roster::load(&provider).unwrap();
//! assert_eq!(roster.lookup("A1B2").unwrap().name, "Ivanov");
//! ```
//!
//! [`CardholderRecord`]: gatekeeper_core::CardholderRecord

pub mod error;
pub mod provider;
pub mod raw;
pub mod roster;

pub use error::{Result, RosterLoadError, RowIssue, RowIssueKind};
pub use provider::{
    ColumnMapping, CsvRosterProvider, InMemoryRosterProvider, RosterProvider,
    SpreadsheetRosterProvider, open_provider,
};
pub use raw::{RawCell, RawRecord};
pub use roster::Roster;
