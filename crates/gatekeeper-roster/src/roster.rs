use std::collections::HashMap;

use gatekeeper_core::{CardholderRecord, Uid};
use tracing::{debug, info, warn};

use crate::error::{Result, RosterLoadError, RowIssue, RowIssueKind};
use crate::provider::RosterProvider;
use crate::raw::RawRecord;

/// Immutable table of authorized cardholders.
///
/// Records keep their load order; lookups go through a hash index on the
/// trimmed UID. Duplicate UIDs are rejected at load time, so each UID maps to
/// exactly one record.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    records: Vec<CardholderRecord>,
    index: HashMap<Uid, usize>,
}

impl Roster {
    /// Load and validate the roster from a provider.
    ///
    /// Blank rows are skipped. Every other row must yield a non-empty UID,
    /// a non-empty name and a parseable expiry; UIDs must be unique.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if the source cannot be read, or
    /// [`RosterLoadError::InvalidRows`] listing every offending row.
    pub fn load<P: RosterProvider + ?Sized>(provider: &P) -> Result<Self> {
        let rows = provider.load_rows()?;
        debug!(
            source = %provider.describe(),
            rows = rows.len(),
            "Validating roster rows"
        );

        let roster = Self::from_raw(rows)?;
        info!(
            source = %provider.describe(),
            cardholders = roster.len(),
            "Roster loaded"
        );
        Ok(roster)
    }

    /// Validate raw rows into a roster.
    ///
    /// # Errors
    ///
    /// Returns [`RosterLoadError::InvalidRows`] if any row fails validation.
    pub fn from_raw(rows: Vec<RawRecord>) -> Result<Self> {
        let mut roster = Roster::default();
        let mut first_seen: HashMap<String, usize> = HashMap::new();
        let mut issues = Vec::new();

        for raw in rows {
            if raw.is_blank() {
                continue;
            }

            match validate_row(&raw) {
                Ok(record) => {
                    if let Some(&first_row) = first_seen.get(record.uid.as_str()) {
                        issues.push(RowIssue::new(
                            raw.row,
                            RowIssueKind::DuplicateUid {
                                uid: record.uid.to_string(),
                                first_row,
                            },
                        ));
                        continue;
                    }
                    first_seen.insert(record.uid.to_string(), raw.row);
                    roster.insert(record);
                }
                Err(kinds) => {
                    issues.extend(kinds.into_iter().map(|kind| RowIssue::new(raw.row, kind)));
                }
            }
        }

        if !issues.is_empty() {
            warn!(count = issues.len(), "Roster rejected");
            return Err(RosterLoadError::InvalidRows(issues));
        }

        Ok(roster)
    }

    /// Build a roster from already typed records.
    ///
    /// Row numbers in errors are 1-based positions in `records`.
    ///
    /// # Errors
    ///
    /// Returns [`RosterLoadError::InvalidRows`] on duplicate UIDs.
    pub fn from_records(records: impl IntoIterator<Item = CardholderRecord>) -> Result<Self> {
        let mut roster = Roster::default();
        let mut issues = Vec::new();

        for (position, record) in records.into_iter().enumerate() {
            if let Some(&existing) = roster.index.get(record.uid.as_str()) {
                issues.push(RowIssue::new(
                    position + 1,
                    RowIssueKind::DuplicateUid {
                        uid: record.uid.to_string(),
                        first_row: existing + 1,
                    },
                ));
                continue;
            }
            roster.insert(record);
        }

        if !issues.is_empty() {
            return Err(RosterLoadError::InvalidRows(issues));
        }
        Ok(roster)
    }

    fn insert(&mut self, record: CardholderRecord) {
        self.index.insert(record.uid.clone(), self.records.len());
        self.records.push(record);
    }

    /// Exact-match lookup on the trimmed UID.
    ///
    /// An empty UID never matches.
    pub fn lookup(&self, uid: &str) -> Option<&CardholderRecord> {
        let uid = uid.trim();
        if uid.is_empty() {
            return None;
        }
        self.index.get(uid).map(|&i| &self.records[i])
    }

    /// Number of cardholders.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the roster holds no cardholders.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in load order.
    pub fn iter(&self) -> impl Iterator<Item = &CardholderRecord> {
        self.records.iter()
    }

    /// First record in load order, used as a hint in simulation mode.
    pub fn first(&self) -> Option<&CardholderRecord> {
        self.records.first()
    }
}

/// Validate one row, collecting every problem rather than stopping at the first.
fn validate_row(raw: &RawRecord) -> std::result::Result<CardholderRecord, Vec<RowIssueKind>> {
    let uid = raw
        .uid
        .to_uid()
        .and_then(|s| Uid::parse(&s).map_err(|_| RowIssueKind::EmptyUid));
    let name = raw.name.to_name();
    let expiry = raw.expiry.to_expiry();

    match (uid, name, expiry) {
        (Ok(uid), Ok(name), Ok(expiry)) => Ok(CardholderRecord::new(uid, name, expiry)),
        (uid, name, expiry) => Err([uid.err(), name.err(), expiry.err()]
            .into_iter()
            .flatten()
            .collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InMemoryRosterProvider;
    use crate::raw::RawCell;
    use chrono::{NaiveDate, NaiveDateTime};

    fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn row(n: usize, uid: &str, name: &str, expiry: &str) -> RawRecord {
        RawRecord::new(n, RawCell::text(uid), RawCell::text(name), RawCell::text(expiry))
    }

    #[test]
    fn test_load_trims_uids() {
        let provider = InMemoryRosterProvider::new(vec![row(2, "  A1B2 ", "Ivanov", "2099-01-01")]);
        let roster = Roster::load(&provider).unwrap();

        assert_eq!(roster.len(), 1);
        let record = roster.lookup("A1B2").unwrap();
        assert_eq!(record.uid.as_str(), "A1B2");
        assert_eq!(record.name, "Ivanov");
        assert_eq!(record.expiry, midnight(2099, 1, 1));
    }

    #[test]
    fn test_lookup_is_exact_and_case_sensitive() {
        let roster = Roster::from_raw(vec![row(2, "A1B2", "Ivanov", "2099-01-01")]).unwrap();

        assert!(roster.lookup(" A1B2\n").is_some());
        assert!(roster.lookup("a1b2").is_none());
        assert!(roster.lookup("A1B").is_none());
        assert!(roster.lookup("A1B2C").is_none());
        assert!(roster.lookup("").is_none());
        assert!(roster.lookup("   ").is_none());
    }

    #[test]
    fn test_every_bad_row_reported() {
        let rows = vec![
            row(2, "A1", "Ivanov", "2099-01-01"),
            row(3, "", "Petrov", "2099-01-01"),
            row(4, "C3", "", "not a date"),
            row(5, "D4", "Sidorov", "2099-01-01"),
        ];

        let error = Roster::from_raw(rows).unwrap_err();
        let issues = error.row_issues();

        assert_eq!(
            issues,
            &[
                RowIssue::new(3, RowIssueKind::EmptyUid),
                RowIssue::new(4, RowIssueKind::MissingName),
                RowIssue::new(4, RowIssueKind::InvalidExpiry("not a date".into())),
            ]
        );
    }

    #[test]
    fn test_duplicate_uid_rejected() {
        let rows = vec![
            row(2, "A1", "Ivanov", "2099-01-01"),
            row(3, "B2", "Petrov", "2099-01-01"),
            row(4, " A1 ", "Sidorov", "2099-01-01"),
        ];

        let error = Roster::from_raw(rows).unwrap_err();
        assert_eq!(
            error.row_issues(),
            &[RowIssue::new(
                4,
                RowIssueKind::DuplicateUid {
                    uid: "A1".into(),
                    first_row: 2,
                }
            )]
        );
    }

    #[test]
    fn test_blank_rows_skipped() {
        let rows = vec![
            row(2, "A1", "Ivanov", "2099-01-01"),
            RawRecord::new(3, RawCell::Empty, RawCell::Empty, RawCell::Empty),
        ];
        let roster = Roster::from_raw(rows).unwrap();
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_load_order_preserved() {
        let rows = vec![
            row(2, "Z9", "Last", "2099-01-01"),
            row(3, "A1", "First", "2099-01-01"),
        ];
        let roster = Roster::from_raw(rows).unwrap();

        assert_eq!(roster.first().unwrap().uid.as_str(), "Z9");
        let names: Vec<_> = roster.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Last", "First"]);
    }

    #[test]
    fn test_from_records_rejects_duplicates() {
        let uid = Uid::parse("A1").unwrap();
        let records = vec![
            CardholderRecord::new(uid.clone(), "Ivanov", midnight(2099, 1, 1)),
            CardholderRecord::new(uid, "Petrov", midnight(2099, 1, 1)),
        ];
        let error = Roster::from_records(records).unwrap_err();
        assert!(matches!(
            error.row_issues()[0].kind,
            RowIssueKind::DuplicateUid { first_row: 1, .. }
        ));
    }

    #[test]
    fn test_empty_roster() {
        let roster = Roster::from_raw(Vec::new()).unwrap();
        assert!(roster.is_empty());
        assert!(roster.first().is_none());
        assert!(roster.lookup("ZZZZ").is_none());
    }
}
