//! Loosely typed roster rows and their coercion rules.
//!
//! Spreadsheets hand back cells that may be text, integers, floats or dates
//! depending on how a clerk typed them. A UID typed as `123456` arrives as a
//! number; a date may arrive as a real date cell or as `31.12.2025` text.
//! These rules turn such cells into the strict types of the roster schema.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::RowIssueKind;

/// Date-only formats accepted in text cells. Midnight is implied.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%Y/%m/%d"];

/// Date-time formats accepted in text cells.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

/// A single cell as read from the source.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    DateTime(NaiveDateTime),
}

impl RawCell {
    /// Build a text cell, mapping blank strings to [`RawCell::Empty`].
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            RawCell::Empty
        } else {
            RawCell::Text(value)
        }
    }

    /// Returns `true` for [`RawCell::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, RawCell::Empty)
    }

    /// Coerce the cell to a trimmed UID string.
    ///
    /// Integral numbers are rendered without a fractional part, so a UID
    /// stored as the float `123456.0` becomes `"123456"`.
    pub fn to_uid(&self) -> Result<String, RowIssueKind> {
        let uid = match self {
            RawCell::Empty => return Err(RowIssueKind::EmptyUid),
            RawCell::Text(s) => s.trim().to_string(),
            RawCell::Int(i) => i.to_string(),
            RawCell::Float(f) if f.is_finite() && f.fract() == 0.0 => format!("{f:.0}"),
            RawCell::Float(f) => return Err(RowIssueKind::InvalidUid(f.to_string())),
            RawCell::DateTime(dt) => return Err(RowIssueKind::InvalidUid(dt.to_string())),
        };

        if uid.is_empty() {
            return Err(RowIssueKind::EmptyUid);
        }
        Ok(uid)
    }

    /// Coerce the cell to a non-empty holder name.
    pub fn to_name(&self) -> Result<String, RowIssueKind> {
        let name = match self {
            RawCell::Empty => return Err(RowIssueKind::MissingName),
            RawCell::Text(s) => s.trim().to_string(),
            RawCell::Int(i) => i.to_string(),
            RawCell::Float(f) => f.to_string(),
            RawCell::DateTime(dt) => dt.to_string(),
        };

        if name.is_empty() {
            return Err(RowIssueKind::MissingName);
        }
        Ok(name)
    }

    /// Coerce the cell to an expiry timestamp.
    pub fn to_expiry(&self) -> Result<NaiveDateTime, RowIssueKind> {
        match self {
            RawCell::Empty => Err(RowIssueKind::MissingExpiry),
            RawCell::DateTime(dt) => Ok(*dt),
            RawCell::Text(s) => {
                parse_expiry(s.trim()).ok_or_else(|| RowIssueKind::InvalidExpiry(s.clone()))
            }
            RawCell::Int(i) => Err(RowIssueKind::InvalidExpiry(i.to_string())),
            RawCell::Float(f) => Err(RowIssueKind::InvalidExpiry(f.to_string())),
        }
    }
}

/// Parse a textual expiry date in any of the accepted formats.
pub fn parse_expiry(value: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// One roster row before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// 1-based source row number (header is row 1).
    pub row: usize,
    pub uid: RawCell,
    pub name: RawCell,
    pub expiry: RawCell,
}

impl RawRecord {
    pub fn new(row: usize, uid: RawCell, name: RawCell, expiry: RawCell) -> Self {
        Self {
            row,
            uid,
            name,
            expiry,
        }
    }

    /// Returns `true` if every cell of the row is empty.
    ///
    /// Spreadsheets often carry trailing blank rows; these are skipped rather
    /// than reported.
    pub fn is_blank(&self) -> bool {
        self.uid.is_empty() && self.name.is_empty() && self.expiry.is_empty()
    }
}
