//! Error types for roster loading.
//!
//! Every variant is fatal: the gatekeeper refuses to serve without a roster
//! it fully trusts.

use std::fmt;

/// Result type alias for roster operations.
pub type Result<T> = std::result::Result<T, RosterLoadError>;

/// Errors that can occur while loading the roster.
#[derive(Debug, thiserror::Error)]
pub enum RosterLoadError {
    /// The source could not be opened or parsed at all.
    #[error("Failed to read roster source {path}: {message}")]
    Source { path: String, message: String },

    /// The file extension does not map to a known provider.
    #[error("Unsupported roster format: {path}")]
    UnsupportedFormat { path: String },

    /// A required column header is absent.
    #[error("Missing required column '{column}' in roster header")]
    MissingColumn { column: String },

    /// The source has no worksheet or no header row.
    #[error("Roster source {path} is empty")]
    EmptySource { path: String },

    /// One or more rows failed schema validation.
    #[error("Roster has {} invalid row(s): {}", .0.len(), format_issues(.0))]
    InvalidRows(Vec<RowIssue>),
}

impl RosterLoadError {
    /// Create a new source error.
    pub fn source(path: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Source {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create a new missing column error.
    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
        }
    }

    /// Row issues carried by [`RosterLoadError::InvalidRows`], if any.
    pub fn row_issues(&self) -> &[RowIssue] {
        match self {
            Self::InvalidRows(issues) => issues,
            _ => &[],
        }
    }
}

/// A single row that failed validation.
///
/// `row` is the 1-based row number as an operator sees it in a spreadsheet,
/// so the header is row 1 and the first cardholder is row 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowIssue {
    pub row: usize,
    pub kind: RowIssueKind,
}

impl RowIssue {
    pub fn new(row: usize, kind: RowIssueKind) -> Self {
        Self { row, kind }
    }
}

impl fmt::Display for RowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.row, self.kind)
    }
}

/// Why a row was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowIssueKind {
    /// UID cell is empty or whitespace only.
    EmptyUid,

    /// UID cell holds something that cannot be a UID (e.g. a date).
    InvalidUid(String),

    /// Holder name cell is empty.
    MissingName,

    /// Expiry cell is empty.
    MissingExpiry,

    /// Expiry cell could not be coerced to a timestamp.
    InvalidExpiry(String),

    /// UID already appeared on an earlier row.
    DuplicateUid { uid: String, first_row: usize },
}

impl fmt::Display for RowIssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyUid => write!(f, "UID is empty"),
            Self::InvalidUid(value) => write!(f, "UID '{value}' is not a valid card identifier"),
            Self::MissingName => write!(f, "holder name is empty"),
            Self::MissingExpiry => write!(f, "expiry date is empty"),
            Self::InvalidExpiry(value) => write!(f, "expiry '{value}' is not a recognised date"),
            Self::DuplicateUid { uid, first_row } => {
                write!(f, "UID '{uid}' already used on row {first_row}")
            }
        }
    }
}

fn format_issues(issues: &[RowIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
