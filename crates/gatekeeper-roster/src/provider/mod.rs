//! Roster sources.
//!
//! A [`RosterProvider`] knows how to read one kind of tabular source into
//! [`RawRecord`]s. It does not validate; that is [`Roster::load`]'s job.
//!
//! [`Roster::load`]: crate::Roster::load

mod csv_file;
mod memory;
mod spreadsheet;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RosterLoadError};
use crate::raw::RawRecord;

pub use self::csv_file::CsvRosterProvider;
pub use self::memory::InMemoryRosterProvider;
pub use self::spreadsheet::SpreadsheetRosterProvider;

/// Source of raw roster rows.
pub trait RosterProvider {
    /// Read every data row from the source.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be opened, has no header, or
    /// lacks one of the mapped columns.
    fn load_rows(&self) -> Result<Vec<RawRecord>>;

    /// Human-readable description of the source for logs.
    fn describe(&self) -> String;
}

/// Header names of the three roster columns.
///
/// Defaults match the spreadsheet the front desk maintains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub uid: String,
    pub name: String,
    pub expiry: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            uid: "UID номер карточки".to_string(),
            name: "Фамилия ИО".to_string(),
            expiry: "Срок окончания".to_string(),
        }
    }
}

/// Column positions resolved against a header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ColumnIndices {
    pub uid: usize,
    pub name: usize,
    pub expiry: usize,
}

impl ColumnMapping {
    /// Locate the mapped columns in a header row.
    ///
    /// Header cells are compared after trimming.
    pub(crate) fn resolve<'a, I>(&self, headers: I) -> Result<ColumnIndices>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let headers: Vec<&str> = headers.into_iter().map(str::trim).collect();
        let find = |column: &str| {
            headers
                .iter()
                .position(|h| *h == column.trim())
                .ok_or_else(|| RosterLoadError::missing_column(column))
        };

        Ok(ColumnIndices {
            uid: find(&self.uid)?,
            name: find(&self.name)?,
            expiry: find(&self.expiry)?,
        })
    }
}

/// Pick a provider for `path` by its extension.
///
/// # Errors
///
/// Returns [`RosterLoadError::UnsupportedFormat`] for unknown extensions.
pub fn open_provider(
    path: impl AsRef<Path>,
    columns: ColumnMapping,
) -> Result<Box<dyn RosterProvider>> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("xlsx" | "xlsm" | "xls" | "xlsb" | "ods") => {
            Ok(Box::new(SpreadsheetRosterProvider::new(path, columns)))
        }
        Some("csv") => Ok(Box::new(CsvRosterProvider::new(path, columns))),
        _ => Err(RosterLoadError::UnsupportedFormat {
            path: path.display().to_string(),
        }),
    }
}
