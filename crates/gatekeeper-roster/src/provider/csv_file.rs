use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, RosterLoadError};
use crate::provider::{ColumnMapping, RosterProvider};
use crate::raw::{RawCell, RawRecord};

/// Roster stored as a CSV file with a header row.
///
/// Every cell is read as text; typing happens during validation.
#[derive(Debug, Clone)]
pub struct CsvRosterProvider {
    path: PathBuf,
    columns: ColumnMapping,
}

impl CsvRosterProvider {
    pub fn new(path: impl AsRef<Path>, columns: ColumnMapping) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            columns,
        }
    }

    fn path_str(&self) -> String {
        self.path.display().to_string()
    }
}

impl RosterProvider for CsvRosterProvider {
    fn load_rows(&self) -> Result<Vec<RawRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| RosterLoadError::source(self.path_str(), e))?;

        let headers = reader
            .headers()
            .map_err(|e| RosterLoadError::source(self.path_str(), e))?
            .clone();
        if headers.is_empty() {
            return Err(RosterLoadError::EmptySource {
                path: self.path_str(),
            });
        }
        let indices = self.columns.resolve(headers.iter())?;

        let mut rows = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record.map_err(|e| RosterLoadError::source(self.path_str(), e))?;
            let cell = |index: usize| record.get(index).map_or(RawCell::Empty, RawCell::text);

            rows.push(RawRecord::new(
                i + 2,
                cell(indices.uid),
                cell(indices.name),
                cell(indices.expiry),
            ));
        }

        debug!(path = %self.path.display(), rows = rows.len(), "Read CSV roster");
        Ok(rows)
    }

    fn describe(&self) -> String {
        format!("CSV roster {}", self.path.display())
    }
}
