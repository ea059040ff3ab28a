use std::path::{Path, PathBuf};

use calamine::{Data, DataType, Reader, open_workbook_auto};
use tracing::debug;

use crate::error::{Result, RosterLoadError};
use crate::provider::{ColumnMapping, RosterProvider};
use crate::raw::{RawCell, RawRecord};

/// Roster stored in a spreadsheet workbook (xlsx, xlsm, xls, xlsb, ods).
///
/// Only the first worksheet is read. Its first non-empty row is the header.
#[derive(Debug, Clone)]
pub struct SpreadsheetRosterProvider {
    path: PathBuf,
    columns: ColumnMapping,
}

impl SpreadsheetRosterProvider {
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

impl RosterProvider for SpreadsheetRosterProvider {
    fn load_rows(&self) -> Result<Vec<RawRecord>> {
        let mut workbook = open_workbook_auto(&self.path)
            .map_err(|e| RosterLoadError::source(self.path_str(), e))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| RosterLoadError::EmptySource {
                path: self.path_str(),
            })?
            .map_err(|e| RosterLoadError::source(self.path_str(), e))?;

        // Sheet row of the header, 1-based.
        let header_row = range.start().map_or(1, |(row, _)| row as usize + 1);

        let mut sheet_rows = range.rows();
        let header = sheet_rows.next().ok_or_else(|| RosterLoadError::EmptySource {
            path: self.path_str(),
        })?;
        let header: Vec<String> = header.iter().map(ToString::to_string).collect();
        let indices = self.columns.resolve(header.iter().map(String::as_str))?;

        let rows: Vec<RawRecord> = sheet_rows
            .enumerate()
            .map(|(i, cells)| {
                let cell = |index: usize| cells.get(index).map_or(RawCell::Empty, to_raw_cell);
                RawRecord::new(
                    header_row + i + 1,
                    cell(indices.uid),
                    cell(indices.name),
                    cell(indices.expiry),
                )
            })
            .collect();

        debug!(path = %self.path.display(), rows = rows.len(), "Read spreadsheet roster");
        Ok(rows)
    }

    fn describe(&self) -> String {
        format!("spreadsheet roster {}", self.path.display())
    }
}

/// Map a workbook cell onto the roster's raw cell type.
fn to_raw_cell(data: &Data) -> RawCell {
    match data {
        Data::Empty => RawCell::Empty,
        Data::String(s) => RawCell::text(s.as_str()),
        Data::Int(i) => RawCell::Int(*i),
        Data::Float(f) => RawCell::Float(*f),
        Data::DateTime(_) | Data::DateTimeIso(_) => data
            .as_datetime()
            .map_or_else(|| RawCell::text(data.to_string()), RawCell::DateTime),
        other => RawCell::text(other.to_string()),
    }
}
