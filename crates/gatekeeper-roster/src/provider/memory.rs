use crate::error::Result;
use crate::provider::RosterProvider;
use crate::raw::RawRecord;

/// Provider over rows already held in memory.
///
/// Useful for tests and for embedding a fixed roster.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRosterProvider {
    rows: Vec<RawRecord>,
}

impl InMemoryRosterProvider {
    pub fn new(rows: Vec<RawRecord>) -> Self {
        Self { rows }
    }
}

impl RosterProvider for InMemoryRosterProvider {
    fn load_rows(&self) -> Result<Vec<RawRecord>> {
        Ok(self.rows.clone())
    }

    fn describe(&self) -> String {
        format!("in-memory roster ({} rows)", self.rows.len())
    }
}
