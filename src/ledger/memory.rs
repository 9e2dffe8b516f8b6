use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::{LedgerEntry, VersionLedger};
use crate::error::LedgerError;
use crate::version::VersionId;

/// Ledger held in memory only.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    versions: BTreeMap<VersionId, Option<DateTime<Utc>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger pre-populated with `versions`, without timestamps.
    pub fn with_versions<I, V>(versions: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<VersionId>,
    {
        Self {
            versions: versions.into_iter().map(|v| (v.into(), None)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

impl VersionLedger for InMemoryLedger {
    fn record_applied(
        &mut self,
        version: &VersionId,
        applied_at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.versions.insert(version.clone(), Some(applied_at));
        Ok(())
    }

    fn record_unapplied(&mut self, version: &VersionId) -> Result<(), LedgerError> {
        self.versions.remove(version);
        Ok(())
    }

    fn entries(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        Ok(self
            .versions
            .iter()
            .map(|(version, applied_at)| LedgerEntry {
                version: version.clone(),
                applied_at: *applied_at,
            })
            .collect())
    }

    fn clear(&mut self) -> Result<(), LedgerError> {
        self.versions.clear();
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory ledger".to_string()
    }
}
