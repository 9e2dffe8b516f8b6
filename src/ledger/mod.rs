//! Persisted set of applied versions.
//!
//! The ledger is a flat keyspace of version identifiers. It may hold versions
//! the registry does not know about (orphans); that is expected, not an error.
//!
//! Implementations:
//! - `memory`: `InMemoryLedger`, for tests and embedding
//! - `file`: `JsonFileLedger`, a JSON document replaced atomically on write

mod file;
mod memory;

pub use file::JsonFileLedger;
pub use memory::InMemoryLedger;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::version::VersionId;

/// One applied version as stored in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub version: VersionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,
}

/// Storage contract for applied versions.
///
/// Each call commits fully or not at all. A single migrator process is
/// assumed; locking belongs to the implementation.
pub trait VersionLedger {
    /// Record `version` as applied. Recording an applied version again only
    /// refreshes its timestamp.
    fn record_applied(
        &mut self,
        version: &VersionId,
        applied_at: DateTime<Utc>,
    ) -> Result<(), LedgerError>;

    /// Remove `version`. Removing an absent version is a no-op.
    fn record_unapplied(&mut self, version: &VersionId) -> Result<(), LedgerError>;

    fn entries(&self) -> Result<Vec<LedgerEntry>, LedgerError>;

    fn clear(&mut self) -> Result<(), LedgerError>;

    fn applied_set(&self) -> Result<BTreeSet<VersionId>, LedgerError> {
        Ok(self.entries()?.into_iter().map(|e| e.version).collect())
    }

    fn contains(&self, version: &VersionId) -> Result<bool, LedgerError> {
        Ok(self.applied_set()?.contains(version))
    }

    /// Human readable location, shown by `status`.
    fn describe(&self) -> String {
        "version ledger".to_string()
    }
}
