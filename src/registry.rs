//! In-memory catalog of known migrations.
//!
//! Iteration order is registration order. Callers register migrations in the
//! order they must run; range commands additionally expect that order to be
//! sorted by version.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::debug;

use crate::error::{MigrateError, Result};
use crate::ledger::LedgerEntry;
use crate::migration::Migration;
use crate::version::{VersionId, VersionRecord};

#[derive(Debug, Default, Clone)]
pub struct MigrationRegistry {
    records: Vec<VersionRecord>,
    index: HashMap<VersionId, usize>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a migration. Fails with `DuplicateVersion` if the version is
    /// already present.
    pub fn register(
        &mut self,
        version: impl Into<VersionId>,
        migration: Arc<dyn Migration>,
    ) -> Result<()> {
        let version = version.into();
        if self.index.contains_key(&version) {
            return Err(MigrateError::DuplicateVersion(version));
        }
        self.index.insert(version.clone(), self.records.len());
        self.records.push(VersionRecord::new(version, migration));
        Ok(())
    }

    pub fn with<M: Migration + 'static>(
        mut self,
        version: impl Into<VersionId>,
        migration: M,
    ) -> Result<Self> {
        self.register(version, Arc::new(migration))?;
        Ok(self)
    }

    pub fn get(&self, version: &VersionId) -> Option<&VersionRecord> {
        self.index.get(version).map(|&i| &self.records[i])
    }

    pub(crate) fn get_mut(&mut self, version: &VersionId) -> Option<&mut VersionRecord> {
        match self.index.get(version) {
            Some(&i) => self.records.get_mut(i),
            None => None,
        }
    }

    /// Like [`get`](Self::get) but fails with `NotFound`.
    pub fn require(&self, version: &VersionId) -> Result<&VersionRecord> {
        self.get(version)
            .ok_or_else(|| MigrateError::NotFound(version.clone()))
    }

    pub fn contains(&self, version: &VersionId) -> bool {
        self.index.contains_key(version)
    }

    pub fn position(&self, version: &VersionId) -> Option<usize> {
        self.index.get(version).copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &VersionRecord> {
        self.records.iter()
    }

    pub fn versions(&self) -> Vec<VersionId> {
        self.records.iter().map(|r| r.version().clone()).collect()
    }

    /// Align every record's applied state with the ledger. Returns the ledger
    /// versions that have no registered migration.
    pub fn sync_with_ledger(&mut self, entries: &[LedgerEntry]) -> Vec<VersionId> {
        let applied: HashMap<&VersionId, &LedgerEntry> =
            entries.iter().map(|e| (&e.version, e)).collect();

        for record in &mut self.records {
            match applied.get(record.version()) {
                Some(entry) => record.set_migrated(entry.applied_at),
                None => record.set_not_migrated(),
            }
        }

        let orphans: Vec<VersionId> = entries
            .iter()
            .filter(|e| !self.index.contains_key(&e.version))
            .map(|e| e.version.clone())
            .collect();
        debug!(
            registered = self.records.len(),
            applied = entries.len(),
            orphans = orphans.len(),
            "registry synced with ledger"
        );
        orphans
    }

    /// Applied versions without a registered migration, sorted.
    pub fn unregistered(&self, applied: &BTreeSet<VersionId>) -> Vec<VersionId> {
        applied
            .iter()
            .filter(|v| !self.contains(v))
            .cloned()
            .collect()
    }

    /// Registered versions not in `applied`, in registration order.
    pub fn pending(&self, applied: &BTreeSet<VersionId>) -> Vec<&VersionRecord> {
        self.records
            .iter()
            .filter(|r| !applied.contains(r.version()))
            .collect()
    }

    /// Last registered version that is applied.
    pub fn current_version(&self, applied: &BTreeSet<VersionId>) -> Option<&VersionId> {
        self.records
            .iter()
            .rev()
            .map(VersionRecord::version)
            .find(|v| applied.contains(*v))
    }

    pub fn latest_version(&self) -> Option<&VersionId> {
        self.records.last().map(VersionRecord::version)
    }

    /// Words understood by [`resolve_alias`](Self::resolve_alias).
    pub const ALIASES: [&'static str; 5] = ["first", "current", "prev", "next", "latest"];

    pub fn is_alias(word: &str) -> bool {
        Self::ALIASES.contains(&word)
    }

    /// Resolve `first`, `current`, `prev`, `next` and `latest`.
    ///
    /// Returns `None` when the alias names a position that does not exist
    /// (`next` when everything up to the end is applied). Anything that is
    /// not an alias is returned as a literal version, registered or not.
    pub fn resolve_alias(&self, alias: &str, applied: &BTreeSet<VersionId>) -> Option<VersionId> {
        let first = VersionId::first;
        match alias {
            "first" => Some(first()),
            "current" => Some(self.current_version(applied).cloned().unwrap_or_else(first)),
            "latest" => Some(self.latest_version().cloned().unwrap_or_else(first)),
            "prev" => {
                let current = self.current_version(applied)?;
                let pos = self.position(current)?;
                Some(
                    self.records[..pos]
                        .iter()
                        .rev()
                        .map(VersionRecord::version)
                        .find(|v| applied.contains(*v))
                        .cloned()
                        .unwrap_or_else(first),
                )
            }
            "next" => {
                let start = match self.current_version(applied) {
                    Some(current) => self.position(current)? + 1,
                    None => 0,
                };
                self.records[start..]
                    .iter()
                    .map(VersionRecord::version)
                    .find(|v| !applied.contains(*v))
                    .cloned()
            }
            literal => Some(VersionId::new(literal)),
        }
    }
}
