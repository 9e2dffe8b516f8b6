//! Registry and ledger mutated together.

use std::collections::BTreeSet;

use chrono::Utc;
use tracing::{debug, warn};

use crate::error::{MigrateError, Result};
use crate::ledger::VersionLedger;
use crate::registry::MigrationRegistry;
use crate::version::VersionId;

/// Pairs a registry with the ledger it mirrors.
///
/// Each mark writes the ledger first and updates the record only once the
/// ledger accepted the change, so a failed ledger call leaves both sides as
/// they were.
pub struct VersionState<'a> {
    registry: &'a mut MigrationRegistry,
    ledger: &'a mut dyn VersionLedger,
}

impl<'a> VersionState<'a> {
    /// Load applied state from the ledger into the registry.
    pub fn load(
        registry: &'a mut MigrationRegistry,
        ledger: &'a mut dyn VersionLedger,
    ) -> Result<Self> {
        let entries = ledger.entries()?;
        registry.sync_with_ledger(&entries);
        Ok(Self { registry, ledger })
    }

    pub fn registry(&self) -> &MigrationRegistry {
        self.registry
    }

    pub fn ledger(&self) -> &dyn VersionLedger {
        &*self.ledger
    }

    pub fn applied_set(&self) -> Result<BTreeSet<VersionId>> {
        Ok(self.ledger.applied_set()?)
    }

    pub fn is_migrated(&self, version: &VersionId) -> Result<bool> {
        Ok(self.ledger.contains(version)?)
    }

    /// Record a registered version as applied.
    pub fn mark_migrated(&mut self, version: &VersionId) -> Result<()> {
        if !self.registry.contains(version) {
            return Err(MigrateError::NotFound(version.clone()));
        }
        let applied_at = Utc::now();
        self.ledger.record_applied(version, applied_at)?;
        if let Some(record) = self.registry.get_mut(version) {
            record.set_migrated(Some(applied_at));
        }
        debug!(%version, "marked migrated");
        Ok(())
    }

    /// Remove a registered version from the applied set.
    pub fn mark_not_migrated(&mut self, version: &VersionId) -> Result<()> {
        if !self.registry.contains(version) {
            return Err(MigrateError::NotFound(version.clone()));
        }
        self.ledger.record_unapplied(version)?;
        if let Some(record) = self.registry.get_mut(version) {
            record.set_not_migrated();
        }
        debug!(%version, "marked not migrated");
        Ok(())
    }

    /// Remove a ledger entry that has no registered migration.
    pub fn remove_unregistered(&mut self, version: &VersionId) -> Result<()> {
        self.ledger.record_unapplied(version)?;
        warn!(%version, "removed unregistered version from the ledger");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Utc};

    use super::*;
    use crate::error::LedgerError;
    use crate::ledger::{InMemoryLedger, LedgerEntry};
    use crate::migration::SqlMigration;

    /// Ledger that fails every write after `allowed_writes` succeeded.
    pub(crate) struct FlakyLedger {
        pub(crate) inner: InMemoryLedger,
        pub(crate) allowed_writes: usize,
    }

    impl FlakyLedger {
        fn write(&mut self) -> std::result::Result<(), LedgerError> {
            if self.allowed_writes == 0 {
                return Err(LedgerError::Backend("connection lost".into()));
            }
            self.allowed_writes -= 1;
            Ok(())
        }
    }

    impl VersionLedger for FlakyLedger {
        fn record_applied(
            &mut self,
            version: &VersionId,
            applied_at: DateTime<Utc>,
        ) -> std::result::Result<(), LedgerError> {
            self.write()?;
            self.inner.record_applied(version, applied_at)
        }

        fn record_unapplied(&mut self, version: &VersionId) -> std::result::Result<(), LedgerError> {
            self.write()?;
            self.inner.record_unapplied(version)
        }

        fn entries(&self) -> std::result::Result<Vec<LedgerEntry>, LedgerError> {
            self.inner.entries()
        }

        fn clear(&mut self) -> std::result::Result<(), LedgerError> {
            self.inner.clear()
        }
    }

    fn registry(versions: &[&str]) -> MigrationRegistry {
        let mut registry = MigrationRegistry::new();
        for v in versions {
            registry
                .register(*v, Arc::new(SqlMigration::inline("SELECT 1", Some("SELECT 0"))))
                .unwrap();
        }
        registry
    }

    #[test]
    fn test_load_syncs_records() {
        let mut registry = registry(&["01", "02"]);
        let mut ledger = InMemoryLedger::with_versions(["02", "09"]);
        let state = VersionState::load(&mut registry, &mut ledger).unwrap();
        assert!(!state.registry().get(&"01".into()).unwrap().is_migrated());
        assert!(state.registry().get(&"02".into()).unwrap().is_migrated());
        assert_eq!(state.applied_set().unwrap().len(), 2);
    }

    #[test]
    fn test_marks_keep_record_and_ledger_in_step() {
        let mut registry = registry(&["01"]);
        let mut ledger = InMemoryLedger::new();
        let v = VersionId::new("01");
        {
            let mut state = VersionState::load(&mut registry, &mut ledger).unwrap();
            state.mark_migrated(&v).unwrap();
            assert!(state.is_migrated(&v).unwrap());
            assert!(state.registry().get(&v).unwrap().applied_at().is_some());

            state.mark_not_migrated(&v).unwrap();
            assert!(!state.is_migrated(&v).unwrap());
        }
        assert!(!registry.get(&v).unwrap().is_migrated());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_unregistered_version_cannot_be_marked() {
        let mut registry = registry(&["01"]);
        let mut ledger = InMemoryLedger::new();
        let mut state = VersionState::load(&mut registry, &mut ledger).unwrap();
        let err = state.mark_migrated(&"05".into()).unwrap_err();
        assert!(matches!(err, MigrateError::NotFound(_)));
        assert!(state.applied_set().unwrap().is_empty());
    }

    #[test]
    fn test_ledger_failure_leaves_record_untouched() {
        let mut registry = registry(&["01"]);
        let mut ledger = FlakyLedger {
            inner: InMemoryLedger::new(),
            allowed_writes: 0,
        };
        let mut state = VersionState::load(&mut registry, &mut ledger).unwrap();
        let err = state.mark_migrated(&"01".into()).unwrap_err();
        assert_eq!(err.to_string(), "Ledger backend error: connection lost");
        assert!(!state.registry().get(&"01".into()).unwrap().is_migrated());
    }

    #[test]
    fn test_remove_unregistered() {
        let mut registry = registry(&[]);
        let mut ledger = InMemoryLedger::with_versions(["07"]);
        let mut state = VersionState::load(&mut registry, &mut ledger).unwrap();
        state.remove_unregistered(&"07".into()).unwrap();
        assert!(state.applied_set().unwrap().is_empty());
    }
}
