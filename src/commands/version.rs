//! Manually add or delete versions in the version table.
//!
//! Every flag combination is validated before the ledger is touched. Bulk
//! operations are not transactional: when the ledger fails halfway through a
//! range, the versions already marked stay marked.

use std::fmt;

use tracing::info;

use crate::error::{MigrateError, Result};
use crate::state::VersionState;
use crate::version::VersionId;

/// Raw `version` command options, as typed by the user.
#[derive(Debug, Clone, Default)]
pub struct VersionArgs {
    pub version: Option<String>,
    pub add: bool,
    pub delete: bool,
    pub all: bool,
    pub range_from: Option<String>,
    pub range_to: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkMode {
    Add,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelection {
    Single(VersionId),
    /// Closed interval `[from, to]` compared by version ordering.
    Range { from: VersionId, to: VersionId },
    All,
}

impl VersionSelection {
    fn is_bulk(&self) -> bool {
        !matches!(self, VersionSelection::Single(_))
    }
}

/// A validated `version` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionCommand {
    pub mode: MarkMode,
    pub selection: VersionSelection,
}

/// One ledger change made by a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionChange {
    Added(VersionId),
    Deleted(VersionId),
    /// Ledger entry without a registered migration, removed.
    UnregisteredDeleted(VersionId),
    /// Ledger entry without a registered migration, kept because the user
    /// declined.
    UnregisteredKept(VersionId),
}

impl fmt::Display for VersionChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionChange::Added(v) => write!(f, "{} added to the version table.", v),
            VersionChange::Deleted(v) | VersionChange::UnregisteredDeleted(v) => {
                write!(f, "{} deleted from the version table.", v)
            }
            VersionChange::UnregisteredKept(v) => write!(f, "{} kept in the version table.", v),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionReport {
    pub changes: Vec<VersionChange>,
}

impl VersionReport {
    pub fn messages(&self) -> Vec<String> {
        self.changes.iter().map(ToString::to_string).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

impl VersionCommand {
    pub fn new(mode: MarkMode, selection: VersionSelection) -> Self {
        Self { mode, selection }
    }

    pub fn add(version: impl Into<VersionId>) -> Self {
        Self::new(MarkMode::Add, VersionSelection::Single(version.into()))
    }

    pub fn delete(version: impl Into<VersionId>) -> Self {
        Self::new(MarkMode::Delete, VersionSelection::Single(version.into()))
    }

    pub fn range(mode: MarkMode, from: impl Into<VersionId>, to: impl Into<VersionId>) -> Self {
        Self::new(
            mode,
            VersionSelection::Range {
                from: from.into(),
                to: to.into(),
            },
        )
    }

    pub fn all(mode: MarkMode) -> Self {
        Self::new(mode, VersionSelection::All)
    }

    /// Validate raw options into a command.
    pub fn from_args(args: &VersionArgs) -> Result<Self> {
        let mode = match (args.add, args.delete) {
            (true, false) => MarkMode::Add,
            (false, true) => MarkMode::Delete,
            (true, true) => {
                return Err(MigrateError::invalid(
                    "Options --add and --delete cannot be used together.",
                ));
            }
            (false, false) => {
                return Err(MigrateError::invalid(
                    "You must specify whether you want to --add or --delete the specified version.",
                ));
            }
        };

        let has_range = args.range_from.is_some() || args.range_to.is_some();
        if args.all && has_range {
            return Err(MigrateError::invalid(
                "Options --all and --range-to/--range-from both used. You should use only one of them.",
            ));
        }

        let selection = match (&args.range_from, &args.range_to) {
            (Some(from), Some(to)) => VersionSelection::Range {
                from: VersionId::new(from.as_str()),
                to: VersionId::new(to.as_str()),
            },
            (None, None) if args.all => VersionSelection::All,
            (None, None) => match &args.version {
                Some(version) => VersionSelection::Single(VersionId::new(version.as_str())),
                None => {
                    return Err(MigrateError::invalid(
                        "You must specify the version or use the --all argument.",
                    ));
                }
            },
            _ => {
                return Err(MigrateError::invalid(
                    "Options --range-to and --range-from should be used together.",
                ));
            }
        };

        if selection.is_bulk() && args.version.is_some() {
            return Err(MigrateError::invalid(
                "The version argument cannot be combined with --all or --range-from/--range-to.",
            ));
        }

        Ok(Self { mode, selection })
    }

    /// Run the command. Unregistered versions are deleted without asking.
    pub fn run(&self, state: &mut VersionState<'_>) -> Result<VersionReport> {
        self.run_with_confirmation(state, |_| true)
    }

    /// Run the command, asking `confirm` before an unregistered version is
    /// removed from the ledger.
    pub fn run_with_confirmation<F>(
        &self,
        state: &mut VersionState<'_>,
        confirm: F,
    ) -> Result<VersionReport>
    where
        F: FnMut(&VersionId) -> bool,
    {
        let report = match &self.selection {
            VersionSelection::Single(version) => match self.mode {
                MarkMode::Add => add_single(state, version)?,
                MarkMode::Delete => delete_single(state, version, confirm)?,
            },
            VersionSelection::Range { from, to } => {
                let versions: Vec<VersionId> = state
                    .registry()
                    .iter()
                    .map(|r| r.version())
                    .filter(|v| *v >= from && *v <= to)
                    .cloned()
                    .collect();
                mark_many(state, self.mode, versions)?
            }
            VersionSelection::All => {
                let mut versions = state.registry().versions();
                if self.mode == MarkMode::Delete {
                    versions.reverse();
                }
                mark_many(state, self.mode, versions)?
            }
        };

        if self.selection.is_bulk() {
            info!(mode = ?self.mode, changed = report.changes.len(), "version table updated");
        }
        Ok(report)
    }
}

fn add_single(state: &mut VersionState<'_>, version: &VersionId) -> Result<VersionReport> {
    state.registry().require(version)?;
    if state.is_migrated(version)? {
        return Err(MigrateError::already_exists(version));
    }
    state.mark_migrated(version)?;
    Ok(VersionReport {
        changes: vec![VersionChange::Added(version.clone())],
    })
}

fn delete_single<F>(
    state: &mut VersionState<'_>,
    version: &VersionId,
    mut confirm: F,
) -> Result<VersionReport>
where
    F: FnMut(&VersionId) -> bool,
{
    if !state.is_migrated(version)? {
        return Err(MigrateError::does_not_exist(version));
    }

    let change = if state.registry().contains(version) {
        state.mark_not_migrated(version)?;
        VersionChange::Deleted(version.clone())
    } else if confirm(version) {
        state.remove_unregistered(version)?;
        VersionChange::UnregisteredDeleted(version.clone())
    } else {
        VersionChange::UnregisteredKept(version.clone())
    };
    Ok(VersionReport {
        changes: vec![change],
    })
}

/// Mark every version in `versions`, skipping those already in the wanted
/// state so that re-running converges.
fn mark_many(
    state: &mut VersionState<'_>,
    mode: MarkMode,
    versions: Vec<VersionId>,
) -> Result<VersionReport> {
    let applied = state.applied_set()?;
    let mut report = VersionReport::default();
    for version in versions {
        match mode {
            MarkMode::Add if !applied.contains(&version) => {
                state.mark_migrated(&version)?;
                report.changes.push(VersionChange::Added(version));
            }
            MarkMode::Delete if applied.contains(&version) => {
                state.mark_not_migrated(&version)?;
                report.changes.push(VersionChange::Deleted(version));
            }
            _ => {}
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ledger::{InMemoryLedger, VersionLedger};
    use crate::migration::SqlMigration;
    use crate::registry::MigrationRegistry;
    use crate::state::tests::FlakyLedger;

    const VERSIONS: [&str; 5] = ["1233", "1234", "1235", "1239", "1240"];

    fn registry(versions: &[&str]) -> MigrationRegistry {
        let mut registry = MigrationRegistry::new();
        for v in versions {
            registry
                .register(*v, Arc::new(SqlMigration::inline("SELECT 1", Some("SELECT 0"))))
                .unwrap();
        }
        registry
    }

    fn applied(ledger: &dyn VersionLedger) -> Vec<String> {
        ledger
            .applied_set()
            .unwrap()
            .into_iter()
            .map(|v| v.to_string())
            .collect()
    }

    fn run(
        registry: &mut MigrationRegistry,
        ledger: &mut dyn VersionLedger,
        command: &VersionCommand,
    ) -> Result<VersionReport> {
        let mut state = VersionState::load(registry, ledger)?;
        command.run(&mut state)
    }

    fn args() -> VersionArgs {
        VersionArgs::default()
    }

    #[test]
    fn test_add_range() {
        let mut registry = registry(&VERSIONS);
        let mut ledger = InMemoryLedger::new();
        let report = run(&mut registry, &mut ledger, &VersionCommand::range(MarkMode::Add, "1234", "1239")).unwrap();

        assert_eq!(applied(&ledger), ["1234", "1235", "1239"]);
        assert_eq!(report.changes.len(), 3);
        assert!(!registry.get(&"1233".into()).unwrap().is_migrated());
        assert!(registry.get(&"1235".into()).unwrap().is_migrated());
        assert!(!registry.get(&"1240".into()).unwrap().is_migrated());
    }

    #[test]
    fn test_add_range_is_idempotent() {
        let mut registry = registry(&VERSIONS);
        let mut ledger = InMemoryLedger::with_versions(["1235"]);
        let command = VersionCommand::range(MarkMode::Add, "1234", "1239");

        let first = run(&mut registry, &mut ledger, &command).unwrap();
        assert_eq!(first.messages(), [
            "1234 added to the version table.",
            "1239 added to the version table.",
        ]);
        let once = applied(&ledger);

        let second = run(&mut registry, &mut ledger, &command).unwrap();
        assert!(second.is_empty());
        assert_eq!(applied(&ledger), once);
    }

    #[test]
    fn test_delete_range() {
        let mut registry = registry(&VERSIONS);
        let mut ledger = InMemoryLedger::with_versions(["1233", "1234", "1239", "1240"]);
        let report = run(&mut registry, &mut ledger, &VersionCommand::range(MarkMode::Delete, "1234", "1239")).unwrap();

        assert_eq!(applied(&ledger), ["1233", "1240"]);
        assert_eq!(report.changes, vec![
            VersionChange::Deleted("1234".into()),
            VersionChange::Deleted("1239".into()),
        ]);
        assert!(registry.get(&"1233".into()).unwrap().is_migrated());
        assert!(!registry.get(&"1235".into()).unwrap().is_migrated());
    }

    #[test]
    fn test_add_all() {
        let mut registry = registry(&VERSIONS);
        let mut ledger = InMemoryLedger::with_versions(["1235"]);
        let report = run(&mut registry, &mut ledger, &VersionCommand::all(MarkMode::Add)).unwrap();

        assert_eq!(applied(&ledger), VERSIONS);
        let added: Vec<_> = report.changes.iter().map(|c| c.to_string()).collect();
        assert_eq!(added[0], "1233 added to the version table.");
        assert_eq!(added.len(), 4);
        assert!(registry.iter().all(|r| r.is_migrated()));
    }

    #[test]
    fn test_delete_all_runs_in_reverse() {
        let mut registry = registry(&VERSIONS);
        let mut ledger = InMemoryLedger::with_versions(["1233", "1234", "9999"]);
        let report = run(&mut registry, &mut ledger, &VersionCommand::all(MarkMode::Delete)).unwrap();

        assert_eq!(report.changes, vec![
            VersionChange::Deleted("1234".into()),
            VersionChange::Deleted("1233".into()),
        ]);
        // unregistered entries are not part of "all"
        assert_eq!(applied(&ledger), ["9999"]);
    }

    #[test]
    fn test_add_single() {
        let mut registry = registry(&["1233", "1234", "1235"]);
        let mut ledger = InMemoryLedger::with_versions(["1233"]);
        run(&mut registry, &mut ledger, &VersionCommand::add("1234")).unwrap();
        assert_eq!(applied(&ledger), ["1233", "1234"]);
    }

    #[test]
    fn test_delete_single() {
        let mut registry = registry(&["1233", "1234", "1235"]);
        let mut ledger = InMemoryLedger::with_versions(["1234"]);
        let report = run(&mut registry, &mut ledger, &VersionCommand::delete("1234")).unwrap();
        assert!(ledger.is_empty());
        assert_eq!(report.changes, vec![VersionChange::Deleted("1234".into())]);
    }

    #[test]
    fn test_add_already_migrated() {
        let mut registry = registry(&["1233"]);
        let mut ledger = InMemoryLedger::with_versions(["1233"]);
        let err = run(&mut registry, &mut ledger, &VersionCommand::add("1233")).unwrap_err();
        assert!(matches!(err, MigrateError::InvalidArgument(_)));
        assert_eq!(err.to_string(), "The version \"1233\" already exists in the version table.");
    }

    #[test]
    fn test_delete_not_migrated() {
        let mut registry = registry(&["1233"]);
        let mut ledger = InMemoryLedger::new();
        let err = run(&mut registry, &mut ledger, &VersionCommand::delete("1233")).unwrap_err();
        assert_eq!(err.to_string(), "The version \"1233\" does not exist in the version table.");
    }

    #[test]
    fn test_add_unknown_version() {
        let mut registry = registry(&["1233"]);
        let mut ledger = InMemoryLedger::new();
        let err = run(&mut registry, &mut ledger, &VersionCommand::add("4242")).unwrap_err();
        assert!(matches!(err, MigrateError::NotFound(v) if v.as_str() == "4242"));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_delete_unregistered_version() {
        let mut registry = registry(&[]);
        let mut ledger = InMemoryLedger::with_versions(["1233"]);
        let report = run(&mut registry, &mut ledger, &VersionCommand::delete("1233")).unwrap();
        assert_eq!(report.messages(), ["1233 deleted from the version table."]);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_delete_unregistered_version_declined() {
        let mut registry = registry(&[]);
        let mut ledger = InMemoryLedger::with_versions(["1233"]);
        let mut asked = Vec::new();
        {
            let mut state = VersionState::load(&mut registry, &mut ledger).unwrap();
            let report = VersionCommand::delete("1233")
                .run_with_confirmation(&mut state, |v| {
                    asked.push(v.clone());
                    false
                })
                .unwrap();
            assert_eq!(report.changes, vec![VersionChange::UnregisteredKept("1233".into())]);
        }
        assert_eq!(asked, vec![VersionId::new("1233")]);
        assert_eq!(applied(&ledger), ["1233"]);
    }

    #[test]
    fn test_range_flags_must_be_paired() {
        for (from, to) in [(Some("1233"), None), (None, Some("1233"))] {
            let err = VersionCommand::from_args(&VersionArgs {
                add: true,
                range_from: from.map(String::from),
                range_to: to.map(String::from),
                ..args()
            })
            .unwrap_err();
            assert_eq!(err.to_string(), "Options --range-to and --range-from should be used together.");
        }
    }

    #[test]
    fn test_all_excludes_range() {
        for (from, to) in [(Some("1233"), None), (None, Some("1233")), (Some("1"), Some("2"))] {
            let err = VersionCommand::from_args(&VersionArgs {
                add: true,
                all: true,
                range_from: from.map(String::from),
                range_to: to.map(String::from),
                ..args()
            })
            .unwrap_err();
            assert_eq!(
                err.to_string(),
                "Options --all and --range-to/--range-from both used. You should use only one of them."
            );
        }
    }

    #[test]
    fn test_mode_is_required_and_exclusive() {
        let err = VersionCommand::from_args(&VersionArgs {
            version: Some("1".into()),
            ..args()
        })
        .unwrap_err();
        assert!(err.to_string().contains("--add or --delete"));

        let err = VersionCommand::from_args(&VersionArgs {
            version: Some("1".into()),
            add: true,
            delete: true,
            ..args()
        })
        .unwrap_err();
        assert!(err.to_string().contains("cannot be used together"));
    }

    #[test]
    fn test_version_or_bulk_flag_required() {
        let err = VersionCommand::from_args(&VersionArgs { delete: true, ..args() }).unwrap_err();
        assert_eq!(err.to_string(), "You must specify the version or use the --all argument.");

        let err = VersionCommand::from_args(&VersionArgs {
            version: Some("1".into()),
            delete: true,
            all: true,
            ..args()
        })
        .unwrap_err();
        assert!(matches!(err, MigrateError::InvalidArgument(_)));
    }

    #[test]
    fn test_from_args_builds_selection() {
        let command = VersionCommand::from_args(&VersionArgs {
            add: true,
            range_from: Some("1234".into()),
            range_to: Some("1239".into()),
            ..args()
        })
        .unwrap();
        assert_eq!(command, VersionCommand::range(MarkMode::Add, "1234", "1239"));

        let command = VersionCommand::from_args(&VersionArgs {
            delete: true,
            all: true,
            ..args()
        })
        .unwrap();
        assert_eq!(command, VersionCommand::all(MarkMode::Delete));
    }

    #[test]
    fn test_failed_validation_leaves_ledger_alone() {
        let mut registry = registry(&VERSIONS);
        let mut ledger = InMemoryLedger::with_versions(["1233"]);
        let before = applied(&ledger);

        let result = VersionCommand::from_args(&VersionArgs {
            add: true,
            all: true,
            range_to: Some("1240".into()),
            ..args()
        })
        .and_then(|command| run(&mut registry, &mut ledger, &command));
        assert!(result.is_err());
        assert_eq!(applied(&ledger), before);
    }

    #[test]
    fn test_ledger_failure_mid_range_keeps_earlier_marks() {
        let mut registry = registry(&VERSIONS);
        let mut ledger = FlakyLedger {
            inner: InMemoryLedger::new(),
            allowed_writes: 2,
        };
        let err = run(&mut registry, &mut ledger, &VersionCommand::all(MarkMode::Add)).unwrap_err();
        assert!(matches!(err, MigrateError::Ledger(_)));

        let set: BTreeSet<VersionId> = ledger.applied_set().unwrap();
        assert_eq!(set.len(), 2);
        assert!(registry.get(&"1234".into()).unwrap().is_migrated());
        assert!(!registry.get(&"1235".into()).unwrap().is_migrated());
    }
}
