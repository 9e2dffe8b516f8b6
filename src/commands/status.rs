//! Migration status summary.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::registry::MigrationRegistry;
use crate::version::VersionId;

/// One registered migration as listed by `status --show-versions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionLine {
    pub version: VersionId,
    pub description: Option<String>,
    pub migrated: bool,
    pub applied_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusInfo {
    pub name: Option<String>,
    pub ledger: String,
    /// Last applied version in registration order, if any.
    pub current: Option<VersionId>,
    pub latest: Option<VersionId>,
    pub executed: usize,
    /// Applied versions with no registered migration.
    pub executed_unavailable: Vec<VersionId>,
    pub available: usize,
    /// Registered versions not applied yet, in registration order.
    pub new: Vec<VersionId>,
    pub versions: Vec<VersionLine>,
}

impl StatusInfo {
    /// Summarize `registry` against the applied set. Records are expected to
    /// be synced with the ledger already (for the applied timestamps).
    pub fn collect(
        name: Option<String>,
        ledger: String,
        registry: &MigrationRegistry,
        applied: &BTreeSet<VersionId>,
    ) -> Self {
        let versions = registry
            .iter()
            .map(|r| VersionLine {
                version: r.version().clone(),
                description: r.description().map(str::to_string),
                migrated: applied.contains(r.version()),
                applied_at: r.applied_at(),
            })
            .collect();

        Self {
            name,
            ledger,
            current: registry.current_version(applied).cloned(),
            latest: registry.latest_version().cloned(),
            executed: applied.len(),
            executed_unavailable: registry.unregistered(applied),
            available: registry.len(),
            new: registry
                .pending(applied)
                .into_iter()
                .map(|r| r.version().clone())
                .collect(),
            versions,
        }
    }

    pub fn is_up_to_date(&self) -> bool {
        self.new.is_empty()
    }
}
