//! Check whether the applied set matches the registry.

use std::collections::BTreeSet;

use crate::registry::MigrationRegistry;
use crate::version::VersionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpToDateStatus {
    UpToDate,
    /// Registered migrations are waiting to be applied.
    OutOfDate,
    /// Applied versions without a registered migration, with
    /// `--fail-on-unregistered`.
    Unregistered,
}

impl UpToDateStatus {
    pub fn exit_code(self) -> u8 {
        match self {
            UpToDateStatus::UpToDate => 0,
            UpToDateStatus::OutOfDate => 1,
            UpToDateStatus::Unregistered => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpToDateReport {
    pub status: UpToDateStatus,
    pub pending: Vec<VersionId>,
    pub unregistered: Vec<VersionId>,
    pub messages: Vec<String>,
}

impl UpToDateReport {
    pub fn exit_code(&self) -> u8 {
        self.status.exit_code()
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// Compare the registry against `applied`.
///
/// Pending migrations give exit code 1. Unregistered applied versions are
/// reported but only fail (code 2, taking precedence) when
/// `fail_on_unregistered` is set.
pub fn check_up_to_date(
    registry: &MigrationRegistry,
    applied: &BTreeSet<VersionId>,
    fail_on_unregistered: bool,
) -> UpToDateReport {
    let pending: Vec<VersionId> = registry
        .pending(applied)
        .into_iter()
        .map(|r| r.version().clone())
        .collect();
    let unregistered = registry.unregistered(applied);

    let mut status = UpToDateStatus::UpToDate;
    let mut messages = Vec::new();

    if pending.is_empty() && unregistered.is_empty() {
        messages.push("Up-to-date! No migrations to execute.".to_string());
    }

    if !pending.is_empty() {
        status = UpToDateStatus::OutOfDate;
        messages.push(format!(
            "Out-of-date! {} migration{} available to execute.",
            pending.len(),
            plural(pending.len())
        ));
    }

    if !unregistered.is_empty() {
        let n = unregistered.len();
        messages.push(format!(
            "You have {} previously executed migration{} in the database that {} registered migration{}.",
            n,
            plural(n),
            if n == 1 { "is not a" } else { "are not" },
            plural(n)
        ));
        if fail_on_unregistered {
            status = UpToDateStatus::Unregistered;
        }
    }

    UpToDateReport {
        status,
        pending,
        unregistered,
        messages,
    }
}
