//! Migration plan calculation.
//!
//! Given the registry and the applied set, work out which migrations run and
//! in which order:
//!
//! ```text
//!   registry (registration order)
//!        │
//!        ├── not applied ──► UP candidates (registration order)
//!        └── applied ──────► DOWN candidates (reverse registration order)
//!                                   │
//!                                   ▼
//!                  inclusive prefix ending at the target
//!                  (whole candidate list if the target is absent)
//! ```
//!
//! Planning is pure: nothing here writes to the ledger.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::error::LedgerError;
use crate::ledger::VersionLedger;
use crate::registry::MigrationRegistry;
use crate::version::{Direction, VersionId, VersionRecord};

/// How the requested target related to the candidate list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetStatus {
    /// No explicit target; every candidate is planned.
    Unspecified,
    /// The target was found and the plan stops at it.
    Reached(VersionId),
    /// The target matched no candidate, so the full candidate list is planned.
    NotFound(VersionId),
}

/// Ordered migrations to hand to an executor.
#[derive(Debug, Clone)]
pub struct MigrationPlan<'a> {
    direction: Direction,
    records: Vec<&'a VersionRecord>,
    target: TargetStatus,
}

impl<'a> MigrationPlan<'a> {
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn records(&self) -> &[&'a VersionRecord] {
        &self.records
    }

    pub fn versions(&self) -> Vec<VersionId> {
        self.records.iter().map(|r| r.version().clone()).collect()
    }

    pub fn target(&self) -> &TargetStatus {
        &self.target
    }

    /// True when a target was given but not found and the plan fell back to
    /// every candidate.
    pub fn fell_back(&self) -> bool {
        matches!(self.target, TargetStatus::NotFound(_))
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// Compute the plan for `direction`, stopping after `target` (inclusive).
pub fn compute_plan<'a>(
    registry: &'a MigrationRegistry,
    applied: &BTreeSet<VersionId>,
    direction: Direction,
    target: Option<&VersionId>,
) -> MigrationPlan<'a> {
    let (executed, not_executed): (Vec<&VersionRecord>, Vec<&VersionRecord>) = registry
        .iter()
        .partition(|r| applied.contains(r.version()));

    let candidates: Vec<&VersionRecord> = match direction {
        Direction::Up => not_executed,
        Direction::Down => executed.into_iter().rev().collect(),
    };

    let (records, target) = match target {
        None => (candidates, TargetStatus::Unspecified),
        Some(target) => match candidates.iter().position(|r| r.version() == target) {
            Some(pos) => {
                let mut candidates = candidates;
                candidates.truncate(pos + 1);
                (candidates, TargetStatus::Reached(target.clone()))
            }
            None => {
                if !candidates.is_empty() {
                    warn!(%target, %direction, "target not among candidates, planning all of them");
                }
                (candidates, TargetStatus::NotFound(target.clone()))
            }
        },
    };

    debug!(%direction, planned = records.len(), "migration plan computed");
    MigrationPlan {
        direction,
        records,
        target,
    }
}

/// Plans against a live ledger.
pub struct PlanCalculator<'a> {
    registry: &'a MigrationRegistry,
    ledger: &'a dyn VersionLedger,
}

impl<'a> PlanCalculator<'a> {
    pub fn new(registry: &'a MigrationRegistry, ledger: &'a dyn VersionLedger) -> Self {
        Self { registry, ledger }
    }

    pub fn migrations_to_execute(
        &self,
        direction: Direction,
        target: Option<&VersionId>,
    ) -> Result<MigrationPlan<'a>, LedgerError> {
        let applied = self.ledger.applied_set()?;
        Ok(compute_plan(self.registry, &applied, direction, target))
    }
}
