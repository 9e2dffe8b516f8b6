//! Plan execution.
//!
//! The migrator is the executor the planner hands its plan to. It collects
//! each migration's SQL, runs it through a [`SqlExecutor`] and records the
//! version in the ledger before moving to the next one. The first failure
//! stops the run; versions that already ran stay recorded.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::{MigrateError, Result};
use crate::ledger::VersionLedger;
use crate::migration::MigrationSql;
use crate::planner::{TargetStatus, compute_plan};
use crate::registry::MigrationRegistry;
use crate::state::VersionState;
use crate::version::{Direction, VersionId};

/// Runs SQL against the database (the connection driver).
pub trait SqlExecutor {
    fn execute(&mut self, sql: &str) -> anyhow::Result<()>;
}

/// Executor that only remembers what it was asked to run.
#[derive(Debug, Default, Clone)]
pub struct SqlCollector {
    pub statements: Vec<String>,
}

impl SqlExecutor for SqlCollector {
    fn execute(&mut self, sql: &str) -> anyhow::Result<()> {
        self.statements.push(sql.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedVersion {
    pub version: VersionId,
    pub sql: MigrationSql,
}

#[derive(Debug, Clone)]
pub struct MigrationResult {
    pub direction: Direction,
    pub target: TargetStatus,
    pub executed: Vec<ExecutedVersion>,
    pub dry_run: bool,
}

impl MigrationResult {
    pub fn versions(&self) -> Vec<&VersionId> {
        self.executed.iter().map(|e| &e.version).collect()
    }

    pub fn statement_count(&self) -> usize {
        self.executed.iter().map(|e| e.sql.len()).sum()
    }

    /// Render the collected SQL as a script.
    pub fn to_sql_script(&self, generated_at: DateTime<Utc>) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "-- Migration script generated on {}\n",
            generated_at.format("%Y-%m-%d %H:%M:%S")
        ));
        out.push_str(&format!("-- Direction: {}\n", self.direction));
        for executed in &self.executed {
            out.push_str(&format!("\n-- Version {}\n", executed.version));
            for stmt in executed.sql.statements() {
                let stmt = stmt.trim_end();
                out.push_str(stmt);
                if !stmt.ends_with(';') {
                    out.push(';');
                }
                out.push('\n');
            }
        }
        out
    }
}

pub struct Migrator<'a> {
    state: VersionState<'a>,
}

impl<'a> Migrator<'a> {
    pub fn new(
        registry: &'a mut MigrationRegistry,
        ledger: &'a mut dyn VersionLedger,
    ) -> Result<Self> {
        Ok(Self {
            state: VersionState::load(registry, ledger)?,
        })
    }

    pub fn state(&self) -> &VersionState<'a> {
        &self.state
    }

    /// Collect the SQL of the plan without executing or recording anything.
    pub fn dry_run(&self, direction: Direction, target: Option<&VersionId>) -> Result<MigrationResult> {
        let (versions, target) = self.plan(direction, target)?;
        let mut executed = Vec::with_capacity(versions.len());
        for version in versions {
            let sql = self.collect(&version, direction)?;
            executed.push(ExecutedVersion { version, sql });
        }
        Ok(MigrationResult {
            direction,
            target,
            executed,
            dry_run: true,
        })
    }

    /// Execute the plan and record each version as it completes.
    pub fn migrate(
        &mut self,
        direction: Direction,
        target: Option<&VersionId>,
        executor: &mut dyn SqlExecutor,
    ) -> Result<MigrationResult> {
        let (versions, target) = self.plan(direction, target)?;
        let mut executed = Vec::with_capacity(versions.len());

        for version in versions {
            let sql = self.collect(&version, direction)?;
            for stmt in sql.statements() {
                executor
                    .execute(stmt)
                    .map_err(|source| MigrateError::MigrationFailed {
                        version: version.clone(),
                        direction,
                        source,
                    })?;
            }
            match direction {
                Direction::Up => self.state.mark_migrated(&version)?,
                Direction::Down => self.state.mark_not_migrated(&version)?,
            }
            info!(%version, %direction, statements = sql.len(), "migration executed");
            executed.push(ExecutedVersion { version, sql });
        }

        Ok(MigrationResult {
            direction,
            target,
            executed,
            dry_run: false,
        })
    }

    fn plan(
        &self,
        direction: Direction,
        target: Option<&VersionId>,
    ) -> Result<(Vec<VersionId>, TargetStatus)> {
        let applied = self.state.applied_set()?;
        let plan = compute_plan(self.state.registry(), &applied, direction, target);
        Ok((plan.versions(), plan.target().clone()))
    }

    fn collect(&self, version: &VersionId, direction: Direction) -> Result<MigrationSql> {
        let record = self.state.registry().require(version)?;
        let sql = record
            .execute(direction)
            .map_err(|source| MigrateError::MigrationFailed {
                version: version.clone(),
                direction,
                source,
            })?;
        if sql.is_empty() {
            warn!(%version, %direction, "migration produced no SQL statements");
        }
        Ok(sql)
    }
}
