//! Migration planning and version table reconciliation for QAIL.
//!
//! Migrations are registered in order under a [`VersionId`]. A
//! [`VersionLedger`](ledger::VersionLedger) remembers which versions have been
//! applied. From the two, the planner works out what to run to reach a
//! target, and the `version` command edits the ledger by hand.
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use qail_migrate::prelude::*;
//!
//! let mut registry = MigrationRegistry::new();
//! registry.register(
//!     "20240101",
//!     Arc::new(SqlMigration::inline("CREATE TABLE a (id INT)", Some("DROP TABLE a"))),
//! )?;
//! registry.register(
//!     "20240102",
//!     Arc::new(SqlMigration::inline("CREATE TABLE b (id INT)", None::<&str>)),
//! )?;
//!
//! let ledger = InMemoryLedger::with_versions(["20240101"]);
//! let plan = PlanCalculator::new(&registry, &ledger).migrations_to_execute(Direction::Up, None)?;
//! assert_eq!(plan.versions(), vec![VersionId::new("20240102")]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod ledger;
pub mod migration;
pub mod migrator;
pub mod planner;
pub mod registry;
pub mod state;
pub mod version;

pub use config::Config;
pub use error::{ConfigError, LedgerError, MigrateError, Result};
pub use migration::{Migration, MigrationSql, SqlMigration};
pub use planner::{MigrationPlan, PlanCalculator, TargetStatus, compute_plan};
pub use registry::MigrationRegistry;
pub use version::{Direction, VersionId, VersionRecord};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::commands::{
        MarkMode, StatusInfo, UpToDateStatus, VersionArgs, VersionCommand, check_up_to_date,
    };
    pub use crate::ledger::{InMemoryLedger, JsonFileLedger, VersionLedger};
    pub use crate::migrator::{Migrator, SqlCollector, SqlExecutor};
    pub use crate::state::VersionState;
    pub use crate::{
        Config, Direction, MigrateError, Migration, MigrationRegistry, MigrationSql, PlanCalculator,
        SqlMigration, TargetStatus, VersionId,
    };
}
