//! Version identifiers, migration direction and version records.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::migration::{Migration, MigrationSql};

/// Opaque, totally ordered version token (usually a `%Y%m%d%H%M%S` timestamp).
///
/// Ordering is plain string ordering, so identifiers of equal width sort
/// chronologically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(String);

impl VersionId {
    /// Sentinel sorting before any real version ("migrate to before the first").
    pub const FIRST: &'static str = "0";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn first() -> Self {
        Self::new(Self::FIRST)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_first(&self) -> bool {
        self.0 == Self::FIRST
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VersionId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for VersionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for VersionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Direction of a migration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(format!("Unknown direction '{}', expected up or down", other)),
        }
    }
}

/// A registered migration and its applied state.
///
/// The applied state mirrors ledger membership. It is only changed through
/// [`crate::state::VersionState`], which writes the ledger first.
#[derive(Clone)]
pub struct VersionRecord {
    version: VersionId,
    migration: Arc<dyn Migration>,
    applied_at: Option<DateTime<Utc>>,
    applied: bool,
}

impl VersionRecord {
    pub fn new(version: VersionId, migration: Arc<dyn Migration>) -> Self {
        Self {
            version,
            migration,
            applied_at: None,
            applied: false,
        }
    }

    pub fn version(&self) -> &VersionId {
        &self.version
    }

    pub fn migration(&self) -> &Arc<dyn Migration> {
        &self.migration
    }

    pub fn description(&self) -> Option<&str> {
        self.migration.description()
    }

    pub fn is_migrated(&self) -> bool {
        self.applied
    }

    /// When the version was recorded, if the ledger knows it.
    pub fn applied_at(&self) -> Option<DateTime<Utc>> {
        self.applied_at
    }

    pub(crate) fn set_migrated(&mut self, applied_at: Option<DateTime<Utc>>) {
        self.applied = true;
        self.applied_at = applied_at;
    }

    pub(crate) fn set_not_migrated(&mut self) {
        self.applied = false;
        self.applied_at = None;
    }

    /// Collect the SQL this migration issues in `direction`.
    pub fn execute(&self, direction: Direction) -> anyhow::Result<MigrationSql> {
        let mut sql = MigrationSql::new();
        match direction {
            Direction::Up => self.migration.up(&mut sql)?,
            Direction::Down => self.migration.down(&mut sql)?,
        }
        Ok(sql)
    }
}

impl fmt::Debug for VersionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionRecord")
            .field("version", &self.version)
            .field("description", &self.migration.description())
            .field("applied", &self.applied)
            .field("applied_at", &self.applied_at)
            .finish()
    }
}
