//! Migration handles.
//!
//! A migration does not talk to the database itself. It collects the SQL it
//! wants to run into a [`MigrationSql`] and the executor decides what to do
//! with it (run it, print it, write it to a file).

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Ordered SQL statements collected from one migration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationSql {
    statements: Vec<String>,
}

impl MigrationSql {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sql(&mut self, sql: impl Into<String>) {
        let sql = sql.into();
        if !sql.trim().is_empty() {
            self.statements.push(sql);
        }
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }
}

/// A reversible schema change.
pub trait Migration: Send + Sync {
    fn description(&self) -> Option<&str> {
        None
    }

    fn up(&self, sql: &mut MigrationSql) -> Result<()>;

    fn down(&self, sql: &mut MigrationSql) -> Result<()>;
}

/// Where a migration script comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlSource {
    File(PathBuf),
    Inline(String),
}

impl SqlSource {
    fn load(&self) -> Result<String> {
        match self {
            SqlSource::File(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read migration script {}", path.display())),
            SqlSource::Inline(sql) => Ok(sql.clone()),
        }
    }
}

impl fmt::Display for SqlSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlSource::File(path) => write!(f, "{}", path.display()),
            SqlSource::Inline(_) => write!(f, "<inline>"),
        }
    }
}

/// Migration backed by plain SQL scripts.
///
/// Without a down script the migration is irreversible and rolling it back
/// fails.
#[derive(Debug, Clone)]
pub struct SqlMigration {
    description: Option<String>,
    up: SqlSource,
    down: Option<SqlSource>,
}

impl SqlMigration {
    pub fn new(up: SqlSource, down: Option<SqlSource>) -> Self {
        Self {
            description: None,
            up,
            down,
        }
    }

    pub fn from_files(up: impl Into<PathBuf>, down: Option<PathBuf>) -> Self {
        Self::new(SqlSource::File(up.into()), down.map(SqlSource::File))
    }

    pub fn inline(up: impl Into<String>, down: Option<impl Into<String>>) -> Self {
        Self::new(
            SqlSource::Inline(up.into()),
            down.map(|d| SqlSource::Inline(d.into())),
        )
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_reversible(&self) -> bool {
        self.down.is_some()
    }
}

impl Migration for SqlMigration {
    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn up(&self, sql: &mut MigrationSql) -> Result<()> {
        sql.add_sql(self.up.load()?.trim());
        Ok(())
    }

    fn down(&self, sql: &mut MigrationSql) -> Result<()> {
        match &self.down {
            Some(source) => {
                sql.add_sql(source.load()?.trim());
                Ok(())
            }
            None => anyhow::bail!("Irreversible migration: no down script for {}", self.up),
        }
    }
}
