//! `qail-migrate.toml` configuration.
//!
//! ```toml
//! name = "Application Migrations"
//!
//! [ledger]
//! path = ".qail/versions.json"
//!
//! [[migrations]]
//! version = "20240101000000"
//! description = "create users"
//! up = "migrations/20240101000000/up.sql"
//! down = "migrations/20240101000000/down.sql"
//! ```
//!
//! Migrations register in declaration order. Relative paths resolve against
//! the directory holding the file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::ledger::JsonFileLedger;
use crate::migration::SqlMigration;
use crate::registry::MigrationRegistry;

pub const CONFIG_FILE_NAME: &str = "qail-migrate.toml";

const DEFAULT_LEDGER_PATH: &str = ".qail/versions.json";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub migrations: Vec<MigrationEntry>,
    /// Directory of the loaded file; relative paths resolve against it.
    #[serde(skip)]
    base_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_path")]
    pub path: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
        }
    }
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from(DEFAULT_LEDGER_PATH)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationEntry {
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    pub up: PathBuf,
    #[serde(default)]
    pub down: Option<PathBuf>,
}

impl Config {
    /// Parse and validate configuration text. `base_dir` anchors relative paths.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&content, path)?;
        debug!(path = %path.display(), migrations = config.migrations.len(), "configuration loaded");
        Ok(config)
    }

    /// Load `explicit` if given, otherwise the first existing default location.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidates = default_locations();
        match candidates.iter().find(|p| p.is_file()) {
            Some(path) => Self::load(path),
            None => Err(ConfigError::NotFound {
                searched: candidates,
            }),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (index, entry) in self.migrations.iter().enumerate() {
            let version = entry.version.trim();
            if version.is_empty() {
                return Err(ConfigError::EmptyVersion { index: index + 1 });
            }
            if !seen.insert(version) {
                return Err(ConfigError::DuplicateVersion(version.to_string()));
            }
        }
        Ok(())
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.resolve(&self.ledger.path)
    }

    pub fn ledger(&self) -> JsonFileLedger {
        JsonFileLedger::new(self.ledger_path())
    }

    /// Build the registry from the declared migrations.
    pub fn registry(&self) -> Result<MigrationRegistry> {
        let mut registry = MigrationRegistry::new();
        for entry in &self.migrations {
            let mut migration = SqlMigration::from_files(
                self.resolve(&entry.up),
                entry.down.as_deref().map(|d| self.resolve(d)),
            );
            if let Some(description) = &entry.description {
                migration = migration.with_description(description.clone());
            }
            registry.register(entry.version.trim(), Arc::new(migration))?;
        }
        Ok(registry)
    }
}

fn default_locations() -> Vec<PathBuf> {
    let mut locations = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        locations.push(dir.join("qail").join("migrate.toml"));
    }
    locations
}
