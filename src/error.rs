//! Error types for planning, ledger access and configuration.

use std::path::PathBuf;

use crate::version::{Direction, VersionId};

/// Errors raised by the planner, the registry and the state commands.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Flag combination or version argument inconsistent with current state.
    #[error("{0}")]
    InvalidArgument(String),

    /// Version required to be registered is missing from the registry.
    #[error("Could not find migration version {0}")]
    NotFound(VersionId),

    #[error("Migration version {0} is already registered")]
    DuplicateVersion(VersionId),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Migration {version} failed while migrating {direction}")]
    MigrationFailed {
        version: VersionId,
        direction: Direction,
        #[source]
        source: anyhow::Error,
    },
}

impl MigrateError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        MigrateError::InvalidArgument(message.into())
    }

    pub(crate) fn already_exists(version: &VersionId) -> Self {
        Self::invalid(format!(
            "The version \"{}\" already exists in the version table.",
            version
        ))
    }

    pub(crate) fn does_not_exist(version: &VersionId) -> Self {
        Self::invalid(format!(
            "The version \"{}\" does not exist in the version table.",
            version
        ))
    }
}

/// Failures of the persisted version ledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Ledger I/O error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Ledger file {path} is corrupt")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode ledger: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to persist ledger to {path}")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },

    /// Error reported by an external ledger driver.
    #[error("Ledger backend error: {0}")]
    Backend(String),
}

/// Malformed or missing configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No configuration file found (searched: {})", display_paths(.searched))]
    NotFound { searched: Vec<PathBuf> },

    #[error("Failed to read configuration {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Migration #{index} in the configuration has an empty version")]
    EmptyVersion { index: usize },

    #[error("Migration version {0} is declared more than once")]
    DuplicateVersion(String),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result alias used throughout the crate.
pub type Result<T, E = MigrateError> = std::result::Result<T, E>;
