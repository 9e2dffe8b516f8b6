use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use super::{LedgerEntry, VersionLedger};
use crate::error::LedgerError;
use crate::version::VersionId;

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerDocument {
    versions: Vec<LedgerEntry>,
}

/// Ledger stored as a JSON document on disk.
///
/// Every mutation rewrites the whole document through a temp file in the same
/// directory and renames it over the old one, so readers never observe a
/// partial write. A missing file is an empty ledger.
#[derive(Debug, Clone)]
pub struct JsonFileLedger {
    path: PathBuf,
}

impl JsonFileLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<LedgerDocument, LedgerError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(LedgerDocument::default());
            }
            Err(source) => {
                return Err(LedgerError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if content.trim().is_empty() {
            return Ok(LedgerDocument::default());
        }
        serde_json::from_str(&content).map_err(|source| LedgerError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn store(&self, mut doc: LedgerDocument) -> Result<(), LedgerError> {
        doc.versions.sort_by(|a, b| a.version.cmp(&b.version));
        let json = serde_json::to_string_pretty(&doc)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let io_err = |source: std::io::Error| LedgerError::Io {
            path: self.path.clone(),
            source,
        };
        std::fs::create_dir_all(&dir).map_err(io_err)?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(io_err)?;
        tmp.write_all(json.as_bytes()).map_err(io_err)?;
        tmp.write_all(b"\n").map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|source| LedgerError::Persist {
            path: self.path.clone(),
            source,
        })?;

        debug!(path = %self.path.display(), versions = doc.versions.len(), "ledger written");
        Ok(())
    }
}

impl VersionLedger for JsonFileLedger {
    fn record_applied(
        &mut self,
        version: &VersionId,
        applied_at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        let mut doc = self.load()?;
        match doc.versions.iter_mut().find(|e| &e.version == version) {
            Some(entry) => entry.applied_at = Some(applied_at),
            None => doc.versions.push(LedgerEntry {
                version: version.clone(),
                applied_at: Some(applied_at),
            }),
        }
        self.store(doc)
    }

    fn record_unapplied(&mut self, version: &VersionId) -> Result<(), LedgerError> {
        let mut doc = self.load()?;
        let before = doc.versions.len();
        doc.versions.retain(|e| &e.version != version);
        if doc.versions.len() == before {
            return Ok(());
        }
        self.store(doc)
    }

    fn entries(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        Ok(self.load()?.versions)
    }

    fn clear(&mut self) -> Result<(), LedgerError> {
        self.store(LedgerDocument::default())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
