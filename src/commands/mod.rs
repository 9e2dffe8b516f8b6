//! Commands over the registry and ledger.
//!
//! Submodules:
//! - `version`: add/delete single versions, ranges or everything
//! - `up_to_date`: pending/unregistered check with exit codes
//! - `status`: summary counts and per-version listing

pub mod status;
pub mod up_to_date;
pub mod version;

pub use status::{StatusInfo, VersionLine};
pub use up_to_date::{UpToDateReport, UpToDateStatus, check_up_to_date};
pub use version::{
    MarkMode, VersionArgs, VersionChange, VersionCommand, VersionReport, VersionSelection,
};
