//! CI check: are all registered migrations applied?

use anyhow::Result;
use colored::*;

use crate::commands::{UpToDateStatus, check_up_to_date};
use crate::config::Config;
use crate::ledger::VersionLedger;

/// Print the check result and return its exit code (0, 1 or 2).
pub fn migrate_up_to_date(config: &Config, fail_on_unregistered: bool) -> Result<u8> {
    let registry = config.registry()?;
    let ledger = config.ledger();
    let applied = ledger.applied_set()?;

    let report = check_up_to_date(&registry, &applied, fail_on_unregistered);
    for message in &report.messages {
        let line = match report.status {
            UpToDateStatus::UpToDate => message.green(),
            UpToDateStatus::OutOfDate => message.yellow(),
            UpToDateStatus::Unregistered => message.red(),
        };
        println!("{}", line);
    }

    Ok(report.exit_code())
}
