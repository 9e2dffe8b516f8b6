//! Manual version table edits

use anyhow::Result;
use colored::*;

use crate::cli::{VersionOpts, confirm};
use crate::commands::{VersionArgs, VersionChange, VersionCommand};
use crate::config::Config;
use crate::state::VersionState;

const BULK_WARNING: &str = "WARNING! You are about to add, delete or synchronize migration versions from the version table that could break your database. Do you wish to continue?";

const ORPHAN_WARNING: &str = "WARNING! You are about to remove a migration version from the version table that has no corresponding migration file. Do you want to delete this migration from the migrations table?";

/// Add or delete versions without running their migrations.
pub fn migrate_version(config: &Config, opts: VersionOpts, interactive: bool) -> Result<()> {
    let command = VersionCommand::from_args(&VersionArgs {
        version: opts.version,
        add: opts.add,
        delete: opts.delete,
        all: opts.all,
        range_from: opts.range_from,
        range_to: opts.range_to,
    })?;

    if interactive && !confirm(BULK_WARNING)? {
        println!("{}", "Migration cancelled!".red());
        return Ok(());
    }

    let mut registry = config.registry()?;
    let mut ledger = config.ledger();
    let mut state = VersionState::load(&mut registry, &mut ledger)?;

    let mut prompt_error = None;
    let report = command.run_with_confirmation(&mut state, |_| {
        if !interactive {
            return true;
        }
        match confirm(ORPHAN_WARNING) {
            Ok(answer) => answer,
            Err(e) => {
                prompt_error = Some(e);
                false
            }
        }
    })?;
    if let Some(e) = prompt_error {
        return Err(e);
    }

    if report.is_empty() {
        println!("{}", "○ Nothing to change".dimmed());
    }
    for change in &report.changes {
        let line = change.to_string();
        match change {
            VersionChange::Added(_) => println!("  {} {}", "✓".green(), line),
            VersionChange::Deleted(_) | VersionChange::UnregisteredDeleted(_) => {
                println!("  {} {}", "✓".yellow(), line)
            }
            VersionChange::UnregisteredKept(_) => {
                println!("  {} {}", "○".dimmed(), line);
                println!("{}", "Migration cancelled!".red());
            }
        }
    }

    Ok(())
}
