//! Migration status operations

use anyhow::Result;
use colored::*;

use crate::commands::StatusInfo;
use crate::config::Config;
use crate::ledger::VersionLedger;
use crate::state::VersionState;

/// Show counts, current/latest versions and optionally every version.
pub fn migrate_status(config: &Config, show_versions: bool) -> Result<()> {
    let mut registry = config.registry()?;
    let mut ledger = config.ledger();
    let ledger_name = ledger.describe();
    let state = VersionState::load(&mut registry, &mut ledger)?;
    let applied = state.applied_set()?;
    let info = StatusInfo::collect(config.name.clone(), ledger_name, state.registry(), &applied);

    println!("{}", "📋 Migration Status".cyan().bold());
    println!();
    println!(
        "  Name:                   {}",
        info.name.as_deref().unwrap_or("Migrations").yellow()
    );
    println!("  Version table:          {}", info.ledger.green());
    println!(
        "  Current version:        {}",
        version_or(info.current.as_ref().map(|v| v.as_str()), "0")
    );
    println!(
        "  Latest version:         {}",
        version_or(info.latest.as_ref().map(|v| v.as_str()), "0")
    );
    println!("  Executed migrations:    {}", info.executed);
    if info.executed_unavailable.is_empty() {
        println!("  Executed unavailable:   {}", 0);
    } else {
        println!(
            "  Executed unavailable:   {}",
            info.executed_unavailable.len().to_string().red()
        );
    }
    println!("  Available migrations:   {}", info.available);
    if info.new.is_empty() {
        println!("  New migrations:         {}", 0);
    } else {
        println!(
            "  New migrations:         {}",
            info.new.len().to_string().yellow()
        );
    }

    if show_versions {
        println!();
        println!("┌─ {} ─────────────────────────────────────────────┐", "Versions".cyan().bold());
        for line in &info.versions {
            let mark = if line.migrated {
                "✓".green()
            } else {
                "○".dimmed()
            };
            let applied = line
                .applied_at
                .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| if line.migrated { "migrated".into() } else { "not migrated".into() });
            println!(
                "│ {} {} {} {}",
                mark,
                line.version.as_str().cyan(),
                applied.dimmed(),
                line.description.as_deref().unwrap_or("")
            );
        }
        for version in &info.executed_unavailable {
            println!(
                "│ {} {} {}",
                "✗".red(),
                version.as_str().red(),
                "no registered migration".dimmed()
            );
        }
        println!("└──────────────────────────────────────────────────────────┘");
    }

    println!();
    if info.is_up_to_date() {
        println!("{}", "✓ Up-to-date".green());
    } else {
        println!(
            "{} Run {} to preview pending migrations",
            "💡".yellow(),
            "qail-migrate plan".cyan()
        );
    }

    Ok(())
}

fn version_or(version: Option<&str>, fallback: &str) -> ColoredString {
    match version {
        Some(v) => v.cyan(),
        None => fallback.dimmed(),
    }
}
