//! Migration plan (dry-run)

use std::collections::BTreeSet;

use anyhow::{Result, anyhow};
use chrono::Utc;
use colored::*;

use crate::cli::PlanOpts;
use crate::config::Config;
use crate::migrator::{MigrationResult, Migrator};
use crate::planner::TargetStatus;
use crate::registry::MigrationRegistry;
use crate::version::{Direction, VersionId};

/// Where a plan stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PlanTarget {
    /// Every candidate.
    All,
    /// Stop after this version, inclusive.
    Through(VersionId),
    /// Already in the requested state.
    Nothing,
}

/// Map the `plan` target argument to a planner cut-off.
///
/// A literal version is the last migration to run in `direction`. An alias
/// names the version that must be the newest applied one afterwards: going
/// up, pending versions registered up to it run; going down, applied
/// versions registered after it are rolled back.
pub(crate) fn resolve_target(
    registry: &MigrationRegistry,
    applied: &BTreeSet<VersionId>,
    target: Option<&str>,
    direction: Direction,
) -> Result<PlanTarget> {
    let Some(word) = target else {
        return Ok(PlanTarget::All);
    };
    let resolved = registry
        .resolve_alias(word, applied)
        .ok_or_else(|| anyhow!("No version matches '{}'", word))?;
    if !MigrationRegistry::is_alias(word) && !resolved.is_first() {
        return Ok(PlanTarget::Through(resolved));
    }

    // records before `boundary` are applied in the end state, the rest are not
    let boundary = if resolved.is_first() {
        0
    } else {
        registry
            .position(&resolved)
            .map(|pos| pos + 1)
            .ok_or_else(|| anyhow!("Version {} is not registered", resolved))?
    };
    let stop = match direction {
        Direction::Up => registry
            .iter()
            .take(boundary)
            .filter(|r| !applied.contains(r.version()))
            .last(),
        Direction::Down => registry
            .iter()
            .skip(boundary)
            .find(|r| applied.contains(r.version())),
    };
    Ok(match stop {
        Some(record) => PlanTarget::Through(record.version().clone()),
        None => PlanTarget::Nothing,
    })
}

/// Preview the migrations that would run, without executing or recording them.
pub fn migrate_plan(config: &Config, opts: PlanOpts) -> Result<()> {
    let direction = if opts.down {
        Direction::Down
    } else {
        Direction::Up
    };

    let mut registry = config.registry()?;
    let mut ledger = config.ledger();
    let migrator = Migrator::new(&mut registry, &mut ledger)?;
    let applied = migrator.state().applied_set()?;

    let target = resolve_target(
        migrator.state().registry(),
        &applied,
        opts.target.as_deref(),
        direction,
    )?;
    let result = match target {
        PlanTarget::All => migrator.dry_run(direction, None)?,
        PlanTarget::Through(version) => migrator.dry_run(direction, Some(&version))?,
        PlanTarget::Nothing => MigrationResult {
            direction,
            target: TargetStatus::Unspecified,
            executed: Vec::new(),
            dry_run: true,
        },
    };

    println!("{}", "📋 Migration Plan (dry-run)".cyan().bold());
    println!();

    if let TargetStatus::NotFound(version) = &result.target {
        println!(
            "  {} Target {} is not a pending {} migration; planning all candidates",
            "⚠".yellow(),
            version.as_str().yellow(),
            direction
        );
        println!();
    }

    if result.executed.is_empty() {
        println!("{}", "✓ No migrations to execute".green());
        return Ok(());
    }

    let label = match direction {
        Direction::Up => "UP".green().bold(),
        Direction::Down => "DOWN".yellow().bold(),
    };
    println!(
        "┌─ {} ({} versions, {} statements) ──────────────────────┐",
        label,
        result.executed.len(),
        result.statement_count()
    );
    for executed in &result.executed {
        println!("│ {}", executed.version.as_str().cyan().bold());
        for (i, stmt) in executed.sql.statements().iter().enumerate() {
            println!("│   {}. {}", i + 1, stmt.trim());
        }
    }
    println!("└──────────────────────────────────────────────────────────────┘");

    if let Some(path) = &opts.write_sql {
        std::fs::write(path, result.to_sql_script(Utc::now()))
            .map_err(|e| anyhow!("Failed to write {}: {}", path.display(), e))?;
        println!();
        println!("{} {}", "Saved to:".green(), path.display());
    }

    Ok(())
}
