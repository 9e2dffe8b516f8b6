//! Command line surface for `qail-migrate`.
//!
//! Submodules:
//! - `status`: migration status and version listing
//! - `up_to_date`: exit-code check for CI
//! - `version`: manual version table edits
//! - `plan`: dry-run of a migration plan, optionally written to a file

mod plan;
mod status;
mod up_to_date;
mod version;

use std::io::{IsTerminal, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::config::Config;

pub use plan::migrate_plan;
pub use status::migrate_status;
pub use up_to_date::migrate_up_to_date;
pub use version::migrate_version;

#[derive(Parser, Debug)]
#[command(name = "qail-migrate", version, about = "Plan migrations and manage the version table")]
pub struct Cli {
    /// Configuration file (defaults to ./qail-migrate.toml)
    #[arg(long, short = 'c', global = true, env = "QAIL_MIGRATE_CONFIG")]
    pub configuration: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Never prompt; assume yes
    #[arg(long = "no-interaction", short = 'n', global = true)]
    pub no_interaction: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the status of registered and applied versions
    Status {
        /// List every registered version
        #[arg(long)]
        show_versions: bool,
    },

    /// Exit 0 when up to date, 1 when migrations are pending
    UpToDate {
        /// Exit 2 when the version table holds unregistered versions
        #[arg(long)]
        fail_on_unregistered: bool,
    },

    /// Manually add or delete versions in the version table
    Version(VersionOpts),

    /// Preview the migrations that would run, without executing them
    Plan(PlanOpts),
}

#[derive(Debug, Args)]
pub struct VersionOpts {
    /// Version to add or delete
    #[arg(id = "migration_version", value_name = "VERSION")]
    pub version: Option<String>,

    /// Mark the version(s) as migrated
    #[arg(long)]
    pub add: bool,

    /// Mark the version(s) as not migrated
    #[arg(long)]
    pub delete: bool,

    /// Apply to all registered versions
    #[arg(long)]
    pub all: bool,

    /// First version of an inclusive range
    #[arg(long)]
    pub range_from: Option<String>,

    /// Last version of an inclusive range
    #[arg(long)]
    pub range_to: Option<String>,
}

#[derive(Debug, Args)]
pub struct PlanOpts {
    /// Target version or alias (first, prev, current, next, latest)
    pub target: Option<String>,

    /// Plan a rollback instead of an upgrade
    #[arg(long)]
    pub down: bool,

    /// Write the collected SQL to this file
    #[arg(long)]
    pub write_sql: Option<PathBuf>,
}

/// Run the parsed command and return the process exit code.
pub fn run(cli: Cli) -> Result<u8> {
    let config = Config::discover(cli.configuration.as_deref())?;
    let interactive = !cli.no_interaction && std::io::stdin().is_terminal();

    match cli.command {
        Commands::Status { show_versions } => migrate_status(&config, show_versions).map(|_| 0),
        Commands::UpToDate {
            fail_on_unregistered,
        } => migrate_up_to_date(&config, fail_on_unregistered),
        Commands::Version(opts) => migrate_version(&config, opts, interactive).map(|_| 0),
        Commands::Plan(opts) => migrate_plan(&config, opts).map(|_| 0),
    }
}

/// Ask a yes/no question on stdin. Anything but `y`/`yes` is a no.
pub(crate) fn confirm(question: &str) -> Result<bool> {
    print!("{} (y/n) ", question);
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    let answer = input.trim();
    Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}
