use std::path::Path;

use pretty_assertions::assert_eq;
use qail_migrate::prelude::*;

fn config(dir: &Path, versions: &[&str]) -> Config {
    let mut content = String::from("[ledger]\npath = \"versions.json\"\n");
    for v in versions {
        content.push_str(&format!("\n[[migrations]]\nversion = \"{}\"\nup = \"{}.sql\"\n", v, v));
    }
    let path = dir.join("qail-migrate.toml");
    std::fs::write(&path, content).unwrap();
    Config::load(&path).unwrap()
}

fn apply(config: &Config, versions: &[&str]) {
    let mut ledger = config.ledger();
    for v in versions {
        ledger.record_applied(&VersionId::new(*v), chrono::Utc::now()).unwrap();
    }
}

fn check(config: &Config, fail_on_unregistered: bool) -> (u8, Vec<String>) {
    let registry = config.registry().unwrap();
    let applied = config.ledger().applied_set().unwrap();
    let report = check_up_to_date(&registry, &applied, fail_on_unregistered);
    (report.exit_code(), report.messages)
}

#[test]
fn fresh_project_with_pending_migrations() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &["20230101", "20230102"]);

    let (code, messages) = check(&config, false);
    assert_eq!(code, 1);
    assert_eq!(messages, ["Out-of-date! 2 migrations available to execute."]);
}

#[test]
fn everything_applied() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &["20230101", "20230102"]);
    apply(&config, &["20230101", "20230102"]);

    assert_eq!(check(&config, true), (0, vec!["Up-to-date! No migrations to execute.".to_string()]));
}

#[test]
fn unregistered_versions_only_fail_when_asked() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &["20230101"]);
    apply(&config, &["20230101", "20220101"]);

    let expected = "You have 1 previously executed migration in the database that is not a registered migration.";
    assert_eq!(check(&config, false), (0, vec![expected.to_string()]));
    assert_eq!(check(&config, true), (2, vec![expected.to_string()]));
}

#[test]
fn unregistered_takes_precedence_over_pending() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), &["20230101", "20230102"]);
    apply(&config, &["20220101", "20220102"]);

    let (code, messages) = check(&config, true);
    assert_eq!(code, 2);
    assert_eq!(messages.len(), 2);
    assert_eq!(
        messages[1],
        "You have 2 previously executed migrations in the database that are not registered migrations."
    );
}
