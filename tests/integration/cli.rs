use predicates::prelude::*;

use crate::common::{BACKEND_CONFIG, TestInstall};

#[test]
fn test_upgrade_with_goal_is_rejected_without_touching_the_install() {
    let install = TestInstall::with_config(BACKEND_CONFIG);
    let before = std::fs::read(install.path("config.ini")).unwrap();

    install
        .autocrew()
        .args(["-u", "write a newsletter"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot be used with other arguments"));

    assert_eq!(std::fs::read(install.path("config.ini")).unwrap(), before);
    assert!(!install.path("autocrew.log").exists());
    assert!(!install.path(".backup").exists());
    assert!(!install.path("autocrew_update").exists());
}

#[test]
fn test_help_combined_with_verbose_is_rejected() {
    let install = TestInstall::new();

    install
        .autocrew()
        .args(["-v", "-?"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("-u/--upgrade"));
}

#[test]
fn test_help_prints_usage() {
    let install = TestInstall::new();

    install
        .autocrew()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("--auto_run"));
}

#[test]
fn test_multiple_zero_is_a_usage_error() {
    let install = TestInstall::new();

    install.autocrew().args(["-m", "0", "goal"]).assert().code(1);
    assert!(!install.path("autocrew.log").exists());
}

#[test]
fn test_banner_reports_failed_version_check() {
    let install = TestInstall::new();

    install
        .autocrew()
        .arg("-h")
        .assert()
        .success()
        .stdout(predicate::str::contains("AutoCrew version:"))
        .stdout(predicate::str::contains("Error checking for the latest version"));

    let log = std::fs::read_to_string(install.path("autocrew.log")).unwrap();
    assert!(log.contains("Command-line arguments: -h"));
}

#[test]
fn test_rank_without_scripts_fails() {
    let install = TestInstall::with_config(BACKEND_CONFIG);

    install
        .autocrew()
        .args(["-r", "plan a trip"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("No existing scripts found to rank."));
}

#[test]
fn test_goal_without_backend_fails() {
    let install = TestInstall::new();

    install
        .autocrew()
        .arg("plan a trip")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No crew backend configured"));
}

#[test]
fn test_malformed_config_fails_before_logging() {
    let install = TestInstall::with_config("[MISCELLANEOUS\nkey = value\n");

    install
        .autocrew()
        .arg("plan a trip")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("config.ini"));

    assert!(!install.path("autocrew.log").exists());
}
