use predicates::prelude::*;

use crate::common::{BACKEND_CONFIG, TestInstall};

#[test]
fn test_upgrade_without_reachable_release_is_a_noop() {
    let install = TestInstall::with_config(BACKEND_CONFIG);
    install.write_file("scripts/crew_a.csv", "task,agent\n");

    install
        .autocrew()
        .arg("--upgrade")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "No new version available or you are already running the latest version.",
        ));

    assert_eq!(install.read_config(), BACKEND_CONFIG);
    assert!(install.path("scripts/crew_a.csv").exists());
    assert!(!install.path(".backup").exists());
    assert!(!install.path("autocrew_update").exists());
}

#[test]
fn test_upgrade_without_config_leaves_none_behind() {
    let install = TestInstall::new();

    install.autocrew().arg("-u").assert().success();

    assert!(!install.path("config.ini").exists());
    assert!(install.path("autocrew.log").exists());
}
