//! End-to-end smoke tests for the `shotline` binary.
//!
//! Note: stdout is piped under the test harness, so commands auto-select
//! JSON output.

use assert_cmd::Command;
use tempfile::TempDir;

fn shotline() -> Command {
    Command::cargo_bin("shotline").unwrap()
}

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_version_runs() {
    let output = shotline().arg("version").output().unwrap();
    assert!(output.status.success());
    assert!(stdout_of(&output).contains("shotline"));
}

#[test]
fn test_status_without_store_fails_with_db_exit_code() {
    let dir = TempDir::new().unwrap();
    shotline()
        .current_dir(dir.path())
        .arg("status")
        .assert()
        .failure()
        .code(2); // NOT_INITIALIZED maps to the database category
}

#[test]
fn test_init_then_status_is_clean() {
    let dir = TempDir::new().unwrap();

    shotline()
        .current_dir(dir.path())
        .args(["init", "--user", "u1"])
        .assert()
        .success();

    let output = shotline()
        .current_dir(dir.path())
        .arg("status")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = stdout_of(&output);
    assert!(stdout.contains("\"success\":true"), "got: {stdout}");
    assert!(stdout.contains("\"pending_deletions\":0"), "got: {stdout}");
}

#[test]
fn test_init_twice_requires_force() {
    let dir = TempDir::new().unwrap();

    shotline()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    shotline()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .failure()
        .code(2); // ALREADY_INITIALIZED

    shotline()
        .current_dir(dir.path())
        .args(["init", "--force"])
        .assert()
        .success();
}

#[test]
fn test_pull_without_remote_is_config_error() {
    let dir = TempDir::new().unwrap();

    shotline()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();

    shotline()
        .current_dir(dir.path())
        .arg("pull")
        .assert()
        .failure()
        .code(7); // CONFIG_ERROR: no remote configured
}

#[test]
fn test_clone_from_peer_store() {
    let peer_dir = TempDir::new().unwrap();
    let clone_dir = TempDir::new().unwrap();

    // Seed a peer project.
    shotline()
        .current_dir(peer_dir.path())
        .arg("init")
        .assert()
        .success();
    let peer_db = peer_dir.path().join(".shotline/project.db");

    shotline()
        .current_dir(clone_dir.path())
        .args(["clone", peer_db.to_str().unwrap()])
        .assert()
        .success();

    assert!(clone_dir.path().join(".shotline/project.db").exists());
}
