use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

/// Workspace whose "external tool" is a shell script
fn workspace(script: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    let config = format!(
        "command = \"sh\"\nargs = [\"-c\", {:?}, \"fixflow-session\"]\nsession_id_flag = \"\"\n",
        script
    );
    std::fs::write(dir.path().join(".fixflow.toml"), config).unwrap();
    dir
}

fn fixflow(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("fixflow").unwrap();
    cmd.current_dir(dir);
    cmd
}

fn read(dir: &Path, rel: &str) -> String {
    std::fs::read_to_string(dir.join(".fixflow").join(rel)).unwrap()
}

#[test]
fn test_headless_run_completes_and_persists() {
    let dir = workspace("echo checking api; echo 'api: done'");

    fixflow(dir.path())
        .args(["run", "--headless", "-w", "lint", "-w", "type", "-p", "api"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ALL WORKFLOWS COMPLETED"));

    assert_eq!(read(dir.path(), "logs/lint.status"), "COMPLETED\n");
    assert_eq!(read(dir.path(), "logs/type.status"), "COMPLETED\n");
    assert!(read(dir.path(), "logs/type.log").contains("api: done"));
    assert!(read(dir.path(), "logs/type.prompt").contains("- [ ] api"));
    assert_eq!(read(dir.path(), "selected-workflows.txt"), "type\nlint\n");
    assert_eq!(read(dir.path(), "selected-projects.txt"), "api\n");

    fixflow(dir.path())
        .args(["status", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"PASS\""));
}

#[test]
fn test_failed_session_does_not_fail_the_run() {
    let dir = workspace("echo broken >&2; exit 2");

    fixflow(dir.path())
        .args(["run", "--headless", "-w", "build", "-p", "api"])
        .assert()
        .success()
        .stdout(predicate::str::contains("COMPLETED WITH FAILURES"))
        .stdout(predicate::str::contains("Failed: build"));

    assert_eq!(read(dir.path(), "logs/build.status"), "FAILED\n");
    assert!(read(dir.path(), "logs/build.log").contains("broken"));
}

#[test]
fn test_abandoned_session_is_resumed() {
    let dir = workspace("printf '%s\\n' \"$@\"");
    let logs = dir.path().join(".fixflow").join("logs");
    std::fs::create_dir_all(&logs).unwrap();
    std::fs::write(logs.join("test.status"), "RUNNING\n").unwrap();
    std::fs::write(logs.join("test.log"), "earlier output\n").unwrap();

    fixflow(dir.path())
        .args(["run", "--headless", "-w", "test", "-p", "api"])
        .assert()
        .success()
        .stdout(predicate::str::contains("resuming"));

    let log = read(dir.path(), "logs/test.log");
    assert!(log.starts_with("earlier output\n"));
    assert!(log.contains("session resumed at"));
    assert!(log.contains("--continue"));
}

#[test]
fn test_previous_selection_is_reused() {
    let dir = workspace("true");
    std::fs::create_dir_all(dir.path().join(".fixflow")).unwrap();
    std::fs::write(dir.path().join(".fixflow/selected-workflows.txt"), "lint\n").unwrap();
    std::fs::write(dir.path().join(".fixflow/selected-projects.txt"), "web\n").unwrap();

    fixflow(dir.path())
        .args(["run", "--headless"])
        .assert()
        .success();

    assert_eq!(read(dir.path(), "logs/lint.status"), "COMPLETED\n");
}

#[test]
fn test_dashboard_without_terminal_starts_no_session() {
    let dir = workspace("echo should not run");

    // assert_cmd captures stdout, so there is no terminal to take over
    fixflow(dir.path())
        .args(["run", "-w", "lint", "-p", "api"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--headless"));

    let logs = dir.path().join(".fixflow").join("logs");
    assert!(!logs.join("lint.status").exists());
    assert!(!logs.join("lint.log").exists());
}

#[test]
fn test_missing_selection_exits_with_error() {
    let dir = workspace("true");

    fixflow(dir.path())
        .args(["run", "--headless"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no workflows selected"));
}

#[test]
fn test_reset_clears_status() {
    let dir = workspace("true");
    let logs = dir.path().join(".fixflow").join("logs");
    std::fs::create_dir_all(&logs).unwrap();
    std::fs::write(logs.join("lint.status"), "RUNNING\n").unwrap();

    fixflow(dir.path())
        .args(["reset", "lint"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reset lint"));

    assert!(!logs.join("lint.status").exists());
}
