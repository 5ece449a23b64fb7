//! Integration tests for the pva CLI.
//!
//! These tests exercise the binary end-to-end using `assert_cmd`.
//! Passwords come from `PVA_PASSWORD` and password values from piped
//! stdin, so nothing here needs a terminal.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Helper: get a Command pointing at the pva binary.
fn pva() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("pva").expect("binary should exist");
    cmd.env_remove("PVA_USER")
        .env_remove("PVA_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

/// A data directory configured with the cheapest accepted KDF settings.
fn data_dir() -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("pva.toml"),
        "argon2_memory_kib = 8192\nargon2_iterations = 1\nargon2_parallelism = 1\n",
    )
    .unwrap();
    tmp
}

/// Run pva against `dir` as `user` with `password`.
fn pva_as(dir: &TempDir, user: &str, password: &str) -> Command {
    let mut cmd = pva();
    cmd.arg("--data-dir")
        .arg(dir.path())
        .arg("--user")
        .arg(user)
        .env("PVA_PASSWORD", password);
    cmd
}

fn register(dir: &TempDir, user: &str, password: &str) {
    let mut cmd = pva();
    cmd.arg("--data-dir")
        .arg(dir.path())
        .args(["register", user])
        .env("PVA_PASSWORD", password)
        .assert()
        .success();
}

#[test]
fn help_flag_shows_usage() {
    pva()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Multi-user encrypted password vault"))
        .stdout(predicate::str::contains("register"))
        .stdout(predicate::str::contains("vault"))
        .stdout(predicate::str::contains("password"));
}

#[test]
fn version_flag_shows_version() {
    pva()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pva"));
}

#[test]
fn unknown_command_fails() {
    pva().arg("frobnicate").assert().failure();
}

#[test]
fn first_registration_is_admin() {
    let dir = data_dir();
    let mut cmd = pva();
    cmd.arg("--data-dir")
        .arg(dir.path())
        .args(["register", "alice"])
        .env("PVA_PASSWORD", "alice-password")
        .assert()
        .success()
        .stdout(predicate::str::contains("admin"));

    assert!(dir.path().join("pva.db").exists());
}

#[test]
fn short_password_is_rejected_at_registration() {
    let dir = data_dir();
    let mut cmd = pva();
    cmd.arg("--data-dir")
        .arg(dir.path())
        .args(["register", "alice"])
        .env("PVA_PASSWORD", "short")
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 8"));
}

#[test]
fn commands_need_a_user() {
    let dir = data_dir();
    let mut cmd = pva();
    cmd.arg("--data-dir")
        .arg(dir.path())
        .args(["vault", "list"])
        .env("PVA_PASSWORD", "whatever1")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--user"));
}

#[test]
fn wrong_password_is_rejected() {
    let dir = data_dir();
    register(&dir, "alice", "alice-password");

    pva_as(&dir, "alice", "not-the-password")
        .args(["vault", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid username or password"));
}

#[test]
fn store_and_reveal_a_password() {
    let dir = data_dir();
    register(&dir, "alice", "alice-password");

    pva_as(&dir, "alice", "alice-password")
        .args(["vault", "create", "Personal"])
        .assert()
        .success()
        .stdout(predicate::str::contains("id 1"));

    pva_as(&dir, "alice", "alice-password")
        .args(["password", "add", "1", "email", "--description", "webmail"])
        .write_stdin("secret123\n")
        .assert()
        .success();

    pva_as(&dir, "alice", "alice-password")
        .args(["vault", "show", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("email"))
        .stdout(predicate::str::contains("secret123").not());

    pva_as(&dir, "alice", "alice-password")
        .args(["vault", "show", "1", "--reveal"])
        .assert()
        .success()
        .stdout(predicate::str::contains("secret123"));
}

#[test]
fn shared_vault_is_readable_by_recipient() {
    let dir = data_dir();
    register(&dir, "alice", "alice-password");
    register(&dir, "bob", "bob-password");

    pva_as(&dir, "alice", "alice-password")
        .args(["vault", "create", "Team"])
        .assert()
        .success();
    pva_as(&dir, "alice", "alice-password")
        .args(["password", "add", "1", "wifi"])
        .write_stdin("hunter22")
        .assert()
        .success();

    pva_as(&dir, "bob", "bob-password")
        .args(["vault", "show", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));

    pva_as(&dir, "alice", "alice-password")
        .args(["vault", "share", "1", "bob"])
        .assert()
        .success();

    pva_as(&dir, "bob", "bob-password")
        .args(["vault", "show", "1", "--reveal"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hunter22"));

    // bob is a viewer and may not write.
    pva_as(&dir, "bob", "bob-password")
        .args(["password", "add", "1", "mine"])
        .write_stdin("x")
        .assert()
        .failure()
        .stderr(predicate::str::contains("passwords.manage"));
}

#[test]
fn admin_promotes_user_to_manager() {
    let dir = data_dir();
    register(&dir, "alice", "alice-password");
    register(&dir, "bob", "bob-password");

    pva_as(&dir, "bob", "bob-password")
        .args(["vault", "create", "Mine"])
        .assert()
        .failure();

    pva_as(&dir, "alice", "alice-password")
        .args(["role", "bob", "manager"])
        .assert()
        .success();

    pva_as(&dir, "bob", "bob-password")
        .args(["vault", "create", "Mine"])
        .assert()
        .success();
}

#[test]
fn unknown_role_is_rejected() {
    let dir = data_dir();
    register(&dir, "alice", "alice-password");

    pva_as(&dir, "alice", "alice-password")
        .args(["role", "alice", "superuser"])
        .assert()
        .failure();
}

#[test]
fn forced_delete_removes_vault() {
    let dir = data_dir();
    register(&dir, "alice", "alice-password");

    pva_as(&dir, "alice", "alice-password")
        .args(["vault", "create", "Temp"])
        .assert()
        .success();
    pva_as(&dir, "alice", "alice-password")
        .args(["vault", "delete", "1", "--force"])
        .assert()
        .success();

    pva_as(&dir, "alice", "alice-password")
        .args(["vault", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no vaults"));
}

#[test]
fn saved_devices_are_listed() {
    let dir = data_dir();
    register(&dir, "alice", "alice-password");
    register(&dir, "bob", "bob-password");

    pva_as(&dir, "alice", "alice-password")
        .args(["device", "add", "192.168.1.20", "printer", "-d", "office"])
        .assert()
        .success()
        .stdout(predicate::str::contains("id 1"));

    // viewers may look but not touch
    pva_as(&dir, "bob", "bob-password")
        .args(["device", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("192.168.1.20"))
        .stdout(predicate::str::contains("printer"));
    pva_as(&dir, "bob", "bob-password")
        .args(["device", "delete", "1", "--force"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("devices.manage"));

    pva_as(&dir, "alice", "alice-password")
        .args(["device", "add", "192.168.1.20", "again"])
        .assert()
        .failure();
}
