//! Binary-level behaviour that needs no live ClickHouse server.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn schemasync_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("schemasync"));
    cmd.env_remove("RUST_LOG").env("NO_COLOR", "1");
    cmd
}

fn write_config(dir: &TempDir, contents: &str) -> String {
    let path = dir.path().join("config.yml");
    fs::write(&path, contents).expect("write config");
    path_arg(&path)
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[test]
fn missing_config_file_fails() {
    let dir = TempDir::new().expect("tempdir");
    let missing = path_arg(&dir.path().join("nope.yml"));

    schemasync_cmd()
        .args(["--config", &missing])
        .assert()
        .failure()
        .stderr(contains("failed to load"))
        .stderr(contains("nope.yml"));
}

#[test]
fn invalid_definition_is_rejected_before_connecting() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_config(
        &dir,
        r#"
servers:
  - host: 127.0.0.1
    port: 1
databases:
  - name: analytics
    tables:
      daily:
        view: true
        as_table: events
"#,
    );

    schemasync_cmd()
        .args(["--config", &config])
        .assert()
        .failure()
        .stderr(contains("analytics.daily"))
        .stderr(contains("a view cannot be created as another table"))
        .stderr(contains("connect failed").not());
}

#[test]
fn config_without_servers_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_config(&dir, "databases: []\n");

    schemasync_cmd()
        .args(["--config", &config])
        .assert()
        .failure()
        .stderr(contains("no servers configured"));
}

#[test]
fn unreachable_replica_aborts_the_run() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_config(
        &dir,
        r#"
servers:
  - host: 127.0.0.1
    port: 1
databases:
  - name: analytics
    tables:
      events:
        engine: Log
        columns:
          id: UInt64
"#,
    );

    schemasync_cmd()
        .args(["--config", &config, "--sync"])
        .assert()
        .failure()
        .stderr(contains("connect failed on 1 replica(s)"))
        .stderr(contains("127.0.0.1:1"));
}

#[test]
fn drop_columns_without_sync_is_a_usage_error() {
    schemasync_cmd()
        .args(["--drop-columns"])
        .assert()
        .failure()
        .stderr(contains("--sync"));
}

#[test]
fn help_lists_every_flag() {
    let output = schemasync_cmd().arg("--help").output().expect("run --help");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for flag in ["--config", "--sync", "--drop-columns", "--debug", "--json"] {
        assert!(stdout.contains(flag), "missing {flag} in:\n{stdout}");
    }
}
