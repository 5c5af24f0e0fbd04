// SPDX-FileCopyrightText: 2025 RAprogramm
// SPDX-License-Identifier: MIT

//! Integration tests for the compliance-rag binary.

use assert_cmd::{Command, cargo::cargo_bin_cmd};
use predicates::prelude::*;

fn cmd() -> Command {
    let mut cmd = cargo_bin_cmd!("compliance-rag");
    cmd.env_remove("DATABASE_URL")
        .env_remove("DATABASE_PASSWORD")
        .env_remove("LLM_API_KEY")
        .env_remove("LLM_PROVIDER")
        .env_remove("LLM_MODEL")
        .env_remove("RUST_LOG");
    cmd
}

/// Nothing listens on port 1, so connecting fails fast
const DEAD_DATABASE: &str = "postgres://postgres@127.0.0.1:1/complykaro";

#[test]
fn test_help() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ask"))
        .stdout(predicate::str::contains("tables"))
        .stdout(predicate::str::contains("--database-url"));
}

#[test]
fn test_version() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("compliance-rag"));
}

#[test]
fn test_unreachable_database_exits_cleanly() {
    cmd()
        .args(["--database-url", DEAD_DATABASE, "--no-color", "chat"])
        .write_stdin("What compliance needed for fire incident?\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("knowledge base unavailable: Database"))
        .stdout(predicate::str::contains("Hint:"))
        .stdout(predicate::str::contains("Your question").not());
}

#[test]
fn test_unreachable_database_for_ask() {
    cmd()
        .args(["--database-url", DEAD_DATABASE, "--no-color", "ask", "q"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PostgreSQL"));
}

#[test]
fn test_hosted_provider_without_key_fails() {
    cmd()
        .args(["--provider", "open-ai", "--database-url", DEAD_DATABASE, "tables"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_config_file_with_password_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(".compliance-rag.toml"),
        "[database]\npassword = \"secret\"\n"
    )
    .unwrap();

    cmd()
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .args(["--database-url", DEAD_DATABASE])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_malformed_database_url_is_a_config_error() {
    cmd()
        .args(["--database-url", "not a url at all", "--no-color", "chat"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid database URL"))
        .stderr(predicate::str::contains("retrying database connect").not())
        .stdout(predicate::str::contains("Hint:").not());
}

#[test]
fn test_unknown_subcommand() {
    cmd().arg("analyze").assert().failure();
}
