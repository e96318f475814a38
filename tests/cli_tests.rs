//! Integration tests for the upgrid CLI
//!
//! These tests run the actual binary with an isolated config and token cache.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Binary with config/cache pointed into `dir` and no ambient token
fn upgrid_cmd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("upgrid").unwrap();
    cmd.current_dir(dir)
        .arg("--config")
        .arg(dir.join("config.toml"))
        .env("UP_CACHE_PATH", dir.join("cache.json"))
        .env("NO_COLOR", "1")
        .env_remove("UP_API_TOKEN")
        .env_remove("UP_API_BASE_URL")
        .env_remove("UP_MAX_RECORDS")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_flag() {
    let temp_dir = TempDir::new().unwrap();
    upgrid_cmd(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Fetch Up banking data"))
        .stdout(predicate::str::contains("transactions"))
        .stdout(predicate::str::contains("login"));
}

#[test]
fn test_transactions_help_lists_filters() {
    let temp_dir = TempDir::new().unwrap();
    upgrid_cmd(temp_dir.path())
        .args(["transactions", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--filter"))
        .stdout(predicate::str::contains("--direction"));
}

#[test]
fn test_logout_when_not_logged_in() {
    let temp_dir = TempDir::new().unwrap();
    upgrid_cmd(temp_dir.path())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("You are not currently logged in."));
}

#[test]
fn test_login_then_logout() {
    let temp_dir = TempDir::new().unwrap();

    upgrid_cmd(temp_dir.path())
        .args(["login", "up:yeah:secret-token", "--ttl", "3600"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged in for 1 hour"));

    assert!(temp_dir.path().join("cache.json").exists());

    upgrid_cmd(temp_dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("up:yeah:***"))
        .stdout(predicate::str::contains("secret-token").not());

    upgrid_cmd(temp_dir.path())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("successfully logged out"));

    upgrid_cmd(temp_dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("not logged in"));
}

#[test]
fn test_login_reads_token_from_stdin() {
    let temp_dir = TempDir::new().unwrap();

    upgrid_cmd(temp_dir.path())
        .arg("login")
        .write_stdin("up:yeah:from-stdin\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged in for 1 day"));
}

#[test]
fn test_login_rejects_empty_token() {
    let temp_dir = TempDir::new().unwrap();

    upgrid_cmd(temp_dir.path())
        .arg("login")
        .write_stdin("\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("token must not be empty"));
}

#[test]
fn test_data_command_without_token_prints_error_grid() {
    let temp_dir = TempDir::new().unwrap();

    upgrid_cmd(temp_dir.path())
        .args(["tags", "--format", "csv"])
        .assert()
        .failure()
        .stdout(predicate::str::starts_with("ERROR,Token not provided,"));
}

#[test]
fn test_account_transactions_requires_id() {
    let temp_dir = TempDir::new().unwrap();

    upgrid_cmd(temp_dir.path())
        .args(["account-transactions", "", "--format", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("accountId is required."));
}

#[test]
fn test_bad_date_is_reported() {
    let temp_dir = TempDir::new().unwrap();

    upgrid_cmd(temp_dir.path())
        .env("UP_API_TOKEN", "up:yeah:env")
        .args(["between", "--since", "yesterday", "--until", "2021-01-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a date"));
}

#[test]
fn test_malformed_config_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("config.toml"), "[api\n").unwrap();

    upgrid_cmd(temp_dir.path())
        .arg("tags")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"))
        .stderr(predicate::str::contains("Fix:"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_tags_as_csv_with_env_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/tags"))
        .and(header("Authorization", "Bearer up:yeah:env"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"type": "tags", "id": "Holiday"},
                {"type": "tags", "id": "Pizza Night"}
            ],
            "links": {"prev": null, "next": null}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let base_url = format!("{}/api/v1/", server.uri());

    let output = tokio::task::spawn_blocking(move || {
        upgrid_cmd(temp_dir.path())
            .env("UP_API_TOKEN", "up:yeah:env")
            .env("UP_API_BASE_URL", base_url)
            .args(["tags", "--format", "csv"])
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "Tag\nHoliday\nPizza Night\n"
    );
}
