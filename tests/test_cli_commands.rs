//! End-to-end checks of the poegen binary that need no model endpoint.

use assert_cmd::assert::OutputAssertExt;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const AZURE_KEYS: [&str; 4] = [
    "AZURE_OPENAI_KEY",
    "AZURE_OPENAI_ENDPOINT",
    "AZURE_OPENAI_DEPLOYMENT",
    "AZURE_OPENAI_API_VERSION",
];

fn project() -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join(".git")).unwrap();
    fs::create_dir_all(temp.path().join(".poegen")).unwrap();
    temp
}

fn poegen(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("poegen"));
    cmd.current_dir(home).env("POEGEN_HOME", home);
    for key in AZURE_KEYS {
        cmd.env_remove(key);
    }
    cmd
}

#[test]
fn version_output() {
    let temp = project();
    poegen(temp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("poegen"));
}

#[test]
fn run_without_credentials_exits_with_config_error() {
    let temp = project();
    fs::write(temp.path().join("session.toml"), "customer_name = \"ACME\"\n").unwrap();

    poegen(temp.path())
        .args(["run", "--input", "session.toml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("AZURE_OPENAI_KEY"))
        .stderr(predicate::str::contains("AZURE_OPENAI_ENDPOINT"));

    assert!(!temp.path().join("out").exists());
}

#[test]
fn config_reports_sources() {
    let temp = project();
    fs::write(
        temp.path().join(".poegen").join("config.toml"),
        "[llm]\ntemperature = 0.2\n",
    )
    .unwrap();

    poegen(temp.path())
        .env("AZURE_OPENAI_ENDPOINT", "https://contoso.openai.azure.com/")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("https://contoso.openai.azure.com/  [env]"))
        .stdout(predicate::str::contains("0.2  [config]"))
        .stdout(predicate::str::contains("2024-06-01  [default]"))
        .stdout(predicate::str::contains("AZURE_OPENAI_KEY"));
}

#[test]
fn config_never_prints_the_api_key() {
    let temp = project();
    fs::write(
        temp.path().join(".poegen").join("secrets.toml"),
        "AZURE_OPENAI_KEY = \"do-not-print-me\"\n",
    )
    .unwrap();

    poegen(temp.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("<set>  [secrets]"))
        .stdout(predicate::str::contains("do-not-print-me").not());
}

#[test]
fn templates_reports_missing_files() {
    let temp = project();
    poegen(temp.path())
        .arg("templates")
        .assert()
        .success()
        .stdout(predicate::str::contains("solution"))
        .stdout(predicate::str::contains("missing, defaults used"))
        .stdout(predicate::str::contains("Migration header: 20 columns"));
}

#[test]
fn templates_reads_the_configured_header() {
    let temp = project();
    fs::create_dir_all(temp.path().join("templates")).unwrap();
    fs::write(
        temp.path().join("templates").join("migration_header.csv"),
        "*Server name,*Cores,*Memory (In MB)\n",
    )
    .unwrap();

    poegen(temp.path())
        .arg("templates")
        .assert()
        .success()
        .stdout(predicate::str::contains("Migration header: 3 columns"));
}

#[test]
fn explicit_missing_config_exits_with_config_error() {
    let temp = project();
    poegen(temp.path())
        .args(["--config", "nowhere.toml", "config"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nowhere.toml"));
}
