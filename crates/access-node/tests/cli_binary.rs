//! Runs the `bq-access` executable and checks what scripts see on stdout.
//!
//! Each run gets a scrubbed environment and its own spool directory.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn bq_access() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_bq-access"))
}

fn run(workdir: &Path, args: &[&str]) -> Output {
    let mut cmd = Command::new(bq_access());
    cmd.env_clear()
        .env("PATH", std::env::var_os("PATH").unwrap_or_default())
        .env("BQ_STORE_BACKEND", "memory")
        .env("BQ_SPOOL_DIR", workdir.join("spool"))
        .env("BQ_LOG_LEVEL", "debug")
        .current_dir(workdir)
        .args(args);
    cmd.output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_query_stdout_is_only_the_response_token() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(
        dir.path(),
        &["query", "--frame", "QUERY:not-base64:index_right"],
    );

    assert_eq!(stdout(&output), "ERROR\n", "stderr: {}", stderr(&output));
    assert_eq!(output.status.code(), Some(2));
    // Logging is still on, just not on stdout.
    assert!(stderr(&output).contains("bq-access starting"));
}

#[test]
fn test_query_grant_against_enrollment_fixture() {
    let dir = tempfile::tempdir().unwrap();
    let fixtures =
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/enrollment.example.json");
    let config = dir.path().join("bq-access.toml");
    std::fs::write(
        &config,
        format!(
            "unit_code = 'CLI-TEST'\n\n[store]\nbackend = 'memory'\nfixtures = '{}'\n",
            fixtures.display()
        ),
    )
    .unwrap();

    let output = run(
        dir.path(),
        &[
            "--config",
            config.to_str().unwrap(),
            "query",
            "--template",
            "AwFdHgAA//74HuAGwAKAAIAAAAAAAAAAAAAAAAAAAAE=",
            "--finger",
            "index_right",
        ],
    );

    assert_eq!(stdout(&output), "YES\n", "stderr: {}", stderr(&output));
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_startup_failure_writes_nothing_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(
        dir.path(),
        &["--config", "does-not-exist.toml", "query", "--frame", "QUERY:AA:index_right"],
    );

    assert_eq!(output.status.code(), Some(3));
    assert!(output.stdout.is_empty());
    assert!(stderr(&output).contains("Failed to load configuration"));
}
