//! Binary-level behavior: exit codes and diagnostics.
#![cfg(unix)]

mod common;

use assert_cmd::Command;
use common::Project;
use predicates::prelude::*;

fn bundler() -> Command {
    let mut cmd = Command::cargo_bin("kodegen_bundler_node").unwrap();
    cmd.env("RUST_LOG", "warn");
    cmd
}

fn project() -> Project {
    let project = Project::new();
    project.write_manifest("package.json", "app", &[("x", "1.0.0")]);
    project.write("index.js", "console.log('hi');\n");
    project
}

#[test]
fn successful_run_reports_archive_and_checksum() {
    let project = project();
    let installer = project.installer();

    bundler()
        .arg("--project-dir")
        .arg(project.dir())
        .args(["--artifact-name", "app", "--source", "*.js"])
        .args(["--installer", &installer.program])
        .assert()
        .success()
        .stdout(predicate::str::contains("app.tar.gz"))
        .stdout(predicate::str::contains("SHA256: "));

    assert!(project.build_dir().join("app.tar.gz").is_file());
}

#[test]
fn failing_stage_is_named_and_exit_code_is_nonzero() {
    let project = project();
    let installer = project.installer();

    bundler()
        .arg("--project-dir")
        .arg(project.dir())
        .args(["--artifact-name", "app", "--source", "*.js"])
        .args(["--installer", &installer.program])
        .args(["--runtime-url", "http://127.0.0.1:1/rt", "--runtime-name", "rt"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("fetch-runtime"));

    assert!(!project.build_dir().join("app.tar.gz").exists());
}

#[test]
fn missing_artifact_name_is_reported() {
    let project = project();

    bundler()
        .arg("--project-dir")
        .arg(project.dir())
        .assert()
        .failure()
        .stderr(predicate::str::contains("--artifact-name"));
}

#[test]
fn runtime_name_without_url_is_a_configuration_error() {
    let project = project();

    bundler()
        .arg("--project-dir")
        .arg(project.dir())
        .args(["--artifact-name", "app", "--runtime-name", "rt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid configuration"));

    assert!(!project.build_dir().exists());
}

#[test]
fn malformed_config_file_is_reported() {
    let project = project();
    project.write("bundle.toml", "artifact_name = [\n");

    bundler()
        .arg("--config")
        .arg(project.dir().join("bundle.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("bundle.toml"));
}

#[test]
fn unknown_stage_is_rejected() {
    bundler()
        .args(["--artifact-name", "app", "--stage", "deploy"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("deploy"));
}
