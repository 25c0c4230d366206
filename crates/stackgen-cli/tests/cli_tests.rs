//! Binary-level tests for the `stackgen` command.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn templates_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../templates")
}

/// A `stackgen` invocation isolated from the user's config and env.
fn stackgen(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("stackgen").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("STACKGEN_TEMPLATES_DIR")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

fn templates_arg() -> String {
    templates_dir().display().to_string()
}

// ── Basics ──────────────────────────────────────────────────────────────────

#[test]
fn help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    stackgen(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("new"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("completions"));
}

#[test]
fn version_flag() {
    let home = TempDir::new().unwrap();
    stackgen(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn shell_completions() {
    let home = TempDir::new().unwrap();
    stackgen(&home)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stackgen"));
}

// ── new ─────────────────────────────────────────────────────────────────────

#[test]
fn new_generates_the_demo_project() {
    let home = TempDir::new().unwrap();
    stackgen(&home)
        .args([
            "new",
            "demo",
            "--templates",
            &templates_arg(),
            "--db",
            "postgres",
            "--feature",
            "auth",
            "--feature",
            "graphql",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Project generated"))
        .stdout(predicate::str::contains("pnpm install"));

    let root = home.path().join("demo");
    assert!(root.join("stackgen.json").is_file());
    assert!(root.join("apps/backend/src/auth.ts").is_file());
    assert!(root.join("apps/backend/src/schema.graphql").is_file());
    assert!(root.join("apps/frontend/package.json").is_file());
}

#[test]
fn new_honours_output_and_services() {
    let home = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    stackgen(&home)
        .args([
            "new",
            "shop",
            "--templates",
            &templates_arg(),
            "--output",
            out.path().to_str().unwrap(),
            "--service",
            "billing:grpc",
            "--service",
            "mailer:mq:koa",
        ])
        .assert()
        .success();

    let apps = out.path().join("shop/apps");
    assert!(apps.join("billing/proto/billing.proto").is_file());
    assert!(apps.join("mailer/src/queue.ts").is_file());
    assert!(!home.path().join("shop").exists());
}

#[test]
fn dry_run_writes_nothing() {
    let home = TempDir::new().unwrap();
    stackgen(&home)
        .args(["new", "demo", "--templates", &templates_arg(), "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run"))
        .stdout(predicate::str::contains("graphql (skipped)"));

    assert!(!home.path().join("demo").exists());
}

#[test]
fn json_report_is_machine_readable() {
    let home = TempDir::new().unwrap();
    let assert = stackgen(&home)
        .args([
            "--output-format",
            "json",
            "new",
            "demo",
            "--templates",
            &templates_arg(),
        ])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let json_start = stdout.find('{').unwrap();
    let report: serde_json::Value = serde_json::from_str(&stdout[json_start..]).unwrap();
    assert_eq!(report["subprojects"], serde_json::json!(["backend", "frontend"]));
    assert!(
        report["skipped"]
            .as_array()
            .unwrap()
            .contains(&serde_json::json!("graphql"))
    );
}

#[test]
fn quiet_new_prints_nothing() {
    let home = TempDir::new().unwrap();
    stackgen(&home)
        .args(["-q", "new", "demo", "--templates", &templates_arg()])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn existing_project_needs_force() {
    let home = TempDir::new().unwrap();
    std::fs::create_dir(home.path().join("demo")).unwrap();

    stackgen(&home)
        .args(["new", "demo", "--templates", &templates_arg()])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("already exists"))
        .stderr(predicate::str::contains("--force"));

    stackgen(&home)
        .args(["new", "demo", "--templates", &templates_arg(), "--force"])
        .assert()
        .success();
    assert!(home.path().join("demo/stackgen.json").is_file());
}

#[test]
fn missing_templates_fail_before_writing() {
    let home = TempDir::new().unwrap();
    let empty = TempDir::new().unwrap();
    stackgen(&home)
        .args(["new", "demo", "--templates", empty.path().to_str().unwrap()])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("express-typescript"));

    assert!(!home.path().join("demo").exists());
}

#[test]
fn incompatible_stack_is_a_user_error() {
    let home = TempDir::new().unwrap();
    stackgen(&home)
        .args([
            "new",
            "demo",
            "--templates",
            &templates_arg(),
            "--backend",
            "nestjs",
            "--backend-lang",
            "js",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nestjs"));
}

#[test]
fn invalid_project_name_is_rejected() {
    let home = TempDir::new().unwrap();
    stackgen(&home)
        .args(["new", "Not Valid!", "--templates", &templates_arg()])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid project name"));
}

#[test]
fn malformed_service_is_a_parse_error() {
    let home = TempDir::new().unwrap();
    stackgen(&home)
        .args(["new", "demo", "--service", "billing:pigeon"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("pigeon"));
}

#[test]
fn from_document_reproduces_a_project() {
    let home = TempDir::new().unwrap();
    stackgen(&home)
        .args([
            "new",
            "first",
            "--templates",
            &templates_arg(),
            "--db",
            "mongo",
            "--feature",
            "docker",
        ])
        .assert()
        .success();

    let document = home.path().join("first/stackgen.json");
    stackgen(&home)
        .args([
            "new",
            "second",
            "--templates",
            &templates_arg(),
            "--from",
            document.to_str().unwrap(),
        ])
        .assert()
        .success();

    let compose = std::fs::read_to_string(home.path().join("second/docker-compose.yml")).unwrap();
    assert!(compose.contains("mongo"));
}

// ── list ────────────────────────────────────────────────────────────────────

#[test]
fn list_shows_bundled_templates() {
    let home = TempDir::new().unwrap();
    stackgen(&home)
        .args(["list", "--templates", &templates_arg()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Available Templates"))
        .stdout(predicate::str::contains("nestjs-typescript"))
        .stdout(predicate::str::contains("vue-javascript"));
}

#[test]
fn list_filters_by_category() {
    let home = TempDir::new().unwrap();
    let assert = stackgen(&home)
        .args([
            "list",
            "--templates",
            &templates_arg(),
            "--category",
            "frontend",
            "--format",
            "list",
        ])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let names: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        names,
        vec![
            "react-javascript",
            "react-typescript",
            "vue-javascript",
            "vue-typescript"
        ]
    );
}

#[test]
fn list_json_is_an_array() {
    let home = TempDir::new().unwrap();
    let assert = stackgen(&home)
        .args(["list", "--templates", &templates_arg(), "--format", "json"])
        .assert()
        .success();
    let rows: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 9);
    assert_eq!(rows[0]["category"], "backend");
}

// ── init / config ───────────────────────────────────────────────────────────

#[test]
fn init_then_config_round_trip() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("stackgen.toml");
    let path_arg = path.to_str().unwrap();

    stackgen(&home)
        .args(["--config", path_arg, "init"])
        .assert()
        .success();
    assert!(path.is_file());

    stackgen(&home)
        .args(["--config", path_arg, "config", "set", "defaults.backend_framework", "koa"])
        .assert()
        .success();

    stackgen(&home)
        .args(["--config", path_arg, "config", "get", "defaults.backend_framework"])
        .assert()
        .success()
        .stdout(predicate::str::contains("defaults.backend_framework = koa"));
}

#[test]
fn config_set_rejects_unknown_keys() {
    let home = TempDir::new().unwrap();
    stackgen(&home)
        .args(["config", "set", "defaults.colour", "blue"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn environment_overrides_the_file() {
    let home = TempDir::new().unwrap();
    stackgen(&home)
        .env("STACKGEN_DEFAULTS__BACKEND_PORT", "4500")
        .args(["config", "get", "defaults.backend_port"])
        .assert()
        .success()
        .stdout(predicate::str::contains("4500"));
}

#[test]
fn explicit_missing_config_is_a_configuration_error() {
    let home = TempDir::new().unwrap();
    stackgen(&home)
        .args(["--config", "absent.toml", "list"])
        .assert()
        .code(4);
}
