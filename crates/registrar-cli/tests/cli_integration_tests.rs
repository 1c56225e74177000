//! CLI integration tests for registrar
//!
//! Tests the registrar CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Isolated environment: its own config dir and data root
struct Env {
    config: TempDir,
    data: TempDir,
}

impl Env {
    fn new() -> Self {
        let data = TempDir::new().unwrap();
        for rel in [
            "admin/budget",
            "faculty/grades/bsit",
            "faculty/grades/bscs",
            "student/handbook",
            "guest",
        ] {
            make_partition(data.path(), rel);
        }
        Self {
            config: TempDir::new().unwrap(),
            data,
        }
    }

    #[allow(deprecated)]
    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("registrar").unwrap();
        cmd.current_dir(self.config.path());
        cmd.env("REGISTRAR_CONFIG_DIR", self.config.path());
        cmd.env("REGISTRAR_DATA_ROOT", self.data.path());
        cmd.env_remove("RUST_LOG");
        cmd
    }
}

fn make_partition(root: &Path, rel: &str) {
    let dir = root.join(rel);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("chroma.sqlite3"), b"").unwrap();
}

#[test]
fn test_help_lists_commands() {
    let env = Env::new();
    env.cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("partitions"))
        .stdout(predicate::str::contains("delex"))
        .stdout(predicate::str::contains("prepare"));
}

#[test]
fn test_partitions_for_student() {
    let env = Env::new();
    env.cmd()
        .args(["partitions", "--role", "Student"])
        .assert()
        .success()
        .stdout(predicate::str::contains("student/handbook"))
        .stdout(predicate::str::contains("(guest)"))
        .stdout(predicate::str::contains("faculty").not())
        .stdout(predicate::str::contains("admin").not());
}

#[test]
fn test_partitions_json_with_assignment() {
    let env = Env::new();
    let output = env
        .cmd()
        .args(["partitions", "--role", "faculty", "--assign", "BSIT", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let parts: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let parts = parts.as_array().unwrap();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0]["role_folder"], "faculty");
    assert_eq!(parts[1]["is_guest"], true);
}

#[test]
fn test_partitions_root_override() {
    let env = Env::new();
    let other = TempDir::new().unwrap();
    make_partition(other.path(), "staff/registrar");

    env.cmd()
        .args(["partitions", "--role", "admin", "--quiet", "--root"])
        .arg(other.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("registrar"))
        .stdout(predicate::str::contains("handbook").not());
}

#[test]
fn test_partitions_missing_root_fails() {
    let env = Env::new();
    env.cmd()
        .args(["partitions", "--role", "admin", "--root"])
        .arg(env.data.path().join("missing"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("E001"))
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_delex_text_output() {
    let env = Env::new();
    env.cmd()
        .args([
            "delex",
            "How many 3rd year Nursing students?",
            "--plan",
            r#"{"program": "Nursing", "year_level": "3"}"#,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Template: How many <YEAR_LEVEL> <PROGRAM> students?",
        ))
        .stdout(predicate::str::contains(r#""program":"<PROGRAM>""#));
}

#[test]
fn test_delex_json_output() {
    let env = Env::new();
    let output = env
        .cmd()
        .args(["delex", "List all 2nd year students", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["template"], "List all <YEAR_LEVEL> students");
}

#[test]
fn test_delex_rejects_non_object_plan() {
    let env = Env::new();
    env.cmd()
        .args(["delex", "anything", "--plan", "[1, 2]"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid query plan"));
}

#[test]
fn test_prepare_reports_partitions_and_miss() {
    let env = Env::new();
    env.cmd()
        .args([
            "prepare",
            "Show the Computer Science handbook",
            "--role",
            "student",
            "--plan",
            r#"{"program": "Computer Science"}"#,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Template: Show the <PROGRAM> handbook"))
        .stdout(predicate::str::contains("Cached plan: none"))
        .stdout(predicate::str::contains("Partitions (2):"));
}

#[test]
fn test_roles_reflects_config() {
    let env = Env::new();
    env.cmd()
        .args(["config", "set", "access.roles.registrar", "admin"])
        .assert()
        .success();

    env.cmd()
        .arg("roles")
        .assert()
        .success()
        .stdout(predicate::str::contains("admin: sees all folders"))
        .stdout(predicate::str::contains("registrar: excludes admin"));
}

#[test]
fn test_config_set_get_reset() {
    let env = Env::new();
    env.cmd()
        .args(["config", "set", "cache.capacity", "64"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Set cache.capacity = 64 in"))
        .stdout(predicate::str::contains("config.toml"));

    assert!(env.config.path().join("config.toml").exists());

    env.cmd()
        .args(["config", "get", "cache.capacity"])
        .assert()
        .success()
        .stdout(predicate::str::contains("64"));

    env.cmd()
        .args(["config", "reset"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed"));

    env.cmd()
        .args(["config", "get", "cache.capacity"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1024"));
}

#[test]
fn test_config_json_output() {
    let env = Env::new();
    let output = env
        .cmd()
        .args(["config", "get", "cache.capacity", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["cache.capacity"], "1024");

    let output = env
        .cmd()
        .args(["config", "list", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["access.roles.guest"], "admin, faculty, staff, student");
}

#[test]
fn test_prepare_rejects_blank_role() {
    let env = Env::new();
    env.cmd()
        .args(["prepare", "List students", "--role", "  "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E800"));
}

#[test]
fn test_config_unknown_key_fails() {
    let env = Env::new();
    env.cmd()
        .args(["config", "get", "nope.nothing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn test_config_path_uses_env_dir() {
    let env = Env::new();
    env.cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}
