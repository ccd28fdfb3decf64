//! Integration tests for the trellis CLI.
//!
//! These tests run the built binary against manifests in temporary
//! directories.

use rstest::{fixture, rstest};
use tempfile::TempDir;

mod common;
use common::{SAMPLE_MANIFEST, run_trellis_in_dir, trellis_binary, write_manifest};

// ============================================================================
// Test Fixtures
// ============================================================================

/// Provides a fresh temporary directory for each test
#[fixture]
fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

/// Provides a temporary directory containing the sample manifest
#[fixture]
fn project_dir() -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp directory");
    write_manifest(temp.path(), SAMPLE_MANIFEST);
    temp
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

// ============================================================================
// Help and Discovery
// ============================================================================

#[test]
fn test_cli_help() {
    let output = std::process::Command::new(trellis_binary())
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("trellis"));
    assert!(text.contains("Usage:"));
}

#[rstest]
fn test_missing_manifest_fails(temp_dir: TempDir) {
    let output = run_trellis_in_dir(temp_dir.path(), &["components"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("trellis.yaml"));
}

#[rstest]
fn test_manifest_found_from_subdirectory(project_dir: TempDir) {
    let nested = project_dir.path().join("services").join("api");
    std::fs::create_dir_all(&nested).unwrap();

    let output = run_trellis_in_dir(&nested, &["components"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("database"));
}

#[rstest]
fn test_explicit_manifest_flag(temp_dir: TempDir) {
    let elsewhere = TempDir::new().unwrap();
    let path = write_manifest(elsewhere.path(), SAMPLE_MANIFEST);

    let output = run_trellis_in_dir(
        temp_dir.path(),
        &["--json", "components", "--manifest", path.to_str().unwrap()],
    );
    assert!(output.status.success());
    assert_eq!(json(&output).as_array().unwrap().len(), 3);
}

#[rstest]
fn test_cyclic_manifest_reports_error(temp_dir: TempDir) {
    write_manifest(
        temp_dir.path(),
        "components:\n  - id: a\n    depends_on: [b]\n  - id: b\n    depends_on: [a]\n",
    );
    let output = run_trellis_in_dir(temp_dir.path(), &["components"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Circular dependency"));
}

// ============================================================================
// Component Commands
// ============================================================================

#[rstest]
fn test_deps_transitive_json(project_dir: TempDir) {
    let output = run_trellis_in_dir(project_dir.path(), &["--json", "deps", "frontend", "--transitive"]);
    assert!(output.status.success());
    assert_eq!(json(&output)["components"], serde_json::json!(["api", "database"]));
}

#[rstest]
fn test_deps_reverse_text(project_dir: TempDir) {
    let output = run_trellis_in_dir(project_dir.path(), &["deps", "database", "-r", "-t"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("All dependents of database"));
    assert!(text.contains("frontend"));
}

#[rstest]
fn test_deps_unknown_component(project_dir: TempDir) {
    let output = run_trellis_in_dir(project_dir.path(), &["deps", "ghost"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("component not found: ghost"));
}

#[rstest]
fn test_impact_upgrade_flags_constraint_break(project_dir: TempDir) {
    let output = run_trellis_in_dir(
        project_dir.path(),
        &["--json", "impact", "database", "--upgrade", "2.0.0"],
    );
    assert!(output.status.success());
    let report = json(&output);
    assert_eq!(report["affected"], serde_json::json!(["api", "frontend"]));
    assert_eq!(report["incompatible"], serde_json::json!(["api"]));
}

#[rstest]
fn test_risk_json(project_dir: TempDir) {
    let output = run_trellis_in_dir(project_dir.path(), &["--json", "risk", "database"]);
    assert!(output.status.success());
    let risk = json(&output);
    assert_eq!(risk["score"], serde_json::json!(0.0));
    assert_eq!(risk["breakdown"]["api"], "ok");
}

#[rstest]
fn test_check_passes_on_consistent_manifest(project_dir: TempDir) {
    let output = run_trellis_in_dir(project_dir.path(), &["check"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("satisfied"));
}

#[rstest]
fn test_check_fails_on_violation(temp_dir: TempDir) {
    // The constraint is declared before the dependency states its version.
    write_manifest(
        temp_dir.path(),
        r#"
components:
  - id: api
    depends_on: [database]
    constraints:
      database: "<2.0"
  - id: database
    version: "2.5.0"
"#,
    );
    let output = run_trellis_in_dir(temp_dir.path(), &["--json", "check"]);
    assert!(!output.status.success());
    let report = json(&output);
    assert_eq!(report["compatible"], false);
    assert_eq!(report["violations"][0]["dependent"], "api");
}

#[rstest]
fn test_export_text(project_dir: TempDir) {
    let output = run_trellis_in_dir(project_dir.path(), &["export"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Nodes (3)"));
    assert!(text.contains("api -> database"));
}

// ============================================================================
// Feature and Milestone Commands
// ============================================================================

#[rstest]
fn test_features_impacted_by(project_dir: TempDir) {
    let output = run_trellis_in_dir(project_dir.path(), &["--json", "features", "--impacted-by", "api"]);
    assert!(output.status.success());
    let names: Vec<String> = json(&output)
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["dashboard", "login"]);
}

#[rstest]
fn test_feature_report(project_dir: TempDir) {
    let output = run_trellis_in_dir(project_dir.path(), &["--json", "feature", "dashboard"]);
    assert!(output.status.success());
    let report = json(&output);
    assert_eq!(report["backward_compatible"], true);
    assert_eq!(report["blocking"], serde_json::json!(["login"]));
}

#[rstest]
fn test_milestones_text(project_dir: TempDir) {
    let output = run_trellis_in_dir(project_dir.path(), &["milestones"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("release [PLANNED]  75%"));
}

#[rstest]
fn test_milestone_assessment(project_dir: TempDir) {
    let output = run_trellis_in_dir(project_dir.path(), &["--json", "milestone", "release"]);
    assert!(output.status.success());
    let report = json(&output);
    assert_eq!(report["assessment"]["unresolved_dependencies"], serde_json::json!(["beta"]));
    assert_eq!(report["assessment"]["completion"], serde_json::json!(0.75));
}

#[rstest]
fn test_unknown_milestone(project_dir: TempDir) {
    let output = run_trellis_in_dir(project_dir.path(), &["milestone", "gamma"]);
    assert!(!output.status.success());
}
