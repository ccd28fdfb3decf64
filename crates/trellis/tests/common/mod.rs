//! Common test utilities shared across integration tests.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// A small system exercising components, features and milestones.
pub const SAMPLE_MANIFEST: &str = r#"
components:
  - id: database
    version: "1.4.0"
    state: UP
  - id: api
    version: "2.0.0"
    depends_on: [database]
    constraints:
      database: ">=1.0,<2.0"
  - id: frontend
    version: "0.9.0"
    depends_on: [api]
features:
  - name: storage
    component: database
    status: COMPLETED
  - name: login
    component: api
    status: IN_PROGRESS
    depends_on: [storage]
  - name: dashboard
    component: frontend
    depends_on: [login]
milestones:
  - name: alpha
    components: [database]
    status: COMPLETED
  - name: beta
    components: [api]
    status: IN_PROGRESS
  - name: release
    components: [frontend]
    depends_on: [alpha, beta]
"#;

/// Path of the trellis binary built for this test run
pub fn trellis_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_trellis"))
}

/// Write `content` as `trellis.yaml` in `dir`
pub fn write_manifest(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("trellis.yaml");
    std::fs::write(&path, content).expect("Failed to write manifest");
    path
}

/// Run the trellis binary in the specified directory
pub fn run_trellis_in_dir(dir: &Path, args: &[&str]) -> Output {
    Command::new(trellis_binary())
        .args(args)
        .current_dir(dir)
        .env_remove("TRELLIS_MANIFEST")
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to execute trellis binary")
}
