use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::{TempDir, tempdir};

const RSPEC_JSON: &str = r#"{
  "examples": [
    {"id": "./spec/models/user_spec.rb[1:1]", "file_path": "./spec/models/user_spec.rb", "run_time": 2.5},
    {"id": "./spec/models/user_spec.rb[1:2]", "file_path": "./spec/models/user_spec.rb", "run_time": 1.8},
    {"id": "./spec/models/post_spec.rb[1:1]", "file_path": "./spec/models/post_spec.rb", "run_time": 5.3},
    {"id": "./spec/models/deleted_spec.rb[1:1]", "file_path": "./spec/models/deleted_spec.rb", "run_time": 9.0}
  ]
}"#;

/// A project with three spec files and one RSpec JSON report.
fn project() -> TempDir {
    let dir = tempdir().unwrap();
    let models = dir.path().join("spec/models");
    fs::create_dir_all(&models).unwrap();
    for name in ["user_spec.rb", "post_spec.rb", "orphan_spec.rb", "user.rb"] {
        fs::write(models.join(name), "").unwrap();
    }
    fs::create_dir_all(dir.path().join("tmp")).unwrap();
    fs::write(dir.path().join("tmp/rspec.json"), RSPEC_JSON).unwrap();
    dir
}

fn split_test(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("split-test").unwrap();
    cmd.current_dir(dir).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_split_prints_node_files() {
    let dir = project();

    split_test(dir.path())
        .args(["split", "--node-index", "0", "--node-total", "2"])
        .args(["--report-path", "tmp/rspec.json"])
        .assert()
        .success()
        .stdout("spec/models/post_spec.rb\n");

    split_test(dir.path())
        .args(["split", "--node-index", "1", "--node-total", "2"])
        .args(["--report-path", "tmp/rspec.json"])
        .assert()
        .success()
        .stdout("spec/models/user_spec.rb\nspec/models/orphan_spec.rb\n");
}

#[test]
fn test_json_path_alias() {
    let dir = project();

    split_test(dir.path())
        .args(["split", "--node-index", "0", "--node-total", "2"])
        .args(["--json-path", "tmp"])
        .assert()
        .success()
        .stdout("spec/models/post_spec.rb\n");
}

#[test]
fn test_split_debug_report_on_stderr() {
    let dir = project();

    split_test(dir.path())
        .args(["split", "--node-index", "0", "--node-total", "2", "--debug"])
        .args(["--report-path", "tmp/rspec.json"])
        .assert()
        .success()
        .stdout("spec/models/post_spec.rb\n")
        .stderr(predicate::str::contains("Test Balancing Debug Info"))
        .stderr(predicate::str::contains("default - no historical data"));
}

#[test]
fn test_split_by_example_threshold() {
    let dir = project();

    split_test(dir.path())
        .args(["split", "--node-index", "0", "--node-total", "1"])
        .args(["--report-path", "tmp/rspec.json"])
        .args(["--split-by-example-threshold", "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("spec/models/user_spec.rb[1:1]"))
        .stdout(predicate::str::contains("spec/models/post_spec.rb[1:1]"))
        .stdout(predicate::str::contains("spec/models/orphan_spec.rb"));
}

#[test]
fn test_no_tests_found_is_success() {
    let dir = tempdir().unwrap();

    split_test(dir.path())
        .args(["split", "--node-index", "0", "--node-total", "2"])
        .assert()
        .success()
        .stdout("")
        .stderr(predicate::str::contains("No test files found"));
}

#[test]
fn test_node_index_out_of_range_fails() {
    let dir = project();

    split_test(dir.path())
        .args(["split", "--node-index", "2", "--node-total", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--node-index 2"));
}

#[test]
fn test_zero_nodes_fails() {
    let dir = project();

    split_test(dir.path())
        .args(["plan", "--node-total", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("node count must be at least 1"));
}

#[test]
fn test_plan_outputs_json() {
    let dir = project();

    let output = split_test(dir.path())
        .args(["plan", "--node-total", "3", "--report-path", "tmp"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(plan["nodes"].as_array().unwrap().len(), 3);
    assert_eq!(plan["timings"]["spec/models/post_spec.rb"], 5.3);
    assert_eq!(plan["defaulted"][0], "spec/models/orphan_spec.rb");
    assert!(plan["timings"].get("spec/models/deleted_spec.rb").is_none());
}

#[test]
fn test_config_file_supplies_settings() {
    let dir = project();
    fs::write(
        dir.path().join("split-test.toml"),
        "[split]\nnode_total = 2\n\n[reports]\npaths = [\"tmp\"]\n",
    )
    .unwrap();

    split_test(dir.path())
        .args(["split", "--node-index", "1"])
        .assert()
        .success()
        .stdout("spec/models/user_spec.rb\nspec/models/orphan_spec.rb\n");
}

#[test]
fn test_validate_config() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("custom.toml");
    fs::write(&config, "[split]\nnode_total = 4\nexample_threshold = 30.0\n").unwrap();

    split_test(dir.path())
        .args(["validate", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid!"))
        .stdout(predicate::str::contains("Node total: 4"))
        .stdout(predicate::str::contains("Example threshold: 30s"));
}

#[test]
fn test_validate_rejects_unknown_field() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("split-test.toml"), "[split]\nnodes = 4\n").unwrap();

    split_test(dir.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_merge_junit() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("node-0.xml"),
        r#"<testsuite name="rspec" tests="2" failures="1" time="3.5"><testcase file="./spec/a_spec.rb" time="3.5"/></testsuite>"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("node-1.xml"),
        r#"<testsuites><testsuite name="rspec" tests="1" time="1.5"><testcase file="./spec/b_spec.rb" time="1.5"/></testsuite></testsuites>"#,
    )
    .unwrap();

    split_test(dir.path())
        .args(["merge-junit", "out/merged.xml", "node-0.xml", "node-1.xml", "node-2.xml"])
        .assert()
        .success();

    let merged = fs::read_to_string(dir.path().join("out/merged.xml")).unwrap();
    assert!(merged.contains(r#"<testsuites tests="3" failures="1" errors="0" skipped="0" time="5.000">"#));
    assert_eq!(merged.matches("<testsuite ").count(), 2);
}

#[test]
fn test_merge_junit_without_inputs_fails() {
    let dir = tempdir().unwrap();

    split_test(dir.path())
        .args(["merge-junit", "merged.xml", "missing.xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no JUnit input files could be read"));
}
