use ctrepo_guard::integrity_hash;
use std::process::{Command, Output};

fn data_path(file_name: &str) -> String {
    format!("{}/tests/data/{file_name}", env!("CARGO_MANIFEST_DIR"))
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ctrepo-guard"))
        .args(args)
        .output()
        .expect("failed to run ctrepo-guard")
}

#[test]
fn test_validate_accepts_valid_protocol() {
    let root = tempfile::tempdir().unwrap();
    let output = run(&[
        "validate",
        &data_path("protocol_v1.yaml"),
        "--repo",
        "nsclc",
        "--repo-root",
        root.path().to_str().unwrap(),
    ]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stdout: {stdout}");
    assert!(stdout.contains("Protocol validation passed for BST-NSCLC-002"));
    assert!(stdout.contains("No breaking changes detected."));
}

#[test]
fn test_validate_rejects_missing_id() {
    let root = tempfile::tempdir().unwrap();
    let output = run(&[
        "validate",
        &data_path("protocol_missing_id.yaml"),
        "--repo",
        "nsclc",
        "--repo-root",
        root.path().to_str().unwrap(),
        "--schema",
        &data_path("minimal.schema.json"),
    ]);

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout).to_lowercase();
    assert!(stdout.contains("validation failed"), "stdout: {stdout}");
}

#[test]
fn test_validate_json_output() {
    let root = tempfile::tempdir().unwrap();
    let output = run(&[
        "validate",
        &data_path("protocol_v1.yaml"),
        "--repo",
        "nsclc",
        "--repo-root",
        root.path().to_str().unwrap(),
        "--format",
        "json",
    ]);

    assert!(output.status.success());
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["valid"], true);
    assert_eq!(result["breaking_changes"], serde_json::json!([]));
}

#[test]
fn test_hash_command_matches_library() {
    let path = data_path("protocol_v1.yaml");
    let output = run(&["hash", &path]);

    assert!(output.status.success());
    let expected = integrity_hash(&std::fs::read_to_string(&path).unwrap());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), expected);
}

#[test]
fn test_breaking_command() {
    let output = run(&[
        "breaking",
        &data_path("protocol_v1.yaml"),
        &data_path("protocol_v2_enrollment.yaml"),
    ]);

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[POPULATION_SAME_TARGET_SIZE]"));

    let output = run(&[
        "breaking",
        &data_path("protocol_v1.yaml"),
        &data_path("protocol_v2_reordered.yaml"),
    ]);
    assert!(output.status.success());
}
