use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

/// Check if bytes are a valid PNG
fn is_valid_png(bytes: &[u8]) -> bool {
    bytes.len() > 8 && bytes[0..8] == [137, 80, 78, 71, 13, 10, 26, 10]
}

fn tabgraph() -> Command {
    Command::cargo_bin("tabgraph").expect("binary should build")
}

#[test]
fn test_end_to_end_line_chart_to_stdout() {
    let output = tabgraph()
        .args(["test/header_row_2.csv", "--header-row", "2", "-x", "t", "-y", "v"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(is_valid_png(&output.stdout), "Output is not a valid PNG");
}

#[test]
fn test_end_to_end_writes_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.png");
    tabgraph()
        .args(["test/distribution.csv", "--header-row", "0", "-x", "a", "-y", "a", "-y", "b"])
        .args(["--plot-type", "Histogram", "--output"])
        .arg(&path)
        .assert()
        .success();
    let bytes = fs::read(&path).unwrap();
    assert!(is_valid_png(&bytes));
}

#[test]
fn test_end_to_end_data_uri() {
    tabgraph()
        .args(["test/european.csv", "--header-row", "0", "-x", "region", "-y", "q1", "-y", "q2"])
        .args(["--plot-type", "bar", "--data-uri"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("<a href=\"data:file/png;base64,"))
        .stdout(predicate::str::contains("download=\"graph.png\""));
}

#[test]
fn test_end_to_end_reports_failed_attempts() {
    tabgraph()
        .args(["test/european.csv", "--header-row", "0", "--preview"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Failed to load with encoding utf-8 and delimiter ','"))
        .stdout(predicate::str::contains("\"q1\""))
        .stdout(predicate::str::contains("\"1.5\""));
}

#[test]
fn test_end_to_end_lists_every_attempt_when_all_fail() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("short.csv");
    fs::write(&path, "a,b\n1,2\n").unwrap();
    let output = tabgraph()
        .arg(&path)
        .args(["--header-row", "5", "-x", "a", "-y", "b"])
        .output()
        .unwrap();
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    let listed = stderr
        .lines()
        .filter(|l| l.starts_with("Failed to load with encoding "))
        .count();
    assert_eq!(listed, 16, "stderr: {}", stderr);
    assert!(stderr.contains("Failed to load with encoding unicode_escape and delimiter '|'"));
    assert!(stderr.contains("16 attempts failed"));
}

#[test]
fn test_end_to_end_preview_only() {
    let output = tabgraph()
        .args(["test/header_row_2.csv", "--header-row", "2", "--preview"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let preview: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(preview["columns"], serde_json::json!(["t", "v"]));
    assert_eq!(preview["total_rows"], 3);
}

#[test]
fn test_end_to_end_spreadsheet() {
    tabgraph()
        .args(["test/report.xlsx", "--header-row", "1", "-x", "time", "-y", "reading"])
        .args(["--plot-type", "Scatter Plot", "--data-uri"])
        .assert()
        .success()
        .stdout(predicate::str::contains("data:file/png;base64,"));
}

#[test]
fn test_end_to_end_scatter3d_arity_error() {
    tabgraph()
        .args(["test/distribution.csv", "--header-row", "0", "-x", "a", "-y", "b"])
        .args(["--plot-type", "3D Scatter Plot"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("exactly two columns for X Axis"));
}

#[test]
fn test_end_to_end_missing_selection() {
    tabgraph()
        .args(["test/distribution.csv", "--header-row", "0", "-y", "b"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Please select at least one column"));
}

#[test]
fn test_end_to_end_unknown_plot_type() {
    tabgraph()
        .args(["test/distribution.csv", "-x", "a", "-y", "b", "--plot-type", "pie"])
        .assert()
        .failure();
}

#[test]
fn test_end_to_end_header_row_out_of_range() {
    tabgraph()
        .args(["test/distribution.csv", "--header-row", "101", "-x", "a", "-y", "b"])
        .assert()
        .failure();
}

#[test]
fn test_end_to_end_unsupported_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.txt");
    fs::write(&path, "a,b\n1,2\n").unwrap();
    tabgraph()
        .arg(&path)
        .args(["--header-row", "0", "-x", "a", "-y", "b"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported file type"));
}

#[test]
fn test_end_to_end_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");
    fs::write(&config, r#"{"header_row": 2, "render": {"width": 400, "height": 300}}"#).unwrap();
    let output = tabgraph()
        .args(["test/header_row_2.csv", "-x", "t", "-y", "v", "--config"])
        .arg(&config)
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let image = image::load_from_memory(&output.stdout).unwrap();
    assert_eq!((image.width(), image.height()), (400, 300));
}
