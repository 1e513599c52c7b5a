//! Integration tests for the cloudtrim binary.
//!
//! These tests run the compiled CLI against snapshot files in a temporary
//! directory, so no cloud account or network access is needed.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::tempdir;

const SNAPSHOT: &str = r#"
instances:
  - instance_id: i-0idle
    instance_type: t2.small
    state: running
    cpu_daily_averages: [3.0, 4.0, 5.0]
  - instance_id: i-0off
    instance_type: m5.large
    state: stopped
buckets:
  - name: app-logs
prices:
  - instance_type: t2.small
    location: US East (N. Virginia)
    usd_per_hour: 0.023
"#;

fn cloudtrim(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cloudtrim"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("CLOUDTRIM_REGION")
        .env_remove("CLOUDTRIM_SNAPSHOT")
        .env_remove("CLOUDTRIM_CONFIG")
        .env_remove("CLOUDTRIM_CACHE_DIR")
        .env_remove("CLOUDTRIM_PRICE_ENDPOINT")
        .env_remove("CLOUDTRIM_PRICE_API_KEY")
        .output()
        .expect("failed to run cloudtrim")
}

/// Test the JSON response of an analysis run.
#[test]
fn test_analyze_json() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("inventory.yaml"), SNAPSHOT).unwrap();

    let output = cloudtrim(
        dir.path(),
        &["-q", "analyze", "--snapshot", "inventory.yaml", "--no-cache", "--json"],
    );
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let response: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let resources = response["resources"].as_array().unwrap();
    assert_eq!(resources.len(), 3);
    assert_eq!(resources[0]["id"], "i-0idle");
    assert_eq!(resources[2]["type"], "S3");

    let recommendations = response["recommendations"].as_array().unwrap();
    assert_eq!(recommendations.len(), 6);
    assert_eq!(
        recommendations[0],
        "Downsize t2.small (i-0idle) to t2.micro (current CPU: 4.0%, saves $8.32/month)"
    );
    assert_eq!(
        recommendations[1],
        "Terminate stopped instance i-0off (saves $70.08/month)"
    );
    assert_eq!(response["estimated_savings"], 78.4);
}

/// Test the human-readable report.
#[test]
fn test_analyze_report() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("inventory.yaml"), SNAPSHOT).unwrap();

    let output = cloudtrim(dir.path(), &["analyze", "-s", "inventory.yaml", "--no-cache"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Cost analysis for us-east-1 (3 resources)"));
    assert!(stdout.contains("Review unattached EBS volumes"));
    assert!(stdout.contains("Estimated monthly savings: $78.40"));
}

/// Test that results are cached on disk and the cache can be cleared.
#[test]
fn test_analyze_cache_and_clear() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("inventory.yaml"), SNAPSHOT).unwrap();

    let output = cloudtrim(
        dir.path(),
        &["analyze", "-s", "inventory.yaml", "--cache-dir", "cache", "--json"],
    );
    assert!(output.status.success());
    assert_eq!(fs::read_dir(dir.path().join("cache")).unwrap().count(), 1);

    let output = cloudtrim(dir.path(), &["cache", "clear", "--cache-dir", "cache"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Removed 1 cached result(s)"));
    assert_eq!(fs::read_dir(dir.path().join("cache")).unwrap().count(), 0);
}

/// Test that cached results are tied to the snapshot they came from.
#[test]
fn test_cache_is_scoped_to_snapshot() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.yaml"), SNAPSHOT).unwrap();
    fs::write(dir.path().join("b.yaml"), "instances: []\n").unwrap();

    let run = |snapshot: &str| -> serde_json::Value {
        let output = cloudtrim(
            dir.path(),
            &["-q", "analyze", "-s", snapshot, "--cache-dir", "cache", "--json"],
        );
        assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
        serde_json::from_slice(&output.stdout).unwrap()
    };

    let a = run("a.yaml");
    assert_eq!(a["resources"].as_array().unwrap().len(), 3);

    let b = run("b.yaml");
    assert!(b["resources"].as_array().unwrap().is_empty());
    assert_eq!(b["estimated_savings"], 0.0);

    // Rewriting a snapshot in place invalidates its cached result too.
    fs::write(dir.path().join("a.yaml"), "instances: []\n").unwrap();
    let edited = run("a.yaml");
    assert!(edited["resources"].as_array().unwrap().is_empty());

    assert_eq!(fs::read_dir(dir.path().join("cache")).unwrap().count(), 3);
}

/// Test that clearing the cache leaves unrelated files alone.
#[test]
fn test_cache_clear_keeps_other_files() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("inventory.json"), r#"{"instances": []}"#).unwrap();

    let output = cloudtrim(
        dir.path(),
        &["analyze", "-s", "inventory.json", "--cache-dir", ".", "--json"],
    );
    assert!(output.status.success());

    let output = cloudtrim(dir.path(), &["cache", "clear", "--cache-dir", "."]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Removed 1 cached result(s)"));
    assert!(dir.path().join("inventory.json").exists());
}

/// Test the price command against snapshot prices and the reference table.
#[test]
fn test_price() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("inventory.yaml"), SNAPSHOT).unwrap();

    let output = cloudtrim(
        dir.path(),
        &["price", "--subtype", "t2.small", "--snapshot", "inventory.yaml", "--json"],
    );
    assert!(output.status.success());
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["hourly"], 0.023);
    assert_eq!(body["source"], "catalog");
    assert_eq!(body["location"], "US East (N. Virginia)");

    let output = cloudtrim(dir.path(), &["price", "--subtype", "m5.large", "--json"]);
    assert!(output.status.success());
    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["hourly"], 0.096);
    assert!(body["source"].as_str().unwrap().starts_with("reference table"));
}

/// Test exit code 2 for a missing snapshot.
#[test]
fn test_missing_snapshot_is_invalid_input() {
    let dir = tempdir().unwrap();

    let output = cloudtrim(dir.path(), &["analyze", "-s", "missing.yaml", "--no-cache"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to load snapshot"));
}

/// Test exit code 2 for an invalid configuration file.
#[test]
fn test_invalid_config_is_invalid_input() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("inventory.yaml"), SNAPSHOT).unwrap();
    fs::write(
        dir.path().join("cloudtrim.toml"),
        "[rules]\nunderutilized_below = 90\noverutilized_above = 10\n",
    )
    .unwrap();

    let output = cloudtrim(
        dir.path(),
        &["analyze", "-s", "inventory.yaml", "-c", "cloudtrim.toml", "--no-cache"],
    );
    assert_eq!(output.status.code(), Some(2));
}

/// Test that a custom config changes the analysis.
#[test]
fn test_config_overrides_rules() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("inventory.yaml"), SNAPSHOT).unwrap();
    fs::write(
        dir.path().join("cloudtrim.yaml"),
        "rules:\n  negative_savings: suppress\n  downsize: {}\n",
    )
    .unwrap();

    let output = cloudtrim(
        dir.path(),
        &["-q", "analyze", "-s", "inventory.yaml", "-c", "cloudtrim.yaml", "--no-cache", "--json"],
    );
    assert!(output.status.success());

    let response: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    // Without a downsize table only the termination and the general advisories remain.
    assert_eq!(response["recommendations"].as_array().unwrap().len(), 5);
    assert_eq!(response["estimated_savings"], 70.08);
}
