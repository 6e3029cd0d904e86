//! Integration tests for the claimaudit CLI

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn claimaudit_cmd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("claimaudit").unwrap();
    cmd.current_dir(dir).env("RUST_LOG", "warn");
    cmd
}

fn history_lines() -> String {
    (0..40)
        .map(|i| {
            json!({
                "claim_id": format!("H-{i}"),
                "member_id": format!("HM-{i}"),
                "provider_id": "P-1",
                "date_of_service": "2023-11-02",
                "procedure_code": "99213",
                "charge_amount": 100 + i,
            })
            .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn claims_json() -> String {
    json!([
        {
            "claim_id": "A-1",
            "member_id": "M-1",
            "provider_id": "P-1",
            "date_of_service": "2024-02-10",
            "procedure_code": "99213",
            "charge_amount": "$2,000.00",
            "created_at": "2024-02-12T08:00:00Z"
        },
        {
            "claim_id": "A-2",
            "member_id": "M-2",
            "provider_id": "P-1",
            "date_of_service": "2024-02-10",
            "procedure_code": "99213",
            "charge_amount": 118,
            "created_at": "2024-02-12T08:00:00Z"
        },
        {
            "claim_id": "A-3",
            "member_id": "M-3",
            "provider_id": "P-1",
            "date_of_service": "2024-02-10",
            "charge_amount": 90
        }
    ])
    .to_string()
}

fn write_inputs(dir: &Path) {
    fs::write(dir.join("history.jsonl"), history_lines()).unwrap();
    fs::write(dir.join("claims.json"), claims_json()).unwrap();
}

#[test]
fn print_default_config_emits_yaml() {
    let dir = tempdir().unwrap();
    claimaudit_cmd(dir.path())
        .arg("print-default-config")
        .assert()
        .success()
        .stdout(predicate::str::contains("outlier_zscore_threshold: 3.0"))
        .stdout(predicate::str::contains("duplicate_lookback_days: 30"));
}

#[test]
fn validate_config_accepts_valid_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit.yml");
    fs::write(&path, "outlier_zscore_threshold: 2.5\nanomaly_weight: 0.2\n").unwrap();

    claimaudit_cmd(dir.path())
        .args(["validate-config", "audit.yml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration file is valid"));
}

#[test]
fn validate_config_rejects_out_of_range_values() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("audit.yml"),
        "outlier_zscore_threshold: -1.0\n",
    )
    .unwrap();

    claimaudit_cmd(dir.path())
        .args(["validate-config", "audit.yml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("outlier_zscore_threshold"));
}

#[test]
fn build_baseline_then_audit_writes_report() {
    let dir = tempdir().unwrap();
    write_inputs(dir.path());

    claimaudit_cmd(dir.path())
        .args([
            "build-baseline",
            "--history",
            "history.jsonl",
            "--out",
            "baseline.json",
        ])
        .assert()
        .success();

    let baseline: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("baseline.json")).unwrap())
            .unwrap();
    assert_eq!(baseline["version"], 1);
    assert_eq!(baseline["stats"]["99213"]["sample_count"], 40);

    claimaudit_cmd(dir.path())
        .args([
            "audit",
            "--claims",
            "claims.json",
            "--baseline",
            "baseline.json",
            "--out",
            "reports/session.json",
        ])
        .assert()
        .success();

    let report: Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("reports/session.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(report["status"], "complete");
    assert_eq!(report["results"].as_array().unwrap().len(), 2);
    assert_eq!(report["results"][0]["claim_id"], "A-1");
    assert_eq!(report["results"][0]["issues"][0]["rule_id"], "price_outlier");
    assert_eq!(
        report["results"][0]["recommended_action"],
        "Request medical records"
    );
    assert_eq!(report["results"][1]["recommended_action"], "No action");

    let failures = report["ingestion_failures"].as_array().unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0]["position"], 2);
    assert_eq!(failures[0]["field"], "procedure_code");
}

#[test]
fn audit_prints_yaml_report_to_stdout() {
    let dir = tempdir().unwrap();
    write_inputs(dir.path());

    claimaudit_cmd(dir.path())
        .args([
            "audit",
            "--claims",
            "claims.json",
            "--history",
            "history.jsonl",
            "--format",
            "yaml",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("claim_id: A-1"))
        .stdout(predicate::str::contains("rule_id: price_outlier"));
}

#[test]
fn fail_on_flagged_sets_exit_status() {
    let dir = tempdir().unwrap();
    write_inputs(dir.path());

    claimaudit_cmd(dir.path())
        .args([
            "audit",
            "--claims",
            "claims.json",
            "--history",
            "history.jsonl",
            "--fail-on-flagged",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("need follow-up"));
}

#[test]
fn local_config_file_is_picked_up() {
    let dir = tempdir().unwrap();
    write_inputs(dir.path());
    // a threshold this high makes the 2000.00 charge unremarkable
    fs::write(
        dir.path().join(".claimaudit.yml"),
        "outlier_zscore_threshold: 500.0\nprice_outlier:\n  critical_deviation: 600.0\n",
    )
    .unwrap();

    claimaudit_cmd(dir.path())
        .args([
            "audit",
            "--claims",
            "claims.json",
            "--history",
            "history.jsonl",
            "--fail-on-flagged",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("price_outlier").not());
}

#[test]
fn csv_upload_is_audited() {
    let dir = tempdir().unwrap();
    write_inputs(dir.path());
    fs::write(
        dir.path().join("upload.csv"),
        "claim_id,member_id,provider_id,date_of_service,cpt_code,charge_amount\n\
         U-1,M-1,P-1,2024-02-10,99213,\"$2,000.00\"\n\
         U-2,M-2,P-1,2024-02-10,99213,118\n",
    )
    .unwrap();

    claimaudit_cmd(dir.path())
        .args([
            "audit",
            "--claims",
            "upload.csv",
            "--history",
            "history.jsonl",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"claim_id\": \"U-1\""))
        .stdout(predicate::str::contains("price_outlier"));
}

#[test]
fn csv_upload_missing_columns_fails() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("upload.csv"), "claim_id,member_id\nU-1,M-1\n").unwrap();

    claimaudit_cmd(dir.path())
        .args(["audit", "--claims", "upload.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing required columns"));
}

#[test]
fn missing_claims_file_fails() {
    let dir = tempdir().unwrap();
    claimaudit_cmd(dir.path())
        .args(["audit", "--claims", "nope.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load claims"));
}
