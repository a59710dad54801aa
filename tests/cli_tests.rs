//! End-to-end tests driving the `lims-liquid` binary.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn cmd() -> Command {
    Command::cargo_bin("lims-liquid").unwrap()
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

/// Files in `dir` whose names start with `prefix`
fn find(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(prefix))
        })
        .collect();
    found.sort();
    found
}

const POOL_SNAPSHOT: &str = r#"{
  "process": {"id": "24-77", "name": "Pooling", "technician": "Jane Doe"},
  "transfers": [
    {
      "input": {"id": "in-S1", "name": "S1", "sample_name": "S1", "container": "Libraries", "well": "A:1",
                "udf": {"Concentration": 5.0, "Volume (ul)": 30.0}},
      "output": {"id": "pool-1", "name": "Pool, A", "container": "Pools", "well": "A:1",
                 "udf": {"Pool Conc. (nM)": 5.0, "Final Volume (uL)": 20.0}}
    },
    {
      "input": {"id": "in-S2", "name": "S2", "sample_name": "S2", "container": "Libraries", "well": "B:1",
                "udf": {"Concentration": 50.0, "Volume (ul)": 30.0}},
      "output": {"id": "pool-1", "name": "Pool, A", "container": "Pools", "well": "A:1",
                 "udf": {"Pool Conc. (nM)": 5.0, "Final Volume (uL)": 20.0}}
    }
  ]
}"#;

const MANIFEST_SNAPSHOT: &str = r#"{
  "process": {"id": "24-1234", "name": "Load to Flowcell (AVITI)", "technician": "Jane Doe"},
  "lane_pools": [
    {
      "id": "2-1", "name": "Pool 1", "container": "FC12345", "location": "1:1",
      "udf": {"% phiX": 1.0, "Element PhiX Set": "PhiX Control Library, Adept"},
      "samples": [
        {"name": "P1_101", "label": "ACGTACGTAC-TTTTGGGGCC", "project": "J.Doe_24.01",
         "project_udf": {"Sequencing setup": "151-10-10-151"}},
        {"name": "P1_102", "label": "TTGGCCAAGG-CCCCAAAATT", "project": "J.Doe_24.01",
         "project_udf": {"Sequencing setup": "151-10-10-151"}}
      ]
    }
  ]
}"#;

const NORM_SHEET: &str = "sample_name,src_plate,src_well,dst_plate,dst_well,conc,vol,target_amt,target_vol\n\
                          S1,Src,B:1,Dst,A:1,50,30,100,20\n\
                          S2,Src,C:1,Dst,B:1,10,30,100,20\n";

const SINGLE_SAMPLE_SHEET: &str = "sample_name,src_plate,src_well,dst_plate,dst_well,conc,vol,target_amt,target_vol\n\
                                   S1,Src,B:1,Dst,A:1,50,30,100,20\n";

/// Destination wells holding the 20 ul targets of the sheets above
const WIDE_WELLS_CONFIG: &str = r#"{"norm": {"well_max_vol": 20.0}}"#;

#[test]
fn test_help() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("manifest"))
        .stdout(predicate::str::contains("check-indices"));
}

#[test]
fn test_norm_requires_an_input() {
    cmd().arg("norm").assert().failure();
}

#[test]
fn test_check_indices_clean() {
    let dir = tempdir().unwrap();
    let csv = write(
        dir.path(),
        "indices.csv",
        "SampleName,Index1,Index2\nS1,ACGTACGT,TTGGCCAA\nS2,GGTTAACC,AACCTTGG\n",
    );

    cmd()
        .arg("check-indices")
        .arg(&csv)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("No index collisions found."));
}

#[test]
fn test_check_indices_near_collision_json() {
    let dir = tempdir().unwrap();
    let csv = write(
        dir.path(),
        "indices.csv",
        "SampleName,Index1,Index2\nS1,ACGTACGT,TTGGCCAA\nS2,ACGTACGA,TTGGCCAA\n",
    );

    let output = cmd()
        .args(["check-indices", "--format", "json"])
        .arg(&csv)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let collisions = json["collisions"].as_array().unwrap();
    assert_eq!(collisions.len(), 1);
    assert_eq!(collisions[0]["distance"], 1);
    assert_eq!(collisions[0]["sample_a"], "S1");
}

#[test]
fn test_check_indices_lanes_are_independent() {
    let dir = tempdir().unwrap();
    let csv = write(
        dir.path(),
        "indices.csv",
        "SampleName,Index1,Index2,Lane\nS1,ACGTACGT,TTGGCCAA,1\nS2,ACGTACGT,TTGGCCAA,2\n",
    );

    cmd().arg("check-indices").arg(&csv).assert().code(0);
}

#[test]
fn test_check_indices_identical_fails() {
    let dir = tempdir().unwrap();
    let csv = write(
        dir.path(),
        "indices.csv",
        "SampleName,Index1,Index2\nS1,ACGTACGT,TTGGCCAA\nS2,ACGTACGT,TTGGCCAA\n",
    );

    cmd()
        .arg("check-indices")
        .arg(&csv)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Identical indices detected between S1 and S2"));
}

#[test]
fn test_norm_local_data() {
    let dir = tempdir().unwrap();
    let sheet = write(dir.path(), "samples.csv", NORM_SHEET);
    let config = write(dir.path(), "run.json", WIDE_WELLS_CONFIG);
    let out = dir.path().join("out");

    cmd()
        .args(["norm", "--local-data"])
        .arg(&sheet)
        .arg("--config")
        .arg(&config)
        .arg("--out-dir")
        .arg(&out)
        .assert()
        .code(0);

    let worklists = find(&out, "zika_worklist_norm_local_");
    assert_eq!(worklists.len(), 1);
    let text = fs::read_to_string(&worklists[0]).unwrap();
    assert!(text.contains("COMMENT, This worklist will enact normalization of 2 samples"));
    assert!(text.contains("COMMENT, Set up layout:    [Empty]     buffer_plate     Src     Dst     [Empty]"));
    assert!(text.ends_with("COMMENT, Done"));

    let logs = find(&out, "zika_log_norm_local_");
    assert_eq!(logs.len(), 1);

    // Nothing is written back or uploaded without a LIMS
    assert!(!out.join("udf_updates.json").exists());
    assert!(!out.join("uploads").exists());
}

#[test]
fn test_norm_local_data_multi_aspirate_toggle() {
    let dir = tempdir().unwrap();
    let sheet = write(dir.path(), "samples.csv", SINGLE_SAMPLE_SHEET);
    let config = write(dir.path(), "run.json", WIDE_WELLS_CONFIG);

    for (flags, out, expected) in [
        (vec![], "default", true),
        (vec!["--no-multi-aspirate"], "off", false),
    ] {
        let out = dir.path().join(out);
        cmd()
            .arg("norm")
            .args(flags)
            .arg("--local-data")
            .arg(&sheet)
            .arg("--config")
            .arg(&config)
            .arg("--out-dir")
            .arg(&out)
            .assert()
            .code(0);

        let text = fs::read_to_string(&find(&out, "zika_worklist_norm_")[0]).unwrap();
        assert_eq!(text.contains("MULTI_ASPIRATE,2,1,2,1,3000"), expected);
    }
}

#[test]
fn test_norm_target_volume_over_well_capacity_fails() {
    let dir = tempdir().unwrap();
    let sheet = write(dir.path(), "samples.csv", SINGLE_SAMPLE_SHEET);
    let out = dir.path().join("out");

    cmd()
        .args(["norm", "--local-data"])
        .arg(&sheet)
        .arg("--out-dir")
        .arg(&out)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("The target volume of S1 must be >0 - 15 ul, got 20 ul"));

    assert!(find(&out, "zika_worklist_norm_").is_empty());
}

#[test]
fn test_pool_snapshot() {
    let dir = tempdir().unwrap();
    let snapshot = write(dir.path(), "step.json", POOL_SNAPSHOT);
    let out = dir.path().join("out");

    cmd()
        .args(["pool", "--snapshot"])
        .arg(&snapshot)
        .arg("--out-dir")
        .arg(&out)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("zika_worklist_pool_24-77_"));

    let text = fs::read_to_string(&find(&out, "zika_worklist_pool_24-77_")[0]).unwrap();
    assert!(text.contains("COPY,2,1,1,1,3,1,1,5000,[VAR1]"));

    let updates: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("udf_updates.json")).unwrap()).unwrap();
    assert_eq!(updates["pool-1"]["Final Volume (uL)"], 20.0);

    assert_eq!(find(&out.join("uploads").join("Mosquito CSV File"), "zika_worklist_").len(), 1);
    assert_eq!(find(&out.join("uploads").join("Mosquito Log"), "zika_log_").len(), 1);
}

#[test]
fn test_pool_failure_still_uploads_log() {
    let dir = tempdir().unwrap();
    let snapshot = write(dir.path(), "step.json", POOL_SNAPSHOT);

    cmd()
        .args(["pool", "--well-max-vol", "10", "--snapshot"])
        .arg(&snapshot)
        .arg("--out-dir")
        .arg(dir.path())
        .assert()
        .code(1);

    assert!(find(dir.path(), "zika_worklist_").is_empty());
    let logs = find(&dir.path().join("uploads").join("Mosquito Log"), "zika_log_pool_24-77_");
    assert_eq!(logs.len(), 1);
    assert!(fs::read_to_string(&logs[0]).unwrap().contains("ERROR:"));
}

#[test]
fn test_manifest_snapshot_json_report() {
    let dir = tempdir().unwrap();
    let snapshot = write(dir.path(), "step.json", MANIFEST_SNAPSHOT);

    let output = cmd()
        .args(["manifest", "--format", "json", "--snapshot"])
        .arg(&snapshot)
        .arg("--out-dir")
        .arg(dir.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let archive = report["outputs"][0].as_str().unwrap();
    assert!(archive.contains("AVITI_run_manifest_FC12345_24-1234_"));
    assert!(archive.ends_with("_JaneDoe.zip"));
    assert!(Path::new(archive).exists());

    let uploads = dir.path().join("uploads");
    assert_eq!(find(&uploads.join("AVITI Run Manifest"), "AVITI_run_manifest_FC12345").len(), 1);
    assert_eq!(find(&uploads.join("AVITI Run Manifest Log"), "AVITI_run_manifest_24-1234_").len(), 1);
}

#[test]
fn test_manifest_custom_slots() {
    let dir = tempdir().unwrap();
    let snapshot = write(dir.path(), "step.json", MANIFEST_SNAPSHOT);

    cmd()
        .args(["manifest", "--file", "Manifest", "--log", "Manifest Log", "--snapshot"])
        .arg(&snapshot)
        .arg("--out-dir")
        .arg(dir.path())
        .assert()
        .code(0);

    assert!(dir.path().join("uploads").join("Manifest").is_dir());
    assert!(dir.path().join("uploads").join("Manifest Log").is_dir());
}
