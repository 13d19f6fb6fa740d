#![cfg(feature = "http")]

use std::process::Command;

fn out_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("rfhydrate-{}-{}.html", name, std::process::id()))
}

#[test]
fn cli_hydrates_offline_dump() {
    let output = out_path("toppage");
    let report = out_path("report");
    let status = Command::new(env!("CARGO_BIN_EXE_rfhydrate"))
        .args(["tests/fixtures/pages/index.html", "-s", "toppage"])
        .args(["--content-dir", "tests/fixtures/content"])
        .arg("--output")
        .arg(&output)
        .arg("--report")
        .arg(&report)
        .env_remove("MICROCMS_API_KEY")
        .status()
        .expect("run rfhydrate");
    assert!(status.success());

    let html = std::fs::read_to_string(&output).expect("read output");
    let _ = std::fs::remove_file(&output);
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("その人らしい毎日を"));
    assert!(html.contains("安心のサポート体制"));
    assert!(!html.contains("私たちの想い"));

    let json = std::fs::read_to_string(&report).expect("read report");
    let _ = std::fs::remove_file(&report);
    let reports: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(reports[0]["section"], "toppage");
    assert_eq!(reports[0]["outcome"], "hydrated");
    assert_eq!(reports[0]["cards"], 3);
}

#[test]
fn cli_requires_api_key_online() {
    let result = Command::new(env!("CARGO_BIN_EXE_rfhydrate"))
        .args(["tests/fixtures/pages/index.html", "-s", "toppage"])
        .env_remove("MICROCMS_API_KEY")
        .output()
        .expect("run rfhydrate");
    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("API key"));
}

#[test]
fn cli_rejects_unknown_section() {
    let result = Command::new(env!("CARGO_BIN_EXE_rfhydrate"))
        .args(["tests/fixtures/pages/index.html", "-s", "news"])
        .args(["--content-dir", "tests/fixtures/content"])
        .output()
        .expect("run rfhydrate");
    assert!(!result.status.success());
}
