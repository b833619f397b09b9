//! Integration tests for the coalesce binary
//!
//! Runs real replays (wall clock) and config edits against temp files.

mod common;

use anyhow::Result;
use common::write_file;
use tempfile::TempDir;

const BURST: &str = r#"
[[step]]
at_ms = 0
op = "schedule"
key = 1
delay_ms = 150
label = "first tap"

[[step]]
at_ms = 40
op = "schedule"
key = 1
delay_ms = 150
label = "second tap"

[[step]]
at_ms = 0
op = "schedule"
key = "draft"
group = "editor"
delay_ms = 5000
label = "save draft"

[[step]]
at_ms = 60
op = "flush"
key = "draft"
group = "editor"

[[step]]
at_ms = 0
op = "schedule"
key = "stale"
group = "feed"
delay_ms = 100
label = "refresh feed"

[[step]]
at_ms = 20
op = "cancel_group"
group = "feed"
"#;

fn fired_labels(report: &serde_json::Value) -> Vec<String> {
    report["fired"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["label"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_simulate_burst_json() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let script = write_file(temp_dir.path(), "burst.toml", BURST);
    let config = temp_dir.path().join("config.toml");

    let result = coalesce!(
        temp_dir.path(),
        "--config",
        config.to_str().unwrap(),
        "simulate",
        script.to_str().unwrap(),
        "--settle-ms",
        "400",
        "--json"
    )
    .assert_success()?;

    let report = result.json()?;
    assert_eq!(fired_labels(&report), vec!["save draft", "second tap"]);

    let stats = &report["stats"];
    assert_eq!(stats["scheduled"], 4);
    assert_eq!(stats["replaced"], 1);
    assert_eq!(stats["fired"], 1);
    assert_eq!(stats["flushed"], 1);
    assert_eq!(stats["cancelled"], 1);
    assert_eq!(stats["tracked"], 0);

    let causes: Vec<&str> = report["changes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["cause"].as_str().unwrap())
        .collect();
    assert!(causes.contains(&"flushed"));
    assert!(causes.contains(&"cancelled"));
    assert!(result.duration.as_millis() >= 400);
    Ok(())
}

#[test]
fn test_simulate_eviction_uses_config_defaults() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = write_file(
        temp_dir.path(),
        "config.toml",
        "[debounce]\ndefault_delay_ms = 80\ndefault_max_cache_data = 2\n",
    );
    let script = write_file(
        temp_dir.path(),
        "taps.json",
        r#"{"steps": [
            {"at_ms": 0, "op": "schedule", "key": "a"},
            {"at_ms": 5, "op": "schedule", "key": "b"},
            {"at_ms": 10, "op": "schedule", "key": "c"}
        ]}"#,
    );

    let result = coalesce!(
        temp_dir.path(),
        "simulate",
        script.to_str().unwrap(),
        "--settle-ms",
        "400",
        "--json"
    )
    .env("COALESCE_CONFIG", config.to_str().unwrap())
    .assert_success()?;

    let report = result.json()?;
    assert_eq!(fired_labels(&report), vec!["step 1 (b)", "step 2 (c)"]);
    assert_eq!(report["stats"]["evicted"], 1);
    Ok(())
}

#[test]
fn test_simulate_human_output() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let script = write_file(temp_dir.path(), "burst.toml", BURST);
    let config = temp_dir.path().join("config.toml");

    let result = coalesce!(
        temp_dir.path(),
        "--config",
        config.to_str().unwrap(),
        "simulate",
        script.to_str().unwrap(),
        "--settle-ms",
        "300"
    )
    .assert_success()?;

    assert!(result.contains_stdout("Replaying"));
    assert!(result.contains_stdout("second tap"));
    assert!(!result.contains_stdout("first tap"));
    assert!(result.contains_stdout("Summary"));
    Ok(())
}

#[test]
fn test_simulate_prints_ran_after_its_cause() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let script = write_file(temp_dir.path(), "burst.toml", BURST);
    let config = temp_dir.path().join("config.toml");

    let result = coalesce!(
        temp_dir.path(),
        "--config",
        config.to_str().unwrap(),
        "simulate",
        script.to_str().unwrap(),
        "--settle-ms",
        "300"
    )
    .assert_success()?;

    let lines: Vec<&str> = result.stdout.lines().collect();
    let position = |pred: &dyn Fn(&str) -> bool| lines.iter().position(|l| pred(l));

    let flushed = position(&|l| l.contains("flushed") && l.contains("editor_draft")).unwrap();
    let ran_draft = position(&|l| l.contains("save draft")).unwrap();
    assert!(flushed < ran_draft, "stdout:\n{}", result.stdout);

    let fired = position(&|l| l.contains("fired") && l.contains("default_1")).unwrap();
    let ran_tap = position(&|l| l.contains("second tap")).unwrap();
    assert!(fired < ran_tap, "stdout:\n{}", result.stdout);
    Ok(())
}

#[test]
fn test_simulate_rejects_invalid_script() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let script = write_file(temp_dir.path(), "bad.toml", "[[step]]\nat_ms = 0\nop = \"cancel\"\n");
    let config = temp_dir.path().join("config.toml");

    let result = coalesce!(
        temp_dir.path(),
        "--config",
        config.to_str().unwrap(),
        "simulate",
        script.to_str().unwrap()
    )
    .assert_failure()?;

    assert!(result.contains_stderr("requires a key"));
    Ok(())
}

#[test]
fn test_config_set_then_get() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = temp_dir.path().join("nested/config.toml");
    let config = config.to_str().unwrap();

    coalesce!(temp_dir.path(), "--config", config, "config", "set", "debounce.default_delay_ms", "250")
        .assert_success()?;

    let result = coalesce!(temp_dir.path(), "--config", config, "config", "get", "debounce.default_delay_ms")
        .assert_success()?;
    assert_eq!(result.stdout.trim(), "250");

    let result = coalesce!(temp_dir.path(), "--config", config, "config", "list").assert_success()?;
    assert!(result.contains_stdout("default_group"));
    Ok(())
}

#[test]
fn test_config_rejects_invalid_values() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = temp_dir.path().join("config.toml");
    let config_str = config.to_str().unwrap();

    coalesce!(temp_dir.path(), "--config", config_str, "config", "set", "debounce.default_group", "")
        .assert_failure()?;
    coalesce!(temp_dir.path(), "--config", config_str, "config", "get", "debounce.unknown")
        .assert_failure()?;

    assert!(!config.exists());
    Ok(())
}
