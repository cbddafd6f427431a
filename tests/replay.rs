//! End-to-end replay tests.
//!
//! Scripts under `tests/fixtures/` are replayed through the library and
//! through the `tuginspect` binary.

use std::path::PathBuf;
use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

use tuginspect::config::InspectionConfig;
use tuginspect::output::SCHEMA_VERSION;
use tuginspect::replay::{run_script, ReplayFrame, ReplayScript};

// ============================================================================
// Test Infrastructure
// ============================================================================

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_tuginspect"))
}

async fn replay(name: &str) -> Vec<ReplayFrame> {
    let script = ReplayScript::load(&fixture(name)).expect("fixture parses");
    run_script(&script, &InspectionConfig::default())
        .await
        .expect("replay runs")
}

const SHOP: &str = "src/Shop.java";

fn diagnostics(frame: &ReplayFrame) -> Vec<(u32, String)> {
    frame
        .surface
        .documents
        .get(SHOP)
        .map(|view| view.diagnostics.clone())
        .unwrap_or_default()
}

// ============================================================================
// Library replay
// ============================================================================

#[tokio::test]
async fn basic_session_frames() {
    let frames = replay("replay_basic.json").await;
    let ops: Vec<&str> = frames.iter().map(|f| f.op.as_str()).collect();
    assert_eq!(
        ops,
        [
            "open",
            "settings",
            "inspect-class",
            "change",
            "inspect-class",
            "ignore",
            "inspect-range"
        ]
    );

    // open: one inspect action above the class, nothing inspected yet
    assert_eq!(
        frames[0].surface.documents[SHOP].actions,
        [(0, "Rewrite with new syntax".to_string())]
    );
    assert_eq!(frames[0].inspector_calls, 0);

    // inspect-class: both inspections drawn, only the method-owned one cached
    let inspected = &frames[2];
    assert!(inspected.ok);
    assert_eq!(inspected.inspector_calls, 1);
    assert_eq!(
        diagnostics(inspected),
        [
            (1, "Explicit type arguments, maybe use the diamond operator".to_string()),
            (5, "Raw loop, maybe use a stream".to_string()),
        ]
    );
    assert_eq!(inspected.surface.threads_created, 2);
    assert_eq!(inspected.cache.ready, 2);
}

#[tokio::test]
async fn edit_replays_cached_inspection_at_new_line() {
    let frames = replay("replay_basic.json").await;

    let changed = &frames[3];
    assert_eq!(
        diagnostics(changed),
        [(7, "Raw loop, maybe use a stream".to_string())]
    );
    assert_eq!(changed.surface.documents[SHOP].threads.len(), 1);
    assert_eq!(changed.surface.threads_disposed, 1);
    assert_eq!(
        changed.surface.documents[SHOP].actions,
        [(2, "Rewrite with new syntax".to_string())]
    );

    // re-inspecting the unchanged class is served from cache
    let again = &frames[4];
    assert!(again.ok);
    assert_eq!(again.inspector_calls, 1);
    assert_eq!(diagnostics(again), diagnostics(changed));
}

#[tokio::test]
async fn ignore_and_failure() {
    let frames = replay("replay_basic.json").await;

    let ignored = &frames[5];
    assert!(diagnostics(ignored).is_empty());
    assert_eq!(ignored.surface.threads_disposed, 2);

    let failed = &frames[6];
    assert!(!failed.ok);
    assert_eq!(failed.inspector_calls, 2);
    assert_eq!(
        failed.notifications,
        ["Failed to inspect range [0, 0]: no response"]
    );
}

// ============================================================================
// Binary
// ============================================================================

fn run(args: &[&str]) -> (Value, Option<i32>) {
    let output = Command::new(binary())
        .args(args)
        .output()
        .expect("binary runs");
    let json: Value = serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    (json, output.status.code())
}

#[test]
fn cli_replay_emits_summary() {
    let script = fixture("replay_basic.json");
    let (json, code) = run(&["replay", script.to_str().unwrap()]);
    assert_eq!(code, Some(0));
    assert_eq!(json["status"], "ok");
    assert_eq!(json["schema_version"], SCHEMA_VERSION);
    assert_eq!(json["summary"]["steps"], 7);
    assert_eq!(json["summary"]["failed"], 1);
    assert_eq!(json["summary"]["inspector_calls"], 2);
    assert_eq!(json["frames"].as_array().map(Vec::len), Some(7));
}

#[test]
fn cli_missing_script_is_an_error_response() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.json");
    let (json, code) = run(&["replay", missing.to_str().unwrap()]);
    assert_eq!(json["status"], "error");
    assert_eq!(code, Some(10));
}

#[test]
fn cli_config_reads_project_settings() {
    let dir = TempDir::new().unwrap();
    let config_dir = dir.path().join(".tuginspect");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.toml"),
        "[inspection.renderer]\ncomments = true\n",
    )
    .unwrap();

    let (json, code) = run(&["config", "--project", dir.path().to_str().unwrap()]);
    assert_eq!(code, Some(0));
    assert_eq!(json["renderers"], serde_json::json!(["comments"]));
    assert!(json["source"].as_str().unwrap().ends_with("config.toml"));
}
