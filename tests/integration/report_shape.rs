//! Report rendering: JSON field shape and text summary content.

use super::test_utils::{orchestrator_for, passing_config};
use verdict::orchestrator::RunRequest;
use verdict::workspace::StaticWorkspace;

#[tokio::test]
async fn test_json_report_field_shape() {
    let ws = StaticWorkspace::new("feature/shape").with_staged(&["src/lib.rs", "Cargo.toml"]);
    let (_dir, orch) = orchestrator_for(passing_config(), ws);

    let report = orch.run(&RunRequest::default()).await.unwrap();
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

    assert_eq!(json["status"], "passed");
    assert_eq!(json["mode"], "automatic");
    assert_eq!(json["no_op"], false);
    assert_eq!(json["context"]["branch"], "feature/shape");
    assert_eq!(json["context"]["file_count"], 2);

    // Dimension names serialize kebab-case.
    let dims: Vec<&str> = json["dimensions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["dimension"].as_str().unwrap())
        .collect();
    assert!(dims.contains(&"static-analysis"));
    assert!(dims.contains(&"build-integrity"));

    assert!(json["governance"]["memory_ceiling_bytes"].is_u64());
    assert!(json["generated_at"].is_string());
}

#[tokio::test]
async fn test_text_report_mentions_mode_and_status() {
    let ws = StaticWorkspace::new("release/v1.0.0").with_staged(&["src/lib.rs"]);
    let (_dir, orch) = orchestrator_for(passing_config(), ws);

    let report = orch.run(&RunRequest::default()).await.unwrap();
    let text = report.to_text(false);

    assert!(text.contains("Mode: gate"));
    assert!(text.contains("Validation: passed"));
    assert!(text.contains("release/v1.0.0"));
    assert!(text.contains("Performance:"));
}

#[tokio::test]
async fn test_text_report_lists_failures() {
    let mut config = passing_config();
    config.tools.commands.insert(
        "test".to_string(),
        verdict::config::CommandSpec::new("false", &[]),
    );
    let ws = StaticWorkspace::new("feature/broken").with_staged(&["src/lib.rs"]);
    let (_dir, orch) = orchestrator_for(config, ws);

    let report = orch.run(&RunRequest::default()).await.unwrap();
    let text = report.to_text(false);

    assert!(text.contains("Validation: failed"));
    assert!(text.contains("[critical] test"));
}

#[tokio::test]
async fn test_json_round_trips_through_serde() {
    let ws = StaticWorkspace::new("feature/x").with_staged(&["src/lib.rs"]);
    let (_dir, orch) = orchestrator_for(passing_config(), ws);

    let report = orch.run(&RunRequest::default()).await.unwrap();
    let json = report.to_json().unwrap();
    let parsed: verdict::report::Report = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.status, report.status);
    assert_eq!(parsed.mode, report.mode);
    assert_eq!(parsed.tools.len(), report.tools.len());
}
