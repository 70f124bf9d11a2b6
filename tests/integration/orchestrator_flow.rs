//! End-to-end pipeline tests: detect, resolve, plan, execute, report.

use super::test_utils::{config_with, orchestrator_for, passing_config};
use verdict::config::CommandSpec;
use verdict::error::OrchestratorError;
use verdict::orchestrator::RunRequest;
use verdict::types::{DimensionKind, Mode, OverallStatus};
use verdict::workspace::StaticWorkspace;

#[tokio::test]
async fn test_clean_source_change_passes() {
    let ws = StaticWorkspace::new("feature/widgets").with_staged(&["src/widgets.rs"]);
    let (_dir, orch) = orchestrator_for(passing_config(), ws);

    let report = orch.run(&RunRequest::default()).await.unwrap();
    assert_eq!(report.status, OverallStatus::Passed);
    assert_eq!(report.mode, Mode::Automatic);
    assert!(report.resolution.compliant);
    assert!(report.governance.is_some());

    // A plain source change maps static analysis and test coverage.
    let dims: Vec<DimensionKind> = report.dimensions.iter().map(|d| d.dimension).collect();
    assert!(dims.contains(&DimensionKind::StaticAnalysis));
    assert!(dims.contains(&DimensionKind::TestCoverage));
}

#[tokio::test]
async fn test_empty_change_set_passes_without_running() {
    let ws = StaticWorkspace::new("feature/idle");
    let (_dir, orch) = orchestrator_for(passing_config(), ws);

    let report = orch.run(&RunRequest::default()).await.unwrap();
    assert!(report.no_op);
    assert_eq!(report.status, OverallStatus::Passed);
    assert!(report.tools.is_empty());
    assert!(report.governance.is_none());
}

#[tokio::test]
async fn test_failing_critical_tool_fails_the_run() {
    let mut config = passing_config();
    config
        .tools
        .commands
        .insert("test".to_string(), CommandSpec::new("false", &[]));
    let ws = StaticWorkspace::new("feature/broken").with_staged(&["src/lib.rs"]);
    let (_dir, orch) = orchestrator_for(config, ws);

    let report = orch.run(&RunRequest::default()).await.unwrap();
    assert_eq!(report.status, OverallStatus::Failed);
    let failed = report.tools.iter().find(|t| !t.success).unwrap();
    assert_eq!(failed.tool, "test");
    assert!(failed.critical);
}

#[tokio::test]
async fn test_failing_non_critical_tool_warns() {
    // Only a docs-adjacent manifest change: build-integrity is critical, but
    // lint failing on an Other-classified file is non-critical.
    let mut config = passing_config();
    config
        .tools
        .commands
        .insert("lint".to_string(), CommandSpec::new("false", &[]));
    let ws = StaticWorkspace::new("feature/lint").with_staged(&["src/lib.rs"]);
    let (_dir, orch) = orchestrator_for(config, ws);

    let report = orch.run(&RunRequest::default()).await.unwrap();
    assert_eq!(report.status, OverallStatus::Warning);
}

#[tokio::test]
async fn test_release_branch_mandates_gate() {
    let ws = StaticWorkspace::new("release/v2.0.0").with_staged(&["src/lib.rs"]);
    let (_dir, orch) = orchestrator_for(passing_config(), ws);

    let report = orch
        .run(&RunRequest {
            mode: Some(Mode::Fast),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(report.mode, Mode::Gate);
    assert_eq!(report.resolution.requested, Some(Mode::Fast));
    assert!(report.resolution.compliant);
}

#[tokio::test]
async fn test_gate_run_covers_every_dimension() {
    // A plain source change maps only two dimensions, but a gate run still
    // validates all four.
    let ws = StaticWorkspace::new("release/v2.0.0").with_staged(&["src/lib.rs"]);
    let (_dir, orch) = orchestrator_for(passing_config(), ws);

    let report = orch.run(&RunRequest::default()).await.unwrap();
    assert_eq!(report.mode, Mode::Gate);
    let dims: Vec<DimensionKind> = report.dimensions.iter().map(|d| d.dimension).collect();
    assert!(dims.contains(&DimensionKind::BuildIntegrity));
    assert!(dims.contains(&DimensionKind::SecurityAudit));
    assert!(report
        .tools
        .iter()
        .any(|t| t.dimension == DimensionKind::SecurityAudit));
}

#[tokio::test]
async fn test_override_gate_is_honored_but_non_compliant() {
    let ws = StaticWorkspace::new("release/v2.0.0").with_staged(&["src/lib.rs"]);
    let (_dir, orch) = orchestrator_for(passing_config(), ws);

    let report = orch
        .run(&RunRequest {
            mode: Some(Mode::Fast),
            override_gate: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(report.mode, Mode::Fast);
    assert!(!report.resolution.compliant);
    assert!(report.resolution.overridden);
    // An overridden gate never reports fully clean.
    assert_eq!(report.status, OverallStatus::Warning);
}

#[tokio::test]
async fn test_sensitive_path_mandates_gate() {
    let ws = StaticWorkspace::new("feature/db").with_staged(&["db/migration/0001_init.sql"]);
    let (_dir, orch) = orchestrator_for(passing_config(), ws);

    let report = orch.run(&RunRequest::default()).await.unwrap();
    assert_eq!(report.mode, Mode::Gate);
}

#[tokio::test]
async fn test_auth_change_runs_security_audit() {
    let ws = StaticWorkspace::new("feature/sso").with_staged(&["src/auth/login.ts"]);
    let (_dir, orch) = orchestrator_for(passing_config(), ws);

    let report = orch.run(&RunRequest::default()).await.unwrap();
    let dims: Vec<DimensionKind> = report.dimensions.iter().map(|d| d.dimension).collect();
    assert!(dims.contains(&DimensionKind::SecurityAudit));
    assert!(dims.contains(&DimensionKind::TestCoverage));
    assert!(dims.contains(&DimensionKind::StaticAnalysis));
}

#[tokio::test]
async fn test_fast_mode_skips_security_audit() {
    let ws = StaticWorkspace::new("feature/sso").with_staged(&["src/auth/login.ts"]);
    let (_dir, orch) = orchestrator_for(passing_config(), ws);

    let report = orch
        .run(&RunRequest {
            mode: Some(Mode::Fast),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(report
        .tools
        .iter()
        .all(|t| t.dimension != DimensionKind::SecurityAudit));
}

#[tokio::test]
async fn test_scope_narrows_and_selects_scope_mode() {
    let ws = StaticWorkspace::new("feature/mixed")
        .with_staged(&["src/lib.rs", "web/app.ts", "docs/guide.md"]);
    let (_dir, orch) = orchestrator_for(passing_config(), ws);

    let report = orch
        .run(&RunRequest {
            scope: Some("src".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(report.mode, Mode::Scope);
    assert_eq!(report.context.file_count, 1);
}

#[tokio::test]
async fn test_scope_mode_without_scope_is_an_error() {
    let ws = StaticWorkspace::new("feature/x").with_staged(&["src/lib.rs"]);
    let (_dir, orch) = orchestrator_for(passing_config(), ws);

    let err = orch
        .run(&RunRequest {
            mode: Some(Mode::Scope),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::Planning(_)));
}

#[tokio::test]
async fn test_missing_runtime_falls_back_then_aborts() {
    let mut config = passing_config();
    config.tools.commands.insert(
        "test".to_string(),
        CommandSpec::new("definitely-not-installed-anywhere", &[]),
    );
    let ws = StaticWorkspace::new("feature/x").with_staged(&["src/lib.rs"]);
    let (_dir, orch) = orchestrator_for(config, ws);

    let err = orch.run(&RunRequest::default()).await.unwrap_err();
    match err {
        OrchestratorError::Infrastructure { component, .. } => assert_eq!(component, "test"),
        other => panic!("expected infrastructure error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unrecognized_files_trigger_comprehensive_set() {
    let ws = StaticWorkspace::new("feature/docs").with_staged(&["notes.txt", "plan.org"]);
    let (_dir, orch) = orchestrator_for(passing_config(), ws);

    let report = orch.run(&RunRequest::default()).await.unwrap();
    // Low classification confidence runs every dimension.
    assert_eq!(report.dimensions.len(), 4);
}

#[tokio::test]
async fn test_staged_only_request_ignores_unstaged() {
    let ws = StaticWorkspace::new("feature/x")
        .with_staged(&["src/a.rs"])
        .with_unstaged(&["src/b.rs"]);
    let (_dir, orch) = orchestrator_for(passing_config(), ws);

    let report = orch
        .run(&RunRequest {
            staged_only: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(report.context.file_count, 1);
    assert_eq!(report.context.staged_count, 1);
}
