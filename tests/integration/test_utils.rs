//! Shared helpers for integration tests.

use std::sync::Arc;
use verdict::config::{CommandSpec, VerdictConfig};
use verdict::governor::BaselineStore;
use verdict::orchestrator::ValidationOrchestrator;
use verdict::workspace::StaticWorkspace;

/// Config where every logical tool resolves to a command that succeeds.
pub fn passing_config() -> VerdictConfig {
    config_with(&[
        ("lint", "true", &[]),
        ("test", "true", &[]),
        ("build", "true", &[]),
        ("dependency-audit", "true", &[]),
        ("security-scan", "true", &[]),
    ])
}

pub fn config_with(commands: &[(&str, &str, &[&str])]) -> VerdictConfig {
    let mut config = VerdictConfig::default();
    for (name, program, args) in commands {
        config
            .tools
            .commands
            .insert(name.to_string(), CommandSpec::new(*program, args));
    }
    config
}

/// Orchestrator over a static workspace with a temp baseline store. The
/// returned tempdir must stay alive for the store's lifetime.
pub fn orchestrator_for(
    config: VerdictConfig,
    workspace: StaticWorkspace,
) -> (tempfile::TempDir, ValidationOrchestrator) {
    let dir = tempfile::tempdir().unwrap();
    let store = BaselineStore::open(&dir.path().join("baselines")).unwrap();
    let orch = ValidationOrchestrator::new(config, Arc::new(workspace), store);
    (dir, orch)
}
