//! Configuration system.
//!
//! Hierarchical configuration with file and environment variable sources,
//! runtime validation, and documented defaults. The regression threshold and
//! memory ceiling are configurable defaults: 20% and 512 MB are the contract
//! unless a deployment overrides them.

use crate::error::OrchestratorError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerdictConfig {
    /// Execution limits and timeouts
    #[serde(default)]
    pub orchestration: OrchestrationConfig,

    /// Performance governance thresholds
    #[serde(default)]
    pub governance: GovernanceConfig,

    /// Risk signal detection
    #[serde(default)]
    pub risk: RiskConfig,

    /// Tool command catalog overrides and enabled suites
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Execution limits and per-mode timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationConfig {
    /// Maximum concurrent tool invocations in parallel modes
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Per-invocation timeout in seconds (Automatic, Scope, Gate)
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,

    /// Per-invocation timeout in seconds for Fast mode
    #[serde(default = "default_fast_tool_timeout_secs")]
    pub fast_tool_timeout_secs: u64,

    /// Whole-plan deadline in seconds for Fast mode
    #[serde(default = "default_fast_deadline_secs")]
    pub fast_deadline_secs: u64,

    /// Optional whole-plan deadline in seconds for the other modes
    #[serde(default)]
    pub global_deadline_secs: Option<u64>,
}

fn default_max_concurrency() -> usize {
    3
}

fn default_tool_timeout_secs() -> u64 {
    300
}

fn default_fast_tool_timeout_secs() -> u64 {
    30
}

fn default_fast_deadline_secs() -> u64 {
    120
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            tool_timeout_secs: default_tool_timeout_secs(),
            fast_tool_timeout_secs: default_fast_tool_timeout_secs(),
            fast_deadline_secs: default_fast_deadline_secs(),
            global_deadline_secs: None,
        }
    }
}

/// Performance governance thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// A run exceeding the baseline by more than this percentage is a
    /// significant regression
    #[serde(default = "default_regression_threshold_pct")]
    pub regression_threshold_pct: f64,

    /// Hard ceiling for peak resident memory, in bytes
    #[serde(default = "default_memory_ceiling_bytes")]
    pub memory_ceiling_bytes: u64,

    /// Fraction of the ceiling at which the verdict degrades (0.0-1.0)
    #[serde(default = "default_degraded_band")]
    pub degraded_band: f64,

    /// Measurements retained per scope bucket (sliding window)
    #[serde(default = "default_baseline_window")]
    pub baseline_window: usize,

    /// Baseline store location (defaults to the XDG data directory)
    #[serde(default)]
    pub baseline_path: Option<PathBuf>,
}

fn default_regression_threshold_pct() -> f64 {
    20.0
}

fn default_memory_ceiling_bytes() -> u64 {
    512 * 1024 * 1024
}

fn default_degraded_band() -> f64 {
    0.8
}

fn default_baseline_window() -> usize {
    32
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            regression_threshold_pct: default_regression_threshold_pct(),
            memory_ceiling_bytes: default_memory_ceiling_bytes(),
            degraded_band: default_degraded_band(),
            baseline_window: default_baseline_window(),
            baseline_path: None,
        }
    }
}

/// Risk signal detection: branch patterns and path keywords that mandate
/// Gate mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Branch name glob patterns that force Gate mode
    #[serde(default = "default_release_branch_patterns")]
    pub release_branch_patterns: Vec<String>,

    /// Path keywords that force Gate mode when a changed path contains one
    #[serde(default = "default_sensitive_keywords")]
    pub sensitive_keywords: Vec<String>,
}

fn default_release_branch_patterns() -> Vec<String> {
    vec![
        "release/*".to_string(),
        "hotfix/*".to_string(),
        "main".to_string(),
        "master".to_string(),
    ]
}

fn default_sensitive_keywords() -> Vec<String> {
    vec![
        "security".to_string(),
        "migration".to_string(),
        "secrets".to_string(),
        "payment".to_string(),
    ]
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            release_branch_patterns: default_release_branch_patterns(),
            sensitive_keywords: default_sensitive_keywords(),
        }
    }
}

/// A concrete command backing a logical tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Tool catalog overrides and enabled suite adapters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Logical tool name -> command, overriding the built-in per-stack catalog
    #[serde(default)]
    pub commands: HashMap<String, CommandSpec>,

    /// Enabled batch ("suite") adapters by name; each needs a command here too
    #[serde(default)]
    pub suites: HashMap<String, CommandSpec>,
}

impl VerdictConfig {
    /// Load configuration for a workspace: `verdict.toml` in the workspace
    /// root (if present) layered with `VERDICT_*` environment overrides.
    pub fn load(workspace_root: &Path) -> Result<VerdictConfig, OrchestratorError> {
        let mut builder = config::Config::builder();

        let file = workspace_root.join("verdict.toml");
        if file.exists() {
            builder = builder.add_source(config::File::from(file));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("VERDICT")
                .separator("__")
                .try_parsing(true),
        );

        let parsed: VerdictConfig = builder.build()?.try_deserialize()?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Load configuration from an explicit file path. An explicitly named
    /// file is parsed strictly as TOML with no environment layering.
    pub fn load_from_file(path: &Path) -> Result<VerdictConfig, OrchestratorError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            OrchestratorError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let parsed: VerdictConfig = toml::from_str(&raw).map_err(|e| {
            OrchestratorError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if self.orchestration.max_concurrency == 0 {
            return Err(OrchestratorError::Config(
                "orchestration.max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.governance.regression_threshold_pct <= 0.0 {
            return Err(OrchestratorError::Config(
                "governance.regression_threshold_pct must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.governance.degraded_band) {
            return Err(OrchestratorError::Config(
                "governance.degraded_band must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.governance.baseline_window < 2 {
            return Err(OrchestratorError::Config(
                "governance.baseline_window must be at least 2 for drift detection".to_string(),
            ));
        }
        for pattern in &self.risk.release_branch_patterns {
            glob::Pattern::new(pattern).map_err(|e| {
                OrchestratorError::Config(format!(
                    "Invalid release branch pattern '{}': {}",
                    pattern, e
                ))
            })?;
        }
        Ok(())
    }

    /// Resolve the baseline store path: config override, XDG data dir, or a
    /// workspace-local fallback.
    pub fn baseline_path(&self, workspace_root: &Path) -> PathBuf {
        if let Some(ref path) = self.governance.baseline_path {
            return path.clone();
        }
        if let Some(dirs) = directories::ProjectDirs::from("dev", "verdict", "verdict") {
            return dirs.data_dir().join("baselines");
        }
        workspace_root.join(".verdict").join("baselines")
    }
}
