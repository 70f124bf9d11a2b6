//! CLI route: single route table and run context. Dispatches to the
//! orchestrator and storage and renders command output.

use crate::adapter::ToolAdapterRegistry;
use crate::cli::parse::{BaselineCommands, Commands};
use crate::config::VerdictConfig;
use crate::context::DetectOptions;
use crate::error::OrchestratorError;
use crate::governor::BaselineStore;
use crate::orchestrator::{RunRequest, ValidationOrchestrator};
use crate::types::{Mode, OverallStatus, ScopeBucket, StackKind};
use crate::workspace::GitWorkspace;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde_json::json;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

/// Rendered output of one command plus the process exit code it implies.
pub struct CommandOutput {
    pub text: String,
    pub exit_code: i32,
}

impl CommandOutput {
    fn ok(text: String) -> Self {
        Self { text, exit_code: 0 }
    }
}

/// Runtime context for CLI execution: workspace root and loaded config.
pub struct RunContext {
    config: VerdictConfig,
    workspace_root: PathBuf,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    pub fn new(
        workspace_root: PathBuf,
        config_path: Option<PathBuf>,
    ) -> Result<Self, OrchestratorError> {
        let config = match config_path {
            Some(ref path) => VerdictConfig::load_from_file(path)?,
            None => VerdictConfig::load(&workspace_root)?,
        };
        Ok(Self {
            config,
            workspace_root,
        })
    }

    pub fn config(&self) -> &VerdictConfig {
        &self.config
    }

    /// Execute one parsed command.
    pub fn execute(&self, command: &Commands) -> Result<CommandOutput, OrchestratorError> {
        match command {
            Commands::Run {
                mode,
                scope,
                staged,
                override_gate,
                format,
                no_color,
            } => self.run_validation(
                mode.as_deref(),
                scope.clone(),
                *staged,
                *override_gate,
                format,
                *no_color,
            ),
            Commands::Context {
                scope,
                staged,
                format,
            } => self.show_context(scope.clone(), *staged, format),
            Commands::Baseline { command } => self.baseline(command),
            Commands::Tools { stack, format } => self.tools(stack.as_deref(), format),
        }
    }

    fn orchestrator(&self) -> Result<ValidationOrchestrator, OrchestratorError> {
        let store = BaselineStore::open(&self.config.baseline_path(&self.workspace_root))?;
        let workspace = Arc::new(GitWorkspace::new(self.workspace_root.clone()));
        Ok(ValidationOrchestrator::new(
            self.config.clone(),
            workspace,
            store,
        ))
    }

    fn run_validation(
        &self,
        mode: Option<&str>,
        scope: Option<String>,
        staged_only: bool,
        override_gate: bool,
        format: &str,
        no_color: bool,
    ) -> Result<CommandOutput, OrchestratorError> {
        let mode = mode
            .map(|m| m.parse::<Mode>())
            .transpose()
            .map_err(OrchestratorError::Planning)?;

        let orchestrator = self.orchestrator()?;
        let request = RunRequest {
            mode,
            scope,
            override_gate,
            staged_only,
        };

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| OrchestratorError::Config(format!("Failed to start runtime: {}", e)))?;
        let report = runtime.block_on(orchestrator.run(&request))?;

        let text = match format {
            "json" => report
                .to_json()
                .map_err(|e| OrchestratorError::Config(format!("Failed to render report: {}", e)))?,
            _ => report.to_text(!no_color),
        };

        let exit_code = match report.status {
            OverallStatus::Failed => 1,
            _ => 0,
        };
        Ok(CommandOutput { text, exit_code })
    }

    fn show_context(
        &self,
        scope: Option<String>,
        staged_only: bool,
        format: &str,
    ) -> Result<CommandOutput, OrchestratorError> {
        let orchestrator = self.orchestrator()?;
        let context = orchestrator.detect_context(&DetectOptions { scope, staged_only })?;

        if format == "json" {
            let text = serde_json::to_string_pretty(&context)
                .map_err(|e| OrchestratorError::Config(format!("Failed to render context: {}", e)))?;
            return Ok(CommandOutput::ok(text));
        }

        let mut out = String::new();
        let _ = writeln!(out, "Branch: {}", context.branch);
        let _ = writeln!(
            out,
            "Changed files: {} ({} staged)",
            context.scope_size(),
            context.staged_count()
        );
        let stacks: Vec<&str> = context.stacks.iter().map(|s| s.as_str()).collect();
        let _ = writeln!(
            out,
            "Stacks: {}",
            if stacks.is_empty() {
                "none".to_string()
            } else {
                stacks.join(", ")
            }
        );
        let _ = writeln!(out, "Confidence: {:.2}", context.confidence);
        if context.risk.release_branch {
            let _ = writeln!(out, "Risk: release branch (gate mandated)");
        }
        if !context.risk.keyword_hits.is_empty() {
            let _ = writeln!(
                out,
                "Risk: sensitive paths ({})",
                context.risk.keyword_hits.join(", ")
            );
        }
        for file in &context.files {
            let _ = writeln!(
                out,
                "  {} {}",
                if file.staged { "S" } else { "U" },
                file.path.display()
            );
        }
        Ok(CommandOutput::ok(out))
    }

    fn baseline(&self, command: &BaselineCommands) -> Result<CommandOutput, OrchestratorError> {
        let store = BaselineStore::open(&self.config.baseline_path(&self.workspace_root))?;

        match command {
            BaselineCommands::Show { bucket, format } => {
                let buckets: Vec<ScopeBucket> = match bucket {
                    Some(name) => vec![parse_bucket(name)?],
                    None => vec![
                        ScopeBucket::Small,
                        ScopeBucket::Medium,
                        ScopeBucket::Large,
                        ScopeBucket::ExtraLarge,
                    ],
                };

                if format == "json" {
                    let mut entries = serde_json::Map::new();
                    for bucket in &buckets {
                        let history = store.history(*bucket)?;
                        entries.insert(bucket.to_string(), json!(history));
                    }
                    let text = serde_json::to_string_pretty(&entries).map_err(|e| {
                        OrchestratorError::Config(format!("Failed to render baselines: {}", e))
                    })?;
                    return Ok(CommandOutput::ok(text));
                }

                let mut out = String::new();
                for bucket in &buckets {
                    let history = store.history(*bucket)?;
                    if history.is_empty() {
                        let _ = writeln!(out, "{}: no measurements", bucket);
                        continue;
                    }
                    let mean: u64 = history.iter().map(|e| e.duration_ms).sum::<u64>()
                        / history.len() as u64;
                    let _ = writeln!(
                        out,
                        "{}: {} measurements, mean {}ms",
                        bucket,
                        history.len(),
                        mean
                    );
                    let mut table = Table::new();
                    table
                        .load_preset(UTF8_FULL)
                        .set_content_arrangement(ContentArrangement::Dynamic)
                        .set_header(vec!["Recorded", "Duration (ms)", "Memory (bytes)"]);
                    for entry in &history {
                        table.add_row(vec![
                            entry.recorded_at.to_rfc3339(),
                            entry.duration_ms.to_string(),
                            entry
                                .memory_bytes
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| "-".to_string()),
                        ]);
                    }
                    let _ = writeln!(out, "{}", table);
                }
                Ok(CommandOutput::ok(out))
            }
            BaselineCommands::Clear { bucket, all } => {
                if *all {
                    store.clear_all()?;
                    return Ok(CommandOutput::ok("Cleared all baselines.".to_string()));
                }
                // clap enforces that bucket is present when --all is absent
                let bucket = parse_bucket(bucket.as_deref().unwrap_or_default())?;
                store.clear(bucket)?;
                Ok(CommandOutput::ok(format!(
                    "Cleared baselines for bucket '{}'.",
                    bucket
                )))
            }
        }
    }

    fn tools(&self, stack: Option<&str>, format: &str) -> Result<CommandOutput, OrchestratorError> {
        let stack = stack.map(parse_stack).transpose()?;
        let registry = ToolAdapterRegistry::new(self.config.tools.clone());
        let described = registry.describe(stack);

        if format == "json" {
            let text = serde_json::to_string_pretty(&described)
                .map_err(|e| OrchestratorError::Config(format!("Failed to render tools: {}", e)))?;
            return Ok(CommandOutput::ok(text));
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Tool", "Source", "Command"]);
        for entry in &described {
            let command = match entry.program {
                Some(ref program) => {
                    let mut parts = vec![program.clone()];
                    parts.extend(entry.args.iter().cloned());
                    parts.join(" ")
                }
                None => "-".to_string(),
            };
            table.add_row(vec![entry.tool.clone(), entry.source.clone(), command]);
        }
        Ok(CommandOutput::ok(table.to_string()))
    }
}

fn parse_bucket(name: &str) -> Result<ScopeBucket, OrchestratorError> {
    match name.to_ascii_lowercase().as_str() {
        "small" => Ok(ScopeBucket::Small),
        "medium" => Ok(ScopeBucket::Medium),
        "large" => Ok(ScopeBucket::Large),
        "extra-large" | "xl" => Ok(ScopeBucket::ExtraLarge),
        other => Err(OrchestratorError::Planning(format!(
            "Unknown bucket '{}' (expected small, medium, large, or extra-large)",
            other
        ))),
    }
}

fn parse_stack(name: &str) -> Result<StackKind, OrchestratorError> {
    match name.to_ascii_lowercase().as_str() {
        "rust" => Ok(StackKind::Rust),
        "javascript" | "js" => Ok(StackKind::JavaScript),
        "typescript" | "ts" => Ok(StackKind::TypeScript),
        "python" | "py" => Ok(StackKind::Python),
        "go" => Ok(StackKind::Go),
        "shell" | "sh" => Ok(StackKind::Shell),
        other => Err(OrchestratorError::Planning(format!(
            "Unknown stack '{}'",
            other
        ))),
    }
}
