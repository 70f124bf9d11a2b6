//! The validation orchestrator.
//!
//! Single entry point wiring the pipeline: detect context, resolve mode, map
//! dimensions, plan, execute, govern, report. Holds the fallback policy: one
//! infrastructure failure on a critical tool re-plans in the fallback mode; a
//! second is fatal.

use crate::adapter::ToolAdapterRegistry;
use crate::config::VerdictConfig;
use crate::context::{ContextDetector, DetectOptions, ValidationContext};
use crate::dimension::map_dimensions;
use crate::error::OrchestratorError;
use crate::executor::ExecutionController;
use crate::governor::{BaselineStore, PerformanceGovernor};
use crate::mode::{self};
use crate::plan::Planner;
use crate::report::Report;
use crate::types::{Mode, ScopeBucket};
use crate::workspace::WorkspaceReader;
use std::sync::Arc;
use tracing::{info, warn};

/// One validation request.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Explicitly requested mode; `None` lets resolution decide
    pub mode: Option<Mode>,
    /// Path or glob narrowing the change set
    pub scope: Option<String>,
    /// Development-only override for a mandated gate
    pub override_gate: bool,
    /// Only consider staged files
    pub staged_only: bool,
}

pub struct ValidationOrchestrator {
    config: VerdictConfig,
    workspace: Arc<dyn WorkspaceReader>,
    store: BaselineStore,
}

impl ValidationOrchestrator {
    pub fn new(
        config: VerdictConfig,
        workspace: Arc<dyn WorkspaceReader>,
        store: BaselineStore,
    ) -> Self {
        Self {
            config,
            workspace,
            store,
        }
    }

    /// Detect the context without running anything.
    pub fn detect_context(
        &self,
        options: &DetectOptions,
    ) -> Result<ValidationContext, OrchestratorError> {
        ContextDetector::new(self.config.risk.clone()).detect(self.workspace.as_ref(), options)
    }

    /// Run the full pipeline for one request.
    pub async fn run(&self, request: &RunRequest) -> Result<Report, OrchestratorError> {
        let context = self.detect_context(&DetectOptions {
            scope: request.scope.clone(),
            staged_only: request.staged_only,
        })?;

        let mut resolution = mode::resolve(request.mode, &context, request.override_gate)?;

        if context.is_empty() {
            // A scope that filters out every changed file is more likely a
            // typo than a clean state; refuse rather than report a pass.
            if request.scope.is_some() {
                let unscoped = self.detect_context(&DetectOptions {
                    scope: None,
                    staged_only: request.staged_only,
                })?;
                if !unscoped.is_empty() {
                    return Err(OrchestratorError::Planning(format!(
                        "scope '{}' matches none of the {} changed files",
                        request.scope.as_deref().unwrap_or_default(),
                        unscoped.scope_size()
                    )));
                }
            }
            info!("Empty change set; reporting success without execution");
            return Ok(Report::no_op(resolution, &context));
        }

        let dimensions = map_dimensions(&context);
        if dimensions.is_empty() {
            return Err(OrchestratorError::Planning(
                "no validation dimension applies to the change set".to_string(),
            ));
        }

        let planner = Planner::new(self.config.orchestration.clone());
        let registry = ToolAdapterRegistry::new(self.config.tools.clone());
        let controller = ExecutionController::new();

        let mut fell_back = false;
        let outcome = loop {
            let plan = planner.plan(resolution.mode, &context, &dimensions, &registry);
            let adapters = registry.resolve_for_plan(&plan.adapter_requests());
            let outcome = controller.execute(&plan, &adapters).await;

            if !outcome.has_critical_infrastructure_fault() {
                break outcome;
            }

            let fault = outcome
                .results
                .iter()
                .find(|r| r.critical && r.is_infrastructure_fault())
                .map(|r| {
                    (
                        r.tool.clone(),
                        r.fault_detail
                            .clone()
                            .unwrap_or_else(|| "infrastructure failure".to_string()),
                    )
                })
                .unwrap_or_else(|| ("unknown".to_string(), "infrastructure failure".to_string()));

            let target = if fell_back {
                None
            } else {
                mode::fallback_target(resolution.mode)
            };
            match target {
                Some(target) => {
                    warn!(
                        tool = %fault.0,
                        from = %resolution.mode,
                        to = %target,
                        "Critical infrastructure failure; re-planning in fallback mode"
                    );
                    resolution
                        .record_fallback(target, format!("'{}' unavailable: {}", fault.0, fault.1));
                    fell_back = true;
                }
                None => {
                    return Err(OrchestratorError::Infrastructure {
                        component: fault.0,
                        reason: fault.1,
                        remediation: "install the tool or point [tools.commands] at an available one"
                            .to_string(),
                    });
                }
            }
        };

        let bucket = ScopeBucket::for_file_count(context.scope_size());
        let governor = PerformanceGovernor::new(self.config.governance.clone());
        let verdict = governor.assess(&self.store, bucket, &outcome.metrics)?;
        governor.record(&self.store, bucket, &outcome.metrics)?;

        let metrics = outcome.metrics.clone();
        Ok(Report::assemble(
            resolution,
            &context,
            &dimensions,
            outcome.results,
            Some(verdict),
            &metrics,
        ))
    }
}
