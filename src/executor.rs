//! Execution controller.
//!
//! Runs a plan batch by batch: each batch holds at most the plan's
//! concurrency limit and a batch completes before the next starts. Every
//! invocation yields exactly one result; faults (timeout, missing runtime,
//! unresolved adapter) are materialized as failed results rather than
//! surfaced as errors, so the report always accounts for the whole plan.

use crate::adapter::{InvokeError, ResolvedAdapters, ToolAdapter, Violation};
use crate::plan::{partition_batches, ExecutionPlan, ToolInvocation};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Infrastructure-level failure classification for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FaultKind {
    /// The invocation (or the whole plan) ran out of time
    Timeout,
    /// The tool's executable is not installed
    MissingRuntime,
    /// The tool failed to start for another reason
    Spawn,
    /// No adapter backs this tool for the detected stack
    AdapterUnresolved,
}

/// Outcome of one tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub tool: String,
    pub dimension: crate::types::DimensionKind,
    /// Stack the invocation targeted, when the tool is stack-specific
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<crate::types::StackKind>,
    pub critical: bool,
    /// Exit-status success; false for any fault
    pub success: bool,
    pub duration_ms: u64,
    pub violations: Vec<Violation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<FaultKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault_detail: Option<String>,
}

impl ExecutionResult {
    fn fault(invocation: &ToolInvocation, kind: FaultKind, detail: String) -> Self {
        Self {
            tool: invocation.tool.clone(),
            dimension: invocation.dimension,
            stack: invocation.stack,
            critical: invocation.critical,
            success: false,
            duration_ms: 0,
            violations: Vec::new(),
            fault: Some(kind),
            fault_detail: Some(detail),
        }
    }

    /// Whether this result represents a broken environment rather than a
    /// failing check.
    pub fn is_infrastructure_fault(&self) -> bool {
        matches!(
            self.fault,
            Some(FaultKind::MissingRuntime) | Some(FaultKind::Spawn) | Some(FaultKind::AdapterUnresolved)
        )
    }
}

/// Wall-clock and memory measurements for one executed plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionMetrics {
    pub total_duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_memory_bytes: Option<u64>,
}

/// Results plus metrics for one executed plan.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub results: Vec<ExecutionResult>,
    pub metrics: ExecutionMetrics,
}

impl ExecutionOutcome {
    /// True when a critical invocation hit an infrastructure fault; the
    /// orchestrator uses this to decide whether to fall back to a safer mode.
    pub fn has_critical_infrastructure_fault(&self) -> bool {
        self.results
            .iter()
            .any(|r| r.critical && r.is_infrastructure_fault())
    }
}

/// Batch-parallel executor.
pub struct ExecutionController;

impl ExecutionController {
    pub fn new() -> Self {
        Self
    }

    /// Execute the plan. Results come back in plan order regardless of
    /// completion order within a batch.
    pub async fn execute(
        &self,
        plan: &ExecutionPlan,
        adapters: &ResolvedAdapters,
    ) -> ExecutionOutcome {
        let start = Instant::now();
        let deadline = plan.global_deadline.map(|d| start + d);
        let mut results: Vec<ExecutionResult> = Vec::with_capacity(plan.invocations.len());

        info!(
            mode = %plan.mode,
            invocations = plan.invocations.len(),
            concurrency = plan.concurrency,
            "Executing plan"
        );

        for batch in partition_batches(&plan.invocations, plan.concurrency) {
            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));

            if remaining == Some(Duration::ZERO) {
                // Deadline already spent: remaining work is accounted for as
                // timed out, never silently dropped.
                warn!(mode = %plan.mode, "Plan deadline exceeded; skipping remaining batches");
                for invocation in &batch {
                    results.push(ExecutionResult::fault(
                        invocation,
                        FaultKind::Timeout,
                        "plan deadline exceeded before invocation started".to_string(),
                    ));
                }
                continue;
            }

            let mut in_flight = FuturesUnordered::new();
            for (index, invocation) in batch.iter().enumerate() {
                let adapter = adapters.get(&invocation.tool, invocation.stack);
                let invocation = invocation.clone();
                let budget = match remaining {
                    Some(left) => invocation.timeout.min(left),
                    None => invocation.timeout,
                };
                in_flight.push(async move {
                    (index, run_invocation(invocation, adapter, budget).await)
                });
            }

            let mut batch_results: Vec<(usize, ExecutionResult)> = Vec::with_capacity(batch.len());
            while let Some(entry) = in_flight.next().await {
                batch_results.push(entry);
            }
            batch_results.sort_by_key(|(index, _)| *index);
            results.extend(batch_results.into_iter().map(|(_, r)| r));
        }

        let metrics = ExecutionMetrics {
            total_duration_ms: start.elapsed().as_millis() as u64,
            peak_memory_bytes: crate::governor::peak_rss_bytes(),
        };

        debug!(
            duration_ms = metrics.total_duration_ms,
            failures = results.iter().filter(|r| !r.success).count(),
            "Plan execution finished"
        );

        ExecutionOutcome { results, metrics }
    }
}

impl Default for ExecutionController {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_invocation(
    invocation: ToolInvocation,
    adapter: Option<Arc<dyn ToolAdapter>>,
    budget: Duration,
) -> ExecutionResult {
    let adapter = match adapter {
        Some(adapter) => adapter,
        None => {
            warn!(tool = %invocation.tool, "No adapter resolved for tool");
            return ExecutionResult::fault(
                &invocation,
                FaultKind::AdapterUnresolved,
                format!("no adapter available for '{}'", invocation.tool),
            );
        }
    };

    match adapter
        .invoke(&invocation.scope, &invocation.args, budget)
        .await
    {
        Ok(raw) => {
            let violations = adapter.parse(&raw);
            debug!(
                tool = %invocation.tool,
                exit_code = raw.exit_code,
                violations = violations.len(),
                duration_ms = raw.duration_ms,
                "Tool finished"
            );
            ExecutionResult {
                tool: invocation.tool,
                dimension: invocation.dimension,
                stack: invocation.stack,
                critical: invocation.critical,
                success: raw.succeeded(),
                duration_ms: raw.duration_ms,
                violations,
                fault: None,
                fault_detail: None,
            }
        }
        Err(error) => {
            let kind = match error {
                InvokeError::Timeout { .. } => FaultKind::Timeout,
                InvokeError::MissingRuntime { .. } => FaultKind::MissingRuntime,
                InvokeError::Spawn { .. } => FaultKind::Spawn,
            };
            warn!(tool = %invocation.tool, %error, "Tool invocation failed");
            let mut result = ExecutionResult::fault(&invocation, kind, error.to_string());
            if kind == FaultKind::Timeout {
                result.duration_ms = budget.as_millis() as u64;
            }
            result
        }
    }
}
