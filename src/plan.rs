//! Execution planning.
//!
//! Turns a resolved mode plus a dimension set into a concrete plan: one
//! invocation per selected tool with its scope, timeout, and criticality.
//! Batch partitioning is a pure function over the invocation list so the
//! executor never re-derives grouping logic.

use crate::adapter::{ToolAdapterRegistry, ToolKind, ToolScope};
use crate::config::OrchestrationConfig;
use crate::context::ValidationContext;
use crate::dimension::Dimension;
use crate::types::{DimensionKind, Mode, Priority, StackKind};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// One planned tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Logical tool or suite name
    pub tool: String,
    /// Dimension this invocation satisfies
    pub dimension: DimensionKind,
    /// Priority inherited from the dimension
    pub priority: Priority,
    /// A failed critical invocation fails the run
    pub critical: bool,
    /// Stack used for built-in command resolution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<StackKind>,
    pub scope: ToolScope,
    #[serde(default)]
    pub args: Vec<String>,
    /// Per-invocation timeout
    pub timeout: Duration,
}

/// A complete plan for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub mode: Mode,
    /// Maximum invocations in flight at once (1 means strictly sequential)
    pub concurrency: usize,
    /// Whole-plan deadline, if the mode imposes one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_deadline: Option<Duration>,
    pub invocations: Vec<ToolInvocation>,
}

impl ExecutionPlan {
    pub fn is_empty(&self) -> bool {
        self.invocations.is_empty()
    }

    /// Distinct (tool, stack) pairs for adapter resolution.
    pub fn adapter_requests(&self) -> Vec<(String, Option<StackKind>)> {
        let mut requests: Vec<(String, Option<StackKind>)> = Vec::new();
        for invocation in &self.invocations {
            let request = (invocation.tool.clone(), invocation.stack);
            if !requests.contains(&request) {
                requests.push(request);
            }
        }
        requests
    }
}

/// Partition invocations into batches of at most `limit`. Order within and
/// across batches follows plan order; every invocation lands in exactly one
/// batch.
pub fn partition_batches(invocations: &[ToolInvocation], limit: usize) -> Vec<Vec<ToolInvocation>> {
    let limit = limit.max(1);
    invocations
        .chunks(limit)
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Stacks a tool is invoked for. Stack-agnostic tools (suites, configured
/// overrides) run once. Stack-specific tools run once per detected stack with
/// a backing command; when no detected stack backs the tool, one unresolvable
/// invocation is kept so the gap surfaces in the results instead of being
/// silently dropped.
fn invocation_stacks(
    tool: &str,
    stacks: &[StackKind],
    registry: &ToolAdapterRegistry,
) -> Vec<Option<StackKind>> {
    if !registry.is_stack_specific(tool) {
        return vec![None];
    }
    let backed: Vec<Option<StackKind>> = stacks
        .iter()
        .filter(|stack| registry.build(tool, Some(**stack)).is_some())
        .map(|stack| Some(*stack))
        .collect();
    if backed.is_empty() {
        vec![stacks.first().copied()]
    } else {
        backed
    }
}

/// Narrow a scope to the files of one stack. Stack-agnostic invocations see
/// the full scope.
fn scope_for_stack(scope: &ToolScope, stack: Option<StackKind>) -> ToolScope {
    match stack {
        None => scope.clone(),
        Some(stack) => ToolScope {
            paths: scope
                .paths
                .iter()
                .filter(|path| {
                    path.extension()
                        .and_then(|e| e.to_str())
                        .and_then(StackKind::from_extension)
                        == Some(stack)
                })
                .cloned()
                .collect(),
            pattern: scope.pattern.clone(),
        },
    }
}

/// Builds execution plans from the orchestration limits.
pub struct Planner {
    orchestration: OrchestrationConfig,
}

impl Planner {
    pub fn new(orchestration: OrchestrationConfig) -> Self {
        Self { orchestration }
    }

    /// Build the plan for one run.
    ///
    /// Fast mode narrows the scope to staged files, drops the security audit
    /// dimension, and runs under tight timeouts plus a whole-plan deadline.
    /// Gate mode expands to every dimension, runs every invocation
    /// sequentially, and marks all of them critical. Each detected stack gets
    /// its own invocations for stack-specific tools, scoped to its files.
    pub fn plan(
        &self,
        mode: Mode,
        context: &ValidationContext,
        dimensions: &[Dimension],
        registry: &ToolAdapterRegistry,
    ) -> ExecutionPlan {
        let scope = self.scope_for(mode, context);
        let tool_timeout = self.tool_timeout(mode);

        // Gate validates everything: dimensions the mapper left out run at
        // medium priority. Fast drops the security audit.
        let planned: Vec<Dimension> = match mode {
            Mode::Gate => DimensionKind::all()
                .into_iter()
                .map(|kind| {
                    dimensions
                        .iter()
                        .find(|d| d.kind == kind)
                        .cloned()
                        .unwrap_or_else(|| Dimension {
                            kind,
                            priority: Priority::Medium,
                            reason: "gate validates every dimension".to_string(),
                        })
                })
                .collect(),
            Mode::Fast => dimensions
                .iter()
                .filter(|d| d.kind != DimensionKind::SecurityAudit)
                .cloned()
                .collect(),
            _ => dimensions.to_vec(),
        };

        // Suite dedup operates over the whole run, not per dimension: a suite
        // covering lint and test replaces both even when they come from
        // different dimensions.
        let mut requested: Vec<(&'static str, DimensionKind, Priority)> = Vec::new();
        for dimension in &planned {
            for kind in ToolKind::for_dimension(dimension.kind) {
                let name = kind.logical_name();
                if !requested.iter().any(|(n, _, _)| *n == name) {
                    requested.push((name, dimension.kind, dimension.priority));
                }
            }
        }
        let names: Vec<&str> = requested.iter().map(|(n, _, _)| *n).collect();
        let selected = registry.select_tools(&names);

        let stacks: Vec<StackKind> = context.stacks.iter().copied().collect();

        let mut invocations: Vec<ToolInvocation> = Vec::new();
        for tool in selected {
            // A suite inherits dimension and priority from the first tool it
            // covers; a plain tool keeps its own.
            let (dimension, priority) = requested
                .iter()
                .find(|(n, _, _)| *n == tool)
                .or_else(|| {
                    crate::adapter::SUITE_COVERAGE
                        .iter()
                        .find(|(suite, _)| *suite == tool)
                        .and_then(|(_, covers)| {
                            requested.iter().find(|(n, _, _)| covers.contains(n))
                        })
                })
                .map(|(_, d, p)| (*d, *p))
                .unwrap_or((DimensionKind::StaticAnalysis, Priority::Medium));
            let critical = mode == Mode::Gate || priority == Priority::Critical;

            for stack in invocation_stacks(&tool, &stacks, registry) {
                invocations.push(ToolInvocation {
                    tool: tool.clone(),
                    dimension,
                    priority,
                    critical,
                    stack,
                    scope: scope_for_stack(&scope, stack),
                    args: Vec::new(),
                    timeout: tool_timeout,
                });
            }
        }

        let concurrency = if mode == Mode::Gate {
            1
        } else {
            self.orchestration.max_concurrency
        };

        let global_deadline = match mode {
            Mode::Fast => Some(Duration::from_secs(self.orchestration.fast_deadline_secs)),
            _ => self
                .orchestration
                .global_deadline_secs
                .map(Duration::from_secs),
        };

        debug!(
            mode = %mode,
            invocations = invocations.len(),
            concurrency,
            "Built execution plan"
        );

        ExecutionPlan {
            mode,
            concurrency,
            global_deadline,
            invocations,
        }
    }

    fn scope_for(&self, mode: Mode, context: &ValidationContext) -> ToolScope {
        let paths = context
            .files
            .iter()
            .filter(|f| mode != Mode::Fast || f.staged)
            .map(|f| f.path.clone())
            .collect();
        ToolScope {
            paths,
            pattern: context.scope.clone(),
        }
    }

    fn tool_timeout(&self, mode: Mode) -> Duration {
        match mode {
            Mode::Fast => Duration::from_secs(self.orchestration.fast_tool_timeout_secs),
            _ => Duration::from_secs(self.orchestration.tool_timeout_secs),
        }
    }
}
