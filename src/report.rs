//! Report assembly.
//!
//! Merges execution results, the mode resolution, and the governance verdict
//! into one report with a single overall status. Merging keeps the worst
//! status seen: a failed critical check or a governance hard fail means
//! Failed, any non-critical failure or degradation means Warning, and only a
//! fully clean run is Passed. Gate mode treats a degraded governance verdict
//! as failing, since a gate release must hold the performance line too.
//! Renders as a text summary or as JSON.

use crate::context::ValidationContext;
use crate::dimension::Dimension;
use crate::executor::{ExecutionMetrics, ExecutionResult};
use crate::governor::{GovernanceLevel, GovernanceVerdict};
use crate::mode::ModeResolution;
use crate::types::{DimensionKind, Mode, OverallStatus, StackKind};
use chrono::{DateTime, Utc};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Condensed context carried into the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSummary {
    pub branch: String,
    pub file_count: usize,
    pub staged_count: usize,
    pub stacks: Vec<StackKind>,
    pub confidence: f64,
    pub release_branch: bool,
    pub keyword_hits: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl ContextSummary {
    pub fn from_context(context: &ValidationContext) -> Self {
        Self {
            branch: context.branch.clone(),
            file_count: context.scope_size(),
            staged_count: context.staged_count(),
            stacks: context.stacks.iter().copied().collect(),
            confidence: context.confidence,
            release_branch: context.risk.release_branch,
            keyword_hits: context.risk.keyword_hits.clone(),
            scope: context.scope.clone(),
        }
    }
}

/// Per-dimension rollup of tool results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionSummary {
    pub dimension: DimensionKind,
    pub status: OverallStatus,
    pub tools: usize,
    pub errors: usize,
    pub warnings: usize,
    pub failed_tools: Vec<String>,
}

/// The complete report for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub status: OverallStatus,
    pub mode: Mode,
    pub resolution: ModeResolution,
    pub context: ContextSummary,
    pub dimensions: Vec<DimensionSummary>,
    pub tools: Vec<ExecutionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub governance: Option<GovernanceVerdict>,
    pub duration_ms: u64,
    pub generated_at: DateTime<Utc>,
    /// True when the change set was empty and nothing ran
    pub no_op: bool,
}

impl Report {
    /// Assemble the report for a run that executed a plan.
    pub fn assemble(
        resolution: ModeResolution,
        context: &ValidationContext,
        dimensions: &[Dimension],
        results: Vec<ExecutionResult>,
        governance: Option<GovernanceVerdict>,
        metrics: &ExecutionMetrics,
    ) -> Report {
        let dimension_summaries = summarize_dimensions(dimensions, &results);
        let status = overall_status(&resolution, &results, governance.as_ref());

        Report {
            status,
            mode: resolution.mode,
            resolution,
            context: ContextSummary::from_context(context),
            dimensions: dimension_summaries,
            tools: results,
            governance,
            duration_ms: metrics.total_duration_ms,
            generated_at: Utc::now(),
            no_op: false,
        }
    }

    /// The report for an empty change set: nothing ran, status Passed.
    pub fn no_op(resolution: ModeResolution, context: &ValidationContext) -> Report {
        Report {
            status: OverallStatus::Passed,
            mode: resolution.mode,
            resolution,
            context: ContextSummary::from_context(context),
            dimensions: Vec::new(),
            tools: Vec::new(),
            governance: None,
            duration_ms: 0,
            generated_at: Utc::now(),
            no_op: true,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Render the human-readable summary.
    pub fn to_text(&self, color: bool) -> String {
        let mut out = String::new();

        let status_str = if color {
            match self.status {
                OverallStatus::Passed => self.status.as_str().green().to_string(),
                OverallStatus::Warning => self.status.as_str().yellow().to_string(),
                OverallStatus::Failed => self.status.as_str().red().to_string(),
            }
        } else {
            self.status.as_str().to_string()
        };

        let _ = writeln!(out, "Validation: {}", status_str);
        let _ = writeln!(
            out,
            "Mode: {} ({})",
            self.mode, self.resolution.reason
        );
        if let Some(ref fallback) = self.resolution.fallback {
            let _ = writeln!(
                out,
                "Fallback: {} -> {} ({})",
                fallback.from, fallback.to, fallback.reason
            );
        }
        if !self.resolution.compliant {
            let _ = writeln!(out, "NON-COMPLIANT: a mandated gate was overridden");
        }
        let _ = writeln!(
            out,
            "Branch: {} ({} files, confidence {:.2})",
            self.context.branch, self.context.file_count, self.context.confidence
        );

        if self.no_op {
            let _ = writeln!(out, "No changed files; nothing to validate.");
            return out;
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Dimension", "Status", "Tools", "Errors", "Warnings"]);
        for summary in &self.dimensions {
            table.add_row(vec![
                Cell::new(summary.dimension.as_str()),
                Cell::new(summary.status.as_str()),
                Cell::new(summary.tools),
                Cell::new(summary.errors),
                Cell::new(summary.warnings),
            ]);
        }
        let _ = writeln!(out, "{}", table);

        for result in self.tools.iter().filter(|r| !r.success) {
            let detail = result
                .fault_detail
                .clone()
                .or_else(|| result.violations.first().map(|v| v.message.clone()))
                .unwrap_or_else(|| "failed".to_string());
            let _ = writeln!(
                out,
                "  {} {}: {}",
                if result.critical { "[critical]" } else { "[warning]" },
                result.tool,
                detail
            );
        }

        if let Some(ref verdict) = self.governance {
            let level = match verdict.level {
                GovernanceLevel::Pass => "within limits",
                GovernanceLevel::Degraded => "degraded",
                GovernanceLevel::HardFail => "ceiling breached",
            };
            let _ = write!(
                out,
                "Performance: {} ({}ms, bucket {}",
                level, verdict.duration_ms, verdict.bucket
            );
            if let Some(baseline) = verdict.baseline_ms {
                let _ = write!(out, ", baseline {}ms", baseline);
            }
            let _ = writeln!(out, ")");
            if let Some(ref recommendation) = verdict.recommendation {
                let _ = writeln!(out, "  recommendation: {}", recommendation);
            }
            if verdict.drift_flagged {
                let _ = writeln!(out, "  note: baseline drift detected over recent runs");
            }
        }

        let _ = writeln!(out, "Total: {}ms", self.duration_ms);
        out
    }
}

fn summarize_dimensions(
    dimensions: &[Dimension],
    results: &[ExecutionResult],
) -> Vec<DimensionSummary> {
    let mut by_dimension: BTreeMap<DimensionKind, Vec<&ExecutionResult>> = BTreeMap::new();
    for dimension in dimensions {
        by_dimension.entry(dimension.kind).or_default();
    }
    for result in results {
        by_dimension.entry(result.dimension).or_default().push(result);
    }

    by_dimension
        .into_iter()
        .map(|(dimension, results)| {
            let errors = results
                .iter()
                .flat_map(|r| &r.violations)
                .filter(|v| v.severity == crate::adapter::Severity::Error)
                .count();
            let warnings = results
                .iter()
                .flat_map(|r| &r.violations)
                .filter(|v| v.severity == crate::adapter::Severity::Warning)
                .count();
            let failed_tools: Vec<String> = results
                .iter()
                .filter(|r| !r.success)
                .map(|r| r.tool.clone())
                .collect();

            let status = if results.iter().any(|r| !r.success && r.critical) {
                OverallStatus::Failed
            } else if !failed_tools.is_empty() || warnings > 0 {
                OverallStatus::Warning
            } else {
                OverallStatus::Passed
            };

            DimensionSummary {
                dimension,
                status,
                tools: results.len(),
                errors,
                warnings,
                failed_tools,
            }
        })
        .collect()
}

fn overall_status(
    resolution: &ModeResolution,
    results: &[ExecutionResult],
    governance: Option<&GovernanceVerdict>,
) -> OverallStatus {
    let mut status = OverallStatus::Passed;

    for result in results {
        if !result.success {
            status = status.merge(if result.critical {
                OverallStatus::Failed
            } else {
                OverallStatus::Warning
            });
        }
    }

    if let Some(verdict) = governance {
        status = status.merge(match verdict.level {
            GovernanceLevel::HardFail => OverallStatus::Failed,
            // A governance violation blocks a gate, not just the ceiling.
            GovernanceLevel::Degraded if resolution.mode == Mode::Gate => OverallStatus::Failed,
            GovernanceLevel::Degraded => OverallStatus::Warning,
            GovernanceLevel::Pass => OverallStatus::Passed,
        });
    }

    // An overridden gate can never report a fully clean run.
    if !resolution.compliant {
        status = status.merge(OverallStatus::Warning);
    }

    status
}
