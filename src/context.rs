//! Context detection.
//!
//! Inspects workspace state (branch, changed files, optional explicit scope)
//! and produces an immutable `ValidationContext` snapshot: detected stacks,
//! risk signals, and a confidence score. Pure read; never fails on an empty
//! change set.

use crate::config::RiskConfig;
use crate::error::OrchestratorError;
use crate::types::StackKind;
use crate::workspace::{ChangedFile, WorkspaceReader};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

/// Options narrowing what the detector reads.
#[derive(Debug, Clone, Default)]
pub struct DetectOptions {
    /// Explicit path or glob restricting the file set
    pub scope: Option<String>,
    /// Only consider staged files (pre-commit style)
    pub staged_only: bool,
}

/// Risk signals extracted from branch name and changed paths.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskSignals {
    /// Branch name matched a release pattern
    pub release_branch: bool,
    /// Sensitive keywords found in changed paths, sorted and deduplicated
    pub keyword_hits: Vec<String>,
}

impl RiskSignals {
    /// Whether any signal mandates Gate mode.
    pub fn any(&self) -> bool {
        self.release_branch || !self.keyword_hits.is_empty()
    }
}

/// Immutable snapshot of the workspace at detection time. Created once per
/// invocation; never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationContext {
    pub branch: String,
    pub files: Vec<ChangedFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub stacks: BTreeSet<StackKind>,
    pub risk: RiskSignals,
    /// Weighted fraction of files matched by a specific classification rule,
    /// 0.0-1.0
    pub confidence: f64,
}

impl ValidationContext {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn scope_size(&self) -> usize {
        self.files.len()
    }

    pub fn staged_count(&self) -> usize {
        self.files.iter().filter(|f| f.staged).count()
    }
}

/// Context detector. Holds the risk configuration; all reads go through the
/// `WorkspaceReader` boundary.
pub struct ContextDetector {
    risk: RiskConfig,
}

impl ContextDetector {
    pub fn new(risk: RiskConfig) -> Self {
        Self { risk }
    }

    /// Detect the validation context for this invocation.
    pub fn detect(
        &self,
        workspace: &dyn WorkspaceReader,
        options: &DetectOptions,
    ) -> Result<ValidationContext, OrchestratorError> {
        let branch = workspace.current_branch()?;

        let mut files: Vec<ChangedFile> = workspace
            .changed_files(true)?
            .into_iter()
            .map(ChangedFile::staged)
            .collect();
        if !options.staged_only {
            let staged_set: BTreeSet<_> = files.iter().map(|f| f.path.clone()).collect();
            files.extend(
                workspace
                    .changed_files(false)?
                    .into_iter()
                    .filter(|p| !staged_set.contains(p))
                    .map(ChangedFile::unstaged),
            );
        }

        if let Some(ref scope) = options.scope {
            let matcher = ScopeMatcher::new(scope)?;
            files.retain(|f| matcher.matches(&f.path));
        }

        let stacks: BTreeSet<StackKind> = files
            .iter()
            .filter_map(|f| f.path.extension())
            .filter_map(|ext| ext.to_str())
            .filter_map(StackKind::from_extension)
            .collect();

        let release_branch = self
            .risk
            .release_branch_patterns
            .iter()
            .filter_map(|p| glob::Pattern::new(p).ok())
            .any(|p| p.matches(&branch));

        let mut keyword_hits: BTreeSet<String> = BTreeSet::new();
        for file in &files {
            let path_str = file.path.to_string_lossy().to_lowercase();
            for keyword in &self.risk.sensitive_keywords {
                if path_str.contains(keyword.as_str()) {
                    keyword_hits.insert(keyword.clone());
                }
            }
        }

        let confidence = crate::dimension::rule_confidence(&files);

        debug!(
            branch = %branch,
            files = files.len(),
            release_branch,
            keywords = keyword_hits.len(),
            confidence,
            "Detected validation context"
        );

        Ok(ValidationContext {
            branch,
            files,
            scope: options.scope.clone(),
            stacks,
            risk: RiskSignals {
                release_branch,
                keyword_hits: keyword_hits.into_iter().collect(),
            },
            confidence,
        })
    }
}

/// Scope matcher: a glob pattern, or a plain path treated as a prefix.
pub struct ScopeMatcher {
    pattern: Option<glob::Pattern>,
    prefix: Option<String>,
}

impl ScopeMatcher {
    pub fn new(scope: &str) -> Result<Self, OrchestratorError> {
        let is_glob = scope.contains(['*', '?', '[']);
        if is_glob {
            let pattern = glob::Pattern::new(scope).map_err(|e| {
                OrchestratorError::Planning(format!("Invalid scope pattern '{}': {}", scope, e))
            })?;
            Ok(Self {
                pattern: Some(pattern),
                prefix: None,
            })
        } else {
            Ok(Self {
                pattern: None,
                prefix: Some(scope.trim_end_matches('/').to_string()),
            })
        }
    }

    pub fn matches(&self, path: &Path) -> bool {
        if let Some(ref pattern) = self.pattern {
            return pattern.matches_path(path);
        }
        if let Some(ref prefix) = self.prefix {
            let path_str = path.to_string_lossy();
            return path_str == prefix.as_str()
                || path_str.starts_with(&format!("{}/", prefix));
        }
        false
    }
}
