//! Dimension mapping.
//!
//! Classifies changed files into validation dimensions with a priority tier
//! and a selection reason. Classification is cumulative per file: a changed
//! source file always implies static analysis and test coverage; specific
//! rules (test file, manifest, security-named path) add or upgrade on top.
//! Below the confidence floor the mapper deterministically falls back to the
//! comprehensive set instead of guessing narrowly.

use crate::context::ValidationContext;
use crate::types::{DimensionKind, Priority, StackKind};
use crate::workspace::ChangedFile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Confidence floor below which the comprehensive fallback applies.
pub const CONFIDENCE_FLOOR: f64 = 0.5;

/// A selected dimension with its priority and the reason it was selected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dimension {
    pub kind: DimensionKind,
    pub priority: Priority,
    pub reason: String,
}

/// How a single file classifies under the ordered rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileClass {
    /// Test file: test-coverage at critical
    Test,
    /// Config/manifest file: build-integrity at critical
    Manifest,
    /// Source file under an auth/security-named path
    SecuritySource,
    /// Recognized source file (default source rules)
    Source,
    /// Anything else (default rule only)
    Other,
}

fn classify_file(path: &Path) -> FileClass {
    let path_str = path.to_string_lossy().to_lowercase();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if is_test_path(&path_str, &file_name) {
        return FileClass::Test;
    }
    if is_manifest(&file_name) {
        return FileClass::Manifest;
    }

    let is_source = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(StackKind::from_extension)
        .is_some();

    if is_source && is_security_path(&path_str) {
        return FileClass::SecuritySource;
    }
    if is_source {
        return FileClass::Source;
    }
    FileClass::Other
}

fn is_test_path(path_str: &str, file_name: &str) -> bool {
    path_str.contains("/tests/")
        || path_str.starts_with("tests/")
        || path_str.contains("/__tests__/")
        || file_name.contains("_test.")
        || file_name.contains(".test.")
        || file_name.contains(".spec.")
        || file_name.starts_with("test_")
}

fn is_manifest(file_name: &str) -> bool {
    matches!(
        file_name,
        "cargo.toml"
            | "cargo.lock"
            | "package.json"
            | "package-lock.json"
            | "yarn.lock"
            | "pyproject.toml"
            | "requirements.txt"
            | "go.mod"
            | "go.sum"
            | "dockerfile"
            | "makefile"
    ) || file_name.ends_with(".yml")
        || file_name.ends_with(".yaml")
}

fn is_security_path(path_str: &str) -> bool {
    const MARKERS: [&str; 5] = ["auth", "security", "crypto", "login", "secret"];
    path_str
        .split(['/', '\\'])
        .any(|component| MARKERS.iter().any(|m| component.contains(m)))
}

/// Weight a file contributes to the confidence score. Specific rules carry
/// full weight; a plain recognized source file gives partial signal; anything
/// unrecognized gives none.
fn rule_weight(class: FileClass) -> f64 {
    match class {
        FileClass::Test | FileClass::Manifest | FileClass::SecuritySource => 1.0,
        FileClass::Source => 0.6,
        FileClass::Other => 0.0,
    }
}

/// Weighted fraction of files matched by a specific (non-default) rule.
/// Returns 1.0 for an empty set so an empty context never triggers the
/// comprehensive fallback.
pub fn rule_confidence(files: &[ChangedFile]) -> f64 {
    if files.is_empty() {
        return 1.0;
    }
    let total: f64 = files
        .iter()
        .map(|f| rule_weight(classify_file(&f.path)))
        .sum();
    total / files.len() as f64
}

/// Map a context to its dimension set.
///
/// An empty change set yields an empty dimension set. A context below the
/// confidence floor yields the comprehensive set (all dimensions at medium
/// priority); the fallback is deterministic and its trigger is logged.
pub fn map_dimensions(context: &ValidationContext) -> Vec<Dimension> {
    if context.files.is_empty() {
        return Vec::new();
    }

    if context.confidence < CONFIDENCE_FLOOR {
        warn!(
            confidence = context.confidence,
            floor = CONFIDENCE_FLOOR,
            "Low classification confidence; selecting comprehensive dimension set"
        );
        return comprehensive_set(context.confidence);
    }

    let mut selected: BTreeMap<DimensionKind, (Priority, String)> = BTreeMap::new();
    let mut upsert = |kind: DimensionKind, priority: Priority, reason: String| {
        match selected.get(&kind) {
            Some((existing, _)) if *existing >= priority => {}
            _ => {
                selected.insert(kind, (priority, reason));
            }
        }
    };

    for file in &context.files {
        let display = file.path.display().to_string();
        match classify_file(&file.path) {
            FileClass::Test => {
                upsert(
                    DimensionKind::TestCoverage,
                    Priority::Critical,
                    format!("test file changed: {}", display),
                );
            }
            FileClass::Manifest => {
                upsert(
                    DimensionKind::BuildIntegrity,
                    Priority::Critical,
                    format!("manifest changed: {}", display),
                );
            }
            FileClass::SecuritySource => {
                upsert(
                    DimensionKind::SecurityAudit,
                    Priority::High,
                    format!("security-sensitive path changed: {}", display),
                );
                upsert(
                    DimensionKind::StaticAnalysis,
                    Priority::Medium,
                    format!("source file changed: {}", display),
                );
                upsert(
                    DimensionKind::TestCoverage,
                    Priority::Critical,
                    format!("source change requires passing tests: {}", display),
                );
            }
            FileClass::Source => {
                upsert(
                    DimensionKind::StaticAnalysis,
                    Priority::Medium,
                    format!("source file changed: {}", display),
                );
                upsert(
                    DimensionKind::TestCoverage,
                    Priority::Critical,
                    format!("source change requires passing tests: {}", display),
                );
            }
            FileClass::Other => {
                upsert(
                    DimensionKind::StaticAnalysis,
                    Priority::Medium,
                    format!("file changed: {}", display),
                );
            }
        }
    }

    let dimensions: Vec<Dimension> = selected
        .into_iter()
        .map(|(kind, (priority, reason))| Dimension {
            kind,
            priority,
            reason,
        })
        .collect();

    debug!(count = dimensions.len(), "Mapped dimensions");
    dimensions
}

fn comprehensive_set(confidence: f64) -> Vec<Dimension> {
    DimensionKind::all()
        .into_iter()
        .map(|kind| Dimension {
            kind,
            priority: Priority::Medium,
            reason: format!(
                "comprehensive fallback (confidence {:.2} below {:.2})",
                confidence, CONFIDENCE_FLOOR
            ),
        })
        .collect()
}
