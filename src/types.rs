//! Shared vocabulary for the validation orchestrator: modes, priorities,
//! dimensions, technology stacks, and scope-size buckets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution mode. Exactly one mode is active per run; transitions between
/// modes (fallback) are explicit and recorded, never silent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Automatic,
    Fast,
    Scope,
    Gate,
}

impl Mode {
    /// Relative rigor used for conflict resolution. Gate always wins a
    /// conflict; Fast always loses one.
    pub fn rigor(&self) -> u8 {
        match self {
            Mode::Fast => 0,
            Mode::Automatic | Mode::Scope => 1,
            Mode::Gate => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Automatic => "automatic",
            Mode::Fast => "fast",
            Mode::Scope => "scope",
            Mode::Gate => "gate",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "automatic" | "auto" => Ok(Mode::Automatic),
            "fast" => Ok(Mode::Fast),
            "scope" => Ok(Mode::Scope),
            "gate" => Ok(Mode::Gate),
            other => Err(format!(
                "Unknown mode '{}' (expected automatic, fast, scope, or gate)",
                other
            )),
        }
    }
}

/// Overall run status. Ordering matters: `Failed > Warning > Passed`, and
/// merging results from multiple batches preserves the worst status seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Passed,
    Warning,
    Failed,
}

impl OverallStatus {
    /// Merge two statuses, keeping the worse of the two.
    pub fn merge(self, other: OverallStatus) -> OverallStatus {
        self.max(other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Passed => "passed",
            OverallStatus::Warning => "warning",
            OverallStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority tier assigned to a dimension by the mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named validation category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DimensionKind {
    StaticAnalysis,
    TestCoverage,
    BuildIntegrity,
    SecurityAudit,
}

impl DimensionKind {
    /// All dimensions, in deterministic order. Used by the comprehensive
    /// fallback and by Gate mode.
    pub fn all() -> [DimensionKind; 4] {
        [
            DimensionKind::StaticAnalysis,
            DimensionKind::TestCoverage,
            DimensionKind::BuildIntegrity,
            DimensionKind::SecurityAudit,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DimensionKind::StaticAnalysis => "static-analysis",
            DimensionKind::TestCoverage => "test-coverage",
            DimensionKind::BuildIntegrity => "build-integrity",
            DimensionKind::SecurityAudit => "security-audit",
        }
    }
}

impl fmt::Display for DimensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Technology stack detected from file extensions and path conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackKind {
    Rust,
    JavaScript,
    TypeScript,
    Python,
    Go,
    Shell,
}

impl StackKind {
    /// Classify a file extension into a stack, if recognized.
    pub fn from_extension(ext: &str) -> Option<StackKind> {
        match ext {
            "rs" => Some(StackKind::Rust),
            "js" | "jsx" | "mjs" | "cjs" => Some(StackKind::JavaScript),
            "ts" | "tsx" => Some(StackKind::TypeScript),
            "py" => Some(StackKind::Python),
            "go" => Some(StackKind::Go),
            "sh" | "bash" => Some(StackKind::Shell),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StackKind::Rust => "rust",
            StackKind::JavaScript => "javascript",
            StackKind::TypeScript => "typescript",
            StackKind::Python => "python",
            StackKind::Go => "go",
            StackKind::Shell => "shell",
        }
    }
}

impl fmt::Display for StackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scope-size bucket keying the performance baseline, by changed-file count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScopeBucket {
    Small,
    Medium,
    Large,
    ExtraLarge,
}

impl ScopeBucket {
    pub fn for_file_count(count: usize) -> ScopeBucket {
        match count {
            0..=5 => ScopeBucket::Small,
            6..=25 => ScopeBucket::Medium,
            26..=100 => ScopeBucket::Large,
            _ => ScopeBucket::ExtraLarge,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeBucket::Small => "small",
            ScopeBucket::Medium => "medium",
            ScopeBucket::Large => "large",
            ScopeBucket::ExtraLarge => "extra-large",
        }
    }
}

impl fmt::Display for ScopeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
