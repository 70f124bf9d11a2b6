//! Workspace access boundary.
//!
//! The orchestrator reads workspace state through the narrow `WorkspaceReader`
//! interface: current branch plus changed files split by staged status.
//! `GitWorkspace` shells out to git; `StaticWorkspace` backs tests and any
//! caller that already knows its change set.

use crate::error::OrchestratorError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;

/// A changed file with its staged flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    pub path: PathBuf,
    pub staged: bool,
}

impl ChangedFile {
    pub fn staged(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            staged: true,
        }
    }

    pub fn unstaged(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            staged: false,
        }
    }
}

/// Narrow read-only view of workspace state.
pub trait WorkspaceReader: Send + Sync {
    fn current_branch(&self) -> Result<String, OrchestratorError>;

    /// Changed file paths, relative to the workspace root.
    fn changed_files(&self, staged: bool) -> Result<Vec<PathBuf>, OrchestratorError>;
}

/// Git-backed workspace reader.
pub struct GitWorkspace {
    root: PathBuf,
}

impl GitWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn git(&self, args: &[&str]) -> Result<String, OrchestratorError> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.root)
            .args(args)
            .output()
            .map_err(|e| {
                OrchestratorError::Context(format!("failed to run git {}: {}", args.join(" "), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OrchestratorError::Context(format!(
                "git {} exited with {}: {}",
                args.join(" "),
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl WorkspaceReader for GitWorkspace {
    fn current_branch(&self) -> Result<String, OrchestratorError> {
        let out = self.git(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        Ok(out.trim().to_string())
    }

    fn changed_files(&self, staged: bool) -> Result<Vec<PathBuf>, OrchestratorError> {
        let out = if staged {
            self.git(&["diff", "--name-only", "--cached"])?
        } else {
            self.git(&["diff", "--name-only"])?
        };
        Ok(out
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(PathBuf::from)
            .collect())
    }
}

/// In-memory workspace reader for tests and pre-resolved change sets.
#[derive(Debug, Clone, Default)]
pub struct StaticWorkspace {
    pub branch: String,
    pub staged: Vec<PathBuf>,
    pub unstaged: Vec<PathBuf>,
}

impl StaticWorkspace {
    pub fn new(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            staged: Vec::new(),
            unstaged: Vec::new(),
        }
    }

    pub fn with_staged(mut self, paths: &[&str]) -> Self {
        self.staged.extend(paths.iter().map(PathBuf::from));
        self
    }

    pub fn with_unstaged(mut self, paths: &[&str]) -> Self {
        self.unstaged.extend(paths.iter().map(PathBuf::from));
        self
    }
}

impl WorkspaceReader for StaticWorkspace {
    fn current_branch(&self) -> Result<String, OrchestratorError> {
        Ok(self.branch.clone())
    }

    fn changed_files(&self, staged: bool) -> Result<Vec<PathBuf>, OrchestratorError> {
        Ok(if staged {
            self.staged.clone()
        } else {
            self.unstaged.clone()
        })
    }
}
