//! Error types for the validation orchestrator.
//!
//! The taxonomy follows the propagation policy: tool-level faults on
//! non-critical tools are absorbed into the report as failed results and never
//! appear here; everything below aborts the run with a diagnostic naming the
//! failing component and a remediation hint where one exists.

use thiserror::Error;

/// Baseline-store errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Baseline database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Corrupt baseline record for bucket '{bucket}': {reason}")]
    CorruptRecord { bucket: String, reason: String },
}

/// Fatal orchestrator errors.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Workspace state could not be read. Aborts before any tool runs.
    #[error("Workspace state could not be read: {0}")]
    Context(String),

    /// No dimension could be determined and no fallback applies.
    #[error("Planning failed: {0}")]
    Planning(String),

    /// A required external dependency is entirely missing. Triggers at most
    /// one mode fallback before becoming fatal.
    #[error("Infrastructure failure in {component}: {reason}. Remediation: {remediation}")]
    Infrastructure {
        component: String,
        reason: String,
        remediation: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<config::ConfigError> for OrchestratorError {
    fn from(err: config::ConfigError) -> Self {
        OrchestratorError::Config(err.to_string())
    }
}
