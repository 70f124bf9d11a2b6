//! CLI surface: clap definitions in `parse`, dispatch in `route`.

pub mod parse;
pub mod route;

pub use parse::{BaselineCommands, Cli, Commands};
pub use route::{CommandOutput, RunContext};

use crate::error::OrchestratorError;

/// Map an orchestrator error to a user-facing message.
pub fn map_error(error: &OrchestratorError) -> String {
    match error {
        OrchestratorError::Context(msg) => {
            format!("Could not read workspace state: {}\nIs this a git repository?", msg)
        }
        OrchestratorError::Planning(msg) => format!("Cannot plan this run: {}", msg),
        OrchestratorError::Infrastructure {
            component,
            reason,
            remediation,
        } => format!(
            "Infrastructure failure in '{}': {}\n  remediation: {}",
            component, reason, remediation
        ),
        OrchestratorError::Config(msg) => format!("Configuration error: {}", msg),
        OrchestratorError::Storage(err) => format!("Baseline storage error: {}", err),
    }
}
