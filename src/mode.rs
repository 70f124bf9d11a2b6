//! Mode selection state machine.
//!
//! A single authoritative resolver decides the active mode from the requested
//! mode, the context's risk signals, and the development-only override flag.
//! Fallback edges are an explicit table; every transition is recorded so the
//! report can show exactly why a mode was (or was not) honored.

use crate::context::ValidationContext;
use crate::error::OrchestratorError;
use crate::types::Mode;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A recorded fallback transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackRecord {
    pub from: Mode,
    pub to: Mode,
    pub reason: String,
}

/// The outcome of mode resolution, carried into the report verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeResolution {
    /// The mode that will run
    pub mode: Mode,
    /// What the caller asked for, if anything
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested: Option<Mode>,
    /// The mode mandated by risk signals, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mandated: Option<Mode>,
    /// False when the override flag suppressed a mandated mode
    pub compliant: bool,
    /// True when the override flag was exercised
    pub overridden: bool,
    /// Human-readable resolution rationale
    pub reason: String,
    /// Fallback taken during execution, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackRecord>,
}

impl ModeResolution {
    /// Record a fallback transition. The resolution keeps at most one; the
    /// orchestrator treats a second infrastructure failure as fatal.
    pub fn record_fallback(&mut self, to: Mode, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(from = %self.mode, to = %to, %reason, "Mode fallback");
        self.fallback = Some(FallbackRecord {
            from: self.mode,
            to,
            reason,
        });
        self.mode = to;
    }
}

/// Resolve the active mode.
///
/// Rigor order: `Fast < Automatic = Scope < Gate`. Risk signals mandate Gate;
/// a lower-rigor request loses the conflict unless the override flag is set,
/// in which case the request is honored but flagged non-compliant.
pub fn resolve(
    requested: Option<Mode>,
    context: &ValidationContext,
    override_flag: bool,
) -> Result<ModeResolution, OrchestratorError> {
    if requested == Some(Mode::Scope) && context.scope.is_none() {
        return Err(OrchestratorError::Planning(
            "Scope mode requires an explicit --scope path or glob".to_string(),
        ));
    }

    let base = match requested {
        Some(mode) => mode,
        None if context.scope.is_some() => Mode::Scope,
        None => Mode::Automatic,
    };

    let mandated = if context.risk.any() {
        Some(Mode::Gate)
    } else {
        None
    };

    let resolution = match mandated {
        Some(gate) if base.rigor() < gate.rigor() => {
            if override_flag {
                warn!(
                    requested = %base,
                    mandated = %gate,
                    "Gate mandate overridden by development flag; run is non-compliant"
                );
                ModeResolution {
                    mode: base,
                    requested,
                    mandated,
                    compliant: false,
                    overridden: true,
                    reason: format!(
                        "{} mandated by risk signals but overridden to {} (development override)",
                        gate, base
                    ),
                    fallback: None,
                }
            } else {
                ModeResolution {
                    mode: gate,
                    requested,
                    mandated,
                    compliant: true,
                    overridden: false,
                    reason: risk_reason(context, requested),
                    fallback: None,
                }
            }
        }
        Some(gate) => ModeResolution {
            mode: gate,
            requested,
            mandated,
            compliant: true,
            overridden: false,
            reason: risk_reason(context, requested),
            fallback: None,
        },
        None => ModeResolution {
            mode: base,
            requested,
            mandated: None,
            compliant: true,
            overridden: false,
            reason: match requested {
                Some(mode) => format!("{} requested explicitly", mode),
                None if context.scope.is_some() => {
                    "scope mode selected for explicit scope".to_string()
                }
                None => "automatic mode selected by default".to_string(),
            },
            fallback: None,
        },
    };

    info!(mode = %resolution.mode, compliant = resolution.compliant, "Resolved execution mode");
    Ok(resolution)
}

fn risk_reason(context: &ValidationContext, requested: Option<Mode>) -> String {
    let mut causes = Vec::new();
    if context.risk.release_branch {
        causes.push(format!("release branch '{}'", context.branch));
    }
    if !context.risk.keyword_hits.is_empty() {
        causes.push(format!(
            "sensitive paths ({})",
            context.risk.keyword_hits.join(", ")
        ));
    }
    match requested {
        Some(mode) if mode != Mode::Gate => format!(
            "gate mandated by {}; {} request denied",
            causes.join(" and "),
            mode
        ),
        _ => format!("gate mandated by {}", causes.join(" and ")),
    }
}

/// Fallback edge table. Safer means more deterministic and more
/// comprehensive, so every chain terminates at sequential Gate; Gate itself
/// has nowhere left to go.
pub fn fallback_target(mode: Mode) -> Option<Mode> {
    match mode {
        Mode::Fast => Some(Mode::Automatic),
        Mode::Scope => Some(Mode::Automatic),
        Mode::Automatic => Some(Mode::Gate),
        Mode::Gate => None,
    }
}
