//! Tool adapter boundary.
//!
//! Adapters are the only code that touches external tools: `invoke` spawns
//! the tool against an isolated scope and `parse` normalizes its output into
//! violations. The registry is a factory keyed by logical tool name and
//! stack; batch
//! ("suite") adapters cover several logical tools at once, and the coverage
//! table deciding which individual tools a suite replaces is static, never
//! inferred at runtime. Adapter resolution happens once at plan time into a
//! write-once cache that execution reads without locks.

use crate::config::{CommandSpec, ToolsConfig};
use crate::types::{DimensionKind, StackKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Severity of a normalized violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A normalized tool finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    pub rule: String,
    pub message: String,
    pub severity: Severity,
}

/// Raw output captured from one tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawToolOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl RawToolOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Isolated input for one invocation: the file scope the tool should examine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolScope {
    pub paths: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// Invocation-level failures, kept distinguishable so the executor can tell a
/// missing runtime from a timeout from an ordinary spawn error.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("executable '{program}' not found")]
    MissingRuntime { program: String },

    #[error("'{tool}' timed out after {after_ms}ms")]
    Timeout { tool: String, after_ms: u64 },

    #[error("failed to spawn '{program}': {message}")]
    Spawn { program: String, message: String },
}

/// External tool boundary. The orchestrator never parses tool-specific output
/// beyond this contract.
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    fn name(&self) -> &str;

    /// Run the tool against a scope with extra arguments, under a timeout
    /// that forcibly terminates the process when exceeded.
    async fn invoke(
        &self,
        scope: &ToolScope,
        args: &[String],
        timeout: Duration,
    ) -> Result<RawToolOutput, InvokeError>;

    /// Normalize raw output into violations.
    fn parse(&self, raw: &RawToolOutput) -> Vec<Violation>;
}

/// Logical tool enumeration. Registering a new adapter type means adding a
/// variant and a factory arm; existing adapters are never edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolKind {
    Lint,
    Test,
    Build,
    DependencyAudit,
    SecurityScan,
}

impl ToolKind {
    pub fn logical_name(&self) -> &'static str {
        match self {
            ToolKind::Lint => "lint",
            ToolKind::Test => "test",
            ToolKind::Build => "build",
            ToolKind::DependencyAudit => "dependency-audit",
            ToolKind::SecurityScan => "security-scan",
        }
    }

    /// Tools backing each dimension, in invocation order.
    pub fn for_dimension(dimension: DimensionKind) -> &'static [ToolKind] {
        match dimension {
            DimensionKind::StaticAnalysis => &[ToolKind::Lint],
            DimensionKind::TestCoverage => &[ToolKind::Test],
            DimensionKind::BuildIntegrity => &[ToolKind::Build, ToolKind::DependencyAudit],
            DimensionKind::SecurityAudit => &[ToolKind::SecurityScan],
        }
    }
}

/// Static coverage table: which logical tools each known suite adapter
/// replaces. The skip decision during plan resolution reads this table only.
pub const SUITE_COVERAGE: &[(&str, &[&str])] =
    &[("ci-suite", &["lint", "test", "build"])];

/// Built-in command for a (stack, tool) pair. Deployments override per tool
/// through `[tools.commands]`.
fn builtin_command(stack: StackKind, kind: ToolKind) -> Option<CommandSpec> {
    match (stack, kind) {
        (StackKind::Rust, ToolKind::Lint) => {
            Some(CommandSpec::new("cargo", &["clippy", "--quiet", "--message-format=short"]))
        }
        (StackKind::Rust, ToolKind::Test) => Some(CommandSpec::new("cargo", &["test", "--quiet"])),
        (StackKind::Rust, ToolKind::Build) => Some(CommandSpec::new("cargo", &["check", "--quiet"])),
        (StackKind::Rust, ToolKind::DependencyAudit | ToolKind::SecurityScan) => {
            Some(CommandSpec::new("cargo", &["audit"]))
        }
        (StackKind::JavaScript | StackKind::TypeScript, ToolKind::Lint) => {
            Some(CommandSpec::new("npx", &["eslint", "--format", "unix"]))
        }
        (StackKind::JavaScript | StackKind::TypeScript, ToolKind::Test) => {
            Some(CommandSpec::new("npm", &["test", "--silent"]))
        }
        (StackKind::TypeScript, ToolKind::Build) => {
            Some(CommandSpec::new("npx", &["tsc", "--noEmit"]))
        }
        (StackKind::JavaScript, ToolKind::Build) => {
            Some(CommandSpec::new("npm", &["run", "build", "--silent"]))
        }
        (
            StackKind::JavaScript | StackKind::TypeScript,
            ToolKind::DependencyAudit | ToolKind::SecurityScan,
        ) => Some(CommandSpec::new("npm", &["audit", "--audit-level=high"])),
        (StackKind::Python, ToolKind::Lint) => Some(CommandSpec::new("ruff", &["check"])),
        (StackKind::Python, ToolKind::Test) => Some(CommandSpec::new("pytest", &["-q"])),
        (StackKind::Python, ToolKind::Build) => {
            Some(CommandSpec::new("python", &["-m", "compileall", "-q", "."]))
        }
        (StackKind::Python, ToolKind::DependencyAudit) => Some(CommandSpec::new("pip-audit", &[])),
        (StackKind::Python, ToolKind::SecurityScan) => {
            Some(CommandSpec::new("bandit", &["-q", "-r", "."]))
        }
        (StackKind::Go, ToolKind::Lint) => Some(CommandSpec::new("go", &["vet", "./..."])),
        (StackKind::Go, ToolKind::Test) => Some(CommandSpec::new("go", &["test", "./..."])),
        (StackKind::Go, ToolKind::Build) => Some(CommandSpec::new("go", &["build", "./..."])),
        (StackKind::Go, ToolKind::DependencyAudit | ToolKind::SecurityScan) => {
            Some(CommandSpec::new("govulncheck", &["./..."]))
        }
        (StackKind::Shell, ToolKind::Lint) => Some(CommandSpec::new("shellcheck", &[])),
        (StackKind::Shell, _) => None,
    }
}

/// Command-backed adapter: spawns a process, captures output, and parses
/// GNU-style `file:line:col: message` diagnostics.
pub struct CommandAdapter {
    name: String,
    spec: CommandSpec,
    pass_scope_paths: bool,
}

impl CommandAdapter {
    pub fn new(name: impl Into<String>, spec: CommandSpec, pass_scope_paths: bool) -> Self {
        Self {
            name: name.into(),
            spec,
            pass_scope_paths,
        }
    }
}

#[async_trait]
impl ToolAdapter for CommandAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(
        &self,
        scope: &ToolScope,
        args: &[String],
        timeout: Duration,
    ) -> Result<RawToolOutput, InvokeError> {
        let start = Instant::now();

        let mut command = Command::new(&self.spec.program);
        command
            .args(&self.spec.args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the future must not orphan the tool process.
            .kill_on_drop(true);
        if self.pass_scope_paths {
            command.args(scope.paths.iter());
        }

        debug!(tool = %self.name, program = %self.spec.program, "Invoking tool");

        let child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                InvokeError::MissingRuntime {
                    program: self.spec.program.clone(),
                }
            } else {
                InvokeError::Spawn {
                    program: self.spec.program.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| InvokeError::Timeout {
                tool: self.name.clone(),
                after_ms: timeout.as_millis() as u64,
            })?
            .map_err(|e| InvokeError::Spawn {
                program: self.spec.program.clone(),
                message: e.to_string(),
            })?;

        Ok(RawToolOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn parse(&self, raw: &RawToolOutput) -> Vec<Violation> {
        let mut violations: Vec<Violation> = raw
            .stdout
            .lines()
            .chain(raw.stderr.lines())
            .filter_map(|line| parse_diagnostic_line(&self.name, line))
            .collect();

        // A failing tool that prints nothing parseable still yields exactly
        // one violation, so failures are never invisible in the report.
        if !raw.succeeded() && violations.is_empty() {
            let detail = last_nonempty_line(&raw.stderr)
                .or_else(|| last_nonempty_line(&raw.stdout))
                .unwrap_or_else(|| format!("exited with status {}", raw.exit_code));
            violations.push(Violation {
                file: None,
                line: None,
                column: None,
                rule: format!("{}/exit-status", self.name),
                message: detail,
                severity: Severity::Error,
            });
        }

        violations
    }
}

fn last_nonempty_line(text: &str) -> Option<String> {
    text.lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}

/// Parse a GNU-style diagnostic: `file:line:col: message` or
/// `file:line: message`. Lines that do not match are ignored.
fn parse_diagnostic_line(tool: &str, line: &str) -> Option<Violation> {
    let mut parts = line.splitn(4, ':');
    let file = parts.next()?.trim();
    if file.is_empty() || file.contains(' ') {
        return None;
    }
    let line_no: u32 = parts.next()?.trim().parse().ok()?;

    let rest_a = parts.next()?;
    let (column, message) = match rest_a.trim().parse::<u32>() {
        Ok(col) => (Some(col), parts.next()?.trim().to_string()),
        Err(_) => {
            let mut message = rest_a.trim().to_string();
            if let Some(tail) = parts.next() {
                message.push(':');
                message.push_str(tail.trim_end());
            }
            (None, message)
        }
    };
    if message.is_empty() {
        return None;
    }

    let severity = if message.to_lowercase().contains("warning") {
        Severity::Warning
    } else {
        Severity::Error
    };

    Some(Violation {
        file: Some(file.to_string()),
        line: Some(line_no),
        column,
        rule: format!("{}/diagnostic", tool),
        message,
        severity,
    })
}

/// Adapters resolved for one plan, keyed by (tool, stack) since the same
/// logical tool resolves to different commands per stack. Populated once
/// during plan resolution and read-only afterwards, so concurrent execution
/// needs no locks.
#[derive(Clone, Default)]
pub struct ResolvedAdapters {
    adapters: HashMap<(String, Option<StackKind>), Arc<dyn ToolAdapter>>,
}

impl ResolvedAdapters {
    pub fn get(&self, tool: &str, stack: Option<StackKind>) -> Option<Arc<dyn ToolAdapter>> {
        self.adapters.get(&(tool.to_string(), stack)).cloned()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

/// How one catalog entry resolves, for the `tools` listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescription {
    pub tool: String,
    /// "suite", "override", "builtin", or "unresolved"
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Factory for tool adapters: config overrides first, then the built-in
/// per-stack catalog. Built adapters are memoized so repeated plan
/// resolutions (fallback re-plans) reuse them.
pub struct ToolAdapterRegistry {
    tools: ToolsConfig,
    built: parking_lot::RwLock<HashMap<(String, Option<StackKind>), Arc<dyn ToolAdapter>>>,
}

impl ToolAdapterRegistry {
    pub fn new(tools: ToolsConfig) -> Self {
        Self {
            tools,
            built: parking_lot::RwLock::new(HashMap::new()),
        }
    }

    /// Apply suite dedup to a list of logical tool names: each enabled suite
    /// that covers any requested tool is selected once, and the tools it
    /// covers are skipped. Order is deterministic (suites first, by table
    /// order, then remaining tools in request order).
    pub fn select_tools(&self, requested: &[&str]) -> Vec<String> {
        let mut covered: Vec<&str> = Vec::new();
        let mut selected: Vec<String> = Vec::new();

        for (suite, covers) in SUITE_COVERAGE {
            if !self.tools.suites.contains_key(*suite) {
                continue;
            }
            if requested.iter().any(|tool| covers.contains(tool)) {
                selected.push((*suite).to_string());
                covered.extend(covers.iter().copied());
            }
        }

        for tool in requested {
            if covered.contains(tool) {
                debug!(tool = *tool, "Skipping tool already covered by a suite adapter");
                continue;
            }
            if !selected.iter().any(|s| s == tool) {
                selected.push((*tool).to_string());
            }
        }

        selected
    }

    /// Whether resolution of this tool depends on the stack. Suites and
    /// configured command overrides are stack-agnostic; everything else
    /// resolves through the built-in per-stack catalog.
    pub fn is_stack_specific(&self, tool: &str) -> bool {
        !self.tools.suites.contains_key(tool) && !self.tools.commands.contains_key(tool)
    }

    /// Build one adapter, or `None` when nothing backs the tool for this
    /// stack (surfaces later as an unresolved-adapter fault on the result).
    pub fn build(&self, tool: &str, stack: Option<StackKind>) -> Option<Arc<dyn ToolAdapter>> {
        let key = (tool.to_string(), stack);
        if let Some(adapter) = self.built.read().get(&key) {
            return Some(Arc::clone(adapter));
        }
        let adapter = self.construct(tool, stack)?;
        self.built.write().insert(key, Arc::clone(&adapter));
        Some(adapter)
    }

    fn construct(&self, tool: &str, stack: Option<StackKind>) -> Option<Arc<dyn ToolAdapter>> {
        if let Some(spec) = self.tools.suites.get(tool) {
            return Some(Arc::new(CommandAdapter::new(tool, spec.clone(), false)));
        }
        if let Some(spec) = self.tools.commands.get(tool) {
            return Some(Arc::new(CommandAdapter::new(tool, spec.clone(), false)));
        }

        let kind = match tool {
            "lint" => ToolKind::Lint,
            "test" => ToolKind::Test,
            "build" => ToolKind::Build,
            "dependency-audit" => ToolKind::DependencyAudit,
            "security-scan" => ToolKind::SecurityScan,
            _ => return None,
        };
        let spec = builtin_command(stack?, kind)?;
        // Built-in linters take the changed files as positional arguments;
        // project-wide commands (test, build, audits) do not.
        let pass_scope = matches!(kind, ToolKind::Lint) && stack != Some(StackKind::Go);
        Some(Arc::new(CommandAdapter::new(tool, spec, pass_scope)))
    }

    /// Describe how each catalog entry resolves for a stack: enabled suites
    /// first, then the logical tools.
    pub fn describe(&self, stack: Option<StackKind>) -> Vec<ToolDescription> {
        let mut described = Vec::new();

        let mut suite_names: Vec<&String> = self.tools.suites.keys().collect();
        suite_names.sort();
        for name in suite_names {
            let spec = &self.tools.suites[name];
            described.push(ToolDescription {
                tool: name.clone(),
                source: "suite".to_string(),
                program: Some(spec.program.clone()),
                args: spec.args.clone(),
            });
        }

        for kind in [
            ToolKind::Lint,
            ToolKind::Test,
            ToolKind::Build,
            ToolKind::DependencyAudit,
            ToolKind::SecurityScan,
        ] {
            let name = kind.logical_name();
            let (source, spec) = if let Some(spec) = self.tools.commands.get(name) {
                ("override", Some(spec.clone()))
            } else if let Some(spec) = stack.and_then(|s| builtin_command(s, kind)) {
                ("builtin", Some(spec))
            } else {
                ("unresolved", None)
            };
            described.push(ToolDescription {
                tool: name.to_string(),
                source: source.to_string(),
                program: spec.as_ref().map(|s| s.program.clone()),
                args: spec.map(|s| s.args).unwrap_or_default(),
            });
        }

        described
    }

    /// Resolve every distinct (tool, stack) pair in a plan into the
    /// write-once cache.
    pub fn resolve_for_plan(
        &self,
        tools: &[(String, Option<StackKind>)],
    ) -> ResolvedAdapters {
        let mut adapters: HashMap<(String, Option<StackKind>), Arc<dyn ToolAdapter>> =
            HashMap::new();
        for (tool, stack) in tools {
            let key = (tool.clone(), *stack);
            if adapters.contains_key(&key) {
                continue;
            }
            if let Some(adapter) = self.build(tool, *stack) {
                adapters.insert(key, adapter);
            }
        }
        ResolvedAdapters { adapters }
    }
}
