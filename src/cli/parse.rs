//! CLI parse: clap types for Verdict. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Verdict CLI - context-aware validation orchestrator
#[derive(Parser)]
#[command(name = "verdict")]
#[command(about = "Decides which quality checks to run for a change set and whether the result gates a release")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run validation for the current change set
    Run {
        /// Execution mode (automatic, fast, scope, gate); resolved from
        /// context when omitted
        #[arg(long)]
        mode: Option<String>,

        /// Path or glob narrowing the change set (implies scope mode)
        #[arg(long)]
        scope: Option<String>,

        /// Only consider staged files
        #[arg(long)]
        staged: bool,

        /// Development-only: honor the requested mode even when risk signals
        /// mandate gate (recorded as non-compliant)
        #[arg(long)]
        override_gate: bool,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
    /// Show the detected context without running anything
    Context {
        /// Path or glob narrowing the change set
        #[arg(long)]
        scope: Option<String>,

        /// Only consider staged files
        #[arg(long)]
        staged: bool,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Inspect or clear the performance baselines
    Baseline {
        #[command(subcommand)]
        command: BaselineCommands,
    },
    /// Show how each tool in the catalog resolves
    Tools {
        /// Stack for built-in resolution (rust, javascript, typescript,
        /// python, go, shell)
        #[arg(long)]
        stack: Option<String>,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

#[derive(Subcommand)]
pub enum BaselineCommands {
    /// Show recorded measurements
    Show {
        /// Bucket to show (small, medium, large, extra-large); all when
        /// omitted
        #[arg(long)]
        bucket: Option<String>,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Clear recorded measurements
    Clear {
        /// Bucket to clear (required unless --all)
        #[arg(long, required_unless_present = "all")]
        bucket: Option<String>,

        /// Clear every bucket
        #[arg(long, conflicts_with = "bucket")]
        all: bool,
    },
}
