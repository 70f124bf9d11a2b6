//! Verdict: Context-Aware Validation Orchestration
//!
//! Decides which quality checks a change set needs, runs them under resource
//! and time limits, measures the run against historical baselines, and
//! reports whether the result gates a release.

pub mod adapter;
pub mod cli;
pub mod config;
pub mod context;
pub mod dimension;
pub mod error;
pub mod executor;
pub mod governor;
pub mod logging;
pub mod mode;
pub mod orchestrator;
pub mod plan;
pub mod report;
pub mod types;
pub mod workspace;
