//! Performance governance.
//!
//! Measures each run against an append-only per-bucket baseline and renders a
//! verdict: pass, degraded, or hard fail. Baselines are keyed by scope-size
//! bucket so a ten-file run is never compared against a thousand-file one.
//! The store keeps a sliding window of measurements; the comparison value is
//! the window mean, and drift across the window is flagged (not failed) so
//! slow creep stays visible.

use crate::config::GovernanceConfig;
use crate::error::StorageError;
use crate::executor::ExecutionMetrics;
use crate::types::ScopeBucket;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// One recorded measurement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineEntry {
    pub recorded_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub memory_bytes: Option<u64>,
}

/// Append-only baseline store, one sliding window per scope bucket.
pub struct BaselineStore {
    db: sled::Db,
}

impl BaselineStore {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Append a measurement, truncating the window to `window` entries.
    /// Existing entries are never rewritten, only aged out.
    pub fn append(
        &self,
        bucket: ScopeBucket,
        entry: BaselineEntry,
        window: usize,
    ) -> Result<(), StorageError> {
        let mut history = self.history(bucket)?;
        history.push(entry);
        if history.len() > window {
            let excess = history.len() - window;
            history.drain(..excess);
        }
        let encoded = bincode::serialize(&history).map_err(|e| StorageError::CorruptRecord {
            bucket: bucket.to_string(),
            reason: e.to_string(),
        })?;
        self.db.insert(bucket.as_str(), encoded)?;
        self.db.flush()?;
        debug!(bucket = %bucket, entries = history.len(), "Recorded baseline measurement");
        Ok(())
    }

    /// Full window for a bucket, oldest first.
    pub fn history(&self, bucket: ScopeBucket) -> Result<Vec<BaselineEntry>, StorageError> {
        match self.db.get(bucket.as_str())? {
            Some(bytes) => {
                bincode::deserialize(&bytes).map_err(|e| StorageError::CorruptRecord {
                    bucket: bucket.to_string(),
                    reason: e.to_string(),
                })
            }
            None => Ok(Vec::new()),
        }
    }

    /// Drop all measurements for one bucket.
    pub fn clear(&self, bucket: ScopeBucket) -> Result<(), StorageError> {
        self.db.remove(bucket.as_str())?;
        self.db.flush()?;
        Ok(())
    }

    /// Drop all measurements.
    pub fn clear_all(&self) -> Result<(), StorageError> {
        self.db.clear()?;
        self.db.flush()?;
        Ok(())
    }
}

/// Whether `current` exceeds `baseline` by more than `threshold_pct` percent.
/// A missing baseline can never be a regression.
pub fn is_regression_significant(baseline_ms: u64, current_ms: u64, threshold_pct: f64) -> bool {
    if baseline_ms == 0 {
        return false;
    }
    let increase_pct = (current_ms as f64 - baseline_ms as f64) / baseline_ms as f64 * 100.0;
    increase_pct > threshold_pct
}

/// Severity of the governance verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GovernanceLevel {
    Pass,
    /// Within limits but close enough to warrant a recommendation
    Degraded,
    /// A resource ceiling was breached
    HardFail,
}

/// The governor's assessment of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceVerdict {
    pub level: GovernanceLevel,
    pub bucket: ScopeBucket,
    pub duration_ms: u64,
    /// Window-mean baseline, absent on the first run for a bucket
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_ms: Option<u64>,
    /// Percent increase over the baseline, when one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regression_pct: Option<f64>,
    pub regression_significant: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_bytes: Option<u64>,
    pub memory_ceiling_bytes: u64,
    /// Oldest-to-newest drift across the window exceeded the threshold
    pub drift_flagged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

impl GovernanceVerdict {
    /// A verdict that should fail the run outright.
    pub fn is_violation(&self) -> bool {
        self.level == GovernanceLevel::HardFail
    }
}

/// Peak resident set size of this process, from `/proc/self/status` (VmHWM).
/// Covers the orchestrator itself; child tool processes report through their
/// own exit status and are bounded by their timeouts.
#[cfg(target_os = "linux")]
pub fn peak_rss_bytes() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("VmHWM:") {
            let kb: u64 = rest.trim().trim_end_matches("kB").trim().parse().ok()?;
            return Some(kb * 1024);
        }
    }
    None
}

#[cfg(not(target_os = "linux"))]
pub fn peak_rss_bytes() -> Option<u64> {
    None
}

/// Applies governance policy to execution metrics.
pub struct PerformanceGovernor {
    config: GovernanceConfig,
}

impl PerformanceGovernor {
    pub fn new(config: GovernanceConfig) -> Self {
        Self { config }
    }

    /// Assess a run against the bucket baseline and the memory ceiling.
    pub fn assess(
        &self,
        store: &BaselineStore,
        bucket: ScopeBucket,
        metrics: &ExecutionMetrics,
    ) -> Result<GovernanceVerdict, StorageError> {
        let history = store.history(bucket)?;

        let baseline_ms = if history.is_empty() {
            None
        } else {
            let sum: u64 = history.iter().map(|e| e.duration_ms).sum();
            Some(sum / history.len() as u64)
        };

        let regression_pct = baseline_ms.filter(|b| *b > 0).map(|b| {
            (metrics.total_duration_ms as f64 - b as f64) / b as f64 * 100.0
        });
        let regression_significant = baseline_ms
            .map(|b| {
                is_regression_significant(
                    b,
                    metrics.total_duration_ms,
                    self.config.regression_threshold_pct,
                )
            })
            .unwrap_or(false);

        let drift_flagged = match (history.first(), history.last()) {
            (Some(oldest), Some(newest)) if history.len() >= 2 => is_regression_significant(
                oldest.duration_ms,
                newest.duration_ms,
                self.config.regression_threshold_pct,
            ),
            _ => false,
        };

        let ceiling = self.config.memory_ceiling_bytes;
        let degraded_floor = (ceiling as f64 * self.config.degraded_band) as u64;

        let mut recommendation = None;
        let level = match metrics.peak_memory_bytes {
            Some(memory) if memory > ceiling => {
                warn!(
                    memory_bytes = memory,
                    ceiling_bytes = ceiling,
                    "Memory ceiling breached"
                );
                recommendation = Some(
                    "reduce orchestration.max_concurrency or narrow the validation scope"
                        .to_string(),
                );
                GovernanceLevel::HardFail
            }
            Some(memory) if memory >= degraded_floor => {
                recommendation = Some(
                    "memory is near the ceiling; consider reducing orchestration.max_concurrency"
                        .to_string(),
                );
                GovernanceLevel::Degraded
            }
            _ if regression_significant => {
                recommendation = Some(format!(
                    "run took {}ms against a {}ms baseline; investigate slow tools or cache state",
                    metrics.total_duration_ms,
                    baseline_ms.unwrap_or(0)
                ));
                GovernanceLevel::Degraded
            }
            _ => GovernanceLevel::Pass,
        };

        if drift_flagged {
            info!(bucket = %bucket, "Baseline drift detected across measurement window");
        }

        Ok(GovernanceVerdict {
            level,
            bucket,
            duration_ms: metrics.total_duration_ms,
            baseline_ms,
            regression_pct,
            regression_significant,
            memory_bytes: metrics.peak_memory_bytes,
            memory_ceiling_bytes: ceiling,
            drift_flagged,
            recommendation,
        })
    }

    /// Record this run's measurement into the bucket window. Called after
    /// assessment so the run is never compared against itself.
    pub fn record(
        &self,
        store: &BaselineStore,
        bucket: ScopeBucket,
        metrics: &ExecutionMetrics,
    ) -> Result<(), StorageError> {
        store.append(
            bucket,
            BaselineEntry {
                recorded_at: Utc::now(),
                duration_ms: metrics.total_duration_ms,
                memory_bytes: metrics.peak_memory_bytes,
            },
            self.config.baseline_window,
        )
    }
}
