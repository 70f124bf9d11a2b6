//! Baseline store persistence and governance behavior across runs.

use chrono::Utc;
use verdict::config::GovernanceConfig;
use verdict::executor::ExecutionMetrics;
use verdict::governor::{
    BaselineEntry, BaselineStore, GovernanceLevel, PerformanceGovernor,
};
use verdict::types::ScopeBucket;

fn entry(duration_ms: u64) -> BaselineEntry {
    BaselineEntry {
        recorded_at: Utc::now(),
        duration_ms,
        memory_bytes: None,
    }
}

fn metrics(duration_ms: u64) -> ExecutionMetrics {
    ExecutionMetrics {
        total_duration_ms: duration_ms,
        peak_memory_bytes: None,
    }
}

#[test]
fn test_measurements_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("baselines");

    {
        let store = BaselineStore::open(&path).unwrap();
        store.append(ScopeBucket::Medium, entry(42_000), 32).unwrap();
    }

    let store = BaselineStore::open(&path).unwrap();
    let history = store.history(ScopeBucket::Medium).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].duration_ms, 42_000);
}

#[test]
fn test_window_is_sliding_not_growing() {
    let dir = tempfile::tempdir().unwrap();
    let store = BaselineStore::open(&dir.path().join("baselines")).unwrap();

    for duration in 1..=10u64 {
        store
            .append(ScopeBucket::Small, entry(duration * 1000), 4)
            .unwrap();
    }

    let history = store.history(ScopeBucket::Small).unwrap();
    assert_eq!(history.len(), 4);
    let durations: Vec<u64> = history.iter().map(|e| e.duration_ms).collect();
    assert_eq!(durations, vec![7000, 8000, 9000, 10000]);
}

#[test]
fn test_governor_detects_regression_against_window_mean() {
    let dir = tempfile::tempdir().unwrap();
    let store = BaselineStore::open(&dir.path().join("baselines")).unwrap();
    let governor = PerformanceGovernor::new(GovernanceConfig::default());

    store.append(ScopeBucket::Medium, entry(60_000), 32).unwrap();
    store.append(ScopeBucket::Medium, entry(60_000), 32).unwrap();

    // +25% over a 60s mean breaches the 20% threshold.
    let verdict = governor
        .assess(&store, ScopeBucket::Medium, &metrics(75_000))
        .unwrap();
    assert!(verdict.regression_significant);
    assert_eq!(verdict.level, GovernanceLevel::Degraded);

    // +16.7% does not.
    let verdict = governor
        .assess(&store, ScopeBucket::Medium, &metrics(70_000))
        .unwrap();
    assert!(!verdict.regression_significant);
    assert_eq!(verdict.level, GovernanceLevel::Pass);
}

#[test]
fn test_governor_record_then_assess_sequence() {
    // Assessment happens before recording, so a run never regresses against
    // itself.
    let dir = tempfile::tempdir().unwrap();
    let store = BaselineStore::open(&dir.path().join("baselines")).unwrap();
    let governor = PerformanceGovernor::new(GovernanceConfig::default());

    let first = governor
        .assess(&store, ScopeBucket::Small, &metrics(10_000))
        .unwrap();
    assert!(first.baseline_ms.is_none());
    governor
        .record(&store, ScopeBucket::Small, &metrics(10_000))
        .unwrap();

    let second = governor
        .assess(&store, ScopeBucket::Small, &metrics(10_000))
        .unwrap();
    assert_eq!(second.baseline_ms, Some(10_000));
}

#[test]
fn test_clear_is_per_bucket() {
    let dir = tempfile::tempdir().unwrap();
    let store = BaselineStore::open(&dir.path().join("baselines")).unwrap();

    store.append(ScopeBucket::Small, entry(1000), 32).unwrap();
    store.append(ScopeBucket::Large, entry(9000), 32).unwrap();

    store.clear(ScopeBucket::Small).unwrap();
    assert!(store.history(ScopeBucket::Small).unwrap().is_empty());
    assert_eq!(store.history(ScopeBucket::Large).unwrap().len(), 1);

    store.clear_all().unwrap();
    assert!(store.history(ScopeBucket::Large).unwrap().is_empty());
}
