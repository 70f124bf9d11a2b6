//! Property-based tests for batching, status merging, and classification
//! invariants.

use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use verdict::adapter::ToolScope;
use verdict::config::RiskConfig;
use verdict::context::{ContextDetector, DetectOptions};
use verdict::dimension::{map_dimensions, rule_confidence, CONFIDENCE_FLOOR};
use verdict::governor::is_regression_significant;
use verdict::plan::{partition_batches, ToolInvocation};
use verdict::types::{DimensionKind, OverallStatus, Priority, ScopeBucket};
use verdict::workspace::{StaticWorkspace, WorkspaceReader};

fn invocation(tool: String) -> ToolInvocation {
    ToolInvocation {
        tool,
        dimension: DimensionKind::StaticAnalysis,
        priority: Priority::Medium,
        critical: false,
        stack: None,
        scope: ToolScope::default(),
        args: Vec::new(),
        timeout: Duration::from_secs(30),
    }
}

/// Every invocation lands in exactly one batch, no batch exceeds the limit,
/// and order is preserved.
#[test]
fn test_batching_invariants_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(0usize..40, 1usize..8), |(count, limit)| {
            let invocations: Vec<ToolInvocation> =
                (0..count).map(|i| invocation(format!("t{}", i))).collect();
            let batches = partition_batches(&invocations, limit);

            let total: usize = batches.iter().map(|b| b.len()).sum();
            assert_eq!(total, count);
            assert!(batches.iter().all(|b| b.len() <= limit && !b.is_empty()));

            let flattened: Vec<&str> = batches
                .iter()
                .flatten()
                .map(|i| i.tool.as_str())
                .collect();
            let original: Vec<&str> = invocations.iter().map(|i| i.tool.as_str()).collect();
            assert_eq!(flattened, original);

            let expected_batches = if count == 0 { 0 } else { count.div_ceil(limit) };
            assert_eq!(batches.len(), expected_batches);

            Ok(())
        })
        .unwrap();
}

/// Status merge is commutative, associative, and never improves a status.
#[test]
fn test_status_merge_property() {
    let statuses = [
        OverallStatus::Passed,
        OverallStatus::Warning,
        OverallStatus::Failed,
    ];
    for a in statuses {
        for b in statuses {
            assert_eq!(a.merge(b), b.merge(a));
            assert!(a.merge(b) >= a);
            assert!(a.merge(b) >= b);
            for c in statuses {
                assert_eq!(a.merge(b).merge(c), a.merge(b.merge(c)));
            }
        }
    }
}

/// Scope buckets are monotonic in file count.
#[test]
fn test_bucket_monotonicity_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(0usize..500, 0usize..500), |(a, b)| {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let order = |bucket: ScopeBucket| match bucket {
                ScopeBucket::Small => 0,
                ScopeBucket::Medium => 1,
                ScopeBucket::Large => 2,
                ScopeBucket::ExtraLarge => 3,
            };
            assert!(order(ScopeBucket::for_file_count(lo)) <= order(ScopeBucket::for_file_count(hi)));
            Ok(())
        })
        .unwrap();
}

/// The regression predicate is monotonic in the current duration and never
/// fires without a baseline.
#[test]
fn test_regression_predicate_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(1u64..1_000_000, 0u64..1_000_000, 1.0f64..100.0),
            |(baseline, current, threshold)| {
                let significant = is_regression_significant(baseline, current, threshold);
                // A slower "current" can only make it more significant.
                if significant {
                    assert!(is_regression_significant(baseline, current + 1, threshold));
                }
                // At or below the baseline is never a regression.
                if current <= baseline {
                    assert!(!significant);
                }
                assert!(!is_regression_significant(0, current, threshold));
                Ok(())
            },
        )
        .unwrap();
}

/// Dimension mapping is deterministic: the same file set always yields the
/// same dimensions, including when the comprehensive fallback triggers.
#[test]
fn test_mapping_determinism_property() {
    let mut runner = proptest::test_runner::TestRunner::default();
    let file_name = proptest::string::string_regex("[a-z]{1,8}(\\.(rs|ts|py|txt|md))?").unwrap();

    runner
        .run(
            &proptest::collection::vec(file_name, 0..10),
            |names| {
                let paths: Vec<String> = names
                    .iter()
                    .enumerate()
                    .map(|(i, n)| format!("dir{}/{}", i, n))
                    .collect();
                let refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
                let ws = StaticWorkspace::new("feature/x").with_staged(&refs);
                let detector = ContextDetector::new(RiskConfig::default());

                let first = detector.detect(&ws, &DetectOptions::default()).unwrap();
                let second = detector.detect(&ws, &DetectOptions::default()).unwrap();
                assert_eq!(first.confidence, second.confidence);

                let dims_a: Vec<DimensionKind> =
                    map_dimensions(&first).iter().map(|d| d.kind).collect();
                let dims_b: Vec<DimensionKind> =
                    map_dimensions(&second).iter().map(|d| d.kind).collect();
                assert_eq!(dims_a, dims_b);

                // Below the floor, the comprehensive set always appears.
                if !first.files.is_empty() && first.confidence < CONFIDENCE_FLOOR {
                    assert_eq!(dims_a.len(), DimensionKind::all().len());
                }

                Ok(())
            },
        )
        .unwrap();
}

/// Confidence is always within [0, 1].
#[test]
fn test_confidence_bounds_property() {
    let mut runner = proptest::test_runner::TestRunner::default();
    let file_name = proptest::string::string_regex("[a-z_/]{1,20}(\\.[a-z]{1,4})?").unwrap();

    runner
        .run(
            &proptest::collection::vec(file_name, 0..20),
            |names| {
                let refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
                let ws = StaticWorkspace::new("feature/x").with_staged(&refs);
                let files: Vec<_> = ws
                    .changed_files(true)
                    .unwrap()
                    .into_iter()
                    .map(verdict::workspace::ChangedFile::staged)
                    .collect();
                let confidence = rule_confidence(&files);
                assert!((0.0..=1.0).contains(&confidence));
                Ok(())
            },
        )
        .unwrap();
}

/// An empty change set always resolves to a no-op pass regardless of the
/// requested mode (except scope mode, which requires a scope).
#[tokio::test]
async fn test_empty_change_set_no_op_property() {
    use verdict::config::VerdictConfig;
    use verdict::governor::BaselineStore;
    use verdict::orchestrator::{RunRequest, ValidationOrchestrator};
    use verdict::types::Mode;

    for mode in [None, Some(Mode::Automatic), Some(Mode::Fast), Some(Mode::Gate)] {
        let dir = tempfile::tempdir().unwrap();
        let store = BaselineStore::open(&dir.path().join("baselines")).unwrap();
        let orch = ValidationOrchestrator::new(
            VerdictConfig::default(),
            Arc::new(StaticWorkspace::new("feature/x")),
            store,
        );
        let report = orch
            .run(&RunRequest {
                mode,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(report.no_op);
        assert_eq!(report.status, OverallStatus::Passed);
    }
}
