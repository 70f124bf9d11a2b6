//! Executor behavior against real processes: parallelism, timeouts, and
//! fault accounting.

use std::time::{Duration, Instant};
use verdict::adapter::{ToolAdapterRegistry, ToolScope};
use verdict::config::{CommandSpec, ToolsConfig};
use verdict::executor::{ExecutionController, FaultKind};
use verdict::plan::{ExecutionPlan, ToolInvocation};
use verdict::types::{DimensionKind, Mode, Priority};

fn invocation(tool: &str, timeout: Duration) -> ToolInvocation {
    ToolInvocation {
        tool: tool.to_string(),
        dimension: DimensionKind::StaticAnalysis,
        priority: Priority::Medium,
        critical: false,
        stack: None,
        scope: ToolScope::default(),
        args: Vec::new(),
        timeout,
    }
}

fn registry(commands: &[(&str, &str, &[&str])]) -> ToolAdapterRegistry {
    let mut tools = ToolsConfig::default();
    for (name, program, args) in commands {
        tools
            .commands
            .insert(name.to_string(), CommandSpec::new(*program, args));
    }
    ToolAdapterRegistry::new(tools)
}

#[tokio::test]
async fn test_batch_runs_in_parallel() {
    let registry = registry(&[
        ("a", "sleep", &["0.3"]),
        ("b", "sleep", &["0.3"]),
        ("c", "sleep", &["0.3"]),
    ]);
    let plan = ExecutionPlan {
        mode: Mode::Automatic,
        concurrency: 3,
        global_deadline: None,
        invocations: vec![
            invocation("a", Duration::from_secs(5)),
            invocation("b", Duration::from_secs(5)),
            invocation("c", Duration::from_secs(5)),
        ],
    };
    let adapters = registry.resolve_for_plan(&plan.adapter_requests());

    let start = Instant::now();
    let outcome = ExecutionController::new().execute(&plan, &adapters).await;
    let elapsed = start.elapsed();

    assert_eq!(outcome.results.len(), 3);
    assert!(outcome.results.iter().all(|r| r.success));
    // Three 300ms sleeps in one batch should take well under 900ms.
    assert!(
        elapsed < Duration::from_millis(800),
        "batch took {:?}, expected parallel execution",
        elapsed
    );
}

#[tokio::test]
async fn test_sequential_plan_runs_one_at_a_time() {
    let registry = registry(&[("a", "sleep", &["0.2"]), ("b", "sleep", &["0.2"])]);
    let plan = ExecutionPlan {
        mode: Mode::Gate,
        concurrency: 1,
        global_deadline: None,
        invocations: vec![
            invocation("a", Duration::from_secs(5)),
            invocation("b", Duration::from_secs(5)),
        ],
    };
    let adapters = registry.resolve_for_plan(&plan.adapter_requests());

    let start = Instant::now();
    let outcome = ExecutionController::new().execute(&plan, &adapters).await;
    let elapsed = start.elapsed();

    assert!(outcome.results.iter().all(|r| r.success));
    assert!(
        elapsed >= Duration::from_millis(380),
        "sequential plan finished in {:?}, looks parallel",
        elapsed
    );
}

#[tokio::test]
async fn test_hanging_tool_is_killed_at_timeout() {
    let registry = registry(&[("hang", "sleep", &["30"])]);
    let plan = ExecutionPlan {
        mode: Mode::Automatic,
        concurrency: 1,
        global_deadline: None,
        invocations: vec![invocation("hang", Duration::from_millis(100))],
    };
    let adapters = registry.resolve_for_plan(&plan.adapter_requests());

    let start = Instant::now();
    let outcome = ExecutionController::new().execute(&plan, &adapters).await;
    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(outcome.results[0].fault, Some(FaultKind::Timeout));
}

#[tokio::test]
async fn test_violations_parsed_from_output() {
    let registry = registry(&[(
        "lint",
        "sh",
        &["-c", "echo 'src/lib.rs:10:5: unused variable'; exit 1"],
    )]);
    let plan = ExecutionPlan {
        mode: Mode::Automatic,
        concurrency: 1,
        global_deadline: None,
        invocations: vec![invocation("lint", Duration::from_secs(5))],
    };
    let adapters = registry.resolve_for_plan(&plan.adapter_requests());

    let outcome = ExecutionController::new().execute(&plan, &adapters).await;
    let result = &outcome.results[0];
    assert!(!result.success);
    assert_eq!(result.violations.len(), 1);
    assert_eq!(result.violations[0].file.as_deref(), Some("src/lib.rs"));
    assert_eq!(result.violations[0].line, Some(10));
}

#[tokio::test]
async fn test_metrics_capture_wall_clock() {
    let registry = registry(&[("a", "sleep", &["0.2"])]);
    let plan = ExecutionPlan {
        mode: Mode::Automatic,
        concurrency: 1,
        global_deadline: None,
        invocations: vec![invocation("a", Duration::from_secs(5))],
    };
    let adapters = registry.resolve_for_plan(&plan.adapter_requests());

    let outcome = ExecutionController::new().execute(&plan, &adapters).await;
    assert!(outcome.metrics.total_duration_ms >= 180);
}
