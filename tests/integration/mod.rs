//! Integration tests for the validation orchestrator

mod baseline_store;
mod executor_process;
mod orchestrator_flow;
mod report_shape;
mod test_utils;
