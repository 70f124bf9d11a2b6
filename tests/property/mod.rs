//! Property-based tests for orchestration invariants

mod invariants;
