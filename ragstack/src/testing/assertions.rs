//! Assertions over plans and errors.

use crate::errors::RagstackError;
use crate::graph::{DependencyEdge, DeploymentPlan};

/// Asserts that every edge has `from` strictly before `to` in the plan.
pub fn assert_plan_respects(plan: &DeploymentPlan, edges: &[DependencyEdge]) {
    let violations = plan.violations(edges);
    assert!(
        violations.is_empty(),
        "Plan {:?} violates edges: {}",
        plan.group_names(),
        violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
}

/// Asserts the exact group order of a plan.
pub fn assert_plan_order(plan: &DeploymentPlan, expected: &[&str]) {
    assert_eq!(
        plan.group_names(),
        expected,
        "Expected plan order {:?}, got {:?}",
        expected,
        plan.group_names()
    );
}

/// Asserts that the error is a missing dependency output naming `group` and `output`.
pub fn assert_missing_output(error: &RagstackError, group: &str, output: &str) {
    match error {
        RagstackError::MissingDependencyOutput(e) => {
            assert_eq!(e.group, group, "Expected missing output for group '{group}'");
            assert_eq!(e.output, output, "Expected missing output '{output}'");
        }
        other => panic!("Expected MissingDependencyOutput, got: {other}"),
    }
}
