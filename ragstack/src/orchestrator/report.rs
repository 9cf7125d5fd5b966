//! Results of orchestration runs.

use super::{OrchestrationState, StateTransition};
use crate::backend::ApplyResult;
use crate::context::RunIdentity;
use crate::errors::RagstackError;
use crate::graph::DeploymentPlan;
use thiserror::Error;

/// Report of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The run's identity.
    pub identity: RunIdentity,
    /// The plan handed to the backend.
    pub plan: DeploymentPlan,
    /// What the backend did.
    pub apply: ApplyResult,
    /// State transitions in order.
    pub transitions: Vec<StateTransition>,
}

impl RunReport {
    /// Returns the states visited, starting with `Initialized`.
    #[must_use]
    pub fn states(&self) -> Vec<OrchestrationState> {
        states_of(&self.transitions)
    }

    /// Returns the final state.
    #[must_use]
    pub fn final_state(&self) -> OrchestrationState {
        final_state_of(&self.transitions)
    }

    /// Returns a compact summary suitable for logs and CLI output.
    #[must_use]
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "run": self.identity.to_dict(),
            "state": self.final_state(),
            "plan": self.plan.summary(),
            "apply": self.apply.summary(),
        })
    }
}

/// A run that ended in [`OrchestrationState::Failed`].
///
/// Carries the transitions made before the failure so callers can tell which
/// step stopped the run.
#[derive(Debug, Error)]
#[error("Orchestration run {} failed in '{}'", identity.run_id, identity.environment)]
pub struct RunFailure {
    /// The run's identity.
    pub identity: RunIdentity,
    /// State transitions in order, ending with `Failed`.
    pub transitions: Vec<StateTransition>,
    /// The error that stopped the run.
    #[source]
    pub error: RagstackError,
}

impl RunFailure {
    /// Returns the states visited, starting with `Initialized`.
    #[must_use]
    pub fn states(&self) -> Vec<OrchestrationState> {
        states_of(&self.transitions)
    }

    /// Returns the last state reached before failing.
    #[must_use]
    pub fn failed_after(&self) -> OrchestrationState {
        self.transitions
            .iter()
            .rev()
            .find(|t| t.to == OrchestrationState::Failed)
            .map_or(OrchestrationState::Initialized, |t| t.from)
    }

    /// Consumes the failure and returns the underlying error.
    #[must_use]
    pub fn into_error(self) -> RagstackError {
        self.error
    }
}

fn states_of(transitions: &[StateTransition]) -> Vec<OrchestrationState> {
    std::iter::once(OrchestrationState::Initialized)
        .chain(transitions.iter().map(|t| t.to))
        .collect()
}

fn final_state_of(transitions: &[StateTransition]) -> OrchestrationState {
    transitions.last().map_or(OrchestrationState::Initialized, |t| t.to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ApplyError;
    use std::error::Error as _;

    #[test]
    fn test_run_failure_message_does_not_repeat_its_source() {
        let failure = RunFailure {
            identity: RunIdentity::new("dev"),
            transitions: Vec::new(),
            error: ApplyError::for_group("KbRoleStack", "access denied").into(),
        };

        let message = failure.to_string();
        let source = failure.source().map(ToString::to_string).unwrap_or_default();

        assert!(message.contains(&failure.identity.run_id.to_string()));
        assert!(message.contains("'dev'"));
        assert!(source.contains("access denied"));
        assert!(!message.contains("access denied"));
    }
}
