//! Orchestration run states.

use crate::errors::RagstackError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// State of one orchestration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrchestrationState {
    /// Nothing has happened yet.
    #[default]
    Initialized,
    /// Provisioners are declaring their groups.
    Declaring,
    /// The dependency graph passed validation.
    GraphBuilt,
    /// The deployment plan exists.
    PlanSynthesized,
    /// The backend applied the plan.
    Applied,
    /// A validation or apply step failed.
    Failed,
}

impl fmt::Display for OrchestrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialized => write!(f, "initialized"),
            Self::Declaring => write!(f, "declaring"),
            Self::GraphBuilt => write!(f, "graph_built"),
            Self::PlanSynthesized => write!(f, "plan_synthesized"),
            Self::Applied => write!(f, "applied"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl OrchestrationState {
    /// Returns true if no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Applied | Self::Failed)
    }

    /// Returns true if `next` may follow this state.
    ///
    /// The happy path is strictly linear; any non-terminal state may fail.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        match (self, next) {
            (Self::Initialized, Self::Declaring)
            | (Self::Declaring, Self::GraphBuilt)
            | (Self::GraphBuilt, Self::PlanSynthesized)
            | (Self::PlanSynthesized, Self::Applied) => true,
            (current, Self::Failed) => !current.is_terminal(),
            _ => false,
        }
    }
}

/// One recorded transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    /// The state left.
    pub from: OrchestrationState,
    /// The state entered.
    pub to: OrchestrationState,
    /// When the transition happened.
    pub at: DateTime<Utc>,
}

/// Tracks the state of a run and every transition it made.
#[derive(Debug, Clone, Default)]
pub struct StateTracker {
    current: OrchestrationState,
    transitions: Vec<StateTransition>,
}

impl StateTracker {
    /// Creates a tracker in [`OrchestrationState::Initialized`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current state.
    #[must_use]
    pub fn current(&self) -> OrchestrationState {
        self.current
    }

    /// Moves to `next`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if `next` cannot follow the current state.
    pub fn transition(&mut self, next: OrchestrationState) -> Result<StateTransition, RagstackError> {
        if !self.current.can_transition_to(next) {
            return Err(RagstackError::InvalidTransition {
                from: self.current.to_string(),
                to: next.to_string(),
            });
        }
        let transition = StateTransition {
            from: self.current,
            to: next,
            at: Utc::now(),
        };
        self.transitions.push(transition.clone());
        self.current = next;
        Ok(transition)
    }

    /// Returns the recorded transitions in order.
    #[must_use]
    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// Returns every state visited, starting with `Initialized`.
    #[must_use]
    pub fn history(&self) -> Vec<OrchestrationState> {
        std::iter::once(OrchestrationState::Initialized)
            .chain(self.transitions.iter().map(|t| t.to))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use super::OrchestrationState::{Applied, Declaring, Failed, GraphBuilt, Initialized, PlanSynthesized};

    #[test]
    fn test_happy_path_transitions() {
        let mut tracker = StateTracker::new();
        for next in [Declaring, GraphBuilt, PlanSynthesized, Applied] {
            tracker.transition(next).unwrap();
        }

        assert_eq!(tracker.current(), Applied);
        assert_eq!(
            tracker.history(),
            vec![Initialized, Declaring, GraphBuilt, PlanSynthesized, Applied]
        );
        assert!(tracker.current().is_terminal());
    }

    #[test]
    fn test_failure_from_any_non_terminal_state() {
        for state in [Initialized, Declaring, GraphBuilt, PlanSynthesized] {
            assert!(state.can_transition_to(Failed), "{state} should be able to fail");
        }
        assert!(!Applied.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Failed));
    }

    #[test]
    fn test_skipping_a_state_is_rejected() {
        let mut tracker = StateTracker::new();
        let err = tracker.transition(GraphBuilt).unwrap_err();

        assert_eq!(err.to_string(), "Invalid state transition: initialized -> graph_built");
        assert_eq!(tracker.current(), Initialized);
        assert!(tracker.transitions().is_empty());
    }

    #[test]
    fn test_no_transition_out_of_terminal_state() {
        let mut tracker = StateTracker::new();
        tracker.transition(Failed).unwrap();

        assert!(tracker.transition(Declaring).is_err());
        assert_eq!(tracker.history(), vec![Initialized, Failed]);
    }
}
