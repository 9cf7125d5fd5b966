//! Orchestration events.
//!
//! The orchestrator reports every state change and milestone of a run to an
//! [`EventSink`]. Sinks are passed in explicitly; there is no global sink.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use crate::context::RunIdentity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event type names emitted by the orchestrator.
pub mod types {
    /// The run moved to a new state.
    pub const STATE_CHANGED: &str = "orchestration.state_changed";
    /// A provisioner declared its group.
    pub const GROUP_DECLARED: &str = "group.declared";
    /// The dependency graph was validated.
    pub const GRAPH_BUILT: &str = "graph.built";
    /// The deployment plan was synthesized.
    pub const PLAN_SYNTHESIZED: &str = "plan.synthesized";
    /// The backend applied the plan.
    pub const PLAN_APPLIED: &str = "plan.applied";
    /// The run failed.
    pub const FAILED: &str = "orchestration.failed";
}

/// One event emitted during an orchestration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationEvent {
    /// Event type, one of [`types`].
    pub event_type: String,
    /// Run that emitted the event.
    pub run_id: Uuid,
    /// Target environment of the run.
    pub environment: String,
    /// When the event was created.
    pub timestamp: DateTime<Utc>,
    /// Event payload.
    pub data: serde_json::Value,
}

impl OrchestrationEvent {
    /// Creates an event for a run.
    #[must_use]
    pub fn new(identity: &RunIdentity, event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            run_id: identity.run_id,
            environment: identity.environment.clone(),
            timestamp: Utc::now(),
            data,
        }
    }

    /// Returns true if the event type starts with `prefix`.
    #[must_use]
    pub fn is_type(&self, prefix: &str) -> bool {
        self.event_type.starts_with(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_carries_run_identity() {
        let identity = RunIdentity::new("dev");
        let event = OrchestrationEvent::new(&identity, types::GRAPH_BUILT, json!({"groups": 3}));

        assert_eq!(event.run_id, identity.run_id);
        assert_eq!(event.environment, "dev");
        assert!(event.is_type("graph."));
        assert!(!event.is_type("plan."));
        assert_eq!(event.data["groups"], 3);
    }
}
