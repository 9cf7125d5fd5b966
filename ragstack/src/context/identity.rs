//! Run identity for tracking orchestration runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Identifies one orchestration run.
///
/// Every call to the orchestrator gets a fresh identity; nothing about it
/// leaks into the synthesized plan, so plans stay byte-identical across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    /// The unique ID for this run.
    pub run_id: Uuid,
    /// The target environment.
    pub environment: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
}

impl RunIdentity {
    /// Creates a new run identity with a generated run ID.
    #[must_use]
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            environment: environment.into(),
            started_at: Utc::now(),
        }
    }

    /// Creates a run identity with a specific run ID.
    #[must_use]
    pub fn with_run_id(run_id: Uuid, environment: impl Into<String>) -> Self {
        Self {
            run_id,
            ..Self::new(environment)
        }
    }

    /// Returns elapsed milliseconds since the run started.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }

    /// Converts to a dictionary with string values.
    #[must_use]
    pub fn to_dict(&self) -> BTreeMap<String, serde_json::Value> {
        let mut map = BTreeMap::new();
        map.insert("run_id".to_string(), serde_json::json!(self.run_id.to_string()));
        map.insert("environment".to_string(), serde_json::json!(self.environment));
        map.insert("started_at".to_string(), serde_json::json!(self.started_at.to_rfc3339()));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_generates_unique_ids() {
        let a = RunIdentity::new("dev");
        let b = RunIdentity::new("dev");

        assert_ne!(a.run_id, b.run_id);
        assert_eq!(a.environment, "dev");
    }

    #[test]
    fn test_with_run_id() {
        let id = Uuid::new_v4();
        let identity = RunIdentity::with_run_id(id, "prod");

        assert_eq!(identity.run_id, id);
        assert!(identity.elapsed_ms() >= 0);
    }

    #[test]
    fn test_to_dict() {
        let identity = RunIdentity::new("dev");
        let dict = identity.to_dict();

        assert_eq!(dict.get("environment"), Some(&serde_json::json!("dev")));
        assert_eq!(dict.get("run_id"), Some(&serde_json::json!(identity.run_id.to_string())));
        assert!(dict.contains_key("started_at"));
    }
}
