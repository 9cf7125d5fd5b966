//! Provisioning backends.
//!
//! A backend turns a [`DeploymentPlan`] into resource API calls. Backends
//! must be idempotent per group: applying the same group twice updates it in
//! place instead of creating a duplicate.

mod dry_run;
mod memory;

pub use dry_run::DryRunBackend;
pub use memory::InMemoryBackend;

use crate::context::DeploymentContext;
use crate::errors::ApplyError;
use crate::graph::DeploymentPlan;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Executes deployment plans.
#[async_trait]
pub trait ProvisioningBackend: Send + Sync {
    /// Returns the backend name used in logs.
    fn name(&self) -> &str;

    /// Applies the plan.
    ///
    /// Groups must be applied in plan order, or wave by wave.
    ///
    /// # Errors
    ///
    /// Returns an `ApplyError` if any group fails. Groups after the failing
    /// one are not applied.
    async fn apply(&self, plan: &DeploymentPlan, context: &DeploymentContext) -> Result<ApplyResult, ApplyError>;
}

/// What applying a group did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupChange {
    /// The group did not exist and was created.
    Created,
    /// The group existed with a different definition and was updated.
    Updated,
    /// The group existed with the same definition.
    Unchanged,
    /// Nothing was applied (dry run).
    Planned,
}

impl fmt::Display for GroupChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Updated => write!(f, "updated"),
            Self::Unchanged => write!(f, "unchanged"),
            Self::Planned => write!(f, "planned"),
        }
    }
}

/// Outcome for one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupApplyRecord {
    /// Group name.
    pub group: String,
    /// What happened.
    pub change: GroupChange,
    /// Fingerprint of the applied definition.
    pub fingerprint: String,
    /// Number of resources in the group.
    pub resources: usize,
    /// When the group finished.
    pub applied_at: DateTime<Utc>,
}

/// Outcome of applying a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyResult {
    /// Backend that applied the plan.
    pub backend: String,
    /// Fingerprint of the applied plan.
    pub plan_fingerprint: String,
    /// Per-group outcomes in the order groups finished.
    pub records: Vec<GroupApplyRecord>,
    /// When apply started.
    pub started_at: DateTime<Utc>,
    /// When apply finished.
    pub finished_at: DateTime<Utc>,
}

impl ApplyResult {
    /// Returns the record for a group.
    #[must_use]
    pub fn record(&self, group: &str) -> Option<&GroupApplyRecord> {
        self.records.iter().find(|r| r.group == group)
    }

    /// Returns group names in the order they were applied.
    #[must_use]
    pub fn applied_groups(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.group.as_str()).collect()
    }

    /// Returns how many groups had the given outcome.
    #[must_use]
    pub fn count(&self, change: GroupChange) -> usize {
        self.records.iter().filter(|r| r.change == change).count()
    }

    /// Returns true if nothing was created or updated.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.count(GroupChange::Created) == 0 && self.count(GroupChange::Updated) == 0
    }

    /// Returns the apply duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// Returns a compact summary suitable for logs.
    #[must_use]
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "backend": self.backend,
            "groups": self.applied_groups(),
            "created": self.count(GroupChange::Created),
            "updated": self.count(GroupChange::Updated),
            "unchanged": self.count(GroupChange::Unchanged),
            "planned": self.count(GroupChange::Planned),
            "duration_ms": self.duration_ms(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(group: &str, change: GroupChange) -> GroupApplyRecord {
        GroupApplyRecord {
            group: group.to_string(),
            change,
            fingerprint: "abc".to_string(),
            resources: 1,
            applied_at: Utc::now(),
        }
    }

    #[test]
    fn test_apply_result_counts() {
        let now = Utc::now();
        let result = ApplyResult {
            backend: "test".to_string(),
            plan_fingerprint: "f".to_string(),
            records: vec![
                record("a", GroupChange::Created),
                record("b", GroupChange::Unchanged),
            ],
            started_at: now,
            finished_at: now,
        };

        assert_eq!(result.applied_groups(), vec!["a", "b"]);
        assert_eq!(result.count(GroupChange::Created), 1);
        assert!(!result.is_noop());
        assert_eq!(result.record("b").map(|r| r.change), Some(GroupChange::Unchanged));
        assert_eq!(result.summary()["unchanged"], 1);
    }

    #[test]
    fn test_group_change_serde() {
        assert_eq!(serde_json::to_string(&GroupChange::Unchanged).unwrap(), "\"unchanged\"");
        assert_eq!(GroupChange::Planned.to_string(), "planned");
    }
}
