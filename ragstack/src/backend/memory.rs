//! In-memory reference backend.

use super::{ApplyResult, GroupApplyRecord, GroupChange, ProvisioningBackend};
use crate::context::DeploymentContext;
use crate::core::ResourceGroup;
use crate::errors::ApplyError;
use crate::graph::DeploymentPlan;
use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Keeps applied group definitions in memory.
///
/// State is keyed by environment and group name, so re-applying an identical
/// group reports [`GroupChange::Unchanged`] and a changed definition reports
/// [`GroupChange::Updated`]. Groups in the same wave are applied
/// concurrently.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<BTreeMap<(String, String), String>>>,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored fingerprint of a group.
    #[must_use]
    pub fn fingerprint_of(&self, environment: &str, group: &str) -> Option<String> {
        self.state
            .lock()
            .get(&(environment.to_string(), group.to_string()))
            .cloned()
    }

    /// Returns the number of stored groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().len()
    }

    /// Returns true if nothing has been applied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().is_empty()
    }

    /// Forgets all applied groups.
    pub fn clear(&self) {
        self.state.lock().clear();
    }

    fn apply_group(&self, environment: &str, group: &ResourceGroup) -> GroupApplyRecord {
        let fingerprint = group.fingerprint();
        let key = (environment.to_string(), group.name().to_string());

        let change = {
            let mut state = self.state.lock();
            match state.insert(key, fingerprint.clone()) {
                None => GroupChange::Created,
                Some(previous) if previous == fingerprint => GroupChange::Unchanged,
                Some(_) => GroupChange::Updated,
            }
        };
        debug!(group = group.name(), %change, "Applied group");

        GroupApplyRecord {
            group: group.name().to_string(),
            change,
            fingerprint,
            resources: group.resource_count(),
            applied_at: Utc::now(),
        }
    }
}

#[async_trait]
impl ProvisioningBackend for InMemoryBackend {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn apply(&self, plan: &DeploymentPlan, context: &DeploymentContext) -> Result<ApplyResult, ApplyError> {
        let started_at = Utc::now();
        let mut records = Vec::with_capacity(plan.len());

        for (index, wave) in plan.waves().into_iter().enumerate() {
            debug!(wave = index, groups = wave.len(), "Applying wave");
            let applied = join_all(
                wave.into_iter()
                    .map(|group| async move { self.apply_group(&context.environment, group) }),
            )
            .await;
            records.extend(applied);
        }

        let result = ApplyResult {
            backend: self.name().to_string(),
            plan_fingerprint: plan.fingerprint(),
            records,
            started_at,
            finished_at: Utc::now(),
        };
        info!(summary = %result.summary(), "Plan applied");
        Ok(result)
    }
}
