//! Backend that only logs the plan.

use super::{ApplyResult, GroupApplyRecord, GroupChange, ProvisioningBackend};
use crate::context::DeploymentContext;
use crate::errors::ApplyError;
use crate::graph::DeploymentPlan;
use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

/// Logs every group of the plan and applies nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunBackend;

impl DryRunBackend {
    /// Creates a dry-run backend.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProvisioningBackend for DryRunBackend {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn apply(&self, plan: &DeploymentPlan, context: &DeploymentContext) -> Result<ApplyResult, ApplyError> {
        let started_at = Utc::now();
        let mut records = Vec::with_capacity(plan.len());

        for (position, group) in plan.groups().iter().enumerate() {
            info!(
                position,
                group = group.name(),
                resources = group.resource_count(),
                account = %context.account_id,
                region = %context.region,
                "Would apply group"
            );
            for declaration in group.declarations() {
                info!(
                    group = group.name(),
                    logical_id = %declaration.logical_id,
                    kind = %declaration.kind,
                    name = declaration.physical_name().unwrap_or("-"),
                    "  resource"
                );
            }
            records.push(GroupApplyRecord {
                group: group.name().to_string(),
                change: GroupChange::Planned,
                fingerprint: group.fingerprint(),
                resources: group.resource_count(),
                applied_at: Utc::now(),
            });
        }

        Ok(ApplyResult {
            backend: self.name().to_string(),
            plan_fingerprint: plan.fingerprint(),
            records,
            started_at,
            finished_at: Utc::now(),
        })
    }
}
