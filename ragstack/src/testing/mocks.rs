//! Mock provisioners and backends.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::backend::{ApplyResult, GroupApplyRecord, GroupChange, ProvisioningBackend};
use crate::context::{DeploymentContext, GroupInputs};
use crate::core::{OutputKind, ResourceDeclaration, ResourceGroup, ResourceKind};
use crate::errors::{ApplyError, PlanValidationError, RagstackError};
use crate::graph::DeploymentPlan;
use crate::provisioners::Provisioner;

/// A provisioner that declares a fixed group.
///
/// It requires every configured upstream output through the strict inputs,
/// so it can be used to exercise dependency visibility.
#[derive(Debug, Clone)]
pub struct StaticProvisioner {
    name: String,
    declared_name: Option<String>,
    exports: Vec<(String, OutputKind, String)>,
    requires: Vec<(String, String)>,
    fails: bool,
}

impl StaticProvisioner {
    /// Creates a provisioner declaring an empty group named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_name: None,
            exports: Vec::new(),
            requires: Vec::new(),
            fails: false,
        }
    }

    /// Creates a provisioner whose `declare` always fails.
    #[must_use]
    pub fn failing(name: impl Into<String>) -> Self {
        Self {
            fails: true,
            ..Self::new(name)
        }
    }

    /// Exports a known output.
    #[must_use]
    pub fn exporting(mut self, output: impl Into<String>, kind: OutputKind, value: impl Into<String>) -> Self {
        self.exports.push((output.into(), kind, value.into()));
        self
    }

    /// Requires an upstream output.
    #[must_use]
    pub fn requiring(mut self, producer: impl Into<String>, output: impl Into<String>) -> Self {
        self.requires.push((producer.into(), output.into()));
        self
    }

    /// Declares the group under a different name than it reports.
    #[must_use]
    pub fn declaring_as(mut self, name: impl Into<String>) -> Self {
        self.declared_name = Some(name.into());
        self
    }
}

impl Provisioner for StaticProvisioner {
    fn group_name(&self) -> &str {
        &self.name
    }

    fn declare(&self, _context: &DeploymentContext, inputs: &GroupInputs) -> Result<ResourceGroup, RagstackError> {
        if self.fails {
            return Err(PlanValidationError::new(format!("'{}' failed to declare", self.name)).into());
        }

        let name = self.declared_name.as_deref().unwrap_or(&self.name);
        let mut builder = ResourceGroup::builder(name)
            .declare(ResourceDeclaration::new(format!("{name}-resource"), ResourceKind::Role));
        for (producer, output) in &self.requires {
            builder = builder.consume(inputs.require(producer, output)?);
        }
        for (output, kind, value) in &self.exports {
            builder = builder.export_known(output, *kind, value);
        }
        Ok(builder.build()?)
    }
}

/// A backend that records every plan it receives and reports groups as created.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Mutex<Vec<Vec<String>>>,
}

impl RecordingBackend {
    /// Creates a new recording backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of `apply` calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns the group order of every received plan.
    #[must_use]
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ProvisioningBackend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    async fn apply(&self, plan: &DeploymentPlan, _context: &DeploymentContext) -> Result<ApplyResult, ApplyError> {
        let started_at = Utc::now();
        self.calls
            .lock()
            .push(plan.group_names().into_iter().map(String::from).collect());

        let records = plan
            .groups()
            .iter()
            .map(|g| GroupApplyRecord {
                group: g.name().to_string(),
                change: GroupChange::Created,
                fingerprint: g.fingerprint(),
                resources: g.resource_count(),
                applied_at: Utc::now(),
            })
            .collect();

        Ok(ApplyResult {
            backend: self.name().to_string(),
            plan_fingerprint: plan.fingerprint(),
            records,
            started_at,
            finished_at: Utc::now(),
        })
    }
}

/// A backend that fails when it reaches a given group.
///
/// Groups before the failing one are recorded as applied. If the plan does
/// not contain the group, the whole apply fails without a group.
#[derive(Debug)]
pub struct FailingBackend {
    group: String,
    message: String,
    applied: Mutex<Vec<String>>,
}

impl FailingBackend {
    /// Creates a backend failing at `group` with `message`.
    #[must_use]
    pub fn new(group: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            message: message.into(),
            applied: Mutex::new(Vec::new()),
        }
    }

    /// Returns the groups applied before the failure.
    #[must_use]
    pub fn applied(&self) -> Vec<String> {
        self.applied.lock().clone()
    }
}

#[async_trait]
impl ProvisioningBackend for FailingBackend {
    fn name(&self) -> &str {
        "failing"
    }

    async fn apply(&self, plan: &DeploymentPlan, _context: &DeploymentContext) -> Result<ApplyResult, ApplyError> {
        if plan.group(&self.group).is_none() {
            return Err(ApplyError::new(self.message.clone()));
        }
        for group in plan.groups() {
            if group.name() == self.group {
                return Err(ApplyError::for_group(&self.group, self.message.clone()));
            }
            self.applied.lock().push(group.name().to_string());
        }
        Err(ApplyError::new(self.message.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::Orchestrator;
    use crate::provisioners::{KNOWLEDGE_BASE_GROUP, ROLE_GROUP, VECTOR_STORE_GROUP};
    use crate::testing::fixtures::sample_context;
    use std::collections::BTreeSet;

    #[test]
    fn test_static_provisioner_requires_through_inputs() {
        let producer = StaticProvisioner::new("P")
            .exporting("id", OutputKind::Identifier, "p-1")
            .declare(&sample_context(), &GroupInputs::default())
            .unwrap();

        let consumer = StaticProvisioner::new("C").requiring("P", "id");
        let visible = GroupInputs::strict([&producer], BTreeSet::from(["P".to_string()]), "C");
        let hidden = GroupInputs::strict([&producer], BTreeSet::new(), "C");

        let group = consumer.declare(&sample_context(), &visible).unwrap();
        assert_eq!(group.consumes()[0].known_value(), Some("p-1"));
        assert!(consumer.declare(&sample_context(), &hidden).is_err());
    }

    #[tokio::test]
    async fn test_recording_backend() {
        let context = sample_context();
        let plan = Orchestrator::rag_default().plan(&context).unwrap();
        let backend = RecordingBackend::new();

        backend.apply(&plan, &context).await.unwrap();

        assert_eq!(backend.call_count(), 1);
        assert_eq!(
            backend.calls()[0],
            vec![ROLE_GROUP, VECTOR_STORE_GROUP, KNOWLEDGE_BASE_GROUP]
        );
    }

    #[tokio::test]
    async fn test_failing_backend_stops_at_group() {
        let context = sample_context();
        let plan = Orchestrator::rag_default().plan(&context).unwrap();
        let backend = FailingBackend::new(VECTOR_STORE_GROUP, "denied");

        let err = backend.apply(&plan, &context).await.unwrap_err();

        assert_eq!(err, ApplyError::for_group(VECTOR_STORE_GROUP, "denied"));
        assert_eq!(backend.applied(), vec![ROLE_GROUP]);
    }
}
