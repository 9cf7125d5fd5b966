//! The deployment orchestrator.
//!
//! An [`Orchestrator`] owns a list of provisioners and the edges between
//! their groups. Each run declares every group, validates the dependency
//! graph, synthesizes a plan and hands it to a [`ProvisioningBackend`]. The
//! first error stops the run; nothing is applied if planning fails.

mod report;
mod state;

pub use report::{RunFailure, RunReport};
pub use state::{OrchestrationState, StateTracker, StateTransition};

use crate::backend::ProvisioningBackend;
use crate::context::{DeploymentContext, GroupInputs, RunIdentity};
use crate::core::ResourceGroup;
use crate::errors::{PlanValidationError, RagstackError};
use crate::events::{types, EventSink, NoOpEventSink, OrchestrationEvent};
use crate::graph::{schedule, DependencyEdge, DependencyGraphBuilder, DeploymentPlan};
use crate::provisioners::{
    KnowledgeBaseProvisioner, Provisioner, RoleProvisioner, VectorStoreProvisioner, KNOWLEDGE_BASE_GROUP,
    ROLE_GROUP, VECTOR_STORE_GROUP,
};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Declares, validates, plans and applies a deployment.
#[derive(Clone)]
pub struct Orchestrator {
    provisioners: Vec<Arc<dyn Provisioner>>,
    edges: Vec<DependencyEdge>,
    sink: Arc<dyn EventSink>,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("provisioners", &self.group_names())
            .field("edges", &self.edges)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Creates an empty builder.
    #[must_use]
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// Returns a builder preloaded with the RAG deployment: role, vector
    /// store and knowledge base, with the role before both others and the
    /// vector store before the knowledge base.
    #[must_use]
    pub fn rag_builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
            .provisioner(RoleProvisioner::new())
            .provisioner(VectorStoreProvisioner::new())
            .provisioner(KnowledgeBaseProvisioner::new())
            .edge(ROLE_GROUP, VECTOR_STORE_GROUP)
            .edge(ROLE_GROUP, KNOWLEDGE_BASE_GROUP)
            .edge(VECTOR_STORE_GROUP, KNOWLEDGE_BASE_GROUP)
    }

    /// Returns the RAG deployment orchestrator with no event sink.
    #[must_use]
    pub fn rag_default() -> Self {
        Self::rag_builder().build()
    }

    /// Returns the group names in registration order.
    #[must_use]
    pub fn group_names(&self) -> Vec<&str> {
        self.provisioners.iter().map(|p| p.group_name()).collect()
    }

    /// Returns the declared edges.
    #[must_use]
    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// Declares every group and synthesizes the deployment plan.
    ///
    /// Nothing is applied.
    ///
    /// # Errors
    ///
    /// Returns the first declaration or graph validation error.
    pub fn plan(&self, context: &DeploymentContext) -> Result<DeploymentPlan, RagstackError> {
        let identity = RunIdentity::new(&context.environment);
        let mut tracker = StateTracker::new();
        match self.synthesize(context, &identity, &mut tracker) {
            Ok(plan) => Ok(plan),
            Err(error) => {
                self.record_failure(&identity, &mut tracker, &error);
                Err(error)
            }
        }
    }

    /// Plans the deployment and applies it with `backend`.
    ///
    /// # Errors
    ///
    /// Returns a [`RunFailure`] carrying the first error and the states the
    /// run went through. Backend errors are passed through unchanged and
    /// never retried.
    pub async fn run(
        &self,
        context: &DeploymentContext,
        backend: &dyn ProvisioningBackend,
    ) -> Result<RunReport, RunFailure> {
        let identity = RunIdentity::new(&context.environment);
        let mut tracker = StateTracker::new();
        info!(
            run_id = %identity.run_id,
            environment = %identity.environment,
            backend = backend.name(),
            "Orchestration started"
        );

        let plan = match self.synthesize(context, &identity, &mut tracker) {
            Ok(plan) => plan,
            Err(error) => return Err(self.fail(identity, tracker, error)),
        };

        let apply = match backend.apply(&plan, context).await {
            Ok(apply) => apply,
            Err(error) => return Err(self.fail(identity, tracker, error.into())),
        };

        if let Err(error) = self.advance(&identity, &mut tracker, OrchestrationState::Applied) {
            return Err(self.fail(identity, tracker, error));
        }
        self.sink
            .emit(OrchestrationEvent::new(&identity, types::PLAN_APPLIED, apply.summary()))
            .await;
        info!(
            run_id = %identity.run_id,
            groups = apply.records.len(),
            duration_ms = identity.elapsed_ms(),
            "Orchestration applied"
        );

        Ok(RunReport {
            identity,
            plan,
            apply,
            transitions: tracker.transitions().to_vec(),
        })
    }

    fn synthesize(
        &self,
        context: &DeploymentContext,
        identity: &RunIdentity,
        tracker: &mut StateTracker,
    ) -> Result<DeploymentPlan, RagstackError> {
        self.advance(identity, tracker, OrchestrationState::Declaring)?;
        let groups = self.declare_groups(context, identity)?;

        let graph = DependencyGraphBuilder::build_from(groups, self.edges.clone())?;
        self.advance(identity, tracker, OrchestrationState::GraphBuilt)?;
        self.sink.try_emit(OrchestrationEvent::new(
            identity,
            types::GRAPH_BUILT,
            json!({
                "groups": graph.group_count(),
                "edges": graph.edges().len(),
                "order": graph.topological_order(),
            }),
        ));

        let plan = graph.into_plan();
        self.advance(identity, tracker, OrchestrationState::PlanSynthesized)?;
        self.sink
            .try_emit(OrchestrationEvent::new(identity, types::PLAN_SYNTHESIZED, plan.summary()));
        debug!(run_id = %identity.run_id, plan = %plan.summary(), "Plan synthesized");
        Ok(plan)
    }

    /// Returns provisioner indices in dependency order.
    ///
    /// Provisioners become eligible once every provisioner with an edge into
    /// them is scheduled; registration order breaks ties. Provisioners on a
    /// cycle are appended in registration order and left for graph
    /// validation to reject. Edges naming unknown groups are ignored here.
    fn declaration_order(&self) -> Vec<usize> {
        let mut indices: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, provisioner) in self.provisioners.iter().enumerate() {
            indices.entry(provisioner.group_name()).or_default().push(i);
        }

        let mut successors = vec![Vec::new(); self.provisioners.len()];
        let unique: BTreeSet<(&str, &str)> =
            self.edges.iter().map(|e| (e.from.as_str(), e.to.as_str())).collect();
        for (from, to) in unique {
            let (Some(froms), Some(tos)) = (indices.get(from), indices.get(to)) else {
                continue;
            };
            for &f in froms {
                successors[f].extend(tos.iter().copied());
            }
        }

        let mut order = schedule(&successors);
        let scheduled: BTreeSet<usize> = order.iter().copied().collect();
        order.extend((0..self.provisioners.len()).filter(|i| !scheduled.contains(i)));
        order
    }

    /// Declares groups in dependency order and returns them in registration
    /// order.
    ///
    /// Each provisioner sees only the outputs of groups that are already
    /// declared and have an edge into its group.
    fn declare_groups(
        &self,
        context: &DeploymentContext,
        identity: &RunIdentity,
    ) -> Result<Vec<ResourceGroup>, RagstackError> {
        let mut declared: Vec<(usize, ResourceGroup)> = Vec::with_capacity(self.provisioners.len());

        for index in self.declaration_order() {
            let provisioner = &self.provisioners[index];
            let name = provisioner.group_name();
            let dependencies: BTreeSet<String> = self
                .edges
                .iter()
                .filter(|e| e.to == name)
                .map(|e| e.from.clone())
                .collect();
            let visible = declared
                .iter()
                .map(|(_, g)| g)
                .filter(|g| dependencies.contains(g.name()));
            let inputs = GroupInputs::strict(visible, dependencies.clone(), name);

            let group = provisioner.declare(context, &inputs)?;
            if group.name() != name {
                return Err(PlanValidationError::new(format!(
                    "Provisioner for '{name}' declared group '{}'",
                    group.name()
                ))
                .with_groups(vec![name.to_string(), group.name().to_string()])
                .into());
            }

            debug!(
                group = name,
                resources = group.resource_count(),
                outputs = group.outputs().count(),
                "Group declared"
            );
            self.sink.try_emit(OrchestrationEvent::new(
                identity,
                types::GROUP_DECLARED,
                json!({
                    "group": name,
                    "resources": group.resource_count(),
                    "outputs": group.outputs().map(|o| o.name.clone()).collect::<Vec<_>>(),
                    "fingerprint": group.fingerprint(),
                }),
            ));
            declared.push((index, group));
        }

        declared.sort_by_key(|(index, _)| *index);
        Ok(declared.into_iter().map(|(_, group)| group).collect())
    }

    fn advance(
        &self,
        identity: &RunIdentity,
        tracker: &mut StateTracker,
        next: OrchestrationState,
    ) -> Result<(), RagstackError> {
        let transition = tracker.transition(next)?;
        self.sink.try_emit(OrchestrationEvent::new(
            identity,
            types::STATE_CHANGED,
            json!({ "from": transition.from, "to": transition.to }),
        ));
        Ok(())
    }

    fn record_failure(&self, identity: &RunIdentity, tracker: &mut StateTracker, error: &RagstackError) {
        let failed_in = tracker.current();
        if self.advance(identity, tracker, OrchestrationState::Failed).is_err() {
            return;
        }
        error!(
            run_id = %identity.run_id,
            state = %failed_in,
            error = %error,
            "Orchestration failed"
        );
        self.sink.try_emit(OrchestrationEvent::new(
            identity,
            types::FAILED,
            json!({
                "state": failed_in,
                "error": error.to_string(),
                "error_info": error.error_info().map(crate::errors::ErrorInfo::to_json),
            }),
        ));
    }

    fn fail(&self, identity: RunIdentity, mut tracker: StateTracker, error: RagstackError) -> RunFailure {
        self.record_failure(&identity, &mut tracker, &error);
        RunFailure {
            identity,
            transitions: tracker.transitions().to_vec(),
            error,
        }
    }
}

/// Builder for [`Orchestrator`].
#[derive(Clone)]
pub struct OrchestratorBuilder {
    provisioners: Vec<Arc<dyn Provisioner>>,
    edges: Vec<DependencyEdge>,
    sink: Arc<dyn EventSink>,
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self {
            provisioners: Vec::new(),
            edges: Vec::new(),
            sink: Arc::new(NoOpEventSink),
        }
    }
}

impl fmt::Debug for OrchestratorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrchestratorBuilder")
            .field("provisioners", &self.provisioners)
            .field("edges", &self.edges)
            .finish_non_exhaustive()
    }
}

impl OrchestratorBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provisioner. Registration order breaks ties between
    /// groups with no edge between them.
    #[must_use]
    pub fn provisioner(mut self, provisioner: impl Provisioner + 'static) -> Self {
        self.provisioners.push(Arc::new(provisioner));
        self
    }

    /// Registers a shared provisioner.
    #[must_use]
    pub fn shared_provisioner(mut self, provisioner: Arc<dyn Provisioner>) -> Self {
        self.provisioners.push(provisioner);
        self
    }

    /// Declares that `from` must be provisioned before `to`.
    #[must_use]
    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push(DependencyEdge::new(from, to));
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Builds the orchestrator.
    ///
    /// Structural problems (duplicate groups, dangling edges, cycles) are
    /// reported when a run builds the graph.
    #[must_use]
    pub fn build(self) -> Orchestrator {
        Orchestrator {
            provisioners: self.provisioners,
            edges: self.edges,
            sink: self.sink,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{GroupChange, InMemoryBackend};
    use crate::events::CollectingEventSink;
    use crate::core::OutputKind;
    use crate::provisioners::outputs;
    use crate::testing::fixtures::sample_context;
    use crate::testing::mocks::{FailingBackend, RecordingBackend, StaticProvisioner};
    use pretty_assertions::assert_eq;
    use super::OrchestrationState::{Applied, Declaring, Failed, GraphBuilt, Initialized, PlanSynthesized};

    #[test]
    fn test_rag_plan_order() {
        let plan = Orchestrator::rag_default().plan(&sample_context()).unwrap();

        assert_eq!(
            plan.group_names(),
            vec![ROLE_GROUP, VECTOR_STORE_GROUP, KNOWLEDGE_BASE_GROUP]
        );
        assert!(plan.respects(Orchestrator::rag_default().edges()));
    }

    #[test]
    fn test_rag_plan_is_byte_identical_across_runs() {
        let context = sample_context();
        let first = Orchestrator::rag_default().plan(&context).unwrap();
        let second = Orchestrator::rag_default().plan(&context).unwrap();

        assert_eq!(first.to_bytes(), second.to_bytes());
        assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[tokio::test]
    async fn test_run_records_every_state() {
        let sink = Arc::new(CollectingEventSink::new());
        let orchestrator = Orchestrator::rag_builder().event_sink(sink.clone()).build();
        let backend = InMemoryBackend::new();

        let report = orchestrator.run(&sample_context(), &backend).await.unwrap();

        assert_eq!(
            report.states(),
            vec![Initialized, Declaring, GraphBuilt, PlanSynthesized, Applied]
        );
        assert_eq!(report.final_state(), Applied);
        assert_eq!(report.apply.count(GroupChange::Created), 3);
        assert_eq!(sink.events_of_type(types::GROUP_DECLARED).len(), 3);
        assert_eq!(sink.events_of_type(types::STATE_CHANGED).len(), 4);
        assert_eq!(sink.event_types().last().map(String::as_str), Some(types::PLAN_APPLIED));
        assert!(sink.events().iter().all(|e| e.run_id == report.identity.run_id));
    }

    #[tokio::test]
    async fn test_apply_error_is_propagated_unchanged() {
        let backend = FailingBackend::new(KNOWLEDGE_BASE_GROUP, "quota exceeded");

        let failure = Orchestrator::rag_default()
            .run(&sample_context(), &backend)
            .await
            .unwrap_err();

        assert_eq!(failure.failed_after(), PlanSynthesized);
        assert_eq!(failure.states().last(), Some(&Failed));
        match failure.into_error() {
            RagstackError::Apply(e) => {
                assert_eq!(e.group.as_deref(), Some(KNOWLEDGE_BASE_GROUP));
                assert_eq!(e.message, "quota exceeded");
            }
            other => panic!("expected apply error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_edge_fails_before_apply() {
        let orchestrator = Orchestrator::builder()
            .provisioner(RoleProvisioner::new())
            .provisioner(VectorStoreProvisioner::new())
            .provisioner(KnowledgeBaseProvisioner::new())
            .edge(ROLE_GROUP, VECTOR_STORE_GROUP)
            .edge(ROLE_GROUP, KNOWLEDGE_BASE_GROUP)
            .build();
        let backend = RecordingBackend::new();

        let failure = orchestrator.run(&sample_context(), &backend).await.unwrap_err();

        assert_eq!(failure.failed_after(), Declaring);
        assert_eq!(backend.call_count(), 0);
        match failure.error {
            RagstackError::MissingDependencyOutput(e) => {
                assert_eq!(e.group, KNOWLEDGE_BASE_GROUP);
                assert_eq!(e.producer, VECTOR_STORE_GROUP);
                assert_eq!(e.output, outputs::COLLECTION_ENDPOINT);
            }
            other => panic!("expected missing dependency output, got {other:?}"),
        }
    }

    #[test]
    fn test_registration_order_does_not_matter() {
        let orchestrator = Orchestrator::builder()
            .provisioner(KnowledgeBaseProvisioner::new())
            .provisioner(VectorStoreProvisioner::new())
            .provisioner(RoleProvisioner::new())
            .edge(ROLE_GROUP, VECTOR_STORE_GROUP)
            .edge(ROLE_GROUP, KNOWLEDGE_BASE_GROUP)
            .edge(VECTOR_STORE_GROUP, KNOWLEDGE_BASE_GROUP)
            .build();

        let plan = orchestrator.plan(&sample_context()).unwrap();

        assert_eq!(
            plan.group_names(),
            vec![ROLE_GROUP, VECTOR_STORE_GROUP, KNOWLEDGE_BASE_GROUP]
        );
        assert_eq!(
            plan.fingerprint(),
            Orchestrator::rag_default().plan(&sample_context()).unwrap().fingerprint()
        );
    }

    #[test]
    fn test_groups_declared_in_dependency_order() {
        let sink = Arc::new(CollectingEventSink::new());
        let orchestrator = Orchestrator::builder()
            .provisioner(StaticProvisioner::new("C").requiring("B", "id"))
            .provisioner(StaticProvisioner::new("B").exporting("id", OutputKind::Identifier, "b-1"))
            .provisioner(StaticProvisioner::new("A"))
            .edge("B", "C")
            .event_sink(sink.clone())
            .build();

        let plan = orchestrator.plan(&sample_context()).unwrap();

        let declared: Vec<String> = sink
            .events_of_type(types::GROUP_DECLARED)
            .iter()
            .map(|e| e.data["group"].as_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(declared, vec!["B", "C", "A"]);
        assert_eq!(plan.group_names(), vec!["B", "C", "A"]);
    }

    #[test]
    fn test_unknown_edge_end_reported_before_cycle() {
        let orchestrator = Orchestrator::builder()
            .provisioner(StaticProvisioner::new("A"))
            .provisioner(StaticProvisioner::new("B"))
            .edge("A", "B")
            .edge("B", "A")
            .edge("A", "Unknown")
            .build();

        let err = orchestrator.plan(&sample_context()).unwrap_err();
        assert!(matches!(err, RagstackError::DanglingReference(_)));
    }

    #[test]
    fn test_downstream_not_declared_after_upstream_failure() {
        let sink = Arc::new(CollectingEventSink::new());
        let orchestrator = Orchestrator::builder()
            .provisioner(StaticProvisioner::failing("Upstream"))
            .provisioner(StaticProvisioner::new("Downstream"))
            .edge("Upstream", "Downstream")
            .event_sink(sink.clone())
            .build();

        assert!(orchestrator.plan(&sample_context()).is_err());
        assert!(sink.events_of_type(types::GROUP_DECLARED).is_empty());
        assert_eq!(sink.events_of_type(types::FAILED).len(), 1);
    }

    #[test]
    fn test_cycle_rejected_after_declaring() {
        let orchestrator = Orchestrator::builder()
            .provisioner(StaticProvisioner::new("A"))
            .provisioner(StaticProvisioner::new("B"))
            .edge("A", "B")
            .edge("B", "A")
            .build();

        let err = orchestrator.plan(&sample_context()).unwrap_err();
        assert!(matches!(err, RagstackError::CyclicDependency(_)));
    }

    #[test]
    fn test_dangling_edge_rejected() {
        let orchestrator = Orchestrator::builder()
            .provisioner(StaticProvisioner::new("A"))
            .edge("A", "Missing")
            .build();

        let err = orchestrator.plan(&sample_context()).unwrap_err();
        assert!(matches!(err, RagstackError::DanglingReference(_)));
    }

    #[test]
    fn test_provisioner_sees_only_declared_dependencies() {
        let orchestrator = Orchestrator::builder()
            .provisioner(RoleProvisioner::new())
            .provisioner(VectorStoreProvisioner::new())
            .build();

        match orchestrator.plan(&sample_context()).unwrap_err() {
            RagstackError::MissingDependencyOutput(e) => {
                assert_eq!(e.group, VECTOR_STORE_GROUP);
                assert_eq!(e.output, outputs::ROLE_ARN);
            }
            other => panic!("expected missing dependency output, got {other:?}"),
        }
    }

    #[test]
    fn test_provisioner_must_declare_its_own_group() {
        let orchestrator = Orchestrator::builder()
            .provisioner(StaticProvisioner::new("A").declaring_as("B"))
            .build();

        assert!(matches!(
            orchestrator.plan(&sample_context()),
            Err(RagstackError::Validation(_))
        ));
    }

    #[test]
    fn test_independent_groups_any_order() {
        let forward = Orchestrator::builder()
            .provisioner(StaticProvisioner::new("X"))
            .provisioner(StaticProvisioner::new("Y"))
            .build()
            .plan(&sample_context())
            .unwrap();

        assert_eq!(forward.group_names(), vec!["X", "Y"]);
        assert!(forward.respects(&[]));
        assert_eq!(forward.waves().len(), 1);
    }
}
