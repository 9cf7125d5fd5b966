//! Graph builder with validation.

use super::dag::{detect_cycle, topological_order};
use super::{DependencyEdge, DependencyGraph};
use crate::core::ResourceGroup;
use crate::errors::{
    CyclicDependencyError, DanglingReferenceError, MissingDependencyOutput, PlanValidationError,
    RagstackError,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Builder for creating validated dependency graphs.
///
/// Validation runs in a fixed order so the first reported error is
/// deterministic: empty input, duplicate names, dangling edges, cycles, then
/// output references.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraphBuilder {
    /// Groups in declaration order.
    groups: Vec<ResourceGroup>,
    /// Edges in declaration order.
    edges: Vec<DependencyEdge>,
}

impl DependencyGraphBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a group.
    #[must_use]
    pub fn group(mut self, group: ResourceGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Adds several groups.
    #[must_use]
    pub fn groups(mut self, groups: impl IntoIterator<Item = ResourceGroup>) -> Self {
        self.groups.extend(groups);
        self
    }

    /// Adds an edge.
    #[must_use]
    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push(DependencyEdge::new(from, to));
        self
    }

    /// Adds several edges.
    #[must_use]
    pub fn edges(mut self, edges: impl IntoIterator<Item = DependencyEdge>) -> Self {
        self.edges.extend(edges);
        self
    }

    /// Returns the number of groups added so far.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Validates and builds the graph.
    ///
    /// # Errors
    ///
    /// - `Validation` for an empty group set or duplicate group names
    /// - `DanglingReference` if an edge or consumed output names an unknown group
    /// - `CyclicDependency` if the edges contain a cycle
    /// - `MissingDependencyOutput` if a consumed output is not exported by its
    ///   producer or has no edge from producer to consumer
    pub fn build(self) -> Result<DependencyGraph, RagstackError> {
        Self::build_from(self.groups, self.edges)
    }

    /// Validates `groups` and `edges` and builds the graph.
    ///
    /// # Errors
    ///
    /// See [`DependencyGraphBuilder::build`].
    pub fn build_from(
        groups: Vec<ResourceGroup>,
        edges: Vec<DependencyEdge>,
    ) -> Result<DependencyGraph, RagstackError> {
        if groups.is_empty() {
            return Err(PlanValidationError::empty().into());
        }

        let mut index: BTreeMap<String, usize> = BTreeMap::new();
        for (i, group) in groups.iter().enumerate() {
            if index.insert(group.name().to_string(), i).is_some() {
                return Err(PlanValidationError::duplicate_group(group.name()).into());
            }
        }

        let mut seen = BTreeSet::new();
        let mut unique_edges = Vec::with_capacity(edges.len());
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); groups.len()];
        for edge in edges {
            let from = *index
                .get(&edge.from)
                .ok_or_else(|| DanglingReferenceError::new(edge.to_string(), &edge.from))?;
            let to = *index
                .get(&edge.to)
                .ok_or_else(|| DanglingReferenceError::new(edge.to_string(), &edge.to))?;
            if seen.insert((from, to)) {
                successors[from].push(to);
                unique_edges.push(edge);
            }
        }

        let names: Vec<&str> = groups.iter().map(ResourceGroup::name).collect();
        if let Some(cycle) = detect_cycle(&names, &successors) {
            return Err(CyclicDependencyError::new(cycle).into());
        }

        for (consumer, group) in groups.iter().enumerate() {
            for output in group.consumes() {
                let producer = *index
                    .get(&output.producer)
                    .ok_or_else(|| DanglingReferenceError::new(group.name(), &output.producer))?;
                let exported = groups[producer].output(&output.name);
                let Some(exported) = exported.filter(|_| seen.contains(&(producer, consumer))) else {
                    return Err(
                        MissingDependencyOutput::new(group.name(), &output.producer, &output.name).into(),
                    );
                };
                if exported.kind != output.kind {
                    return Err(PlanValidationError::output_kind_mismatch(
                        group.name(),
                        &output.producer,
                        &output.name,
                        exported.kind,
                        output.kind,
                    )
                    .into());
                }
            }
        }

        let order = topological_order(&successors).ok_or_else(|| {
            CyclicDependencyError::new(names.iter().map(|n| (*n).to_string()).collect())
        })?;

        debug!(
            groups = groups.len(),
            edges = unique_edges.len(),
            order = ?order.iter().map(|&i| names[i]).collect::<Vec<_>>(),
            "Dependency graph built"
        );

        Ok(DependencyGraph::new(groups, unique_edges, index, successors, order))
    }
}
