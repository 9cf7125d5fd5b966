//! Deployment plans.

use super::DependencyEdge;
use crate::core::ResourceGroup;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// An ordered sequence of resource groups that respects every edge.
///
/// Plans are derived once per orchestration run and never mutated. The
/// serialized form contains no run-specific data, so identical inputs give
/// byte-identical plans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentPlan {
    groups: Vec<ResourceGroup>,
    edges: Vec<DependencyEdge>,
}

impl DeploymentPlan {
    pub(super) fn new(groups: Vec<ResourceGroup>, edges: Vec<DependencyEdge>) -> Self {
        Self { groups, edges }
    }

    /// Returns the groups in apply order.
    #[must_use]
    pub fn groups(&self) -> &[ResourceGroup] {
        &self.groups
    }

    /// Returns the edges the plan was ordered by.
    #[must_use]
    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// Returns the number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns true if the plan has no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Returns group names in apply order.
    #[must_use]
    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(ResourceGroup::name).collect()
    }

    /// Returns a group by name.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&ResourceGroup> {
        self.groups.iter().find(|g| g.name() == name)
    }

    /// Returns the position of a group in the plan.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.name() == name)
    }

    /// Returns the edges this plan does not satisfy.
    ///
    /// An edge is violated when either end is missing from the plan or
    /// `from` does not strictly precede `to`.
    #[must_use]
    pub fn violations<'a>(&self, edges: &'a [DependencyEdge]) -> Vec<&'a DependencyEdge> {
        edges
            .iter()
            .filter(|e| match (self.position(&e.from), self.position(&e.to)) {
                (Some(from), Some(to)) => from >= to,
                _ => true,
            })
            .collect()
    }

    /// Returns true if every edge has `from` strictly before `to`.
    #[must_use]
    pub fn respects(&self, edges: &[DependencyEdge]) -> bool {
        self.violations(edges).is_empty()
    }

    /// Partitions the plan into dependency levels.
    ///
    /// Every group in a wave depends only on groups in earlier waves, so a
    /// backend may apply the members of one wave concurrently. Groups keep
    /// their plan order inside a wave.
    #[must_use]
    pub fn waves(&self) -> Vec<Vec<&ResourceGroup>> {
        let mut level: BTreeMap<&str, usize> = BTreeMap::new();
        let mut waves: Vec<Vec<&ResourceGroup>> = Vec::new();

        for group in &self.groups {
            let depth = self
                .edges
                .iter()
                .filter(|e| e.to == group.name())
                .filter_map(|e| level.get(e.from.as_str()))
                .map(|d| d + 1)
                .max()
                .unwrap_or(0);
            level.insert(group.name(), depth);
            if waves.len() <= depth {
                waves.resize_with(depth + 1, Vec::new);
            }
            waves[depth].push(group);
        }
        waves
    }

    /// Returns a SHA-256 fingerprint of the serialized plan.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.to_bytes()))
    }

    /// Returns per-group fingerprints keyed by group name.
    #[must_use]
    pub fn group_fingerprints(&self) -> BTreeMap<String, String> {
        self.groups
            .iter()
            .map(|g| (g.name().to_string(), g.fingerprint()))
            .collect()
    }

    /// Serializes the plan to canonical JSON bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Serializes the plan to pretty JSON.
    #[must_use]
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Returns a compact summary suitable for logs.
    #[must_use]
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "groups": self.group_names(),
            "resources": self.groups.iter().map(ResourceGroup::resource_count).sum::<usize>(),
            "waves": self.waves().len(),
            "fingerprint": self.fingerprint(),
        })
    }
}
