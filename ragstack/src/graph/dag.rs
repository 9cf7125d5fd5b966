//! Validated dependency graph and its ordering algorithms.

use super::{DependencyEdge, DeploymentPlan};
use crate::core::ResourceGroup;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

/// A validated, acyclic graph of resource groups.
///
/// Only [`DependencyGraphBuilder`](super::DependencyGraphBuilder) creates
/// graphs, so every instance satisfies the acyclicity and output-reference
/// invariants.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Groups in declaration order.
    groups: Vec<ResourceGroup>,
    /// Deduplicated edges in declaration order.
    edges: Vec<DependencyEdge>,
    /// Group name to declaration index.
    index: BTreeMap<String, usize>,
    /// Successor indices per group.
    successors: Vec<Vec<usize>>,
    /// Topological order as declaration indices.
    order: Vec<usize>,
}

impl DependencyGraph {
    pub(super) fn new(
        groups: Vec<ResourceGroup>,
        edges: Vec<DependencyEdge>,
        index: BTreeMap<String, usize>,
        successors: Vec<Vec<usize>>,
        order: Vec<usize>,
    ) -> Self {
        Self {
            groups,
            edges,
            index,
            successors,
            order,
        }
    }

    /// Returns the number of groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Returns the groups in declaration order.
    #[must_use]
    pub fn groups(&self) -> &[ResourceGroup] {
        &self.groups
    }

    /// Returns the edges.
    #[must_use]
    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// Returns a group by name.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&ResourceGroup> {
        self.index.get(name).map(|&i| &self.groups[i])
    }

    /// Returns the groups `name` directly depends on, in declaration order.
    #[must_use]
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        let Some(&target) = self.index.get(name) else {
            return Vec::new();
        };
        let mut deps: Vec<usize> = self
            .successors
            .iter()
            .enumerate()
            .filter(|(_, succ)| succ.contains(&target))
            .map(|(i, _)| i)
            .collect();
        deps.sort_unstable();
        deps.into_iter().map(|i| self.groups[i].name()).collect()
    }

    /// Returns the groups that directly depend on `name`, in declaration order.
    #[must_use]
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        let Some(&source) = self.index.get(name) else {
            return Vec::new();
        };
        let mut deps = self.successors[source].clone();
        deps.sort_unstable();
        deps.into_iter().map(|i| self.groups[i].name()).collect()
    }

    /// Returns group names in topological order.
    #[must_use]
    pub fn topological_order(&self) -> Vec<&str> {
        self.order.iter().map(|&i| self.groups[i].name()).collect()
    }

    /// Synthesizes the deployment plan.
    #[must_use]
    pub fn to_plan(&self) -> DeploymentPlan {
        let groups = self.order.iter().map(|&i| self.groups[i].clone()).collect();
        DeploymentPlan::new(groups, self.edges.clone())
    }

    /// Consumes the graph and synthesizes the deployment plan.
    #[must_use]
    pub fn into_plan(self) -> DeploymentPlan {
        let mut slots: Vec<Option<ResourceGroup>> = self.groups.into_iter().map(Some).collect();
        let groups = self.order.iter().filter_map(|&i| slots[i].take()).collect();
        DeploymentPlan::new(groups, self.edges)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Visited,
}

/// Finds a cycle by depth-first traversal.
///
/// Roots and successors are visited in declaration order, so the same input
/// always reports the same cycle. The returned path repeats its first node
/// at the end.
pub(super) fn detect_cycle(names: &[&str], successors: &[Vec<usize>]) -> Option<Vec<String>> {
    fn visit(
        node: usize,
        successors: &[Vec<usize>],
        marks: &mut [Mark],
        path: &mut Vec<usize>,
    ) -> Option<Vec<usize>> {
        marks[node] = Mark::Visiting;
        path.push(node);

        for &next in &successors[node] {
            match marks[next] {
                Mark::Visiting => {
                    let start = path.iter().position(|&n| n == next).unwrap_or(0);
                    let mut cycle = path[start..].to_vec();
                    cycle.push(next);
                    return Some(cycle);
                }
                Mark::Unvisited => {
                    if let Some(cycle) = visit(next, successors, marks, path) {
                        return Some(cycle);
                    }
                }
                Mark::Visited => {}
            }
        }

        path.pop();
        marks[node] = Mark::Visited;
        None
    }

    let mut marks = vec![Mark::Unvisited; names.len()];
    let mut path = Vec::new();

    for root in 0..names.len() {
        if marks[root] == Mark::Unvisited {
            if let Some(cycle) = visit(root, successors, &mut marks, &mut path) {
                return Some(cycle.into_iter().map(|i| names[i].to_string()).collect());
            }
        }
    }
    None
}

/// Kahn's algorithm with a declaration-order tie-break.
///
/// Among groups whose dependencies are all scheduled, the one declared first
/// is scheduled first. Returns `None` if not every node could be scheduled.
pub(super) fn topological_order(successors: &[Vec<usize>]) -> Option<Vec<usize>> {
    let order = schedule(successors);
    (order.len() == successors.len()).then_some(order)
}

/// Schedules nodes with Kahn's algorithm, declaration order breaking ties.
///
/// Nodes on or behind a cycle are left out of the result.
pub(crate) fn schedule(successors: &[Vec<usize>]) -> Vec<usize> {
    let mut in_degree = vec![0usize; successors.len()];
    for succ in successors {
        for &to in succ {
            in_degree[to] += 1;
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(successors.len());
    while let Some(Reverse(node)) = ready.pop() {
        order.push(node);
        for &to in &successors[node] {
            in_degree[to] -= 1;
            if in_degree[to] == 0 {
                ready.push(Reverse(to));
            }
        }
    }
    order
}
