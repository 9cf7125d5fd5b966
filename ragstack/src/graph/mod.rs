//! Dependency graph construction and plan synthesis.
//!
//! Groups are connected by explicitly declared edges. The builder validates
//! the graph (no dangling references, no cycles, every consumed output
//! reachable across an edge) and orders it with Kahn's algorithm.

mod builder;
mod dag;
mod edge;
mod plan;

pub use builder::DependencyGraphBuilder;
pub use dag::DependencyGraph;
pub use edge::DependencyEdge;
pub use plan::DeploymentPlan;

pub(crate) use dag::schedule;
