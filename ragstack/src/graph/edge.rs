//! Declared dependency edges.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordering constraint: `from` must be fully provisioned before `to`.
///
/// Edges are always declared explicitly; referencing an output never adds
/// one implicitly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// The upstream group.
    pub from: String,
    /// The downstream group.
    pub to: String,
}

impl DependencyEdge {
    /// Creates a new edge.
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Returns true if the edge points a group at itself.
    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}

impl fmt::Display for DependencyEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

impl<A: Into<String>, B: Into<String>> From<(A, B)> for DependencyEdge {
    fn from((from, to): (A, B)) -> Self {
        Self::new(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_display() {
        let edge = DependencyEdge::new("KbRoleStack", "KbInfraStack");
        assert_eq!(edge.to_string(), "KbRoleStack -> KbInfraStack");
        assert!(!edge.is_self_loop());
    }

    #[test]
    fn test_edge_from_tuple() {
        let edge: DependencyEdge = ("a", "a").into();
        assert!(edge.is_self_loop());
    }
}
