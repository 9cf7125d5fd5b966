//! Upstream outputs visible to a provisioner while it declares its group.

use crate::core::{OutputRef, ResourceGroup};
use crate::errors::MissingDependencyOutput;
use std::collections::{BTreeMap, BTreeSet};

/// Provides an immutable view of outputs exported by upstream groups.
///
/// In strict mode only groups with a declared edge into the current group
/// are visible; anything else is reported as a missing dependency output.
#[derive(Debug, Clone, Default)]
pub struct GroupInputs {
    /// Outputs keyed by producer, then output name.
    outputs: BTreeMap<String, BTreeMap<String, OutputRef>>,
    /// Producers with a declared edge into this group.
    declared_dependencies: BTreeSet<String>,
    /// The group being declared (for error messages).
    group_name: String,
    /// Whether strict mode is enabled.
    strict: bool,
}

impl GroupInputs {
    /// Creates new inputs from already-declared groups.
    #[must_use]
    pub fn new<'a>(
        groups: impl IntoIterator<Item = &'a ResourceGroup>,
        declared_dependencies: BTreeSet<String>,
        group_name: impl Into<String>,
        strict: bool,
    ) -> Self {
        let outputs = groups
            .into_iter()
            .map(|g| {
                let by_name = g.outputs().map(|o| (o.name.clone(), o.clone())).collect();
                (g.name().to_string(), by_name)
            })
            .collect();

        Self {
            outputs,
            declared_dependencies,
            group_name: group_name.into(),
            strict,
        }
    }

    /// Creates strict inputs.
    #[must_use]
    pub fn strict<'a>(
        groups: impl IntoIterator<Item = &'a ResourceGroup>,
        declared_dependencies: BTreeSet<String>,
        group_name: impl Into<String>,
    ) -> Self {
        Self::new(groups, declared_dependencies, group_name, true)
    }

    /// Creates permissive inputs where every supplied group is visible.
    #[must_use]
    pub fn permissive<'a>(
        groups: impl IntoIterator<Item = &'a ResourceGroup>,
        group_name: impl Into<String>,
    ) -> Self {
        let mut inputs = Self::new(groups, BTreeSet::new(), group_name, false);
        inputs.declared_dependencies = inputs.outputs.keys().cloned().collect();
        inputs
    }

    /// Looks up an upstream output.
    ///
    /// # Errors
    ///
    /// Returns `MissingDependencyOutput` in strict mode if `producer` is not
    /// a declared dependency of this group.
    pub fn get(&self, producer: &str, output: &str) -> Result<Option<&OutputRef>, MissingDependencyOutput> {
        if self.strict && !self.declared_dependencies.contains(producer) {
            return Err(MissingDependencyOutput::new(&self.group_name, producer, output));
        }
        Ok(self.outputs.get(producer).and_then(|o| o.get(output)))
    }

    /// Looks up an upstream output that must exist.
    ///
    /// # Errors
    ///
    /// Returns `MissingDependencyOutput` if the output is not visible.
    pub fn require(&self, producer: &str, output: &str) -> Result<OutputRef, MissingDependencyOutput> {
        self.get(producer, output)?
            .cloned()
            .ok_or_else(|| MissingDependencyOutput::new(&self.group_name, producer, output))
    }

    /// Checks if outputs from a producer are present (ignores strictness).
    #[must_use]
    pub fn contains(&self, producer: &str) -> bool {
        self.outputs.contains_key(producer)
    }

    /// Returns the group these inputs are for.
    #[must_use]
    pub fn group_name(&self) -> &str {
        &self.group_name
    }

    /// Returns the declared dependencies.
    #[must_use]
    pub fn declared_dependencies(&self) -> &BTreeSet<String> {
        &self.declared_dependencies
    }

    /// Returns whether strict mode is enabled.
    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OutputKind;

    fn upstream() -> Vec<ResourceGroup> {
        vec![
            ResourceGroup::builder("role")
                .export_known("role-arn", OutputKind::Arn, "arn:role")
                .build()
                .unwrap(),
            ResourceGroup::builder("store")
                .export_deferred("collection-endpoint", OutputKind::Endpoint)
                .build()
                .unwrap(),
        ]
    }

    fn deps(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_permissive_access() {
        let groups = upstream();
        let inputs = GroupInputs::permissive(&groups, "kb");

        assert!(inputs.get("role", "role-arn").unwrap().is_some());
        assert!(inputs.get("store", "collection-endpoint").unwrap().is_some());
        assert!(inputs.get("other", "x").unwrap().is_none());
    }

    #[test]
    fn test_strict_declared_dependency() {
        let groups = upstream();
        let inputs = GroupInputs::strict(&groups, deps(&["role"]), "kb");

        assert!(inputs.require("role", "role-arn").is_ok());

        let err = inputs.require("store", "collection-endpoint").unwrap_err();
        assert_eq!(err.group, "kb");
        assert_eq!(err.output, "collection-endpoint");
    }

    #[test]
    fn test_require_missing_output() {
        let groups = upstream();
        let inputs = GroupInputs::strict(&groups, deps(&["role"]), "kb");

        let err = inputs.require("role", "role-name").unwrap_err();
        assert_eq!(err.producer, "role");
        assert_eq!(err.output, "role-name");
    }

    #[test]
    fn test_require_declared_but_undeclared_group() {
        let inputs = GroupInputs::strict(std::iter::empty(), deps(&["role"]), "kb");

        assert!(inputs.require("role", "role-arn").is_err());
        assert!(!inputs.contains("role"));
    }

    #[test]
    fn test_accessors() {
        let groups = upstream();
        let inputs = GroupInputs::strict(&groups, deps(&["role", "store"]), "kb");

        assert_eq!(inputs.group_name(), "kb");
        assert!(inputs.is_strict());
        assert_eq!(inputs.declared_dependencies().len(), 2);
        assert!(inputs.contains("store"));
    }
}
