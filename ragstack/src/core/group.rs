//! Resource groups and the declarations they bundle.

use super::{OutputKind, OutputRef, ResourceKind};
use crate::errors::{ErrorInfo, PlanValidationError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// A single cloud resource declared by a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDeclaration {
    /// Identifier unique within the owning group.
    pub logical_id: String,
    /// What kind of resource this is.
    pub kind: ResourceKind,
    /// Resource properties handed to the backend as-is.
    pub properties: serde_json::Value,
}

impl ResourceDeclaration {
    /// Creates a declaration with no properties.
    #[must_use]
    pub fn new(logical_id: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            logical_id: logical_id.into(),
            kind,
            properties: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    /// Replaces the properties.
    #[must_use]
    pub fn with_properties(mut self, properties: serde_json::Value) -> Self {
        self.properties = properties;
        self
    }

    /// Sets a single property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        if let Some(map) = self.properties.as_object_mut() {
            map.insert(key.into(), value);
        }
        self
    }

    /// Returns a property value.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(key)
    }

    /// Returns the physical resource name, when the declaration sets one.
    #[must_use]
    pub fn physical_name(&self) -> Option<&str> {
        self.properties.get("name").and_then(serde_json::Value::as_str)
    }
}

/// A named, independently deployable bundle of resource declarations.
///
/// Groups are immutable once built; use [`ResourceGroupBuilder`] to create one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGroup {
    name: String,
    outputs: BTreeMap<String, OutputRef>,
    declares: BTreeMap<String, ResourceDeclaration>,
    consumes: Vec<OutputRef>,
}

impl ResourceGroup {
    /// Starts building a group.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ResourceGroupBuilder {
        ResourceGroupBuilder::new(name)
    }

    /// Returns the group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns an exported output by name.
    #[must_use]
    pub fn output(&self, name: &str) -> Option<&OutputRef> {
        self.outputs.get(name)
    }

    /// Returns all exported outputs, ordered by name.
    pub fn outputs(&self) -> impl Iterator<Item = &OutputRef> {
        self.outputs.values()
    }

    /// Returns a declaration by logical id.
    #[must_use]
    pub fn declaration(&self, logical_id: &str) -> Option<&ResourceDeclaration> {
        self.declares.get(logical_id)
    }

    /// Returns all declarations, ordered by logical id.
    pub fn declarations(&self) -> impl Iterator<Item = &ResourceDeclaration> {
        self.declares.values()
    }

    /// Returns declarations of one kind.
    pub fn declarations_of(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceDeclaration> {
        self.declares.values().filter(move |d| d.kind == kind)
    }

    /// Returns the number of declared resources.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.declares.len()
    }

    /// Returns the upstream outputs this group references.
    #[must_use]
    pub fn consumes(&self) -> &[OutputRef] {
        &self.consumes
    }

    /// Returns a stable SHA-256 fingerprint of the group's content.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }
}

/// Builder for [`ResourceGroup`].
#[derive(Debug, Clone)]
pub struct ResourceGroupBuilder {
    name: String,
    outputs: Vec<OutputRef>,
    declares: Vec<ResourceDeclaration>,
    consumes: Vec<OutputRef>,
}

impl ResourceGroupBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outputs: Vec::new(),
            declares: Vec::new(),
            consumes: Vec::new(),
        }
    }

    /// Adds a resource declaration.
    #[must_use]
    pub fn declare(mut self, declaration: ResourceDeclaration) -> Self {
        self.declares.push(declaration);
        self
    }

    /// Exports an output whose value is known now.
    #[must_use]
    pub fn export_known(mut self, name: impl Into<String>, kind: OutputKind, value: impl Into<String>) -> Self {
        let output = OutputRef::known(&self.name, name, kind, value);
        self.outputs.push(output);
        self
    }

    /// Exports an output resolved at apply time.
    #[must_use]
    pub fn export_deferred(mut self, name: impl Into<String>, kind: OutputKind) -> Self {
        let output = OutputRef::deferred(&self.name, name, kind);
        self.outputs.push(output);
        self
    }

    /// Records that the group references an upstream output.
    #[must_use]
    pub fn consume(mut self, output: OutputRef) -> Self {
        if !self.consumes.contains(&output) {
            self.consumes.push(output);
        }
        self
    }

    /// Builds the group.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank, a logical id or output name is
    /// repeated, or the group consumes one of its own outputs.
    pub fn build(self) -> Result<ResourceGroup, PlanValidationError> {
        if self.name.trim().is_empty() {
            return Err(PlanValidationError::new("Resource group name cannot be empty or whitespace-only"));
        }

        let mut declares = BTreeMap::new();
        for declaration in self.declares {
            let id = declaration.logical_id.clone();
            if declares.insert(id.clone(), declaration).is_some() {
                return Err(invalid_group(
                    &self.name,
                    format!("Group '{}' declares resource '{id}' more than once", self.name),
                ));
            }
        }

        let mut outputs = BTreeMap::new();
        for output in self.outputs {
            let key = output.name.clone();
            if outputs.insert(key.clone(), output).is_some() {
                return Err(invalid_group(
                    &self.name,
                    format!("Group '{}' exports output '{key}' more than once", self.name),
                ));
            }
        }

        if let Some(own) = self.consumes.iter().find(|o| o.producer == self.name) {
            return Err(invalid_group(
                &self.name,
                format!("Group '{}' cannot consume its own output '{}'", self.name, own.name),
            ));
        }

        Ok(ResourceGroup {
            name: self.name,
            outputs,
            declares,
            consumes: self.consumes,
        })
    }
}

fn invalid_group(group: &str, message: String) -> PlanValidationError {
    PlanValidationError::new(message.clone())
        .with_groups(vec![group.to_string()])
        .with_error_info(ErrorInfo::new("GRAPH-006-INVALID_GROUP", message))
}
