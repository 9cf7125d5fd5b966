//! Error types for ragstack.
//!
//! Every graph-construction failure is detected before any resource is
//! applied. Backend failures are carried through unchanged.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// The main error type for ragstack operations.
#[derive(Debug, Error)]
pub enum RagstackError {
    /// A provisioner needed an upstream output that was not supplied.
    #[error(transparent)]
    MissingDependencyOutput(#[from] MissingDependencyOutput),

    /// An edge or output reference names a group outside the deployment.
    #[error(transparent)]
    DanglingReference(#[from] DanglingReferenceError),

    /// The declared edges contain a cycle.
    #[error(transparent)]
    CyclicDependency(#[from] CyclicDependencyError),

    /// Any other structural validation failure.
    #[error(transparent)]
    Validation(#[from] PlanValidationError),

    /// The provisioning backend rejected the plan.
    #[error(transparent)]
    Apply(#[from] ApplyError),

    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The orchestration state machine was driven out of order.
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition {
        /// The state the run was in.
        from: String,
        /// The state that was requested.
        to: String,
    },
}

impl RagstackError {
    /// Returns the diagnostic info for graph errors, if any.
    #[must_use]
    pub fn error_info(&self) -> Option<&ErrorInfo> {
        match self {
            Self::MissingDependencyOutput(e) => Some(&e.error_info),
            Self::DanglingReference(e) => Some(&e.error_info),
            Self::CyclicDependency(e) => Some(&e.error_info),
            Self::Validation(e) => e.error_info.as_ref(),
            _ => None,
        }
    }

    /// Returns true if the error was raised before anything was applied.
    #[must_use]
    pub fn is_planning_error(&self) -> bool {
        !matches!(self, Self::Apply(_))
    }
}

/// Diagnostic metadata attached to graph errors.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Error code (e.g., "GRAPH-001-CYCLE").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

impl ErrorInfo {
    /// Creates a new error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: BTreeMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Converts to a JSON object.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Error raised when a group needs an upstream output it cannot see.
#[derive(Debug, Clone, Error)]
#[error("Missing dependency output: group '{group}' requires '{output}' from '{producer}'")]
pub struct MissingDependencyOutput {
    /// The group that required the output.
    pub group: String,
    /// The group expected to produce it.
    pub producer: String,
    /// The output name.
    pub output: String,
    /// Diagnostic info.
    pub error_info: ErrorInfo,
}

impl MissingDependencyOutput {
    /// Creates a new missing dependency output error.
    #[must_use]
    pub fn new(
        group: impl Into<String>,
        producer: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        let group = group.into();
        let producer = producer.into();
        let output = output.into();
        let info = ErrorInfo::new(
            "GRAPH-003-MISSING_OUTPUT",
            format!("'{group}' consumes '{producer}.{output}' without a usable dependency"),
        )
        .with_fix_hint(format!(
            "Declare the edge '{producer}' -> '{group}' and make sure '{producer}' exports '{output}'."
        ))
        .with_context_entry("group", &group)
        .with_context_entry("producer", &producer)
        .with_context_entry("output", &output);

        Self {
            group,
            producer,
            output,
            error_info: info,
        }
    }
}

/// Error raised when a reference names a group outside the deployment.
#[derive(Debug, Clone, Error)]
#[error("Dangling reference: '{referrer}' references unknown group '{missing}'")]
pub struct DanglingReferenceError {
    /// The edge or group holding the reference.
    pub referrer: String,
    /// The group that does not exist.
    pub missing: String,
    /// Diagnostic info.
    pub error_info: ErrorInfo,
}

impl DanglingReferenceError {
    /// Creates a new dangling reference error.
    #[must_use]
    pub fn new(referrer: impl Into<String>, missing: impl Into<String>) -> Self {
        let referrer = referrer.into();
        let missing = missing.into();
        let info = ErrorInfo::new(
            "GRAPH-002-DANGLING",
            format!("Group '{missing}' is not part of this deployment"),
        )
        .with_fix_hint("Add the group to the deployment or remove the reference. Check for typos in group names.")
        .with_context_entry("referrer", &referrer)
        .with_context_entry("missing", &missing);

        Self {
            referrer,
            missing,
            error_info: info,
        }
    }
}

/// Error raised when a cycle is detected in the dependency graph.
#[derive(Debug, Clone, Error)]
#[error("Cyclic dependency: {}", cycle.join(" -> "))]
pub struct CyclicDependencyError {
    /// The groups forming the cycle; the first group is repeated at the end.
    pub cycle: Vec<String>,
    /// Diagnostic info.
    pub error_info: ErrorInfo,
}

impl CyclicDependencyError {
    /// Creates a new cyclic dependency error.
    #[must_use]
    pub fn new(cycle: Vec<String>) -> Self {
        let info = ErrorInfo::new(
            "GRAPH-001-CYCLE",
            format!("Deployment contains a dependency cycle: {}", cycle.join(" -> ")),
        )
        .with_fix_hint("Remove one of the edges in the cycle to break it.");

        Self {
            cycle,
            error_info: info,
        }
    }
}

/// Error raised for structural problems other than cycles and references.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PlanValidationError {
    /// The error message.
    pub message: String,
    /// The groups involved.
    pub groups: Vec<String>,
    /// Optional diagnostic info.
    pub error_info: Option<ErrorInfo>,
}

impl PlanValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            groups: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the groups involved.
    #[must_use]
    pub fn with_groups(mut self, groups: Vec<String>) -> Self {
        self.groups = groups;
        self
    }

    /// Sets the diagnostic info.
    #[must_use]
    pub fn with_error_info(mut self, info: ErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Duplicate group name in one deployment.
    #[must_use]
    pub fn duplicate_group(name: &str) -> Self {
        Self::new(format!("Group '{name}' is declared more than once"))
            .with_groups(vec![name.to_string()])
            .with_error_info(
                ErrorInfo::new("GRAPH-004-DUPLICATE", format!("Duplicate group '{name}'"))
                    .with_fix_hint("Group names must be unique within a deployment."),
            )
    }

    /// A consumed output whose kind differs from the one the producer exports.
    #[must_use]
    pub fn output_kind_mismatch(
        consumer: &str,
        producer: &str,
        output: &str,
        expected: impl fmt::Display,
        found: impl fmt::Display,
    ) -> Self {
        Self::new(format!(
            "Group '{consumer}' consumes '{output}' from '{producer}' as {found}, but it is exported as {expected}"
        ))
        .with_groups(vec![producer.to_string(), consumer.to_string()])
        .with_error_info(
            ErrorInfo::new("GRAPH-007-OUTPUT_KIND", format!("Output '{output}' has the wrong kind"))
                .with_context_entry("output", output)
                .with_context_entry("expected", expected.to_string())
                .with_context_entry("found", found.to_string()),
        )
    }

    /// Deployment without any groups.
    #[must_use]
    pub fn empty() -> Self {
        Self::new("Deployment has no resource groups").with_error_info(
            ErrorInfo::new("GRAPH-005-EMPTY", "Cannot plan an empty deployment")
                .with_fix_hint("Register at least one provisioner before planning."),
        )
    }
}

/// Error reported by a provisioning backend.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[error("Apply failed{}: {message}", group.as_ref().map(|g| format!(" for group '{g}'")).unwrap_or_default())]
pub struct ApplyError {
    /// The group being applied when the failure occurred, if known.
    pub group: Option<String>,
    /// The backend's message.
    pub message: String,
}

impl ApplyError {
    /// Creates an apply error not tied to a group.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            group: None,
            message: message.into(),
        }
    }

    /// Creates an apply error for a specific group.
    #[must_use]
    pub fn for_group(group: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            group: Some(group.into()),
            message: message.into(),
        }
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config '{path}'")]
    Read {
        /// The file path.
        path: String,
        /// The IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for the expected shape.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// The requested environment is not defined.
    #[error("Unknown environment '{name}' (available: {})", available.join(", "))]
    UnknownEnvironment {
        /// The requested name.
        name: String,
        /// The names that are defined.
        available: Vec<String>,
    },

    /// A setting has an invalid value.
    #[error("Invalid setting '{key}': {reason}")]
    Invalid {
        /// The configuration key.
        key: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an invalid-setting error.
    #[must_use]
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Provides default suggestions for graph error codes.
pub struct ErrorSuggestions;

impl ErrorSuggestions {
    /// Gets a suggestion for a given error code.
    #[must_use]
    pub fn get(code: &str) -> Option<&'static str> {
        match code {
            "GRAPH-001-CYCLE" => Some(
                "Check the declared edges for circular references. \
                 Dependencies must flow one way, e.g. role before collection before knowledge base.",
            ),
            "GRAPH-002-DANGLING" => Some(
                "Ensure every edge and output reference names a group that is part of the deployment.",
            ),
            "GRAPH-003-MISSING_OUTPUT" => Some(
                "Outputs are only visible across declared edges. \
                 Add the producer -> consumer edge instead of relying on the reference alone.",
            ),
            "GRAPH-004-DUPLICATE" => Some("Rename one of the groups so every name is unique."),
            "GRAPH-005-EMPTY" => Some("Add at least one resource group to the deployment."),
            "GRAPH-006-INVALID_GROUP" => Some(
                "Logical ids and output names must be unique within a group, and a group cannot consume its own outputs.",
            ),
            "GRAPH-007-OUTPUT_KIND" => Some(
                "Consume outputs through the producer's inputs so the reference keeps the exported kind.",
            ),
            _ => None,
        }
    }
}
