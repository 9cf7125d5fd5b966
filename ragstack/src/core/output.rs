//! Named outputs exchanged between resource groups.

use super::OutputKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The value behind an output.
///
/// Some values (a role ARN built from the account and role name) are known
/// while declaring. Others (a collection endpoint) only exist once the
/// backend has applied the producing group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum OutputValue {
    /// Value known at declaration time.
    Known(String),
    /// Value resolved by the backend when the producer is applied.
    Deferred,
}

/// A typed handle to a value exported by one resource group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputRef {
    /// The group that owns the output.
    pub producer: String,
    /// The output name, unique within the producer.
    pub name: String,
    /// The kind of value.
    pub kind: OutputKind,
    /// The value or a deferral marker.
    pub value: OutputValue,
}

impl OutputRef {
    /// Creates an output whose value is known now.
    #[must_use]
    pub fn known(
        producer: impl Into<String>,
        name: impl Into<String>,
        kind: OutputKind,
        value: impl Into<String>,
    ) -> Self {
        Self {
            producer: producer.into(),
            name: name.into(),
            kind,
            value: OutputValue::Known(value.into()),
        }
    }

    /// Creates an output resolved at apply time.
    #[must_use]
    pub fn deferred(producer: impl Into<String>, name: impl Into<String>, kind: OutputKind) -> Self {
        Self {
            producer: producer.into(),
            name: name.into(),
            kind,
            value: OutputValue::Deferred,
        }
    }

    /// Returns `producer.name`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.producer, self.name)
    }

    /// Returns the known value, if any.
    #[must_use]
    pub fn known_value(&self) -> Option<&str> {
        match &self.value {
            OutputValue::Known(v) => Some(v),
            OutputValue::Deferred => None,
        }
    }

    /// Renders the output for use inside resource properties.
    ///
    /// Known values are inlined; deferred values become a reference object
    /// the backend substitutes during apply.
    #[must_use]
    pub fn as_property(&self) -> serde_json::Value {
        match &self.value {
            OutputValue::Known(v) => serde_json::Value::String(v.clone()),
            OutputValue::Deferred => serde_json::json!({ "ref": self.qualified_name() }),
        }
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.qualified_name(), self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_output_inlines_value() {
        let out = OutputRef::known("KbRoleStack", "role-arn", OutputKind::Arn, "arn:aws:iam::1:role/r");

        assert_eq!(out.known_value(), Some("arn:aws:iam::1:role/r"));
        assert_eq!(out.as_property(), serde_json::json!("arn:aws:iam::1:role/r"));
    }

    #[test]
    fn test_deferred_output_renders_reference() {
        let out = OutputRef::deferred("OpenSearchServerlessInfraStack", "collection-endpoint", OutputKind::Endpoint);

        assert_eq!(out.known_value(), None);
        assert_eq!(
            out.as_property(),
            serde_json::json!({ "ref": "OpenSearchServerlessInfraStack.collection-endpoint" })
        );
        assert_eq!(
            out.to_string(),
            "OpenSearchServerlessInfraStack.collection-endpoint (endpoint)"
        );
    }

    #[test]
    fn test_output_value_serialization() {
        let json = serde_json::to_value(OutputValue::Known("x".to_string())).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "known", "value": "x" }));

        let json = serde_json::to_value(OutputValue::Deferred).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "deferred" }));
    }
}
