//! Resource and output kind enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of cloud resource a declaration describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// An access-control identity (e.g., an IAM role).
    Role,
    /// A permission policy attached to a role.
    RolePolicy,
    /// A vector collection encryption policy.
    EncryptionPolicy,
    /// A vector collection network policy.
    NetworkPolicy,
    /// A data access policy granting principals access to a collection.
    AccessPolicy,
    /// A managed vector-search collection.
    Collection,
    /// A vector index inside a collection.
    VectorIndex,
    /// A knowledge-base index.
    KnowledgeBase,
    /// A data source bound to a knowledge base.
    DataSource,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Role => write!(f, "role"),
            Self::RolePolicy => write!(f, "role_policy"),
            Self::EncryptionPolicy => write!(f, "encryption_policy"),
            Self::NetworkPolicy => write!(f, "network_policy"),
            Self::AccessPolicy => write!(f, "access_policy"),
            Self::Collection => write!(f, "collection"),
            Self::VectorIndex => write!(f, "vector_index"),
            Self::KnowledgeBase => write!(f, "knowledge_base"),
            Self::DataSource => write!(f, "data_source"),
        }
    }
}

/// The type of value an output carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// A fully qualified resource name (ARN-equivalent).
    Arn,
    /// A service-assigned identifier.
    Identifier,
    /// A network endpoint.
    Endpoint,
    /// A plain resource name.
    Name,
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arn => write!(f, "arn"),
            Self::Identifier => write!(f, "identifier"),
            Self::Endpoint => write!(f, "endpoint"),
            Self::Name => write!(f, "name"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_kind_display() {
        assert_eq!(ResourceKind::Role.to_string(), "role");
        assert_eq!(ResourceKind::VectorIndex.to_string(), "vector_index");
        assert_eq!(ResourceKind::KnowledgeBase.to_string(), "knowledge_base");
    }

    #[test]
    fn test_resource_kind_serialize() {
        let json = serde_json::to_string(&ResourceKind::DataSource).unwrap();
        assert_eq!(json, r#""data_source""#);

        let kind: ResourceKind = serde_json::from_str(&json).unwrap();
        assert_eq!(kind, ResourceKind::DataSource);
    }

    #[test]
    fn test_output_kind_display() {
        assert_eq!(OutputKind::Endpoint.to_string(), "endpoint");
        assert_eq!(OutputKind::Arn.to_string(), "arn");
    }
}
