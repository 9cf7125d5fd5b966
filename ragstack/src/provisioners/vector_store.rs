//! Serverless vector-search collection and its index.

use super::{outputs, Provisioner, ROLE_GROUP, VECTOR_STORE_GROUP};
use crate::context::{DeploymentContext, GroupInputs};
use crate::core::{OutputKind, ResourceDeclaration, ResourceGroup, ResourceKind};
use crate::errors::RagstackError;
use serde_json::{json, Value};

/// Field holding the embedding vector.
pub const VECTOR_FIELD: &str = "vector";
/// Field holding the chunk text.
pub const TEXT_FIELD: &str = "text";
/// Field holding chunk metadata.
pub const METADATA_FIELD: &str = "text-metadata";

/// Declares the collection, its security policies and the vector index.
///
/// Requires `role-arn` from the role group for the data access policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct VectorStoreProvisioner;

impl VectorStoreProvisioner {
    /// Creates a new vector store provisioner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn collection_rule(collection: &str, resource_type: &str) -> Value {
    json!({
        "resourceType": resource_type,
        "resource": [format!("{resource_type}/{collection}")],
    })
}

impl Provisioner for VectorStoreProvisioner {
    fn group_name(&self) -> &str {
        VECTOR_STORE_GROUP
    }

    fn declare(&self, context: &DeploymentContext, inputs: &GroupInputs) -> Result<ResourceGroup, RagstackError> {
        let role_arn = inputs.require(ROLE_GROUP, outputs::ROLE_ARN)?;
        let collection = &context.collection_name;
        let index_name = &context.knowledge_base.vector_index_name;
        let dimensions = context.embedding_model()?.dimensions();

        let encryption = ResourceDeclaration::new("EncryptionPolicy", ResourceKind::EncryptionPolicy)
            .with_properties(json!({
                "name": format!("{collection}-enc"),
                "type": "encryption",
                "policy": {
                    "rules": [collection_rule(collection, "collection")],
                    "awsOwnedKey": true,
                },
            }));

        let network = ResourceDeclaration::new("NetworkPolicy", ResourceKind::NetworkPolicy).with_properties(json!({
            "name": format!("{collection}-net"),
            "type": "network",
            "policy": [{
                "rules": [
                    collection_rule(collection, "collection"),
                    collection_rule(collection, "dashboard"),
                ],
                "allowFromPublic": true,
            }],
        }));

        let replicas = if context.knowledge_base.standby_replicas {
            "ENABLED"
        } else {
            "DISABLED"
        };
        let vector_collection = ResourceDeclaration::new("Collection", ResourceKind::Collection)
            .with_properties(json!({
                "name": collection,
                "type": "VECTORSEARCH",
                "standbyReplicas": replicas,
                "dependsOn": ["EncryptionPolicy", "NetworkPolicy"],
            }));

        let access = ResourceDeclaration::new("DataAccessPolicy", ResourceKind::AccessPolicy).with_properties(json!({
            "name": format!("{collection}-access"),
            "type": "data",
            "policy": [{
                "rules": [
                    {
                        "resourceType": "collection",
                        "resource": [format!("collection/{collection}")],
                        "permission": ["aoss:DescribeCollectionItems", "aoss:CreateCollectionItems", "aoss:UpdateCollectionItems"],
                    },
                    {
                        "resourceType": "index",
                        "resource": [format!("index/{collection}/*")],
                        "permission": ["aoss:UpdateIndex", "aoss:DescribeIndex", "aoss:ReadDocument", "aoss:WriteDocument", "aoss:CreateIndex"],
                    },
                ],
                "principal": [role_arn.as_property()],
            }],
        }));

        let index = ResourceDeclaration::new("VectorIndex", ResourceKind::VectorIndex).with_properties(json!({
            "name": index_name,
            "collection": "Collection",
            "settings": { "index": { "knn": true, "knn.algo_param.ef_search": 512 } },
            "mappings": {
                VECTOR_FIELD: {
                    "type": "knn_vector",
                    "dimension": dimensions,
                    "method": { "name": "hnsw", "engine": "faiss", "spaceType": "l2" },
                },
                TEXT_FIELD: { "type": "text" },
                METADATA_FIELD: { "type": "text", "index": false },
            },
            "dependsOn": ["Collection", "DataAccessPolicy"],
        }));

        let group = ResourceGroup::builder(VECTOR_STORE_GROUP)
            .declare(encryption)
            .declare(network)
            .declare(vector_collection)
            .declare(access)
            .declare(index)
            .consume(role_arn)
            .export_deferred(outputs::COLLECTION_ARN, OutputKind::Arn)
            .export_deferred(outputs::COLLECTION_ENDPOINT, OutputKind::Endpoint)
            .export_known(outputs::COLLECTION_NAME, OutputKind::Name, collection)
            .export_known(outputs::INDEX_NAME, OutputKind::Name, index_name)
            .build()?;
        Ok(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EmbeddingModel;
    use crate::core::OutputValue;
    use crate::provisioners::RoleProvisioner;
    use crate::testing::fixtures::sample_context;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    fn inputs_with_role(context: &DeploymentContext) -> GroupInputs {
        let role = RoleProvisioner::new()
            .declare(context, &GroupInputs::default())
            .unwrap();
        GroupInputs::strict([&role], BTreeSet::from([ROLE_GROUP.to_string()]), VECTOR_STORE_GROUP)
    }

    #[test]
    fn test_vector_store_consumes_role_arn() {
        let context = sample_context();
        let group = VectorStoreProvisioner::new()
            .declare(&context, &inputs_with_role(&context))
            .unwrap();

        assert_eq!(group.consumes().len(), 1);
        assert_eq!(group.consumes()[0].qualified_name(), "KbRoleStack.role-arn");

        let access = group.declaration("DataAccessPolicy").unwrap();
        assert_eq!(
            access.property("policy").unwrap()[0]["principal"][0],
            "arn:aws:iam::123456789012:role/rag-kb-dev-role"
        );
    }

    #[test]
    fn test_vector_store_outputs() {
        let context = sample_context();
        let group = VectorStoreProvisioner::new()
            .declare(&context, &inputs_with_role(&context))
            .unwrap();

        assert_eq!(group.output(outputs::COLLECTION_ENDPOINT).unwrap().value, OutputValue::Deferred);
        assert_eq!(group.output(outputs::COLLECTION_ARN).unwrap().value, OutputValue::Deferred);
        assert_eq!(
            group.output(outputs::COLLECTION_NAME).and_then(|o| o.known_value()),
            Some("rag-kb-collection")
        );
        assert_eq!(
            group.output(outputs::INDEX_NAME).and_then(|o| o.known_value()),
            Some("rag-kb-index")
        );
    }

    #[test]
    fn test_index_dimension_follows_embedding_model() {
        let context = sample_context().with_embedding_model_id(EmbeddingModel::TitanTextV1.id());
        let group = VectorStoreProvisioner::new()
            .declare(&context, &inputs_with_role(&context))
            .unwrap();

        let index = group.declaration("VectorIndex").unwrap();
        assert_eq!(index.property("mappings").unwrap()[VECTOR_FIELD]["dimension"], 1536);
    }

    #[test]
    fn test_missing_role_fails_fast() {
        let context = sample_context();
        let inputs = GroupInputs::strict(Vec::<&ResourceGroup>::new(), BTreeSet::new(), VECTOR_STORE_GROUP);

        let err = VectorStoreProvisioner::new().declare(&context, &inputs).unwrap_err();
        match err {
            RagstackError::MissingDependencyOutput(e) => {
                assert_eq!(e.group, VECTOR_STORE_GROUP);
                assert_eq!(e.output, outputs::ROLE_ARN);
            }
            other => panic!("expected missing dependency output, got {other:?}"),
        }
    }
}
