//! Knowledge base bound to the vector collection, plus its data sources.

use super::vector_store::{METADATA_FIELD, TEXT_FIELD, VECTOR_FIELD};
use super::{outputs, Provisioner, KNOWLEDGE_BASE_GROUP, ROLE_GROUP, VECTOR_STORE_GROUP};
use crate::context::{ChunkingStrategy, DeploymentContext, GroupInputs, KnowledgeBaseSettings, S3Location};
use crate::core::{OutputKind, ResourceDeclaration, ResourceGroup, ResourceKind};
use crate::errors::RagstackError;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Declares the knowledge base and one S3 data source per distinct bucket.
///
/// Requires `role-arn` from the role group and `collection-arn`,
/// `collection-endpoint` and `index-name` from the vector store group.
#[derive(Debug, Clone, Copy, Default)]
pub struct KnowledgeBaseProvisioner;

impl KnowledgeBaseProvisioner {
    /// Creates a new knowledge base provisioner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn chunking_configuration(settings: &KnowledgeBaseSettings) -> Value {
    match settings.chunking_strategy {
        ChunkingStrategy::FixedSize => json!({
            "chunkingStrategy": settings.chunking_strategy,
            "fixedSizeChunkingConfiguration": {
                "maxTokens": settings.max_tokens,
                "overlapPercentage": settings.overlap_percentage,
            },
        }),
        ChunkingStrategy::None | ChunkingStrategy::Default => json!({
            "chunkingStrategy": settings.chunking_strategy,
        }),
    }
}

impl Provisioner for KnowledgeBaseProvisioner {
    fn group_name(&self) -> &str {
        KNOWLEDGE_BASE_GROUP
    }

    fn declare(&self, context: &DeploymentContext, inputs: &GroupInputs) -> Result<ResourceGroup, RagstackError> {
        let role_arn = inputs.require(ROLE_GROUP, outputs::ROLE_ARN)?;
        let collection_endpoint = inputs.require(VECTOR_STORE_GROUP, outputs::COLLECTION_ENDPOINT)?;
        let collection_arn = inputs.require(VECTOR_STORE_GROUP, outputs::COLLECTION_ARN)?;
        let index_name = inputs.require(VECTOR_STORE_GROUP, outputs::INDEX_NAME)?;

        let kb_name = &context.knowledge_base_name;
        let knowledge_base = ResourceDeclaration::new("KnowledgeBase", ResourceKind::KnowledgeBase)
            .with_properties(json!({
                "name": kb_name,
                "roleArn": role_arn.as_property(),
                "knowledgeBaseConfiguration": {
                    "type": "VECTOR",
                    "vectorKnowledgeBaseConfiguration": {
                        "embeddingModelArn": context.embedding_model_arn(),
                    },
                },
                "storageConfiguration": {
                    "type": "OPENSEARCH_SERVERLESS",
                    "opensearchServerlessConfiguration": {
                        "collectionArn": collection_arn.as_property(),
                        "collectionEndpoint": collection_endpoint.as_property(),
                        "vectorIndexName": index_name.as_property(),
                        "fieldMapping": {
                            "vectorField": VECTOR_FIELD,
                            "textField": TEXT_FIELD,
                            "metadataField": METADATA_FIELD,
                        },
                    },
                },
            }));

        let mut prefixes = inclusion_prefixes(context.data_sources()?);

        let chunking = chunking_configuration(&context.knowledge_base);
        let mut builder = ResourceGroup::builder(KNOWLEDGE_BASE_GROUP).declare(knowledge_base);
        for bucket in context.data_source_buckets()? {
            let inclusion = prefixes.remove(&bucket).unwrap_or_default();
            let source = ResourceDeclaration::new(format!("DataSource-{bucket}"), ResourceKind::DataSource)
                .with_properties(json!({
                    "name": format!("{kb_name}-{bucket}"),
                    "knowledgeBase": "KnowledgeBase",
                    "dataSourceConfiguration": {
                        "type": "S3",
                        "s3Configuration": {
                            "bucketArn": format!("arn:aws:s3:::{bucket}"),
                            "inclusionPrefixes": inclusion,
                        },
                    },
                    "vectorIngestionConfiguration": {
                        "chunkingConfiguration": chunking.clone(),
                    },
                }));
            builder = builder.declare(source);
        }

        let group = builder
            .consume(role_arn)
            .consume(collection_arn)
            .consume(collection_endpoint)
            .consume(index_name)
            .export_deferred(outputs::KNOWLEDGE_BASE_ID, OutputKind::Identifier)
            .export_deferred(outputs::KNOWLEDGE_BASE_ARN, OutputKind::Arn)
            .export_deferred(outputs::DATA_SOURCE_IDS, OutputKind::Identifier)
            .build()?;
        Ok(group)
    }
}

/// Groups key prefixes by bucket, in first-seen order without repeats.
///
/// A location without a prefix covers the whole bucket, so that bucket gets
/// no inclusion prefixes at all.
fn inclusion_prefixes(locations: Vec<S3Location>) -> BTreeMap<String, Vec<String>> {
    let mut prefixes: BTreeMap<String, Option<Vec<String>>> = BTreeMap::new();
    for location in locations {
        let entry = prefixes.entry(location.bucket).or_insert_with(|| Some(Vec::new()));
        match location.prefix {
            None => *entry = None,
            Some(prefix) => {
                let prefix = format!("{prefix}/");
                if let Some(list) = entry {
                    if !list.contains(&prefix) {
                        list.push(prefix);
                    }
                }
            }
        }
    }

    prefixes
        .into_iter()
        .map(|(bucket, list)| (bucket, list.unwrap_or_default()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provisioners::{RoleProvisioner, VectorStoreProvisioner};
    use crate::testing::fixtures::sample_context;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    fn upstream(context: &DeploymentContext) -> Vec<ResourceGroup> {
        let role = RoleProvisioner::new()
            .declare(context, &GroupInputs::default())
            .unwrap();
        let store_inputs = GroupInputs::strict([&role], BTreeSet::from([ROLE_GROUP.to_string()]), VECTOR_STORE_GROUP);
        let store = VectorStoreProvisioner::new().declare(context, &store_inputs).unwrap();
        vec![role, store]
    }

    fn declare(context: &DeploymentContext) -> ResourceGroup {
        let groups = upstream(context);
        let deps = BTreeSet::from([ROLE_GROUP.to_string(), VECTOR_STORE_GROUP.to_string()]);
        let inputs = GroupInputs::strict(&groups, deps, KNOWLEDGE_BASE_GROUP);
        KnowledgeBaseProvisioner::new().declare(context, &inputs).unwrap()
    }

    #[test]
    fn test_knowledge_base_storage_configuration() {
        let group = declare(&sample_context());
        let kb = group.declaration("KnowledgeBase").unwrap();
        let storage = &kb.property("storageConfiguration").unwrap()["opensearchServerlessConfiguration"];

        assert_eq!(storage["collectionArn"], json!({"ref": "OpenSearchServerlessInfraStack.collection-arn"}));
        assert_eq!(storage["vectorIndexName"], "rag-kb-index");
        assert_eq!(storage["fieldMapping"]["metadataField"], "text-metadata");
        assert_eq!(kb.property("roleArn").unwrap(), "arn:aws:iam::123456789012:role/rag-kb-dev-role");
    }

    #[test]
    fn test_one_data_source_per_bucket() {
        let context = sample_context()
            .with_data_source_uri("s3://rag-docs/faq/")
            .with_data_source_uri("s3://other-docs");
        let group = declare(&context);

        let sources: Vec<&str> = group
            .declarations_of(ResourceKind::DataSource)
            .map(|d| d.logical_id.as_str())
            .collect();
        assert_eq!(sources, vec!["DataSource-other-docs", "DataSource-rag-docs"]);

        let rag_docs = group.declaration("DataSource-rag-docs").unwrap();
        assert_eq!(
            rag_docs.property("dataSourceConfiguration").unwrap()["s3Configuration"]["inclusionPrefixes"],
            json!(["manuals/", "faq/"])
        );
    }

    #[test]
    fn test_whole_bucket_uri_clears_inclusion_prefixes() {
        let context = DeploymentContext::new("123456789012", "us-east-1")
            .with_data_source_uri("s3://rag-docs")
            .with_data_source_uri("s3://rag-docs/faq");
        let group = declare(&context);

        let rag_docs = group.declaration("DataSource-rag-docs").unwrap();
        assert_eq!(
            rag_docs.property("dataSourceConfiguration").unwrap()["s3Configuration"]["inclusionPrefixes"],
            json!([])
        );
    }

    #[test]
    fn test_repeated_prefix_listed_once() {
        let context = sample_context()
            .with_data_source_uri("s3://rag-docs/manuals/")
            .with_data_source_uri("s3://rag-docs/faq");
        let group = declare(&context);

        let rag_docs = group.declaration("DataSource-rag-docs").unwrap();
        assert_eq!(
            rag_docs.property("dataSourceConfiguration").unwrap()["s3Configuration"]["inclusionPrefixes"],
            json!(["manuals/", "faq/"])
        );
    }

    #[test]
    fn test_chunking_strategy() {
        let group = declare(&sample_context());
        let source = group.declaration("DataSource-rag-docs").unwrap();
        let chunking = &source.property("vectorIngestionConfiguration").unwrap()["chunkingConfiguration"];
        assert_eq!(chunking["chunkingStrategy"], "FIXED_SIZE");
        assert_eq!(chunking["fixedSizeChunkingConfiguration"]["maxTokens"], 512);

        let settings = KnowledgeBaseSettings {
            chunking_strategy: ChunkingStrategy::None,
            ..KnowledgeBaseSettings::default()
        };
        assert_eq!(chunking_configuration(&settings), json!({"chunkingStrategy": "NONE"}));
    }

    #[test]
    fn test_consumes_and_outputs() {
        let group = declare(&sample_context());
        let consumed: Vec<String> = group.consumes().iter().map(|o| o.qualified_name()).collect();

        assert_eq!(
            consumed,
            vec![
                "KbRoleStack.role-arn",
                "OpenSearchServerlessInfraStack.collection-arn",
                "OpenSearchServerlessInfraStack.collection-endpoint",
                "OpenSearchServerlessInfraStack.index-name",
            ]
        );
        assert!(group.output(outputs::KNOWLEDGE_BASE_ID).is_some());
        assert!(group.output(outputs::KNOWLEDGE_BASE_ARN).is_some());
        assert!(group.output(outputs::DATA_SOURCE_IDS).is_some());
    }

    #[test]
    fn test_vector_store_must_be_a_declared_dependency() {
        let context = sample_context();
        let groups = upstream(&context);
        let inputs = GroupInputs::strict(&groups, BTreeSet::from([ROLE_GROUP.to_string()]), KNOWLEDGE_BASE_GROUP);

        let err = KnowledgeBaseProvisioner::new().declare(&context, &inputs).unwrap_err();
        match err {
            RagstackError::MissingDependencyOutput(e) => {
                assert_eq!(e.group, KNOWLEDGE_BASE_GROUP);
                assert_eq!(e.producer, VECTOR_STORE_GROUP);
                assert_eq!(e.output, outputs::COLLECTION_ENDPOINT);
            }
            other => panic!("expected missing dependency output, got {other:?}"),
        }
    }
}
