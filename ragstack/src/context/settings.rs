//! Deployment settings handed to every provisioner.

use crate::errors::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static ACCOUNT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{12}$").expect("valid account id pattern"));
#[allow(clippy::expect_used)]
static REGION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}(-gov)?-[a-z]+-\d$").expect("valid region pattern"));
#[allow(clippy::expect_used)]
static COLLECTION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9-]{2,31}$").expect("valid collection name pattern"));
#[allow(clippy::expect_used)]
static RESOURCE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]{0,99}$").expect("valid resource name pattern"));
#[allow(clippy::expect_used)]
static S3_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^s3://([a-z0-9][a-z0-9.-]{1,61}[a-z0-9])(?:/(.*))?$").expect("valid s3 uri pattern")
});

/// Embedding models the knowledge base can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmbeddingModel {
    /// `amazon.titan-embed-text-v1`
    TitanTextV1,
    /// `amazon.titan-embed-text-v2:0`
    TitanTextV2,
    /// `cohere.embed-english-v3`
    CohereEnglishV3,
    /// `cohere.embed-multilingual-v3`
    CohereMultilingualV3,
}

impl EmbeddingModel {
    /// Resolves a model identifier.
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "amazon.titan-embed-text-v1" => Some(Self::TitanTextV1),
            "amazon.titan-embed-text-v2:0" => Some(Self::TitanTextV2),
            "cohere.embed-english-v3" => Some(Self::CohereEnglishV3),
            "cohere.embed-multilingual-v3" => Some(Self::CohereMultilingualV3),
            _ => None,
        }
    }

    /// Returns the model identifier.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::TitanTextV1 => "amazon.titan-embed-text-v1",
            Self::TitanTextV2 => "amazon.titan-embed-text-v2:0",
            Self::CohereEnglishV3 => "cohere.embed-english-v3",
            Self::CohereMultilingualV3 => "cohere.embed-multilingual-v3",
        }
    }

    /// Returns the vector dimension the model produces.
    #[must_use]
    pub fn dimensions(self) -> u32 {
        match self {
            Self::TitanTextV1 => 1536,
            Self::TitanTextV2 | Self::CohereEnglishV3 | Self::CohereMultilingualV3 => 1024,
        }
    }
}

impl fmt::Display for EmbeddingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// How documents are split before embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChunkingStrategy {
    /// Fixed-size chunks with overlap.
    #[default]
    FixedSize,
    /// Each document is one chunk.
    None,
    /// Let the service choose.
    Default,
}

impl fmt::Display for ChunkingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FixedSize => write!(f, "FIXED_SIZE"),
            Self::None => write!(f, "NONE"),
            Self::Default => write!(f, "DEFAULT"),
        }
    }
}

/// Knowledge-base tuning beyond the recognized top-level keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBaseSettings {
    /// Name of the vector index inside the collection.
    #[serde(default = "default_index_name")]
    pub vector_index_name: String,
    /// Chunking strategy for data sources.
    #[serde(default)]
    pub chunking_strategy: ChunkingStrategy,
    /// Maximum tokens per chunk (fixed-size chunking).
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Overlap between chunks, in percent (fixed-size chunking).
    #[serde(default = "default_overlap_percentage")]
    pub overlap_percentage: u32,
    /// Whether the collection runs standby replicas.
    #[serde(default)]
    pub standby_replicas: bool,
}

fn default_index_name() -> String {
    "rag-kb-index".to_string()
}

fn default_max_tokens() -> u32 {
    512
}

fn default_overlap_percentage() -> u32 {
    20
}

impl Default for KnowledgeBaseSettings {
    fn default() -> Self {
        Self {
            vector_index_name: default_index_name(),
            chunking_strategy: ChunkingStrategy::default(),
            max_tokens: default_max_tokens(),
            overlap_percentage: default_overlap_percentage(),
            standby_replicas: false,
        }
    }
}

/// A parsed `s3://bucket/prefix` location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct S3Location {
    /// Bucket name.
    pub bucket: String,
    /// Key prefix, if any.
    pub prefix: Option<String>,
}

impl S3Location {
    /// Parses an S3 URI.
    ///
    /// # Errors
    ///
    /// Returns an error if the URI is not of the form `s3://bucket[/prefix]`.
    pub fn parse(uri: &str) -> Result<Self, ConfigError> {
        let caps = S3_URI
            .captures(uri)
            .ok_or_else(|| ConfigError::invalid("dataSourceUris", format!("'{uri}' is not an s3:// URI")))?;
        let bucket = caps[1].to_string();
        let prefix = caps
            .get(2)
            .map(|m| m.as_str().trim_end_matches('/').to_string())
            .filter(|p| !p.is_empty());
        Ok(Self { bucket, prefix })
    }

    /// Returns the bucket ARN.
    #[must_use]
    pub fn bucket_arn(&self) -> String {
        format!("arn:aws:s3:::{}", self.bucket)
    }
}

/// Configuration context for one deployment.
///
/// Each recognized key only affects the names and properties of its own
/// provisioner; none of them change the graph topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentContext {
    /// Cloud account identifier.
    #[serde(default)]
    pub account_id: String,
    /// Cloud region.
    #[serde(default)]
    pub region: String,
    /// Target environment name.
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Prefix for the execution role name.
    #[serde(default = "default_role_name_prefix")]
    pub role_name_prefix: String,
    /// Vector collection name.
    #[serde(default = "default_collection_name")]
    pub collection_name: String,
    /// Knowledge base name.
    #[serde(default = "default_knowledge_base_name")]
    pub knowledge_base_name: String,
    /// Embedding model identifier.
    #[serde(default = "default_embedding_model_id")]
    pub embedding_model_id: String,
    /// Data source locations (`s3://bucket/prefix`).
    #[serde(default)]
    pub data_source_uris: Vec<String>,
    /// Further knowledge-base settings.
    #[serde(default)]
    pub knowledge_base: KnowledgeBaseSettings,
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_role_name_prefix() -> String {
    "rag-kb".to_string()
}

fn default_collection_name() -> String {
    "rag-kb-collection".to_string()
}

fn default_knowledge_base_name() -> String {
    "rag-knowledge-base".to_string()
}

fn default_embedding_model_id() -> String {
    EmbeddingModel::TitanTextV2.id().to_string()
}

impl DeploymentContext {
    /// Creates a context with default settings.
    #[must_use]
    pub fn new(account_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            region: region.into(),
            environment: default_environment(),
            role_name_prefix: default_role_name_prefix(),
            collection_name: default_collection_name(),
            knowledge_base_name: default_knowledge_base_name(),
            embedding_model_id: default_embedding_model_id(),
            data_source_uris: Vec::new(),
            knowledge_base: KnowledgeBaseSettings::default(),
        }
    }

    /// Sets the environment.
    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Sets the role name prefix.
    #[must_use]
    pub fn with_role_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.role_name_prefix = prefix.into();
        self
    }

    /// Sets the collection name.
    #[must_use]
    pub fn with_collection_name(mut self, name: impl Into<String>) -> Self {
        self.collection_name = name.into();
        self
    }

    /// Sets the knowledge base name.
    #[must_use]
    pub fn with_knowledge_base_name(mut self, name: impl Into<String>) -> Self {
        self.knowledge_base_name = name.into();
        self
    }

    /// Sets the embedding model.
    #[must_use]
    pub fn with_embedding_model_id(mut self, id: impl Into<String>) -> Self {
        self.embedding_model_id = id.into();
        self
    }

    /// Adds a data source URI.
    #[must_use]
    pub fn with_data_source_uri(mut self, uri: impl Into<String>) -> Self {
        self.data_source_uris.push(uri.into());
        self
    }

    /// Replaces the knowledge-base settings.
    #[must_use]
    pub fn with_knowledge_base_settings(mut self, settings: KnowledgeBaseSettings) -> Self {
        self.knowledge_base = settings;
        self
    }

    /// Returns the execution role name.
    #[must_use]
    pub fn role_name(&self) -> String {
        format!("{}-{}-role", self.role_name_prefix, self.environment)
    }

    /// Returns the configured embedding model.
    ///
    /// # Errors
    ///
    /// Returns an error if the model identifier is not recognized.
    pub fn embedding_model(&self) -> Result<EmbeddingModel, ConfigError> {
        EmbeddingModel::from_id(&self.embedding_model_id).ok_or_else(|| {
            ConfigError::invalid(
                "embeddingModelId",
                format!("unsupported embedding model '{}'", self.embedding_model_id),
            )
        })
    }

    /// Returns the embedding model ARN for this region.
    #[must_use]
    pub fn embedding_model_arn(&self) -> String {
        format!(
            "arn:aws:bedrock:{}::foundation-model/{}",
            self.region, self.embedding_model_id
        )
    }

    /// Parses all data source URIs, keeping their declared order.
    ///
    /// # Errors
    ///
    /// Returns an error if any URI is malformed.
    pub fn data_sources(&self) -> Result<Vec<S3Location>, ConfigError> {
        self.data_source_uris.iter().map(|u| S3Location::parse(u)).collect()
    }

    /// Returns the distinct buckets referenced by data sources, first-seen order.
    ///
    /// # Errors
    ///
    /// Returns an error if any URI is malformed.
    pub fn data_source_buckets(&self) -> Result<Vec<String>, ConfigError> {
        let mut buckets: Vec<String> = Vec::new();
        for location in self.data_sources()? {
            if !buckets.contains(&location.bucket) {
                buckets.push(location.bucket);
            }
        }
        Ok(buckets)
    }

    /// Validates every setting.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !ACCOUNT_ID.is_match(&self.account_id) {
            return Err(ConfigError::invalid("accountId", "must be a 12-digit account id"));
        }
        if !REGION.is_match(&self.region) {
            return Err(ConfigError::invalid("region", format!("'{}' is not a region name", self.region)));
        }
        if !RESOURCE_NAME.is_match(&self.environment) {
            return Err(ConfigError::invalid("environment", "must be alphanumeric with '-' or '_'"));
        }
        if !RESOURCE_NAME.is_match(&self.role_name_prefix) || self.role_name().len() > 64 {
            return Err(ConfigError::invalid(
                "roleNamePrefix",
                "must be alphanumeric with '-' or '_' and yield a role name of at most 64 characters",
            ));
        }
        if !COLLECTION_NAME.is_match(&self.collection_name) {
            return Err(ConfigError::invalid(
                "collectionName",
                "must be 3-32 characters of lowercase letters, digits or '-', starting with a letter",
            ));
        }
        if !RESOURCE_NAME.is_match(&self.knowledge_base_name) {
            return Err(ConfigError::invalid(
                "knowledgeBaseName",
                "must be 1-100 characters of letters, digits, '-' or '_'",
            ));
        }
        self.embedding_model()?;
        if self.data_source_uris.is_empty() {
            return Err(ConfigError::invalid("dataSourceUris", "at least one data source is required"));
        }
        self.data_sources()?;

        let kb = &self.knowledge_base;
        if !COLLECTION_NAME.is_match(&kb.vector_index_name) {
            return Err(ConfigError::invalid(
                "knowledgeBase.vectorIndexName",
                "must be lowercase letters, digits or '-', starting with a letter",
            ));
        }
        if kb.chunking_strategy == ChunkingStrategy::FixedSize {
            if !(20..=8192).contains(&kb.max_tokens) {
                return Err(ConfigError::invalid("knowledgeBase.maxTokens", "must be between 20 and 8192"));
            }
            if !(1..=99).contains(&kb.overlap_percentage) {
                return Err(ConfigError::invalid(
                    "knowledgeBase.overlapPercentage",
                    "must be between 1 and 99",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn valid() -> DeploymentContext {
        DeploymentContext::new("123456789012", "us-east-1").with_data_source_uri("s3://rag-docs/manuals/")
    }

    #[test]
    fn test_validation_patterns_compile() {
        for pattern in [&ACCOUNT_ID, &REGION, &COLLECTION_NAME, &RESOURCE_NAME, &S3_URI] {
            assert!(!LazyLock::force(pattern).as_str().is_empty());
        }
    }

    #[test]
    fn test_defaults_validate() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_role_name_is_deterministic() {
        assert_eq!(valid().role_name(), "rag-kb-dev-role");
        assert_eq!(valid().role_name(), valid().role_name());
    }

    #[test]
    fn test_invalid_account_id() {
        let ctx = DeploymentContext { account_id: "12345".to_string(), ..valid() };
        let err = ctx.validate().unwrap_err();
        assert!(err.to_string().contains("accountId"));
    }

    #[test]
    fn test_invalid_region() {
        let ctx = DeploymentContext { region: "mars".to_string(), ..valid() };
        assert!(ctx.validate().is_err());
    }

    #[test]
    fn test_collection_name_rules() {
        assert!(valid().with_collection_name("ab").validate().is_err());
        assert!(valid().with_collection_name("Upper-case").validate().is_err());
        assert!(valid().with_collection_name("1starts-with-digit").validate().is_err());
        assert!(valid().with_collection_name("kb-vectors-01").validate().is_ok());
    }

    #[test]
    fn test_unknown_embedding_model() {
        let err = valid().with_embedding_model_id("made-up-model").validate().unwrap_err();
        assert!(err.to_string().contains("embeddingModelId"));
    }

    #[test]
    fn test_requires_data_source() {
        let ctx = DeploymentContext::new("123456789012", "us-east-1");
        assert!(ctx.validate().is_err());
    }

    #[test]
    fn test_chunking_bounds() {
        let settings = KnowledgeBaseSettings { max_tokens: 5, ..KnowledgeBaseSettings::default() };
        assert!(valid().with_knowledge_base_settings(settings).validate().is_err());

        let settings = KnowledgeBaseSettings {
            chunking_strategy: ChunkingStrategy::None,
            max_tokens: 5,
            ..KnowledgeBaseSettings::default()
        };
        assert!(valid().with_knowledge_base_settings(settings).validate().is_ok());
    }

    #[test]
    fn test_s3_location_parse() {
        let loc = S3Location::parse("s3://rag-docs/manuals/").unwrap();
        assert_eq!(loc.bucket, "rag-docs");
        assert_eq!(loc.prefix.as_deref(), Some("manuals"));
        assert_eq!(loc.bucket_arn(), "arn:aws:s3:::rag-docs");

        let bare = S3Location::parse("s3://rag-docs").unwrap();
        assert_eq!(bare.prefix, None);

        assert!(S3Location::parse("https://example.com/x").is_err());
    }

    #[test]
    fn test_data_source_buckets_are_distinct_in_order() {
        let ctx = valid()
            .with_data_source_uri("s3://other-bucket/a")
            .with_data_source_uri("s3://rag-docs/faq");

        assert_eq!(ctx.data_source_buckets().unwrap(), vec!["rag-docs", "other-bucket"]);
    }

    #[test]
    fn test_embedding_catalogue() {
        assert_eq!(EmbeddingModel::TitanTextV1.dimensions(), 1536);
        assert_eq!(valid().embedding_model().unwrap().dimensions(), 1024);
        assert_eq!(
            valid().embedding_model_arn(),
            "arn:aws:bedrock:us-east-1::foundation-model/amazon.titan-embed-text-v2:0"
        );
    }

    #[test]
    fn test_deserialize_camel_case_with_defaults() {
        let json = serde_json::json!({
            "accountId": "123456789012",
            "region": "eu-west-1",
            "collectionName": "docs-vectors",
            "dataSourceUris": ["s3://docs-bucket"],
            "knowledgeBase": { "chunkingStrategy": "NONE" }
        });
        let ctx: DeploymentContext = serde_json::from_value(json).unwrap();

        assert_eq!(ctx.collection_name, "docs-vectors");
        assert_eq!(ctx.environment, "dev");
        assert_eq!(ctx.knowledge_base.chunking_strategy, ChunkingStrategy::None);
        assert_eq!(ctx.knowledge_base.max_tokens, 512);
        assert!(ctx.validate().is_ok());
    }
}
