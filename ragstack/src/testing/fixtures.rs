//! Test fixtures.

use crate::context::DeploymentContext;

/// Account id used by fixtures.
pub const TEST_ACCOUNT_ID: &str = "123456789012";

/// Region used by fixtures.
pub const TEST_REGION: &str = "us-east-1";

/// Returns a valid `dev` context with one data source, `s3://rag-docs/manuals`.
#[must_use]
pub fn sample_context() -> DeploymentContext {
    DeploymentContext::new(TEST_ACCOUNT_ID, TEST_REGION).with_data_source_uri("s3://rag-docs/manuals")
}

/// Returns a config file with `dev` (default) and `prod` environments.
#[must_use]
pub fn sample_config_json() -> String {
    serde_json::json!({
        "defaultEnvironment": "dev",
        "environments": {
            "dev": {
                "accountId": TEST_ACCOUNT_ID,
                "region": TEST_REGION,
                "dataSourceUris": ["s3://rag-docs/manuals"],
            },
            "prod": {
                "accountId": TEST_ACCOUNT_ID,
                "region": "eu-west-1",
                "collectionName": "prod-vectors",
                "embeddingModelId": "cohere.embed-multilingual-v3",
                "dataSourceUris": ["s3://rag-docs-prod/manuals", "s3://rag-docs-prod/faq"],
                "knowledgeBase": { "chunkingStrategy": "NONE", "standbyReplicas": true },
            },
        },
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFile;

    #[test]
    fn test_sample_context_is_valid() {
        assert!(sample_context().validate().is_ok());
    }

    #[test]
    fn test_sample_config_environments_are_valid() {
        let file = ConfigFile::from_json_str(&sample_config_json()).unwrap();
        for name in file.environment_names() {
            assert!(file.select(Some(&name)).unwrap().validate().is_ok(), "{name} should be valid");
        }
    }
}
