//! Execution role for the knowledge base.

use super::{outputs, Provisioner, ROLE_GROUP};
use crate::context::{DeploymentContext, GroupInputs};
use crate::core::{OutputKind, ResourceDeclaration, ResourceGroup, ResourceKind};
use crate::errors::RagstackError;
use serde_json::json;

const BEDROCK_PRINCIPAL: &str = "bedrock.amazonaws.com";

/// Declares the role the knowledge-base service assumes, with policies for
/// embedding-model invocation, collection access and data-source reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleProvisioner;

impl RoleProvisioner {
    /// Creates a new role provisioner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the ARN of the role declared for `context`.
    #[must_use]
    pub fn role_arn(context: &DeploymentContext) -> String {
        format!("arn:aws:iam::{}:role/{}", context.account_id, context.role_name())
    }
}

impl Provisioner for RoleProvisioner {
    fn group_name(&self) -> &str {
        ROLE_GROUP
    }

    fn declare(&self, context: &DeploymentContext, _inputs: &GroupInputs) -> Result<ResourceGroup, RagstackError> {
        let role_name = context.role_name();
        let account = &context.account_id;
        let region = &context.region;

        let role = ResourceDeclaration::new("ExecutionRole", ResourceKind::Role).with_properties(json!({
            "name": role_name,
            "assumeRolePolicy": {
                "principal": BEDROCK_PRINCIPAL,
                "conditions": {
                    "StringEquals": { "aws:SourceAccount": account },
                    "ArnLike": {
                        "aws:SourceArn": format!("arn:aws:bedrock:{region}:{account}:knowledge-base/*"),
                    },
                },
            },
        }));

        let invoke_model = ResourceDeclaration::new("FoundationModelPolicy", ResourceKind::RolePolicy)
            .with_properties(json!({
                "name": format!("{role_name}-fm"),
                "role": "ExecutionRole",
                "statements": [{
                    "effect": "Allow",
                    "actions": ["bedrock:InvokeModel"],
                    "resources": [context.embedding_model_arn()],
                }],
            }));

        let collection_access = ResourceDeclaration::new("CollectionAccessPolicy", ResourceKind::RolePolicy)
            .with_properties(json!({
                "name": format!("{role_name}-aoss"),
                "role": "ExecutionRole",
                "statements": [{
                    "effect": "Allow",
                    "actions": ["aoss:APIAccessAll"],
                    "resources": [format!("arn:aws:aoss:{region}:{account}:collection/*")],
                }],
            }));

        let buckets: Vec<String> = context
            .data_source_buckets()?
            .into_iter()
            .flat_map(|b| [format!("arn:aws:s3:::{b}"), format!("arn:aws:s3:::{b}/*")])
            .collect();
        let data_source_read = ResourceDeclaration::new("DataSourceReadPolicy", ResourceKind::RolePolicy)
            .with_properties(json!({
                "name": format!("{role_name}-s3"),
                "role": "ExecutionRole",
                "statements": [{
                    "effect": "Allow",
                    "actions": ["s3:GetObject", "s3:ListBucket"],
                    "resources": buckets,
                    "conditions": {
                        "StringEquals": { "aws:ResourceAccount": account },
                    },
                }],
            }));

        let group = ResourceGroup::builder(ROLE_GROUP)
            .declare(role)
            .declare(invoke_model)
            .declare(collection_access)
            .declare(data_source_read)
            .export_known(outputs::ROLE_ARN, OutputKind::Arn, Self::role_arn(context))
            .export_known(outputs::ROLE_NAME, OutputKind::Name, role_name)
            .build()?;
        Ok(group)
    }
}
