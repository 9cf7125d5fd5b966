//! Provisioners for the RAG deployment.
//!
//! A provisioner turns a [`DeploymentContext`] plus the outputs of its
//! upstream groups into one [`ResourceGroup`]. Provisioners are pure: they
//! only build the in-memory description and never talk to a cloud API.

mod knowledge_base;
mod role;
mod vector_store;

pub use knowledge_base::KnowledgeBaseProvisioner;
pub use role::RoleProvisioner;
pub use vector_store::VectorStoreProvisioner;

use crate::context::{DeploymentContext, GroupInputs};
use crate::core::ResourceGroup;
use crate::errors::RagstackError;
use std::fmt::Debug;

/// Group name of the execution role.
pub const ROLE_GROUP: &str = "KbRoleStack";
/// Group name of the vector store.
pub const VECTOR_STORE_GROUP: &str = "OpenSearchServerlessInfraStack";
/// Group name of the knowledge base.
pub const KNOWLEDGE_BASE_GROUP: &str = "KbInfraStack";

/// Output names exported by the RAG groups.
pub mod outputs {
    /// ARN of the execution role.
    pub const ROLE_ARN: &str = "role-arn";
    /// Name of the execution role.
    pub const ROLE_NAME: &str = "role-name";
    /// ARN of the vector collection.
    pub const COLLECTION_ARN: &str = "collection-arn";
    /// Endpoint of the vector collection.
    pub const COLLECTION_ENDPOINT: &str = "collection-endpoint";
    /// Name of the vector collection.
    pub const COLLECTION_NAME: &str = "collection-name";
    /// Name of the vector index.
    pub const INDEX_NAME: &str = "index-name";
    /// Identifier of the knowledge base.
    pub const KNOWLEDGE_BASE_ID: &str = "knowledge-base-id";
    /// ARN of the knowledge base.
    pub const KNOWLEDGE_BASE_ARN: &str = "knowledge-base-arn";
    /// Identifiers of the data sources.
    pub const DATA_SOURCE_IDS: &str = "data-source-ids";
}

/// Declares one resource group.
pub trait Provisioner: Send + Sync + Debug {
    /// Returns the name of the group this provisioner declares.
    fn group_name(&self) -> &str;

    /// Declares the group.
    ///
    /// The returned group must be named [`Provisioner::group_name`], and the
    /// same context and inputs must always yield the same group.
    ///
    /// # Errors
    ///
    /// Returns `MissingDependencyOutput` if a required upstream output is
    /// not visible in `inputs`, or a config error if the context is unusable.
    fn declare(&self, context: &DeploymentContext, inputs: &GroupInputs) -> Result<ResourceGroup, RagstackError>;
}
