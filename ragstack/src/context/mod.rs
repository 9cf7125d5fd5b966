//! Context for orchestration runs.
//!
//! This module provides:
//! - Deployment settings shared by every provisioner
//! - Run identities for correlating a single orchestration
//! - Strict views of upstream outputs used while declaring groups

mod identity;
mod inputs;
mod settings;

pub use identity::RunIdentity;
pub use inputs::GroupInputs;
pub use settings::{
    ChunkingStrategy, DeploymentContext, EmbeddingModel, KnowledgeBaseSettings, S3Location,
};
