//! # ragstack
//!
//! Dependency-ordered provisioning of a retrieval-augmented-generation
//! backend.
//!
//! A deployment is made of resource groups: an execution role, a serverless
//! vector collection and a knowledge base bound to that collection. Each
//! group is declared by a [`Provisioner`](provisioners::Provisioner), the
//! groups are connected by explicitly declared edges, and the
//! [`Orchestrator`](orchestrator::Orchestrator) turns them into a validated,
//! topologically ordered [`DeploymentPlan`](graph::DeploymentPlan) that a
//! [`ProvisioningBackend`](backend::ProvisioningBackend) applies.
//!
//! - **Explicit edges**: referencing an output never adds an edge; a
//!   consumed output without an edge is a planning error
//! - **Deterministic plans**: the same configuration always yields a
//!   byte-identical plan and fingerprint
//! - **Fail fast**: cycles, dangling references and missing outputs are
//!   reported before anything is applied
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ragstack::prelude::*;
//!
//! let context = DeploymentContext::new("123456789012", "us-east-1")
//!     .with_data_source_uri("s3://rag-docs/manuals");
//!
//! let report = Orchestrator::rag_default()
//!     .run(&context, &InMemoryBackend::new())
//!     .await?;
//! println!("{}", report.summary());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod backend;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod graph;
pub mod orchestrator;
pub mod provisioners;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::backend::{
        ApplyResult, DryRunBackend, GroupChange, InMemoryBackend, ProvisioningBackend,
    };
    pub use crate::config::{load_context, ConfigFile};
    pub use crate::context::{DeploymentContext, GroupInputs, KnowledgeBaseSettings, RunIdentity};
    pub use crate::core::{OutputKind, OutputRef, ResourceDeclaration, ResourceGroup, ResourceKind};
    pub use crate::errors::{
        ApplyError, ConfigError, CyclicDependencyError, DanglingReferenceError,
        MissingDependencyOutput, RagstackError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::graph::{DependencyEdge, DependencyGraph, DependencyGraphBuilder, DeploymentPlan};
    pub use crate::orchestrator::{OrchestrationState, Orchestrator, RunFailure, RunReport};
    pub use crate::provisioners::{
        KnowledgeBaseProvisioner, Provisioner, RoleProvisioner, VectorStoreProvisioner,
    };
}
