//! Core domain model types for ragstack.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Resource and output kind enums
//! - Output references exchanged between groups
//! - Resource groups and their declarations

mod group;
mod output;
mod status;

pub use group::{ResourceDeclaration, ResourceGroup, ResourceGroupBuilder};
pub use output::{OutputRef, OutputValue};
pub use status::{OutputKind, ResourceKind};
